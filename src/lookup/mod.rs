//! Collaborator interfaces consumed during resolution.
//!
//! # Data Flow
//! ```text
//! token strategy    → tokens.rs    (TokenStore::lookup)
//! element strategy  → elements.rs  (ElementLookup::find_by_uri)
//! template strategy → templates.rs (TemplateExistence::exists)
//! ```
//!
//! # Design Decisions
//! - Traits are synchronous: from the pipeline's point of view each lookup
//!   is a bounded blocking read
//! - In-memory and filesystem adapters back the service binary and tests;
//!   real deployments plug in their own stores

pub mod elements;
pub mod templates;
pub mod tokens;

pub use elements::{ElementLookup, ElementRoute, MemoryElementIndex, HOME_URI};
pub use templates::{FsTemplates, TemplateExistence};
pub use tokens::{MemoryTokenStore, TokenStore};

//! Site subsystem.
//!
//! # Data Flow
//! ```text
//! [[sites]] config
//!     → provider.rs (env expansion, base URL parsing)
//!     → SiteSet (non-empty, exactly one primary)
//!     → cached by routing::Router
//!
//! Per request:
//!     RequestContext → resolver.rs (score candidates) → &Site
//! ```
//!
//! # Design Decisions
//! - Malformed base URLs are logged once when the site list is built
//! - Selection is deterministic: ties keep declaration order
//! - The primary site is the unconditional fallback

pub mod provider;
pub mod resolver;
pub mod site;

pub use provider::{ConfigSiteProvider, SiteConfigProvider};
pub use resolver::SiteResolver;
pub use site::{Site, SiteId, SiteSet, SiteUrl};

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, host, path, params, headers)
//!     → sites::SiteResolver (pick the current site)
//!     → path.rs (segments, CP flag, page number, action flags)
//!     → pipeline.rs runs strategy.rs in order:
//!         token → element → rule → well-known → template
//!     → Return: Matched { strategy, route } or NotFound
//!
//! Rule Compilation (lazily, once per configuration):
//!     RuleDeclaration[]
//!     → rule.rs (verb prefix, placeholders, anchored regex)
//!     → Freeze as immutable UrlRule list inside router.rs
//! ```
//!
//! # Design Decisions
//! - Sites and rules are built on first use and reused until invalidated
//! - Deterministic: same input always resolves to the same route
//! - First match wins, both across strategies and across rules
//! - NotFound is an outcome; only programmer errors are `RoutingError`s

pub mod path;
pub mod pipeline;
pub mod route;
pub mod router;
pub mod rule;
pub mod strategy;

pub use path::{PathClassifier, PathFacts};
pub use pipeline::RouteResolutionPipeline;
pub use route::{ResolvedRoute, RouteOutcome, RouteParams, StrategyKind};
pub use router::{Collaborators, Resolution, Router, RouterSummary};
pub use rule::{RuleDeclaration, UrlRule, UrlRuleCompiler};
pub use strategy::{ResolutionInput, Strategy};

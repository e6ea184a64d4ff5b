//! Error types for route resolution.
//!
//! Only programmer errors and validation failures live here. A request that
//! matches no route is a normal outcome (`RouteOutcome::NotFound`), not an
//! error.

use thiserror::Error;

/// Errors that can occur while building the routing cache or resolving a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// A rule declaration could not be compiled.
    #[error("invalid URL rule `{pattern}`: {reason}")]
    InvalidRule { pattern: String, reason: String },

    /// A resolved template path tried to escape the template root.
    #[error("path traversal attempt in template path `{path}`")]
    PathTraversal { path: String },

    /// The site provider returned no sites.
    #[error("no sites are configured")]
    NoSites,

    /// None of the configured sites is marked primary.
    #[error("no primary site is configured")]
    NoPrimarySite,

    /// More than one site is marked primary.
    #[error("multiple primary sites configured: {0:?}")]
    MultiplePrimarySites(Vec<String>),

    /// The request deadline passed before resolution finished.
    #[error("request deadline exceeded before the {strategy} strategy")]
    DeadlineExceeded { strategy: &'static str },
}

/// Result alias for routing operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

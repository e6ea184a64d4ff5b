//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → request.rs (normalize into RequestContext)
//!     → routing::Router::resolve (blocking pool, request deadline)
//!     → response.rs (status mapping, JSON body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ParamValue, RequestContext};
pub use server::HttpServer;

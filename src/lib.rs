//! Multi-site request router library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod lookup;
pub mod observability;
pub mod routing;
pub mod sites;

pub use config::schema::RouterConfig;
pub use error::{RoutingError, RoutingResult};
pub use http::{HttpServer, RequestContext};
pub use lifecycle::Shutdown;
pub use routing::{Collaborators, Resolution, RouteOutcome, Router};
pub use sites::{Site, SiteSet};

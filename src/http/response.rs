//! Response mapping.
//!
//! # Responsibilities
//! - Map resolution results to HTTP status codes
//! - Render errors as a small JSON body
//!
//! # Design Decisions
//! - NotFound is a 404 carrying the full resolution, not an error body
//! - Deadline failures result in 504 Gateway Timeout

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::error::RoutingError;
use crate::routing::router::Resolution;

/// Status code for a routing error.
pub fn error_status(error: &RoutingError) -> StatusCode {
    match error {
        RoutingError::PathTraversal { .. } => StatusCode::BAD_REQUEST,
        RoutingError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
        RoutingError::InvalidRule { .. }
        | RoutingError::NoSites
        | RoutingError::NoPrimarySite
        | RoutingError::MultiplePrimarySites(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error response.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub fn routing_error_response(error: &RoutingError) -> Response {
    error_response(error_status(error), error.to_string())
}

/// 200 for a matched route, 404 otherwise.
pub fn resolution_response(resolution: Resolution) -> Response {
    let status = if resolution.outcome.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Json(resolution)).into_response()
}

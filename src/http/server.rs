//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the resolution and introspection handlers
//! - Wire up middleware (timeout, request ID, tracing)
//! - Bind server to listener
//! - Apply configuration updates from the file watcher
//! - Stop on the shutdown broadcast

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::RouterConfig;
use crate::http::request::RequestContext;
use crate::http::response::{error_response, resolution_response, routing_error_response};
use crate::observability::metrics;
use crate::routing::router::{Router as SiteRouter, RouterSummary};

/// Upper bound on buffered request bodies.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<SiteRouter>,
}

/// HTTP front end for the site router.
pub struct HttpServer {
    app: Router,
    router: Arc<SiteRouter>,
}

impl HttpServer {
    pub fn new(router: Arc<SiteRouter>) -> Self {
        let request_secs = router.config().timeouts.request_secs;
        let state = AppState {
            router: router.clone(),
        };
        Self {
            app: Self::build_router(state, Duration::from_secs(request_secs)),
            router,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/_router/status", get(status_handler))
            .route("/_router/sites", get(sites_handler))
            .fallback(resolve_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered service, for in-process use.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Run the server until `shutdown` fires, reloading the router on each
    /// configuration update.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let router = self.router.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                router.reload(config);
                if let Err(e) = router.init() {
                    tracing::error!(error = %e, "Reloaded configuration failed to build routing cache");
                }
            }
        });

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolve any request that is not an introspection endpoint.
async fn resolve_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => {
            let ctx = RequestContext::from_parts(&parts, &bytes);
            resolve(state.router, ctx, &request_id).await
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
        }
    };

    metrics::record_http_request(&method, response.status().as_u16());
    response
}

async fn resolve(router: Arc<SiteRouter>, ctx: RequestContext, request_id: &str) -> Response {
    let deadline = Instant::now() + Duration::from_secs(router.config().timeouts.request_secs);
    let path = ctx.raw_path().to_string();

    match tokio::task::spawn_blocking(move || router.resolve(&ctx, Some(deadline))).await {
        Ok(Ok(resolution)) => resolution_response(resolution),
        Ok(Err(e)) => {
            tracing::warn!(request_id = %request_id, path = %path, error = %e, "Resolution failed");
            routing_error_response(&e)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Resolution task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "resolution task failed")
        }
    }
}

#[derive(Serialize)]
struct StatusBody {
    initialized: bool,
    #[serde(flatten)]
    summary: RouterSummary,
}

async fn status_handler(State(state): State<AppState>) -> Response {
    let initialized = state.router.is_initialized();
    match state.router.summary() {
        Ok(summary) => Json(StatusBody {
            initialized,
            summary,
        })
        .into_response(),
        Err(e) => routing_error_response(&e),
    }
}

async fn sites_handler(State(state): State<AppState>) -> Response {
    match state.router.sites() {
        Ok(sites) => Json(sites).into_response(),
        Err(e) => routing_error_response(&e),
    }
}

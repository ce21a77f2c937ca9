//! # HTTP API
//!
//! | Route | Handler | Notes |
//! |-------|---------|-------|
//! | `GET/POST /mint/:id/:wallet` | [`handlers::mint`] | 200 receipt (fresh or replay), 400/404/409/500/504 |
//! | `GET/POST /check/:id` | [`handlers::check`] | 200 status view, 404 unknown |
//! | `GET /health` | [`handlers::health`] | liveness |
//! | `GET /metrics` | [`handlers::metrics`] | Prometheus text format |

pub mod error;
pub mod handlers;

use axum::{routing::get, Router};
use claim_workflow::ClaimApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use error::{status_for, ApiError, ErrorBody};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Claim controller.
    pub api: Arc<dyn ClaimApi>,
}

/// Build the router.
pub fn router(api: Arc<dyn ClaimApi>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/mint/:id/:wallet", get(handlers::mint).post(handlers::mint))
        .route("/check/:id", get(handlers::check).post(handlers::check))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware)
        .with_state(AppState { api })
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "[claim] HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

// Library interface for the chat relay
// Exposes the hub, router and wire types for the binary and integration tests

pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod views;
pub mod websocket;

pub use error::RelayError;
pub use hub::{Hub, HubHandle};
pub use protocol::{ClientMessage, OutboundNotification};

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use uuid::Uuid;

use crate::config::{HubConfig, PageConfig};
use crate::metrics::ServerMetrics;

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub metrics: Arc<ServerMetrics>,
    pub page: Arc<PageConfig>,
}

impl AppState {
    /// Start the hub and bundle everything the handlers need.
    pub fn new(hub_config: &HubConfig, page: PageConfig) -> Self {
        let metrics = Arc::new(ServerMetrics::new());
        let hub = Hub::spawn(hub_config, metrics.clone());
        Self {
            hub,
            metrics,
            page: Arc::new(page),
        }
    }
}

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(views::home_page))
        .route("/ws", get(websocket::websocket_handler))
        .route("/api/users", get(handlers::list_users))
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

mod http;
mod ws_handler;

pub use http::*;
pub use ws_handler::*;

use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::device::DevicePower;
use crate::relay::RelayHandle;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayHandle,
    pub devices: Option<Arc<dyn DevicePower>>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/device/{id}/off", get(device_off))
        .route("/api/v1/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

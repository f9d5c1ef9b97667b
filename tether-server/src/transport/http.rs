use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tether_core::RoomId;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::transport::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PowerOffQuery {
    #[serde(default)]
    pub force: bool,
}

/// `GET /device/{id}/off`: refuse while a call is live in the device's room
/// unless `force=true`, otherwise hand over to the device service.
pub async fn device_off(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<PowerOffQuery>,
) -> Response {
    let room_id = RoomId::new(device_id);

    if !query.force {
        match state.relay.has_active_call(&room_id).await {
            Ok(true) => {
                warn!("Vetoed power-off of {}: call in progress", room_id);
                return ApiError::TerminationVetoed
                    .to_http_response(format!("a call is active in room {room_id}"))
                    .into_response();
            }
            Ok(false) => {}
            Err(e) => {
                return ApiError::Internal
                    .to_http_response(e.to_string())
                    .into_response();
            }
        }
    }

    let Some(devices) = state.devices.as_ref() else {
        return ApiError::DeviceUnavailable
            .to_http_response("no device service configured")
            .into_response();
    };

    info!("Powering off {} (force={})", room_id, query.force);
    match devices.power_off(&room_id, query.force).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => ApiError::UpstreamError
            .to_http_response(e.to_string())
            .into_response(),
    }
}

pub async fn health(State(state): State<AppState>) -> Response {
    match state.relay.snapshot().await {
        Ok(snapshot) => Json(json!({
            "status": "running",
            "connections": snapshot.connections,
            "activeCalls": snapshot.active_calls,
        }))
        .into_response(),
        Err(e) => ApiError::Internal
            .to_http_response(e.to_string())
            .into_response(),
    }
}

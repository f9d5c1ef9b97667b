use async_trait::async_trait;
use reqwest::StatusCode;
use tether_core::RoomId;
use tracing::info;

use crate::error::CallError;

/// Powers down the device bound to a room once its call is over.
#[async_trait]
pub trait DeviceTerminator: Send + Sync {
    async fn power_off(&self, room_id: &RoomId, force: bool) -> Result<(), CallError>;
}

/// Calls the relay's `GET /device/{id}/off` endpoint.
pub struct HttpDeviceTerminator {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDeviceTerminator {
    /// `base_url` is the relay's HTTP origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DeviceTerminator for HttpDeviceTerminator {
    async fn power_off(&self, room_id: &RoomId, force: bool) -> Result<(), CallError> {
        let url = format!("{}/device/{}/off", self.base_url, room_id);
        let resp = self
            .client
            .get(&url)
            .query(&[("force", force)])
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {
                info!("Device {} powered off", room_id);
                Ok(())
            }
            StatusCode::CONFLICT => Err(CallError::Vetoed),
            s => Err(CallError::DeviceStatus(s.as_u16())),
        }
    }
}

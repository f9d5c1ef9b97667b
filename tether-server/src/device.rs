use async_trait::async_trait;
use serde_json::Value;
use tether_core::RoomId;
use tracing::info;

use crate::error::DeviceError;

/// Whatever actually powers a remote device down.
#[async_trait]
pub trait DevicePower: Send + Sync {
    async fn power_off(&self, device_id: &RoomId, force: bool) -> Result<Value, DeviceError>;
}

/// Forwards power-off requests to an external device service.
pub struct ProxyDevicePower {
    base_url: String,
    client: reqwest::Client,
}

impl ProxyDevicePower {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DevicePower for ProxyDevicePower {
    async fn power_off(&self, device_id: &RoomId, force: bool) -> Result<Value, DeviceError> {
        let url = format!("{}/device/{}/off", self.base_url, device_id);
        info!("Forwarding power-off for {} to {}", device_id, url);

        let resp = self
            .client
            .get(&url)
            .query(&[("force", force)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeviceError::Status(status.as_u16()));
        }
        Ok(resp.json::<Value>().await?)
    }
}

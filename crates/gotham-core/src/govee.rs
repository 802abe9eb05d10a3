//! Govee platform API client for a single configured device.
//!
//! Every mutating command waits on the shared [`RateLimiter`] first. Requests
//! carry a fixed per-request timeout and are never retried. An HTTP 200 whose
//! body `code` is not 200 is a rejection, not a success.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GoveeConfig;
use crate::device::{validate_brightness, DeviceInfo, DeviceState, LightDevice, PowerState};
use crate::error::{DeviceError, GothamError};
use crate::pattern::Rgb;
use crate::rate_limit::RateLimiter;

const CONTROL_PATH: &str = "/router/api/v1/device/control";
const STATE_PATH: &str = "/router/api/v1/device/state";
const DEVICES_PATH: &str = "/router/api/v1/user/devices";

const ON_OFF: &str = "devices.capabilities.on_off";
const RANGE: &str = "devices.capabilities.range";
const COLOR_SETTING: &str = "devices.capabilities.color_setting";
const DYNAMIC_SCENE: &str = "devices.capabilities.dynamic_scene";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: Option<i64>,
    #[serde(alias = "msg", default)]
    message: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct StatePayload {
    #[serde(default)]
    capabilities: Vec<CapabilityState>,
}

#[derive(Debug, Deserialize)]
struct CapabilityState {
    #[serde(rename = "type")]
    kind: String,
    instance: String,
    #[serde(default)]
    state: Option<StateValue>,
}

#[derive(Debug, Deserialize)]
struct StateValue {
    #[serde(default)]
    value: Value,
}

/// A single `{type, instance, value}` control capability.
#[derive(Debug, Clone, PartialEq)]
struct Capability {
    kind: &'static str,
    instance: &'static str,
    value: Value,
}

impl Capability {
    fn power(on: bool) -> Self {
        Self {
            kind: ON_OFF,
            instance: "powerSwitch",
            value: json!(u8::from(on)),
        }
    }

    fn brightness(level: u8) -> Self {
        Self {
            kind: RANGE,
            instance: "brightness",
            value: json!(level),
        }
    }

    fn color(color: Rgb) -> Self {
        Self {
            kind: COLOR_SETTING,
            instance: "colorRgb",
            value: json!(color.to_packed()),
        }
    }

    fn scene(scene_id: u32) -> Self {
        Self {
            kind: DYNAMIC_SCENE,
            instance: "lightScene",
            value: json!(scene_id),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "type": self.kind,
            "instance": self.instance,
            "value": self.value,
        })
    }
}

// ---------------------------------------------------------------------------
// GoveeClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GoveeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    device: String,
    sku: String,
    timeout: Duration,
    limiter: Arc<RateLimiter>,
}

impl GoveeClient {
    pub fn new(config: &GoveeConfig, limiter: Arc<RateLimiter>) -> Result<Self, GothamError> {
        if config.api_key.is_empty() || config.device.is_empty() || config.sku.is_empty() {
            return Err(GothamError::MissingConfig(
                "govee api_key, device and sku are all required".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GothamError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            device: config.device.clone(),
            sku: config.sku.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            limiter,
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Devices registered to the account. Read-only, so not rate limited.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let url = format!("{}{DEVICES_PATH}", self.base_url);
        let request = self
            .http
            .get(&url)
            .header("Govee-API-Key", &self.api_key)
            .timeout(self.timeout);
        let envelope = self.send("list_devices", request).await?;
        serde_json::from_value::<Vec<DeviceInfo>>(envelope.data).map_err(|e| {
            let err = DeviceError::Malformed(format!("device list: {e}"));
            warn!(op = "list_devices", error = %err, "govee request failed");
            err
        })
    }

    async fn control(&self, op: &'static str, capability: Capability) -> Result<(), DeviceError> {
        self.limiter.acquire().await;
        let body = json!({
            "requestId": uuid::Uuid::new_v4().to_string(),
            "payload": {
                "sku": self.sku,
                "device": self.device,
                "capability": capability.to_json(),
            }
        });
        debug!(op, capability = %body["payload"]["capability"], "sending govee command");
        let request = self.post(CONTROL_PATH).json(&body);
        self.send(op, request).await.map(|_| ())
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{path}", self.base_url))
            .header("Govee-API-Key", &self.api_key)
            .timeout(self.timeout)
    }

    /// Send a request and classify the outcome; failures are logged here.
    async fn send(
        &self,
        op: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope, DeviceError> {
        let result = self.send_inner(request).await;
        if let Err(ref e) = result {
            warn!(op, error = %e, "govee request failed");
        }
        result
    }

    async fn send_inner(&self, request: reqwest::RequestBuilder) -> Result<Envelope, DeviceError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(DeviceError::VendorRejected {
                status: status.as_u16(),
                code: None,
                message: truncate(&text, 200),
            });
        }

        let envelope: Envelope = serde_json::from_str(&text)
            .map_err(|e| DeviceError::Malformed(format!("{e}: {}", truncate(&text, 200))))?;

        match envelope.code {
            Some(200) => Ok(envelope),
            code => Err(DeviceError::VendorRejected {
                status: status.as_u16(),
                code,
                message: envelope.message,
            }),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> DeviceError {
        if err.is_timeout() {
            DeviceError::Timeout(self.timeout.as_secs())
        } else {
            DeviceError::Transport(err.to_string())
        }
    }
}

impl LightDevice for GoveeClient {
    async fn get_state(&self) -> Result<DeviceState, DeviceError> {
        let body = json!({
            "requestId": uuid::Uuid::new_v4().to_string(),
            "payload": { "sku": self.sku, "device": self.device }
        });
        let envelope = self.send("get_state", self.post(STATE_PATH).json(&body)).await?;
        let payload: StatePayload = serde_json::from_value(envelope.payload).map_err(|e| {
            let err = DeviceError::Malformed(format!("state payload: {e}"));
            warn!(op = "get_state", error = %err, "govee request failed");
            err
        })?;
        Ok(parse_state(&payload.capabilities))
    }

    async fn set_power(&self, on: bool) -> Result<(), DeviceError> {
        self.control("set_power", Capability::power(on)).await
    }

    async fn set_brightness(&self, level: u8) -> Result<(), DeviceError> {
        let level = validate_brightness(level).inspect_err(|e| {
            warn!(op = "set_brightness", error = %e, "rejected before sending");
        })?;
        self.control("set_brightness", Capability::brightness(level))
            .await
    }

    async fn set_color(&self, color: Rgb) -> Result<(), DeviceError> {
        self.control("set_color", Capability::color(color)).await
    }

    async fn trigger_scene(&self, scene_id: u32) -> Result<(), DeviceError> {
        self.control("trigger_scene", Capability::scene(scene_id))
            .await
    }
}

fn parse_state(capabilities: &[CapabilityState]) -> DeviceState {
    let mut state = DeviceState::unknown();
    state.captured_at = Utc::now();
    for cap in capabilities {
        let Some(value) = cap.state.as_ref().map(|s| &s.value) else {
            continue;
        };
        match (cap.kind.as_str(), cap.instance.as_str()) {
            (ON_OFF, "powerSwitch") => {
                state.power = match value.as_i64() {
                    Some(1) => PowerState::On,
                    Some(0) => PowerState::Off,
                    _ => PowerState::Unknown,
                };
            }
            (RANGE, "brightness") => {
                state.brightness = value
                    .as_u64()
                    .filter(|b| *b <= 100)
                    .map(|b| b as u8);
            }
            (COLOR_SETTING, "colorRgb") => {
                state.color = value
                    .as_u64()
                    .filter(|c| *c <= 0xFF_FFFF)
                    .map(|c| Rgb::from_packed(c as u32));
            }
            _ => {}
        }
    }
    state
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

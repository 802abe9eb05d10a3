use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::DeviceError;
use crate::pattern::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

/// Observable device state at one instant. Fields the vendor did not report
/// are `Unknown` / `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub power: PowerState,
    pub brightness: Option<u8>,
    pub color: Option<Rgb>,
    pub captured_at: DateTime<Utc>,
}

impl DeviceState {
    pub fn unknown() -> Self {
        Self {
            power: PowerState::Unknown,
            brightness: None,
            color: None,
            captured_at: Utc::now(),
        }
    }
}

/// A device registered to the vendor account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub sku: String,
    pub device: String,
    #[serde(rename = "deviceName", default)]
    pub device_name: String,
}

/// Command vocabulary the orchestrator drives.
///
/// Implementations catch every failure at this boundary and report it as a
/// [`DeviceError`]; nothing here may panic on vendor misbehaviour.
pub trait LightDevice: Send + Sync + 'static {
    fn get_state(&self) -> impl Future<Output = Result<DeviceState, DeviceError>> + Send;

    fn set_power(&self, on: bool) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Brightness outside `0..=100` is rejected without a request.
    fn set_brightness(&self, level: u8) -> impl Future<Output = Result<(), DeviceError>> + Send;

    fn set_color(&self, color: Rgb) -> impl Future<Output = Result<(), DeviceError>> + Send;

    fn trigger_scene(&self, scene_id: u32)
        -> impl Future<Output = Result<(), DeviceError>> + Send;
}

pub fn validate_brightness(level: u8) -> Result<u8, DeviceError> {
    if level > 100 {
        return Err(DeviceError::InvalidInput(format!(
            "brightness must be between 0 and 100, got {level}"
        )));
    }
    Ok(level)
}

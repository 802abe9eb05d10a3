use crate::error::{GothamError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GoveeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoveeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub device: String,
    /// Vendor model identifier, e.g. `H70B1`.
    #[serde(default)]
    pub sku: String,
    #[serde(default = "default_govee_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_govee_base_url() -> String {
    "https://openapi.api.govee.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for GoveeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            device: String::new(),
            sku: String::new(),
            base_url: default_govee_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// RateLimitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> usize {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

// ---------------------------------------------------------------------------
// ServerConfig / StripeConfig / YoutubeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StripeConfig {
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default = "default_youtube_base_url")]
    pub base_url: String,
    /// 30 minutes keeps the poller at roughly 48 quota units a day.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_youtube_base_url() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_poll_interval_secs() -> u64 {
    1800
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            channel_id: None,
            base_url: default_youtube_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl YoutubeConfig {
    /// True when both the key and the channel are set.
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.channel_id.as_deref().is_some_and(|c| !c.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub govee: GoveeConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
}

impl Config {
    /// Read a YAML config file. A missing file is an error; callers that want
    /// defaults pass no path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GothamError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    /// Load from `path` if given, else start from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Hard errors first; warnings are returned for optional integrations.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>> {
        let mut missing = Vec::new();
        if self.govee.api_key.is_empty() {
            missing.push("govee.api_key (GOVEE_API_KEY)");
        }
        if self.govee.device.is_empty() {
            missing.push("govee.device (GOVEE_DEVICE_ID)");
        }
        if self.govee.sku.is_empty() {
            missing.push("govee.sku (GOVEE_MODEL)");
        }
        if !missing.is_empty() {
            return Err(GothamError::MissingConfig(missing.join(", ")));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(GothamError::InvalidConfig(
                "rate_limit.max_requests and rate_limit.window_secs must be positive".into(),
            ));
        }
        if self.govee.timeout_secs == 0 {
            return Err(GothamError::InvalidConfig(
                "govee.timeout_secs must be positive".into(),
            ));
        }

        let mut warnings = Vec::new();
        if self.stripe.webhook_secret.as_deref().unwrap_or("").is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "stripe.webhook_secret not set: /webhooks/stripe will answer 503".into(),
            });
        }
        if !self.youtube.is_enabled() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "youtube api_key/channel_id not set: subscriber monitor disabled".into(),
            });
        } else if self.youtube.poll_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "youtube.poll_interval_secs must be positive".into(),
            });
        } else if self.youtube.poll_interval_secs < 60 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "youtube.poll_interval_secs = {} will exhaust the daily API quota quickly",
                    self.youtube.poll_interval_secs
                ),
            });
        }
        Ok(warnings)
    }
}

use anyhow::Context;
use clap::Args;
use gotham_core::config::Config;
use std::path::Path;

/// Values that override the config file, usually supplied by the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Govee developer API key
    #[arg(long, global = true, env = "GOVEE_API_KEY", hide_env_values = true)]
    pub govee_api_key: Option<String>,

    /// Govee device identifier (MAC-like string)
    #[arg(long, global = true, env = "GOVEE_DEVICE_ID")]
    pub govee_device: Option<String>,

    /// Govee model / SKU, e.g. H70B1
    #[arg(long, global = true, env = "GOVEE_MODEL")]
    pub govee_model: Option<String>,

    /// Stripe endpoint signing secret
    #[arg(long, global = true, env = "STRIPE_WEBHOOK_SECRET", hide_env_values = true)]
    pub stripe_webhook_secret: Option<String>,

    /// YouTube Data API key
    #[arg(long, global = true, env = "YT_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    /// YouTube channel to watch
    #[arg(long, global = true, env = "YOUTUBE_CHANNEL_ID")]
    pub youtube_channel_id: Option<String>,
}

impl Overrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(v) = self.govee_api_key {
            config.govee.api_key = v;
        }
        if let Some(v) = self.govee_device {
            config.govee.device = v;
        }
        if let Some(v) = self.govee_model {
            config.govee.sku = v;
        }
        if let Some(v) = self.stripe_webhook_secret {
            config.stripe.webhook_secret = Some(v);
        }
        if let Some(v) = self.youtube_api_key {
            config.youtube.api_key = Some(v);
        }
        if let Some(v) = self.youtube_channel_id {
            config.youtube.channel_id = Some(v);
        }
    }
}

/// Config file (or defaults) with overrides applied on top.
pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<Config> {
    let mut config = Config::load_or_default(path).with_context(|| match path {
        Some(p) => format!("failed to load config from {}", p.display()),
        None => "failed to build default config".to_string(),
    })?;
    overrides.apply(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_file_values() {
        let mut config = Config::default();
        config.govee.api_key = "from-file".into();
        config.govee.sku = "H6008".into();

        Overrides {
            govee_api_key: Some("from-env".into()),
            youtube_channel_id: Some("UC1".into()),
            ..Overrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.govee.api_key, "from-env");
        assert_eq!(config.govee.sku, "H6008");
        assert_eq!(config.youtube.channel_id.as_deref(), Some("UC1"));
        assert!(config.stripe.webhook_secret.is_none());
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = load(Some(Path::new("/nonexistent/gotham.yaml")), Overrides::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/gotham.yaml"));
    }
}

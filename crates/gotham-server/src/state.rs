use std::sync::Arc;

use gotham_core::config::Config;
use gotham_core::{GoveeClient, Orchestrator, RateLimiter, TriggerQueue};

use crate::youtube::MonitorControl;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator<GoveeClient>>,
    /// Arrival-ordered triggers from handlers that must not wait on a transition.
    pub triggers: TriggerQueue,
    pub stripe_secret: Option<Arc<str>>,
    pub youtube: Arc<MonitorControl<GoveeClient>>,
}

impl AppState {
    /// Build the device client and orchestrator from a validated config.
    ///
    /// Spawns the trigger queue worker, so this must run inside a tokio runtime.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window(),
        ));
        let client = GoveeClient::new(&config.govee, limiter)?;
        let orchestrator = Arc::new(Orchestrator::new(Arc::new(client)));
        Ok(Self {
            triggers: TriggerQueue::spawn(Arc::clone(&orchestrator)),
            stripe_secret: config
                .stripe
                .webhook_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(Arc::from),
            youtube: Arc::new(MonitorControl::new(
                config.youtube.clone(),
                Arc::clone(&orchestrator),
            )),
            orchestrator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.govee.api_key = "k".into();
        config.govee.device = "d".into();
        config.govee.sku = "H6008".into();
        config
    }

    #[tokio::test]
    async fn empty_stripe_secret_counts_as_unset() {
        let mut cfg = config();
        cfg.stripe.webhook_secret = Some(String::new());
        let state = AppState::new(&cfg).unwrap();
        assert!(state.stripe_secret.is_none());
    }

    #[tokio::test]
    async fn incomplete_govee_identity_fails() {
        let mut cfg = config();
        cfg.govee.device.clear();
        assert!(AppState::new(&cfg).is_err());
    }

    #[tokio::test]
    async fn youtube_monitor_waits_to_be_started() {
        let mut cfg = config();
        cfg.youtube.api_key = Some("yt".into());
        cfg.youtube.channel_id = Some("UC1".into());
        let state = AppState::new(&cfg).unwrap();
        let snap = state.youtube.snapshot().await;
        assert!(!snap.enabled);
        assert_eq!(snap.channel_id.as_deref(), Some("UC1"));
    }
}

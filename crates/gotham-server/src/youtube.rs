//! YouTube subscriber-count monitor.
//!
//! Polls channel statistics on a fixed interval and turns milestone crossings
//! into `SubscriberMilestone` celebrations. The first successful poll only
//! records a baseline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use gotham_core::config::YoutubeConfig;
use gotham_core::milestone::{self, Milestone};
use gotham_core::{LightDevice, Orchestrator, Stimulus};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const CHANNELS_PATH: &str = "/youtube/v3/channels";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    /// The API reports counts as decimal strings.
    subscriber_count: serde_json::Value,
}

impl YoutubeClient {
    pub fn new(config: &YoutubeConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .context("youtube.api_key is not set")?;
        let channel_id = config
            .channel_id
            .clone()
            .filter(|c| !c.is_empty())
            .context("youtube.channel_id is not set")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            channel_id,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub async fn subscriber_count(&self) -> anyhow::Result<u64> {
        let response = self
            .http
            .get(format!("{}{CHANNELS_PATH}", self.base_url))
            .query(&[
                ("part", "statistics"),
                ("id", self.channel_id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("youtube request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("youtube api returned {status}: {text}");
        }

        let body: ChannelsResponse = response
            .json()
            .await
            .context("youtube response was not valid json")?;
        let item = body
            .items
            .into_iter()
            .next()
            .with_context(|| format!("channel {} not found", self.channel_id))?;

        match &item.statistics.subscriber_count {
            serde_json::Value::String(s) => s
                .parse::<u64>()
                .with_context(|| format!("bad subscriberCount {s:?}")),
            serde_json::Value::Number(n) => n.as_u64().context("bad subscriberCount"),
            other => anyhow::bail!("bad subscriberCount {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// What `/api/youtube/monitor` reports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_polled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_milestone: Option<Milestone>,
}

pub type SharedSnapshot = Arc<RwLock<MonitorSnapshot>>;

pub struct SubscriberMonitor<D: LightDevice> {
    client: YoutubeClient,
    orchestrator: Arc<Orchestrator<D>>,
    snapshot: SharedSnapshot,
    interval: Duration,
    baseline: Option<u64>,
}

impl<D: LightDevice> SubscriberMonitor<D> {
    pub fn new(
        client: YoutubeClient,
        orchestrator: Arc<Orchestrator<D>>,
        snapshot: SharedSnapshot,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            orchestrator,
            snapshot,
            interval,
            baseline: None,
        }
    }

    /// Poll once. Returns the milestone that was celebrated, if any.
    pub async fn poll_once(&mut self) -> Option<Milestone> {
        let count = match self.client.subscriber_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(channel = %self.client.channel_id(), error = %e, "subscriber poll failed");
                let mut snap = self.snapshot.write().await;
                snap.last_polled_at = Some(Utc::now());
                snap.last_error = Some(format!("{e:#}"));
                return None;
            }
        };

        let fired = match self.baseline {
            None => {
                info!(channel = %self.client.channel_id(), subscribers = count, "subscriber baseline set");
                None
            }
            Some(previous) => milestone::detect(previous, count),
        };
        self.baseline = Some(count);

        {
            let mut snap = self.snapshot.write().await;
            snap.subscriber_count = Some(count);
            snap.last_polled_at = Some(Utc::now());
            snap.last_error = None;
            if fired.is_some() {
                snap.last_milestone = fired;
            }
        }

        if let Some(m) = fired {
            info!(
                threshold = m.threshold,
                subscribers = count,
                "subscriber milestone reached"
            );
            self.orchestrator
                .trigger(Stimulus::subscriber_milestone(m.threshold, "youtube"))
                .await;
        }
        fired
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

// ---------------------------------------------------------------------------
// Runtime control
// ---------------------------------------------------------------------------

/// Starts and stops the monitor while the server is running.
///
/// At most one monitor polls at a time; starting again replaces it and resets
/// the baseline.
pub struct MonitorControl<D: LightDevice> {
    config: YoutubeConfig,
    orchestrator: Arc<Orchestrator<D>>,
    snapshot: SharedSnapshot,
    running: Mutex<Option<JoinHandle<()>>>,
}

impl<D: LightDevice> MonitorControl<D> {
    pub fn new(config: YoutubeConfig, orchestrator: Arc<Orchestrator<D>>) -> Self {
        let snapshot = MonitorSnapshot {
            channel_id: config.channel_id.clone(),
            ..MonitorSnapshot::default()
        };
        Self {
            config,
            orchestrator,
            snapshot: Arc::new(RwLock::new(snapshot)),
            running: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Start polling. `channel_id` and `interval_secs` override the configured
    /// values for this run only.
    pub async fn start(
        &self,
        channel_id: Option<String>,
        interval_secs: Option<u64>,
    ) -> anyhow::Result<MonitorSnapshot> {
        let mut config = self.config.clone();
        if channel_id.is_some() {
            config.channel_id = channel_id;
        }
        if let Some(secs) = interval_secs {
            config.poll_interval_secs = secs;
        }
        if config.poll_interval_secs == 0 {
            anyhow::bail!("poll interval must be positive");
        }
        let client = YoutubeClient::new(&config)?;

        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            previous.abort();
        }
        *self.snapshot.write().await = MonitorSnapshot {
            enabled: true,
            channel_id: Some(client.channel_id().to_string()),
            ..MonitorSnapshot::default()
        };
        info!(
            channel = %client.channel_id(),
            interval_secs = config.poll_interval_secs,
            "youtube subscriber monitor started"
        );
        *running = Some(
            SubscriberMonitor::new(
                client,
                Arc::clone(&self.orchestrator),
                Arc::clone(&self.snapshot),
                Duration::from_secs(config.poll_interval_secs),
            )
            .spawn(),
        );
        drop(running);
        Ok(self.snapshot().await)
    }

    /// Stop polling. Returns whether a monitor was running.
    pub async fn stop(&self) -> bool {
        let Some(handle) = self.running.lock().await.take() else {
            return false;
        };
        handle.abort();
        self.snapshot.write().await.enabled = false;
        info!("youtube subscriber monitor stopped");
        true
    }
}

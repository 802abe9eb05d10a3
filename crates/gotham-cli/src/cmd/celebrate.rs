use crate::output::print_json;
use crate::settings::{self, Overrides};
use gotham_core::{GoveeClient, Orchestrator, RateLimiter, Stimulus};
use std::path::Path;
use std::sync::Arc;

/// Play one payment celebration on the configured light and wait for restore.
/// Ctrl-C stops the celebration early and still restores.
pub fn run(
    config_path: Option<&Path>,
    overrides: Overrides,
    amount: f64,
    json: bool,
) -> anyhow::Result<()> {
    let config = settings::load(config_path, overrides)?;
    config.validate()?;

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window(),
    ));
    let client = GoveeClient::new(&config.govee, limiter)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let orchestrator = Orchestrator::new(Arc::new(client));
        let receipt = orchestrator.trigger(Stimulus::payment(amount, "cli")).await;
        if !json {
            println!(
                "Playing {} ({:.0}s), Ctrl-C to stop...",
                receipt.pattern_name, receipt.duration
            );
        }

        tokio::select! {
            _ = orchestrator.wait_idle() => {}
            _ = tokio::signal::ctrl_c() => {
                orchestrator.stop().await;
            }
        }

        let status = orchestrator.status();
        if json {
            print_json(&serde_json::json!({
                "receipt": receipt,
                "last_run": status.last_run,
            }))?;
        } else if let Some(last) = status.last_run {
            println!("Celebration {:?}; light restored.", last.outcome);
        }
        Ok(())
    })
}

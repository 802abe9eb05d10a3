use crate::output::print_json;
use crate::settings::{self, Overrides};
use clap::Subcommand;
use gotham_core::config::WarnLevel;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the effective config (file plus environment)
    Check,
}

pub fn run(
    config_path: Option<&Path>,
    overrides: Overrides,
    subcmd: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Check => check(config_path, overrides, json),
    }
}

fn check(config_path: Option<&Path>, overrides: Overrides, json: bool) -> anyhow::Result<()> {
    let config = settings::load(config_path, overrides)?;
    let warnings = config.validate()?;

    if json {
        print_json(&serde_json::json!({
            "valid": true,
            "device": config.govee.device,
            "sku": config.govee.sku,
            "port": config.server.port,
            "youtube_monitor": config.youtube.is_enabled(),
            "warnings": warnings,
        }))?;
    } else {
        println!(
            "Config is valid: device {} ({}), port {}.",
            config.govee.device, config.govee.sku, config.server.port
        );
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config check found errors");
    }
    Ok(())
}

use crate::settings::{self, Overrides};
use gotham_core::config::WarnLevel;
use std::path::Path;

pub fn run(config_path: Option<&Path>, overrides: Overrides, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = settings::load(config_path, overrides)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let warnings = config.validate()?;
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => tracing::error!("{}", w.message),
        }
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("refusing to start with config errors (see `gotham config check`)");
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(gotham_server::serve(config))
}

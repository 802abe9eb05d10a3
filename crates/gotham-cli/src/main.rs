mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use settings::Overrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gotham",
    about = "Celebration lights for payments and subscriber milestones",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML config file (default: built-in defaults plus environment)
    #[arg(long, global = true, env = "GOTHAM_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server, webhook receiver and subscriber monitor
    Serve {
        /// Listen port
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Show the celebration pattern a payment amount selects
    Pattern {
        /// Payment amount in major currency units
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },

    /// Play one payment celebration on the light and wait for it to finish
    Celebrate {
        /// Payment amount in major currency units
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },

    /// Check whether a subscriber count change crosses a milestone
    Milestone {
        #[arg(long)]
        previous: u64,
        #[arg(long)]
        current: u64,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Celebrate { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Serve { port } => cmd::serve::run(config_path, cli.overrides, port),
        Commands::Pattern { amount } => cmd::pattern::run(amount, cli.json),
        Commands::Celebrate { amount } => {
            cmd::celebrate::run(config_path, cli.overrides, amount, cli.json)
        }
        Commands::Milestone { previous, current } => {
            cmd::milestone::run(previous, current, cli.json)
        }
        Commands::Config { subcommand } => {
            cmd::config::run(config_path, cli.overrides, subcommand, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

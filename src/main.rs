mod wiring;

use anyhow::Result;
use clap::Parser;
use osminokal_core::config::Config;
use osminokal_core::scheduler::Scheduler;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "OSMINOKAL_LOG_LEVEL";

#[derive(Parser)]
#[command(name = "osminokal")]
#[command(about = "Mirror free energy sessions into your calendars as reminder events")]
struct Cli {
    /// Run a single sync and exit instead of polling
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting osminokal");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "critical: config cannot be loaded");
            std::process::exit(1);
        }
    };
    tracing::info!("config successfully loaded");
    tracing::debug!(?config, "full config");

    let engine = match wiring::build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "critical: cannot set up sync pipeline");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    wiring::cancel_on_shutdown_signal(cancel.clone())?;

    if cli.once {
        let outcome = engine.tick(&cancel).await;
        tracing::info!(?outcome, "single sync finished");
    } else {
        Scheduler::new(config.poll_interval).run(&engine, &cancel).await;
    }

    Ok(())
}

/// JSON logs to stdout, level from `OSMINOKAL_LOG_LEVEL` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .init();
}

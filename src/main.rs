//! azfiles - Azure file share client
//!
//! Moves files between the local disk and Azure file shares and manages
//! remote directories over the File REST API.

use azfiles::cli::Cli;
use azfiles::config::{self, Settings};
use azfiles::error::Result;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = config::load_settings();
    init_logging(cli.debug || settings.as_ref().is_ok_and(|s| s.debug));

    if let Err(e) = run(cli, settings).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, settings: Result<Settings>) -> Result<()> {
    info!("Starting azfiles");

    let config = config::load_config(settings?).await?;
    debug!("Mount file: {}", config.mounts_path.display());

    cli.execute(config).await
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "azfiles=debug" } else { "azfiles=warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

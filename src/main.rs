use clap::Parser;
use grm::cli::{execute_command, Cli};
use grm::config::load_config;
use grm::logging::init_logging;
use tracing::{error, trace, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let loaded = load_config(&cli.config)?;
    let found = loaded.is_some();
    let config = loaded
        .unwrap_or_default()
        .with_overrides(cli.dry_run, None);
    init_logging(&config, cli.verbose)?;

    if !found {
        warn!(
            "Configuration file '{}' not found. Using defaults.",
            cli.config.display()
        );
    }

    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    execute_command(cli.command, config).await
}

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vault::VaultState;
use vault::cli::Cli;
use vault::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load config")?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    // Reports go to stdout; keep logs on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let state = VaultState::connect(&config)
        .await
        .context("Failed to initialize storage")?;

    cli.run(&state, &config).await
}

use advisor::cli::{self, Cli};
use advisor::config::Config;
use advisor::task::TaskService;
use advisor::task::store::connect_store;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => tracing::debug!("No .env file found, using environment"),
        Err(err) => tracing::warn!("Ignoring unreadable .env file: {}", err),
    }

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = connect_store(&config).await?;
    cli::run(cli.command, TaskService::new(store), &config).await
}

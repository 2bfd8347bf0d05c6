use anyhow::Result;
use clap::Parser;
use mediacat_notify::ChangeHub;
use mediacat_server::{AppState, ServerConfig, serve};
use mediacat_storage::StorageConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mediacat media registry server", long_about = None)]
struct Args {
    /// Listen address, overriding MEDIACAT_BIND_ADDR
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let storage = StorageConfig::from_env()?;
    let mut config = ServerConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    info!(
        backend = %storage.backend,
        addr = %config.bind_addr,
        "Starting media registry server"
    );

    let store = storage.connect()?;
    let state = AppState::new(store, ChangeHub::new());

    serve(config, state).await?;
    Ok(())
}

use npconfig::get_config;
use nprelay::{NativeHostConnector, RelayServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = get_config();
    let relay = RelayServer::from_config(&config)?;
    let connector = NativeHostConnector::from_config(&config)?;

    tokio::select! {
        result = relay.run(connector) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    Ok(())
}

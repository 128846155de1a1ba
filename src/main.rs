use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use bucket_gate::{config::Config, storage::build_store, utils::init_logger, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);
    info!(
        provider = %config.storage.provider,
        bucket = %config.storage.bucket,
        region = %config.storage.region,
        "Storage configuration loaded"
    );
    if config.app.uses_default_secret() {
        warn!("SECRET_KEY is not set, using the built-in placeholder secret");
    }

    // Bind the storage client; credentials are not checked until first use
    let store = build_store(&config.storage)
        .map_err(|e| anyhow::anyhow!("Failed to create storage client: {}", e))?;

    // Create shared state
    let state = AppState::new(config.clone(), store);

    // Create router
    let app = bucket_gate::create_router(state);

    // Start server
    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| anyhow::anyhow!("Invalid HOST '{}': {}", config.server.host, e))?;
    let addr = SocketAddr::from((ip, config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rental_catalog_backend::{create_router, initialize_backend, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting with {:?} storage", config.storage.backend);

    let state = initialize_backend(&config).await?;
    let app = create_router(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

//! service_data_api - HTTP server for service detail lookups.
//!
//! Reads config from env vars (a `.env` file is loaded first if present):
//!   DB_HOST, DB_NAME, DB_USER  - required
//!   DB_PASSWORD, DB_PORT       - optional (port defaults to 5432)
//!   DB_SCHEMA                  - schema holding service_details (sets search_path)
//!   DB_CONNECT_TIMEOUT_SECS    - connect timeout (default: 10)
//!   DB_POOL_SIZE               - use a pool of this size instead of one connection per request
//!   HOST, PORT                 - listen address (default: 0.0.0.0:5000)

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use service_data_api::{build_router, AppConfig, PgServiceDetails, ServiceDetailsSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,service_data_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        "Database target: {} ({:?})",
        config.database.display_target(),
        config.database.strategy
    );

    let source: Arc<dyn ServiceDetailsSource> =
        Arc::new(PgServiceDetails::new(config.database.clone()));
    let app = build_router(source);

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!("service_data_api listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

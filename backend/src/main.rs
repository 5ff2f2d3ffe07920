//! Farm advisory server
//!
//! Serves yield and fertilizer predictions, weather-risk alerts, growth
//! signals and the advisory chat over HTTP.

use std::net::SocketAddr;

use farm_advisory_backend::{build_state, create_app, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "advisory_server=debug,farm_advisory_backend=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting farm advisory server");
    tracing::info!("Environment: {}", config.environment);

    let state = build_state(&config).await?;
    tracing::info!("Models, index and services ready");

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

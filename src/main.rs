use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ip_mapper::{
    create_router, init_metrics, AppConfig, GeoClient, IpGeolocator, RowRegistry, SharedNow,
};

#[tokio::main]
async fn main() -> Result<()> {
    let metrics_handle = init_metrics();

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ip_mapper=debug,tower_http=debug".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    let geolocator: Arc<dyn IpGeolocator> = Arc::new(GeoClient::new(&config.lookup)?);
    info!("Geolocation client initialized");

    let now = Arc::new(SharedNow::new(Duration::from_millis(
        config.clock.tick_interval_ms,
    )));
    now.start();
    info!(tick_interval_ms = config.clock.tick_interval_ms, "Shared clock started");

    let registry = Arc::new(RowRegistry::new(Arc::clone(&geolocator), Arc::clone(&now)));

    let router = create_router(Arc::clone(&registry), Arc::clone(&geolocator), metrics_handle);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(host = %config.server.host, port = %config.server.port, "API server listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "API server error");
        }
    });

    signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server_handle.abort();
    now.stop();

    info!("Application stopped");
    Ok(())
}

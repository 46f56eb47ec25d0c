use std::sync::Arc;

use anyhow::Context;
use quantum_core::{QuantumService, ServiceConfig};
use quantum_http::{init_tracing, router};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = ServiceConfig::from_env().context("reading configuration")?;
    info!(config = ?cfg, "starting QuantumRequest API");

    let service = Arc::new(QuantumService::from_config(&cfg)?);
    let app = router(service, &cfg.cors_origins)?;

    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    info!(addr = %cfg.bind, "QuantumRequest API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use catalog_core::config::Config;
use catalog_server::{app_router, init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let state = AppState::from_settings(&settings).await?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!(%addr, backend = ?settings.store.backend, model = %settings.embedding.model, "catalog-server listening");

    axum::serve(listener, app_router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    info!("catalog-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; run until killed
        std::future::pending::<()>().await;
    }
}

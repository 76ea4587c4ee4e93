use crate::config::GatewayConfig;
use crate::routes::router;
use crate::state::AppState;

pub async fn run_server(config: &GatewayConfig, state: AppState) -> anyhow::Result<()> {
    let app = router(state, config.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Detection API listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Detection API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

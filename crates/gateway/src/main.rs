use gateway::{AppState, get_configuration, logging::setup_logging, server::run_server};
use inference::{Detector, backend::ort::OrtBackend};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;

    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let detector = Detector::<OrtBackend>::load(config.detector.clone())?;
    let state = AppState::new(Arc::new(detector));

    run_server(&config, state).await
}

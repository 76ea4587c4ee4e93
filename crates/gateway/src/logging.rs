use crate::config::GatewayConfig;
use common::TelemetryGuard;

/// Installs the tracing subscriber. With an OTLP endpoint configured the
/// returned guard must be kept alive for the lifetime of the server.
pub fn setup_logging(config: &GatewayConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match config.otel_endpoint.as_deref() {
        Some(endpoint) => Ok(Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            config.environment,
        )?)),
        None => {
            common::setup_logging(config.environment);
            Ok(None)
        }
    }
}

use common::Environment;
use inference::DetectorConfig;
use serde::Deserialize;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub listen_addr: String,
    pub body_limit_bytes: usize,
    #[serde(default)]
    pub otel_endpoint: Option<String>,
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// Defaults overridden by `GATEWAY_*` environment variables; nested detector
/// settings use `__`, e.g. `GATEWAY_DETECTOR__CONFIDENCE_THRESHOLD=0.4`.
pub fn get_configuration() -> Result<GatewayConfig, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("environment", "development")?
        .set_default("listen_addr", DEFAULT_LISTEN_ADDR)?
        .set_default("body_limit_bytes", DEFAULT_BODY_LIMIT_BYTES as u64)?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: GatewayConfig = config.try_deserialize::<GatewayConfig>()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference::ExecutionProvider;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 5] = [
        "GATEWAY_ENVIRONMENT",
        "GATEWAY_LISTEN_ADDR",
        "GATEWAY_DETECTOR__CONFIDENCE_THRESHOLD",
        "GATEWAY_DETECTOR__MODEL_PATH",
        "GATEWAY_DETECTOR__EXECUTION_PROVIDER",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();

        let config = get_configuration().unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.body_limit_bytes, DEFAULT_BODY_LIMIT_BYTES);
        assert!(config.otel_endpoint.is_none());
        assert_eq!(config.detector.max_detections, 10);
        assert_eq!(config.detector.model_path, "weights/best.onnx");
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        unsafe {
            env::set_var("GATEWAY_ENVIRONMENT", "production");
            env::set_var("GATEWAY_LISTEN_ADDR", "127.0.0.1:9000");
            env::set_var("GATEWAY_DETECTOR__CONFIDENCE_THRESHOLD", "0.4");
            env::set_var("GATEWAY_DETECTOR__MODEL_PATH", "/models/logo.onnx");
            env::set_var("GATEWAY_DETECTOR__EXECUTION_PROVIDER", "cuda");
        }

        let config = get_configuration().unwrap();
        clear_env();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert!((config.detector.confidence_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.detector.model_path, "/models/logo.onnx");
        assert_eq!(config.detector.execution_provider, ExecutionProvider::Cuda);
        // Untouched detector fields keep their defaults
        assert_eq!(config.detector.input_size, 640);
    }

    #[test]
    #[serial]
    fn test_short_production_name_accepted() {
        clear_env();
        unsafe { env::set_var("GATEWAY_ENVIRONMENT", "prod") };

        let config = get_configuration();
        clear_env();

        assert_eq!(config.unwrap().environment, Environment::Production);
    }
}

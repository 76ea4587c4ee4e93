use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    layer::{Identity, Layered, SubscriberExt},
    util::SubscriberInitExt,
};

pub(crate) type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Uses RUST_LOG environment variable for filtering (defaults to "info" if not set).
pub fn setup_logging(environment: Environment) {
    install_subscriber(environment, None::<Identity>);
}

/// Installs the global subscriber, optionally with an extra layer between the
/// filter and the formatter (the OpenTelemetry bridge in `TelemetryGuard`).
pub(crate) fn install_subscriber<L>(environment: Environment, extra: Option<L>)
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let registry = tracing_subscriber::registry().with(env_filter).with(extra);

    let result = match environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json().with_level(true))
            .try_init(),
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
            .try_init(),
    };

    // Tests and tools may call this more than once; the first subscriber wins.
    if let Err(e) = result {
        tracing::debug!("tracing subscriber already installed: {}", e);
    }
}

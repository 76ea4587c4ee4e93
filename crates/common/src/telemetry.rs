use crate::Environment;
use crate::logging::install_subscriber;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Meter;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use std::time::Duration;

const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Owns the OTLP trace and metric pipelines for the lifetime of a process.
///
/// Dropping the guard flushes buffered spans and the last metric interval.
///
/// ```ignore
/// let _telemetry = TelemetryGuard::init("gateway", "http://localhost:4317", Environment::Production)?;
/// ```
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl TelemetryGuard {
    /// Installs the global providers plus a `tracing` subscriber that
    /// forwards spans to the collector at `endpoint`.
    pub fn init(
        service_name: &str,
        endpoint: &str,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let resource = service_resource(service_name);
        let tracer_provider = build_tracer_provider(endpoint, resource.clone())?;
        let meter_provider = build_meter_provider(endpoint, resource)?;

        global::set_tracer_provider(tracer_provider.clone());
        global::set_meter_provider(meter_provider.clone());

        let otel_layer = tracing_opentelemetry::layer()
            .with_tracer(tracer_provider.tracer(service_name.to_string()));
        install_subscriber(environment, Some(otel_layer));

        tracing::info!(service_name, endpoint, "OpenTelemetry export enabled");

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // The subscriber may already be gone at this point, so report on stderr
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("Tracer provider shutdown failed: {e:?}");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("Meter provider shutdown failed: {e:?}");
        }
    }
}

fn service_resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

fn build_tracer_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_batch_exporter(exporter)
        .build())
}

fn build_meter_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(METRIC_EXPORT_INTERVAL)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

/// Meter from the global provider. Without an initialized `TelemetryGuard`
/// this is a no-op meter, so instruments can be created unconditionally.
pub fn meter(name: &'static str) -> Meter {
    global::meter(name)
}

/// Creates an info-level span and enters it.
#[macro_export]
macro_rules! span {
    ($name:literal) => {
        tracing::info_span!($name).entered()
    };
}

/// Creates a debug-level span and enters it.
#[macro_export]
macro_rules! span_debug {
    ($name:literal) => {
        tracing::debug_span!($name).entered()
    };
}

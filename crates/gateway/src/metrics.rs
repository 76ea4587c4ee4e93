use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram},
};

/// Request-level instruments. Without a configured exporter the global meter
/// is a no-op, so recording is always safe.
pub struct RequestMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    detections: Counter<u64>,
    failures: Counter<u64>,
}

impl RequestMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = common::telemetry::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.5, 5.0,
        ];
        let duration = meter
            .f64_histogram("detect_request_duration_seconds")
            .with_description("Time to serve one /detect request (decode + inference + encode)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build();
        let requests = meter
            .u64_counter("detect_requests_total")
            .with_description("Total /detect requests")
            .build();
        let detections = meter
            .u64_counter("detect_detections_total")
            .with_description("Total boxes returned")
            .build();
        let failures = meter
            .u64_counter("detect_failures_total")
            .with_description("Requests answered with an error, by kind")
            .build();

        Self {
            duration,
            requests,
            detections,
            failures,
        }
    }

    pub fn record_success(&self, elapsed_secs: f64, detections: usize) {
        self.requests.add(1, &[]);
        self.duration.record(elapsed_secs, &[KeyValue::new("outcome", "ok")]);
        self.detections.add(detections as u64, &[]);
    }

    pub fn record_failure(&self, elapsed_secs: f64, kind: &'static str) {
        self.requests.add(1, &[]);
        self.duration
            .record(elapsed_secs, &[KeyValue::new("outcome", "error")]);
        self.failures.add(1, &[KeyValue::new("kind", kind)]);
    }
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new("gateway")
    }
}

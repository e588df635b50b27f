//! Dispatcher metrics definitions
//!
//! OpenTelemetry instruments recorded by the [`Dispatcher`](crate::Dispatcher)
//! when metrics are enabled on its builder. They are exported through
//! whatever meter provider is installed globally (see
//! `jbatch_core::init_observability`).
//!
//! # Metrics Collected
//!
//! - **requests_total**: Requests dispatched, by method and outcome (counter)
//! - **request_duration**: Handler latency in seconds (histogram)
//! - **batch_size**: Number of requests per batch body (histogram)
//! - **errors_total**: Failure responses, by kind (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use jbatch_server::ServerMetrics;
//!
//! let metrics = ServerMetrics::new("orders-api");
//! metrics.record_request("getData", "success", 0.025);
//! metrics.record_batch(3, "parallel");
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Dispatcher metrics
///
/// All instruments are prefixed with `jbatch.server.*`.
pub struct ServerMetrics {
    /// Total number of requests dispatched
    pub requests_total: Counter<u64>,
    /// Handler duration in seconds
    pub request_duration: Histogram<f64>,
    /// Batch size distribution
    pub batch_size: Histogram<u64>,
    /// Total number of failure responses
    pub errors_total: Counter<u64>,
}

impl ServerMetrics {
    /// Create metrics on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("jbatch.server.requests.total")
                .with_description("Total number of requests dispatched")
                .build(),
            request_duration: meter
                .f64_histogram("jbatch.server.request.duration")
                .with_description("Handler duration in seconds")
                .build(),
            batch_size: meter
                .u64_histogram("jbatch.server.batch.size")
                .with_description("Number of requests in batch bodies")
                .build(),
            errors_total: meter
                .u64_counter("jbatch.server.errors.total")
                .with_description("Total number of failure responses")
                .build(),
        }
    }

    /// Record one dispatched request
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record a batch body
    pub fn record_batch(&self, size: u64, mode: &str) {
        let attributes = &[KeyValue::new("mode", mode.to_string())];
        self.batch_size.record(size, attributes);
    }

    /// Record a failure response
    pub fn record_error(&self, kind: &str) {
        let attributes = &[KeyValue::new("kind", kind.to_string())];
        self.errors_total.add(1, attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record_without_provider() {
        // The global no-op provider accepts every recording
        let metrics = ServerMetrics::new("test-service");
        metrics.record_request("getData", "success", 0.01);
        metrics.record_batch(2, "parallel");
        metrics.record_error("method_not_found");
    }
}

//! Client metrics definitions
//!
//! OpenTelemetry instruments recorded by the batching scheduler. They are
//! exported through the globally installed meter provider.
//!
//! # Metrics Collected
//!
//! - **calls_total**: Calls issued, by method (counter)
//! - **batches_total**: Transport calls made, by outcome (counter)
//! - **batch_size**: Calls per transport call (histogram)
//! - **transport_duration**: Transport round trip in seconds (histogram)
//! - **errors_total**: Batch and correlation failures, by kind (counter)
//!
//! # Usage
//!
//! Metrics are recorded automatically when enabled via
//! `ClientBuilder::with_metrics()` or `ClientBuilder::with_observability()`.
//!
//! ```rust,no_run
//! use jbatch_client::ClientMetrics;
//!
//! let metrics = ClientMetrics::new("orders-web");
//! metrics.record_batch(3, 0.042, true);
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Total number of calls issued
    pub calls_total: Counter<u64>,
    /// Total number of transport calls
    pub batches_total: Counter<u64>,
    /// Batch size distribution
    pub batch_size: Histogram<u64>,
    /// Transport round trip in seconds
    pub transport_duration: Histogram<f64>,
    /// Total number of errors
    pub errors_total: Counter<u64>,
}

impl ClientMetrics {
    /// Create metrics on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            calls_total: meter
                .u64_counter("jbatch.client.calls.total")
                .with_description("Total number of calls issued")
                .build(),
            batches_total: meter
                .u64_counter("jbatch.client.batches.total")
                .with_description("Total number of transport calls")
                .build(),
            batch_size: meter
                .u64_histogram("jbatch.client.batch.size")
                .with_description("Number of calls per transport call")
                .build(),
            transport_duration: meter
                .f64_histogram("jbatch.client.transport.duration")
                .with_description("Transport round trip in seconds")
                .build(),
            errors_total: meter
                .u64_counter("jbatch.client.errors.total")
                .with_description("Total number of errors")
                .build(),
        }
    }

    /// Record a call entering a batch
    pub fn record_call(&self, method: &str) {
        let attributes = &[KeyValue::new("method", method.to_string())];
        self.calls_total.add(1, attributes);
    }

    /// Record a settled transport call
    pub fn record_batch(&self, size: u64, duration_secs: f64, success: bool) {
        let status = if success { "success" } else { "error" };
        let attributes = &[KeyValue::new("status", status)];
        self.batches_total.add(1, attributes);
        self.batch_size.record(size, attributes);
        self.transport_duration.record(duration_secs, attributes);
        if !success {
            self.record_error("transport");
        }
    }

    /// Record an error
    pub fn record_error(&self, kind: &str) {
        let attributes = &[KeyValue::new("kind", kind.to_string())];
        self.errors_total.add(1, attributes);
    }
}

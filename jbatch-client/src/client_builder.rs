//! Builder for configuring batching clients
//!
//! # Configuration Options
//!
//! - **Transport**: Required; sends one body per batch
//! - **Max batch size**: Flush a batch as soon as it holds this many calls
//! - **Metrics**: Record OpenTelemetry metrics under a service name
//! - **Observability**: Install the tracing subscriber and exporters
//!
//! # Examples
//!
//! ```rust,no_run
//! use jbatch_client::{transport, BatchClient};
//! use jbatch_core::{JsonRpcResponse, ObservabilityConfig, RequestBody, ResponseBody};
//!
//! # fn example() -> jbatch_core::Result<()> {
//! let client = BatchClient::builder()
//!     .transport(transport::from_fn(|body: RequestBody| async move {
//!         let responses = body
//!             .into_requests()
//!             .into_iter()
//!             .map(|r| JsonRpcResponse::success(serde_json::Value::Null, r.id))
//!             .collect();
//!         Ok(ResponseBody::Batch(responses))
//!     }))
//!     .max_batch_size(50)
//!     .with_observability(ObservabilityConfig::new("orders-web"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::metrics::ClientMetrics;
use crate::scheduler::BatchScheduler;
use crate::transport::Transport;
use crate::BatchClient;
use jbatch_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;

/// Builder for a [`BatchClient`]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    max_batch_size: Option<usize>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a builder without a transport
    pub fn new() -> Self {
        Self {
            transport: None,
            max_batch_size: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Set the transport
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set a transport that is shared with other clients
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Flush a batch as soon as it holds `max_size` calls
    pub fn max_batch_size(mut self, max_size: usize) -> Self {
        self.max_batch_size = Some(max_size.max(1));
        self
    }

    /// Record metrics under a service name
    pub fn with_metrics(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// Install logging and OpenTelemetry with this configuration on build
    ///
    /// Also enables metrics under the configured service name.
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Install logging and OpenTelemetry with default settings on build
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Build the client
    ///
    /// Fails if no transport was set or observability cannot be installed.
    pub fn build(self) -> Result<BatchClient> {
        let transport = self
            .transport
            .ok_or_else(|| Error::Internal("No transport configured".to_string()))?;

        let metrics_name = match self.observability_config {
            Some(mut config) => {
                if let Some(name) = &self.service_name {
                    config.service_name = name.clone();
                }
                let name = config.service_name.clone();

                jbatch_core::init_observability(config).map_err(|e| {
                    Error::Internal(format!("Failed to initialize observability: {}", e))
                })?;
                Some(name)
            }
            None => self.service_name,
        };

        let metrics = metrics_name.map(|name| Arc::new(ClientMetrics::new(name)));

        tracing::debug!(
            max_batch_size = ?self.max_batch_size,
            metrics = metrics.is_some(),
            "Batch client built"
        );

        Ok(BatchClient::from_scheduler(BatchScheduler::new(
            transport,
            self.max_batch_size,
            metrics,
        )))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::from_fn;
    use jbatch_core::{RequestBody, ResponseBody};

    fn empty_transport() -> impl Transport {
        from_fn(|_body: RequestBody| async { Ok(ResponseBody::Batch(Vec::new())) })
    }

    #[test]
    fn test_build_requires_transport() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn test_builder_options() {
        let builder = ClientBuilder::new()
            .transport(empty_transport())
            .max_batch_size(0)
            .with_metrics("test-client");

        assert_eq!(builder.max_batch_size, Some(1));
        assert_eq!(builder.service_name.as_deref(), Some("test-client"));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_builder_observability_config() {
        let config = ObservabilityConfig::new("test-client")
            .with_endpoint("http://localhost:4317")
            .with_log_level("debug");

        let builder = ClientBuilder::new()
            .transport(empty_transport())
            .with_observability(config);

        let obs_config = builder.observability_config.as_ref().unwrap();
        assert_eq!(obs_config.service_name, "test-client");
        assert_eq!(obs_config.log_level, "debug");
    }
}

//! Builder for constructing dispatchers
//!
//! The builder provides a fluent API for configuring a [`Dispatcher`]:
//! - Register method handlers
//! - Configure batch processing (mode and size limit)
//! - Enable metrics
//!
//! # Examples
//!
//! ```rust
//! use jbatch_server::{BatchMode, Dispatcher, from_fn};
//! use std::sync::Arc;
//!
//! let dispatcher: Dispatcher<()> = Dispatcher::builder()
//!     .handler("ping", from_fn(|_ctx: Arc<()>, _params| async {
//!         Ok(serde_json::json!("pong"))
//!     }))
//!     .batch_mode(BatchMode::Sequential)
//!     .max_batch_size(100)
//!     .build();
//!
//! assert!(dispatcher.has_method("ping"));
//! ```

use crate::{BatchMode, BatchProcessor, Dispatcher, Handler, ServerMetrics};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing a dispatcher
pub struct DispatcherBuilder<C> {
    handlers: HashMap<String, Arc<dyn Handler<C>>>,
    batch_mode: BatchMode,
    max_batch_size: Option<usize>,
    metrics: Option<Arc<ServerMetrics>>,
}

impl<C: Send + Sync + 'static> DispatcherBuilder<C> {
    /// Create a new dispatcher builder
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            batch_mode: BatchMode::default(),
            max_batch_size: None,
            metrics: None,
        }
    }

    /// Register a handler for a method
    pub fn handler(mut self, method: impl Into<String>, handler: Box<dyn Handler<C>>) -> Self {
        self.handlers.insert(method.into(), Arc::from(handler));
        self
    }

    /// Set the batch processing mode
    pub fn batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    /// Set the maximum number of requests accepted in one batch
    pub fn max_batch_size(mut self, max_size: usize) -> Self {
        self.max_batch_size = Some(max_size);
        self
    }

    /// Record metrics on the global meter named after the service
    pub fn with_metrics(mut self, service_name: impl Into<String>) -> Self {
        self.metrics = Some(Arc::new(ServerMetrics::new(service_name)));
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Dispatcher<C> {
        tracing::debug!(
            methods = self.handlers.len(),
            mode = self.batch_mode.as_str(),
            max_batch_size = ?self.max_batch_size,
            "Dispatcher built"
        );

        Dispatcher::from_parts(
            self.handlers,
            BatchProcessor::with_limit(self.batch_mode, self.max_batch_size),
            self.metrics,
        )
    }
}

impl<C: Send + Sync + 'static> Default for DispatcherBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

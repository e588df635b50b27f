//! Batch processing for JSON-RPC requests
//!
//! A request body may hold several requests as an array. Every item is
//! dispatched independently: one item failing never aborts its siblings, and
//! the returned responses always mirror the input order by position.
//!
//! # Batch Modes
//!
//! - **Parallel**: Run all items concurrently (default)
//! - **Sequential**: Run items one after another, in order
//!
//! # Size Limiting
//!
//! A maximum batch size can be configured. An oversized batch is answered
//! with a single `-32600` failure carrying a null id, and no handler runs.
//!
//! # Examples
//!
//! ```rust
//! use jbatch_server::{BatchMode, BatchProcessor};
//!
//! // Parallel processing with 100-request limit
//! let processor = BatchProcessor::with_limit(BatchMode::Parallel, Some(100));
//!
//! // Sequential processing, unlimited size
//! let sequential = BatchProcessor::new(BatchMode::Sequential);
//! ```

use futures::future::join_all;
use jbatch_core::{Id, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse};
use std::future::Future;

/// Mode for processing batch requests
///
/// Both modes return responses in input order; they only differ in whether
/// handlers overlap in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Run every item concurrently
    #[default]
    Parallel,

    /// Run items in order, each one after the previous has settled
    ///
    /// Use this when handlers in one batch depend on each other's effects.
    Sequential,
}

impl BatchMode {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMode::Parallel => "parallel",
            BatchMode::Sequential => "sequential",
        }
    }
}

/// Processor for handling batch requests
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchProcessor {
    mode: BatchMode,
    max_size: Option<usize>,
}

impl BatchProcessor {
    /// Create a new batch processor with the specified mode
    pub fn new(mode: BatchMode) -> Self {
        Self { mode, max_size: None }
    }

    /// Create a new batch processor with mode and max batch size
    pub fn with_limit(mode: BatchMode, max_size: Option<usize>) -> Self {
        Self { mode, max_size }
    }

    /// Configured execution mode
    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Configured size limit
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Run `handle_one` for every request and collect the responses in order
    #[tracing::instrument(skip(self, requests, handle_one), fields(batch_size = requests.len(), mode = self.mode.as_str()))]
    pub async fn process<F, Fut>(
        &self,
        requests: Vec<JsonRpcRequest>,
        handle_one: F,
    ) -> Vec<JsonRpcResponse>
    where
        F: Fn(JsonRpcRequest) -> Fut,
        Fut: Future<Output = JsonRpcResponse>,
    {
        if let Some(max_size) = self.max_size {
            if requests.len() > max_size {
                tracing::warn!(
                    batch_size = requests.len(),
                    max_size = max_size,
                    "Batch size exceeded"
                );
                return vec![JsonRpcResponse::error(
                    JsonRpcErrorData::batch_size_exceeded(max_size, requests.len()),
                    Id::Null,
                )];
            }
        }

        let responses = match self.mode {
            BatchMode::Parallel => join_all(requests.into_iter().map(handle_one)).await,
            BatchMode::Sequential => {
                let mut responses = Vec::with_capacity(requests.len());
                for request in requests {
                    responses.push(handle_one(request).await);
                }
                responses
            }
        };

        tracing::debug!(response_count = responses.len(), "Batch processing completed");
        responses
    }
}

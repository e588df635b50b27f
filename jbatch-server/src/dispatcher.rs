//! Dispatcher mapping method names to handlers
//!
//! The dispatcher looks up each request's method in its handler map, invokes
//! the handler with the shared context followed by the request's params, and
//! normalizes every outcome into a response envelope. It never fails: handler
//! errors and panics become failure responses.
//!
//! # Failure Classification
//!
//! | Handler outcome             | Code         | `isRpcError` |
//! |-----------------------------|--------------|--------------|
//! | `Err(Error::Rpc(e))`        | `e.code`     | `true`       |
//! | `Err(Error::Rpc(e))`, code 0 | `-32000`    | `true`       |
//! | any other `Err(..)`         | `-32000`     | `false`      |
//! | panic                       | `-32000`     | `false`      |
//! | method not registered       | `-32601`     | (no data)    |
//!
//! Handler failures always carry [`FailureDetails`] in `error.data`.
//!
//! # Examples
//!
//! ```rust
//! use jbatch_core::{JsonRpcRequest, RequestBody, ResponseBody};
//! use jbatch_server::{from_typed_fn, Dispatcher};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Session { user_id: String }
//!
//! # async fn example() {
//! let dispatcher = Dispatcher::builder()
//!     .handler("getData", from_typed_fn(|ctx: Arc<Session>, (id,): (String,)| async move {
//!         Ok(json!({"id": id, "userId": ctx.user_id}))
//!     }))
//!     .build();
//!
//! let request = JsonRpcRequest::new("getData", vec![json!("test-id")], "1");
//! let session = Session { user_id: "user-123".into() };
//!
//! match dispatcher.handle(RequestBody::Single(request), session).await {
//!     ResponseBody::Single(response) => {
//!         assert_eq!(response.result, Some(json!({"id": "test-id", "userId": "user-123"})));
//!     }
//!     ResponseBody::Batch(_) => unreachable!(),
//! }
//! # }
//! ```

use crate::batch::BatchProcessor;
use crate::builder::DispatcherBuilder;
use crate::handler::Handler;
use crate::metrics::ServerMetrics;
use futures::FutureExt;
use jbatch_core::error::SERVER_ERROR;
use jbatch_core::{
    Error, FailureDetails, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, RequestBody,
    ResponseBody,
};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Type name reported for handler panics
const PANIC_NAME: &str = "Panic";

/// Method dispatcher for one context type
///
/// Cloning is cheap: the handler map is shared behind an `Arc`.
pub struct Dispatcher<C> {
    handlers: Arc<HashMap<String, Arc<dyn Handler<C>>>>,
    processor: BatchProcessor,
    metrics: Option<Arc<ServerMetrics>>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            processor: self.processor,
            metrics: self.metrics.clone(),
        }
    }
}

impl<C: Send + Sync + 'static> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> Dispatcher<C> {
    /// Create a dispatcher with no handlers
    pub fn new() -> Self {
        Self::from_parts(HashMap::new(), BatchProcessor::default(), None)
    }

    /// Start building a dispatcher
    pub fn builder() -> DispatcherBuilder<C> {
        DispatcherBuilder::new()
    }

    pub(crate) fn from_parts(
        handlers: HashMap<String, Arc<dyn Handler<C>>>,
        processor: BatchProcessor,
        metrics: Option<Arc<ServerMetrics>>,
    ) -> Self {
        Self {
            handlers: Arc::new(handlers),
            processor,
            metrics,
        }
    }

    /// Register a handler for a method, replacing any previous one
    pub fn register(&mut self, method: impl Into<String>, handler: Box<dyn Handler<C>>) {
        let handlers = Arc::make_mut(&mut self.handlers);
        handlers.insert(method.into(), Arc::from(handler));
    }

    /// Check if a method is registered
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// All registered method names
    pub fn methods(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Dispatch a request body
    ///
    /// A single request yields a single response; a batch yields an array
    /// with one response per request, in input order. The context is shared
    /// by every request in the body.
    #[tracing::instrument(skip_all, fields(batch = body.is_batch(), size = body.len()))]
    pub async fn handle(&self, body: RequestBody, ctx: impl Into<Arc<C>>) -> ResponseBody {
        let ctx: Arc<C> = ctx.into();

        match body {
            RequestBody::Single(request) => {
                ResponseBody::Single(self.handle_request(request, ctx).await)
            }
            RequestBody::Batch(requests) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_batch(requests.len() as u64, self.processor.mode().as_str());
                }

                let this = self;
                let responses = self
                    .processor
                    .process(requests, move |request| {
                        this.handle_request(request, Arc::clone(&ctx))
                    })
                    .await;
                ResponseBody::Batch(responses)
            }
        }
    }

    /// Dispatch one request
    #[tracing::instrument(skip(self, request, ctx), fields(method = %request.method, id = %request.id))]
    pub async fn handle_request(&self, request: JsonRpcRequest, ctx: Arc<C>) -> JsonRpcResponse {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;

        let Some(handler) = self.handlers.get(&method).cloned() else {
            tracing::debug!("Method not found");
            self.record(&method, "not_found", 0.0);
            return JsonRpcResponse::error(JsonRpcErrorData::method_not_found(), id);
        };

        let start = Instant::now();
        let outcome = AssertUnwindSafe(async move { handler.handle(ctx, params).await })
            .catch_unwind()
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            Ok(Ok(result)) => {
                self.record(&method, "success", elapsed);
                JsonRpcResponse::success(result, id)
            }
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "Handler failed");
                self.record(&method, "error", elapsed);
                JsonRpcResponse::error(failure_from_error(err), id)
            }
            Err(payload) => {
                let failure = failure_from_panic(payload);
                tracing::error!(panic = %failure.message, "Handler panicked");
                self.record(&method, "panic", elapsed);
                JsonRpcResponse::error(failure, id)
            }
        }
    }

    fn record(&self, method: &str, status: &str, duration_secs: f64) {
        if let Some(metrics) = &self.metrics {
            metrics.record_request(method, status, duration_secs);
            if status != "success" {
                metrics.record_error(status);
            }
        }
    }
}

/// Convert a handler error into a wire failure
///
/// Domain failures keep their code (unless it is 0), message and own data;
/// everything else is reported with `-32000`.
fn failure_from_error(err: Error) -> JsonRpcErrorData {
    match err {
        Error::Rpc(rpc) => {
            let stack = rpc
                .stack
                .clone()
                .unwrap_or_else(|| render_stack("RpcError", &rpc.message, None));
            let details = FailureDetails::new("RpcError", rpc.message.as_str(), stack, true)
                .with_data(rpc.data);
            // Code 0 is not a usable domain code
            let code = if rpc.code == 0 { SERVER_ERROR } else { rpc.code };
            JsonRpcErrorData::with_data(code, rpc.message, details.to_value())
        }
        other => {
            let message = other.message();
            let stack = render_stack(other.name(), &message, std::error::Error::source(&other));
            let details = FailureDetails::new(other.name(), message.as_str(), stack, false);
            JsonRpcErrorData::with_data(SERVER_ERROR, message, details.to_value())
        }
    }
}

/// Convert a caught panic into a wire failure
fn failure_from_panic(payload: Box<dyn Any + Send>) -> JsonRpcErrorData {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Handler panicked".to_string());

    let mut stack = format!("{}: {}", PANIC_NAME, message);
    append_backtrace(&mut stack);

    let details = FailureDetails::new(PANIC_NAME, message.as_str(), stack, false);
    JsonRpcErrorData::with_data(SERVER_ERROR, message, details.to_value())
}

/// Render `name: message`, the source chain, and the backtrace when enabled
fn render_stack(
    name: &str,
    message: &str,
    mut source: Option<&(dyn std::error::Error + 'static)>,
) -> String {
    let mut stack = format!("{}: {}", name, message);

    while let Some(cause) = source {
        let _ = write!(stack, "\n    caused by: {}", cause);
        source = cause.source();
    }

    append_backtrace(&mut stack);
    stack
}

fn append_backtrace(stack: &mut String) {
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        let _ = write!(stack, "\n{}", backtrace);
    }
}

//! JSON-RPC 2.0 dispatcher for batched and single requests
//!
//! This crate provides the server half of jbatch: a [`Dispatcher`] mapping
//! method names to async handlers, and an [`Endpoint`] adapter turning a raw
//! HTTP body into a status and a response body.
//!
//! # Core Features
//!
//! - **Context injection**: Every handler receives the caller's context
//!   (usually derived from a session) followed by the positional params
//! - **Typed handlers**: Params decode into a tuple, results serialize back
//! - **Batch dispatch**: Items run concurrently or sequentially, one item's
//!   failure never affects its siblings, and responses mirror input order
//! - **Failure classification**: Domain failures keep their code; anything
//!   else, including panics, is reported as `-32000`
//! - **Observability**: `tracing` spans per body and per request, optional
//!   OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jbatch_server::{from_typed_fn, Dispatcher, Endpoint};
//! use jbatch_core::RpcError;
//! use std::sync::Arc;
//!
//! struct Session { user_id: String }
//!
//! # async fn example() {
//! let dispatcher = Dispatcher::builder()
//!     .handler("getData", from_typed_fn(|ctx: Arc<Session>, (id,): (String,)| async move {
//!         if id.is_empty() {
//!             return Err(RpcError::new(400, "Missing id").into());
//!         }
//!         Ok(serde_json::json!({"id": id, "userId": ctx.user_id}))
//!     }))
//!     .build();
//!
//! let endpoint = Endpoint::new(dispatcher);
//! let session = Session { user_id: "user-123".into() };
//! let reply = endpoint
//!     .handle_raw(r#"{"jsonrpc":"2.0","method":"getData","params":["a"],"id":"1"}"#, session)
//!     .await;
//! assert_eq!(reply.status, 200);
//! # }
//! ```
//!
//! # Handler Errors
//!
//! Return `Err(RpcError::new(code, message).into())` for failures the caller
//! should handle: the code reaches the client unchanged and the client
//! rebuilds an `Error::Rpc`. Any other error becomes `-32000` and the client
//! rebuilds an `Error::Remote`.

mod batch;
mod builder;
mod dispatcher;
mod endpoint;
mod handler;
mod metrics;

pub use batch::{BatchMode, BatchProcessor};
pub use builder::DispatcherBuilder;
pub use dispatcher::Dispatcher;
pub use endpoint::{Endpoint, EndpointResponse, STATUS_OK, STATUS_SERVER_ERROR};
pub use handler::{from_fn, from_typed_fn, AsyncHandler, Handler, HandlerResult};
pub use metrics::ServerMetrics;

// Re-export core types
pub use jbatch_core::{Error, Id, JsonRpcRequest, JsonRpcResponse, RequestBody, ResponseBody, Result, RpcError};

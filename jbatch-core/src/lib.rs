//! Core types, error taxonomy and codec for jbatch
//!
//! This crate holds everything the batching client and the dispatcher have to
//! agree on:
//!
//! - **Types**: request / response envelopes, request and response bodies
//!   (bare envelope or array), and the serializable call descriptor
//! - **Error handling**: the error taxonomy, wire error objects, and the
//!   failure details that let a client tell domain failures from unexpected ones
//! - **Codec**: body encoding and decoding with JSON-RPC error mapping
//! - **Observability**: `tracing` subscriber and OpenTelemetry setup
//!
//! # Example
//!
//! ```rust
//! use jbatch_core::{codec, JsonRpcRequest, RequestBody};
//! use serde_json::json;
//!
//! let body = RequestBody::from_requests(vec![
//!     JsonRpcRequest::new("getData", vec![json!("a")], "1"),
//!     JsonRpcRequest::new("getData", vec![json!("b")], "2"),
//! ]);
//!
//! let json = codec::encode(&body).unwrap();
//! assert!(json.starts_with('['));
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{
    annotate_stack, Error, FailureDetails, JsonRpcErrorData, RemoteError, Result, RpcError,
};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{
    Id, JsonRpcRequest, JsonRpcResponse, RequestBody, ResponseBody, RpcMessage, JSONRPC_VERSION,
};

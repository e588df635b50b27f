//! Transport seam between the batching scheduler and the network
//!
//! The scheduler hands a transport one encoded-ready [`RequestBody`] per
//! batch (a bare request or an array) and expects the matching
//! [`ResponseBody`] back. Headers, credentials and the HTTP stack are the
//! transport's business.
//!
//! A transport must report a non-success outcome as
//! [`Error::Transport`](jbatch_core::Error::Transport) carrying the status and
//! its status text; the scheduler then rejects every call in the batch with it.
//!
//! # Examples
//!
//! ```rust
//! use jbatch_client::transport;
//! use jbatch_core::{JsonRpcResponse, RequestBody, ResponseBody};
//! use serde_json::json;
//!
//! // Answers every request with `null`
//! let nulls = transport::from_fn(|body: RequestBody| async move {
//!     let responses = body
//!         .into_requests()
//!         .into_iter()
//!         .map(|r| JsonRpcResponse::success(json!(null), r.id))
//!         .collect::<Vec<_>>();
//!     Ok(ResponseBody::Batch(responses))
//! });
//! ```

use async_trait::async_trait;
use jbatch_core::{RequestBody, ResponseBody, Result};
use std::future::Future;
use std::sync::Arc;

/// Sends one request body and returns the parsed response body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one round trip
    async fn send(&self, body: RequestBody) -> Result<ResponseBody>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, body: RequestBody) -> Result<ResponseBody> {
        (**self).send(body).await
    }
}

/// Transport backed by an async closure
pub struct FnTransport<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(RequestBody) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseBody>> + Send + 'static,
{
    async fn send(&self, body: RequestBody) -> Result<ResponseBody> {
        (self.func)(body).await
    }
}

/// Create a transport from an async closure
pub fn from_fn<F, Fut>(func: F) -> FnTransport<F>
where
    F: Fn(RequestBody) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseBody>> + Send + 'static,
{
    FnTransport { func }
}

/// Standard reason phrase for an HTTP status
///
/// Transports without a status text of their own use this for the message
/// of [`Error::Transport`](jbatch_core::Error::Transport).
pub fn status_text(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}

//! In-process transport
//!
//! [`LocalTransport`] drives an [`Endpoint`] directly, going through the same
//! JSON encoding as an HTTP deployment. Useful for tests, demos, and
//! applications that host the client and the dispatcher in one process.

use async_trait::async_trait;
use jbatch_client::transport::{status_text, Transport};
use jbatch_core::{codec, Error, RequestBody, ResponseBody, Result};
use jbatch_server::Endpoint;
use std::sync::Arc;

/// Transport that hands every body to an in-process endpoint
///
/// Every request body is dispatched with the same context.
pub struct LocalTransport<C> {
    endpoint: Endpoint<C>,
    context: Arc<C>,
}

impl<C: Send + Sync + 'static> LocalTransport<C> {
    /// Create a transport dispatching through `endpoint` with `context`
    pub fn new(endpoint: Endpoint<C>, context: impl Into<Arc<C>>) -> Self {
        Self {
            endpoint,
            context: context.into(),
        }
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> Transport for LocalTransport<C> {
    async fn send(&self, body: RequestBody) -> Result<ResponseBody> {
        let raw = codec::encode_request_body(&body)?;
        tracing::trace!(body = %raw, "Local request");

        let reply = self
            .endpoint
            .handle_raw(&raw, Arc::clone(&self.context))
            .await;

        if !reply.is_ok() {
            return Err(Error::Transport {
                status: reply.status,
                message: status_text(reply.status).to_string(),
            });
        }

        codec::decode_response_body(&reply.body)
    }
}

//! Batching JSON-RPC client
//!
//! [`BatchClient::call`] returns a [`Call`] future immediately and queues
//! the request in the open batch. Every call created before the caller first
//! awaits shares one transport round trip:
//!
//! ```rust,no_run
//! use jbatch_client::BatchClient;
//! # use jbatch_client::transport::Transport;
//! # async fn example(transport: impl Transport + 'static) -> jbatch_core::Result<()> {
//! let client = BatchClient::new(transport);
//!
//! // One transport call carrying a two-element array
//! let (a, b) = tokio::join!(
//!     client.call::<_, serde_json::Value>("getData", ("test-id-1",)),
//!     client.call::<_, serde_json::Value>("getData", ("test-id-2",)),
//! );
//!
//! // A later call starts a new batch
//! let c: serde_json::Value = client.call("getData", ("test-id-3",)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Params
//!
//! Params are a tuple, one element per positional param: `(a, b)` is sent as
//! `[a, b]`, `(vec![1, 2],)` as `[[1, 2]]` and `()` as `[]`. See
//! [`Params`](crate::Params).
//!
//! # When the batch is sent
//!
//! A batch is sent when one of its calls is first awaited (or dropped), or on
//! [`BatchClient::flush`]. A call that is created and then left alone while
//! the task awaits something else is not sent until it is awaited itself:
//! await it first, join it with the other work, or call `flush()` before the
//! unrelated await.

use crate::client_builder::ClientBuilder;
use crate::message::MessageBuilder;
use crate::params::Params;
use crate::scheduler::{BatchScheduler, Call};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Client that batches concurrent calls
///
/// Cloning is cheap and clones share the same open batch.
#[derive(Clone)]
pub struct BatchClient {
    scheduler: Arc<BatchScheduler>,
    messages: MessageBuilder,
}

impl BatchClient {
    /// Create a client with default settings
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_scheduler(BatchScheduler::new(Arc::new(transport), None, None))
    }

    /// Start building a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_scheduler(scheduler: BatchScheduler) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            messages: MessageBuilder::new(),
        }
    }

    /// Queue a call and return its future
    ///
    /// The request joins the open batch right away, before the future is
    /// polled, and the batch is sent once any of its calls is awaited. Keep
    /// the returned future moving: awaiting something unrelated first leaves
    /// the batch unsent until this call (or [`flush`](Self::flush)) runs.
    ///
    /// Params that cannot be serialized fail the call without queueing it.
    pub fn call<P, R>(&self, method: impl Into<String>, params: P) -> Call<R>
    where
        P: Params,
        R: DeserializeOwned,
    {
        match params.into_params() {
            Ok(params) => self.scheduler.enqueue(method.into(), params),
            Err(err) => Call::failed(err),
        }
    }

    /// Queue a call with already-encoded positional params
    pub fn call_raw(&self, method: impl Into<String>, params: Vec<Value>) -> Call<Value> {
        self.scheduler.enqueue(method.into(), params)
    }

    /// Message builder for descriptors that are not sent
    pub fn message(&self) -> &MessageBuilder {
        &self.messages
    }

    /// Send the open batch now instead of on the next await
    pub fn flush(&self) {
        self.scheduler.flush_now();
    }

    /// Number of calls waiting in the open batch
    pub fn pending_count(&self) -> usize {
        self.scheduler.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::from_fn;
    use jbatch_core::{Error, JsonRpcResponse, RequestBody, ResponseBody};
    use serde_json::json;
    use std::collections::HashMap;

    fn echo_client() -> BatchClient {
        BatchClient::new(from_fn(|body: RequestBody| async move {
            let responses = body
                .into_requests()
                .into_iter()
                .map(|r| JsonRpcResponse::success(Value::Array(r.params), r.id))
                .collect();
            Ok(ResponseBody::Batch(responses))
        }))
    }

    #[tokio::test]
    async fn test_sequence_param_is_sent_as_one_param() {
        let client = echo_client();

        let params: Value = client.call("sum", (vec![1, 2, 3],)).await.unwrap();
        assert_eq!(params, json!([[1, 2, 3]]));
    }

    #[tokio::test]
    async fn test_none_param_is_sent_as_null() {
        let client = echo_client();

        let (none, some) = tokio::join!(
            client.call::<_, Value>("opt", (None::<i32>,)),
            client.call::<_, Value>("opt", (Some(4),)),
        );
        assert_eq!(none.unwrap(), json!([null]));
        assert_eq!(some.unwrap(), json!([4]));
    }

    #[tokio::test]
    async fn test_unserializable_params_fail_the_call() {
        let client = echo_client();

        // Non-string map keys cannot be encoded as JSON
        let mut bad = HashMap::new();
        bad.insert((1, 2), "x");

        let result = client.call::<_, Value>("bad", (bad,)).await;
        assert!(matches!(result, Err(Error::InvalidParams(_))));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_call_raw_sends_params_as_given() {
        let client = echo_client();

        let params = client.call_raw("raw", vec![json!(1), json!([2])]).await.unwrap();
        assert_eq!(params, json!([1, [2]]));
    }
}

//! Batching scheduler
//!
//! Every call issued while a batch is open joins it. A batch stays open until
//! the first of its calls is awaited (polled) or dropped: at that point it is
//! detached, and a single flush task sends it with exactly one transport call.
//! Calls issued after the detach start a new batch.
//!
//! ```text
//!  call()  call()  call()      .await          transport.send(body)
//!    │       │       │            │                     │
//!    └───────┴───────┴── batch ───┴── detach + spawn ───┴── fan out by id
//! ```
//!
//! So every call created before the caller first yields lands in the same
//! batch, for example with `tokio::join!` or `futures::future::join_all`.
//!
//! # Correlation
//!
//! Responses are matched to calls by id, never by position. Once the
//! transport call settles:
//!
//! - A success resolves its call with the decoded result
//! - A failure rejects its call with the error rebuilt from the wire
//! - A failure with a null id rejects every call still pending in the batch
//! - A response with an unknown id is logged and dropped
//! - A call left without a response is rejected with
//!   [`Error::MissingResponse`]
//! - A transport error rejects every call in the batch
//!
//! Every call is settled exactly once.

use crate::metrics::ClientMetrics;
use crate::transport::Transport;
use jbatch_core::{Error, Id, JsonRpcRequest, RequestBody, ResponseBody, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;

type Waiter = oneshot::Sender<Result<Value>>;

/// Calls accumulated since the last flush
struct PendingBatch {
    epoch: u64,
    requests: Vec<JsonRpcRequest>,
    waiters: HashMap<Id, Waiter>,
}

impl PendingBatch {
    fn new(epoch: u64) -> Self {
        Self {
            epoch,
            requests: Vec::new(),
            waiters: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.requests.len()
    }

    fn reject_all(self, error: Error) {
        for (_, waiter) in self.waiters {
            let _ = waiter.send(Err(error.clone()));
        }
    }
}

#[derive(Default)]
struct State {
    current: Option<PendingBatch>,
    next_epoch: u64,
}

impl State {
    fn open_batch(&mut self) -> &mut PendingBatch {
        let next_epoch = &mut self.next_epoch;
        self.current.get_or_insert_with(|| {
            let epoch = *next_epoch;
            *next_epoch += 1;
            PendingBatch::new(epoch)
        })
    }

    fn detach(&mut self, epoch: u64) -> Option<PendingBatch> {
        match &self.current {
            Some(batch) if batch.epoch == epoch => self.current.take(),
            _ => None,
        }
    }
}

/// Owner of the open batch for one client
pub struct BatchScheduler {
    transport: Arc<dyn Transport>,
    state: Mutex<State>,
    next_id: AtomicU64,
    max_batch_size: Option<usize>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl BatchScheduler {
    /// Create a scheduler sending through `transport`
    ///
    /// With `max_batch_size`, a batch that reaches the limit is flushed at
    /// once and further calls open a new batch.
    pub fn new(
        transport: Arc<dyn Transport>,
        max_batch_size: Option<usize>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            transport,
            state: Mutex::new(State::default()),
            next_id: AtomicU64::new(1),
            max_batch_size,
            metrics,
        }
    }

    /// Number of calls waiting in the open batch
    pub fn pending_count(&self) -> usize {
        self.lock().current.as_ref().map_or(0, PendingBatch::len)
    }

    /// Add a call to the open batch and return its future
    pub fn enqueue<R: DeserializeOwned>(
        self: &Arc<Self>,
        method: String,
        params: Vec<Value>,
    ) -> Call<R> {
        let id = Id::String(self.next_id.fetch_add(1, Ordering::Relaxed).to_string());
        let (tx, rx) = oneshot::channel();

        tracing::trace!(method = %method, id = %id, "Enqueued call");
        if let Some(metrics) = &self.metrics {
            metrics.record_call(&method);
        }

        let (epoch, sealed) = {
            let mut state = self.lock();
            let batch = state.open_batch();
            batch.requests.push(JsonRpcRequest::new(method, params, id.clone()));
            batch.waiters.insert(id, tx);

            let epoch = batch.epoch;
            let full = self
                .max_batch_size
                .is_some_and(|max_size| batch.len() >= max_size);
            (epoch, if full { state.detach(epoch) } else { None })
        };

        if let Some(batch) = sealed {
            tracing::debug!(batch_size = batch.len(), "Batch is full, flushing");
            self.dispatch(batch);
        }

        Call {
            state: CallState::Waiting(rx),
            scheduler: Some(Arc::clone(self)),
            epoch,
            client_stack: Some(Backtrace::capture()),
            _marker: PhantomData,
        }
    }

    /// Flush the open batch now, if there is one
    pub fn flush_now(self: &Arc<Self>) {
        let batch = self.lock().current.take();
        if let Some(batch) = batch {
            self.dispatch(batch);
        }
    }

    fn flush(self: &Arc<Self>, epoch: u64) {
        let batch = self.lock().detach(epoch);
        if let Some(batch) = batch {
            self.dispatch(batch);
        }
    }

    fn dispatch(self: &Arc<Self>, batch: PendingBatch) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let this = Arc::clone(self);
                handle.spawn(async move { this.send_batch(batch).await });
            }
            Err(err) => {
                tracing::error!(error = %err, "No runtime to send the batch on");
                batch.reject_all(Error::Internal(format!(
                    "No tokio runtime available to send the batch: {}",
                    err
                )));
            }
        }
    }

    #[tracing::instrument(skip(self, batch), fields(batch_size = batch.len(), epoch = batch.epoch))]
    async fn send_batch(self: Arc<Self>, batch: PendingBatch) {
        let PendingBatch {
            requests,
            mut waiters,
            ..
        } = batch;

        let size = requests.len();
        let body = RequestBody::from_requests(requests);
        tracing::debug!(batched = body.is_batch(), "Sending batch");

        let start = Instant::now();
        let outcome = self.transport.send(body).await;
        let elapsed = start.elapsed().as_secs_f64();

        if let Some(metrics) = &self.metrics {
            metrics.record_batch(size as u64, elapsed, outcome.is_ok());
        }

        let responses = match outcome {
            Ok(responses) => responses,
            Err(err) => {
                tracing::warn!(error = %err, "Transport call failed, rejecting batch");
                for (_, waiter) in waiters {
                    let _ = waiter.send(Err(err.clone()));
                }
                return;
            }
        };

        correlate(responses, &mut waiters);

        for (id, waiter) in waiters {
            tracing::warn!(id = %id, "No response for request");
            if let Some(metrics) = &self.metrics {
                metrics.record_error("missing_response");
            }
            let _ = waiter.send(Err(Error::MissingResponse(id)));
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn correlate(responses: ResponseBody, waiters: &mut HashMap<Id, Waiter>) {
    for response in responses.into_responses() {
        if response.id.is_null() {
            let Some(error) = response.error else {
                tracing::warn!("Dropping success response with null id");
                continue;
            };
            let error = Error::from_wire(error);
            tracing::warn!(error = %error, "Batch-level failure, rejecting pending calls");
            for (_, waiter) in waiters.drain() {
                let _ = waiter.send(Err(error.clone()));
            }
            continue;
        }

        match waiters.remove(&response.id) {
            Some(waiter) => {
                let _ = waiter.send(response.into_result());
            }
            None => tracing::warn!(id = %response.id, "Dropping response with unknown id"),
        }
    }
}

enum CallState {
    Failed(Option<Error>),
    Waiting(oneshot::Receiver<Result<Value>>),
}

/// Future of one batched call
///
/// Awaiting (or dropping) the first call of a batch closes that batch and
/// sends it. Failures that carry a remote stack get the caller's stack
/// appended (see [`Error::with_client_stack`]).
#[must_use = "calls are sent when awaited or dropped"]
pub struct Call<R> {
    state: CallState,
    scheduler: Option<Arc<BatchScheduler>>,
    epoch: u64,
    client_stack: Option<Backtrace>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Call<R> {
    /// A call that fails without being sent
    pub(crate) fn failed(error: Error) -> Self {
        Self {
            state: CallState::Failed(Some(error)),
            scheduler: None,
            epoch: 0,
            client_stack: None,
            _marker: PhantomData,
        }
    }

    fn release(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.flush(self.epoch);
        }
    }
}

impl<R: DeserializeOwned> Future for Call<R> {
    type Output = Result<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.release();

        let settled = match &mut this.state {
            CallState::Failed(error) => error
                .take()
                .unwrap_or_else(|| Error::Internal("Call polled after completion".into())),
            CallState::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(Ok(value))) => {
                    return Poll::Ready(serde_json::from_value(value).map_err(Error::from));
                }
                Poll::Ready(Ok(Err(error))) => match this.client_stack.take() {
                    Some(stack) => error.with_client_stack(&stack.to_string()),
                    None => error,
                },
                Poll::Ready(Err(_)) => {
                    Error::Internal("Batch was dropped before a response arrived".into())
                }
            },
        };

        Poll::Ready(Err(settled))
    }
}

impl<R> Drop for Call<R> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::from_fn;
    use jbatch_core::JsonRpcResponse;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn echo_scheduler(sends: Arc<AtomicUsize>, max_batch_size: Option<usize>) -> Arc<BatchScheduler> {
        let transport = from_fn(move |body: RequestBody| {
            let sends = Arc::clone(&sends);
            async move {
                sends.fetch_add(1, Ordering::SeqCst);
                let responses = body
                    .into_requests()
                    .into_iter()
                    .map(|r| JsonRpcResponse::success(Value::Array(r.params), r.id))
                    .collect();
                Ok(ResponseBody::Batch(responses))
            }
        });
        Arc::new(BatchScheduler::new(Arc::new(transport), max_batch_size, None))
    }

    #[tokio::test]
    async fn test_calls_before_first_poll_share_a_batch() {
        let sends = Arc::new(AtomicUsize::new(0));
        let scheduler = echo_scheduler(Arc::clone(&sends), None);

        let a: Call<Value> = scheduler.enqueue("echo".into(), vec![json!(1)]);
        let b: Call<Value> = scheduler.enqueue("echo".into(), vec![json!(2)]);
        assert_eq!(scheduler.pending_count(), 2);

        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap(), json!([1]));
        assert_eq!(b.unwrap(), json!([2]));
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_full_batch_is_flushed_immediately() {
        let sends = Arc::new(AtomicUsize::new(0));
        let scheduler = echo_scheduler(Arc::clone(&sends), Some(2));

        let a: Call<Value> = scheduler.enqueue("echo".into(), vec![]);
        let b: Call<Value> = scheduler.enqueue("echo".into(), vec![]);
        let c: Call<Value> = scheduler.enqueue("echo".into(), vec![]);
        assert_eq!(scheduler.pending_count(), 1);

        let (a, b, c) = tokio::join!(a, b, c);
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_call_still_sends_its_batch() {
        let sends = Arc::new(AtomicUsize::new(0));
        let scheduler = echo_scheduler(Arc::clone(&sends), None);

        let kept: Call<Value> = scheduler.enqueue("echo".into(), vec![json!("kept")]);
        drop(scheduler.enqueue::<Value>("echo".into(), vec![]));

        assert_eq!(kept.await.unwrap(), json!(["kept"]));
        assert_eq!(sends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_runtime_rejects_calls() {
        let sends = Arc::new(AtomicUsize::new(0));
        let scheduler = echo_scheduler(Arc::clone(&sends), None);

        let call: Call<Value> = scheduler.enqueue("echo".into(), vec![]);
        let result = futures::executor::block_on(call);

        match result {
            Err(Error::Internal(msg)) => assert!(msg.contains("runtime")),
            other => panic!("Expected Internal error, got {other:?}"),
        }
        assert_eq!(sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_call_never_enqueues() {
        let call: Call<Value> = Call::failed(Error::InvalidParams("bad".into()));
        assert!(matches!(call.await, Err(Error::InvalidParams(_))));
    }
}

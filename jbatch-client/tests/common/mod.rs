//! Common test utilities for jbatch-client integration tests
//!
//! Provides a scriptable in-memory transport so batching and correlation can
//! be tested without a dispatcher or a network.

#![allow(dead_code)]

use async_trait::async_trait;
use jbatch_client::Transport;
use jbatch_core::{
    Error, FailureDetails, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, RequestBody,
    ResponseBody, Result,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

type Responder = Box<dyn Fn(&JsonRpcRequest) -> Option<JsonRpcResponse> + Send + Sync>;

/// Mock transport recording every body it is asked to send
///
/// Batch replies are returned in reverse order so tests also prove that
/// correlation is by id, not by position.
pub struct MockTransport {
    sends: AtomicUsize,
    bodies: Mutex<Vec<RequestBody>>,
    responder: Responder,
    failure: Option<Error>,
    gate: Option<Semaphore>,
}

impl MockTransport {
    /// Answer every request with `{"method": .., "params": ..}`
    pub fn echo() -> Arc<Self> {
        Self::with_responder(|request| {
            Some(JsonRpcResponse::success(
                json!({"method": request.method, "params": request.params}),
                request.id.clone(),
            ))
        })
    }

    /// Answer with a custom function; `None` leaves the request unanswered
    pub fn with_responder<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&JsonRpcRequest) -> Option<JsonRpcResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            sends: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            failure: None,
            gate: None,
        })
    }

    /// Fail every transport call with `error`
    pub fn failing(error: Error) -> Arc<Self> {
        Arc::new(Self {
            sends: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
            responder: Box::new(|_| None),
            failure: Some(error),
            gate: None,
        })
    }

    /// Echo transport whose sends stay in flight until [`release`](Self::release)
    pub fn gated_echo() -> Arc<Self> {
        let mut transport = Self::echo();
        if let Some(inner) = Arc::get_mut(&mut transport) {
            inner.gate = Some(Semaphore::new(0));
        }
        transport
    }

    /// Let `sends` blocked transport calls complete
    pub fn release(&self, sends: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(sends);
        }
    }

    /// Number of transport calls made
    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Bodies sent so far, in order
    pub fn bodies(&self) -> Vec<RequestBody> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, body: RequestBody) -> Result<ResponseBody> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.clone());

        // Let other tasks run, like a real round trip would
        tokio::task::yield_now().await;

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let is_batch = body.is_batch();
        let mut responses: Vec<JsonRpcResponse> = body
            .into_requests()
            .iter()
            .filter_map(|request| (self.responder)(request))
            .collect();

        if is_batch {
            responses.reverse();
            Ok(ResponseBody::Batch(responses))
        } else {
            match responses.pop() {
                Some(response) => Ok(ResponseBody::Single(response)),
                None => Ok(ResponseBody::Batch(Vec::new())),
            }
        }
    }
}

/// Failure response shaped the way the dispatcher reports a handler failure
pub fn handler_failure(
    id: &jbatch_core::Id,
    code: i32,
    name: &str,
    message: &str,
    is_rpc_error: bool,
) -> JsonRpcResponse {
    let details = FailureDetails::new(name, message, format!("{}: {}\n    at handler", name, message), is_rpc_error);
    JsonRpcResponse::error(
        JsonRpcErrorData::with_data(code, message, details.to_value()),
        id.clone(),
    )
}

/// Method name carried by an echo result
pub fn echoed_method(value: &Value) -> &str {
    value["method"].as_str().unwrap_or_default()
}

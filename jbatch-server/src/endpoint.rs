//! Adapter between a raw HTTP body and the dispatcher
//!
//! An HTTP framework hands the endpoint the raw request body and the context
//! it built for the caller (usually from the session). The endpoint decodes
//! the body, dispatches it, and returns the status and body to write back.
//!
//! | Situation                        | Status | Body                        |
//! |----------------------------------|--------|-----------------------------|
//! | Dispatched (even with failures)  | 200    | response or response array  |
//! | Body is not JSON                 | 500    | `-32700` failure, null id   |
//! | Body is not a request or batch   | 500    | `-32600` failure, null id   |
//! | Response could not be encoded    | 500    | `-32603` failure, null id   |

use crate::Dispatcher;
use futures::FutureExt;
use jbatch_core::error::PARSE_ERROR;
use jbatch_core::{codec, Error, Id, JsonRpcErrorData, JsonRpcResponse, ResponseBody};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Status written for a dispatched body
pub const STATUS_OK: u16 = 200;
/// Status written when the body could not be dispatched or encoded
pub const STATUS_SERVER_ERROR: u16 = 500;

/// Last-resort body when even the failure response cannot be encoded
const FALLBACK_BODY: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

/// Status and body to write back to the HTTP caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    /// HTTP status code
    pub status: u16,
    /// Serialized JSON body
    pub body: String,
}

impl EndpointResponse {
    /// Whether the body was dispatched
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// HTTP-facing wrapper around a dispatcher
pub struct Endpoint<C> {
    dispatcher: Dispatcher<C>,
}

impl<C> Clone for Endpoint<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<C: Send + Sync + 'static> Endpoint<C> {
    /// Wrap a dispatcher
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self { dispatcher }
    }

    /// The wrapped dispatcher
    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// Decode, dispatch and encode one HTTP body
    #[tracing::instrument(skip_all, fields(body_len = raw.len()))]
    pub async fn handle_raw(&self, raw: &str, ctx: impl Into<Arc<C>>) -> EndpointResponse {
        let body = match codec::decode_request_body(raw) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "Rejected request body");
                let data = match err {
                    Error::JsonRpc(data) => data,
                    other => JsonRpcErrorData::new(PARSE_ERROR, other.message()),
                };
                return failure(data);
            }
        };

        let ctx: Arc<C> = ctx.into();
        let dispatched = AssertUnwindSafe(self.dispatcher.handle(body, ctx))
            .catch_unwind()
            .await;

        let responses = match dispatched {
            Ok(responses) => responses,
            Err(_) => {
                tracing::error!("Dispatch panicked");
                return failure(JsonRpcErrorData::internal_error("Internal error"));
            }
        };

        if responses.has_errors() {
            log_failures(&responses);
        }

        match codec::encode_response_body(&responses) {
            Ok(body) => EndpointResponse {
                status: STATUS_OK,
                body,
            },
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode response body");
                failure(JsonRpcErrorData::internal_error(err.message()))
            }
        }
    }
}

fn failure(error: JsonRpcErrorData) -> EndpointResponse {
    let response = ResponseBody::Single(JsonRpcResponse::error(error, Id::Null));
    let body = codec::encode_response_body(&response).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to encode failure body");
        FALLBACK_BODY.to_string()
    });

    EndpointResponse {
        status: STATUS_SERVER_ERROR,
        body,
    }
}

fn log_failures(responses: &ResponseBody) {
    let failures = match responses {
        ResponseBody::Single(response) => std::slice::from_ref(response),
        ResponseBody::Batch(responses) => responses.as_slice(),
    };

    for response in failures {
        if let Some(error) = &response.error {
            tracing::error!(id = %response.id, code = error.code, reason = %error.message, "Request failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_fn;
    use serde_json::{json, Value};

    fn endpoint() -> Endpoint<()> {
        Endpoint::new(
            Dispatcher::builder()
                .handler("echo", from_fn(|_ctx: Arc<()>, params| async move { Ok(Value::Array(params)) }))
                .build(),
        )
    }

    #[tokio::test]
    async fn test_dispatches_single_body() {
        let response = endpoint()
            .handle_raw(r#"{"jsonrpc":"2.0","method":"echo","params":[1,2],"id":1}"#, ())
            .await;

        assert!(response.is_ok());
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body, json!({"jsonrpc": "2.0", "result": [1, 2], "id": 1}));
    }

    #[tokio::test]
    async fn test_failures_still_return_ok_status() {
        let response = endpoint()
            .handle_raw(r#"[{"jsonrpc":"2.0","method":"missing","params":[],"id":1}]"#, ())
            .await;

        assert_eq!(response.status, 200);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body[0]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let response = endpoint().handle_raw("{not json", ()).await;

        assert_eq!(response.status, 500);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_batch_is_invalid_request() {
        let response = endpoint().handle_raw("[]", ()).await;

        assert_eq!(response.status, 500);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"]["code"], -32600);
    }
}

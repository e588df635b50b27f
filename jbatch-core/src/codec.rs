//! Codec for request and response bodies
//!
//! Bodies are either a bare envelope (single call) or a JSON array (batch).
//! Decoding first parses into a generic `serde_json::Value` so the two shapes
//! can be told apart before the envelopes themselves are validated.
//!
//! # Error Mapping
//!
//! - Invalid JSON → `-32700` (Parse error)
//! - Valid JSON that is not a request / batch of requests → `-32600`
//! - An empty batch → `-32600`
//! - Serialization failures → `Error::Serialization`
//!
//! # Examples
//!
//! ```rust
//! use jbatch_core::{codec, JsonRpcRequest, RequestBody};
//!
//! let body = RequestBody::from_requests(vec![JsonRpcRequest::new("ping", vec![], "1")]);
//! let json = codec::encode(&body).unwrap();
//!
//! let decoded = codec::decode_request_body(&json).unwrap();
//! assert_eq!(decoded, body);
//! ```

use crate::error::{Error, JsonRpcErrorData, Result};
use crate::types::{JsonRpcRequest, JsonRpcResponse, RequestBody, ResponseBody};
use serde::Serialize;
use serde_json::Value;

/// Encode any serializable body or envelope to a JSON string
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a request body received by an endpoint
///
/// # Errors
///
/// - `Error::JsonRpc(-32700)` if the text is not JSON
/// - `Error::JsonRpc(-32600)` if the JSON is not a request, or is an empty
///   or malformed batch
pub fn decode_request_body(data: &str) -> Result<RequestBody> {
    let value: Value =
        serde_json::from_str(data).map_err(|_e| Error::JsonRpc(JsonRpcErrorData::parse_error()))?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(Error::JsonRpc(JsonRpcErrorData::invalid_request(
                    "Batch cannot be empty",
                )));
            }
            let requests = items
                .into_iter()
                .map(|item| {
                    serde_json::from_value::<JsonRpcRequest>(item)
                        .map_err(|e| Error::JsonRpc(JsonRpcErrorData::invalid_request(e.to_string())))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RequestBody::Batch(requests))
        }
        single => serde_json::from_value(single)
            .map(RequestBody::Single)
            .map_err(|e| Error::JsonRpc(JsonRpcErrorData::invalid_request(e.to_string()))),
    }
}

/// Decode a response body received by a client transport
///
/// # Errors
///
/// Returns `Error::Serialization` if the text is not a response or an array
/// of responses.
pub fn decode_response_body(data: &str) -> Result<ResponseBody> {
    let value: Value = serde_json::from_str(data)?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value::<JsonRpcResponse>(item).map_err(Error::from))
            .collect::<Result<Vec<_>>>()
            .map(ResponseBody::Batch),
        single => Ok(ResponseBody::Single(serde_json::from_value(single)?)),
    }
}

/// Encode a request body for sending
pub fn encode_request_body(body: &RequestBody) -> Result<String> {
    encode(body)
}

/// Encode a response body for sending
pub fn encode_response_body(body: &ResponseBody) -> Result<String> {
    encode(body)
}

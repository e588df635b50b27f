//! Wire types for the batched JSON-RPC protocol
//!
//! These are the JSON-RPC 2.0 envelopes exchanged between the batching client
//! and the dispatcher:
//!
//! 1. **Request**: `{"jsonrpc":"2.0","method","params":[...],"id"}`
//! 2. **Response**: `{"jsonrpc":"2.0","result","id"}` or `{"jsonrpc":"2.0","error","id"}`
//! 3. **Body**: a bare envelope for a single call, a plain array for a batch
//!
//! Parameters are always positional. The correlation id is a string chosen by
//! the client; numbers and null are still accepted on the wire so that a
//! parse-error response (which has no id to echo) can be represented.

use crate::error::{Error, JsonRpcErrorData};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Protocol version tag carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation id tying a request to its response
///
/// Serialized untagged, so `Id::String("1")` is `"1"` on the wire and
/// `Id::Null` is `null`.
///
/// ```rust
/// use jbatch_core::Id;
///
/// let id: Id = "req-123".into();
/// assert_eq!(id.to_string(), "\"req-123\"");
/// assert_eq!(Id::Null.to_string(), "null");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier, the form the batching client generates
    String(String),
    /// Numeric identifier, accepted from foreign clients
    Number(i64),
    /// No identifier (only used for failures that cannot be correlated)
    Null,
}

impl Id {
    /// Whether this id can be correlated at all
    pub fn is_null(&self) -> bool {
        matches!(self, Id::Null)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// JSON-RPC request envelope
///
/// Immutable once built by the scheduler.
///
/// ```rust
/// use jbatch_core::JsonRpcRequest;
/// use serde_json::json;
///
/// let req = JsonRpcRequest::new("getData", vec![json!("test-id")], "1");
/// assert_eq!(req.jsonrpc, "2.0");
/// assert_eq!(
///     serde_json::to_value(&req).unwrap(),
///     json!({"jsonrpc": "2.0", "method": "getData", "params": ["test-id"], "id": "1"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Name of the remote method
    pub method: String,
    /// Ordered positional parameters
    #[serde(default)]
    pub params: Vec<Value>,
    /// Correlation id
    pub id: Id,
}

impl JsonRpcRequest {
    /// Create a request with the version tag filled in
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: impl Into<Id>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// JSON-RPC response envelope
///
/// Exactly one of `result` and `error` is present. A handler that returns
/// `null` still produces `"result": null`, which deserializes back to
/// `Some(Value::Null)` rather than `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Result of a successful call
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Failure of an unsuccessful call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
    /// Id of the originating request, or null when it could not be determined
    pub id: Id,
}

/// Treat a present field as `Some`, even when its value is `null`
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(result: Value, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create a failure response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Whether the response carries a result
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }

    /// Whether the response carries an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Turn the envelope into the caller-facing outcome
    ///
    /// Failures are rebuilt with [`Error::from_wire`]. A response with neither
    /// field is reported as an internal error rather than a `null` result.
    pub fn into_result(self) -> crate::Result<Value> {
        match (self.error, self.result) {
            (Some(error), _) => Err(Error::from_wire(error)),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(Error::Internal(format!(
                "Response {} has neither result nor error",
                self.id
            ))),
        }
    }
}

/// Request body: one bare request, or an array of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// Several requests sent in one transport call
    Batch(Vec<JsonRpcRequest>),
    /// A single request, sent unwrapped
    Single(JsonRpcRequest),
}

impl RequestBody {
    /// Wrap requests in the shape they are sent in
    ///
    /// Exactly one request is sent bare; anything else becomes an array.
    pub fn from_requests(mut requests: Vec<JsonRpcRequest>) -> Self {
        if requests.len() == 1 {
            if let Some(request) = requests.pop() {
                return RequestBody::Single(request);
            }
        }
        RequestBody::Batch(requests)
    }

    /// Number of requests in the body
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Batch(requests) => requests.len(),
            RequestBody::Single(_) => 1,
        }
    }

    /// Whether the body holds no requests
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the body is an array
    pub fn is_batch(&self) -> bool {
        matches!(self, RequestBody::Batch(_))
    }

    /// Flatten into a list of requests
    pub fn into_requests(self) -> Vec<JsonRpcRequest> {
        match self {
            RequestBody::Batch(requests) => requests,
            RequestBody::Single(request) => vec![request],
        }
    }
}

/// Response body mirroring the shape of the request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Responses to a batch, in request order
    Batch(Vec<JsonRpcResponse>),
    /// Response to a single request
    Single(JsonRpcResponse),
}

impl ResponseBody {
    /// Number of responses in the body
    pub fn len(&self) -> usize {
        match self {
            ResponseBody::Batch(responses) => responses.len(),
            ResponseBody::Single(_) => 1,
        }
    }

    /// Whether the body holds no responses
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the body is an array
    pub fn is_batch(&self) -> bool {
        matches!(self, ResponseBody::Batch(_))
    }

    /// Flatten into a list of responses
    pub fn into_responses(self) -> Vec<JsonRpcResponse> {
        match self {
            ResponseBody::Batch(responses) => responses,
            ResponseBody::Single(response) => vec![response],
        }
    }

    /// Whether any response in the body is a failure
    pub fn has_errors(&self) -> bool {
        match self {
            ResponseBody::Batch(responses) => responses.iter().any(JsonRpcResponse::is_error),
            ResponseBody::Single(response) => response.is_error(),
        }
    }
}

/// Serializable description of a call, built without sending it
///
/// `sync` only appears on the wire when it is `true`; what it means is up to
/// whoever consumes the descriptor.
///
/// ```rust
/// use jbatch_core::RpcMessage;
/// use serde_json::json;
///
/// let msg = RpcMessage::new("getData", vec![json!("test-id-1")]);
/// assert_eq!(
///     serde_json::to_value(&msg).unwrap(),
///     json!({"method": "getData", "params": ["test-id-1"]})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcMessage {
    /// Name of the remote method
    pub method: String,
    /// Ordered positional parameters
    #[serde(default)]
    pub params: Vec<Value>,
    /// Set when the message should not be batched
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sync: bool,
}

impl RpcMessage {
    /// Create a descriptor without the sync flag
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
            sync: false,
        }
    }

    /// Set the sync flag
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

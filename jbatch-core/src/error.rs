//! Error types for jbatch
//!
//! This module provides the error taxonomy shared by the dispatcher and the
//! batching client. It defines three layers:
//!
//! - **Error**: Application-level errors surfaced to callers (uses thiserror)
//! - **JsonRpcErrorData**: Wire-format errors as they appear in a response
//! - **RpcError / RemoteError**: The two failure shapes a caller can receive
//!   from a remote handler, reconstructed from the wire
//!
//! # Error Codes
//!
//! - `-32700`: Parse error (malformed body, produced by the endpoint adapter)
//! - `-32600`: Invalid request (empty or oversized batch)
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal / transport error
//! - `-32000`: Default code for any handler failure that is not a domain failure
//!
//! Any other code is application-chosen and is carried through unchanged when
//! the handler failed with an explicit [`RpcError`].
//!
//! # Domain Failures vs. Unexpected Failures
//!
//! Serialization erases type information, so the dispatcher attaches a
//! [`FailureDetails`] object to every handler failure. Its `isRpcError` flag is
//! the only thing the receiving side uses to decide which variant to rebuild:
//!
//! ```rust
//! use jbatch_core::{Error, FailureDetails, JsonRpcErrorData};
//!
//! let details = FailureDetails::new("RpcError", "Test error", "RpcError: Test error", true);
//! let wire = JsonRpcErrorData::with_data(123, "Test error", details.to_value());
//!
//! match Error::from_wire(wire) {
//!     Error::Rpc(e) => assert_eq!(e.code, 123),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use crate::types::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid JSON was received by the endpoint
pub const PARSE_ERROR: i32 = -32700;
/// The body is JSON but not a valid request or batch
pub const INVALID_REQUEST: i32 = -32600;
/// The method is not registered with the dispatcher
pub const METHOD_NOT_FOUND: i32 = -32601;
/// The handler could not decode its positional params
pub const INVALID_PARAMS: i32 = -32602;
/// Internal, transport or correlation failure
pub const INTERNAL_ERROR: i32 = -32603;
/// Default code for handler failures that are not domain failures
pub const SERVER_ERROR: i32 = -32000;

/// Width of the separator placed between the server and client stack
const STACK_SEPARATOR_WIDTH: usize = 50;

/// Result type for jbatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for jbatch operations
///
/// Every variant is cheap to clone: a transport failure has to be delivered
/// to every caller waiting on the same batch.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// JSON-RPC protocol error that is already in wire format
    ///
    /// Produced by the codec (parse errors, invalid batches) and by the
    /// dispatcher's batch-size guard.
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcErrorData),

    /// Domain failure raised on purpose by a handler
    ///
    /// Its code is trusted and travels unchanged across the wire.
    #[error("{0}")]
    Rpc(RpcError),

    /// Unexpected failure from a remote handler
    ///
    /// Rebuilt on the client when the failure carried a stack but was not
    /// flagged as a domain failure.
    #[error("{0}")]
    Remote(RemoteError),

    /// The transport call itself did not succeed
    #[error("Transport error ({status}): {message}")]
    Transport {
        /// Status reported by the transport (an HTTP status for HTTP transports)
        status: u16,
        /// Status text or transport-level description
        message: String,
    },

    /// The batch reply settled without an entry for this correlation id
    #[error("No response received for request {0}")]
    MissingResponse(Id),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid method parameters
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Unexpected internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric code of this error
    ///
    /// Generic remote failures and correlation failures report `-32603`:
    /// only domain failures keep the code chosen by the server.
    pub fn code(&self) -> i32 {
        match self {
            Error::JsonRpc(data) => data.code,
            Error::Rpc(err) => err.code,
            Error::Transport { status, .. } => i32::from(*status),
            Error::InvalidParams(_) => INVALID_PARAMS,
            Error::Remote(_)
            | Error::MissingResponse(_)
            | Error::Serialization(_)
            | Error::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Short type name used in the `name` field of failure details
    pub fn name(&self) -> &str {
        match self {
            Error::JsonRpc(_) => "JsonRpcError",
            Error::Rpc(_) => "RpcError",
            Error::Remote(err) => err.name.as_deref().unwrap_or("Error"),
            Error::Transport { .. } => "TransportError",
            Error::MissingResponse(_) => "MissingResponse",
            Error::Serialization(_) => "SerializationError",
            Error::InvalidParams(_) => "InvalidParams",
            Error::Internal(_) => "InternalError",
        }
    }

    /// Human-readable message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            Error::JsonRpc(data) => data.message.clone(),
            Error::Rpc(err) => err.message.clone(),
            Error::Remote(err) => err.message.clone(),
            Error::Transport { message, .. } => message.clone(),
            Error::Serialization(msg) | Error::InvalidParams(msg) | Error::Internal(msg) => {
                msg.clone()
            }
            Error::MissingResponse(_) => self.to_string(),
        }
    }

    /// Whether this error is a domain failure raised on purpose by a handler
    pub fn is_rpc_error(&self) -> bool {
        matches!(self, Error::Rpc(_))
    }

    /// Combined diagnostic stack, when the failure came from a remote handler
    pub fn stack(&self) -> Option<&str> {
        match self {
            Error::Rpc(err) => err.stack.as_deref(),
            Error::Remote(err) => err.stack.as_deref(),
            _ => None,
        }
    }

    /// Rebuild a caller-facing error from a failure response
    ///
    /// - With a stack in `data` and `isRpcError: true`: [`Error::Rpc`] keeping the code
    /// - With a stack in `data` and no flag: [`Error::Remote`] (code becomes `-32603`)
    /// - Without a stack: [`Error::Rpc`] carrying code, message and data as-is
    ///
    /// The remote stack is stored unannotated; the client appends its own
    /// stack with [`Error::with_client_stack`].
    pub fn from_wire(error: JsonRpcErrorData) -> Self {
        let JsonRpcErrorData { code, message, data } = error;

        let stack = data
            .as_ref()
            .and_then(|d| d.get("stack"))
            .and_then(|s| s.as_str())
            .map(str::to_string);

        let Some(stack) = stack else {
            return Error::Rpc(RpcError {
                code,
                message,
                data,
                stack: None,
            });
        };

        let is_rpc_error = data
            .as_ref()
            .and_then(|d| d.get("isRpcError"))
            .and_then(|f| f.as_bool())
            .unwrap_or(false);

        if is_rpc_error {
            Error::Rpc(RpcError {
                code,
                message,
                data,
                stack: Some(stack),
            })
        } else {
            let name = data
                .as_ref()
                .and_then(|d| d.get("name"))
                .and_then(|n| n.as_str())
                .map(str::to_string);
            Error::Remote(RemoteError {
                message,
                name,
                stack: Some(stack),
            })
        }
    }

    /// Append the local stack below the remote one
    ///
    /// Only failures that carry a remote stack are annotated; everything else
    /// is returned unchanged.
    pub fn with_client_stack(self, client_stack: &str) -> Self {
        match self {
            Error::Rpc(mut err) => {
                err.stack = err.stack.map(|server| annotate_stack(&server, client_stack));
                Error::Rpc(err)
            }
            Error::Remote(mut err) => {
                err.stack = err.stack.map(|server| annotate_stack(&server, client_stack));
                Error::Remote(err)
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        Error::Rpc(err)
    }
}

/// Join a server stack and a client stack with a visible marker
pub fn annotate_stack(server_stack: &str, client_stack: &str) -> String {
    format!(
        "Server stack:\n{}\n{}\nClient stack:\n{}",
        server_stack,
        "=".repeat(STACK_SEPARATOR_WIDTH),
        client_stack
    )
}

/// Domain failure raised on purpose by a handler
///
/// Return this (usually via `Err(RpcError::new(..).into())`) from a handler
/// when the caller should see your own code and message. Any other error is
/// reported with the generic `-32000` code.
///
/// # Examples
///
/// ```rust
/// use jbatch_core::{Error, RpcError};
/// use serde_json::json;
///
/// let err: Error = RpcError::new(1001, "Insufficient funds")
///     .with_data(json!({"balance": 50}))
///     .into();
/// assert_eq!(err.code(), 1001);
/// assert!(err.is_rpc_error());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    /// Application-chosen error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Optional structured payload
    ///
    /// On the client this holds the failure details sent by the server.
    pub data: Option<serde_json::Value>,
    /// Diagnostic stack (server stack, annotated with the client stack on receipt)
    pub stack: Option<String>,
}

impl RpcError {
    /// Create a domain failure with a code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            stack: None,
        }
    }

    /// Attach structured data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RpcError [{}]: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Generic failure rebuilt from a remote handler that was not a domain failure
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    /// Message of the remote failure
    pub message: String,
    /// Remote type name, if the server sent one
    pub name: Option<String>,
    /// Diagnostic stack (server stack, annotated with the client stack on receipt)
    pub stack: Option<String>,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name.as_deref().unwrap_or("Error"), self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Structured data attached to every handler failure
///
/// Serialized into the `data` field of the wire error as
/// `{"message", "name", "stack", "isRpcError"}`, plus `"data"` when a domain
/// failure carried its own payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    /// Failure message
    pub message: String,
    /// Failure type name
    pub name: String,
    /// Rendered stack (error chain, plus backtrace when captured)
    pub stack: String,
    /// Whether the failure was a domain failure
    pub is_rpc_error: bool,
    /// Structured data the handler attached to a domain failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl FailureDetails {
    /// Create failure details
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        stack: impl Into<String>,
        is_rpc_error: bool,
    ) -> Self {
        Self {
            message: message.into(),
            name: name.into(),
            stack: stack.into(),
            is_rpc_error,
            data: None,
        }
    }

    /// Attach the handler's own structured data
    pub fn with_data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Convert to the JSON value placed in `error.data`
    pub fn to_value(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "message": self.message,
            "name": self.name,
            "stack": self.stack,
            "isRpcError": self.is_rpc_error,
        });
        if let (Some(data), Some(object)) = (&self.data, value.as_object_mut()) {
            object.insert("data".to_string(), data.clone());
        }
        value
    }
}

/// JSON-RPC 2.0 error object as it appears on the wire
///
/// # Examples
///
/// ```rust
/// use jbatch_core::JsonRpcErrorData;
///
/// let error = JsonRpcErrorData::method_not_found();
/// assert_eq!(error.code, -32601);
/// assert_eq!(error.message, "Method not found");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code
    pub code: i32,

    /// Short description of the error
    pub message: String,

    /// Optional additional error information
    ///
    /// Handler failures always carry [`FailureDetails`] here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create a new JSON-RPC error with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new JSON-RPC error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    /// Create an invalid request error (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, msg)
    }

    /// Create a method not found error (-32601)
    ///
    /// The message is fixed; the method name is not echoed back.
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    /// Create an invalid params error (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, msg)
    }

    /// Create an internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, msg)
    }

    /// Create a batch size exceeded error (-32600)
    ///
    /// Sent as a single response with a null id in place of the whole batch.
    pub fn batch_size_exceeded(limit: usize, actual: usize) -> Self {
        Self::new(
            INVALID_REQUEST,
            format!("Batch size limit exceeded: limit={}, actual={}", limit, actual),
        )
    }
}

impl std::fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_error_codes() {
        let errors = vec![
            (JsonRpcErrorData::parse_error(), -32700),
            (JsonRpcErrorData::invalid_request("test"), -32600),
            (JsonRpcErrorData::method_not_found(), -32601),
            (JsonRpcErrorData::invalid_params("test"), -32602),
            (JsonRpcErrorData::internal_error("test"), -32603),
        ];

        for (error, expected_code) in errors {
            assert_eq!(error.code, expected_code);
            assert!(!error.message.is_empty());
        }
    }

    #[test]
    fn test_method_not_found_has_fixed_message() {
        let error = JsonRpcErrorData::method_not_found();
        assert_eq!(error.message, "Method not found");
        assert!(error.data.is_none());

        let serialized = serde_json::to_value(&error).unwrap();
        assert_eq!(serialized, json!({"code": -32601, "message": "Method not found"}));
    }

    #[test]
    fn test_failure_details_wire_shape() {
        let details = FailureDetails::new("RpcError", "boom", "RpcError: boom", true);
        let value = details.to_value();

        assert_eq!(value["isRpcError"], true);
        assert_eq!(value["name"], "RpcError");
        assert_eq!(value["stack"], "RpcError: boom");

        let parsed: FailureDetails = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, details);
    }

    #[test]
    fn test_from_wire_flagged_domain_failure() {
        let details = FailureDetails::new("RpcError", "Test error", "trace", true);
        let error = Error::from_wire(JsonRpcErrorData::with_data(123, "Test error", details.to_value()));

        assert!(error.is_rpc_error());
        assert_eq!(error.code(), 123);
        assert_eq!(error.message(), "Test error");
        assert_eq!(error.stack(), Some("trace"));
    }

    #[test]
    fn test_from_wire_unflagged_failure_is_generic() {
        let details = FailureDetails::new("InternalError", "db down", "trace", false);
        let error = Error::from_wire(JsonRpcErrorData::with_data(-32000, "db down", details.to_value()));

        match &error {
            Error::Remote(remote) => {
                assert_eq!(remote.message, "db down");
                assert_eq!(remote.name.as_deref(), Some("InternalError"));
            }
            other => panic!("Expected Remote error, got {other:?}"),
        }
        assert!(!error.is_rpc_error());
        assert_eq!(error.code(), INTERNAL_ERROR);
    }

    #[test]
    fn test_from_wire_without_stack_keeps_code() {
        let error = Error::from_wire(JsonRpcErrorData::new(123, "Test error"));

        match error {
            Error::Rpc(rpc) => {
                assert_eq!(rpc.code, 123);
                assert_eq!(rpc.message, "Test error");
                assert!(rpc.stack.is_none());
            }
            other => panic!("Expected Rpc error, got {other:?}"),
        }
    }

    #[test]
    fn test_client_stack_annotation() {
        let details = FailureDetails::new("RpcError", "boom", "server frame", true);
        let error = Error::from_wire(JsonRpcErrorData::with_data(7, "boom", details.to_value()))
            .with_client_stack("client frame");

        let stack = error.stack().unwrap();
        assert!(stack.starts_with("Server stack:\nserver frame\n"));
        assert!(stack.contains(&"=".repeat(50)));
        assert!(stack.ends_with("Client stack:\nclient frame"));
    }

    #[test]
    fn test_client_stack_leaves_other_errors_alone() {
        let error = Error::Internal("x".into()).with_client_stack("client frame");
        assert!(error.stack().is_none());
    }

    #[test]
    fn test_transport_error_code_is_status() {
        let error = Error::Transport {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(error.code(), 503);
        assert_eq!(error.message(), "Service Unavailable");
    }

    #[test]
    fn test_error_from_serde() {
        let serde_error = serde_json::from_str::<serde_json::Value>(r#"{"invalid": json"#).unwrap_err();
        let error: Error = serde_error.into();

        match error {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_deserialization() {
        let json = r#"{"code":-32601,"message":"Method not found"}"#;
        let error: JsonRpcErrorData = serde_json::from_str(json).unwrap();

        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");
        assert!(error.data.is_none());
    }

    #[test]
    fn test_jsonrpc_error_display() {
        let display = format!("{}", JsonRpcErrorData::method_not_found());
        assert!(display.contains("-32601"));
        assert!(display.contains("Method not found"));
    }
}

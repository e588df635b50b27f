//! Call descriptors that are built, not sent
//!
//! A message is `{method, params}` plus an optional `sync` flag, for code
//! that hands calls to something else (a queue, a worker, another client)
//! instead of sending them. Building a message never touches the open batch.
//!
//! The flag is read from an optional trailing options object: when the last
//! param is an object containing a `"sync"` key it is removed from the params,
//! and `sync: true` is added when its value is truthy.
//!
//! ```rust
//! use jbatch_client::MessageBuilder;
//! use serde_json::json;
//!
//! let builder = MessageBuilder::new();
//!
//! let plain = builder.build("getData", vec![json!("a")]);
//! assert_eq!(serde_json::to_value(&plain).unwrap(), json!({"method": "getData", "params": ["a"]}));
//!
//! let sync = builder.build("getData", vec![json!("a"), json!({"sync": true})]);
//! assert_eq!(
//!     serde_json::to_value(&sync).unwrap(),
//!     json!({"method": "getData", "params": ["a"], "sync": true})
//! );
//! ```

use crate::params::Params;
use jbatch_core::{Result, RpcMessage};
use serde_json::Value;

/// Key of the trailing options object that marks a synchronous message
const SYNC_KEY: &str = "sync";

/// Options for typed message construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageOptions {
    /// Ask the consumer not to batch this message
    pub sync: bool,
}

impl MessageOptions {
    /// Options marking a synchronous message
    pub fn sync() -> Self {
        Self { sync: true }
    }
}

/// Builds [`RpcMessage`] descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageBuilder;

impl MessageBuilder {
    /// Create a message builder
    pub fn new() -> Self {
        Self
    }

    /// Build a message from raw params, honoring a trailing options object
    pub fn build(&self, method: impl Into<String>, mut params: Vec<Value>) -> RpcMessage {
        let sync = match params.last() {
            Some(Value::Object(options)) if options.contains_key(SYNC_KEY) => {
                let sync = options.get(SYNC_KEY).is_some_and(is_truthy);
                params.pop();
                sync
            }
            _ => false,
        };

        RpcMessage::new(method, params).with_sync(sync)
    }

    /// Build a message from typed params and explicit options
    ///
    /// `params` is encoded the same way as for a call: one tuple element per
    /// positional param, `()` for none.
    pub fn typed<P: Params>(
        &self,
        method: impl Into<String>,
        params: P,
        options: MessageOptions,
    ) -> Result<RpcMessage> {
        let params = params.into_params()?;
        Ok(RpcMessage::new(method, params).with_sync(options.sync))
    }
}

/// JavaScript-style truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

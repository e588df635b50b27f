//! Handler traits and types for RPC methods
//!
//! A handler is an asynchronous function of `(context, ...params) -> result`.
//! The context is shared by every request in a body and is opaque to the
//! dispatcher; the params are the request's positional values.
//!
//! # Creating Handlers
//!
//! 1. **from_fn**: Wrap an async closure that works with raw JSON values
//! 2. **from_typed_fn**: Wrap an async closure taking a tuple of typed params
//! 3. **#[handler] macro**: Annotate a function to generate a handler factory
//!    (via jbatch-macros)
//!
//! # Examples
//!
//! ```rust
//! use jbatch_server::{from_fn, from_typed_fn, Handler};
//! use std::sync::Arc;
//!
//! struct Session { user_id: String }
//!
//! // Raw JSON handler
//! let echo = from_fn(|_ctx: Arc<Session>, params| async move {
//!     Ok(serde_json::Value::Array(params))
//! });
//!
//! // Typed handler: params ["test-id"] decode into (String,)
//! let get_data = from_typed_fn(|ctx: Arc<Session>, (id,): (String,)| async move {
//!     Ok(serde_json::json!({"id": id, "userId": ctx.user_id}))
//! });
//! ```

use jbatch_core::{Error, Result, RpcError};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every handler
///
/// Boxing gives every handler the same type so they can share one map.
pub type HandlerResult = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Trait for RPC method handlers
///
/// Handlers must be `Send + Sync`: the handler map is shared by every
/// concurrently dispatched request.
///
/// Returning `Err(Error::Rpc(..))` reports a domain failure whose code reaches
/// the caller unchanged. Any other error, and any panic, is reported with the
/// generic `-32000` code.
pub trait Handler<C>: Send + Sync {
    /// Run the method with the shared context and the request's positional params
    fn handle(&self, ctx: Arc<C>, params: Vec<Value>) -> HandlerResult;
}

/// Adapter turning an async function into a [`Handler`]
pub struct AsyncHandler<F> {
    func: F,
}

impl<F> AsyncHandler<F> {
    /// Wrap a function
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<C, F, Fut> Handler<C> for AsyncHandler<F>
where
    F: Fn(Arc<C>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn handle(&self, ctx: Arc<C>, params: Vec<Value>) -> HandlerResult {
        Box::pin((self.func)(ctx, params))
    }
}

/// Create a handler from an async function over raw JSON params
///
/// ```rust
/// use jbatch_server::from_fn;
/// use std::sync::Arc;
///
/// let count = from_fn(|_ctx: Arc<()>, params| async move {
///     Ok(serde_json::json!(params.len()))
/// });
/// ```
pub fn from_fn<C, F, Fut>(func: F) -> Box<dyn Handler<C>>
where
    C: 'static,
    F: Fn(Arc<C>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Box::new(AsyncHandler::new(func))
}

/// Create a handler whose params are decoded into a tuple
///
/// The positional params array is decoded into `P` (usually a tuple such as
/// `(String, u32)`), and the returned value is serialized back to JSON. A
/// method with no params can use `()`.
///
/// # Error Handling
///
/// - Params that do not decode into `P` become a domain failure with code
///   `-32602`, so the caller sees the real reason
/// - A result that cannot be serialized becomes `Error::Serialization`
/// - Errors returned by `func` pass through unchanged
pub fn from_typed_fn<C, P, R, F, Fut>(func: F) -> Box<dyn Handler<C>>
where
    C: Send + Sync + 'static,
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(Arc<C>, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let func = Arc::new(func);

    from_fn(move |ctx: Arc<C>, params: Vec<Value>| {
        let func = Arc::clone(&func);
        async move {
            let params: P = decode_params(params)?;
            let result = func(ctx, params).await?;
            serde_json::to_value(result).map_err(|e| Error::Serialization(e.to_string()))
        }
    })
}

/// Decode positional params into a typed value
///
/// An empty list is tried as `null` first so that `()` works for methods
/// without params.
fn decode_params<P: serde::de::DeserializeOwned>(params: Vec<Value>) -> Result<P> {
    if params.is_empty() {
        if let Ok(unit) = serde_json::from_value(Value::Null) {
            return Ok(unit);
        }
    }
    serde_json::from_value(Value::Array(params))
        .map_err(|e| RpcError::new(jbatch_core::error::INVALID_PARAMS, format!("Invalid params: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Sum {
        sum: i32,
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let handler = from_typed_fn(|_ctx: Arc<()>, (a, b): (i32, i32)| async move {
            Ok(Sum { sum: a + b })
        });

        let result = handler.handle(Arc::new(()), vec![json!(5), json!(3)]).await.unwrap();
        let sum: Sum = serde_json::from_value(result).unwrap();
        assert_eq!(sum.sum, 8);
    }

    #[tokio::test]
    async fn test_typed_handler_receives_context() {
        struct Session {
            user_id: String,
        }

        let handler = from_typed_fn(|ctx: Arc<Session>, (id,): (String,)| async move {
            Ok(json!({"id": id, "userId": ctx.user_id}))
        });

        let ctx = Arc::new(Session {
            user_id: "user-123".into(),
        });
        let result = handler.handle(ctx, vec![json!("test-id")]).await.unwrap();
        assert_eq!(result, json!({"id": "test-id", "userId": "user-123"}));
    }

    #[tokio::test]
    async fn test_typed_handler_without_params() {
        let handler = from_typed_fn(|_ctx: Arc<()>, (): ()| async move { Ok("pong") });

        let result = handler.handle(Arc::new(()), vec![]).await.unwrap();
        assert_eq!(result, json!("pong"));
    }

    #[tokio::test]
    async fn test_typed_handler_bad_params_is_domain_failure() {
        let handler = from_typed_fn(|_ctx: Arc<()>, (a,): (i32,)| async move { Ok(a) });

        let err = handler.handle(Arc::new(()), vec![json!("nope")]).await.unwrap_err();
        assert!(err.is_rpc_error());
        assert_eq!(err.code(), -32602);
    }
}

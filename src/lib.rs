//! jbatch - batched JSON-RPC 2.0 over any transport
//!
//! This is the convenience crate re-exporting all jbatch sub-crates. Use it
//! when one process needs both halves, or for the in-process transport.
//!
//! # Architecture
//!
//! - **jbatch-core**: Wire types, error taxonomy, codec, observability
//! - **jbatch-server**: Dispatcher, typed handlers, HTTP endpoint adapter
//! - **jbatch-client**: Batching client, transport seam, message builder
//! - **jbatch-macros**: `#[handler]` and `#[rpc_client]`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jbatch::{BatchClient, Dispatcher, Endpoint, LocalTransport};
//! use jbatch::server::from_typed_fn;
//! use std::sync::Arc;
//!
//! struct Session { user_id: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder()
//!         .handler("getData", from_typed_fn(|ctx: Arc<Session>, (id,): (String,)| async move {
//!             Ok(serde_json::json!({"id": id, "userId": ctx.user_id}))
//!         }))
//!         .build();
//!
//!     let session = Session { user_id: "user-123".into() };
//!     let client = BatchClient::new(LocalTransport::new(Endpoint::new(dispatcher), session));
//!
//!     // Both calls travel in one array
//!     let (a, b) = tokio::join!(
//!         client.call::<_, serde_json::Value>("getData", ("test-id-1",)),
//!         client.call::<_, serde_json::Value>("getData", ("test-id-2",)),
//!     );
//!     println!("{} {}", a?, b?);
//!     Ok(())
//! }
//! ```

mod local;

// Re-export all public APIs from sub-crates
pub use jbatch_client as client;
pub use jbatch_core as core;
pub use jbatch_macros as macros;
pub use jbatch_server as server;

pub use local::LocalTransport;

// Convenience re-exports of the most commonly used types
pub use jbatch_client::{BatchClient, Call};
pub use jbatch_core::{Error, Result, RpcError};
pub use jbatch_server::{Dispatcher, Endpoint};

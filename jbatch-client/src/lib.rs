//! JSON-RPC 2.0 client that batches concurrent calls
//!
//! Calls made without an intervening await are coalesced into a single
//! transport round trip. Responses are correlated back to their callers by
//! id, and failures are rebuilt with enough type information to tell a
//! domain failure from an unexpected one.
//!
//! # Features
//!
//! - **Transparent batching**: `join!` two calls, get one transport call
//! - **Wire minimalism**: a batch of one is sent as a bare request
//! - **Typed failures**: [`Error::Rpc`] for domain failures (code kept),
//!   [`Error::Remote`] for anything else the server threw
//! - **Stack annotation**: remote stacks are joined with the caller's stack
//! - **Message descriptors**: build `{method, params, sync?}` without sending
//! - **Typed stubs**: `#[jbatch_macros::rpc_client]` generates a typed client
//!   and message builder from a trait
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jbatch_client::{BatchClient, transport};
//! use jbatch_core::{Error, RequestBody, ResponseBody};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Data { id: String }
//!
//! # async fn post(body: RequestBody) -> jbatch_core::Result<ResponseBody> { unimplemented!() }
//! # async fn example() -> jbatch_core::Result<()> {
//! let client = BatchClient::new(transport::from_fn(post));
//!
//! let (a, b) = tokio::join!(
//!     client.call::<_, Data>("getData", ("test-id-1",)),
//!     client.call::<_, Data>("getData", ("test-id-2",)),
//! );
//!
//! match a {
//!     Ok(data) => println!("got {}", data.id),
//!     Err(Error::Rpc(e)) => println!("handled failure {}", e.code),
//!     Err(other) => println!("unexpected failure {}", other),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod client_builder;
mod message;
mod metrics;
mod params;
mod scheduler;
pub mod transport;

pub use client::BatchClient;
pub use client_builder::ClientBuilder;
pub use message::{MessageBuilder, MessageOptions};
pub use metrics::ClientMetrics;
pub use params::Params;
pub use scheduler::{BatchScheduler, Call};
pub use transport::Transport;

// Re-export core types
pub use jbatch_core::{Error, Id, RemoteError, Result, RpcError, RpcMessage};

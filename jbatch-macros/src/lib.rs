//! Procedural macros for jbatch
//!
//! # Available Macros
//!
//! ## `#[handler]` - Typed Handler Factory
//!
//! Turns an async function of `(Arc<C>, params...)` into a factory returning
//! `Box<dyn jbatch_server::Handler<C>>`. The positional params are decoded
//! into the function's argument types, and the return value is serialized
//! as the result.
//!
//! ```ignore
//! use jbatch_macros::handler;
//! use jbatch_core::Result;
//! use std::sync::Arc;
//!
//! #[handler]
//! async fn get_data(ctx: Arc<Session>, id: String) -> Result<Data> {
//!     Ok(Data { id, user_id: ctx.user_id.clone() })
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .handler("getData", get_data())
//!     .build();
//! ```
//!
//! ## `#[rpc_client]` - Typed Client Stubs
//!
//! Generates a typed batching client and a typed message builder from a
//! trait declaring the remote methods.
//!
//! ```ignore
//! use jbatch_macros::rpc_client;
//!
//! #[rpc_client]
//! pub trait DataApi {
//!     #[rpc(name = "getData")]
//!     fn get_data(id: String) -> Data;
//! }
//!
//! let api = DataApiClient::new(client);
//! let (a, b) = tokio::join!(api.get_data("a".into()), api.get_data("b".into()));
//! let message = api.messages().get_data("c".into())?;
//! ```
//!
//! Generated code refers to `jbatch_server` and `jbatch_client` by name, so
//! the calling crate depends on the one it uses.

mod handler;
mod rpc_client;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemFn, ItemTrait};

/// Attribute macro for defining typed handlers
///
/// # Requirements
///
/// - The function must be `async`
/// - The first parameter is the context as `Arc<C>`
/// - Every other parameter type implements `serde::Deserialize`
/// - The return type is `jbatch_core::Result<T>` with `T: Serialize`
///
/// Params that do not decode into the argument types are reported to the
/// caller as a `-32602` domain failure.
///
/// # Attributes and Visibility
///
/// The generated factory keeps the function's name, visibility, doc
/// comments and other attributes.
#[proc_macro_attribute]
pub fn handler(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    handler::handler_impl(input_fn)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Attribute macro generating typed client stubs from a trait
///
/// For `trait Api` it generates `ApiClient` (one method per trait method,
/// returning `jbatch_client::Call<R>`) and `ApiMessages` (one message
/// builder per trait method). The wire method name is the Rust method name
/// unless overridden with `#[rpc(name = "...")]`.
///
/// Trait methods are declared without `async` and without a body; the
/// arguments are the positional params and the return type is the decoded
/// result.
#[proc_macro_attribute]
pub fn rpc_client(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item_trait = parse_macro_input!(item as ItemTrait);
    rpc_client::rpc_client_impl(item_trait)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

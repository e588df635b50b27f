//! `#[rpc_client]` procedural macro implementation
//!
//! The attributed trait declares the remote API: one method per remote
//! method, with the positional params as arguments and the decoded result as
//! the return type. The trait itself is kept, and two types are generated
//! next to it:
//!
//! - `<Trait>Client`: wraps a `BatchClient`; each method queues a call and
//!   returns a `Call<R>`
//! - `<Trait>Messages`: each method builds an `RpcMessage` instead, plus a
//!   `<method>_with_options` variant taking `MessageOptions`
//!
//! Input:
//! ```ignore
//! #[rpc_client]
//! pub trait DataApi {
//!     #[rpc(name = "getData")]
//!     fn get_data(id: String) -> Data;
//! }
//! ```
//!
//! Generated output (abridged):
//! ```ignore
//! #[derive(Clone)]
//! pub struct DataApiClient { inner: jbatch_client::BatchClient }
//!
//! impl DataApiClient {
//!     pub fn get_data(&self, id: String) -> jbatch_client::Call<Data> {
//!         self.inner.call("getData", (id,))
//!     }
//! }
//! ```

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Attribute, FnArg, ItemTrait, LitStr, Pat, ReturnType, TraitItem, TraitItemFn};

/// One remote method collected from the trait
struct RemoteMethod {
    attrs: Vec<Attribute>,
    ident: syn::Ident,
    wire_name: String,
    arg_names: Vec<syn::Ident>,
    arg_types: Vec<syn::Type>,
    output: TokenStream,
}

/// Expand `#[rpc_client]` on a trait
pub fn rpc_client_impl(mut item: ItemTrait) -> syn::Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.generics.span(),
            "#[rpc_client] traits cannot be generic",
        ));
    }

    let mut methods = Vec::new();
    for trait_item in &mut item.items {
        if let TraitItem::Fn(method) = trait_item {
            let wire_name = take_wire_name(&mut method.attrs)?;
            methods.push(collect_method(method, wire_name)?);
        }
    }

    let vis = &item.vis;
    let trait_name = &item.ident;
    let client_name = format_ident!("{}Client", trait_name);
    let messages_name = format_ident!("{}Messages", trait_name);

    let client_methods = methods.iter().map(|m| {
        let RemoteMethod {
            attrs,
            ident,
            wire_name,
            arg_names,
            arg_types,
            output,
        } = m;

        quote! {
            #(#attrs)*
            pub fn #ident(&self, #(#arg_names: #arg_types),*) -> jbatch_client::Call<#output> {
                self.inner.call(#wire_name, (#(#arg_names,)*))
            }
        }
    });

    let message_methods = methods.iter().map(|m| {
        let RemoteMethod {
            ident,
            wire_name,
            arg_names,
            arg_types,
            ..
        } = m;
        let with_options = format_ident!("{}_with_options", ident);
        let doc = format!("Build a `{}` message", wire_name);
        let doc_with_options = format!("Build a `{}` message with explicit options", wire_name);

        quote! {
            #[doc = #doc]
            pub fn #ident(
                &self,
                #(#arg_names: #arg_types),*
            ) -> jbatch_client::Result<jbatch_client::RpcMessage> {
                self.#with_options(#(#arg_names,)* jbatch_client::MessageOptions::default())
            }

            #[doc = #doc_with_options]
            pub fn #with_options(
                &self,
                #(#arg_names: #arg_types,)*
                __options: jbatch_client::MessageOptions,
            ) -> jbatch_client::Result<jbatch_client::RpcMessage> {
                jbatch_client::MessageBuilder::new().typed(#wire_name, (#(#arg_names,)*), __options)
            }
        }
    });

    let client_doc = format!("Batching client for [`{}`]", trait_name);
    let messages_doc = format!("Message builders for [`{}`]", trait_name);

    Ok(quote! {
        #item

        #[doc = #client_doc]
        #[derive(Clone)]
        #vis struct #client_name {
            inner: jbatch_client::BatchClient,
        }

        impl #client_name {
            /// Wrap a batching client
            pub fn new(inner: jbatch_client::BatchClient) -> Self {
                Self { inner }
            }

            /// The wrapped batching client
            pub fn inner(&self) -> &jbatch_client::BatchClient {
                &self.inner
            }

            /// Message builders for the same methods
            pub fn messages(&self) -> #messages_name {
                #messages_name
            }

            #(#client_methods)*
        }

        #[doc = #messages_doc]
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #messages_name;

        impl #messages_name {
            #(#message_methods)*
        }
    })
}

/// Remove `#[rpc(name = "...")]` and return the wire name it sets
fn take_wire_name(attrs: &mut Vec<Attribute>) -> syn::Result<Option<String>> {
    let mut wire_name = None;
    let mut error = None;

    attrs.retain(|attr| {
        if !attr.path().is_ident("rpc") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                wire_name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported rpc attribute, expected `name = \"...\"`"))
            }
        });
        if let Err(err) = parsed {
            error = Some(err);
        }
        false
    });

    match error {
        Some(err) => Err(err),
        None => Ok(wire_name),
    }
}

fn collect_method(method: &TraitItemFn, wire_name: Option<String>) -> syn::Result<RemoteMethod> {
    let sig = &method.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "#[rpc_client] methods are declared without `async`; the generated method returns a `Call`",
        ));
    }

    let mut arg_names = Vec::new();
    let mut arg_types = Vec::new();
    for (index, arg) in sig.inputs.iter().enumerate() {
        match arg {
            FnArg::Receiver(_) => continue,
            FnArg::Typed(pat_type) => {
                let name = match &*pat_type.pat {
                    Pat::Ident(pat_ident) => pat_ident.ident.clone(),
                    _ => format_ident!("__arg{}", index),
                };
                arg_names.push(name);
                arg_types.push((*pat_type.ty).clone());
            }
        }
    }

    let output = match &sig.output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => quote! { #ty },
    };

    let attrs = method
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .cloned()
        .collect();

    Ok(RemoteMethod {
        attrs,
        ident: sig.ident.clone(),
        wire_name: wire_name.unwrap_or_else(|| sig.ident.to_string()),
        arg_names,
        arg_types,
        output,
    })
}

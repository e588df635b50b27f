//! Handler procedural macro implementation
//!
//! # Macro Expansion Process
//!
//! 1. **Parse**: Parse the input function using `syn::ItemFn`
//! 2. **Context**: Read the context type `C` from the first parameter, `Arc<C>`
//! 3. **Params**: Collect the remaining parameter types into a tuple type
//! 4. **Wrap**: Generate a factory function that uses `from_typed_fn`
//!
//! # Code Generation Example
//!
//! Input:
//! ```ignore
//! #[handler]
//! async fn get_data(ctx: Arc<Session>, id: String) -> Result<Data> {
//!     Ok(Data { id, user_id: ctx.user_id.clone() })
//! }
//! ```
//!
//! Generated output:
//! ```ignore
//! fn get_data() -> Box<dyn jbatch_server::Handler<Session>> {
//!     async fn inner_handler(ctx: Arc<Session>, id: String) -> Result<Data> {
//!         Ok(Data { id, user_id: ctx.user_id.clone() })
//!     }
//!
//!     jbatch_server::from_typed_fn(
//!         |__ctx: Arc<Session>, (__arg0,): (String,)| inner_handler(__ctx, __arg0),
//!     )
//! }
//! ```

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{FnArg, GenericArgument, ItemFn, PathArguments, Type};

/// Expand `#[handler]` on an async function
pub fn handler_impl(input_fn: ItemFn) -> syn::Result<TokenStream> {
    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new(
            input_fn.sig.fn_token.span(),
            "#[handler] requires an async fn",
        ));
    }

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;
    let inner_sig = {
        let mut sig = input_fn.sig.clone();
        sig.ident = format_ident!("inner_handler");
        sig
    };
    let fn_block = &input_fn.block;

    let mut inputs = input_fn.sig.inputs.iter();

    let ctx_type = match inputs.next() {
        Some(FnArg::Typed(pat_type)) => context_type(&pat_type.ty)?,
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new(
                receiver.span(),
                "#[handler] functions cannot take self",
            ))
        }
        None => {
            return Err(syn::Error::new(
                input_fn.sig.paren_token.span.join(),
                "#[handler] functions take the context as `Arc<C>` first",
            ))
        }
    };

    let mut param_types = Vec::new();
    for arg in inputs {
        match arg {
            FnArg::Typed(pat_type) => param_types.push((*pat_type.ty).clone()),
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new(
                    receiver.span(),
                    "#[handler] functions cannot take self",
                ))
            }
        }
    }

    let arg_names: Vec<_> = (0..param_types.len())
        .map(|i| format_ident!("__arg{}", i))
        .collect();

    Ok(quote! {
        #(#fn_attrs)*
        #fn_vis fn #fn_name() -> Box<dyn jbatch_server::Handler<#ctx_type>> {
            #inner_sig #fn_block

            jbatch_server::from_typed_fn(
                |__ctx: ::std::sync::Arc<#ctx_type>, (#(#arg_names,)*): (#(#param_types,)*)| {
                    inner_handler(__ctx, #(#arg_names),*)
                },
            )
        }
    })
}

/// Extract `C` from `Arc<C>`
fn context_type(ty: &Type) -> syn::Result<Type> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Arc" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return Ok(inner.clone());
                    }
                }
            }
        }
    }

    Err(syn::Error::new(
        ty.span(),
        "the first parameter of a #[handler] must be the context as `Arc<C>`",
    ))
}

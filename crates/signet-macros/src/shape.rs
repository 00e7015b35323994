use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Ident, ItemFn, parse_macro_input};

/// Implementation of the `#[shape_provider]` attribute macro.
pub fn shape_provider(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "#[shape_provider] takes no arguments")
            .into_compile_error()
            .into();
    }
    let func = parse_macro_input!(item as ItemFn);

    if func.sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            func.sig.fn_token,
            "a shape provider must be a plain `fn`, not `async fn`",
        )
        .into_compile_error()
        .into();
    }

    let fn_name = &func.sig.ident;
    let fn_name_upper = fn_name.to_string().to_uppercase();
    let static_name = Ident::new(
        &format!("_SHAPE_PROVIDER_{fn_name_upper}"),
        Span::call_site(),
    );

    quote! {
        #func

        #[::signet_core::linkme::distributed_slice(::signet_core::SHAPE_PROVIDERS)]
        #[linkme(crate = ::signet_core::linkme)]
        static #static_name: ::signet_core::ShapeProvider = #fn_name;
    }
    .into()
}

//! `#[derive(FromRecord)]` implementation.
//!
//! # Field-level attributes `#[field(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `rename` | `"slow_mode_circle"` | Record entry to read instead of the field name |

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, spanned::Spanned};

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_from_record(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    input.span(),
                    "FromRecord requires a struct with named fields",
                ));
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "FromRecord can only be derived for structs",
            ));
        }
    };

    let mut inits = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new(field.span(), "expected a named field"));
        };
        let entry = match parse_rename(&field.attrs)? {
            Some(rename) => rename,
            None => LitStr::new(&ident.to_string(), ident.span()),
        };
        inits.push(quote! {
            #ident: record.extract(#entry)?
        });
    }

    Ok(quote! {
        impl #impl_generics ::signet_core::FromRecord for #name #ty_generics #where_clause {
            fn from_record(
                record: &::signet_core::Record,
            ) -> ::core::result::Result<Self, ::signet_core::DecodeError> {
                ::core::result::Result::Ok(Self {
                    #(#inits,)*
                })
            }
        }

        impl #impl_generics ::signet_core::FromFieldValue for #name #ty_generics #where_clause {
            fn from_field_value(
                value: &::signet_core::FieldValue,
                field: &str,
            ) -> ::core::result::Result<Self, ::signet_core::DecodeError> {
                ::signet_core::nested_record(value, field)
            }
        }
    })
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_rename(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut rename = None;

    for attr in attrs {
        if !attr.path().is_ident("field") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                rename = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unknown #[field] key, expected `rename`"))
            }
        })?;
    }

    Ok(rename)
}

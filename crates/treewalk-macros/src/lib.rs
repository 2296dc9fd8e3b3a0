//! # treewalk-macros
//!
//! Derive macros for treewalk check definitions.
//!
//! `#[derive(CheckMeta)]` implements `treewalk_core::CheckMetadata`, the
//! module name and mutability class the walker reads when it registers a
//! check:
//!
//! ```ignore
//! use treewalk_core::{Check, CheckMeta};
//!
//! #[derive(Default, CheckMeta)]
//! #[check(name = "EmptyBlock", mutability = "stateless")]
//! pub struct EmptyBlockCheck {
//!     option: BlockOption,
//! }
//! ```
//!
//! `name` defaults to the type name. Without `mutability` the check is
//! treated as file-stateful and cloned per worker.

#![forbid(unsafe_code)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

/// Implements `CheckMetadata` from a `#[check(...)]` attribute.
///
/// Accepted keys: `name = "..."` and `mutability = "stateless" |
/// "file_stateful" | "global_stateful"`.
#[proc_macro_derive(CheckMeta, attributes(check))]
pub fn derive_check_meta(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let mut name: Option<LitStr> = None;
    let mut mutability: Option<LitStr> = None;

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("check")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("mutability") {
                mutability = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported check attribute, expected `name` or `mutability`"))
            }
        })?;
    }

    let ident = &input.ident;
    let name = name.map_or_else(|| ident.to_string(), |lit| lit.value());
    let mutability = match mutability {
        None => quote!(::core::option::Option::None),
        Some(lit) => {
            let variant = match lit.value().as_str() {
                "stateless" => quote!(Stateless),
                "file_stateful" => quote!(FileStateful),
                "global_stateful" => quote!(GlobalStateful),
                other => {
                    return Err(syn::Error::new(
                        lit.span(),
                        format!("unknown mutability `{other}`, expected `stateless`, `file_stateful` or `global_stateful`"),
                    ))
                }
            };
            quote!(::core::option::Option::Some(::treewalk_core::Mutability::#variant))
        }
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::treewalk_core::CheckMetadata for #ident #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                #name
            }

            fn mutability(&self) -> ::core::option::Option<::treewalk_core::Mutability> {
                #mutability
            }
        }
    })
}

//! `#[derive(FromContext)]`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::attrs::{context_type, has_flag, named_fields};

pub fn derive_from_context_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(input, "FromContext")?;

    let context = match context_type(&input.attrs)? {
        Some(ty) => quote! { #ty },
        None => quote! { Context },
    };

    let mut inits = Vec::new();
    for field in &fields.named {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let field_type = &field.ty;

        if has_flag(field, "from_context", "default")? {
            inits.push(quote! { #field_name: ::core::default::Default::default() });
        } else {
            inits.push(quote! {
                #field_name: <#field_type as crate::FromRef<#context>>::from_ref(ctx)
            });
        }
    }

    Ok(quote! {
        impl #impl_generics crate::FromRef<#context> for #name #ty_generics #where_clause {
            fn from_ref(ctx: &#context) -> Self {
                Self {
                    #(#inits),*
                }
            }
        }
    })
}

//! Attribute parsing shared by the derives.

use syn::{Attribute, DeriveInput, Field, Fields, FieldsNamed};

/// Named fields of a struct, or a spanned error for anything else.
pub fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<&'a FieldsNamed> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

/// True when the field carries `#[<attr>(<flag>)]`.
pub fn has_flag(field: &Field, attr: &str, flag: &str) -> syn::Result<bool> {
    let mut found = false;
    for a in field.attrs.iter().filter(|a| a.path().is_ident(attr)) {
        a.parse_nested_meta(|meta| {
            if meta.path.is_ident(flag) {
                found = true;
                Ok(())
            } else {
                Err(meta.error(format!("unsupported {attr} option")))
            }
        })?;
    }
    Ok(found)
}

/// Reads `#[from_context(Context = "Type")]` from the container attributes.
pub fn context_type(attrs: &[Attribute]) -> syn::Result<Option<syn::Type>> {
    let mut context_ty = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("from_context")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("Context") {
                let value: syn::LitStr = meta.value()?.parse()?;
                context_ty = Some(value.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `Context = \"Type\"`"))
            }
        })?;
    }
    Ok(context_ty)
}

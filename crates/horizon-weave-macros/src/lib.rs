//! Procedural macros for Horizon Weave records.
//!
//! This crate provides `#[derive(Attributes)]`, which implements the
//! `horizon_weave_core::Attributes` contract for a struct with named fields.
//!
//! # Attributes
//!
//! ## `#[attributes(id)]`
//!
//! Marks the field holding the record's identity. Its type must convert into
//! `RecordId` (integers, `String`, `&'static str`):
//!
//! ```ignore
//! #[derive(Attributes, Clone)]
//! struct Article {
//!     #[attributes(id)]
//!     id: u32,
//!     title: String,
//! }
//! ```
//!
//! Without an identity field the record type reports a contract violation
//! when asked for its identity.
//!
//! ## `#[attributes(skip)]`
//!
//! Excludes a field from the attribute shape. Skipped fields are neither
//! readable by name nor assignable through `Record::set`.
//!
//! # Field Requirements
//!
//! Every attribute field must be `Clone + PartialEq + Send + Sync + 'static`.
//! Change detection compares old and new values with `PartialEq`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, Ident, LitStr, Type};

/// Derive the `Attributes` trait for a struct with named fields.
///
/// This macro generates:
/// - The static list of attribute names, in declaration order
/// - A type-erased getter that clones the field value
/// - A type-erased setter that assigns only when the value differs
/// - `id()` when a field is marked `#[attributes(id)]`
///
/// # Example
///
/// ```ignore
/// use horizon_weave::prelude::*;
///
/// #[derive(Attributes, Clone, Default)]
/// struct Employee {
///     #[attributes(id)]
///     id: u32,
///     name: String,
///     #[attributes(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Attributes, attributes(attributes))]
pub fn derive_attributes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match impl_derive_attributes(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Parsed information about one attribute field.
struct AttributeField {
    ident: Ident,
    ty: Type,
    name: LitStr,
    is_id: bool,
}

fn impl_derive_attributes(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Attributes derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Attributes derive only supports structs",
            ));
        }
    };

    let mut attribute_fields = Vec::new();
    for field in fields {
        if let Some(parsed) = parse_attribute_field(field)? {
            attribute_fields.push(parsed);
        }
    }

    let id_fields: Vec<&AttributeField> = attribute_fields.iter().filter(|f| f.is_id).collect();
    if id_fields.len() > 1 {
        return Err(syn::Error::new_spanned(
            &id_fields[1].ident,
            "only one field may be marked #[attributes(id)]",
        ));
    }

    let names: Vec<&LitStr> = attribute_fields.iter().map(|f| &f.name).collect();

    let getters = attribute_fields.iter().map(|f| {
        let ident = &f.ident;
        let name = &f.name;
        quote! {
            #name => ::std::option::Option::Some(::std::boxed::Box::new(
                ::std::clone::Clone::clone(&self.#ident),
            )),
        }
    });

    let setters = attribute_fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let name = &f.name;
        quote! {
            #name => {
                let value = value.downcast::<#ty>().map_err(|_| {
                    horizon_weave_core::CoreError::AttributeTypeMismatch {
                        attribute: ::std::string::ToString::to_string(name),
                        expected: ::std::any::type_name::<#ty>(),
                    }
                })?;
                if self.#ident == *value {
                    return ::std::result::Result::Ok(false);
                }
                self.#ident = *value;
                ::std::result::Result::Ok(true)
            }
        }
    });

    let id_impl = id_fields.first().map(|f| {
        let ident = &f.ident;
        quote! {
            fn id(&self) -> horizon_weave_core::Result<horizon_weave_core::RecordId> {
                ::std::result::Result::Ok(horizon_weave_core::RecordId::from(
                    ::std::clone::Clone::clone(&self.#ident),
                ))
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics horizon_weave_core::Attributes for #struct_name #ty_generics #where_clause {
            fn attribute_names(&self) -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn attribute(&self, name: &str) -> ::std::option::Option<horizon_weave_core::AttributeValue> {
                match name {
                    #(#getters)*
                    _ => ::std::option::Option::None,
                }
            }

            fn assign_attribute(
                &mut self,
                name: &str,
                value: horizon_weave_core::AttributeValue,
            ) -> horizon_weave_core::Result<bool> {
                match name {
                    #(#setters)*
                    _ => ::std::result::Result::Err(horizon_weave_core::CoreError::UnknownAttribute {
                        attribute: ::std::string::ToString::to_string(name),
                    }),
                }
            }

            #id_impl
        }
    };

    Ok(expanded)
}

/// Parse a field and its `#[attributes(...)]` options.
///
/// Returns `None` for skipped fields.
fn parse_attribute_field(field: &Field) -> syn::Result<Option<AttributeField>> {
    let ident = match &field.ident {
        Some(ident) => ident.clone(),
        None => return Ok(None),
    };

    let mut is_id = false;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("attributes") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                is_id = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `id` or `skip`"))
            }
        })?;
    }

    if skip {
        if is_id {
            return Err(syn::Error::new_spanned(
                &ident,
                "an identity field cannot be skipped",
            ));
        }
        return Ok(None);
    }

    let raw = ident.to_string();
    let name = LitStr::new(raw.trim_start_matches("r#"), ident.span());

    Ok(Some(AttributeField {
        ident,
        ty: field.ty.clone(),
        name,
        is_id,
    }))
}

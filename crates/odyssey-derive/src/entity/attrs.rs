//! Attribute parsing for the Entity derive macro.
//!
//! Struct level: `#[orm(table = "User", factory = "User::blank")]`.
//! Field level: `#[orm(key)]` (or `id`), `#[orm(column = "Name")]`, `#[orm(skip)]`.

use syn::parse::{Parse, ParseStream};
use syn::{DeriveInput, Result};

/// Parsed struct-level attributes.
#[derive(Default)]
pub(super) struct EntityAttr {
    pub table: Option<String>,
    pub factory: Option<syn::ExprPath>,
}

impl Parse for EntityAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = EntityAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;

            if ident == "table" {
                attr.table = Some(value.value());
            } else if ident == "factory" {
                attr.factory = Some(value.parse()?);
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unknown entity attribute; expected `table` or `factory`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Parsed field-level attributes.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub is_key: bool,
    pub skip: bool,
    pub column: Option<String>,
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "key" || ident == "id" {
                attr.is_key = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unknown field attribute; expected `key`, `column` or `skip`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` on the struct.
pub(super) fn entity_attr(input: &DeriveInput) -> Result<EntityAttr> {
    let mut merged = EntityAttr::default();
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            let parsed: EntityAttr = attr.parse_args()?;
            if parsed.table.is_some() {
                merged.table = parsed.table;
            }
            if parsed.factory.is_some() {
                merged.factory = parsed.factory;
            }
        }
    }
    Ok(merged)
}

/// Merge every `#[orm(...)]` on a field.
pub(super) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if attr.path().is_ident("orm") {
            let parsed: FieldAttr = attr.parse_args()?;
            merged.is_key |= parsed.is_key;
            merged.skip |= parsed.skip;
            if parsed.column.is_some() {
                merged.column = parsed.column;
            }
        }
    }
    Ok(merged)
}

//! Entity derive macro implementation

mod attrs;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

struct MappedField<'a> {
    ident: &'a syn::Ident,
    column: String,
    is_key: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let entity = attrs::entity_attr(&input)?;
    let table = entity.table.unwrap_or_else(|| name.to_string());

    let mut mapped: Vec<MappedField> = Vec::new();
    for field in fields {
        let attr = attrs::field_attr(field)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let column = attr.column.unwrap_or_else(|| ident.to_string());

        if attr.is_key && mapped.iter().any(|f| f.is_key) {
            return Err(syn::Error::new_spanned(
                field,
                "Entity supports a single key field",
            ));
        }
        if mapped.iter().any(|f| f.column == column) {
            return Err(syn::Error::new_spanned(
                field,
                format!("column `{column}` is mapped twice"),
            ));
        }
        mapped.push(MappedField {
            ident,
            column,
            is_key: attr.is_key,
        });
    }

    let field_defs = mapped.iter().map(|f| {
        let column = &f.column;
        if f.is_key {
            quote! { ::odyssey::FieldDef::key(#column) }
        } else {
            quote! { ::odyssey::FieldDef::new(#column) }
        }
    });

    let getters = mapped.iter().map(|f| {
        let ident = f.ident;
        let column = &f.column;
        quote! {
            #column => ::core::option::Option::Some(::odyssey::ToValue::to_value(&self.#ident)),
        }
    });

    let setters = mapped.iter().map(|f| {
        let ident = f.ident;
        let column = &f.column;
        quote! {
            #column => {
                self.#ident = ::odyssey::FromValue::from_value(value)
                    .map_err(|e| e.for_column(#column))?;
            }
        }
    });

    let factory = match &entity.factory {
        Some(path) => quote! { #path() },
        None => quote! { ::core::default::Default::default() },
    };

    Ok(quote! {
        impl #impl_generics ::odyssey::Entity for #name #ty_generics #where_clause {
            const DEF: ::odyssey::EntityDef = ::odyssey::EntityDef::new(
                #table,
                &[#(#field_defs),*],
            );

            fn instantiate() -> Self {
                #factory
            }

            fn get(&self, field: &str) -> ::core::option::Option<::odyssey::Value> {
                match field {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set(&mut self, field: &str, value: ::odyssey::Value) -> ::odyssey::OrmResult<()> {
                match field {
                    #(#setters)*
                    _ => {}
                }
                ::core::result::Result::Ok(())
            }
        }
    })
}

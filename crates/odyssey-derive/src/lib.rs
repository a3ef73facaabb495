//! Derive macros for odyssey
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive the `Entity` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use odyssey::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "User")]
/// struct User {
///     #[orm(key, column = "Id")]
///     id: i64,
///     #[orm(column = "Name")]
///     name: String,
///     #[orm(skip)]
///     cached_label: Option<String>,
/// }
/// ```
///
/// # Generated
///
/// - `DEF` - table name and mapped fields in declaration order
/// - `instantiate()` - the factory, `Default::default()` unless overridden
/// - `get` / `set` - field access by column name through `ToValue` / `FromValue`
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the struct name)
/// - `#[orm(factory = "path::to::fn")]` - Zero-argument constructor used by the mapper
/// - `#[orm(key)]` or `#[orm(id)]` - Mark the key field (at most one)
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Leave the field unmapped
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

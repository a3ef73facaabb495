//! Static entity descriptors.
//!
//! An entity type maps to one table. Instead of discovering fields and the key column at
//! runtime, each entity carries an [`EntityDef`]: its table name and its fields in
//! declaration order, with exactly one field flagged as the key.
//!
//! `#[derive(Entity)]` generates the descriptor and the accessors:
//!
//! ```ignore
//! use odyssey::Entity;
//!
//! #[derive(Debug, Default, Entity)]
//! #[orm(table = "User")]
//! struct User {
//!     #[orm(key, column = "Id")]
//!     id: i64,
//!     #[orm(column = "Name")]
//!     name: String,
//!     #[orm(column = "Active")]
//!     active: bool,
//! }
//! ```

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// One mapped field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name, also used as the placeholder name (`@name`).
    pub name: &'static str,
    /// Whether this field is the row's identity column.
    pub key: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str) -> Self {
        Self { name, key: false }
    }

    pub const fn key(name: &'static str) -> Self {
        Self { name, key: true }
    }
}

/// Table-level metadata of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDef {
    /// Table name, emitted verbatim.
    pub table: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldDef],
}

impl EntityDef {
    pub const fn new(table: &'static str, fields: &'static [FieldDef]) -> Self {
        Self { table, fields }
    }

    /// The key field.
    ///
    /// Fails with [`OrmError::MissingKeyField`] when none is flagged, and with a validation
    /// error when more than one is.
    pub fn key_field(&self) -> OrmResult<&'static FieldDef> {
        let mut keys = self.fields.iter().filter(|f| f.key);
        let key = keys.next().ok_or_else(|| OrmError::missing_key(self.table))?;
        if keys.next().is_some() {
            return Err(OrmError::validation(format!(
                "entity {} declares more than one key field",
                self.table
            )));
        }
        Ok(key)
    }

    /// All fields except the key, in declaration order.
    pub fn non_key_fields(&self) -> impl Iterator<Item = &'static FieldDef> + '_ {
        self.fields.iter().filter(|f| !f.key)
    }

    /// Look up a field by column name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A record type mapped to one table.
///
/// This trait should typically be derived using `#[derive(Entity)]`.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Table and field metadata.
    const DEF: EntityDef;

    /// Create a blank instance for the mapper to fill in.
    ///
    /// Mapping only goes through this factory, so the type needs no public constructor.
    fn instantiate() -> Self;

    /// Read a field by column name. Unknown names yield `None`.
    fn get(&self, field: &str) -> Option<Value>;

    /// Assign a field by column name, converting `value` to the field's type.
    ///
    /// Unknown names are ignored.
    fn set(&mut self, field: &str, value: Value) -> OrmResult<()>;
}

//! Row to entity mapping.
//!
//! The mapper fills a fresh entity (from [`Entity::instantiate`]) column by column. Fields
//! whose column is absent from the result set, or whose value is NULL, keep the value the
//! factory gave them.

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

/// A single result row with named columns.
pub trait DataRecord {
    /// Position of the column called `name`, if the row has one.
    ///
    /// An exact match wins; otherwise the first column equal to `name` ignoring ASCII case.
    /// Postgres folds unquoted identifiers to lower case, so `Name` comes back as `name`.
    fn ordinal(&self, name: &str) -> Option<usize>;

    /// Value of the column at `index`, NULL as [`Value::Null`].
    fn value_at(&self, index: usize) -> OrmResult<Value>;

    /// Value of the column called `name`, or `None` when there is no such column.
    fn value(&self, name: &str) -> OrmResult<Option<Value>> {
        match self.ordinal(name) {
            Some(index) => self.value_at(index).map(Some),
            None => Ok(None),
        }
    }
}

impl<R: DataRecord + ?Sized> DataRecord for &R {
    fn ordinal(&self, name: &str) -> Option<usize> {
        (**self).ordinal(name)
    }

    fn value_at(&self, index: usize) -> OrmResult<Value> {
        (**self).value_at(index)
    }
}

/// An in-memory row.
///
/// ```ignore
/// let row = Record::new().with("Id", 1).with("Name", "Ann");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.push(column, value);
        }
        record
    }
}

impl DataRecord for Record {
    fn ordinal(&self, name: &str) -> Option<usize> {
        find_column(self.columns.iter().map(String::as_str), name)
    }

    fn value_at(&self, index: usize) -> OrmResult<Value> {
        self.values.get(index).cloned().ok_or_else(|| {
            OrmError::conversion(index.to_string(), "column index out of range")
        })
    }
}

impl DataRecord for Row {
    fn ordinal(&self, name: &str) -> Option<usize> {
        find_column(self.columns().iter().map(|c| c.name()), name)
    }

    fn value_at(&self, index: usize) -> OrmResult<Value> {
        let column = self
            .columns()
            .get(index)
            .ok_or_else(|| OrmError::conversion(index.to_string(), "column index out of range"))?;
        let name = column.name();
        let ty = column.type_();

        let value = match *ty {
            Type::BOOL => decode::<bool>(self, index, name)?.map(Value::Bool),
            Type::INT2 => decode::<i16>(self, index, name)?.map(Value::from),
            Type::INT4 => decode::<i32>(self, index, name)?.map(Value::from),
            Type::INT8 => decode::<i64>(self, index, name)?.map(Value::Int),
            Type::FLOAT4 => decode::<f32>(self, index, name)?.map(Value::from),
            Type::FLOAT8 => decode::<f64>(self, index, name)?.map(Value::Float),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                decode::<String>(self, index, name)?.map(Value::Text)
            }
            Type::UUID => decode::<Uuid>(self, index, name)?.map(Value::Uuid),
            Type::DATE => decode::<NaiveDate>(self, index, name)?.map(Value::Date),
            Type::TIMESTAMP => decode::<NaiveDateTime>(self, index, name)?.map(Value::Timestamp),
            Type::TIMESTAMPTZ => {
                decode::<DateTime<Utc>>(self, index, name)?.map(Value::TimestampTz)
            }
            Type::JSON | Type::JSONB => {
                decode::<serde_json::Value>(self, index, name)?.map(Value::Json)
            }
            _ => {
                return Err(OrmError::conversion(
                    name,
                    format!("unsupported column type {ty}"),
                ));
            }
        };
        Ok(value.unwrap_or(Value::Null))
    }
}

fn find_column<'a>(
    mut columns: impl Iterator<Item = &'a str> + Clone,
    name: &str,
) -> Option<usize> {
    columns
        .clone()
        .position(|c| c == name)
        .or_else(|| columns.position(|c| c.eq_ignore_ascii_case(name)))
}

fn decode<T>(row: &Row, index: usize, column: &str) -> OrmResult<Option<T>>
where
    T: for<'a> FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index)
        .map_err(|e| OrmError::conversion(column, e.to_string()))
}

/// Builds entities of type `E` from rows.
#[derive(Debug)]
pub struct EntityMapper<E> {
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: Entity> Default for EntityMapper<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityMapper<E> {
    pub fn new() -> Self {
        Self {
            _entity: std::marker::PhantomData,
        }
    }

    /// Map one row.
    pub fn map<R: DataRecord + ?Sized>(&self, row: &R) -> OrmResult<E> {
        let mut entity = E::instantiate();
        for field in E::DEF.fields {
            let Some(index) = row.ordinal(field.name) else {
                tracing::trace!(
                    target: "odyssey.sql",
                    table = E::DEF.table,
                    column = field.name,
                    "column absent from result set; field left at its default"
                );
                continue;
            };
            let value = row.value_at(index)?;
            if value.is_null() {
                continue;
            }
            entity
                .set(field.name, value)
                .map_err(|e| e.for_column(field.name))?;
        }
        Ok(entity)
    }

    /// Map every row, stopping at the first failure.
    pub fn map_all<R: DataRecord>(&self, rows: &[R]) -> OrmResult<Vec<E>> {
        rows.iter().map(|row| self.map(row)).collect()
    }
}

/// Map one row into a new `E`.
pub fn map_row<E: Entity, R: DataRecord + ?Sized>(row: &R) -> OrmResult<E> {
    EntityMapper::<E>::new().map(row)
}

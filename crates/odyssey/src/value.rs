//! Scalar values shared by literals, parameter bindings and result rows.
//!
//! [`Value`] is the single currency between the compiler (literal embedding), the executor
//! (parameter binding) and the mapper (row decoding). Conversions into and out of Rust field
//! types go through [`ToValue`] and [`FromValue`].

use crate::error::{OrmError, OrmResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A runtime scalar value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL; also the sentinel bound for absent fields.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    /// Name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Json(_) => "json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::TimestampTz(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

// ── Binding to tokio-postgres ────────────────────────────────────────────────

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => {
                // Integer columns narrower than BIGINT need a narrowed encoding.
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql_checked(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql_checked(ty, out)
                } else {
                    v.to_sql_checked(ty, out)
                }
            }
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql_checked(ty, out)
                } else {
                    v.to_sql_checked(ty, out)
                }
            }
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::TimestampTz(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// ── Rust → Value ─────────────────────────────────────────────────────────────

/// Borrowing conversion of a field into a [`Value`].
///
/// Used by generated entity getters, which must not move out of `&self`.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

macro_rules! impl_to_value {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    let $v = self;
                    $body
                }
            }

            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    ToValue::to_value(&$v)
                }
            }
        )*
    };
}

impl_to_value! {
    bool => |v| Value::Bool(*v),
    i8 => |v| Value::Int(i64::from(*v)),
    i16 => |v| Value::Int(i64::from(*v)),
    i32 => |v| Value::Int(i64::from(*v)),
    i64 => |v| Value::Int(*v),
    u8 => |v| Value::Int(i64::from(*v)),
    u16 => |v| Value::Int(i64::from(*v)),
    u32 => |v| Value::Int(i64::from(*v)),
    // widen through the shortest decimal text so 0.1_f32 stays 0.1
    f32 => |v| Value::Float(v.to_string().parse().unwrap_or(f64::from(*v))),
    f64 => |v| Value::Float(*v),
    String => |v| Value::Text(v.clone()),
    Uuid => |v| Value::Uuid(*v),
    NaiveDate => |v| Value::Date(*v),
    NaiveDateTime => |v| Value::Timestamp(*v),
    DateTime<Utc> => |v| Value::TimestampTz(*v),
    serde_json::Value => |v| Value::Json(v.clone()),
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

// ── Value → Rust ─────────────────────────────────────────────────────────────

/// Conversion of a [`Value`] into a field's declared type.
///
/// Errors are [`OrmError::Conversion`] with an empty column; callers that know the column
/// attach it with [`OrmError::for_column`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> OrmResult<Self>;
}

fn mismatch(value: &Value, target: &str) -> OrmError {
    OrmError::conversion("", format!("cannot convert {} value {value} to {target}", value.kind()))
}

impl FromValue for Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Text(ref s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(mismatch(&value, "bool")),
            },
            other => Err(mismatch(&other, "bool")),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> OrmResult<Self> {
                    let target = stringify!($ty);
                    match value {
                        Value::Int(v) => <$ty>::try_from(v).map_err(|_| {
                            OrmError::conversion("", format!("{v} is out of range for {target}"))
                        }),
                        Value::Bool(v) => Ok(<$ty>::from(v)),
                        Value::Float(v) if v.fract() == 0.0 => {
                            let wide = v as i64;
                            if wide as f64 != v {
                                return Err(mismatch(&value, target));
                            }
                            <$ty>::try_from(wide).map_err(|_| mismatch(&value, target))
                        }
                        Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch(&value, target)),
                        other => Err(mismatch(&other, target)),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64, u8, u16, u32);

impl FromValue for f64 {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch(&value, "f64")),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> OrmResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Null => Err(mismatch(&Value::Null, "String")),
            Value::Json(serde_json::Value::String(v)) => Ok(v),
            Value::Json(v) => Ok(v.to_string()),
            Value::TimestampTz(v) => Ok(v.to_rfc3339()),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Text(ref s) => Uuid::parse_str(s.trim()).map_err(|_| mismatch(&value, "Uuid")),
            other => Err(mismatch(&other, "Uuid")),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Date(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.date()),
            Value::TimestampTz(v) => Ok(v.date_naive()),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch(&value, "NaiveDate")),
            other => Err(mismatch(&other, "NaiveDate")),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::TimestampTz(v) => Ok(v.naive_utc()),
            Value::Date(v) => Ok(v.and_time(chrono::NaiveTime::MIN)),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch(&value, "NaiveDateTime")),
            other => Err(mismatch(&other, "NaiveDateTime")),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::TimestampTz(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc()),
            Value::Text(ref s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|v| v.with_timezone(&Utc))
                .map_err(|_| mismatch(&value, "DateTime<Utc>")),
            other => Err(mismatch(&other, "DateTime<Utc>")),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(ref s) => serde_json::from_str(s).map_err(|e| {
                OrmError::conversion("", format!("invalid json text: {e}"))
            }),
            other => Err(mismatch(&other, "serde_json::Value")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

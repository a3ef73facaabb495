//! Expression trees for predicates and projections.
//!
//! An [`Expr`] is built once per query against the entity's implicit row, handed to the
//! compiler, and never mutated. The grammar is closed: the compiler matches on every
//! variant and rejects the shapes it cannot lower.
//!
//! ```ignore
//! use odyssey::expr::{field, Capture};
//!
//! // Name = 'Ann' AND Active = 1
//! let predicate = field("Name").eq("Ann").and(field("Active").eq(true));
//!
//! // values closed over when the expression is built
//! let env = Capture::new().bind("min_age", 18).into_shared();
//! let adults = field("Age").ge(Capture::var(&env, "min_age"));
//! ```

use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Operator of a binary node.
///
/// Only logical and comparison operators lower to SQL; the arithmetic and bitwise ones
/// exist so callers can describe them and get a precise error back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    AndAlso,
    OrElse,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    /// Node kind name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::AndAlso => "AndAlso",
            BinaryOp::OrElse => "OrElse",
            BinaryOp::Equal => "Equal",
            BinaryOp::NotEqual => "NotEqual",
            BinaryOp::LessThan => "LessThan",
            BinaryOp::LessThanOrEqual => "LessThanOrEqual",
            BinaryOp::GreaterThan => "GreaterThan",
            BinaryOp::GreaterThanOrEqual => "GreaterThanOrEqual",
            BinaryOp::Add => "Add",
            BinaryOp::Subtract => "Subtract",
            BinaryOp::Multiply => "Multiply",
            BinaryOp::Divide => "Divide",
            BinaryOp::Modulo => "Modulo",
            BinaryOp::BitAnd => "And",
            BinaryOp::BitOr => "Or",
            BinaryOp::BitXor => "ExclusiveOr",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

/// A variable slot inside a [`Capture`].
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Value(Value),
    Nested(Capture),
}

/// Values closed over when an expression is built.
///
/// A capture is only reachable through a member node (`Capture::var`), the same way a
/// closure's environment is only reachable through its fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capture {
    vars: BTreeMap<String, Captured>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar variable.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), Captured::Value(value.into()));
        self
    }

    /// Add a nested environment, reachable as `var.field`.
    pub fn nest(mut self, name: impl Into<String>, inner: Capture) -> Self {
        self.vars.insert(name.into(), Captured::Nested(inner));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Captured> {
        self.vars.get(name)
    }

    pub fn into_shared(self) -> Arc<Capture> {
        Arc::new(self)
    }

    /// Reference variable `name` of a shared environment.
    pub fn var(env: &Arc<Capture>, name: impl Into<String>) -> Expr {
        Expr::Captured(Arc::clone(env)).member(name)
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The query's implicit row parameter.
    Row,
    /// A named query parameter, bound at execution time.
    Param(String),
    /// A literal.
    Constant(Value),
    /// A captured environment; only meaningful as the root of a member chain.
    Captured(Arc<Capture>),
    /// Member access: `target.name`.
    Member { target: Box<Expr>, name: String },
    /// Logical, comparison, or arithmetic node.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Logical negation.
    Not(Box<Expr>),
    /// A constructed tuple of expressions, used for multi-column projections.
    Record(Vec<Expr>),
    /// A type conversion wrapper around an operand.
    Convert(Box<Expr>),
}

/// The implicit row parameter.
pub fn row() -> Expr {
    Expr::Row
}

/// A field directly off the row: `row.name`.
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Row.member(name)
}

/// A nested field path off the row, split on `.`: `path("Address.City")`.
pub fn path(dotted: &str) -> Expr {
    dotted.split('.').fold(Expr::Row, |target, name| target.member(name))
}

/// A named query parameter (`@name`).
pub fn param(name: impl Into<String>) -> Expr {
    Expr::Param(name.into())
}

/// A literal constant.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

/// A record of projected fields.
pub fn record(items: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Record(items.into_iter().collect())
}

impl Expr {
    /// Build a binary node.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: impl IntoOperand) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs.into_operand()),
        }
    }

    /// Access member `name` of this expression.
    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// Wrap in a conversion node.
    pub fn convert(self) -> Self {
        Expr::Convert(Box::new(self))
    }

    /// Create a NOT expression.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn and(self, other: Expr) -> Self {
        Self::binary(BinaryOp::AndAlso, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Self::binary(BinaryOp::OrElse, self, other)
    }

    pub fn eq(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::Equal, self, rhs)
    }

    pub fn ne(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::NotEqual, self, rhs)
    }

    pub fn lt(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::LessThan, self, rhs)
    }

    pub fn le(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::LessThanOrEqual, self, rhs)
    }

    pub fn gt(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::GreaterThan, self, rhs)
    }

    pub fn ge(self, rhs: impl IntoOperand) -> Self {
        Self::binary(BinaryOp::GreaterThanOrEqual, self, rhs)
    }

    /// Node kind name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Row => "Parameter",
            Expr::Param(_) => "QueryParameter",
            Expr::Constant(_) => "Constant",
            Expr::Captured(_) => "Captured",
            Expr::Member { .. } => "MemberAccess",
            Expr::Binary { op, .. } => op.name(),
            Expr::Not(_) => "Not",
            Expr::Record(_) => "New",
            Expr::Convert(_) => "Convert",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Row => f.write_str("row"),
            Expr::Param(name) => write!(f, "@{name}"),
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Captured(_) => f.write_str("<captured>"),
            Expr::Member { target, name } => write!(f, "{target}.{name}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Not(inner) => write!(f, "!{inner}"),
            Expr::Record(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            Expr::Convert(inner) => write!(f, "convert({inner})"),
        }
    }
}

/// Right-hand operand of a comparison.
///
/// Plain values become constants; expressions pass through unchanged.
pub trait IntoOperand {
    fn into_operand(self) -> Expr;
}

impl IntoOperand for Expr {
    fn into_operand(self) -> Expr {
        self
    }
}

macro_rules! impl_into_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOperand for $ty {
                fn into_operand(self) -> Expr {
                    Expr::Constant(Value::from(self))
                }
            }
        )*
    };
}

impl_into_operand!(
    Value,
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    &str,
    Uuid,
    NaiveDate,
    NaiveDateTime,
    DateTime<Utc>,
    serde_json::Value,
);

impl<T: Into<Value>> IntoOperand for Option<T> {
    fn into_operand(self) -> Expr {
        Expr::Constant(Value::from(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_builds_nested_members() {
        assert_eq!(path("Address.City"), field("Address").member("City"));
        assert_eq!(path("Address.City").to_string(), "row.Address.City");
    }

    #[test]
    fn comparison_wraps_plain_values_as_constants() {
        let expr = field("Age").gt(18);
        let Expr::Binary { op, rhs, .. } = expr else {
            panic!("expected binary node");
        };
        assert_eq!(op, BinaryOp::GreaterThan);
        assert_eq!(*rhs, Expr::Constant(Value::Int(18)));
    }

    #[test]
    fn captured_var_is_member_of_environment() {
        let env = Capture::new().bind("name", "Ann").into_shared();
        let var = Capture::var(&env, "name");
        assert_eq!(var.kind(), "MemberAccess");
        assert_eq!(var.to_string(), "<captured>.name");
    }

    #[test]
    fn kind_names_binary_operator() {
        assert_eq!(field("A").eq(1).kind(), "Equal");
        assert_eq!(Expr::binary(BinaryOp::Add, field("A"), 1).kind(), "Add");
        assert_eq!(Expr::not(field("A")).kind(), "Not");
    }
}

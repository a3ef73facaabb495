//! Lowering of predicate and projection trees to SQL fragments.

use super::statement::Binding;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{BinaryOp, Captured, Expr};
use crate::value::Value;

/// Comparison operators and their SQL spelling. The only operators that lower.
static OPERATORS: [(BinaryOp, &str); 6] = [
    (BinaryOp::Equal, "="),
    (BinaryOp::NotEqual, "<>"),
    (BinaryOp::GreaterThan, ">"),
    (BinaryOp::GreaterThanOrEqual, ">="),
    (BinaryOp::LessThan, "<"),
    (BinaryOp::LessThanOrEqual, "<="),
];

pub(crate) fn sql_operator(op: BinaryOp) -> OrmResult<&'static str> {
    OPERATORS
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, sql)| *sql)
        .ok_or_else(|| OrmError::UnsupportedOperator(op.name().to_string()))
}

/// Right-hand side of a comparison after resolution.
enum Operand {
    Literal(Value),
    Placeholder(String),
}

/// One predicate lowering pass. Collects deferred placeholders in first-appearance order.
pub(crate) struct Lowering {
    dialect: Dialect,
    deferred: Vec<Binding>,
}

impl Lowering {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            deferred: Vec::new(),
        }
    }

    pub(crate) fn into_bindings(self) -> Vec<Binding> {
        self.deferred
    }

    pub(crate) fn predicate(&mut self, expr: &Expr) -> OrmResult<String> {
        match expr {
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::AndAlso => self.logical("AND", lhs, rhs),
                BinaryOp::OrElse => self.logical("OR", lhs, rhs),
                _ => self.comparison(*op, lhs, rhs),
            },
            Expr::Row
            | Expr::Param(_)
            | Expr::Constant(_)
            | Expr::Captured(_)
            | Expr::Member { .. }
            | Expr::Not(_)
            | Expr::Record(_)
            | Expr::Convert(_) => Err(OrmError::unsupported_expression(expr.kind())),
        }
    }

    fn logical(&mut self, connective: &str, lhs: &Expr, rhs: &Expr) -> OrmResult<String> {
        let left = self.predicate(lhs)?;
        let right = self.predicate(rhs)?;
        Ok(format!("({left} {connective} {right})"))
    }

    fn comparison(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> OrmResult<String> {
        let operator = sql_operator(op)?;
        let column = comparison_column(lhs)?;

        match self.operand(rhs)? {
            Operand::Literal(Value::Null) if op == BinaryOp::Equal => {
                Ok(format!("({column} IS NULL)"))
            }
            Operand::Literal(Value::Null) if op == BinaryOp::NotEqual => {
                Ok(format!("({column} IS NOT NULL)"))
            }
            Operand::Literal(value) => Ok(format!(
                "({column} {operator} {})",
                render_literal(&value, self.dialect)
            )),
            Operand::Placeholder(name) => {
                let sql = format!("({column} {operator} @{name})");
                if !self.deferred.iter().any(|b| b.name == name) {
                    self.deferred.push(Binding::deferred(name));
                }
                Ok(sql)
            }
        }
    }

    fn operand(&self, expr: &Expr) -> OrmResult<Operand> {
        match expr {
            Expr::Constant(value) => Ok(Operand::Literal(value.clone())),
            Expr::Param(name) => Ok(Operand::Placeholder(name.clone())),
            Expr::Convert(inner) => self.operand(inner),
            Expr::Member { target, name } => {
                if matches!(target.as_ref(), Expr::Row) {
                    return Ok(Operand::Placeholder(name.clone()));
                }
                match captured(expr) {
                    Some(Captured::Value(value)) => Ok(Operand::Literal(value.clone())),
                    Some(Captured::Nested(_)) | None => {
                        Err(OrmError::UnsupportedMemberExpression(expr.to_string()))
                    }
                }
            }
            Expr::Row
            | Expr::Captured(_)
            | Expr::Binary { .. }
            | Expr::Not(_)
            | Expr::Record(_) => Err(OrmError::unsupported_expression(expr.kind())),
        }
    }
}

/// Left side of a comparison: a member chain, optionally wrapped in a conversion.
fn comparison_column(expr: &Expr) -> OrmResult<String> {
    match expr {
        Expr::Member { .. } => member_path(expr),
        Expr::Convert(inner) => comparison_column(inner),
        _ => Err(OrmError::unsupported_expression(expr.kind())),
    }
}

/// Resolve a member chain rooted in the row: `Name` or `Address.City`.
pub(crate) fn member_path(expr: &Expr) -> OrmResult<String> {
    fn walk(expr: &Expr) -> Option<String> {
        let Expr::Member { target, name } = expr else {
            return None;
        };
        match target.as_ref() {
            Expr::Row => Some(name.clone()),
            Expr::Member { .. } => walk(target).map(|outer| format!("{outer}.{name}")),
            _ => None,
        }
    }

    walk(expr).ok_or_else(|| OrmError::UnsupportedMemberExpression(expr.to_string()))
}

/// Follow a member chain rooted in a captured environment to its slot.
fn captured(expr: &Expr) -> Option<&Captured> {
    let Expr::Member { target, name } = expr else {
        return None;
    };
    match target.as_ref() {
        Expr::Captured(env) => env.get(name),
        Expr::Member { .. } => match captured(target)? {
            Captured::Nested(env) => env.get(name),
            Captured::Value(_) => None,
        },
        _ => None,
    }
}

/// Columns named by a projection: one member, or a record of members.
pub(crate) fn projection_columns(expr: &Expr) -> OrmResult<Vec<String>> {
    fn column(expr: &Expr) -> OrmResult<String> {
        match expr {
            Expr::Member { .. } => member_path(expr),
            Expr::Convert(inner) if matches!(inner.as_ref(), Expr::Member { .. }) => {
                member_path(inner)
            }
            _ => Err(OrmError::UnsupportedProjectionShape(expr.to_string())),
        }
    }

    match expr {
        Expr::Record(items) if !items.is_empty() => items.iter().map(column).collect(),
        _ => column(expr).map(|c| vec![c]),
    }
}

/// Embed a compile-time value as SQL text.
pub(crate) fn render_literal(value: &Value, dialect: Dialect) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(v) => dialect.bool_literal(*v).to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) if v.is_nan() => quote("NaN"),
        Value::Float(v) if v.is_infinite() => {
            quote(if v.is_sign_positive() { "Infinity" } else { "-Infinity" })
        }
        Value::Float(v) => v.to_string(),
        Value::Text(v) => quote(v),
        Value::Uuid(v) => quote(&v.to_string()),
        Value::Date(v) => quote(&v.format("%Y-%m-%d").to_string()),
        Value::Timestamp(v) => quote(&v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::TimestampTz(v) => quote(&v.to_rfc3339()),
        Value::Json(v) => quote(&v.to_string()),
    }
}

/// Single-quote a string, doubling embedded quotes.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

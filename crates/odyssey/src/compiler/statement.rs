//! Compiled statements: SQL text plus ordered named bindings.

use crate::value::Value;
use std::fmt;

/// Statement kind, as produced by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
    /// Hand-written SQL of any other kind.
    Other,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Other => "other",
        }
    }

    /// Kind of hand-written SQL, from its leading keyword.
    pub fn of_sql(sql: &str) -> Self {
        let keyword = sql.split_whitespace().next().unwrap_or_default();
        [
            StatementKind::Select,
            StatementKind::Insert,
            StatementKind::Update,
            StatementKind::Delete,
        ]
        .into_iter()
        .find(|kind| keyword.eq_ignore_ascii_case(kind.as_str()))
        .unwrap_or(StatementKind::Other)
    }
}

/// Where a placeholder's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingSource {
    /// Known at compile time.
    Literal(Value),
    /// Read from the execution argument by placeholder name.
    Deferred,
}

/// One `@name` placeholder of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub source: BindingSource,
}

impl Binding {
    pub fn deferred(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: BindingSource::Deferred,
        }
    }

    pub fn literal(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            source: BindingSource::Literal(value),
        }
    }
}

/// Output of one compile call.
///
/// Never cached: compiling the same description twice yields two equal, independent values.
/// The default value is an empty statement, which the executor refuses to run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledStatement {
    kind: StatementKind,
    sql: String,
    bindings: Vec<Binding>,
    raw: bool,
}

impl CompiledStatement {
    pub(crate) fn new(kind: StatementKind, sql: String, bindings: Vec<Binding>) -> Self {
        Self {
            kind,
            sql,
            bindings,
            raw: false,
        }
    }

    /// Wrap hand-written SQL. Placeholders use the same `@name` form the compiler emits.
    ///
    /// ```ignore
    /// let stmt = CompiledStatement::raw(
    ///     StatementKind::Select,
    ///     "SELECT * FROM users WHERE lower(name) = lower(@name)",
    ///     [Binding::deferred("name")],
    /// );
    /// ```
    pub fn raw(
        kind: StatementKind,
        sql: impl Into<String>,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Self {
        Self {
            kind,
            sql: sql.into(),
            bindings: bindings.into_iter().collect(),
            raw: true,
        }
    }

    /// Whether the statement was written by hand rather than compiled.
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bindings in placeholder order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Placeholder names in binding order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.name.as_str())
    }

    /// Names of the bindings whose values come from the execution argument.
    pub fn deferred_fields(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.source == BindingSource::Deferred)
            .map(|b| b.name.as_str())
            .collect()
    }

    /// The key column matched by a compiled UPDATE or DELETE.
    pub fn key_column(&self) -> Option<&str> {
        if self.raw {
            return None;
        }
        match self.kind {
            StatementKind::Update | StatementKind::Delete => {
                self.bindings.last().map(|b| b.name.as_str())
            }
            StatementKind::Select | StatementKind::Insert | StatementKind::Other => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

impl fmt::Display for CompiledStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

//! Join specifications for SELECT statements.
//!
//! ```ignore
//! use odyssey::join::{JoinClause, JoinSpec};
//!
//! let joins = JoinSpec::new()
//!     .join(JoinClause::inner().primary_table("User").secondary_table("Order")
//!         .primary_key("Id").foreign_key("UserId"))
//!     .left("Order", "Invoice", "Id", "OrderId");
//! ```

use crate::error::{OrmError, OrmResult};

/// Kind of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

/// One join entry: `KIND JOIN secondary ON primary.primary_key = secondary.foreign_key`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinClause {
    kind: JoinKind,
    primary_table: String,
    secondary_table: String,
    primary_key: String,
    foreign_key: String,
}

impl JoinClause {
    pub fn new(kind: JoinKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn inner() -> Self {
        Self::new(JoinKind::Inner)
    }

    pub fn left() -> Self {
        Self::new(JoinKind::Left)
    }

    pub fn right() -> Self {
        Self::new(JoinKind::Right)
    }

    pub fn full() -> Self {
        Self::new(JoinKind::Full)
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn primary_table(mut self, table: impl Into<String>) -> Self {
        self.primary_table = table.into();
        self
    }

    pub fn secondary_table(mut self, table: impl Into<String>) -> Self {
        self.secondary_table = table.into();
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = column.into();
        self
    }

    pub fn join_kind(&self) -> JoinKind {
        self.kind
    }

    /// Render the clause. Every table and key name must be set.
    pub fn to_sql(&self) -> OrmResult<String> {
        for (part, value) in [
            ("primary table", &self.primary_table),
            ("secondary table", &self.secondary_table),
            ("primary key", &self.primary_key),
            ("foreign key", &self.foreign_key),
        ] {
            if value.is_empty() {
                return Err(OrmError::validation(format!(
                    "join clause is missing its {part}"
                )));
            }
        }

        Ok(format!(
            "{} {} ON {}.{} = {}.{}",
            self.kind.keyword(),
            self.secondary_table,
            self.primary_table,
            self.primary_key,
            self.secondary_table,
            self.foreign_key
        ))
    }
}

/// Ordered list of joins, rendered in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSpec {
    clauses: Vec<JoinClause>,
}

impl JoinSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause.
    pub fn join(mut self, clause: JoinClause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn inner(self, primary: &str, secondary: &str, primary_key: &str, foreign_key: &str) -> Self {
        self.entry(JoinKind::Inner, primary, secondary, primary_key, foreign_key)
    }

    pub fn left(self, primary: &str, secondary: &str, primary_key: &str, foreign_key: &str) -> Self {
        self.entry(JoinKind::Left, primary, secondary, primary_key, foreign_key)
    }

    pub fn right(self, primary: &str, secondary: &str, primary_key: &str, foreign_key: &str) -> Self {
        self.entry(JoinKind::Right, primary, secondary, primary_key, foreign_key)
    }

    pub fn full(self, primary: &str, secondary: &str, primary_key: &str, foreign_key: &str) -> Self {
        self.entry(JoinKind::Full, primary, secondary, primary_key, foreign_key)
    }

    fn entry(
        self,
        kind: JoinKind,
        primary: &str,
        secondary: &str,
        primary_key: &str,
        foreign_key: &str,
    ) -> Self {
        self.join(
            JoinClause::new(kind)
                .primary_table(primary)
                .secondary_table(secondary)
                .primary_key(primary_key)
                .foreign_key(foreign_key),
        )
    }

    pub fn clauses(&self) -> &[JoinClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }
}

impl From<JoinClause> for JoinSpec {
    fn from(clause: JoinClause) -> Self {
        JoinSpec::new().join(clause)
    }
}

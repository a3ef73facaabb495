//! Query compiler: entity descriptors and expression trees to SQL.
//!
//! The compiler is a pure function of its inputs. It keeps no state between calls beyond its
//! dialect and a static operator table, so one instance can be shared across threads.
//!
//! # Output
//!
//! ```text
//! SELECT * FROM User WHERE ((Name = 'Ann') AND (Active = 1))
//! INSERT INTO User (Name, Active) VALUES (@Name, @Active)
//! UPDATE User SET Name = @Name, Active = @Active WHERE Id = @Id
//! DELETE FROM User WHERE Id = @Id
//! ```
//!
//! Logical and comparison results are always parenthesized. Table and column names are
//! emitted verbatim.

mod lower;
mod statement;

pub use statement::{Binding, BindingSource, CompiledStatement, StatementKind};

use crate::dialect::Dialect;
use crate::entity::EntityDef;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::join::JoinSpec;
use crate::value::Value;
use lower::{Lowering, projection_columns};

/// Translates query descriptions into [`CompiledStatement`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCompiler {
    dialect: Dialect,
}

impl QueryCompiler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compile a SELECT.
    ///
    /// - no projection selects `*`
    /// - joins are emitted in list order between the table and the WHERE clause
    /// - `@name` placeholders in the predicate become deferred bindings
    pub fn compile_select(
        &self,
        entity: &EntityDef,
        projection: Option<&Expr>,
        predicate: Option<&Expr>,
        joins: Option<&JoinSpec>,
    ) -> OrmResult<CompiledStatement> {
        let columns = match projection {
            Some(expr) => projection_columns(expr)?.join(", "),
            None => "*".to_string(),
        };

        let mut sql = format!("SELECT {columns} FROM {}", entity.table);

        if let Some(joins) = joins {
            for clause in joins.clauses() {
                sql.push(' ');
                sql.push_str(&clause.to_sql()?);
            }
        }

        let mut lowering = Lowering::new(self.dialect);
        if let Some(predicate) = predicate {
            let where_clause = lowering.predicate(predicate)?;
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }

        Ok(CompiledStatement::new(
            StatementKind::Select,
            sql,
            lowering.into_bindings(),
        ))
    }

    /// Compile an INSERT of every non-key field.
    ///
    /// Columns and placeholders come from the same pass, so `columns[i]` always pairs with
    /// `values[i]` and with `bindings()[i]`.
    pub fn compile_insert(&self, entity: &EntityDef) -> OrmResult<CompiledStatement> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        let mut bindings = Vec::new();
        for field in entity.non_key_fields() {
            columns.push(field.name);
            values.push(format!("@{}", field.name));
            bindings.push(Binding::deferred(field.name));
        }
        if columns.is_empty() {
            return Err(OrmError::validation(format!(
                "entity {} has no insertable fields",
                entity.table
            )));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            entity.table,
            columns.join(", "),
            values.join(", ")
        );
        Ok(CompiledStatement::new(StatementKind::Insert, sql, bindings))
    }

    /// Compile an UPDATE of every non-key field, matched on the key.
    ///
    /// Bindings list the SET fields in order, then the key last.
    pub fn compile_update(&self, entity: &EntityDef) -> OrmResult<CompiledStatement> {
        let key = entity.key_field()?;

        let mut assignments = Vec::new();
        let mut bindings = Vec::new();
        for field in entity.non_key_fields() {
            assignments.push(format!("{0} = @{0}", field.name));
            bindings.push(Binding::deferred(field.name));
        }
        if assignments.is_empty() {
            return Err(OrmError::validation(format!(
                "entity {} has no fields to update",
                entity.table
            )));
        }
        bindings.push(Binding::deferred(key.name));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = @{}",
            entity.table,
            assignments.join(", "),
            key.name,
            key.name
        );
        Ok(CompiledStatement::new(StatementKind::Update, sql, bindings))
    }

    /// Compile a DELETE by key. The key value is always bound, never embedded.
    pub fn compile_delete(
        &self,
        entity: &EntityDef,
        key_value: impl Into<Value>,
    ) -> OrmResult<CompiledStatement> {
        let key = entity.key_field()?;
        let sql = format!("DELETE FROM {} WHERE {} = @{}", entity.table, key.name, key.name);
        Ok(CompiledStatement::new(
            StatementKind::Delete,
            sql,
            vec![Binding::literal(key.name, key_value.into())],
        ))
    }
}

#[cfg(test)]
mod tests;

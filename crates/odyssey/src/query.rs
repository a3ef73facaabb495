//! Read query descriptions.

use crate::compiler::{CompiledStatement, QueryCompiler};
use crate::entity::EntityDef;
use crate::error::OrmResult;
use crate::expr::Expr;
use crate::join::{JoinClause, JoinSpec};

/// The parts of a SELECT against one entity.
///
/// # Example
///
/// ```ignore
/// use odyssey::{Query, field, param};
///
/// let users: Vec<User> = executor
///     .query_as(
///         &Query::new()
///             .select(field("Name"))
///             .filter(field("Name").eq(param("Name"))),
///         Some(&Value::from("Ann")),
///     )
///     .await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    projection: Option<Expr>,
    predicate: Option<Expr>,
    joins: JoinSpec,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projection. Without one every column is selected.
    pub fn select(mut self, projection: Expr) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Set the predicate, or AND it onto the existing one.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Append a join.
    pub fn join(mut self, clause: JoinClause) -> Self {
        self.joins = self.joins.join(clause);
        self
    }

    /// Replace all joins.
    pub fn joins(mut self, joins: JoinSpec) -> Self {
        self.joins = joins;
        self
    }

    pub fn projection(&self) -> Option<&Expr> {
        self.projection.as_ref()
    }

    pub fn predicate(&self) -> Option<&Expr> {
        self.predicate.as_ref()
    }

    pub fn join_spec(&self) -> Option<&JoinSpec> {
        (!self.joins.is_empty()).then_some(&self.joins)
    }

    /// Compile against `entity`.
    pub fn compile(
        &self,
        compiler: &QueryCompiler,
        entity: &EntityDef,
    ) -> OrmResult<CompiledStatement> {
        compiler.compile_select(entity, self.projection(), self.predicate(), self.join_spec())
    }
}

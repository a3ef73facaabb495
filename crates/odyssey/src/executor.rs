//! Execution engine: compile, bind, run on a scoped connection, map.
//!
//! Every operation takes `&mut self`. The compiled statement is a local value threaded from
//! the compile step into the run step, so one executor is one unit of work; share it behind
//! a mutex if several tasks need it.

use crate::compiler::{Binding, BindingSource, CompiledStatement, QueryCompiler, StatementKind};
use crate::config::ExecutorConfig;
use crate::connection::{Connection, ConnectionProvider, Param};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::join::JoinSpec;
use crate::mapper::{DataRecord, EntityMapper, Record};
use crate::query::Query;
use crate::value::Value;
use tracing::Level;

/// Something statement placeholders can be bound from.
///
/// Entities bind field by field. Plain values have a scalar view, used when a statement has
/// exactly one placeholder.
pub trait BindSource: Sync {
    /// The argument as a single value, if it is one.
    fn as_scalar(&self) -> Option<Value> {
        None
    }

    /// The value of the field called `name`, if present.
    fn field_value(&self, name: &str) -> Option<Value>;
}

impl<E: Entity> BindSource for E {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

impl BindSource for Value {
    fn as_scalar(&self) -> Option<Value> {
        Some(self.clone())
    }

    fn field_value(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl BindSource for Record {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.value(name).ok().flatten()
    }
}

impl BindSource for Vec<Param> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.iter().find(|p| p.name == name).map(|p| p.value.clone())
    }
}

/// Resolve the value of every binding of `statement`.
///
/// - no bindings: [`OrmError::NullArgument`] (`"properties"`)
/// - deferred bindings but no argument: [`OrmError::NullArgument`] (`"entity"`)
/// - exactly one binding: the argument's scalar view, else its field of that name
/// - several bindings: each field by name; absent fields bind as NULL
///
/// Literal bindings always use their compile-time value.
pub fn bind_arguments(
    statement: &CompiledStatement,
    arg: Option<&dyn BindSource>,
) -> OrmResult<Vec<Param>> {
    let bindings = statement.bindings();
    if bindings.is_empty() {
        return Err(OrmError::NullArgument("properties".to_string()));
    }
    let needs_arg = bindings
        .iter()
        .any(|b| b.source == BindingSource::Deferred);
    if needs_arg && arg.is_none() {
        return Err(OrmError::NullArgument("entity".to_string()));
    }

    let single = bindings.len() == 1;
    let params = bindings
        .iter()
        .map(|binding| {
            let value = match (&binding.source, arg) {
                (BindingSource::Literal(value), _) => value.clone(),
                (BindingSource::Deferred, Some(arg)) if single => arg
                    .as_scalar()
                    .or_else(|| arg.field_value(&binding.name))
                    .unwrap_or_default(),
                (BindingSource::Deferred, Some(arg)) => {
                    arg.field_value(&binding.name).unwrap_or_default()
                }
                (BindingSource::Deferred, None) => Value::Null,
            };
            Param {
                name: binding.name.clone(),
                value,
            }
        })
        .collect();
    Ok(params)
}

fn literal_bindings(params: &[Param]) -> Vec<Binding> {
    params
        .iter()
        .map(|p| Binding::literal(p.name.clone(), p.value.clone()))
        .collect()
}

/// Runs compiled statements against a [`ConnectionProvider`].
///
/// ```ignore
/// let mut executor = QueryExecutor::new(PgConnection::new(url));
/// let active: Vec<User> = executor.query(None, Some(&field("Active").eq(true))).await?;
/// executor.insert(&User { id: 0, name: "Bob".into(), active: false }).await?;
/// executor.delete::<User>(42).await?;
/// ```
#[derive(Debug)]
pub struct QueryExecutor<P> {
    provider: P,
    compiler: QueryCompiler,
    config: ExecutorConfig,
}

impl<P: ConnectionProvider> QueryExecutor<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, ExecutorConfig::default())
    }

    /// The compiler dialect comes from `config` when set, else from the provider.
    pub fn with_config(provider: P, config: ExecutorConfig) -> Self {
        let dialect = config.dialect.unwrap_or_else(|| provider.dialect());
        Self {
            provider,
            compiler: QueryCompiler::new(dialect),
            config,
        }
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Select entities matching `predicate`.
    pub async fn query<E: Entity>(
        &mut self,
        projection: Option<&Expr>,
        predicate: Option<&Expr>,
    ) -> OrmResult<Vec<E>> {
        self.query_with(projection, predicate, None, None).await
    }

    /// Select with joins and an argument for `@name` placeholders.
    pub async fn query_with<E: Entity>(
        &mut self,
        projection: Option<&Expr>,
        predicate: Option<&Expr>,
        joins: Option<&JoinSpec>,
        args: Option<&dyn BindSource>,
    ) -> OrmResult<Vec<E>> {
        let statement = self
            .compiler
            .compile_select(&E::DEF, projection, predicate, joins)?;
        self.execute_query(&statement, args).await
    }

    /// Select by a [`Query`] description.
    pub async fn query_as<E: Entity>(
        &mut self,
        query: &Query,
        args: Option<&dyn BindSource>,
    ) -> OrmResult<Vec<E>> {
        let statement = query.compile(&self.compiler, &E::DEF)?;
        self.execute_query(&statement, args).await
    }

    /// Run a compiled SELECT and map every row to `E`.
    ///
    /// Fails with [`OrmError::QueryNotInitialized`] for an empty or non-select statement.
    pub async fn execute_query<E: Entity>(
        &mut self,
        statement: &CompiledStatement,
        args: Option<&dyn BindSource>,
    ) -> OrmResult<Vec<E>> {
        if statement.is_empty() || statement.kind() != StatementKind::Select {
            return Err(OrmError::QueryNotInitialized);
        }
        let params = if statement.bindings().is_empty() {
            Vec::new()
        } else {
            bind_arguments(statement, args)?
        };
        self.log_statement(statement, params.len());

        let sql = statement.sql().to_owned();
        let mapper = EntityMapper::<E>::new();
        self.provider
            .run_scoped(move |conn| {
                Box::pin(async move {
                    let rows = conn.query(&sql, &params).await?;
                    mapper.map_all(&rows)
                })
            })
            .await
    }

    /// Run hand-written SELECT SQL. `params` bind the `@name` placeholders by name.
    pub async fn query_sql<E: Entity>(
        &mut self,
        sql: &str,
        params: &[Param],
    ) -> OrmResult<Vec<E>> {
        let statement = CompiledStatement::raw(StatementKind::Select, sql, literal_bindings(params));
        self.execute_query(&statement, None).await
    }

    /// Like [`query_sql`](Self::query_sql), keeping only the first row.
    ///
    /// Returns `None` when the query yields no rows.
    pub async fn query_one<E: Entity>(
        &mut self,
        sql: &str,
        params: &[Param],
    ) -> OrmResult<Option<E>> {
        let rows = self.query_sql(sql, params).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert `entity`, binding every non-key field. Returns the affected row count.
    pub async fn insert<E: Entity>(&mut self, entity: &E) -> OrmResult<u64> {
        let statement = self.compiler.compile_insert(&E::DEF)?;
        self.execute(&statement, Some(entity)).await
    }

    /// Update `entity` by its key. Returns the affected row count.
    pub async fn update<E: Entity>(&mut self, entity: &E) -> OrmResult<u64> {
        let statement = self.compiler.compile_update(&E::DEF)?;
        self.execute(&statement, Some(entity)).await
    }

    /// Delete the `E` whose key equals `key`. Returns the affected row count.
    pub async fn delete<E: Entity>(&mut self, key: impl Into<Value>) -> OrmResult<u64> {
        let statement = self.compiler.compile_delete(&E::DEF, key)?;
        self.execute(&statement, None).await
    }

    /// Run a compiled statement as a non-query.
    pub async fn execute(
        &mut self,
        statement: &CompiledStatement,
        args: Option<&dyn BindSource>,
    ) -> OrmResult<u64> {
        if statement.is_empty() {
            return Err(OrmError::QueryNotInitialized);
        }
        let params = if statement.bindings().is_empty() {
            Vec::new()
        } else {
            bind_arguments(statement, args)?
        };
        self.log_statement(statement, params.len());

        let sql = statement.sql().to_owned();
        self.provider
            .run_scoped(move |conn| Box::pin(async move { conn.execute(&sql, &params).await }))
            .await
    }

    /// Run hand-written non-query SQL. Returns the affected row count.
    pub async fn execute_sql(&mut self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        let kind = StatementKind::of_sql(sql);
        let statement = CompiledStatement::raw(kind, sql, literal_bindings(params));
        self.execute(&statement, None).await
    }

    fn log_statement(&self, statement: &CompiledStatement, param_count: usize) {
        if !self.config.log_sql {
            return;
        }

        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.config.truncate_sql(statement.sql());
        emit_at_level!(
            Level::from(self.config.log_level),
            target: "odyssey.sql",
            kind = statement.kind().as_str(),
            param_count,
            sql = %sql,
            "executing statement"
        );
    }
}

//! # odyssey
//!
//! A small data-access layer: typed entities, expression-compiled SQL, scoped execution.
//!
//! ## Features
//!
//! - **Expression predicates**: predicates and projections are [`Expr`] trees, compiled to SQL
//!   with `@name` placeholders
//! - **Static entity metadata**: `#[derive(Entity)]` generates the table and field descriptors
//!   along with field accessors, so no runtime reflection is needed
//! - **Scoped connections**: each operation opens, runs and closes, even on failure
//! - **Parameterized writes**: inserts, updates and deletes always bind their values
//!
//! ## Example
//!
//! ```ignore
//! use odyssey::prelude::*;
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
//!
//! let mut executor = QueryExecutor::new(PgConnection::new(database_url));
//!
//! // SELECT * FROM User WHERE ((Name = 'Ann') AND (Active = TRUE))
//! let users: Vec<User> = executor
//!     .query(None, Some(&field("Name").eq("Ann").and(field("Active").eq(true))))
//!     .await?;
//!
//! // INSERT INTO User (Name, Active) VALUES (@Name, @Active)
//! executor.insert(&User { id: 0, name: "Bob".into(), active: false }).await?;
//!
//! // DELETE FROM User WHERE Id = @Id
//! executor.delete::<User>(42).await?;
//! ```

// lets the derive's `::odyssey::` paths resolve inside this crate
extern crate self as odyssey;

pub mod compiler;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod executor;
pub mod expr;
pub mod join;
pub mod mapper;
pub mod prelude;
pub mod query;
pub mod value;

pub use compiler::{Binding, BindingSource, CompiledStatement, QueryCompiler, StatementKind};
pub use config::{ExecutorConfig, LogLevel};
pub use connection::{
    Connection, ConnectionProvider, Param, PgConnection, ScopedFuture, rewrite_placeholders,
};
pub use dialect::Dialect;
pub use entity::{Entity, EntityDef, FieldDef};
pub use error::{OrmError, OrmResult};
pub use executor::{BindSource, QueryExecutor, bind_arguments};
pub use expr::{BinaryOp, Capture, Captured, Expr, IntoOperand, field, lit, param, path, record, row};
pub use join::{JoinClause, JoinKind, JoinSpec};
pub use mapper::{DataRecord, EntityMapper, Record, map_row};
pub use query::Query;
pub use value::{FromValue, ToValue, Value};

#[cfg(feature = "derive")]
pub use odyssey_derive::Entity;

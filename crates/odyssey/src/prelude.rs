//! Convenient imports for typical `odyssey` usage.
//!
//! ```ignore
//! use odyssey::prelude::*;
//! ```

pub use crate::{
    Capture, ConnectionProvider, Entity, Expr, JoinClause, JoinSpec, OrmError, OrmResult,
    Param, PgConnection, Query, QueryExecutor, Value, field, lit, param, path, record,
};

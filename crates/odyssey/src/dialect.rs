//! Literal conventions of the target server.

use serde::Deserialize;

/// How compile-time literals are spelled in generated SQL.
///
/// Placeholders are always `@name`; connections that need positional parameters rewrite
/// them before sending (see [`crate::connection::rewrite_placeholders`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `bit`-style booleans: `1` / `0`.
    #[default]
    TSql,
    /// Native booleans: `TRUE` / `FALSE`.
    Postgres,
}

impl Dialect {
    pub fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Dialect::TSql, true) => "1",
            (Dialect::TSql, false) => "0",
            (Dialect::Postgres, true) => "TRUE",
            (Dialect::Postgres, false) => "FALSE",
        }
    }
}

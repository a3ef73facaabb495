//! Error types for odyssey

use thiserror::Error;

/// Result type alias for odyssey operations
pub type OrmResult<T> = Result<T, OrmError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for compiling and executing statements
#[derive(Debug, Error)]
pub enum OrmError {
    /// The compiler met an expression node it cannot lower
    #[error("Expression type {kind} is not supported")]
    UnsupportedExpression { kind: String },

    /// A binary operator outside the comparison table
    #[error("Operation {0} is not supported")]
    UnsupportedOperator(String),

    /// A member access that is not rooted in the row or a captured value
    #[error("The member expression '{0}' is not supported")]
    UnsupportedMemberExpression(String),

    /// A projection that is neither a member access nor a record of member accesses
    #[error("The column selector expression '{0}' is not valid")]
    UnsupportedProjectionShape(String),

    /// The entity descriptor has no key field
    #[error("No key field defined for entity {entity}")]
    MissingKeyField { entity: String },

    /// A statement was executed before it was compiled
    #[error("The query has not been initialized; compile a select statement first")]
    QueryNotInitialized,

    /// A required bind argument was not supplied
    #[error("Argument '{0}' cannot be null")]
    NullArgument(String),

    /// Opening or closing the underlying connection failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A row value could not be converted to the field's type
    #[error("Conversion error on column '{column}': {message}")]
    Conversion { column: String, message: String },

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl OrmError {
    /// Create an unsupported-expression error naming the node kind
    pub fn unsupported_expression(kind: impl Into<String>) -> Self {
        Self::UnsupportedExpression { kind: kind.into() }
    }

    /// Create a missing-key error for an entity
    pub fn missing_key(entity: impl Into<String>) -> Self {
        Self::MissingKeyField {
            entity: entity.into(),
        }
    }

    /// Create a connection error wrapping the original cause
    pub fn connection<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection error without an underlying cause
    pub fn connection_msg(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a conversion error for a specific column
    pub fn conversion(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Re-attribute a conversion error to `column`.
    ///
    /// `FromValue` impls do not know which field they decode; the entity setter does.
    pub fn for_column(self, column: &str) -> Self {
        match self {
            Self::Conversion { message, .. } => Self::Conversion {
                column: column.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Check if the compiler rejected the input
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedExpression { .. }
                | Self::UnsupportedOperator(_)
                | Self::UnsupportedMemberExpression(_)
                | Self::UnsupportedProjectionShape(_)
        )
    }

    /// Check if this is a connection lifecycle error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn connection_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = OrmError::connection("Error opening the database connection", io);
        assert!(err.is_connection());
        assert_eq!(
            err.to_string(),
            "Connection error: Error opening the database connection"
        );
        assert_eq!(err.source().unwrap().to_string(), "refused");
    }

    #[test]
    fn for_column_rewrites_conversion_only() {
        let err = OrmError::conversion("", "expected bool").for_column("Active");
        assert!(matches!(err, OrmError::Conversion { ref column, .. } if column == "Active"));

        let err = OrmError::QueryNotInitialized.for_column("Active");
        assert!(matches!(err, OrmError::QueryNotInitialized));
    }

    #[test]
    fn unsupported_expression_names_kind() {
        let err = OrmError::unsupported_expression("Not");
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "Expression type Not is not supported");
    }
}

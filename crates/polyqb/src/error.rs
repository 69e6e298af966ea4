//! Error types for polyqb

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::dialect::Dialect;

/// Result type alias for polyqb operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query building and execution
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error reported by the database driver that is not a classified constraint error
    #[error("Query error: {0}")]
    Driver(DriverError),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-row fetch returned more than one row
    #[error("Too many rows: expected at most one, got {0}")]
    TooManyRows(usize),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No handler was registered for the active dialect and there is no default.
    #[error("{op} is not supported on {dialect}")]
    UnsupportedDialect { op: &'static str, dialect: Dialect },

    /// A column was referenced that the table metadata does not declare.
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// A primary-key operation was invoked on a model without a declared key.
    #[error("Model '{model}' has no primary key")]
    MissingPrimaryKey { model: String },

    /// Composite-key input is missing a key field.
    #[error("Missing key field '{field}'")]
    MissingKey { field: String },

    /// A statement rendered for one dialect was executed against another.
    #[error("Statement built for {built} executed on a {actual} connection")]
    DialectMismatch { built: Dialect, actual: Dialect },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// An unclassified driver error.
///
/// The original driver error is kept as the `source` so callers can downcast it.
#[derive(Debug, Clone)]
pub struct DriverError {
    pub dialect: Dialect,
    /// Backend error code (SQLSTATE, vendor number or `ORA-` code) when the driver exposes one.
    pub code: Option<String>,
    pub message: String,
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Classification of a driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    Other,
}

/// Classify a driver error for `dialect`.
///
/// The error code is checked first since codes are stable across message localizations.
/// When the code is absent or unknown the message is matched case-insensitively.
pub fn classify_error(dialect: Dialect, code: Option<&str>, message: &str) -> ErrorKind {
    if let Some(code) = code {
        let code = code.trim();
        let (unique, foreign): (&[&str], &[&str]) = match dialect {
            Dialect::Postgres => (&["23505"], &["23503"]),
            Dialect::MySql => (&["1062"], &["1451", "1452", "1216", "1217"]),
            Dialect::Sqlite => (&["2067", "1555"], &["787"]),
            Dialect::Oracle => (&["ORA-00001"], &["ORA-02291", "ORA-02292"]),
            Dialect::SqlServer => (&["2627", "2601"], &["547"]),
        };
        if unique.iter().any(|c| c.eq_ignore_ascii_case(code)) {
            return ErrorKind::UniqueViolation;
        }
        if foreign.iter().any(|c| c.eq_ignore_ascii_case(code)) {
            return ErrorKind::ForeignKeyViolation;
        }
    }

    let message = message.to_ascii_lowercase();
    const UNIQUE: [&str; 4] = [
        "duplicate key",
        "unique constraint",
        "duplicate entry",
        "violation of unique key",
    ];
    if UNIQUE.iter().any(|needle| message.contains(needle)) {
        return ErrorKind::UniqueViolation;
    }
    if message.contains("foreign key")
        || message.contains("reference constraint")
        || (message.contains("integrity constraint") && message.contains("parent key"))
    {
        return ErrorKind::ForeignKeyViolation;
    }
    ErrorKind::Other
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unsupported-dialect error for operation `op`.
    pub fn unsupported(op: &'static str, dialect: Dialect) -> Self {
        Self::UnsupportedDialect { op, dialect }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, Self::ForeignKeyViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is an unsupported-dialect error
    pub fn is_unsupported_dialect(&self) -> bool {
        matches!(self, Self::UnsupportedDialect { .. })
    }

    /// Build an error from a driver failure, classifying constraint violations.
    pub fn from_driver(error: DriverError) -> Self {
        match classify_error(error.dialect, error.code.as_deref(), &error.message) {
            ErrorKind::UniqueViolation => Self::UniqueViolation(error.message),
            ErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(error.message),
            ErrorKind::Other => Self::Driver(error),
        }
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = format!("{}: {}", constraint, db_err.message());
            let code = db_err.code().code().to_string();
            if code == "23514" {
                return Self::CheckViolation(message);
            }
            return Self::from_driver(DriverError {
                dialect: Dialect::Postgres,
                code: Some(code),
                message,
                source: Some(Arc::new(err)),
            });
        }
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Driver(DriverError {
            dialect: Dialect::Postgres,
            code: None,
            message: err.to_string(),
            source: Some(Arc::new(err)),
        })
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_win_over_messages() {
        for (dialect, code) in [
            (Dialect::Postgres, "23505"),
            (Dialect::MySql, "1062"),
            (Dialect::Sqlite, "2067"),
            (Dialect::Oracle, "ORA-00001"),
            (Dialect::SqlServer, "2627"),
        ] {
            assert_eq!(
                classify_error(dialect, Some(code), "something went wrong"),
                ErrorKind::UniqueViolation,
                "{dialect}"
            );
        }
        for (dialect, code) in [
            (Dialect::Postgres, "23503"),
            (Dialect::MySql, "1452"),
            (Dialect::Sqlite, "787"),
            (Dialect::Oracle, "ora-02291"),
            (Dialect::SqlServer, "547"),
        ] {
            assert_eq!(
                classify_error(dialect, Some(code), "boom"),
                ErrorKind::ForeignKeyViolation,
                "{dialect}"
            );
        }
    }

    #[test]
    fn code_is_dialect_scoped() {
        // 547 is a foreign key error on SQL Server only.
        assert_eq!(
            classify_error(Dialect::MySql, Some("547"), "boom"),
            ErrorKind::Other
        );
    }

    #[test]
    fn falls_back_to_message() {
        assert_eq!(
            classify_error(Dialect::Sqlite, None, "UNIQUE constraint failed: users.email"),
            ErrorKind::UniqueViolation
        );
        assert_eq!(
            classify_error(Dialect::MySql, None, "Duplicate entry 'a' for key 'email'"),
            ErrorKind::UniqueViolation
        );
        assert_eq!(
            classify_error(Dialect::Sqlite, None, "FOREIGN KEY constraint failed"),
            ErrorKind::ForeignKeyViolation
        );
        assert_eq!(
            classify_error(
                Dialect::Oracle,
                None,
                "integrity constraint (APP.FK_POSTS) violated - parent key not found"
            ),
            ErrorKind::ForeignKeyViolation
        );
        assert_eq!(
            classify_error(Dialect::Postgres, None, "syntax error"),
            ErrorKind::Other
        );
    }

    #[test]
    fn from_driver_maps_kinds() {
        let err = OrmError::from_driver(DriverError {
            dialect: Dialect::SqlServer,
            code: Some("2601".into()),
            message: "Cannot insert duplicate key row".into(),
            source: None,
        });
        assert!(err.is_unique_violation());

        let err = OrmError::from_driver(DriverError {
            dialect: Dialect::SqlServer,
            code: Some("208".into()),
            message: "Invalid object name 'users'".into(),
            source: None,
        });
        assert!(matches!(err, OrmError::Driver(_)));
    }
}

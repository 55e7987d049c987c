//! # Database Error Types
//!
//! Error types for repository operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (kind)  ← NotFound / UniqueViolation / ForeignKeyViolation ... │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::Operation ← logged once, localized "Erro ao buscar clientes" │
//! │       │              (inner kind kept as source)                        │
//! │       ▼                                                                 │
//! │  Service layer (external) shows `to_string()` to the user              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crm_core::ValidationError;

/// Repository operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `update`/`delete` touched no row
    /// - A referenced row vanished between read and write
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (duplicate document, code, chassis...).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Deleting a row that still has dependents (no guard was checked)
    /// - Referencing a non-existent parent id
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Model failed validation before the write was attempted.
    #[error("Invalid data: {0}")]
    Validation(#[from] ValidationError),

    /// The row exists but is not in a state that allows the operation.
    #[error("{entity} {id} cannot be changed: {reason}")]
    InvalidState {
        entity: String,
        id: String,
        reason: String,
    },

    /// The acting user may not perform the operation.
    #[error("User {user_id} is not allowed to {action}")]
    Forbidden { user_id: i64, action: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A repository operation failed. `message` is the localized,
    /// operation-named text; `source` carries the underlying kind.
    #[error("{message}")]
    Operation {
        operation: String,
        message: String,
        #[source]
        source: Box<DbError>,
    },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        DbError::InvalidState {
            entity: entity.into(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// The underlying error kind, looking through `Operation` wrappers.
    pub fn kind(&self) -> &DbError {
        match self {
            DbError::Operation { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Operation key (`customer.find`...) when this is a wrapped failure.
    pub fn operation(&self) -> Option<&str> {
        match self {
            DbError::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), DbError::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self.kind(),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("payload serialization: {}", err))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Configuration errors raised by [`crate::config::DbConfig::from_env`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

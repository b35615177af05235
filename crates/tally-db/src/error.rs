//! # Database Error Types
//!
//! Error types for store, ledger and backup operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / MigrateError / io::Error / serde_json::Error            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module)  ◄──  CoreError (business rule violations)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller shows an alert; the open transaction has rolled back           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tally_core::CoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in a table.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `add` on an id that is already stored.
    ///
    /// ## When This Occurs
    /// - Recording the same sale twice
    /// - Adding a record that a restore already brought in
    #[error("Duplicate key in {table}: '{id}' already exists")]
    DuplicateKey { table: String, id: String },

    /// The backup parsed but does not have the expected shape.
    ///
    /// ## When This Occurs
    /// - `products`, `categories` or `settings` missing or not an array
    /// - A different major format version
    /// - More than one settings record
    /// - A record that does not decode into its entity type
    #[error("Invalid backup format: {0}")]
    InvalidBackupFormat(String),

    /// The backup is not a JSON object at all.
    #[error("Backup could not be parsed: {0}")]
    ParseError(String),

    /// A stored document failed to encode or decode.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin or commit failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Backup file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal database error: {0}")]
    Internal(String),

    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a DuplicateKey error.
    pub fn duplicate(table: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::DuplicateKey {
            table: table.into(),
            id: id.into(),
        }
    }

    /// True for failures of the storage itself rather than of the input.
    ///
    /// These are the errors a caller reports as "could not save"; nothing
    /// was committed when one is returned.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::MigrationFailed(_)
                | DbError::QueryFailed(_)
                | DbError::TransactionFailed(_)
                | DbError::PoolExhausted
                | DbError::Io(_)
                | DbError::Internal(_)
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → DbError::QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
///
/// Primary-key violations are turned into `DuplicateKey` at the insert
/// site, where the table and id are known.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
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

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_classification() {
        assert!(DbError::PoolExhausted.is_persistence_failure());
        assert!(DbError::QueryFailed("disk I/O error".into()).is_persistence_failure());
        assert!(!DbError::duplicate("sales", "s-1").is_persistence_failure());
        assert!(!DbError::Core(CoreError::EmptyCart).is_persistence_failure());
        assert!(!DbError::InvalidBackupFormat("missing categories".into()).is_persistence_failure());
    }

    #[test]
    fn test_core_errors_pass_through_unchanged() {
        let err: DbError = CoreError::AlreadyReturned {
            sale_id: "s-9".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Sale s-9 has already been returned");
    }
}

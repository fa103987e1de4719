//! Error types for warehouse persistence operations.

use thiserror::Error;

/// Errors returned while migrating, reading or writing the warehouse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// No database URL/path was provided.
    #[error("database URL is required (use --database-url or PRSYNC_DATABASE_URL)")]
    MissingDatabaseUrl,

    /// The database URL/path was present but blank.
    #[error("database URL must not be blank")]
    BlankDatabaseUrl,

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// Creating the watermark table failed.
    #[error("failed to ensure ingest_state table: {message}")]
    StateTableFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Querying the warehouse failed.
    #[error("warehouse query failed: {message}")]
    QueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// Writing to the warehouse failed.
    #[error("warehouse write failed: {message}")]
    WriteFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// A stored value could not be decoded.
    #[error("stored {column} value is invalid: {message}")]
    InvalidStoredValue {
        /// Column holding the value.
        column: &'static str,
        /// Decoding failure detail.
        message: String,
    },

    /// A value does not fit the column's integer type.
    #[error("{field} value {value} exceeds the SQLite integer range")]
    ValueOutOfRange {
        /// Field being written.
        field: &'static str,
        /// Rejected value.
        value: u64,
    },
}

impl From<diesel::result::Error> for PersistenceError {
    fn from(error: diesel::result::Error) -> Self {
        Self::WriteFailed {
            message: error.to_string(),
        }
    }
}

//! Error types for FinTrack Core

use thiserror::Error;

/// Main error type for finance data operations
#[derive(Error, Debug)]
pub enum FinanceError {
    /// Database service used before `initialize()` completed
    #[error("Database not initialized. Call initialize() first")]
    NotInitialized,

    /// Storage backend used after it was closed
    #[error("Storage backend not connected")]
    NotConnected,

    /// A declared migration failed; the ledger keeps only completed versions
    #[error("Migration {version} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    /// The declared migration list is not a gapless ascending sequence
    #[error("Invalid migration registry: {0}")]
    InvalidMigrations(String),

    /// Backend-level failure (engine, disk, key-value store)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A batch stopped at `step`; no statement of the batch was applied
    #[error("Batch failed at statement {step}: {reason}")]
    BatchFailed { step: usize, reason: String },

    /// A mutating statement was passed to a read-only query
    #[error("Read-only query rejected: {0}")]
    ReadOnlyViolation(String),

    /// Caller input rejected before reaching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Goal not found
    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    /// A write was stored but the snapshot reload after it failed
    #[error("Change saved but reload failed: {0}")]
    ReloadFailed(String),

    /// Stored row could not be mapped to its domain shape
    #[error("Malformed row in {table}: column {column}")]
    MalformedRow { table: String, column: String },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for FinanceError {
    fn from(err: rusqlite::Error) -> Self {
        FinanceError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for FinanceError {
    fn from(err: serde_json::Error) -> Self {
        FinanceError::Storage(format!("snapshot encoding: {err}"))
    }
}

impl From<toml::de::Error> for FinanceError {
    fn from(err: toml::de::Error) -> Self {
        FinanceError::Config(err.to_string())
    }
}

/// Result type alias for finance data operations
pub type Result<T> = std::result::Result<T, FinanceError>;

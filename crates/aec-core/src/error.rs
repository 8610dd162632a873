//! Core error types for aec-core.
//!
//! `CoreError` is what every public operation returns. The store and config
//! layers have their own enums that fold into it.

use std::path::PathBuf;
use thiserror::Error;

use crate::audit::AuditAction;

/// Core error type for aec-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Entity id does not resolve
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Operation is illegal from the entity's current state
    #[error("cannot {operation} {entity} '{id}' while it is {from}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        operation: &'static str,
    },

    /// Caller precondition does not hold
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// Underlying persistence failed; nothing was applied
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// State mutation was applied but its audit entry was not written
    #[error("{action} on '{entity_id}' was applied but the audit entry could not be written: {source}")]
    AuditWriteFailed {
        action: AuditAction,
        entity_id: String,
        #[source]
        source: StoreError,
    },

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        CoreError::PreconditionViolation(message.into())
    }

    /// Only a store outage is worth retrying; every other variant points at a
    /// caller error or a stale view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::StoreUnavailable(_))
    }
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked by another writer
    #[error("database is locked")]
    Locked,

    /// A mutex guarding the store was poisoned
    #[error("store lock poisoned")]
    Poisoned,

    /// A stored row could not be decoded
    #[error("corrupt {table} row '{id}': {message}")]
    CorruptRow {
        table: &'static str,
        id: String,
        message: String,
    },

    /// The store was switched offline (test adapters only)
    #[error("store is offline")]
    Offline,

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data directory could not be resolved or created
    #[error("data directory error: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_outage_is_retryable() {
        assert!(CoreError::StoreUnavailable(StoreError::Locked).is_retryable());
        assert!(!CoreError::not_found("session", "x").is_retryable());
        assert!(!CoreError::precondition("past session").is_retryable());
        assert!(!CoreError::AuditWriteFailed {
            action: AuditAction::CreateSlot,
            entity_id: "s1".into(),
            source: StoreError::Offline,
        }
        .is_retryable());
    }

    #[test]
    fn messages_are_human_readable() {
        let err = CoreError::InvalidTransition {
            entity: "substitution request",
            id: "r1".into(),
            from: "APPROVED".into(),
            operation: "reject",
        };
        assert_eq!(
            err.to_string(),
            "cannot reject substitution request 'r1' while it is APPROVED"
        );
        assert_eq!(
            CoreError::not_found("session", "1_2024-01-02").to_string(),
            "session '1_2024-01-02' not found"
        );
    }
}

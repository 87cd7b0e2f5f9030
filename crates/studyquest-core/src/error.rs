//! Core error types for studyquest-core.
//!
//! Every fallible layer has its own `thiserror` enum; [`CoreError`] ties
//! them together for callers that don't care which layer failed.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyquest-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session engine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Points ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Account and permission errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored data could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    Corrupt { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A balance update would leave SQLite's integer range
    #[error("adding {amount} points to a balance of {balance} overflows")]
    Overflow { balance: u64, amount: u64 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not locate or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A value that must be strictly positive was zero
    #[error("'{field}' must be greater than zero")]
    NotPositive { field: &'static str },

    /// A probability outside `[0, 1]`
    #[error("'{field}' must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
}

/// Session engine errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The supplied configuration would produce a degenerate countdown
    #[error("invalid session config: {0}")]
    InvalidConfig(#[from] ValidationError),

    /// `toggle` was called before any session was ever started
    #[error("no previous session configuration to restart")]
    NoPreviousConfig,
}

/// Points ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No record exists for the user
    #[error("no points record for user {0}")]
    UnknownUser(String),

    /// The increment would overflow the stored balance; nothing was written
    #[error("crediting {amount} points to user {user} overflows a balance of {balance}")]
    Overflow {
        user: String,
        balance: u64,
        amount: u64,
    },

    /// The backing store failed
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Account and permission errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("all fields are required")]
    MissingFields,

    #[error("email address is malformed: {0}")]
    InvalidEmail(String),

    #[error("password must be at least {min_len} characters")]
    WeakPassword { min_len: usize },

    #[error("email is already in use: {0}")]
    EmailAlreadyInUse(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not signed in")]
    NotAuthenticated,

    #[error("admin role required")]
    Forbidden,

    #[error("no user with email {0}")]
    UnknownEmail(String),

    #[error("could not generate password salt: {0}")]
    Entropy(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Database(err.into())
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rusqlite_errors_become_query_failures() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }

    #[test]
    fn session_error_wraps_validation() {
        let err: SessionError = ValidationError::NotPositive {
            field: "duration_secs",
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid session config: 'duration_secs' must be greater than zero"
        );
    }
}

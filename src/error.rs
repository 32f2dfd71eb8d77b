//! Error taxonomy for the daemon, grouped by subsystem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ADMIN_KEY must be set and non-empty")]
    MissingAdminKey,
    #[error("failed to read TLS {which} at {path}: {source}")]
    Tls {
        which: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TLS material at {path} contained no usable {which}")]
    TlsEmpty { which: &'static str, path: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing storage error: {0}")]
    Backing(#[from] sled::Error),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("metadata encode/decode error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl<E: std::fmt::Display> From<sled::transaction::TransactionError<E>> for StoreError {
    fn from(e: sled::transaction::TransactionError<E>) -> Self {
        StoreError::Transaction(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("store {0} not found")]
    NotFound(u16),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type RepositoryResult<T> = Result<T, RepositoryError>;

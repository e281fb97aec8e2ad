//! Error types and result types for connection and model operations.
//!
//! Every fallible operation in the crate returns [`DocumentStoreResult<T>`]. Driver
//! failures are carried unchanged in [`DocumentStoreError::Store`]; this layer never
//! retries or recovers locally.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the registry, models and backends.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Opening a connection failed. Reported to `on_error` and kept in the connection state.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The named database has no live connection in the registry.
    #[error("Database {0} is not connected")]
    NotConnected(String),
    /// An error reported by the underlying document store driver.
    #[error("Store error: {0}")]
    Store(String),
    /// The document has an invalid structure (e.g. a stored value that is not a document).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The query cannot be executed (e.g. a malformed search pattern).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// No extension with the given name was registered on the model.
    #[error("Unknown extension: {0}")]
    UnknownExtension(String),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

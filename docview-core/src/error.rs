//! Error types and result types for document store operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`]. Collections and
//! views forward errors from the layer below them unchanged, so a caller always sees the error
//! the storage backend produced rather than a re-wrapped copy.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document violates schema constraints or has invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The operation is refused by this collection.
    ///
    /// Raised immediately and never retried; raw byte retrieval through a type-narrowed
    /// collection is the canonical case.
    #[error("Operation not supported: {0}")]
    NotSupported(String),
    /// A narrowing could not be verified at the point of use.
    /// The first argument is the expected document type, the second is what was found.
    #[error("Type mismatch: expected {0}, found {1}")]
    TypeMismatch(String, String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// Writing diagnostics to a sink failed.
    #[error("I/O error: {0}")]
    Io(String),
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

impl From<IoError> for DocumentStoreError {
    fn from(err: IoError) -> Self {
        DocumentStoreError::Io(err.to_string())
    }
}

//! Error type definitions for the EPG merger
//!
//! Per-source fetch failures are values ([`SourceError`]) that the merge
//! engine absorbs; everything that reaches a caller is an [`AppError`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Operator configuration could not be loaded or saved
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Remote source could not be fetched or parsed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Merged document could not be written
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// An output exists but selects no sources
    #[error("No sources selected for EPG file '{name}'")]
    NoSources { name: String },

    /// A full pass was requested but no outputs exist
    #[error("No EPG files configured")]
    NoOutputs,

    /// Another merge pass currently holds the pass lock
    #[error("A merge job is already running")]
    Busy,

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised by the operator configuration store
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Reading or writing the backing file failed
    #[error("I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Failure to obtain a usable document from a remote source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network connection timeouts
    #[error("Connection timeout: {url}")]
    Timeout { url: String },

    /// Transport-level failures (DNS, refused connection, TLS, body read)
    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// Non-success HTTP status
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Content looked compressed but could not be inflated
    #[error("Decompression failed: {message}")]
    Decompression { message: String },

    /// Content was not a well-formed document
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] XmltvError),
}

/// Errors from reading or writing XMLTV documents
#[derive(Error, Debug)]
pub enum XmltvError {
    #[error("Malformed XML: {message}")]
    Malformed { message: String },

    #[error("XML write failed: {message}")]
    Write { message: String },
}

/// Errors from durable storage of merged documents
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] XmltvError),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl SourceError {
    /// Create a timeout error
    pub fn timeout<U: Into<String>>(url: U) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn decompression<M: Into<String>>(message: M) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }
}

impl XmltvError {
    pub fn malformed<M: Into<String>>(message: M) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn write<M: Into<String>>(message: M) -> Self {
        Self::Write {
            message: message.into(),
        }
    }
}

impl StorageError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

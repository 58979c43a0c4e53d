//! Centralized error handling for the EPG merger
//!
//! This module unifies error types across the fetch, merge, storage and
//! configuration layers so that every public operation reports failures the
//! same way.
//!
//! # Error Categories
//!
//! - **Source Errors**: remote feed retrieval, decompression and parsing
//! - **Repository Errors**: loading and saving the operator configuration blob
//! - **Storage Errors**: writing merged documents to disk
//! - **Validation Errors**: input validation and uniqueness rules
//!
//! # Usage
//!
//! ```rust
//! use epg_merger::errors::{AppError, AppResult};
//!
//! fn example_function(interval: u64) -> AppResult<u64> {
//!     if interval < 60 {
//!         return Err(AppError::validation("Interval must be at least 60 seconds"));
//!     }
//!     Ok(interval)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for Storage Results
pub type StorageResult<T> = Result<T, StorageError>;

//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No object is stored under the key
    #[display("object not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The configured bucket does not exist (yet)
    #[display("no such bucket: {_0}")]
    NoSuchBucket(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Key contains invalid characters or escapes the bucket root
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Canned ACL name not recognised
    #[display("unsupported canned ACL: {_0}")]
    InvalidAcl(#[error(not(source))] String),
    /// Network-related error (timeouts, connection failures, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::BackendError(_))
    }

    /// Returns `true` for the "absent" conditions that callers recover from
    /// locally (create the bucket, upload the object).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoSuchBucket(_))
    }
}

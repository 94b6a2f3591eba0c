//! Invalidation Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be signed
    #[display("signing failed: {_0}")]
    Signing(#[error(not(source))] String),
    /// The request never produced a response (DNS, TLS, connection, timeout)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The invalidation request could not be built
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

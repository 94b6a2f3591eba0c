//! Sync Error Types
//!
//! Per-file upload failures are not errors at this level: they are collected
//! into the [`SyncReport`](crate::SyncReport). These kinds cover what stops a
//! run from starting or from discovering its files.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A glob pattern could not be compiled
    #[display("invalid glob pattern `{_0}`")]
    Pattern(#[error(not(source))] String),
    /// A directory could not be walked or a file could not be read
    #[display("could not read `{}`", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// The bucket could not be found or created
    #[display("bucket setup failed")]
    Bucket,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}

//! Command Line Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not read `{}`", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("could not set up the object store")]
    Store,
    #[display("could not set up the HTTP client")]
    Http,
    #[display("upload failed")]
    Upload,
}

//! Configuration Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source could not be read or parsed
    #[display("could not load configuration: {_0}")]
    Load(#[error(not(source))] String),
    /// A required field is empty or absent
    #[display("missing required configuration field `{_0}`")]
    MissingField(#[error(not(source))] &'static str),
    /// A field holds a value outside its accepted range
    #[display("invalid value for configuration field `{_0}`")]
    Invalid(#[error(not(source))] &'static str),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// The offending field, if the error concerns a single one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField(field) | Self::Invalid(field) => Some(field),
            Self::Load(_) => None,
        }
    }
}

//! Invalidates changed objects on a CloudFront distribution.
//!
//! Uploading a replacement for an object that a CDN has already cached does
//! not make the new content visible until the cache entry expires.
//! [`InvalidationClient`] sends one invalidation batch for every key in a run's
//! change set, signed with the same credentials used for the object store.

mod client;
pub mod error;
mod payload;
mod sign;
mod transport;

pub use crate::client::{
    Credentials, DEFAULT_ENDPOINT, InvalidationClient, InvalidationFailure, InvalidationOutcome, InvalidationRequest,
};
#[cfg(any(test, feature = "mock"))]
pub use crate::transport::MockTransport;
pub use crate::transport::{DryRunTransport, HttpResponse, HttpTransport, Transport};

//! Object store trait and implementations.
//!
//! This module defines the `ObjectStore` trait, which provides the handful of
//! bucket and object operations an asset sync needs, independent of the
//! concrete store (S3-compatible services, an in-memory mock for tests, or a
//! read-only wrapper for dry runs).

#[cfg(feature = "mock")]
mod mock;
mod ro;
#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "mock")]
pub use self::mock::MockStore;
pub use self::ro::ReadOnlyStore;
#[cfg(feature = "s3")]
pub use self::s3::S3Store;
use crate::error::Result;
use crate::models::{BucketInfo, CannedAcl, ObjectMetadata, RemoteObject};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub(crate) type RemoteObjectStream<'a> = Pin<Box<dyn Stream<Item = Result<RemoteObject>> + Send + 'a>>;

/// Unified interface for object stores.
///
/// An `ObjectStore` is bound to exactly one bucket for its whole lifetime;
/// credentials are established when the store is constructed.
///
/// # Keys
/// Keys are `/`-separated and relative to the bucket root. Implementations
/// normalize them with [`validate_key`](crate::validate_key) before use.
///
/// # Examples
///
/// ```
/// use assetpush_storage::{ObjectStore, error::Result};
///
/// async fn stored_hash(store: &dyn ObjectStore, key: &str) -> Result<Option<String>> {
///     match store.head(key).await {
///         Ok(object) => Ok(Some(object.content_hash)),
///         Err(e) if e.is_not_found() => Ok(None),
///         Err(e) => Err(e),
///     }
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store is bound to (used for logging).
    fn name(&self) -> &str;

    /// Look the bucket up.
    ///
    /// Returns [`NoSuchBucket`](crate::error::ErrorKind::NoSuchBucket) if the
    /// bucket does not exist.
    async fn find_bucket(&self) -> Result<BucketInfo>;

    /// Create the bucket with an optional canned ACL and region
    /// (location constraint).
    async fn create_bucket(&self, acl: Option<CannedAcl>, region: Option<&str>) -> Result<()>;

    /// Fetch an object's fingerprint and metadata without its body.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if no object is
    /// stored under `key`.
    async fn head(&self, key: &str) -> Result<RemoteObject>;

    /// Store `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Vec<u8>, metadata: &ObjectMetadata) -> Result<()>;

    /// Stream the objects whose keys start with an optional prefix.
    ///
    /// Listings are not guaranteed to carry [`ObjectMetadata`].
    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> RemoteObjectStream<'a>;

    /// Collect [`list_stream()`](Self::list_stream) into a [`Vec`].
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<RemoteObject>> {
        self.list_stream(prefix).try_collect().await
    }
}

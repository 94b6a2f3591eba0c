//! Read-only object store.
//!
//! This module provides an object store implementation that wraps other
//! implementations and prevents write operations from executing, but
//! indicating success on return. Used for dry runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::backend::RemoteObjectStream;
use crate::error::Result;
use crate::models::{BucketInfo, CannedAcl, ObjectMetadata, RemoteObject};
use crate::{ObjectStore, StoreHandle};

/// Read-only object store.
///
/// Wraps another store and silently drops all write operations, logging an
/// [`info event`](tracing::Event). A bucket "created" through this wrapper is
/// reported as found afterwards, so that a dry run against a missing bucket
/// can still plan every upload.
pub struct ReadOnlyStore {
    inner: StoreHandle,
    pretend_bucket: AtomicBool,
}
impl ReadOnlyStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self { inner, pretend_bucket: AtomicBool::new(false) }
    }
}

#[async_trait]
impl ObjectStore for ReadOnlyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find_bucket(&self) -> Result<BucketInfo> {
        match self.inner.find_bucket().await {
            Err(e) if e.is_not_found() && self.pretend_bucket.load(Ordering::SeqCst) => {
                Ok(BucketInfo::new(self.inner.name()))
            },
            other => other,
        }
    }

    async fn create_bucket(&self, acl: Option<CannedAcl>, region: Option<&str>) -> Result<()> {
        tracing::info!(bucket = self.inner.name(), acl = ?acl, region = ?region, "Skipping bucket creation during read-only mode");
        self.pretend_bucket.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<RemoteObject> {
        self.inner.head(key).await
    }

    async fn put(&self, key: &str, body: Vec<u8>, _metadata: &ObjectMetadata) -> Result<()> {
        tracing::info!(key, bytes = body.len(), "Skipping upload during read-only mode");
        Ok(())
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> RemoteObjectStream<'a> {
        self.inner.list_stream(prefix)
    }
}

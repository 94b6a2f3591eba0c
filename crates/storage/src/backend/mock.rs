//! In-memory object store for testing.

use super::RemoteObjectStream;
use crate::ObjectStore;
use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use crate::models::{BucketInfo, CannedAcl, ObjectMetadata, RemoteObject, content_hash};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// An object held by [`MockStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockObject {
    pub body: Vec<u8>,
    pub metadata: ObjectMetadata,
}

/// In-memory object store for testing.
///
/// Objects are stored in a `BTreeMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Call
/// counters and injectable put failures make it possible to assert on the
/// exact traffic a sync run generates.
///
/// # Examples
///
/// ```
/// use assetpush_storage::backend::MockStore;
/// use assetpush_storage::{ObjectMetadata, ObjectStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::with_objects([("assets/app.css", "body{}")]);
/// assert!(store.head("assets/app.css").await.is_ok());
///
/// store.put("assets/app.js", b"alert(1)".to_vec(), &ObjectMetadata::default()).await.unwrap();
/// assert_eq!(store.put_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    bucket: AtomicBool,
    objects: RwLock<BTreeMap<String, MockObject>>,
    failures: RwLock<HashMap<String, (usize, ErrorKind)>>,
    head_failures: RwLock<HashMap<String, (usize, ErrorKind)>>,
    puts: AtomicUsize,
    heads: AtomicUsize,
}

impl MockStore {
    /// Create a mock store (with an existing bucket) pre-populated with objects.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        for (key, body) in objects {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                panic!("MockStore::with_objects: invalid key {key}");
            };
            map.insert(validated, MockObject { body: body.into(), metadata: ObjectMetadata::default() });
        }
        Self {
            name: "mock".to_string(),
            bucket: AtomicBool::new(true),
            objects: RwLock::new(map),
            failures: RwLock::new(HashMap::new()),
            head_failures: RwLock::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            heads: AtomicUsize::new(0),
        }
    }

    /// Change the bucket name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Start without a bucket, so that it must be created first.
    pub fn without_bucket(self) -> Self {
        self.bucket.store(false, Ordering::SeqCst);
        self
    }

    /// Make the next `times` puts to `key` fail with `error`.
    pub async fn fail_puts(&self, key: impl Into<String>, times: usize, error: ErrorKind) {
        self.failures.write().await.insert(key.into(), (times, error));
    }

    /// Make the next `times` heads of `key` fail with `error`.
    pub async fn fail_heads(&self, key: impl Into<String>, times: usize, error: ErrorKind) {
        self.head_failures.write().await.insert(key.into(), (times, error));
    }

    /// Snapshot of an object (body and metadata as last written).
    pub async fn object(&self, key: &str) -> Option<MockObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Whether the bucket currently exists.
    pub fn has_bucket(&self) -> bool {
        self.bucket.load(Ordering::SeqCst)
    }

    /// Number of `put` calls, including failed ones.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `head` calls.
    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    async fn take_failure(failures: &RwLock<HashMap<String, (usize, ErrorKind)>>, key: &str) -> Option<ErrorKind> {
        let mut guard = failures.write().await;
        let (remaining, error) = guard.get_mut(key)?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(error.clone())
    }

    fn remote(key: &str, object: &MockObject) -> RemoteObject {
        RemoteObject::new(key, content_hash(&object.body), object.body.len() as u64)
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let objects: [(&str, &str); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_bucket(&self) -> Result<BucketInfo> {
        match self.has_bucket() {
            true => Ok(BucketInfo::new(&self.name)),
            false => exn::bail!(ErrorKind::NoSuchBucket(self.name.clone())),
        }
    }

    async fn create_bucket(&self, _acl: Option<CannedAcl>, _region: Option<&str>) -> Result<()> {
        self.bucket.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<RemoteObject> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        let key = validate_key(key)?;
        if let Some(error) = Self::take_failure(&self.head_failures, &key).await {
            exn::bail!(error);
        }
        let guard = self.objects.read().await;
        let object = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(Self::remote(&key, object).with_metadata(object.metadata.clone()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, metadata: &ObjectMetadata) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let key = validate_key(key)?;
        if !self.has_bucket() {
            exn::bail!(ErrorKind::NoSuchBucket(self.name.clone()));
        }
        if let Some(error) = Self::take_failure(&self.failures, &key).await {
            exn::bail!(error);
        }
        self.objects.write().await.insert(key, MockObject { body, metadata: metadata.clone() });
        Ok(())
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> RemoteObjectStream<'a> {
        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<RemoteObject> = {
                let guard = self.objects.read().await;
                guard
                    .iter()
                    .filter(|(key, _)| prefix.is_none_or(|pfx| key.starts_with(pfx)))
                    .map(|(key, object)| Self::remote(key, object))
                    .collect()
            };
            for object in entries {
                yield Ok(object);
            }
        })
    }
}

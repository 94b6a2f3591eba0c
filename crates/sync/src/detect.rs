use assetpush_storage::error::Result as StorageResult;
use assetpush_storage::{ObjectStore, RemoteObject, content_hash};

/// What a selective upload found at a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    /// Nothing is stored under the key.
    New,
    /// Different content is stored under the key.
    Modified(RemoteObject),
    /// Identical content is already stored.
    Unchanged,
}
impl Change {
    pub fn needs_upload(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Compares local content against the store by MD5.
pub struct ChangeDetector;
impl ChangeDetector {
    /// `true` when there is no remote object or its hash differs.
    pub fn has_changed(local: &[u8], remote: Option<&RemoteObject>) -> bool {
        remote.is_none_or(|remote| remote.content_hash != content_hash(local))
    }

    /// Looks `key` up once and classifies it. "Not found" becomes
    /// [`Change::New`]; other store errors are returned.
    pub async fn inspect(store: &dyn ObjectStore, key: &str, local: &[u8]) -> StorageResult<Change> {
        let remote = match store.head(key).await {
            Ok(remote) => Some(remote),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };
        Ok(match remote {
            None => Change::New,
            Some(remote) if Self::has_changed(local, Some(&remote)) => Change::Modified(remote),
            Some(_) => Change::Unchanged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetpush_storage::backend::MockStore;
    use rstest::rstest;

    // md5("body")
    const BODY_MD5: &str = "841a2d689ad86bd1611447453c22c6fc";

    #[rstest]
    #[case::absent(None, true)]
    #[case::matching(Some(BODY_MD5), false)]
    #[case::quoted(Some("\"841a2d689ad86bd1611447453c22c6fc\""), false)]
    #[case::uppercase(Some("841A2D689AD86BD1611447453C22C6FC"), false)]
    #[case::differing(Some("00000000000000000000000000000000"), true)]
    fn test_has_changed(#[case] etag: Option<&str>, #[case] expected: bool) {
        let remote = etag.map(|etag| RemoteObject::new("a.css", etag, 4));
        assert_eq!(ChangeDetector::has_changed(b"body", remote.as_ref()), expected);
    }

    #[tokio::test]
    async fn test_inspect() {
        let store = MockStore::with_objects([("same.css", "body"), ("other.css", "old body")]);
        assert_eq!(ChangeDetector::inspect(&store, "same.css", b"body").await.unwrap(), Change::Unchanged);
        assert_eq!(ChangeDetector::inspect(&store, "missing.css", b"body").await.unwrap(), Change::New);
        let change = ChangeDetector::inspect(&store, "other.css", b"body").await.unwrap();
        assert!(matches!(change, Change::Modified(ref remote) if remote.key == "other.css"));
        assert!(change.needs_upload());
        assert_eq!(store.head_count(), 3);
    }
}

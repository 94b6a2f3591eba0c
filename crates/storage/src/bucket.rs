use crate::error::{ErrorKind, Result};
use crate::models::{BucketInfo, CannedAcl};
use crate::ObjectStore;
use exn::ResultExt;

/// Options used when the bucket has to be created.
#[derive(Clone, Debug, Default)]
pub struct BucketOptions {
    pub acl: Option<CannedAcl>,
    pub region: Option<String>,
}

/// Finds the store's bucket, creating it first if the store reports that it
/// does not exist.
///
/// Only [`NoSuchBucket`](ErrorKind::NoSuchBucket) triggers creation; every
/// other failure is returned as-is. After creating, the bucket is looked up
/// again so that the returned [`BucketInfo`] reflects what the store reports.
pub async fn find_or_create_bucket(store: &dyn ObjectStore, options: &BucketOptions) -> Result<BucketInfo> {
    match store.find_bucket().await {
        Ok(bucket) => return Ok(bucket),
        Err(e) if matches!(&*e, ErrorKind::NoSuchBucket(_)) => {},
        Err(e) => return Err(e),
    }
    tracing::info!(bucket = store.name(), acl = ?options.acl, region = ?options.region, "Bucket not found; creating");
    store.create_bucket(options.acl, options.region.as_deref()).await?;
    let mut bucket = store
        .find_bucket()
        .await
        .or_raise(|| ErrorKind::BackendError(format!("bucket `{}` missing after creation", store.name())))?;
    bucket.created = true;
    Ok(bucket)
}

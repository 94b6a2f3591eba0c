//! S3-compatible object store.
//!
//! This module provides an object store implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Tigris (Fly.io), and others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file; they are
//! established once, when the client is built, and reused for every request
//! of the run.

use crate::{
    ObjectStore,
    backend::RemoteObjectStream,
    error::{ErrorKind, Result},
    models::{BucketInfo, CannedAcl, ObjectMetadata, RemoteObject},
    validate_key,
};
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig, timeout::TimeoutConfig},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::{ByteStream, DateTime},
    types::{BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;
/// Region that must not be sent as a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// S3-compatible object store bound to a single bucket.
///
/// # Examples
///
/// ```no_run
/// use assetpush_storage::backend::S3Store;
/// use std::time::Duration;
///
/// # fn example() -> assetpush_storage::error::Result<()> {
/// let store = S3Store::new(
///     "my-assets",
///     Some("eu-west-1"),
///     None::<String>,
///     "access_key_id",
///     "secret_access_key",
///     Some(Duration::from_secs(30)),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Store {
    bucket: String,
    client: Client,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Store {
    /// Create a new S3 object store.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region or provider-specific region (defaults to `us-east-1`)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    /// * `timeout` - Limit for each request attempt; a stalled request fails
    ///   with a retryable [`ErrorKind::Network`]
    pub fn new(
        bucket: impl Into<String>,
        region: Option<impl Into<String>>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let bucket = validate_bucket_name(bucket.into())?;
        let region = Region::new(region.map(Into::into).unwrap_or_else(|| DEFAULT_REGION.to_string()));
        let credentials = Credentials::new(key_id, key_secret, None, None, "assetpush-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            // The SDK's own retries stay at a single attempt; per-file retries
            // are handled by the uploader so they show up in the run report.
            .retry_config(RetryConfig::standard().with_max_attempts(1));
        if let Some(timeout) = timeout {
            let timeouts = TimeoutConfig::builder()
                .connect_timeout(timeout)
                .operation_attempt_timeout(timeout)
                .build();
            config_builder = config_builder.timeout_config(timeouts);
        }
        // Set custom endpoint for non-AWS services, and use path-style
        // addressing for better compatibility with them (MinIO, etc.)
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url).force_path_style(true);
        }
        Ok(Self::from_client(bucket, Client::from_conf(config_builder.build())))
    }

    /// Wrap an already configured client.
    pub fn from_client(bucket: impl Into<String>, client: Client) -> Self {
        Self {
            bucket: bucket.into(),
            client,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        }
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> OwnedSemaphorePermit {
        // unwrap is safe: semaphore is never closed
        self.rate_limiter.clone().acquire_owned().await.unwrap()
    }

    /// Convert an `OffsetDateTime` into the SDK's date type.
    fn to_datetime(value: time::OffsetDateTime) -> DateTime {
        DateTime::from_secs(value.unix_timestamp())
    }

    fn remote_object(key: &str, etag: Option<&str>, size: Option<i64>) -> RemoteObject {
        RemoteObject::new(key, etag.unwrap_or_default(), size.and_then(|s| u64::try_from(s).ok()).unwrap_or(0))
    }
}

fn validate_bucket_name(bucket: String) -> Result<String> {
    if bucket.is_empty() || bucket.contains('/') {
        exn::bail!(ErrorKind::BackendError(format!("invalid bucket name `{bucket}`")));
    }
    Ok(bucket)
}

/// Map SDK failures onto actionable error categories.
fn classify<E, R>(err: SdkError<E, R>, context: &str) -> ErrorKind
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{context}: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ErrorKind::Network(message)
        },
        SdkError::ServiceError(service) => match service.err().code() {
            Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => ErrorKind::PermissionDenied(message),
            Some("NoSuchBucket") => ErrorKind::NoSuchBucket(context.to_string()),
            _ => ErrorKind::BackendError(message),
        },
        _ => ErrorKind::BackendError(message),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        &self.bucket
    }

    async fn find_bucket(&self) -> Result<BucketInfo> {
        let _permit = self.acquire_permit().await;
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(output) => Ok(BucketInfo::new(&self.bucket).with_region(output.bucket_region())),
            Err(SdkError::ServiceError(e)) if e.err().is_not_found() => {
                exn::bail!(ErrorKind::NoSuchBucket(self.bucket.clone()))
            },
            Err(e) => exn::bail!(classify(e, &self.bucket)),
        }
    }

    async fn create_bucket(&self, acl: Option<CannedAcl>, region: Option<&str>) -> Result<()> {
        let _permit = self.acquire_permit().await;
        let mut request = self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .set_acl(acl.map(|acl| BucketCannedAcl::from(acl.as_str())));
        if let Some(region) = region.filter(|r| *r != DEFAULT_REGION) {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            request = request.create_bucket_configuration(configuration);
        }
        request.send().await.map_err(|e| classify(e, &self.bucket))?;
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<RemoteObject> {
        let key = validate_key(key)?;
        let _permit = self.acquire_permit().await;
        let output = match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(SdkError::ServiceError(e)) if e.err().is_not_found() => exn::bail!(ErrorKind::NotFound(key)),
            // HEAD responses carry no body, so a missing key can surface as
            // an unmodeled 404.
            Err(SdkError::ServiceError(e)) if e.raw().status().as_u16() == 404 => {
                exn::bail!(ErrorKind::NotFound(key))
            },
            Err(e) => exn::bail!(classify(e, &key)),
        };
        let metadata = ObjectMetadata {
            cache_control: output.cache_control().map(String::from),
            content_type: output.content_type().map(String::from),
            content_encoding: output.content_encoding().map(String::from),
            expires: None,
            acl: None,
        };
        Ok(Self::remote_object(&key, output.e_tag(), output.content_length()).with_metadata(metadata))
    }

    async fn put(&self, key: &str, body: Vec<u8>, metadata: &ObjectMetadata) -> Result<()> {
        let key = validate_key(key)?;
        let _permit = self.acquire_permit().await;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .set_cache_control(metadata.cache_control.clone())
            .set_content_type(metadata.content_type.clone())
            .set_content_encoding(metadata.content_encoding.clone())
            .set_expires(metadata.expires.map(Self::to_datetime))
            .set_acl(metadata.acl.map(|acl| ObjectCannedAcl::from(acl.as_str())))
            .send()
            .await
            .map_err(|e| classify(e, &key))?;
        Ok(())
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> RemoteObjectStream<'a> {
        Box::pin(stream! {
            let _permit = self.acquire_permit().await;
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(prefix.map(String::from))
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = match page {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(exn::Exn::from(classify(e, &self.bucket)));
                        return;
                    },
                };
                for object in page.contents() {
                    // Keys without a name cannot be addressed again; skip them.
                    let Some(key) = object.key() else { continue };
                    yield Ok(Self::remote_object(key, object.e_tag(), object.size()));
                }
            }
        })
    }
}

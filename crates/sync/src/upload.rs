use assetpush_cdn::InvalidationClient;
use assetpush_storage::error::Error as StorageError;
use assetpush_storage::{BucketInfo, BucketOptions, ObjectMetadata, StoreHandle, find_or_create_bucket};
use exn::ResultExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use crate::asset::{UploadPlan, plan};
use crate::detect::{Change, ChangeDetector};
use crate::error::{ErrorKind, Result};
use crate::report::{ChangeSet, FailedFile, InvalidationStatus, SyncReport};
use crate::scan::expand_all;
use crate::Context;

enum FileOutcome {
    Uploaded { key: String, replaced: bool },
    Skipped(String),
    Failed(FailedFile),
}

/// Uploads a run's assets into one bucket.
pub struct Uploader {
    ctx: Context,
    store: StoreHandle,
    bucket: BucketInfo,
    invalidator: Option<InvalidationClient>,
    cancel: CancellationToken,
}
impl Uploader {
    /// Resolves the bucket, creating it when missing, before anything is
    /// uploaded.
    pub async fn connect(ctx: Context, store: StoreHandle, options: &BucketOptions) -> Result<Self> {
        let bucket = find_or_create_bucket(&*store, options).await.or_raise(|| ErrorKind::Bucket)?;
        tracing::info!(bucket = %bucket.name, created = bucket.created, region = ?bucket.region, "Using bucket");
        Ok(Self { ctx, store, bucket, invalidator: None, cancel: CancellationToken::new() })
    }

    pub fn with_invalidator(mut self, invalidator: Option<InvalidationClient>) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// Stops scheduling new files once `cancel` fires. Files already in flight
    /// finish, and no invalidation is sent.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn bucket(&self) -> &BucketInfo {
        &self.bucket
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Runs the upload.
    ///
    /// Up to `concurrency` files are processed at once. Per-file failures are
    /// recorded in the report rather than returned; only failing to discover
    /// files is an error.
    pub async fn upload(&self) -> Result<SyncReport> {
        let ctx = &self.ctx;
        tracing::info!(bucket = %self.bucket.name, "Pushing assets");
        if ctx.invalidate {
            tracing::info!("Using invalidation method");
        }
        if ctx.full_versioning {
            tracing::info!(version = %ctx.token(), "Using versioned assets method");
        }

        let files = expand_all(&ctx.asset_root, &ctx.patterns).await?;
        let mut pending = plan(ctx, files).into_iter().enumerate();
        let mut report = SyncReport { version: ctx.token().clone(), ..Default::default() };
        // Plan index of every replaced key.
        let mut replaced = Vec::new();

        let mut processing = FuturesUnordered::new();
        if !self.cancel.is_cancelled() {
            processing.extend(pending.by_ref().take(ctx.concurrency).map(|(index, plan)| self.process(index, plan)));
        }
        while let Some((index, outcome)) = processing.next().await {
            if let Some(key) = self.record(&mut report, outcome) {
                replaced.push((index, key));
            }
            if self.cancel.is_cancelled() {
                continue;
            }
            if let Some((index, plan)) = pending.next() {
                processing.push(self.process(index, plan));
            }
        }
        replaced.sort_unstable_by_key(|(index, _)| *index);
        for (_, key) in replaced {
            report.change_set.push(key);
        }

        if self.cancel.is_cancelled() {
            report.cancelled = true;
            report.not_attempted = pending.len();
            tracing::warn!(not_attempted = report.not_attempted, "Run cancelled; invalidation skipped");
            return Ok(report);
        }
        if ctx.invalidate {
            report.invalidation = self.invalidate(&report.change_set).await;
        }
        tracing::info!(summary = %report, "Upload finished");
        Ok(report)
    }

    /// Adds `outcome` to the report. Returns the key when it must be
    /// invalidated.
    fn record(&self, report: &mut SyncReport, outcome: FileOutcome) -> Option<String> {
        match outcome {
            FileOutcome::Uploaded { key, replaced } => {
                let invalidate = (replaced && self.ctx.invalidate).then(|| {
                    tracing::info!(key = %key, "File changed and will be invalidated");
                    key.clone()
                });
                report.uploaded.push(key);
                return invalidate;
            },
            FileOutcome::Skipped(key) => report.skipped.push(key),
            FileOutcome::Failed(failure) => report.failed.push(failure),
        }
        None
    }

    async fn process(&self, index: usize, plan: UploadPlan) -> (usize, FileOutcome) {
        let path = plan.file.local_path.display();
        tracing::debug!(path = %path, key = %plan.key, gzip = plan.gzip(), "Processing asset");
        (index, self.process_plan(plan).await)
    }

    async fn process_plan(&self, plan: UploadPlan) -> FileOutcome {
        let UploadPlan { file, key } = plan;
        let body = match file.read().await {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(path = %file.local_path.display(), error = ?err, "Could not read asset");
                let reason = (*err).to_string();
                return FileOutcome::Failed(FailedFile { path: file.local_path, key, attempts: 0, reason });
            },
        };

        let replaced = if self.ctx.full_versioning {
            false
        } else {
            match ChangeDetector::inspect(&*self.store, &key, &body).await {
                Ok(change) if !change.needs_upload() => {
                    tracing::info!(key = %key, "File has not changed");
                    return FileOutcome::Skipped(key);
                },
                Ok(change) => matches!(change, Change::Modified(_)),
                Err(err) => {
                    tracing::warn!(key = %key, error = ?err, "Could not inspect remote object; uploading anyway");
                    false
                },
            }
        };

        let metadata = self.ctx.metadata_for(&file);
        match self.put_with_retries(&key, body, &metadata).await {
            Ok(()) => {
                tracing::info!(from = %file.relative, to = %key, "Uploaded");
                FileOutcome::Uploaded { key, replaced }
            },
            Err((attempts, err)) => {
                tracing::error!(key = %key, attempts, error = ?err, "Upload failed");
                let reason = (*err).to_string();
                FileOutcome::Failed(FailedFile { path: file.local_path, key, attempts, reason })
            },
        }
    }

    /// Retries retryable failures with linear backoff, up to the configured
    /// number of attempts. Returns the attempt count with the last error.
    async fn put_with_retries(
        &self,
        key: &str,
        body: Vec<u8>,
        metadata: &ObjectMetadata,
    ) -> std::result::Result<(), (u32, StorageError)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.store.put(key, body.clone(), metadata).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.ctx.retries || self.cancel.is_cancelled() {
                return Err((attempt, err));
            }
            let delay = self.ctx.retry_delay * attempt;
            tracing::warn!(key, attempt, delay_ms = delay.as_millis() as u64, error = ?err, "Upload failed; retrying");
            tokio::time::sleep(delay).await;
        }
    }

    async fn invalidate(&self, changes: &ChangeSet) -> InvalidationStatus {
        let Some(invalidator) = &self.invalidator else {
            tracing::warn!(changed = changes.len(), "Invalidation enabled but no client configured");
            return InvalidationStatus::NotRequested;
        };
        match invalidator.invalidate(changes.as_slice()).await {
            Ok(outcome) => InvalidationStatus::Completed(outcome),
            Err(err) => {
                tracing::error!(error = ?err, "Invalidation request failed");
                InvalidationStatus::Failed((*err).to_string())
            },
        }
    }
}

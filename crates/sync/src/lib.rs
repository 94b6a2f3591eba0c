//! Asset synchronisation.
//!
//! A run expands the configured glob patterns under the asset root, plans a
//! remote key for every file, uploads what the store does not already hold,
//! and finally asks the CDN to invalidate any object it replaced:
//!
//! ```text
//! Context::from_config ─▶ Uploader::connect ─▶ Uploader::upload ─▶ SyncReport
//!                           (bucket lookup)     (scan, plan, put,
//!                                                invalidate)
//! ```

mod asset;
mod detect;
pub mod error;
pub mod mime;
mod report;
mod scan;
mod upload;

use assetpush_cdn::{Credentials, InvalidationClient, Transport};
use assetpush_config::Config;
use assetpush_storage::ObjectMetadata;
use assetpush_version::{PathVersioner, VersionToken};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use crate::asset::{AssetFile, UploadPlan, plan};
pub use crate::detect::{Change, ChangeDetector};
use crate::error::Result;
pub use crate::report::{ChangeSet, FailedFile, InvalidationStatus, SyncReport};
pub use crate::scan::{Pattern, expand_all};
pub use crate::upload::Uploader;

/// Everything a run needs, resolved once before it starts.
#[derive(Clone, Debug)]
pub struct Context {
    pub asset_root: PathBuf,
    pub public_root: PathBuf,
    pub patterns: Vec<Pattern>,
    pub versioner: PathVersioner,
    /// Upload every file under a versioned key without comparing contents.
    pub full_versioning: bool,
    /// Collect replaced keys and invalidate them after the run.
    pub invalidate: bool,
    /// Metadata shared by every upload; content type and encoding are set
    /// per file.
    pub metadata: ObjectMetadata,
    pub concurrency: usize,
    /// Total put attempts per file.
    pub retries: u32,
    pub retry_delay: Duration,
}
impl Context {
    pub fn from_config(config: &Config, token: VersionToken) -> Result<Self> {
        let patterns = upload_patterns(config).into_iter().map(Pattern::new).collect::<Result<Vec<_>>>()?;
        Ok(Self {
            asset_root: config.asset_root.clone(),
            public_root: config.public_root(),
            patterns,
            versioner: config.path_versioner(token),
            full_versioning: config.full_versioning(),
            invalidate: config.invalidation_enabled(),
            metadata: ObjectMetadata {
                cache_control: config.s3.cache_control.clone(),
                expires: config.s3.expires,
                acl: Some(config.s3.acl),
                ..Default::default()
            },
            concurrency: config.upload.concurrency.max(1),
            retries: config.upload.retries.max(1),
            retry_delay: Duration::from_millis(config.upload.retry_delay_ms),
        })
    }

    pub fn token(&self) -> &VersionToken {
        self.versioner.token()
    }

    pub(crate) fn metadata_for(&self, file: &AssetFile) -> ObjectMetadata {
        ObjectMetadata {
            content_type: Some(file.content_type.to_string()),
            content_encoding: file.gzip.then(|| "gzip".to_string()),
            ..self.metadata.clone()
        }
    }
}

/// Glob patterns for a run, relative to the asset root, in upload order:
/// packaged stylesheets and scripts (or their `.gz` builds), images, then any
/// configured extras.
pub fn upload_patterns(config: &Config) -> Vec<String> {
    let package = join_segments(&[&config.public_dir, &config.package_path]);
    let mut patterns = match config.gzip_assets {
        true => vec![join_segments(&[&package, "**/*.gz"])],
        false => vec![join_segments(&[&package, "**/*.css"]), join_segments(&[&package, "**/*.js"])],
    };
    if config.upload.images {
        patterns.push(join_segments(&[&config.public_dir, &config.upload.image_dir, "**/*"]));
    }
    patterns.extend(config.upload.files.iter().cloned());
    patterns
}

/// Joins path segments with `/`, skipping any that are empty once trimmed.
fn join_segments(segments: &[&str]) -> String {
    segments.iter().map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
}

/// Client for the configured distribution, when invalidation is enabled.
pub fn invalidation_client(config: &Config, transport: Arc<dyn Transport>) -> Option<InvalidationClient> {
    if !config.invalidation_enabled() {
        return None;
    }
    let distribution_id = config.cdn.distribution_id.as_deref().filter(|d| !d.is_empty())?;
    let credentials = Credentials::new(&config.s3.access_key_id, &config.s3.secret_access_key);
    let client = InvalidationClient::new(distribution_id, credentials, transport);
    Some(match &config.cdn.endpoint {
        Some(endpoint) => client.with_endpoint(endpoint),
        None => client,
    })
}

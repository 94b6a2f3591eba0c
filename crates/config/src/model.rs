use assetpush_storage::{BucketOptions, CannedAcl};
use assetpush_version::{
    AssetHost, DEFAULT_ASSET_ID_VAR, DEFAULT_CI_VARS, PathVersioner, VersionResolver, VersionToken, VersioningPolicy,
};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;

/// Top-level configuration for an upload run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project root; upload globs are relative to it.
    pub asset_root: PathBuf,
    /// Directory under `asset_root` whose contents map onto the bucket root.
    pub public_dir: String,
    /// Directory under `public_dir` holding packaged stylesheets and scripts.
    pub package_path: String,
    /// Whether packaged assets are in use at all. CDN modes are inert without it.
    pub package_assets: bool,
    /// Upload the pre-compressed `.gz` packages instead of plain `.css`/`.js`.
    pub gzip_assets: bool,
    /// Fixed version token, taking precedence over the environment.
    pub asset_version: Option<String>,
    pub s3: S3Config,
    pub upload: UploadConfig,
    pub cdn: CdnConfig,
    pub version: VersionConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            public_dir: "public".to_string(),
            package_path: "assets".to_string(),
            package_assets: true,
            gzip_assets: false,
            asset_version: None,
            s3: S3Config::default(),
            upload: UploadConfig::default(),
            cdn: CdnConfig::default(),
            version: VersionConfig::default(),
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: Option<String>,
    /// Custom S3-compatible endpoint; enables path-style addressing.
    pub endpoint: Option<String>,
    pub cache_control: Option<String>,
    /// RFC 3339 timestamp sent as the `Expires` header.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,
    pub acl: CannedAcl,
}
impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("cache_control", &self.cache_control)
            .field("expires", &self.expires)
            .field("acl", &self.acl)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Upload everything under `{public_dir}/{image_dir}`.
    pub images: bool,
    pub image_dir: String,
    /// Additional glob patterns, relative to `asset_root`.
    #[serde(deserialize_with = "one_or_many")]
    pub files: Vec<String>,
    pub concurrency: usize,
    /// Total attempts per file, including the first.
    pub retries: u32,
    pub retry_delay_ms: u64,
    /// Upper bound on each S3 and CDN request.
    pub timeout_ms: u64,
}
impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            images: true,
            image_dir: "images".to_string(),
            files: Vec::new(),
            concurrency: 8,
            retries: 3,
            retry_delay_ms: 250,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdnMode {
    #[default]
    None,
    /// Upload changed files in place and invalidate them on the CDN.
    Invalidate,
    /// Upload every file under a per-run versioned key.
    Version,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    pub mode: CdnMode,
    /// How version tokens are embedded when `mode = "version"`.
    pub policy: VersioningPolicy,
    pub distribution_id: Option<String>,
    /// The distribution's own domain, e.g. `d111111abcdef8.cloudfront.net`.
    pub domain: Option<String>,
    /// CNAMEs for non-SSL requests; one or many.
    #[serde(deserialize_with = "one_or_many")]
    pub cname: Vec<String>,
    /// Force `https` (true) or `http` (false); defaults to `https`.
    pub ssl: Option<bool>,
    /// Invalidation API endpoint override.
    pub endpoint: Option<String>,
}
impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            mode: CdnMode::None,
            policy: VersioningPolicy::RootPrefix,
            distribution_id: None,
            domain: None,
            cname: Vec::new(),
            ssl: None,
            endpoint: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    pub env_var: String,
    pub ci_env_vars: Vec<String>,
    /// Fall back to `git rev-parse --short HEAD` inside `asset_root`.
    pub scm: bool,
}
impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            env_var: DEFAULT_ASSET_ID_VAR.to_string(),
            ci_env_vars: DEFAULT_CI_VARS.iter().map(|v| v.to_string()).collect(),
            scm: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

impl Config {
    /// Every file is uploaded under a versioned key, unconditionally.
    pub fn full_versioning(&self) -> bool {
        self.package_assets && self.cdn.mode == CdnMode::Version
    }

    /// Replaced files are collected and invalidated after the run.
    pub fn invalidation_enabled(&self) -> bool {
        self.package_assets && self.cdn.mode == CdnMode::Invalidate
    }

    pub fn versioning_policy(&self) -> VersioningPolicy {
        if self.full_versioning() { self.cdn.policy } else { VersioningPolicy::None }
    }

    pub fn path_versioner(&self, token: VersionToken) -> PathVersioner {
        PathVersioner::new(self.versioning_policy(), token)
    }

    /// Builds the resolver for this configuration. A non-empty `override_token`
    /// (from the command line) wins over `asset_version`.
    pub fn version_resolver(&self, override_token: Option<&str>) -> VersionResolver {
        let explicit = override_token
            .filter(|t| !t.trim().is_empty())
            .or(self.asset_version.as_deref())
            .map(str::to_string);
        let resolver = VersionResolver::new()
            .with_override(explicit)
            .with_asset_id_var(&self.version.env_var)
            .with_ci_vars(&self.version.ci_env_vars);
        if self.version.scm { resolver.with_scm_dir(&self.asset_root) } else { resolver.without_scm() }
    }

    /// Host for serving uploaded assets, or `None` when assets are not packaged.
    pub fn asset_host(&self) -> Option<AssetHost> {
        if !self.package_assets {
            return None;
        }
        let host = match self.cdn.domain.as_deref().filter(|d| !d.is_empty()) {
            Some(domain) if self.cdn.mode != CdnMode::None => AssetHost::for_cdn(domain, &self.cdn.cname),
            _ => AssetHost::for_bucket(&self.s3.bucket),
        };
        Some(host.with_ssl(self.cdn.ssl))
    }

    pub fn bucket_options(&self) -> BucketOptions {
        BucketOptions { acl: Some(self.s3.acl), region: self.s3.region.clone() }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.upload.timeout_ms)
    }

    pub fn public_root(&self) -> PathBuf {
        self.asset_root.join(&self.public_dir)
    }
}

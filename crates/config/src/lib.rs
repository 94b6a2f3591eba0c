//! Layered configuration.
//!
//! Values are merged from, in increasing precedence:
//!
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON by extension),
//! 3. `ASSETPUSH_`-prefixed environment variables, with `__` separating
//!    nested keys (`ASSETPUSH_S3__BUCKET=assets`).
//!
//! [`Config::validate`] should be called before anything touches the network.

pub mod error;
mod model;

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};
pub use crate::model::{CdnConfig, CdnMode, Config, S3Config, UploadConfig, VersionConfig};

pub const ENV_PREFIX: &str = "ASSETPUSH_";
pub const FILE_NAME: &str = "assetpush.toml";

impl Config {
    /// Loads configuration from `path`, or from [`Config::default_path`].
    ///
    /// A missing file is not an error; defaults and the environment still
    /// apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        tracing::debug!(path = %path.display(), exists = path.exists(), "Loading configuration");
        let figment = Self::file_provider(Figment::new(), &path).merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().map_err(|e| Error::from(ErrorKind::Load(e.to_string())))
    }

    /// `./assetpush.toml` when present, else the platform configuration
    /// directory's copy, else `./assetpush.toml` again.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(FILE_NAME);
        if local.exists() {
            return local;
        }
        ProjectDirs::from("", "", "assetpush")
            .map(|dirs| dirs.config_dir().join(FILE_NAME))
            .filter(|p| p.exists())
            .unwrap_or(local)
    }

    fn file_provider(figment: Figment, path: &Path) -> Figment {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        }
    }

    /// Fails on the first missing or out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if self.public_dir.trim().is_empty() {
            exn::bail!(ErrorKind::MissingField("public_dir"));
        }
        if self.s3.bucket.trim().is_empty() {
            exn::bail!(ErrorKind::MissingField("s3.bucket"));
        }
        if self.s3.access_key_id.trim().is_empty() {
            exn::bail!(ErrorKind::MissingField("s3.access_key_id"));
        }
        if self.s3.secret_access_key.trim().is_empty() {
            exn::bail!(ErrorKind::MissingField("s3.secret_access_key"));
        }
        if self.invalidation_enabled() && self.cdn.distribution_id.as_deref().is_none_or(|d| d.trim().is_empty()) {
            exn::bail!(ErrorKind::MissingField("cdn.distribution_id"));
        }
        if self.full_versioning() && self.cdn.policy == assetpush_version::VersioningPolicy::None {
            exn::bail!(ErrorKind::Invalid("cdn.policy"));
        }
        if self.upload.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("upload.concurrency"));
        }
        if self.upload.retries == 0 {
            exn::bail!(ErrorKind::Invalid("upload.retries"));
        }
        if self.upload.timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid("upload.timeout_ms"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetpush_storage::CannedAcl;
    use assetpush_version::VersioningPolicy;
    use rstest::rstest;

    const MINIMAL: &str = r#"
        [s3]
        bucket = "assets"
        access_key_id = "AKID"
        secret_access_key = "secret"
    "#;

    fn parse(toml: &str) -> Config {
        Config::from_figment(Figment::new().merge(Toml::string(toml))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("");
        assert_eq!(config.public_dir, "public");
        assert_eq!(config.package_path, "assets");
        assert!(config.package_assets);
        assert!(!config.gzip_assets);
        assert!(config.upload.images);
        assert_eq!(config.upload.concurrency, 8);
        assert_eq!(config.upload.retries, 3);
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(30));
        assert_eq!(config.s3.acl, CannedAcl::PublicRead);
        assert_eq!(config.cdn.mode, CdnMode::None);
        assert_eq!(config.version.env_var, "RAILS_ASSET_ID");
        assert_eq!(config.versioning_policy(), VersioningPolicy::None);
    }

    #[test]
    fn test_minimal_is_valid() {
        parse(MINIMAL).validate().unwrap();
    }

    #[test]
    fn test_full_document() {
        let config = parse(
            r#"
            asset_root = "/srv/app"
            gzip_assets = true
            asset_version = "r42"

            [s3]
            bucket = "assets"
            access_key_id = "AKID"
            secret_access_key = "secret"
            region = "eu-west-1"
            cache_control = "public, max-age=31536000"
            expires = "2030-01-01T00:00:00Z"
            acl = "authenticated_read"

            [upload]
            images = false
            files = "public/robots.txt"
            concurrency = 2
            timeout_ms = 5000

            [cdn]
            mode = "version"
            policy = "filename_splice"
            domain = "d1.cloudfront.net"
            cname = ["a.example.com", "b.example.com"]
            ssl = false
            "#,
        );
        config.validate().unwrap();
        assert_eq!(config.asset_root, PathBuf::from("/srv/app"));
        assert_eq!(config.public_root(), PathBuf::from("/srv/app/public"));
        assert_eq!(config.s3.acl, CannedAcl::AuthenticatedRead);
        assert_eq!(config.s3.expires.map(|e| e.year()), Some(2030));
        assert_eq!(config.upload.files, vec!["public/robots.txt".to_string()]);
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(5));
        assert_eq!(config.cdn.cname.len(), 2);
        assert!(config.full_versioning());
        assert_eq!(config.versioning_policy(), VersioningPolicy::FilenameSplice);
        let host = config.asset_host().unwrap();
        assert_eq!(host.resolve("/a.png", true), "http://d1.cloudfront.net");
    }

    #[test]
    fn test_modes_require_packaged_assets() {
        let config = parse(&format!("package_assets = false\n[cdn]\nmode = \"version\"\n{MINIMAL}"));
        assert!(!config.full_versioning());
        assert_eq!(config.versioning_policy(), VersioningPolicy::None);
        assert!(config.asset_host().is_none());
    }

    #[test]
    fn test_bucket_host_without_cdn() {
        let config = parse(MINIMAL);
        assert_eq!(config.asset_host().unwrap().resolve("/a.png", false), "https://assets.s3.amazonaws.com");
    }

    #[test]
    fn test_override_beats_configured_version() {
        let config = parse("asset_version = \"from-config\"\n[version]\nscm = false");
        assert_eq!(config.version_resolver(Some("from-cli")).resolve().as_str(), "from-cli");
        assert_eq!(config.version_resolver(Some(" ")).resolve().as_str(), "from-config");
        assert_eq!(config.version_resolver(None).resolve().as_str(), "from-config");
    }

    #[rstest]
    #[case::bucket("[s3]\naccess_key_id = \"a\"\nsecret_access_key = \"b\"", ErrorKind::MissingField("s3.bucket"))]
    #[case::key_id("[s3]\nbucket = \"a\"\nsecret_access_key = \"b\"", ErrorKind::MissingField("s3.access_key_id"))]
    #[case::secret("[s3]\nbucket = \"a\"\naccess_key_id = \"b\"", ErrorKind::MissingField("s3.secret_access_key"))]
    #[case::distribution(
        "[cdn]\nmode = \"invalidate\"\n[s3]\nbucket = \"a\"\naccess_key_id = \"b\"\nsecret_access_key = \"c\"",
        ErrorKind::MissingField("cdn.distribution_id")
    )]
    #[case::policy(
        "[cdn]\nmode = \"version\"\npolicy = \"none\"\n[s3]\nbucket = \"a\"\naccess_key_id = \"b\"\nsecret_access_key = \"c\"",
        ErrorKind::Invalid("cdn.policy")
    )]
    #[case::concurrency(
        "[upload]\nconcurrency = 0\n[s3]\nbucket = \"a\"\naccess_key_id = \"b\"\nsecret_access_key = \"c\"",
        ErrorKind::Invalid("upload.concurrency")
    )]
    #[case::retries(
        "[upload]\nretries = 0\n[s3]\nbucket = \"a\"\naccess_key_id = \"b\"\nsecret_access_key = \"c\"",
        ErrorKind::Invalid("upload.retries")
    )]
    #[case::timeout(
        "[upload]\ntimeout_ms = 0\n[s3]\nbucket = \"a\"\naccess_key_id = \"b\"\nsecret_access_key = \"c\"",
        ErrorKind::Invalid("upload.timeout_ms")
    )]
    fn test_validation(#[case] toml: &str, #[case] expected: ErrorKind) {
        let err = parse(toml).validate().unwrap_err();
        assert_eq!(*err, expected);
        assert!(err.field().is_some());
    }

    #[test]
    fn test_invalidate_without_packaging_needs_no_distribution() {
        let config = parse(&format!("package_assets = false\n[cdn]\nmode = \"invalidate\"\n{MINIMAL}"));
        config.validate().unwrap();
        assert!(!config.invalidation_enabled());
    }

    #[test]
    fn test_unknown_acl_fails_to_load() {
        let result = Config::from_figment(Figment::new().merge(Toml::string("[s3]\nacl = \"world-writable\"")));
        assert!(matches!(&*result.unwrap_err(), ErrorKind::Load(_)));
    }

    #[rstest]
    #[case("assetpush.toml", "[s3]\nbucket = \"from-toml\"")]
    #[case("assetpush.yaml", "s3:\n  bucket: from-yaml")]
    #[case("assetpush.json", "{\"s3\": {\"bucket\": \"from-json\"}}")]
    fn test_load_by_extension(#[case] name: &str, #[case] contents: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.s3.bucket.starts_with("from-"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.public_dir, "public");
    }
}

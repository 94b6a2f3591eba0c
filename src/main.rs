mod cli;
mod error;

use assetpush_cdn::{DryRunTransport, HttpTransport, InvalidationOutcome, Transport};
use assetpush_config::Config;
use assetpush_storage::StoreHandle;
use assetpush_storage::backend::{ReadOnlyStore, S3Store};
use assetpush_sync::{Context, InvalidationStatus, SyncReport, Uploader, invalidation_client};
use assetpush_version::{Relativity, UrlRewriter, VersionToken, VersionedUrls, rewrite_stylesheet};
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};

const EXIT_FATAL: u8 = 1;
const EXIT_FAILED_FILES: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::from(EXIT_FATAL)
        },
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Upload { dry_run, asset_version } => upload(&config, dry_run, asset_version.as_deref()).await,
        Command::Version { asset_version } => {
            println!("{}", config.version_resolver(asset_version.as_deref()).resolve());
            Ok(0)
        },
        Command::RewriteCss { file, asset_version } => {
            let css = tokio::fs::read_to_string(&file).await.or_raise(|| ErrorKind::Read(file.clone()))?;
            let token = config.version_resolver(asset_version.as_deref()).resolve();
            print!("{}", stylesheet(&config, &css, token));
            Ok(0)
        },
        Command::AssetHost { source, ssl, asset_version } => {
            let token = config.version_resolver(asset_version.as_deref()).resolve();
            println!("{}", asset_url(&config, &source, ssl, token));
            Ok(0)
        },
    }
}

async fn upload(config: &Config, dry_run: bool, asset_version: Option<&str>) -> Result<u8> {
    config.validate().or_raise(|| ErrorKind::Config)?;
    let token = config.version_resolver(asset_version).resolve();
    let ctx = Context::from_config(config, token).or_raise(|| ErrorKind::Config)?;

    let s3 = S3Store::new(
        &config.s3.bucket,
        config.s3.region.as_deref(),
        config.s3.endpoint.as_deref(),
        &config.s3.access_key_id,
        &config.s3.secret_access_key,
        Some(config.request_timeout()),
    )
    .or_raise(|| ErrorKind::Store)?;
    let store: StoreHandle = Arc::new(s3);
    let (store, transport): (StoreHandle, Arc<dyn Transport>) = if dry_run {
        tracing::warn!("Dry run; nothing will be written");
        (Arc::new(ReadOnlyStore::new(store)), Arc::new(DryRunTransport))
    } else {
        (store, Arc::new(HttpTransport::new(config.request_timeout()).or_raise(|| ErrorKind::Http)?))
    };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let report = Uploader::connect(ctx, store, &config.bucket_options())
        .await
        .or_raise(|| ErrorKind::Upload)?
        .with_invalidator(invalidation_client(config, transport))
        .with_cancellation(cancel)
        .upload()
        .await
        .or_raise(|| ErrorKind::Upload)?;
    print_report(&report);
    Ok(exit_status(&report))
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("Interrupted; waiting for in-flight uploads");
        cancel.cancel();
    }
}

fn print_report(report: &SyncReport) {
    for failure in &report.failed {
        eprintln!(
            "failed: {} -> {} after {} attempt(s): {}",
            failure.path.display(),
            failure.key,
            failure.attempts,
            failure.reason
        );
    }
    if let InvalidationStatus::Completed(InvalidationOutcome::Rejected(failure)) = &report.invalidation {
        eprintln!("{failure}");
    }
    println!("{report}");
}

/// Invalidation problems never affect the status.
fn exit_status(report: &SyncReport) -> u8 {
    if report.has_failures() {
        EXIT_FAILED_FILES
    } else if report.cancelled {
        EXIT_FATAL
    } else {
        0
    }
}

/// Versions the stylesheet's local URLs when keys are versioned.
fn stylesheet(config: &Config, css: &str, token: VersionToken) -> String {
    let versioner = config.path_versioner(token);
    let rewriter = versioner.is_active().then(|| VersionedUrls::new(versioner));
    rewrite_stylesheet(css, rewriter.as_ref().map(|r| r as &dyn UrlRewriter)).into_owned()
}

/// Absolute URL for `source`, versioned the same way its key was at upload.
fn asset_url(config: &Config, source: &str, secure: bool, token: VersionToken) -> String {
    let Some(host) = config.asset_host() else {
        return source.to_string();
    };
    let path = config.path_versioner(token).version(source, Relativity::Preserve).into_owned();
    format!("{}/{}", host.resolve(source, secure), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetpush_cdn::InvalidationFailure;
    use assetpush_config::CdnMode;
    use assetpush_sync::FailedFile;
    use std::path::PathBuf;

    fn failed() -> FailedFile {
        FailedFile { path: PathBuf::from("public/a.css"), key: "a.css".to_string(), attempts: 3, reason: "timeout".to_string() }
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&SyncReport::default()), 0);
        assert_eq!(exit_status(&SyncReport { failed: vec![failed()], ..Default::default() }), EXIT_FAILED_FILES);
        assert_eq!(exit_status(&SyncReport { cancelled: true, ..Default::default() }), EXIT_FATAL);
        let rejected = SyncReport {
            invalidation: InvalidationStatus::Completed(InvalidationOutcome::Rejected(InvalidationFailure {
                status: 403,
                path: "/2010-11-01/distribution/E1/invalidation".to_string(),
                headers: Vec::new(),
                request_body: String::new(),
                response_body: String::new(),
            })),
            ..Default::default()
        };
        assert_eq!(exit_status(&rejected), 0);
        let unreachable = SyncReport { invalidation: InvalidationStatus::Failed("timeout".to_string()), ..Default::default() };
        assert_eq!(exit_status(&unreachable), 0);
    }

    #[test]
    fn test_stylesheet_versioned_only_with_version_mode() {
        let css = "a { background: url(/images/bg.png) } b { background: url(../images/b.png) }";
        let mut config = Config::default();
        assert_eq!(stylesheet(&config, css, VersionToken::new("42")), css);
        config.cdn.mode = CdnMode::Version;
        assert_eq!(stylesheet(&config, css, VersionToken::new("42")), "a { background: url(/42/images/bg.png) } b { background: url(../images/b.png) }");
    }

    #[test]
    fn test_asset_url() {
        let mut config = Config::default();
        config.s3.bucket = "assets".to_string();
        let url = asset_url(&config, "/assets/app.css", false, VersionToken::new("v1"));
        assert_eq!(url, "https://assets.s3.amazonaws.com/assets/app.css");
        config.package_assets = false;
        assert_eq!(asset_url(&config, "/assets/app.css", false, VersionToken::new("v1")), "/assets/app.css");
    }

    #[test]
    fn test_asset_url_matches_versioned_key() {
        let mut config = Config::default();
        config.s3.bucket = "assets".to_string();
        config.cdn.mode = CdnMode::Version;
        let url = asset_url(&config, "/assets/app.css", true, VersionToken::new("v1"));
        assert_eq!(url, "https://assets.s3.amazonaws.com/v1/assets/app.css");
        let unversioned = asset_url(&config, "/assets/app.css", true, VersionToken::new(""));
        assert_eq!(unversioned, "https://assets.s3.amazonaws.com/assets/app.css");
        config.cdn.policy = assetpush_version::VersioningPolicy::FilenameSplice;
        let url = asset_url(&config, "/images/logo.png", true, VersionToken::new("v1"));
        assert_eq!(url, "https://assets.s3.amazonaws.com/images/logo.v1.png");
    }
}

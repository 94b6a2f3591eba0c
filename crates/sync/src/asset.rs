use assetpush_storage::validate_key;
use assetpush_version::Relativity;
use exn::ResultExt;
use std::path::{Path, PathBuf};

use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::mime;
use crate::scan::relative_path;

const GZIP_SUFFIX: &str = ".gz";

/// A local file selected for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetFile {
    pub local_path: PathBuf,
    /// Path below the public directory, `/`-separated, without any `.gz`.
    pub relative: String,
    /// The file is pre-compressed and must be served with `Content-Encoding: gzip`.
    pub gzip: bool,
    pub content_type: &'static str,
}
impl AssetFile {
    /// Describes `local_path` relative to `public_root`.
    ///
    /// Files outside the public directory (from custom patterns) fall back to
    /// their path relative to `asset_root`. Returns `None` for files under
    /// neither.
    pub fn new(asset_root: &Path, public_root: &Path, local_path: PathBuf) -> Option<Self> {
        let mut relative = relative_path(public_root, &local_path).or_else(|| relative_path(asset_root, &local_path))?;
        let gzip = relative.len() > GZIP_SUFFIX.len() && relative.ends_with(GZIP_SUFFIX);
        if gzip {
            relative.truncate(relative.len() - GZIP_SUFFIX.len());
        }
        let content_type = mime::from_key(&relative);
        Some(Self { local_path, relative, gzip, content_type })
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.local_path)
            .await
            .or_raise(|| ErrorKind::Read(self.local_path.clone()))
    }
}

/// Where one file goes, decided before any network call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPlan {
    pub file: AssetFile,
    pub key: String,
}
impl UploadPlan {
    pub fn gzip(&self) -> bool {
        self.file.gzip
    }
}

/// Computes the remote key of every file.
///
/// Under full versioning each path passes once through the run's versioner,
/// with relative paths versioned. Otherwise the key is the unversioned path.
/// Files whose key is not a valid object key are logged and left out.
pub fn plan(ctx: &Context, files: impl IntoIterator<Item = PathBuf>) -> Vec<UploadPlan> {
    files
        .into_iter()
        .filter_map(|local_path| {
            let Some(file) = AssetFile::new(&ctx.asset_root, &ctx.public_root, local_path.clone()) else {
                tracing::warn!(path = %local_path.display(), "File is outside the asset root; skipping");
                return None;
            };
            let candidate = if ctx.full_versioning {
                ctx.versioner.version(&file.relative, Relativity::Version)
            } else {
                file.relative.as_str().into()
            };
            match validate_key(&candidate) {
                Ok(key) => Some(UploadPlan { file, key }),
                Err(err) => {
                    tracing::warn!(path = %file.local_path.display(), error = ?err, "Invalid object key; skipping");
                    None
                },
            }
        })
        .collect()
}

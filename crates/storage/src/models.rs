//! Storage models.
//!
//! These types describe objects and buckets as reported by (or sent to) an
//! [`ObjectStore`](crate::ObjectStore).

use crate::error::{ErrorKind, Result};
use md5::{Digest, Md5};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Content fingerprint in the same format S3 reports as the `ETag` of a
/// single-part upload: lower-case hex MD5 of the stored bytes.
///
/// ```
/// assert_eq!(assetpush_storage::content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// Canned access control list applied to buckets and objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    Private,
    #[default]
    #[serde(alias = "public_read")]
    PublicRead,
    #[serde(alias = "public_read_write")]
    PublicReadWrite,
    #[serde(alias = "authenticated_read")]
    AuthenticatedRead,
    #[serde(alias = "bucket_owner_read")]
    BucketOwnerRead,
    #[serde(alias = "bucket_owner_full_control")]
    BucketOwnerFullControl,
}
impl CannedAcl {
    /// Wire representation (`x-amz-acl` header value).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}
impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for CannedAcl {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_lowercase().replace('_', "-").as_str() {
            "private" => Self::Private,
            "public-read" => Self::PublicRead,
            "public-read-write" => Self::PublicReadWrite,
            "authenticated-read" => Self::AuthenticatedRead,
            "bucket-owner-read" => Self::BucketOwnerRead,
            "bucket-owner-full-control" => Self::BucketOwnerFullControl,
            _ => exn::bail!(ErrorKind::InvalidAcl(s.to_string())),
        })
    }
}

/// Metadata attached to an object on upload.
///
/// Every field is optional; unset fields are simply not sent to the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub cache_control: Option<String>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub expires: Option<OffsetDateTime>,
    pub acl: Option<CannedAcl>,
}

/// An object as reported by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteObject {
    /// Key within the bucket
    pub key: String,
    /// Content fingerprint reported by the store (ETag, quotes stripped)
    pub content_hash: String,
    /// Stored size in bytes
    pub size: u64,
    /// Metadata, when the store reports it (HEAD requests; not listings)
    pub metadata: Option<ObjectMetadata>,
}
impl RemoteObject {
    pub fn new(key: impl Into<String>, etag: impl AsRef<str>, size: u64) -> Self {
        Self {
            key: key.into(),
            content_hash: etag.as_ref().trim_matches('"').to_lowercase(),
            size,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ObjectMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A bucket resolved at the start of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    /// Region the store reported for the bucket, if any
    pub region: Option<String>,
    /// Whether the bucket was created during this run
    pub created: bool,
}
impl BucketInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), region: None, created: false }
    }

    pub fn with_region(mut self, region: Option<impl Into<String>>) -> Self {
        self.region = region.map(Into::into);
        self
    }
}

//! Cache-busting support for uploaded assets.
//!
//! A run resolves one [`VersionToken`] ([`VersionResolver`]) and threads it,
//! together with the configured [`VersioningPolicy`], through a
//! [`PathVersioner`]. The same versioner computes remote upload keys and
//! rewrites `url(...)` references inside compiled stylesheets
//! ([`rewrite_stylesheet`]), so both always agree on where an asset lives.

mod host;
mod policy;
mod resolve;
mod rewrite;
mod token;

pub use crate::host::AssetHost;
pub use crate::policy::{PathVersioner, Relativity, VersioningPolicy, filename_splice, root_prefix};
pub use crate::resolve::{DEFAULT_ASSET_ID_VAR, DEFAULT_CI_VARS, SHORT_HASH_LEN, VersionResolver, git_short_hash};
pub use crate::rewrite::{Passthrough, UrlRewriter, VersionedUrls, rewrite_stylesheet};
pub use crate::token::VersionToken;

//! Object key validation.
//!
//! Object stores accept almost any byte sequence as a key, but keys derived
//! from local asset paths should look like clean, relative, `/`-separated
//! paths. This module normalizes them and rejects anything that would escape
//! the bucket root.

use crate::error::{ErrorKind, Result};

/// Validates and normalizes an object key.
///
/// - Leading, trailing and repeated `/` are dropped.
/// - `.` segments are removed and `..` segments pop the previous segment.
/// - Keys that would climb above the bucket root, are empty after
///   normalization, or contain NUL bytes are rejected with
///   [`InvalidKey`](crate::error::ErrorKind::InvalidKey).
///
/// # Examples
///
/// ```
/// use assetpush_storage::validate_key;
/// // Valid keys
/// assert_eq!(validate_key("assets/app.css").unwrap(), "assets/app.css");
/// assert_eq!(validate_key("/v1/assets/app.css").unwrap(), "v1/assets/app.css");
/// assert_eq!(validate_key("v1/./../images//logo.png").unwrap(), "images/logo.png");
/// // Invalid keys
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a\0b").is_err());
/// assert!(validate_key("/").is_err());
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let key = key.as_ref();
    if key.contains('\0') {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_string()));
                }
            },
            normal => segments.push(normal),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_string())),
        false => Ok(segments.join("/")),
    }
}

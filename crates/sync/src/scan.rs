//! Glob expansion over the local asset tree.
//!
//! Patterns are `/`-separated and relative to the asset root. Supported syntax:
//!
//! - `*` matches within one path segment, `?` matches one character,
//! - `**/` matches zero or more whole directories (`**` elsewhere matches
//!   anything, including `/`),
//! - `{a,b}` matches either alternative.
//!
//! Entries whose name starts with `.` are skipped unless the pattern names a
//! dotted segment itself.

use exn::{OptionExt, ResultExt};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{ErrorKind, Result};

const META: &[char] = &['*', '?', '{', '}'];

#[derive(Clone, Debug)]
pub struct Pattern {
    glob: String,
    base: PathBuf,
    regex: Regex,
    hidden: bool,
}
impl Pattern {
    pub fn new(glob: impl Into<String>) -> Result<Self> {
        let glob = glob.into();
        let relative = glob.trim_start_matches("./").trim_start_matches('/');
        let regex = Regex::new(&translate(relative).ok_or_raise(|| ErrorKind::Pattern(glob.clone()))?)
            .or_raise(|| ErrorKind::Pattern(glob.clone()))?;
        let segments: Vec<&str> = relative.split('/').collect();
        let literal = segments.iter().take_while(|s| !s.contains(META)).count();
        // A fully literal pattern walks its parent directory.
        let base: PathBuf = segments[..literal.min(segments.len().saturating_sub(1))].iter().collect();
        let hidden = segments.iter().any(|s| s.starts_with('.') && *s != "." && *s != "..");
        Ok(Self { glob, base, regex, hidden })
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Tests a `/`-separated path relative to the asset root.
    pub fn matches(&self, relative: &str) -> bool {
        self.regex.is_match(relative)
    }

    /// Lists the files under `root` matching this pattern, sorted.
    ///
    /// Directories are never returned. A missing base directory yields no
    /// files rather than an error. Symlinked files are followed, symlinked
    /// directories are not descended into.
    pub async fn expand(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut stack = vec![root.join(&self.base)];
        let mut found = Vec::new();
        while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(err)
                    if matches!(err.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory) =>
                {
                    continue;
                },
                Err(err) => return Err(err).or_raise(|| ErrorKind::Read(current.clone())),
            };
            while let Some(entry) = entries.next_entry().await.or_raise(|| ErrorKind::Read(current.clone()))? {
                if !self.hidden && entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let file_type = entry.file_type().await.or_raise(|| ErrorKind::Read(path.clone()))?;
                // Broken symlinks are dropped.
                let Ok(metadata) = fs::metadata(&path).await else {
                    continue;
                };
                if metadata.is_dir() {
                    if !file_type.is_symlink() {
                        stack.push(path);
                    }
                    continue;
                }
                if metadata.is_file()
                    && let Some(relative) = relative_path(root, &path)
                    && self.matches(&relative)
                {
                    found.push(path);
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

/// Expands each pattern in order, keeping only the first occurrence of every
/// file.
pub async fn expand_all(root: &Path, patterns: &[Pattern]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        tracing::info!(pattern = pattern.as_str(), "Processing files");
        for path in pattern.expand(root).await? {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// `path` relative to `root`, joined with `/` regardless of platform.
pub(crate) fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
    (!segments.is_empty()).then(|| segments.join("/"))
}

fn translate(glob: &str) -> Option<String> {
    let mut regex = String::from("^");
    let mut chars = glob.chars().peekable();
    let mut depth = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    regex.push_str("(?:[^/]*/)*");
                } else {
                    regex.push_str(".*");
                }
            },
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '{' => {
                depth += 1;
                regex.push_str("(?:");
            },
            ',' if depth > 0 => regex.push('|'),
            '}' if depth > 0 => {
                depth -= 1;
                regex.push(')');
            },
            '}' => return None,
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    (depth == 0).then(|| regex + "$")
}

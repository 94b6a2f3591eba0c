use serde::Deserialize;
use std::borrow::Cow;

use crate::token::VersionToken;

/// How a version token is embedded into an asset path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersioningPolicy {
    /// Paths are never rewritten.
    #[default]
    None,
    /// `/css/app.css` becomes `/{token}/css/app.css`.
    RootPrefix,
    /// `css/app.css` becomes `css/app.{token}.css`.
    FilenameSplice,
}

/// Whether relative paths are versioned under [`VersioningPolicy::RootPrefix`].
///
/// Stylesheet URLs keep their relative references untouched (they resolve
/// against an already-versioned stylesheet), while upload keys are always
/// relative and must be versioned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Relativity {
    #[default]
    Preserve,
    Version,
}

/// Prefixes `path` with the version token as its first segment.
///
/// Absolute paths always gain the prefix. Relative paths are returned
/// unchanged unless `version_relative` is set. An empty path or token is the
/// identity.
///
/// ```
/// use assetpush_version::root_prefix;
/// assert_eq!(root_prefix("/css/app.css", "v1", false), "/v1/css/app.css");
/// assert_eq!(root_prefix("css/app.css", "v1", false), "css/app.css");
/// assert_eq!(root_prefix("css/app.css", "v1", true), "v1/css/app.css");
/// ```
pub fn root_prefix<'a>(path: &'a str, version: &str, version_relative: bool) -> Cow<'a, str> {
    if path.is_empty() || version.is_empty() {
        return Cow::Borrowed(path);
    }
    if path.starts_with('/') {
        Cow::Owned(format!("/{version}{path}"))
    } else if version_relative {
        Cow::Owned(format!("{version}/{path}"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Inserts the version token before the extension of the final path segment.
///
/// The extension starts at the last `.` of the final segment. A leading `.`
/// (dotfiles) does not count, and a segment without an extension gets the
/// token appended as `.{token}`. An empty path or token is the identity.
///
/// ```
/// use assetpush_version::filename_splice;
/// assert_eq!(filename_splice("images/logo.png", "7"), "images/logo.7.png");
/// assert_eq!(filename_splice("js/app.min.js", "7"), "js/app.min.7.js");
/// assert_eq!(filename_splice("LICENSE", "7"), "LICENSE.7");
/// ```
pub fn filename_splice<'a>(path: &'a str, version: &str) -> Cow<'a, str> {
    if path.is_empty() || version.is_empty() {
        return Cow::Borrowed(path);
    }
    let name_start = path.rfind('/').map_or(0, |slash| slash + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, extension) = path.split_at(name_start + dot);
            Cow::Owned(format!("{stem}.{version}{extension}"))
        },
        _ => Cow::Owned(format!("{path}.{version}")),
    }
}

/// Applies a [`VersioningPolicy`] with a fixed [`VersionToken`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathVersioner {
    policy: VersioningPolicy,
    token: VersionToken,
}
impl PathVersioner {
    pub fn new(policy: VersioningPolicy, token: VersionToken) -> Self {
        Self { policy, token }
    }

    pub fn policy(&self) -> VersioningPolicy {
        self.policy
    }

    pub fn token(&self) -> &VersionToken {
        &self.token
    }

    /// Returns `true` when [`version`](Self::version) can change a path.
    pub fn is_active(&self) -> bool {
        self.policy != VersioningPolicy::None && !self.token.is_empty()
    }

    pub fn version<'a>(&self, path: &'a str, relativity: Relativity) -> Cow<'a, str> {
        match self.policy {
            VersioningPolicy::None => Cow::Borrowed(path),
            VersioningPolicy::RootPrefix => root_prefix(path, self.token.as_str(), relativity == Relativity::Version),
            VersioningPolicy::FilenameSplice => filename_splice(path, self.token.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::absolute_file("/file.ext", false, "/v1/file.ext")]
    #[case::absolute_nested("/dir/file.ext", false, "/v1/dir/file.ext")]
    #[case::absolute_ignores_flag("/dir/file.ext", true, "/v1/dir/file.ext")]
    #[case::root("/", false, "/v1/")]
    #[case::relative_preserved("file.ext", false, "file.ext")]
    #[case::relative_nested_preserved("dir/file.ext", false, "dir/file.ext")]
    #[case::relative_versioned("file.ext", true, "v1/file.ext")]
    #[case::relative_nested_versioned("dir/file.ext", true, "v1/dir/file.ext")]
    #[case::parent_preserved("../images/a.png", false, "../images/a.png")]
    #[case::empty("", true, "")]
    fn test_root_prefix(#[case] path: &str, #[case] relative: bool, #[case] expected: &str) {
        assert_eq!(root_prefix(path, "v1", relative), expected);
    }

    #[rstest]
    #[case("/file.ext", false)]
    #[case("file.ext", true)]
    fn test_root_prefix_empty_version(#[case] path: &str, #[case] relative: bool) {
        assert_eq!(root_prefix(path, "", relative), path);
    }

    #[rstest]
    #[case::simple("images/logo.png", "images/logo.7.png")]
    #[case::absolute("/css/app.css", "/css/app.7.css")]
    #[case::multiple_dots("js/app.min.js", "js/app.min.7.js")]
    #[case::no_extension("LICENSE", "LICENSE.7")]
    #[case::dotted_directory("v1.2/readme", "v1.2/readme.7")]
    #[case::dotfile(".htaccess", ".htaccess.7")]
    #[case::nested_dotfile("conf/.env.local", "conf/.env.7.local")]
    #[case::trailing_slash("images/", "images/.7")]
    #[case::query_string("fonts/icons.woff?#iefix", "fonts/icons.7.woff?#iefix")]
    fn test_filename_splice(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(filename_splice(path, "7"), expected);
    }

    #[test]
    fn test_filename_splice_identity() {
        assert_eq!(filename_splice("images/logo.png", ""), "images/logo.png");
        assert_eq!(filename_splice("", "7"), "");
    }

    #[rstest]
    #[case(VersioningPolicy::None, Relativity::Version, "css/app.css")]
    #[case(VersioningPolicy::RootPrefix, Relativity::Version, "abc/css/app.css")]
    #[case(VersioningPolicy::RootPrefix, Relativity::Preserve, "css/app.css")]
    #[case(VersioningPolicy::FilenameSplice, Relativity::Preserve, "css/app.abc.css")]
    fn test_versioner(#[case] policy: VersioningPolicy, #[case] relativity: Relativity, #[case] expected: &str) {
        let versioner = PathVersioner::new(policy, VersionToken::new("abc"));
        assert_eq!(versioner.version("css/app.css", relativity), expected);
    }

    #[test]
    fn test_versioner_inactive() {
        assert!(!PathVersioner::default().is_active());
        assert!(!PathVersioner::new(VersioningPolicy::RootPrefix, VersionToken::empty()).is_active());
        assert!(PathVersioner::new(VersioningPolicy::RootPrefix, VersionToken::new("a")).is_active());
    }
}

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::policy::{PathVersioner, Relativity};

// Matches `url(...)` with a double-quoted, single-quoted or bare argument.
// Exactly one of the three capture groups participates in a match.
static CSS_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^'"\s)][^)]*?))\s*\)"#).unwrap()
});
static SCHEME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").unwrap());

/// Maps one stylesheet URL to the URL that should be emitted instead.
pub trait UrlRewriter: Send + Sync {
    fn rewrite<'a>(&self, url: &'a str) -> Cow<'a, str>;
}

/// Emits every URL unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;
impl UrlRewriter for Passthrough {
    fn rewrite<'a>(&self, url: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(url)
    }
}

/// Versions stylesheet URLs with the same [`PathVersioner`] used for upload
/// keys. Relative URLs are left alone under the root-prefix policy, since they
/// resolve against the stylesheet's own (already versioned) location.
#[derive(Clone, Debug)]
pub struct VersionedUrls {
    versioner: PathVersioner,
}
impl VersionedUrls {
    pub fn new(versioner: PathVersioner) -> Self {
        Self { versioner }
    }
}
impl UrlRewriter for VersionedUrls {
    fn rewrite<'a>(&self, url: &'a str) -> Cow<'a, str> {
        let rewritten = self.versioner.version(url, Relativity::Preserve);
        if rewritten != url {
            tracing::info!(from = url, to = %rewritten, "Rewriting stylesheet URL");
        }
        rewritten
    }
}

fn is_external(url: &str) -> bool {
    url.is_empty() || url.starts_with("//") || url.starts_with('#') || SCHEME_REGEX.is_match(url)
}

/// Rewrites every local `url(...)` reference in a stylesheet.
///
/// Quoting and whitespace around each URL are preserved. Data URIs,
/// protocol-relative and absolute URLs, and fragment-only references are
/// never passed to the rewriter. Without a rewriter the input is returned as-is.
pub fn rewrite_stylesheet<'a>(css: &'a str, rewriter: Option<&dyn UrlRewriter>) -> Cow<'a, str> {
    let Some(rewriter) = rewriter else {
        return Cow::Borrowed(css);
    };
    CSS_URL_REGEX.replace_all(css, |caps: &Captures<'_>| {
        // Group 0 always participates.
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let Some(url) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            return whole.to_string();
        };
        if is_external(url.as_str()) {
            return whole.to_string();
        }
        let offset = caps.get(0).map_or(0, |m| m.start());
        let (start, end) = (url.start() - offset, url.end() - offset);
        format!("{}{}{}", &whole[..start], rewriter.rewrite(url.as_str()), &whole[end..])
    })
}

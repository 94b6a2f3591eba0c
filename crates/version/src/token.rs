use std::fmt;

/// Opaque per-run identifier embedded in asset paths.
///
/// An empty token means "no versioning": every path rewrite becomes the
/// identity. Surrounding whitespace is trimmed on construction, so a token
/// read from a file or a command's output compares equal to the bare value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VersionToken(String);
impl VersionToken {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(token.as_ref().trim().to_string())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl AsRef<str> for VersionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl From<&str> for VersionToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
impl From<String> for VersionToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

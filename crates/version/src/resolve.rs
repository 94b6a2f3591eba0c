use std::path::{Path, PathBuf};
use std::process::Command;

use crate::token::VersionToken;

/// Environment variable consulted for an explicit asset identifier.
pub const DEFAULT_ASSET_ID_VAR: &str = "RAILS_ASSET_ID";
/// Commit variables exported by common CI providers, in lookup order.
pub const DEFAULT_CI_VARS: [&str; 4] = ["GITHUB_SHA", "CI_COMMIT_SHA", "CIRCLE_SHA1", "GIT_COMMIT"];
/// Commit hashes are shortened to this many characters.
pub const SHORT_HASH_LEN: usize = 7;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;
type ScmLookup = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Determines the [`VersionToken`] for a run.
///
/// Sources are consulted in order, and the first non-empty value wins:
///
/// 1. an explicit override (command line or configuration),
/// 2. the asset identifier variable (`RAILS_ASSET_ID` unless changed),
/// 3. a CI commit variable, shortened to [`SHORT_HASH_LEN`] characters,
/// 4. `git rev-parse --short HEAD`, when a `git` executable is found.
///
/// When nothing yields a value the token is empty and versioning is disabled
/// for the run. Resolution never fails.
pub struct VersionResolver {
    override_token: Option<String>,
    asset_id_var: String,
    ci_vars: Vec<String>,
    env: EnvLookup,
    scm: Option<ScmLookup>,
}
impl VersionResolver {
    pub fn new() -> Self {
        Self {
            override_token: None,
            asset_id_var: DEFAULT_ASSET_ID_VAR.to_string(),
            ci_vars: DEFAULT_CI_VARS.iter().map(|v| v.to_string()).collect(),
            env: Box::new(|name| std::env::var(name).ok()),
            scm: Some(Box::new(|| git_short_hash(None))),
        }
    }

    /// Sets the explicit override. Setting the same value again is a no-op.
    pub fn with_override(mut self, token: Option<impl Into<String>>) -> Self {
        self.override_token = token.map(Into::into);
        self
    }

    pub fn with_asset_id_var(mut self, name: impl Into<String>) -> Self {
        self.asset_id_var = name.into();
        self
    }

    pub fn with_ci_vars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ci_vars = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the process environment with a custom lookup.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Replaces the source control lookup.
    pub fn with_scm(mut self, scm: impl Fn() -> Option<String> + Send + Sync + 'static) -> Self {
        self.scm = Some(Box::new(scm));
        self
    }

    /// Runs the `git` lookup inside `dir` rather than the working directory.
    pub fn with_scm_dir(self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.with_scm(move || git_short_hash(Some(&dir)))
    }

    pub fn without_scm(mut self) -> Self {
        self.scm = None;
        self
    }

    pub fn resolve(&self) -> VersionToken {
        if let Some(token) = self.override_token.as_deref().map(VersionToken::new).filter(|t| !t.is_empty()) {
            tracing::debug!(source = "override", %token, "Resolved asset version");
            return token;
        }
        if let Some(token) = self.from_env(&self.asset_id_var) {
            tracing::debug!(source = %self.asset_id_var, %token, "Resolved asset version");
            return token;
        }
        for name in &self.ci_vars {
            if let Some(token) = self.from_env(name) {
                let token = VersionToken::new(shorten(token.as_str()));
                tracing::debug!(source = %name, %token, "Resolved asset version");
                return token;
            }
        }
        if let Some(token) = self.scm.as_ref().and_then(|scm| scm()).map(VersionToken::new).filter(|t| !t.is_empty()) {
            tracing::debug!(source = "git", %token, "Resolved asset version");
            return token;
        }
        tracing::warn!("No asset version could be determined; versioning disabled");
        VersionToken::empty()
    }

    fn from_env(&self, name: &str) -> Option<VersionToken> {
        (self.env)(name).map(VersionToken::new).filter(|t| !t.is_empty())
    }
}
impl Default for VersionResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn shorten(hash: &str) -> &str {
    match hash.char_indices().nth(SHORT_HASH_LEN) {
        Some((end, _)) => &hash[..end],
        None => hash,
    }
}

/// Asks `git` for the abbreviated hash of `HEAD`.
///
/// Returns `None` when `git` is not installed, the directory is not a
/// repository, or the command produces no output.
pub fn git_short_hash(dir: Option<&Path>) -> Option<String> {
    let git = which::which("git").ok()?;
    let mut command = Command::new(git);
    command.args(["rev-parse", "--short", "HEAD"]);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    let output = command.output().ok().filter(|o| o.status.success())?;
    let hash = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!hash.is_empty()).then_some(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn resolver(vars: &[(&str, &str)]) -> VersionResolver {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        VersionResolver::new().with_env(move |name| vars.get(name).cloned()).without_scm()
    }

    #[test]
    fn test_override_wins() {
        let token = resolver(&[("RAILS_ASSET_ID", "env")]).with_override(Some("cli")).resolve();
        assert_eq!(token.as_str(), "cli");
    }

    #[test]
    fn test_blank_override_ignored() {
        let token = resolver(&[("RAILS_ASSET_ID", "env")]).with_override(Some("  ")).resolve();
        assert_eq!(token.as_str(), "env");
    }

    #[test]
    fn test_default_asset_id_variable() {
        assert_eq!(resolver(&[("RAILS_ASSET_ID", "r1")]).resolve().as_str(), "r1");
        assert!(resolver(&[("ASSET_ID", "r1")]).resolve().is_empty());
    }

    #[test]
    fn test_asset_id_before_ci() {
        let token = resolver(&[("RAILS_ASSET_ID", "build-42"), ("GITHUB_SHA", "0123456789abcdef")]).resolve();
        assert_eq!(token.as_str(), "build-42");
    }

    #[rstest]
    #[case("GITHUB_SHA", "0123456789abcdef", "0123456")]
    #[case("CI_COMMIT_SHA", "fedcba9876543210", "fedcba9")]
    #[case("GIT_COMMIT", "abc", "abc")]
    fn test_ci_variables_shortened(#[case] var: &str, #[case] value: &str, #[case] expected: &str) {
        assert_eq!(resolver(&[(var, value)]).resolve().as_str(), expected);
    }

    #[test]
    fn test_ci_variable_order() {
        let token = resolver(&[("GIT_COMMIT", "2222222222"), ("GITHUB_SHA", "1111111111")]).resolve();
        assert_eq!(token.as_str(), "1111111");
    }

    #[test]
    fn test_custom_variable_names() {
        let token = resolver(&[("RELEASE", "r9"), ("RAILS_ASSET_ID", "ignored")])
            .with_asset_id_var("RELEASE")
            .with_ci_vars(Vec::<String>::new())
            .resolve();
        assert_eq!(token.as_str(), "r9");
    }

    #[test]
    fn test_scm_fallback() {
        let token = resolver(&[]).with_scm(|| Some("a1b2c3d\n".to_string())).resolve();
        assert_eq!(token.as_str(), "a1b2c3d");
    }

    #[test]
    fn test_nothing_resolves_to_empty() {
        assert!(resolver(&[]).resolve().is_empty());
        assert!(resolver(&[]).with_scm(|| None).resolve().is_empty());
    }

    #[test]
    fn test_repeated_resolution_is_stable() {
        let resolver = resolver(&[("RAILS_ASSET_ID", "x")]);
        assert_eq!(resolver.resolve(), resolver.resolve());
    }
}

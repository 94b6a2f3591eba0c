use assetpush_cdn::InvalidationOutcome;
use assetpush_version::VersionToken;
use std::fmt;
use std::path::PathBuf;

/// Keys that replaced existing objects during a run, in completion order.
///
/// Only collected when invalidation is enabled; newly created keys never
/// appear here since no CDN can have cached them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet(Vec<String>);
impl ChangeSet {
    pub fn push(&mut self, key: impl Into<String>) {
        self.0.push(key.into());
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A file that could not be uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub key: String,
    /// Upload attempts made; zero when the file could not even be read.
    pub attempts: u32,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InvalidationStatus {
    /// Invalidation is disabled, or the run was cancelled before it.
    #[default]
    NotRequested,
    Completed(InvalidationOutcome),
    /// The request could not be sent.
    Failed(String),
}

/// Summary of one run.
#[derive(Clone, Debug, Default)]
pub struct SyncReport {
    pub version: VersionToken,
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedFile>,
    pub change_set: ChangeSet,
    pub invalidation: InvalidationStatus,
    pub cancelled: bool,
    /// Planned files never scheduled because the run was cancelled.
    pub not_attempted: usize,
}
impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} uploaded, {} skipped, {} failed",
            self.uploaded.len(),
            self.skipped.len(),
            self.failed.len()
        )?;
        if self.cancelled {
            write!(f, " (cancelled, {} not attempted)", self.not_attempted)?;
        }
        match &self.invalidation {
            InvalidationStatus::NotRequested => Ok(()),
            InvalidationStatus::Completed(outcome) => write!(f, "; {outcome}"),
            InvalidationStatus::Failed(reason) => write!(f, "; invalidation failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let report = SyncReport {
            uploaded: vec!["a.css".to_string(), "b.js".to_string()],
            skipped: vec!["c.png".to_string()],
            invalidation: InvalidationStatus::Completed(InvalidationOutcome::Accepted { paths: 1 }),
            ..Default::default()
        };
        assert_eq!(report.to_string(), "2 uploaded, 1 skipped, 0 failed; invalidation accepted for 1 path(s)");
        assert!(!report.has_failures());
    }

    #[test]
    fn test_summary_cancelled() {
        let report = SyncReport { cancelled: true, not_attempted: 4, ..Default::default() };
        assert_eq!(report.to_string(), "0 uploaded, 0 skipped, 0 failed (cancelled, 4 not attempted)");
    }
}

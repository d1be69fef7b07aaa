//! Status backends
//!
//! A backend knows how to determine the raw status of a path (and of its
//! subtree) for one version-control system. The cache calls it only from its
//! single worker thread, but the working-copy classifier also runs on caller
//! threads, hence `Send + Sync`.

pub mod git;

use crate::error::BackendError;
use crate::status::StatusValue;
use crate::types::is_under;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub use git::GitBackend;

/// Status records produced by one backend call
pub type StatusRecords = Vec<(PathBuf, StatusValue)>;

/// Source of raw version-control status
pub trait StatusBackend: Send + Sync + 'static {
    /// Whether `path` is a working copy or lies inside one
    ///
    /// Must be cheap: it runs synchronously on the caller's thread.
    fn is_versioned(&self, path: &Path) -> bool;

    /// Determine the status of `path`, and of every tracked path below it when
    /// `recurse` is set. Blocks for the duration of the check.
    fn check(&self, path: &Path, recurse: bool) -> Result<StatusRecords, BackendError>;

    /// Whether `path` should be summarized as a directory
    ///
    /// Runs on caller threads when a summary is requested.
    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    /// Short name used in logs
    fn name(&self) -> &str {
        "backend"
    }
}

/// Backend answering from an in-memory table of statuses
///
/// Useful for hosts that learn statuses from elsewhere and for exercising the
/// cache without a real working copy. Counts calls and can be told to fail for
/// chosen paths.
#[derive(Debug, Default)]
pub struct StaticBackend {
    roots: RwLock<Vec<PathBuf>>,
    statuses: RwLock<BTreeMap<PathBuf, StatusValue>>,
    failing: RwLock<HashSet<PathBuf>>,
    calls: AtomicUsize,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a working-copy root
    pub fn with_root(self, root: impl Into<PathBuf>) -> Self {
        self.roots.write().push(root.into());
        self
    }

    /// Record the status the backend reports for `path`
    pub fn with_status(self, path: impl Into<PathBuf>, status: StatusValue) -> Self {
        self.set_status(path, status);
        self
    }

    pub fn set_status(&self, path: impl Into<PathBuf>, status: StatusValue) {
        self.statuses.write().insert(path.into(), status);
    }

    pub fn remove_status(&self, path: &Path) {
        self.statuses.write().remove(path);
    }

    /// Make every check of `path` fail until [`StaticBackend::clear_failures`]
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        self.failing.write().insert(path.into());
    }

    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Number of `check` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatusBackend for StaticBackend {
    fn is_versioned(&self, path: &Path) -> bool {
        self.roots.read().iter().any(|root| is_under(root, path))
    }

    /// Directories on disk, plus any recorded path with recorded entries below it
    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
            || self
                .statuses
                .read()
                .keys()
                .any(|other| other.as_path() != path && is_under(path, other))
    }

    fn check(&self, path: &Path, recurse: bool) -> Result<StatusRecords, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.read().contains(path) {
            return Err(BackendError::CommandFailed {
                command: format!("status {}", path.display()),
                stderr: "scripted failure".to_string(),
            });
        }
        if !self.is_versioned(path) {
            return Err(BackendError::NotVersioned(path.to_path_buf()));
        }

        let statuses = self.statuses.read();
        let mut records: StatusRecords = if recurse {
            statuses
                .iter()
                .filter(|(other, _)| is_under(path, other))
                .map(|(other, status)| (other.clone(), *status))
                .collect()
        } else {
            statuses
                .get(path)
                .map(|status| vec![(path.to_path_buf(), *status)])
                .unwrap_or_default()
        };

        // Within a working copy, a path with no recorded change is clean.
        if !records.iter().any(|(other, _)| other == path) {
            records.insert(0, (path.to_path_buf(), StatusValue::Normal));
        }

        Ok(records)
    }

    fn name(&self) -> &str {
        "static"
    }
}

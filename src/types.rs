//! Core types shared by the store, worker and facade.

use crate::status::StatusValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Path -> status mapping, ordered so a subtree is a contiguous range
pub type StatusMap = BTreeMap<PathBuf, StatusValue>;

/// Whether `other` is `base` or lies below it
///
/// Containment is component-wise: `/repo/dir2` is not under `/repo/dir`.
pub fn is_under(base: &Path, other: &Path) -> bool {
    other.starts_with(base)
}

/// Flags of one status request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Include every cached path below the requested one
    pub recurse: bool,
    /// Bypass the cache and force a fresh backend check
    pub invalidate: bool,
    /// Wrap the answer as `({path: status}, aggregated)`
    pub summary: bool,
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn invalidate(mut self, invalidate: bool) -> Self {
        self.invalidate = invalidate;
        self
    }

    pub fn summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }
}

/// Answer to a status request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusResult {
    /// Status of the path, or of its whole subtree for recursive requests
    Statuses(StatusMap),
    /// Own status of the path and the status aggregated over its subtree
    Summary {
        path_status: StatusMap,
        summary: StatusValue,
    },
}

impl StatusResult {
    /// Status recorded for `path` itself, if present
    pub fn status_of(&self, path: &Path) -> Option<StatusValue> {
        match self {
            StatusResult::Statuses(map) => map.get(path).copied(),
            StatusResult::Summary { path_status, .. } => path_status.get(path).copied(),
        }
    }

    /// Aggregated status for summary results
    pub fn summary(&self) -> Option<StatusValue> {
        match self {
            StatusResult::Statuses(_) => None,
            StatusResult::Summary { summary, .. } => Some(*summary),
        }
    }

    /// Statuses carried by this result
    pub fn statuses(&self) -> &StatusMap {
        match self {
            StatusResult::Statuses(map) => map,
            StatusResult::Summary { path_status, .. } => path_status,
        }
    }

    /// True if any carried status is still the `calculating` placeholder
    pub fn is_placeholder(&self) -> bool {
        self.statuses().values().any(|s| !s.is_concrete())
            || self.summary().map(|s| !s.is_concrete()).unwrap_or(false)
    }
}

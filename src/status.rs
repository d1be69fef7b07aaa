//! Status values
//!
//! The version-control state of a single path, plus the interim and failure
//! values the cache hands out while a real status is unknown.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version-control status of one path
///
/// Declaration order follows the precedence list used by directory aggregation;
/// the derived `Ord` exists so statuses can live in ordered sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusValue {
    Normal,
    Unversioned,
    Ignored,
    Locked,
    ReadOnly,
    Added,
    Deleted,
    Replaced,
    Modified,
    Missing,
    Obstructed,
    Conflicted,
    /// Placeholder returned while the real status is computed in the background
    Calculating,
    /// Path is outside any working copy, or no status was ever recorded
    Unknown,
    /// Backend failed to determine the status
    Error,
}

impl StatusValue {
    /// Every status value, in precedence order
    pub const ALL: [StatusValue; 15] = [
        StatusValue::Normal,
        StatusValue::Unversioned,
        StatusValue::Ignored,
        StatusValue::Locked,
        StatusValue::ReadOnly,
        StatusValue::Added,
        StatusValue::Deleted,
        StatusValue::Replaced,
        StatusValue::Modified,
        StatusValue::Missing,
        StatusValue::Obstructed,
        StatusValue::Conflicted,
        StatusValue::Calculating,
        StatusValue::Unknown,
        StatusValue::Error,
    ];

    /// Statuses that make a parent directory count as modified
    pub const MODIFYING: [StatusValue; 5] = [
        StatusValue::Added,
        StatusValue::Deleted,
        StatusValue::Replaced,
        StatusValue::Modified,
        StatusValue::Missing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusValue::Normal => "normal",
            StatusValue::Unversioned => "unversioned",
            StatusValue::Ignored => "ignored",
            StatusValue::Locked => "locked",
            StatusValue::ReadOnly => "read_only",
            StatusValue::Added => "added",
            StatusValue::Deleted => "deleted",
            StatusValue::Replaced => "replaced",
            StatusValue::Modified => "modified",
            StatusValue::Missing => "missing",
            StatusValue::Obstructed => "obstructed",
            StatusValue::Conflicted => "conflicted",
            StatusValue::Calculating => "calculating",
            StatusValue::Unknown => "unknown",
            StatusValue::Error => "error",
        }
    }

    /// Whether this value is a concrete status rather than a placeholder
    pub fn is_concrete(&self) -> bool {
        !matches!(self, StatusValue::Calculating)
    }

    /// Whether this status counts as a modification for a parent directory
    pub fn is_modifying(&self) -> bool {
        Self::MODIFYING.contains(self)
    }

    /// Emblem icon name a file manager shows for this status
    ///
    /// Returns `None` for statuses that carry no emblem.
    pub fn emblem(&self) -> Option<&'static str> {
        match self {
            StatusValue::Added => Some("emblem-vcs-added"),
            StatusValue::Deleted => Some("emblem-vcs-deleted"),
            StatusValue::Modified => Some("emblem-vcs-modified"),
            StatusValue::Conflicted => Some("emblem-vcs-conflicted"),
            StatusValue::Normal => Some("emblem-vcs-normal"),
            StatusValue::Ignored => Some("emblem-vcs-ignored"),
            StatusValue::Locked => Some("emblem-vcs-locked"),
            StatusValue::ReadOnly => Some("emblem-vcs-read_only"),
            StatusValue::Obstructed => Some("emblem-vcs-obstructed"),
            _ => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusValue::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown status value: {}", s))
    }
}

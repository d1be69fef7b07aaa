//! Status aggregation
//!
//! Reduces the statuses of a subtree to the single status shown for its root.
//! Pure functions only; the store and worker call into these when building
//! summary results.

use crate::status::StatusValue;
use crate::types::{is_under, StatusMap, StatusResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Own statuses of a directory that outrank the statuses of its children
const OWN_PRECEDENCE: [StatusValue; 3] = [
    StatusValue::Added,
    StatusValue::Modified,
    StatusValue::Deleted,
];

/// Aggregate a set of statuses into one representative status
///
/// `own` is the status recorded for the path itself and `statuses` holds every
/// status found in its subtree (own status included). For a file the own status
/// is returned unchanged. For a directory the first matching rule wins:
/// conflicted, obstructed, own added/modified/deleted, any modifying child
/// (`modified`), then the own status. Missing data yields `unknown`.
pub fn aggregate(
    own: Option<StatusValue>,
    statuses: &BTreeSet<StatusValue>,
    is_directory: bool,
) -> StatusValue {
    if !is_directory {
        return own.unwrap_or(StatusValue::Unknown);
    }

    if statuses.is_empty() {
        return StatusValue::Unknown;
    }

    if statuses.contains(&StatusValue::Conflicted) {
        return StatusValue::Conflicted;
    }

    if statuses.contains(&StatusValue::Obstructed) {
        return StatusValue::Obstructed;
    }

    if let Some(own) = own {
        if OWN_PRECEDENCE.contains(&own) {
            return own;
        }
    }

    if statuses.iter().any(StatusValue::is_modifying) {
        return StatusValue::Modified;
    }

    own.unwrap_or(StatusValue::Unknown)
}

/// Whether `statuses` holds any entry strictly below `path`
pub fn has_descendants(path: &Path, statuses: &StatusMap) -> bool {
    statuses
        .keys()
        .any(|other| other.as_path() != path && is_under(path, other))
}

/// Aggregate the statuses under `path` found in `statuses`
pub fn summarize(path: &Path, statuses: &StatusMap, is_directory: bool) -> StatusValue {
    let own = statuses.get(path).copied();
    let subtree: BTreeSet<StatusValue> = statuses
        .iter()
        .filter(|(other, _)| is_under(path, other))
        .map(|(_, status)| *status)
        .collect();
    aggregate(own, &subtree, is_directory)
}

/// Build the `({path: own}, aggregated)` summary result for `path`
///
/// `is_directory` is the caller's knowledge of the path; a mapping carrying
/// entries below `path` also makes it a directory.
pub fn make_summary(path: &Path, statuses: &StatusMap, is_directory: bool) -> StatusResult {
    let is_directory = is_directory || has_descendants(path, statuses);
    let own = statuses.get(path).copied().unwrap_or(StatusValue::Unknown);

    let mut path_status = StatusMap::new();
    path_status.insert(PathBuf::from(path), own);

    StatusResult::Summary {
        path_status,
        summary: summarize(path, statuses, is_directory),
    }
}

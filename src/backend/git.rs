//! Git backend driven through the `git` command line.

use super::{StatusBackend, StatusRecords};
use crate::error::BackendError;
use crate::status::StatusValue;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Status backend for git working copies
#[derive(Debug, Clone)]
pub struct GitBackend {
    git_binary: String,
}

impl Default for GitBackend {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitBackend {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    /// Closest ancestor of `path` (itself included) that holds a `.git` entry
    pub fn find_repo_root(path: &Path) -> Option<PathBuf> {
        path.ancestors()
            .find(|candidate| candidate.join(".git").exists())
            .map(Path::to_path_buf)
    }

    /// Run `git <args> -- <pathspec>` in `root`
    fn run(&self, root: &Path, args: &[&str], pathspec: &OsStr) -> Result<Vec<u8>, BackendError> {
        let output = Command::new(&self.git_binary)
            .current_dir(root)
            .args(args)
            .arg("--")
            .arg(pathspec)
            .output()?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(BackendError::CommandFailed {
                command: format!(
                    "{} {} -- {}",
                    self.git_binary,
                    args.join(" "),
                    pathspec.to_string_lossy()
                ),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn list_tracked(&self, root: &Path, pathspec: &OsStr) -> Result<Vec<PathBuf>, BackendError> {
        let stdout = self.run(root, &["ls-files", "-z"], pathspec)?;
        Ok(split_nul(&stdout)
            .map(|relative| root.join(path_from_bytes(relative)))
            .collect())
    }

    fn list_changes(
        &self,
        root: &Path,
        pathspec: &OsStr,
    ) -> Result<Vec<(PathBuf, StatusValue)>, BackendError> {
        let stdout = self.run(
            root,
            &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
            pathspec,
        )?;
        parse_porcelain(&stdout).map(|changes| {
            changes
                .into_iter()
                .map(|(relative, status)| (root.join(relative), status))
                .collect()
        })
    }
}

impl StatusBackend for GitBackend {
    fn is_versioned(&self, path: &Path) -> bool {
        Self::find_repo_root(path).is_some()
    }

    fn check(&self, path: &Path, recurse: bool) -> Result<StatusRecords, BackendError> {
        let root =
            Self::find_repo_root(path).ok_or_else(|| BackendError::NotVersioned(path.to_path_buf()))?;
        let relative = path
            .strip_prefix(&root)
            .map_err(|_| BackendError::NotVersioned(path.to_path_buf()))?;
        let pathspec = if relative.as_os_str().is_empty() {
            OsStr::new(".")
        } else {
            relative.as_os_str()
        };

        let tracked = self.list_tracked(&root, pathspec)?;
        let changes = self.list_changes(&root, pathspec)?;
        debug!(
            path = %path.display(),
            tracked = tracked.len(),
            changes = changes.len(),
            "Collected git status"
        );

        let mut records: BTreeMap<PathBuf, StatusValue> = BTreeMap::new();

        for file in tracked {
            add_parents(&mut records, path, &file, StatusValue::Normal);
            records.insert(file, StatusValue::Normal);
        }

        for (file, status) in changes {
            let parent_status = if status == StatusValue::Unversioned {
                StatusValue::Unversioned
            } else {
                StatusValue::Normal
            };
            add_parents(&mut records, path, &file, parent_status);
            records.insert(file, status);
        }

        if !records.contains_key(path) {
            let own = if path.is_dir() {
                StatusValue::Normal
            } else if path.exists() {
                // Untracked files are all listed, so an unlisted file is ignored.
                StatusValue::Ignored
            } else {
                StatusValue::Unknown
            };
            records.insert(path.to_path_buf(), own);
        }

        if recurse {
            Ok(records.into_iter().collect())
        } else {
            Ok(records
                .remove_entry(path)
                .map(|record| vec![record])
                .unwrap_or_default())
        }
    }

    fn name(&self) -> &str {
        "git"
    }
}

/// Record every directory between `base` (inclusive) and `file` (exclusive)
fn add_parents(
    records: &mut BTreeMap<PathBuf, StatusValue>,
    base: &Path,
    file: &Path,
    status: StatusValue,
) {
    for parent in file.ancestors().skip(1) {
        if !parent.starts_with(base) {
            break;
        }
        records.entry(parent.to_path_buf()).or_insert(status);
    }
}

fn split_nul(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes.split(|b| *b == 0).filter(|chunk| !chunk.is_empty())
}

/// Path from raw git output; file names are arbitrary bytes on unix
#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Parse `git status --porcelain=v1 -z` output into relative paths and statuses
pub fn parse_porcelain(bytes: &[u8]) -> Result<Vec<(PathBuf, StatusValue)>, BackendError> {
    let mut records = Vec::new();
    let mut chunks = split_nul(bytes);

    while let Some(chunk) = chunks.next() {
        let (x, y, path) = match chunk {
            [x, y, b' ', path @ ..] if x.is_ascii() && y.is_ascii() => {
                (char::from(*x), char::from(*y), path)
            }
            _ => return Err(BackendError::Parse(String::from_utf8_lossy(chunk).into_owned())),
        };
        let path = path.strip_suffix(b"/").unwrap_or(path);

        // Renames and copies carry the source path as the following record.
        if x == 'R' || x == 'C' || y == 'R' || y == 'C' {
            chunks.next();
        }

        records.push((path_from_bytes(path), status_from_code(x, y)));
    }

    Ok(records)
}

/// Map a porcelain `XY` code to a status value
pub fn status_from_code(x: char, y: char) -> StatusValue {
    match (x, y) {
        ('?', '?') => StatusValue::Unversioned,
        ('!', '!') => StatusValue::Ignored,
        ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U') => {
            StatusValue::Conflicted
        }
        ('D', _) => StatusValue::Deleted,
        (_, 'D') => StatusValue::Missing,
        ('R', _) => StatusValue::Replaced,
        ('A', _) | ('C', _) => StatusValue::Added,
        ('M', _) | ('T', _) | (_, 'M') | (_, 'T') => StatusValue::Modified,
        _ => StatusValue::Normal,
    }
}

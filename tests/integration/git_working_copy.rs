use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use vcs_status_cache::config::CacheConfig;
use vcs_status_cache::{CheckOptions, GitBackend, StatusCache, StatusValue};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(root: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(root)
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
}

fn working_copy() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    git(root, &["init", "-q"]);
    git(root, &["config", "user.email", "test@example.com"]);
    git(root, &["config", "user.name", "Test"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/lib.rs"), "pub fn a() {}\n").unwrap();
    fs::write(root.join("README"), "readme\n").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial"]);
    temp
}

#[test]
fn modified_file_bubbles_up_to_working_copy_root() {
    if !git_available() {
        return;
    }
    let temp = working_copy();
    let root = dunce::canonicalize(temp.path()).unwrap();
    fs::write(root.join("src/lib.rs"), "pub fn b() {}\n").unwrap();

    let cache = StatusCache::spawn(Arc::new(GitBackend::default()), CacheConfig::default()).unwrap();
    let options = CheckOptions::new().recurse(true).summary(true);

    let response = cache.check_status(&root, options, None);
    assert_eq!(response.immediate.summary(), Some(StatusValue::Calculating));
    let result = response.resolve_blocking().unwrap();
    assert_eq!(result.summary(), Some(StatusValue::Modified));

    let statuses = cache.cached(&root, true).unwrap();
    assert_eq!(
        statuses.get(&root.join("src/lib.rs")),
        Some(&StatusValue::Modified)
    );
    assert_eq!(statuses.get(&root.join("README")), Some(&StatusValue::Normal));
    assert_eq!(statuses.get(&root.join("src")), Some(&StatusValue::Normal));
}

#[test]
fn path_outside_working_copy_is_unknown() {
    if !git_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let path = dunce::canonicalize(temp.path()).unwrap();
    if GitBackend::find_repo_root(&path).is_some() {
        return;
    }

    let cache = StatusCache::spawn(Arc::new(GitBackend::default()), CacheConfig::default()).unwrap();
    let response = cache.check_status(&path, CheckOptions::new(), None);
    assert!(response.is_ready());
    assert_eq!(response.immediate.status_of(&path), Some(StatusValue::Unknown));
}

#[test]
fn invalidating_check_picks_up_new_file() {
    if !git_available() {
        return;
    }
    let temp = working_copy();
    let root = dunce::canonicalize(temp.path()).unwrap();
    let cache = StatusCache::spawn(Arc::new(GitBackend::default()), CacheConfig::default()).unwrap();

    cache
        .check_status(&root, CheckOptions::new().recurse(true), None)
        .resolve_blocking()
        .unwrap();
    assert!(cache.cached(root.join("src/new.rs"), false).is_err());

    fs::write(root.join("src/new.rs"), "// new\n").unwrap();
    let refreshed = cache
        .check_status(
            root.join("src"),
            CheckOptions::new().recurse(true).invalidate(true),
            None,
        )
        .resolve_blocking()
        .unwrap();
    assert_eq!(
        refreshed.status_of(&root.join("src/new.rs")),
        Some(StatusValue::Unversioned)
    );
    assert_eq!(
        cache.cached(&root, false).unwrap().get(&root),
        Some(&StatusValue::Normal)
    );
}

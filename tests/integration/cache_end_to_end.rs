use std::path::{Path, PathBuf};
use std::sync::Arc;

use vcs_status_cache::config::CacheConfig;
use vcs_status_cache::{CheckOptions, StaticBackend, StatusCache, StatusValue};

use crate::support::{forwarding_callback, recv};

fn repo_backend() -> Arc<StaticBackend> {
    Arc::new(
        StaticBackend::new()
            .with_root("/repo")
            .with_status("/repo", StatusValue::Normal)
            .with_status("/repo/dir", StatusValue::Normal)
            .with_status("/repo/dir/clean.txt", StatusValue::Normal)
            .with_status("/repo/dir/changed.txt", StatusValue::Modified)
            .with_status("/repo/other", StatusValue::Normal),
    )
}

fn started(backend: Arc<StaticBackend>) -> StatusCache {
    StatusCache::spawn(backend, CacheConfig::default()).unwrap()
}

#[test]
fn recursive_miss_returns_placeholder_then_concrete_subtree() {
    let backend = repo_backend();
    let cache = started(Arc::clone(&backend));
    let (callback, rx) = forwarding_callback();

    let response = cache.check_status("/repo/dir", CheckOptions::new().recurse(true), Some(callback));
    assert!(response.immediate.is_placeholder());
    assert_eq!(
        response.immediate.status_of(Path::new("/repo/dir")),
        Some(StatusValue::Calculating)
    );

    let (path, delivered) = recv(&rx);
    assert_eq!(path, PathBuf::from("/repo/dir"));
    let statuses = delivered.statuses();
    assert_eq!(statuses.len(), 3);
    assert!(statuses.values().all(|status| status.is_concrete()));
    assert_eq!(
        statuses.get(Path::new("/repo/dir/changed.txt")),
        Some(&StatusValue::Modified)
    );

    let resolved = response.resolve_blocking().unwrap();
    assert_eq!(resolved, delivered);
}

#[test]
fn placeholder_and_eventual_value_differ() {
    let cache = started(repo_backend());
    let response = cache.check_status("/repo/dir/changed.txt", CheckOptions::new(), None);
    let immediate = response.immediate.clone();
    let eventual = response.resolve_blocking().unwrap();

    assert_ne!(immediate, eventual);
    assert_eq!(
        eventual.status_of(Path::new("/repo/dir/changed.txt")),
        Some(StatusValue::Modified)
    );
}

#[test]
fn cache_hit_never_reinvokes_backend() {
    let backend = repo_backend();
    let cache = started(Arc::clone(&backend));

    cache
        .check_status("/repo/dir", CheckOptions::new().recurse(true), None)
        .resolve_blocking()
        .unwrap();
    assert_eq!(backend.calls(), 1);

    for _ in 0..10 {
        let response = cache.check_status("/repo/dir", CheckOptions::new().recurse(true), None);
        assert!(response.is_ready());
        assert_eq!(response.immediate.statuses().len(), 3);
    }
    let file = cache.check_status("/repo/dir/clean.txt", CheckOptions::new(), None);
    assert!(file.is_ready());
    assert_eq!(
        file.immediate.status_of(Path::new("/repo/dir/clean.txt")),
        Some(StatusValue::Normal)
    );

    assert_eq!(backend.calls(), 1);
    assert_eq!(cache.stats().queue.enqueued, 1);
}

#[test]
fn directory_with_modified_child_summarizes_to_modified() {
    let cache = started(repo_backend());
    let options = CheckOptions::new().recurse(true).summary(true);

    let response = cache.check_status("/repo/dir", options, None);
    assert_eq!(response.immediate.summary(), Some(StatusValue::Calculating));

    let result = response.resolve_blocking().unwrap();
    assert_eq!(result.summary(), Some(StatusValue::Modified));
    assert_eq!(
        result.status_of(Path::new("/repo/dir")),
        Some(StatusValue::Normal)
    );
    assert_eq!(result.statuses().len(), 1);

    // Served from the cache now, still aggregated.
    let again = cache.check_status("/repo/dir", options, None);
    assert!(again.is_ready());
    assert_eq!(again.immediate.summary(), Some(StatusValue::Modified));
}

#[test]
fn non_recursive_summary_treats_directory_as_directory() {
    let backend = repo_backend();
    backend.set_status("/repo/dir", StatusValue::Replaced);
    let cache = started(backend);

    let result = cache
        .check_status("/repo/dir", CheckOptions::new().summary(true), None)
        .resolve_blocking()
        .unwrap();
    assert_eq!(
        result.status_of(Path::new("/repo/dir")),
        Some(StatusValue::Replaced)
    );
    assert_eq!(result.summary(), Some(StatusValue::Modified));

    let file = cache
        .check_status("/repo/other", CheckOptions::new().summary(true), None)
        .resolve_blocking()
        .unwrap();
    assert_eq!(file.summary(), Some(StatusValue::Normal));
}

#[test]
fn unversioned_location_answers_unknown_without_work() {
    let backend = repo_backend();
    let cache = started(Arc::clone(&backend));

    let response = cache.check_status("/tmp/unrelated", CheckOptions::new().recurse(true), None);
    assert!(response.is_ready());
    assert_eq!(
        response.immediate.status_of(Path::new("/tmp/unrelated")),
        Some(StatusValue::Unknown)
    );

    let stats = cache.stats();
    assert_eq!(stats.queue.enqueued, 0);
    assert_eq!(stats.store.entries, 0);
    assert_eq!(backend.calls(), 0);
}

#[test]
fn backend_error_is_reported_and_worker_keeps_serving() {
    let backend = repo_backend();
    backend.fail_on("/repo/dir");
    let cache = started(Arc::clone(&backend));

    let failed = cache
        .check_status("/repo/dir", CheckOptions::new(), None)
        .resolve_blocking()
        .unwrap();
    assert_eq!(
        failed.status_of(Path::new("/repo/dir")),
        Some(StatusValue::Error)
    );

    let served = cache
        .check_status("/repo/other", CheckOptions::new(), None)
        .resolve_blocking()
        .unwrap();
    assert_eq!(
        served.status_of(Path::new("/repo/other")),
        Some(StatusValue::Normal)
    );

    let stats = cache.stats();
    assert_eq!(stats.queue.backend_failures, 1);
    assert!(stats.running);

    // The error is cached until the path is invalidated.
    backend.clear_failures();
    let cached = cache.check_status("/repo/dir", CheckOptions::new(), None);
    assert!(cached.is_ready());
    assert_eq!(
        cached.immediate.status_of(Path::new("/repo/dir")),
        Some(StatusValue::Error)
    );
}

#[test]
fn requests_before_start_are_served_after_start() {
    let cache = StatusCache::new(repo_backend(), CacheConfig::default());
    let (callback, rx) = forwarding_callback();

    let first = cache.check_status("/repo/dir/changed.txt", CheckOptions::new(), Some(callback));
    let second = cache.check_status("/repo/other", CheckOptions::new(), None);
    assert!(!cache.is_running());
    assert_eq!(cache.stats().queue.pending, 2);

    cache.start().unwrap();
    let (_, delivered) = recv(&rx);
    assert_eq!(
        delivered.status_of(Path::new("/repo/dir/changed.txt")),
        Some(StatusValue::Modified)
    );
    assert_eq!(first.resolve_blocking().unwrap(), delivered);
    assert!(second.resolve_blocking().is_ok());
}

#[test]
fn path_modified_refreshes_cached_status() {
    let backend = repo_backend();
    let cache = started(Arc::clone(&backend));

    cache
        .check_status("/repo/dir", CheckOptions::new().recurse(true), None)
        .resolve_blocking()
        .unwrap();

    backend.set_status("/repo/dir/clean.txt", StatusValue::Deleted);
    backend.remove_status(Path::new("/repo/dir/changed.txt"));
    cache.path_modified("/repo/dir/clean.txt");
    cache.path_modified("/repo/dir/changed.txt");

    // The queue is FIFO, so once a later request resolves both refreshes are done.
    cache
        .check_status("/repo/other", CheckOptions::new(), None)
        .resolve_blocking()
        .unwrap();

    let statuses = cache.cached("/repo/dir", true).unwrap();
    assert_eq!(
        statuses.get(Path::new("/repo/dir/clean.txt")),
        Some(&StatusValue::Deleted)
    );
    // A file the backend no longer reports is clean again.
    assert_eq!(
        statuses.get(Path::new("/repo/dir/changed.txt")),
        Some(&StatusValue::Normal)
    );
    assert_eq!(backend.calls(), 4);
}

#[test]
fn invalidating_request_bypasses_cache() {
    let backend = repo_backend();
    let cache = started(Arc::clone(&backend));

    cache
        .check_status("/repo/other", CheckOptions::new(), None)
        .resolve_blocking()
        .unwrap();
    backend.set_status("/repo/other", StatusValue::Conflicted);

    let response = cache.check_status("/repo/other", CheckOptions::new().invalidate(true), None);
    assert!(!response.is_ready());
    let refreshed = response.resolve_blocking().unwrap();
    assert_eq!(
        refreshed.status_of(Path::new("/repo/other")),
        Some(StatusValue::Conflicted)
    );
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn pending_status_resolves_in_async_context() {
    let cache = started(repo_backend());
    let response = cache.check_status("/repo/dir", CheckOptions::new().recurse(true), None);
    let result = response.resolve().await.unwrap();
    assert_eq!(result.statuses().len(), 3);
}

use std::sync::Arc;
use std::thread;

use vcs_status_cache::config::CacheConfig;
use vcs_status_cache::{CacheError, CheckOptions, StaticBackend, StatusCache, StatusValue};

use crate::support::{GatedBackend, WAIT};

#[test]
fn shutdown_lets_inflight_check_finish_and_drops_queued_requests() {
    let (backend, gate) = GatedBackend::new();
    let cache = Arc::new(StatusCache::spawn(Arc::new(backend), CacheConfig::default()).unwrap());

    let inflight = cache.check_status("/repo/a", CheckOptions::new(), None);
    let entered = gate.entered.recv_timeout(WAIT).unwrap();
    assert_eq!(entered.to_str(), Some("/repo/a"));

    let queued_b = cache.check_status("/repo/b", CheckOptions::new(), None);
    let queued_c = cache.check_status("/repo/c", CheckOptions::new().recurse(true), None);

    let stopper = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || cache.shutdown())
    };
    while cache.is_running() {
        thread::yield_now();
    }
    gate.release.send(()).unwrap();
    stopper.join().unwrap();

    let finished = inflight.resolve_blocking().unwrap();
    assert_eq!(
        finished.status_of(std::path::Path::new("/repo/a")),
        Some(StatusValue::Normal)
    );
    assert!(matches!(
        queued_b.resolve_blocking(),
        Err(CacheError::WorkerStopped)
    ));
    assert!(matches!(
        queued_c.resolve_blocking(),
        Err(CacheError::WorkerStopped)
    ));
}

#[test]
fn requests_after_shutdown_return_placeholder_and_stopped_handle() {
    let backend = Arc::new(StaticBackend::new().with_root("/repo"));
    let cache = StatusCache::spawn(backend, CacheConfig::default()).unwrap();
    cache.shutdown();
    assert!(!cache.is_running());

    let response = cache.check_status("/repo/late", CheckOptions::new(), None);
    assert!(response.immediate.is_placeholder());
    assert!(matches!(
        response.resolve_blocking(),
        Err(CacheError::WorkerStopped)
    ));
}

#[test]
fn shutdown_is_idempotent_and_idle_worker_wakes() {
    let backend = Arc::new(StaticBackend::new().with_root("/repo"));
    let cache = StatusCache::spawn(backend, CacheConfig::default()).unwrap();
    cache.shutdown();
    cache.shutdown();
    assert!(!cache.is_running());
}

#[test]
fn dropping_unstarted_cache_resolves_pending_handles() {
    let backend = Arc::new(StaticBackend::new().with_root("/repo"));
    let cache = StatusCache::new(backend, CacheConfig::default());
    let response = cache.check_status("/repo/never", CheckOptions::new(), None);
    drop(cache);
    assert!(matches!(
        response.resolve_blocking(),
        Err(CacheError::WorkerStopped)
    ));
}

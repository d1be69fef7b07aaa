use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use vcs_status_cache::backend::StatusRecords;
use vcs_status_cache::{BackendError, StatusBackend, StatusResult, StatusValue};

pub const WAIT: Duration = Duration::from_secs(10);

pub type Delivery = (PathBuf, StatusResult);

/// Callback that forwards its answer to the returned receiver
pub fn forwarding_callback() -> (vcs_status_cache::StatusCallback, Receiver<Delivery>) {
    let (tx, rx) = mpsc::channel();
    let callback: vcs_status_cache::StatusCallback = Box::new(move |path: &Path, result: &StatusResult| {
        let _ = tx.send((path.to_path_buf(), result.clone()));
    });
    (callback, rx)
}

pub fn recv(rx: &Receiver<Delivery>) -> Delivery {
    match rx.recv_timeout(WAIT) {
        Ok(delivery) => delivery,
        Err(RecvTimeoutError::Timeout) => panic!("callback was not invoked in time"),
        Err(RecvTimeoutError::Disconnected) => panic!("callback dropped without being invoked"),
    }
}

/// Backend whose checks block until released, one release per check
pub struct GatedBackend {
    entered: Mutex<Sender<PathBuf>>,
    release: Mutex<Receiver<()>>,
}

pub struct Gate {
    pub entered: Receiver<PathBuf>,
    pub release: Sender<()>,
}

impl GatedBackend {
    pub fn new() -> (Self, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        (
            Self {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            },
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }
}

impl StatusBackend for GatedBackend {
    fn is_versioned(&self, path: &Path) -> bool {
        path.starts_with("/repo")
    }

    fn check(&self, path: &Path, _recurse: bool) -> Result<StatusRecords, BackendError> {
        let _ = self.entered.lock().send(path.to_path_buf());
        self.release
            .lock()
            .recv()
            .map_err(|_| BackendError::Io("gate closed".to_string()))?;
        Ok(vec![(path.to_path_buf(), StatusValue::Normal)])
    }

    fn name(&self) -> &str {
        "gated"
    }
}

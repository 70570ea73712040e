//! Cooperative cancellation for in-flight turns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// One-shot cooperative stop signal for a running turn.
///
/// Requesting an abort is sticky: every clone observes it, and waiters are
/// woken. The turn runner checks the signal between stream elements; it
/// never preempts in-flight external work.
#[derive(Clone, Default)]
pub struct AbortHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_abort(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolves once an abort has been requested. The flag is re-checked
    /// around each wait so a request landing before the waiter registers is
    /// never lost.
    pub async fn triggered(&self) {
        loop {
            if self.is_requested() {
                return;
            }
            self.notify.notified().await;
        }
    }
}

/// Maps each actively-running session to its live abort handle.
///
/// At most one entry per session id at any time; the coordinator's
/// exclusivity guard makes a replacing `register` structurally unreachable.
#[derive(Default)]
pub struct CancelRegistry {
    active: Mutex<HashMap<String, AbortHandle>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: &str, handle: AbortHandle) {
        let mut guard = self.active.lock().expect("abort registry mutex");
        guard.insert(id.to_string(), handle);
    }

    pub fn clear(&self, id: &str) {
        let mut guard = self.active.lock().expect("abort registry mutex");
        guard.remove(id);
    }

    /// Signals and removes the handle for `id`, reporting whether one was
    /// registered. A session with no active turn is a safe no-op.
    pub fn cancel(&self, id: &str) -> bool {
        let handle = {
            let mut guard = self.active.lock().expect("abort registry mutex");
            guard.remove(id)
        };
        match handle {
            Some(handle) => {
                handle.request_abort();
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, id: &str) -> bool {
        let guard = self.active.lock().expect("abort registry mutex");
        guard.contains_key(id)
    }
}

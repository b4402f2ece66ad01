//! Process-wide registry of live sessions: a mutex-guarded vector, appended
//! to on creation and pruned on teardown. No long operation ever holds the
//! lock — appends and removals are both O(n) retains on a small vector.

use std::sync::{Arc, Mutex};

use crate::session::SessionHandle;

/// The exchange layer's view onto every session currently alive, used to
/// fan block arrivals out to every session that might want them.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<Vec<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    pub(crate) fn register(&self, handle: SessionHandle) {
        self.sessions.lock().unwrap().push(handle);
    }

    pub(crate) fn deregister(&self, id: u64) {
        self.sessions.lock().unwrap().retain(|h| h.id() != id);
    }

    /// Snapshot of every currently-registered session handle, in no
    /// particular order. Cheap to call often: each handle is just a
    /// cluster of channel senders.
    pub fn sessions(&self) -> Vec<SessionHandle> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

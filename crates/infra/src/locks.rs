//! Per-location serialization of capacity-affecting work.
//!
//! Every sequence that checks free space or stock at a warehouse and then mutates lots
//! or the capacity counter runs inside `with_location`, so two allocations against the
//! same warehouse can no longer both pass the check before either commits. Locations
//! are independent; services never hold two location locks at once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

#[derive(Debug, Default)]
pub struct LocationLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LocationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, location: &str) -> Arc<Mutex<()>> {
        let mut map = recover(self.locks.lock(), "location lock table");
        map.entry(location.to_string()).or_default().clone()
    }

    /// Run `f` while holding the lock for `location`.
    ///
    /// Not reentrant: `f` must not call back into `with_location` for the same key.
    pub fn with_location<T>(&self, location: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(location);
        let _guard = recover(handle.lock(), location);
        f()
    }

    pub fn tracked_locations(&self) -> usize {
        recover(self.locks.lock(), "location lock table").len()
    }
}

/// A panic inside a critical section leaves the data behind the lock untouched (the
/// guarded value is `()`), so the lock is safe to reuse.
fn recover<'a, T>(
    result: Result<MutexGuard<'a, T>, std::sync::PoisonError<MutexGuard<'a, T>>>,
    what: &str,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(|poisoned| {
        warn!(lock = what, "recovered poisoned lock");
        poisoned.into_inner()
    })
}

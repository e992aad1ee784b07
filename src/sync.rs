//! Mutex-guarded shared counter.

use std::sync::{Mutex, PoisonError};

/// Integer counter safe for arbitrarily many concurrent callers. The guard
/// scope is exactly the read-modify-write; nothing that can block is ever
/// done while it is held.
#[derive(Debug, Default)]
pub struct SharedCounter {
    count: Mutex<u64>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically add one.
    pub fn increment(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
    }

    /// Current total: always the number of fully completed increments at the
    /// instant of the read, never a torn value.
    pub fn value(&self) -> u64 {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

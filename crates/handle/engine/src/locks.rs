//! Per-handle serialization of mutations
//!
//! Every mutation resolves, decides and applies in three steps against the
//! identifier service. Two mutations of the same handle must not interleave
//! between those steps, so each one runs while holding its handle's guard.

use dashmap::DashMap;
use handle_types::HandleName;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<HandleName, Arc<Mutex<()>>>;

/// Table of per-handle mutexes. Entries exist only while someone holds or
/// waits for them.
#[derive(Debug, Clone, Default)]
pub struct HandleLocks {
    table: Arc<LockTable>,
}

impl HandleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other mutation of `handle` is running.
    pub async fn lock(&self, handle: &HandleName) -> HandleGuard {
        let mutex = self
            .table
            .entry(handle.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let guard = mutex.lock_owned().await;
        HandleGuard {
            handle: handle.clone(),
            guard: Some(guard),
            table: Arc::clone(&self.table),
        }
    }

    /// Number of handles currently locked or waited on
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Exclusive access to one handle, released on drop
#[derive(Debug)]
pub struct HandleGuard {
    handle: HandleName,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<LockTable>,
}

impl HandleGuard {
    pub fn handle(&self) -> &HandleName {
        &self.handle
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        // Release first so the strong count only counts the table and waiters.
        drop(self.guard.take());
        self.table
            .remove_if(&self.handle, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

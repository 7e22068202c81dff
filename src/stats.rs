//! Shared batch counters.
//!
//! Workers record every terminal outcome; monitors read a copied
//! snapshot, so readers never hold the lock for longer than the copy.

use parking_lot::RwLock;

use crate::manifest::ResponseRecord;

#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    completed: u64,
    failed: u64,
    retries: u64,
}

/// Point-in-time view of a batch's progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Requests with a terminal record, success or failure.
    pub completed: u64,
    /// Requests whose record carries `status == 0`.
    pub failed: u64,
    /// Sum of `retry_count` across all records.
    pub retries: u64,
}

/// Counters shared between workers and observers.
#[derive(Debug, Default)]
pub struct BatchStats {
    inner: RwLock<Counters>,
}

impl BatchStats {
    pub(crate) fn observe(&self, record: &ResponseRecord) {
        let mut counters = self.inner.write();
        counters.completed += 1;
        if record.status == 0 {
            counters.failed += 1;
        }
        counters.retries += u64::from(record.retry_count);
    }

    /// Copy out the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = *self.inner.read();
        StatsSnapshot {
            completed: counters.completed,
            failed: counters.failed,
            retries: counters.retries,
        }
    }
}

//! Lock-per-destination registry
//!
//! Flushes are serialized per destination, not per unit: writers sharing a
//! destination take turns, writers with different destinations never wait
//! on each other. Locks are created on first use and kept for the lifetime
//! of the registry; the process-wide instance lives as long as the process.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use super::{sink_key, SharedSink};

static GLOBAL: LazyLock<Arc<OutputLocks>> = LazyLock::new(|| Arc::new(OutputLocks::new()));

#[derive(Debug, Default)]
pub struct OutputLocks {
    locks: Mutex<HashMap<usize, Arc<Mutex<()>>>>,
}

impl OutputLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every writer that was not given its own
    pub fn global() -> Arc<OutputLocks> {
        Arc::clone(&GLOBAL)
    }

    /// Returns the lock guarding `sink`, creating it on first use
    pub fn lock_for(&self, sink: &SharedSink) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(sink_key(sink)).or_default())
    }

    /// Number of destinations seen so far
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

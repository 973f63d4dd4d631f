//! Resource classification for open descriptors.
//!
//! A descriptor is classified once, when the creating call returns:
//! open/openat/creat mark it `Disk`, socket marks it `Net`. Read/write-family
//! returns consult the table to route latency and byte accounting. There is
//! no removal: entries outlive the descriptor, and a later creating call that
//! reuses the number simply overwrites the old entry (last writer wins).
//! Descriptor numbers are only unique while open, so staleness across reuse
//! is expected and accepted.

use crate::domain::ResourceClass;
use std::collections::HashMap;
use std::sync::Mutex;

/// Shared descriptor-to-class table.
///
/// Writers are logically partitioned by descriptor number; the mutex only
/// ever sees real contention under descriptor reuse, which resolves as
/// last-writer-wins.
#[derive(Debug, Default)]
pub struct FdClassifier {
    table: Mutex<HashMap<u64, ResourceClass>>,
}

impl FdClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the class of a newly created descriptor.
    pub fn register(&self, fd: u64, class: ResourceClass) {
        if let Ok(mut table) = self.table.lock() {
            table.insert(fd, class);
        }
    }

    /// Class of a descriptor, `ResourceClass::None` if never registered.
    #[must_use]
    pub fn classify(&self, fd: u64) -> ResourceClass {
        self.table
            .lock()
            .map(|table| table.get(&fd).copied().unwrap_or_default())
            .unwrap_or_default()
    }
}

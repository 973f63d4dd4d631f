//! Session lifecycle
//!
//! Tracks the set of traced processes whose root frame has not yet returned.
//! The run loop shuts the engine down once this set empties after having
//! been non-empty at least once - an orderly completion signal, not a
//! process halt from inside the aggregator.

use crate::domain::ProcessId;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct SessionTracker {
    live: HashSet<ProcessId>,
    seen_any: bool,
}

impl SessionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A process produced its first event.
    pub fn track(&mut self, process: ProcessId) {
        self.live.insert(process);
        self.seen_any = true;
    }

    /// A process returned from its root frame. Returns whether it was live.
    pub fn retire(&mut self, process: ProcessId) -> bool {
        self.live.remove(&process)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// True once every tracked process has retired. False while nothing has
    /// been tracked yet, so an idle engine keeps waiting instead of exiting
    /// before the first event.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.seen_any && self.live.is_empty()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

//! Core domain types
//!
//! Newtypes keep the probe-derived integers from being mixed up across the
//! engine: packed process identities, call-site hashes and depth counters
//! all travel as distinct types instead of bare `u64`s.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Composite identity of a traced thread: `(process_group << 32) | thread`,
/// exactly as packed by the instrumentation backend.
///
/// This is the unit of aggregation and display - one trace per `ProcessId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ProcessId(pub u64);

impl ProcessId {
    /// The process-group half, shown in the `PID` output column.
    #[must_use]
    pub fn pid(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The thread half.
    #[must_use]
    pub fn tid(self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        {
            self.0 as u32
        }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pid(), self.tid())
    }
}

/// Direction of a probe fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Enter,
    Return,
}

/// Call depth with its direction tag.
///
/// Replaces the wire-era trick of packing a direction bit into the top of a
/// depth counter: the pair is constructed once at the correlation boundary
/// and stays type-checked from there on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallDepth {
    pub direction: Direction,
    /// Nesting level relative to the outermost tracked frame. Level 0 means
    /// "outside any tracked call" and is discarded by the aggregator.
    pub level: u32,
}

impl CallDepth {
    #[must_use]
    pub fn is_return(self) -> bool {
        self.direction == Direction::Return
    }
}

/// Which kind of instrumentation point produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallKind {
    #[default]
    Syscall,
    Function,
}

/// Classification of an open descriptor, used to route latency and byte
/// accounting. Only meaningful for I/O-performing syscalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceClass {
    #[default]
    None,
    Disk,
    Net,
}

/// Identity of an instrumented user-function call site.
///
/// Derived as the order-insensitive (wrapping-sum) combination of the three
/// field hashes, so an entry and its return land on the same key however the
/// probe arguments were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteId(pub u64);

impl CallSiteId {
    #[must_use]
    pub fn of(class: &str, method: &str, file: &str) -> Self {
        Self(hash_field(class)
            .wrapping_add(hash_field(method))
            .wrapping_add(hash_field(file)))
    }
}

fn hash_field(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

//! Correlated call events
//!
//! [`CallEvent`] is what the correlator hands to the aggregator: one probe
//! notification with its latency computed, its descriptor class resolved and
//! its depth/direction tagged. Immutable once constructed.

use crate::domain::{CallDepth, CallKind, ProcessId, ResourceClass};
use std::net::Ipv4Addr;

/// One correlated probe notification.
///
/// Syscall events are emitted once, at the call's return, already carrying
/// their latency. Function events are emitted at both entry (latency 0) and
/// return; a return whose entry was never observed still arrives, with
/// latency 0.
#[derive(Debug, Clone, Default)]
pub struct CallEvent {
    pub process: ProcessId,
    pub depth: CallDepth,
    pub kind: CallKind,
    /// Disk or network, when the touched descriptor was classified.
    pub class: ResourceClass,
    /// Descriptor written to, 0 when not applicable.
    pub write_fd: u64,
    /// Descriptor read from, 0 when not applicable.
    pub read_fd: u64,
    /// Descriptor created by this call, 0 when not applicable.
    pub returned_fd: u64,
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Destination captured on connect/bind.
    pub peer_addr: Option<Ipv4Addr>,
    /// Empty for syscalls and class-less functions.
    pub class_name: String,
    /// The syscall name for syscall events.
    pub method_name: String,
    /// Empty for syscalls.
    pub source_file: String,
    /// Elapsed time of this frame; 0 for entries and unmatched returns.
    pub latency_ns: u64,
}

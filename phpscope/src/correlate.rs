//! Call-site correlation
//!
//! Pairs enter/return probe fires into [`CallEvent`]s. Two protocols share
//! one pattern - park on entry, match on return, drop if unmatched:
//!
//! - **Syscalls**: entry parks a start timestamp keyed by thread identity;
//!   read/write-family and connect/bind entries additionally stash the
//!   descriptor (and peer address) to be attached to the matching return,
//!   once the byte count is known. One event is emitted per syscall, at its
//!   return.
//! - **User functions**: entry parks a start timestamp keyed by call-site
//!   identity and emits an entry event; return removes it, computes latency
//!   and emits a return event. A return with no parked entry still yields an
//!   event with zero latency, so no return line is ever lost.
//!
//! Correlation state lives in mutex-guarded maps keyed by value types
//! (thread identity, call-site hash). Entries whose return never arrives are
//! parked until the engine exits; sessions are short-lived and interactive,
//! so no eviction is attempted.

use crate::classify::FdClassifier;
use crate::domain::{CallDepth, CallKind, CallSiteId, Direction, ProcessId, ResourceClass};
use crate::trace_data::CallEvent;
use log::warn;
use phpscope_common::{field_text, ProbePoint, ProbeRecord, DIRECTION_RETURN};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

/// Matches enter/return notification pairs and produces correlated events.
#[derive(Debug, Default)]
pub struct Correlator {
    classifier: FdClassifier,
    /// Syscall start timestamps, keyed by thread identity.
    syscall_start: Mutex<HashMap<ProcessId, u64>>,
    /// Function start timestamps, keyed by call-site identity.
    function_start: Mutex<HashMap<CallSiteId, u64>>,
    /// Descriptor captured at entry, awaiting the matching return.
    fd_stash: Mutex<HashMap<ProcessId, u64>>,
    /// Peer address captured at connect/bind entry.
    addr_stash: Mutex<HashMap<ProcessId, u32>>,
    /// Reconstructed user-function depth per thread. Never underflows.
    depth: Mutex<HashMap<ProcessId, u32>>,
}

impl Correlator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The descriptor table this correlator feeds and consults.
    #[must_use]
    pub fn classifier(&self) -> &FdClassifier {
        &self.classifier
    }

    /// Turn one raw notification into a correlated event.
    ///
    /// Returns `None` for fires that produce no event on their own: syscall
    /// entries (they only park state) and unknown probe ids.
    pub fn correlate(&self, record: &ProbeRecord) -> Option<CallEvent> {
        let Some(point) = ProbePoint::from_raw(record.probe) else {
            warn!("skipping unknown probe point id {}", record.probe);
            return None;
        };

        let process = ProcessId(record.pid_tgid);
        let is_return = record.direction == DIRECTION_RETURN;

        match point {
            ProbePoint::Function => Some(self.correlate_function(process, record, is_return)),
            _ => self.correlate_syscall(process, point, record, is_return),
        }
    }

    fn correlate_function(
        &self,
        process: ProcessId,
        record: &ProbeRecord,
        is_return: bool,
    ) -> CallEvent {
        let class_name = decode(&record.class_name);
        let method_name = decode(&record.method_name);
        let source_file = decode(&record.source_file);
        let site = CallSiteId::of(&class_name, &method_name, &source_file);

        let (direction, level, latency_ns) = if is_return {
            // Report the frame at its current level, then pop it.
            let level = self.current_depth(process);
            self.pop_frame(process);
            let latency_ns = self
                .function_start
                .lock()
                .ok()
                .and_then(|mut parked| parked.remove(&site))
                .map_or(0, |start| record.timestamp_ns.saturating_sub(start));
            (Direction::Return, level, latency_ns)
        } else {
            let level = self.push_frame(process);
            if let Ok(mut parked) = self.function_start.lock() {
                parked.insert(site, record.timestamp_ns);
            }
            (Direction::Enter, level, 0)
        };

        CallEvent {
            process,
            depth: CallDepth { direction, level },
            kind: CallKind::Function,
            class_name,
            method_name,
            source_file,
            latency_ns,
            ..CallEvent::default()
        }
    }

    fn correlate_syscall(
        &self,
        process: ProcessId,
        point: ProbePoint,
        record: &ProbeRecord,
        is_return: bool,
    ) -> Option<CallEvent> {
        if !is_return {
            if let Ok(mut parked) = self.syscall_start.lock() {
                parked.insert(process, record.timestamp_ns);
            }
            match point {
                ProbePoint::Read
                | ProbePoint::Write
                | ProbePoint::Sendto
                | ProbePoint::Sendmsg => self.stash_fd(process, record.fd),
                ProbePoint::Connect | ProbePoint::Bind => {
                    if record.addr != 0 {
                        if let Ok(mut parked) = self.addr_stash.lock() {
                            parked.insert(process, record.addr);
                        }
                    }
                    self.stash_fd(process, record.fd);
                }
                _ => {}
            }
            return None;
        }

        let latency_ns = self
            .syscall_start
            .lock()
            .ok()
            .and_then(|mut parked| parked.remove(&process))
            .map_or(0, |start| record.timestamp_ns.saturating_sub(start));

        let mut event = CallEvent {
            process,
            // Syscall frames are reported once, as the call completes, at
            // whatever depth the enclosing function stack currently reads.
            depth: CallDepth { direction: Direction::Return, level: self.current_depth(process) },
            kind: CallKind::Syscall,
            method_name: point.name().to_owned(),
            latency_ns,
            ..CallEvent::default()
        };

        match point {
            ProbePoint::Read => {
                event.bytes_read = byte_count(record.ret);
                if let Some(fd) = self.take_fd(process) {
                    event.read_fd = fd;
                    event.class = self.classifier.classify(fd);
                }
            }
            ProbePoint::Write | ProbePoint::Sendto | ProbePoint::Sendmsg => {
                event.bytes_written = byte_count(record.ret);
                if let Some(fd) = self.take_fd(process) {
                    event.write_fd = fd;
                    event.class = self.classifier.classify(fd);
                }
            }
            ProbePoint::Open | ProbePoint::Openat | ProbePoint::Creat => {
                if let Ok(fd) = u64::try_from(record.ret) {
                    self.classifier.register(fd, ResourceClass::Disk);
                    event.returned_fd = fd;
                }
            }
            ProbePoint::Socket => {
                if let Ok(fd) = u64::try_from(record.ret) {
                    self.classifier.register(fd, ResourceClass::Net);
                    event.returned_fd = fd;
                }
            }
            ProbePoint::Connect | ProbePoint::Bind => {
                if let Some(raw) = self.take_addr(process) {
                    event.peer_addr = Some(Ipv4Addr::from(u32::from_be(raw)));
                }
                if let Some(fd) = self.take_fd(process) {
                    event.write_fd = fd;
                }
            }
            _ => {}
        }

        Some(event)
    }

    // Depth bookkeeping. One counter per thread, clamped at zero.

    fn push_frame(&self, process: ProcessId) -> u32 {
        let Ok(mut depths) = self.depth.lock() else { return 1 };
        let level = depths.entry(process).or_insert(0);
        *level += 1;
        *level
    }

    fn pop_frame(&self, process: ProcessId) {
        if let Ok(mut depths) = self.depth.lock() {
            if let Some(level) = depths.get_mut(&process) {
                *level = level.saturating_sub(1);
            }
        }
    }

    fn current_depth(&self, process: ProcessId) -> u32 {
        self.depth
            .lock()
            .ok()
            .and_then(|depths| depths.get(&process).copied())
            .unwrap_or(0)
    }

    fn stash_fd(&self, process: ProcessId, fd: u64) {
        if let Ok(mut parked) = self.fd_stash.lock() {
            parked.insert(process, fd);
        }
    }

    fn take_fd(&self, process: ProcessId) -> Option<u64> {
        self.fd_stash.lock().ok().and_then(|mut parked| parked.remove(&process))
    }

    fn take_addr(&self, process: ProcessId) -> Option<u32> {
        self.addr_stash.lock().ok().and_then(|mut parked| parked.remove(&process))
    }
}

/// Successful I/O returns carry the byte count; failures carry a negative
/// errno and count as zero bytes moved.
fn byte_count(ret: i64) -> u64 {
    u64::try_from(ret).unwrap_or(0)
}

/// Bounded text field to owned string, invalid UTF-8 replaced, never fatal.
fn decode(field: &[u8]) -> String {
    String::from_utf8_lossy(field_text(field)).into_owned()
}

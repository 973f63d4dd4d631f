//! Event aggregation
//!
//! The sole stateful consumer of correlated events. One [`ProcessState`] per
//! traced process holds running syscall totals and the buffered lines
//! awaiting flush. Syscall cost nests under the function that issued it: the
//! totals surface as summary lines on the enclosing function's return, and
//! individual syscall lines only appear when the operator asked for them.
//!
//! Output is flushed after every function event - that is the unit of
//! user-visible granularity - and additionally after each syscall line when
//! syscall detail is enabled.

use crate::domain::{CallKind, ProcessId, ResourceClass};
use crate::render;
use crate::session::SessionTracker;
use crate::trace_data::CallEvent;
use std::collections::HashMap;
use std::io::{self, Write};

/// The designated entry-point marker: a depth-1 return of this method closes
/// the process's trace.
pub const ROOT_METHOD: &str = "main";

/// What the run loop needs to know after consuming one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// The process returned from its root frame; its state is gone.
    TraceClosed(ProcessId),
}

/// Running totals and buffered output for one traced process.
///
/// Totals are reset on every traced function return, so they always read
/// "since the last function return", not process-lifetime cumulative.
#[derive(Debug, Default)]
pub struct ProcessState {
    total_syscall_ns: u64,
    net_ns: u64,
    disk_ns: u64,
    net_bytes_written: u64,
    net_bytes_read: u64,
    disk_bytes_written: u64,
    disk_bytes_read: u64,
    buffer: String,
}

impl ProcessState {
    fn record_syscall(&mut self, event: &CallEvent) {
        self.total_syscall_ns += event.latency_ns;
        match event.class {
            ResourceClass::Net => {
                self.net_ns += event.latency_ns;
                if event.bytes_written > 0 {
                    self.net_bytes_written += event.bytes_written;
                } else if event.bytes_read > 0 {
                    self.net_bytes_read += event.bytes_read;
                }
            }
            ResourceClass::Disk => {
                self.disk_ns += event.latency_ns;
                if event.bytes_written > 0 {
                    self.disk_bytes_written += event.bytes_written;
                } else if event.bytes_read > 0 {
                    self.disk_bytes_read += event.bytes_read;
                }
            }
            ResourceClass::None => {}
        }
    }

    /// Buffer up to three summary lines for the returning frame, then zero
    /// the totals. Skipped entirely when nothing accumulated, which makes a
    /// second consecutive return report nothing extra.
    fn buffer_summary(&mut self, event: &CallEvent) {
        let pid = event.process.pid();
        let depth = event.depth.level;
        if self.total_syscall_ns > 0 {
            self.push_line(&render::line(
                pid,
                self.total_syscall_ns,
                "traced syscalls total latency",
                depth,
            ));
        }
        if self.net_ns > 0 {
            let message = format!(
                "sys time spent on the network |-> {} bytes written, {} bytes read",
                self.net_bytes_written, self.net_bytes_read
            );
            self.push_line(&render::line(pid, self.net_ns, &message, depth));
        }
        if self.disk_ns > 0 {
            let message = format!(
                "sys time spent on the disk |-> {} bytes written, {} bytes read",
                self.disk_bytes_written, self.disk_bytes_read
            );
            self.push_line(&render::line(pid, self.disk_ns, &message, depth));
        }
        self.reset_totals();
    }

    fn reset_totals(&mut self) {
        self.total_syscall_ns = 0;
        self.net_ns = 0;
        self.disk_ns = 0;
        self.net_bytes_written = 0;
        self.net_bytes_read = 0;
        self.disk_bytes_written = 0;
        self.disk_bytes_read = 0;
    }

    fn push_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }
}

/// Consumes correlated events one at a time, updating per-process state and
/// writing flushed trace lines to `out`.
pub struct Aggregator<W: Write> {
    processes: HashMap<ProcessId, ProcessState>,
    syscall_detail: bool,
    out: W,
}

impl<W: Write> Aggregator<W> {
    pub fn new(syscall_detail: bool, out: W) -> Self {
        Self { processes: HashMap::new(), syscall_detail, out }
    }

    /// Number of processes with live state.
    #[must_use]
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Recover the output sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Consume one event. New processes are registered with the session
    /// tracker; a root-frame return retires them and reports `TraceClosed`.
    ///
    /// # Errors
    ///
    /// Only when the output sink fails; the engine state itself never errors.
    pub fn consume(
        &mut self,
        session: &mut SessionTracker,
        event: &CallEvent,
    ) -> io::Result<Outcome> {
        // Depth 0 is outside any tracked call and carries no trace meaning.
        if event.depth.level == 0 {
            return Ok(Outcome::Continue);
        }

        if !self.processes.contains_key(&event.process) {
            session.track(event.process);
        }
        let state = self.processes.entry(event.process).or_default();

        match event.kind {
            CallKind::Syscall => {
                state.record_syscall(event);
                if self.syscall_detail {
                    state.push_line(&render::line(
                        event.process.pid(),
                        event.latency_ns,
                        &render::syscall_message(event),
                        event.depth.level,
                    ));
                    let text = std::mem::take(&mut state.buffer);
                    self.out.write_all(text.as_bytes())?;
                    self.out.flush()?;
                }
                Ok(Outcome::Continue)
            }
            CallKind::Function => {
                if event.depth.is_return() {
                    state.buffer_summary(event);
                }
                state.push_line(&render::line(
                    event.process.pid(),
                    event.latency_ns,
                    &render::function_message(event),
                    event.depth.level,
                ));

                let text = std::mem::take(&mut state.buffer);
                self.out.write_all(text.as_bytes())?;
                self.out.flush()?;

                if event.depth.is_return()
                    && event.depth.level == 1
                    && event.method_name == ROOT_METHOD
                {
                    self.processes.remove(&event.process);
                    session.retire(event.process);
                    return Ok(Outcome::TraceClosed(event.process));
                }
                Ok(Outcome::Continue)
            }
        }
    }
}

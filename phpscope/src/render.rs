//! Trace line rendering
//!
//! Pure formatting of one correlated event plus its depth into one display
//! line. Fixed-width columns for the process id and the latency (a `-`
//! placeholder when zero or unknown), then the message indented two spaces
//! per nesting level below the root.

use crate::domain::Direction;
use crate::trace_data::CallEvent;
use std::fmt::Write as _;

/// One indent step per nesting level.
const PADDING: &str = "  ";

/// Column header matching [`line`]'s layout.
#[must_use]
pub fn header() -> String {
    format!("{:<6} {:<10} {}", "PID", "LAT", "METHOD")
}

/// Render one display line.
#[must_use]
pub fn line(pid: u32, latency_ns: u64, message: &str, depth: u32) -> String {
    let latency = if latency_ns > 0 { latency_ns.to_string() } else { "-".to_owned() };
    let indent = PADDING.repeat(depth.saturating_sub(1) as usize);
    format!("{pid:<6} {latency:<10} {indent}{message}")
}

/// Message for a completed syscall: the call name plus whatever descriptors
/// and destination it touched.
#[must_use]
pub fn syscall_message(event: &CallEvent) -> String {
    let mut message = format!("sys.{}", event.method_name);
    if event.write_fd > 0 {
        let _ = write!(message, " write on fd: {}", event.write_fd);
    }
    if event.read_fd > 0 {
        let _ = write!(message, " read fd: {}", event.read_fd);
    }
    if event.returned_fd > 0 {
        let _ = write!(message, " return fd: {}", event.returned_fd);
    }
    if let Some(addr) = event.peer_addr {
        // Shown unresolved; name lookup is someone else's concern.
        let _ = write!(message, " connect to: {addr}");
    }
    message
}

/// Message for a user-function entry or return.
#[must_use]
pub fn function_message(event: &CallEvent) -> String {
    let marker = match event.depth.direction {
        Direction::Enter => "->",
        Direction::Return => "<-",
    };
    if event.class_name.is_empty() {
        format!("{marker} {} from {}", event.method_name, event.source_file)
    } else {
        format!("{marker} {}.{} from {}", event.class_name, event.method_name, event.source_file)
    }
}

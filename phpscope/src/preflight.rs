//! Pre-attach sanity checks

use log::warn;
use std::path::Path;

/// Verify `/proc/<pid>` exists before consuming events for it.
///
/// Attachment itself is the instrumentation backend's job; a missing process
/// here usually means the operator passed a stale PID, so it is worth a
/// warning but never fatal.
pub fn check_process_exists(pid: u32) -> bool {
    let exists = Path::new(&format!("/proc/{pid}")).exists();
    if !exists {
        warn!("process {pid} not found in /proc; was it already gone?");
    }
    exists
}

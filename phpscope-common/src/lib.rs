//! # Shared Data Structures (probe backend ↔ engine)
//!
//! Defines the wire encoding of a probe-fire notification shared between the
//! instrumentation backend (which registers the PHP USDT probes and syscall
//! tracepoints on the traced process) and the userspace engine. The backend
//! delivers one [`ProbeRecord`] per probe fire as plain bytes; `#[repr(C)]`
//! keeps the layout identical on both sides of that boundary.
//!
//! ## Key Types
//!
//! - [`ProbeRecord`] - one probe-fire notification
//! - [`ProbePoint`] - which instrumented location fired
//! - [`DIRECTION_ENTER`] / [`DIRECTION_RETURN`] - direction of the fire

#![no_std]

// ============================================================================
// Direction Constants
// ============================================================================

/// The traced program entered the instrumented operation.
pub const DIRECTION_ENTER: u32 = 0;

/// The traced program returned from the instrumented operation.
pub const DIRECTION_RETURN: u32 = 1;

/// Fixed bound of the three text fields carried for user-function probes.
///
/// The backend truncates whatever it reads from the interpreter to this
/// length; oversized names lose their tail, never more.
pub const TEXT_FIELD_LEN: usize = 80;

// ============================================================================
// Probe Points
// ============================================================================

/// An instrumented location in the traced process.
///
/// `Function` is the interpreter's user-function entry/return USDT pair; the
/// rest are the traced syscall tracepoints. Discriminants are the on-wire
/// `probe` field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProbePoint {
    Function = 0,
    Socket = 1,
    Socketpair = 2,
    Bind = 3,
    Listen = 4,
    Accept = 5,
    Accept4 = 6,
    Connect = 7,
    Getsockname = 8,
    Getpeername = 9,
    Sendto = 10,
    Recvfrom = 11,
    Setsockopt = 12,
    Getsockopt = 13,
    Shutdown = 14,
    Sendmsg = 15,
    Sendmmsg = 16,
    Recvmsg = 17,
    Recvmmsg = 18,
    Read = 19,
    Write = 20,
    Open = 21,
    Openat = 22,
    Creat = 23,
    Close = 24,
    Sendfile64 = 25,
}

impl ProbePoint {
    /// Decode an on-wire probe id. Unknown ids come from a backend newer
    /// than this engine; callers skip them rather than fail.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Function,
            1 => Self::Socket,
            2 => Self::Socketpair,
            3 => Self::Bind,
            4 => Self::Listen,
            5 => Self::Accept,
            6 => Self::Accept4,
            7 => Self::Connect,
            8 => Self::Getsockname,
            9 => Self::Getpeername,
            10 => Self::Sendto,
            11 => Self::Recvfrom,
            12 => Self::Setsockopt,
            13 => Self::Getsockopt,
            14 => Self::Shutdown,
            15 => Self::Sendmsg,
            16 => Self::Sendmmsg,
            17 => Self::Recvmsg,
            18 => Self::Recvmmsg,
            19 => Self::Read,
            20 => Self::Write,
            21 => Self::Open,
            22 => Self::Openat,
            23 => Self::Creat,
            24 => Self::Close,
            25 => Self::Sendfile64,
            _ => return None,
        })
    }

    /// Display name of the instrumented call.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Socket => "socket",
            Self::Socketpair => "socketpair",
            Self::Bind => "bind",
            Self::Listen => "listen",
            Self::Accept => "accept",
            Self::Accept4 => "accept4",
            Self::Connect => "connect",
            Self::Getsockname => "getsockname",
            Self::Getpeername => "getpeername",
            Self::Sendto => "sendto",
            Self::Recvfrom => "recvfrom",
            Self::Setsockopt => "setsockopt",
            Self::Getsockopt => "getsockopt",
            Self::Shutdown => "shutdown",
            Self::Sendmsg => "sendmsg",
            Self::Sendmmsg => "sendmmsg",
            Self::Recvmsg => "recvmsg",
            Self::Recvmmsg => "recvmmsg",
            Self::Read => "read",
            Self::Write => "write",
            Self::Open => "open",
            Self::Openat => "openat",
            Self::Creat => "creat",
            Self::Close => "close",
            Self::Sendfile64 => "sendfile64",
        }
    }
}

// ============================================================================
// Wire Record
// ============================================================================

/// One probe-fire notification, as laid out on the wire.
///
/// The backend fills what it observed at the probe site; fields that do not
/// apply to a given probe are zero. Timestamps come from the backend's
/// monotonic clock; all correlation (latency, descriptor class, depth
/// tagging) happens engine-side.
///
/// **Memory Layout**: `#[repr(C)]`, fixed size, no pointers - safe to move
/// across the process boundary as plain bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ProbeRecord {
    /// Packed thread identity: `(process_group << 32) | thread`.
    pub pid_tgid: u64,

    /// Monotonic nanoseconds at the probe fire.
    pub timestamp_ns: u64,

    /// Which instrumented location fired (see [`ProbePoint::from_raw`]).
    pub probe: u32,

    /// [`DIRECTION_ENTER`] or [`DIRECTION_RETURN`].
    pub direction: u32,

    /// Descriptor argument observed at entry (read/write family, connect,
    /// bind). Zero when not applicable.
    pub fd: u64,

    /// Raw return value observed at exit: a byte count for I/O calls, the
    /// created descriptor for open/socket. Negative on failure.
    pub ret: i64,

    /// Raw IPv4 address (network byte order) captured at connect/bind
    /// entry. Zero when not applicable.
    pub addr: u32,

    /// Padding for 8-byte alignment.
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,

    /// Class name, NUL-padded. Function probes only.
    pub class_name: [u8; TEXT_FIELD_LEN],

    /// Method name, NUL-padded. Function probes only.
    pub method_name: [u8; TEXT_FIELD_LEN],

    /// Source file of the call site, NUL-padded. Function probes only.
    pub source_file: [u8; TEXT_FIELD_LEN],
}

impl ProbeRecord {
    /// An all-zero record, the starting point for backends (and tests)
    /// filling in only the fields a probe site observes.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            pid_tgid: 0,
            timestamp_ns: 0,
            probe: 0,
            direction: 0,
            fd: 0,
            ret: 0,
            addr: 0,
            _padding: 0,
            class_name: [0; TEXT_FIELD_LEN],
            method_name: [0; TEXT_FIELD_LEN],
            source_file: [0; TEXT_FIELD_LEN],
        }
    }
}

impl Default for ProbeRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// The meaningful prefix of a NUL-padded text field.
#[must_use]
pub fn field_text(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

#[cfg(feature = "user")]
use aya::Pod;

// Required for plain-bytes transport out of the backend's maps.
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for ProbeRecord {}

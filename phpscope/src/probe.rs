//! Probe record stream boundary
//!
//! The instrumentation backend registers the probes on the traced process
//! and delivers one fixed-size [`ProbeRecord`] per fire over a byte stream
//! (stdin or a file/FIFO), in per-thread order, entry before the matching
//! return. This module owns the engine side of that contract: size-checked
//! parsing and a blocking reader thread that forwards records into the
//! consumer channel, so the run loop can block on `recv` instead of polling.

use crate::domain::EngineError;
use log::warn;
use phpscope_common::ProbeRecord;
use std::io::{self, Read};
use std::thread::JoinHandle;
use tokio::sync::mpsc::Sender;

/// On-wire size of one record.
pub const RECORD_SIZE: usize = std::mem::size_of::<ProbeRecord>();

/// Parses fixed-size probe records off a byte stream.
pub struct RecordReader<R: Read> {
    inner: R,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next record. `Ok(None)` on a clean end of stream; a stream
    /// that ends mid-record is reported as truncated.
    ///
    /// # Errors
    ///
    /// [`EngineError::TruncatedRecord`] on a partial trailing record, or the
    /// underlying I/O error.
    pub fn next_record(&mut self) -> Result<Option<ProbeRecord>, EngineError> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    if filled == 0 {
                        return Ok(None);
                    }
                    return Err(EngineError::TruncatedRecord { got: filled, expected: RECORD_SIZE });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        // SAFETY: the buffer is exactly one ProbeRecord long and the backend
        // writes the record as plain bytes (it is Pod on the other side).
        #[allow(unsafe_code)]
        let record = unsafe { std::ptr::read_unaligned(buf.as_ptr().cast::<ProbeRecord>()) };
        Ok(Some(record))
    }
}

/// Forward records from a blocking reader into the engine channel.
///
/// The thread ends on clean EOF, on a stream error (logged, never fatal to
/// the engine), or once the consumer goes away. It is deliberately detached
/// by callers that stop first: a reader blocked on an open pipe has nothing
/// left to tell us.
pub fn spawn_reader<R>(reader: R, tx: Sender<ProbeRecord>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut reader = RecordReader::new(reader);
        loop {
            match reader.next_record() {
                Ok(Some(record)) => {
                    if tx.blocking_send(record).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("probe stream ended: {e}");
                    break;
                }
            }
        }
    })
}

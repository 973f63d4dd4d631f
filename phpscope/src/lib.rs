//! # phpscope - Live PHP Call-Trace Correlation Engine
//!
//! phpscope reconstructs nested call traces for a running PHP process by
//! correlating paired enter/return notifications fired at two kinds of
//! instrumentation points: syscall tracepoints and the interpreter's
//! user-function USDT probes. Each call frame is attributed its elapsed
//! latency and the network/disk bytes it moved, without modifying or
//! restarting the traced process.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Instrumentation Backend                    │
//! │     (USDT probes + syscall tracepoints, external)           │
//! └───────────────────────┬─────────────────────────────────────┘
//!                         │ ProbeRecord stream (plain bytes)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  phpscope (This Crate)                      │
//! │                                                             │
//! │  ┌──────────┐   ┌────────────┐   ┌────────────┐             │
//! │  │  probe   │──▶│ correlate  │──▶│ aggregate  │──▶ stdout   │
//! │  │ (reader) │   │ (+classify)│   │ (+render)  │             │
//! │  └──────────┘   └────────────┘   └─────┬──────┘             │
//! │                                        │                    │
//! │                                  ┌─────▼──────┐             │
//! │                                  │  session   │             │
//! │                                  │ (lifetime) │             │
//! │                                  └────────────┘             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`probe`]: the backend boundary - parses fixed-size probe records off a
//!   byte stream and forwards them to the consumer channel
//! - [`correlate`]: pairs enter/return fires per call-site, computes
//!   latency, carries captured descriptors and peer addresses forward
//! - [`classify`]: descriptor-to-resource-class table (disk vs network)
//! - [`aggregate`]: the single stateful consumer - per-process totals,
//!   buffered trace lines, flush and trace-completion decisions
//! - [`render`]: pure formatting of one event into one display line
//! - [`session`]: the set of still-live traced processes; empties once the
//!   last root frame returns
//! - [`domain`]: core domain types (`ProcessId`, `CallDepth`, errors)
//! - [`cli`]: command-line argument parsing
//!
//! ## Ordering Model
//!
//! The backend delivers notifications from one thread in the order they were
//! generated, with no cross-thread guarantee. Everything downstream of the
//! correlator runs as a single sequential consumer, so per-process,
//! per-depth ordering is preserved exactly as received.

pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod correlate;
pub mod domain;
pub mod preflight;
pub mod probe;
pub mod render;
pub mod session;
pub mod trace_data;

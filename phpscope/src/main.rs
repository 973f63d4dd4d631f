//! # phpscope - Main Entry Point
//!
//! Wires the pipeline together: probe record stream (stdin or `--input`) →
//! reader thread → bounded channel → correlator → aggregator → stdout. The
//! consumer blocks on the channel and exits on Ctrl-C, on end of stream, or
//! once the last traced process returns from its root frame.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::collections::HashSet;
use std::fs::File;
use std::io;
use tokio::sync::mpsc;

use phpscope::aggregate::{Aggregator, Outcome};
use phpscope::cli::Args;
use phpscope::correlate::Correlator;
use phpscope::domain::ProcessId;
use phpscope::preflight::check_process_exists;
use phpscope::probe::spawn_reader;
use phpscope::render;
use phpscope::session::SessionTracker;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_ERROR
        }
    });
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();

    for pid in &args.pids {
        check_process_exists(*pid);
    }
    let traced: HashSet<u32> = args.pids.iter().copied().collect();

    let (tx, mut rx) = mpsc::channel(1024);
    let _reader = match args.input {
        Some(ref path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open record stream {}", path.display()))?;
            spawn_reader(file, tx)
        }
        None => spawn_reader(io::stdin(), tx),
    };

    if !args.quiet {
        println!(
            "phpscope v{}, tracing pids {:?}... Ctrl-C to quit.",
            env!("CARGO_PKG_VERSION"),
            args.pids
        );
    }
    println!("{}", render::header());

    let correlator = Correlator::new();
    let mut aggregator = Aggregator::new(args.syscalls, io::stdout().lock());
    let mut session = SessionTracker::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut records: u64 = 0;
    let mut filtered: u64 = 0;
    let mut exit_reason = "record stream closed";

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(record) = received else { break };
                records += 1;

                // The backend may multiplex several traced processes; keep
                // only the ones the operator asked for.
                if !traced.contains(&ProcessId(record.pid_tgid).pid()) {
                    filtered += 1;
                    continue;
                }

                if let Some(event) = correlator.correlate(&record) {
                    if let Outcome::TraceClosed(process) =
                        aggregator.consume(&mut session, &event)?
                    {
                        info!("trace complete for process {process}");
                        if session.is_complete() {
                            exit_reason = "all traces complete";
                            break;
                        }
                    }
                }
            }
            _ = &mut ctrl_c => {
                exit_reason = "interrupted";
                break;
            }
        }
    }

    if !args.quiet {
        eprintln!(
            "\n{exit_reason}: {records} records ({filtered} outside traced pids), {} trace(s) still open",
            session.live_count()
        );
    }

    // The reader thread is detached on purpose: closing `rx` makes it stop
    // at its next send, and one blocked on an open pipe has nothing more to
    // deliver anyway.
    Ok(())
}

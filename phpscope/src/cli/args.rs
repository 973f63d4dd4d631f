//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "phpscope",
    about = "Reconstruct nested call traces of a running PHP process, with per-frame latency and I/O volume",
    after_help = "\
EXAMPLES:
    php-probe-backend 1234 | phpscope 1234            Trace one process
    php-probe-backend 1234 5678 | phpscope 1234 5678  Trace several
    phpscope -S --input records.bin 1234              Replay with syscall detail"
)]
pub struct Args {
    /// Process IDs to trace (records for other processes are dropped)
    #[arg(value_name = "PID", required = true, num_args = 1..)]
    pub pids: Vec<u32>,

    /// Print per-syscall detail lines inside each function frame
    #[arg(short = 'S', long = "syscalls")]
    pub syscalls: bool,

    /// Probe record stream to consume instead of stdin
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_multiple_pids() {
        let args = Args::parse_from(["phpscope", "-S", "1234", "5678"]);
        assert_eq!(args.pids, vec![1234, 5678]);
        assert!(args.syscalls);
        assert!(args.input.is_none());
    }

    #[test]
    fn requires_at_least_one_pid() {
        assert!(Args::try_parse_from(["phpscope"]).is_err());
    }
}

//! End-to-end pipeline tests: serialized probe records in, trace lines out.

use phpscope::aggregate::{Aggregator, Outcome};
use phpscope::correlate::Correlator;
use phpscope::probe::{RecordReader, RECORD_SIZE};
use phpscope::session::SessionTracker;
use phpscope_common::{
    ProbePoint, ProbeRecord, DIRECTION_ENTER, DIRECTION_RETURN, TEXT_FIELD_LEN,
};
use std::io::Write as _;

const PID: u64 = 12345;
const PROC: u64 = (PID << 32) | (PID + 1);

#[allow(unsafe_code)]
fn record_bytes(record: &ProbeRecord) -> Vec<u8> {
    let ptr = std::ptr::from_ref(record).cast::<u8>();
    // SAFETY: ProbeRecord is repr(C) plain data of RECORD_SIZE bytes.
    unsafe { std::slice::from_raw_parts(ptr, RECORD_SIZE) }.to_vec()
}

fn syscall(point: ProbePoint, direction: u32, timestamp_ns: u64) -> ProbeRecord {
    ProbeRecord {
        pid_tgid: PROC,
        timestamp_ns,
        probe: point as u32,
        direction,
        ..ProbeRecord::zeroed()
    }
}

fn function(direction: u32, timestamp_ns: u64, class: &str, method: &str, file: &str) -> ProbeRecord {
    let mut record = ProbeRecord {
        pid_tgid: PROC,
        timestamp_ns,
        probe: ProbePoint::Function as u32,
        direction,
        ..ProbeRecord::zeroed()
    };
    fill(&mut record.class_name, class);
    fill(&mut record.method_name, method);
    fill(&mut record.source_file, file);
    record
}

fn fill(field: &mut [u8; TEXT_FIELD_LEN], text: &str) {
    field[..text.len()].copy_from_slice(text.as_bytes());
}

/// Run serialized records through reader → correlator → aggregator.
fn run_pipeline(stream: &[u8], syscall_detail: bool) -> (String, Vec<Outcome>) {
    let mut reader = RecordReader::new(stream);
    let correlator = Correlator::new();
    let mut aggregator = Aggregator::new(syscall_detail, Vec::new());
    let mut session = SessionTracker::new();

    let mut outcomes = Vec::new();
    while let Some(record) = reader.next_record().expect("well-formed stream") {
        if let Some(event) = correlator.correlate(&record) {
            outcomes.push(aggregator.consume(&mut session, &event).expect("write to vec"));
        }
    }
    (String::from_utf8(aggregator.into_inner()).unwrap(), outcomes)
}

/// The disk-read scenario: one traced frame wrapping an openat + read pair
/// yields a disk summary and the return line, then closes the root trace.
#[test]
fn disk_read_inside_handled_frame() {
    let mut stream = Vec::new();
    for record in [
        function(DIRECTION_ENTER, 1_000, "App", "main", "index.php"),
        {
            let mut r = syscall(ProbePoint::Openat, DIRECTION_ENTER, 1_100);
            r.fd = 0;
            r
        },
        {
            let mut r = syscall(ProbePoint::Openat, DIRECTION_RETURN, 1_300);
            r.ret = 5;
            r
        },
        {
            let mut r = syscall(ProbePoint::Read, DIRECTION_ENTER, 2_000);
            r.fd = 5;
            r
        },
        {
            let mut r = syscall(ProbePoint::Read, DIRECTION_RETURN, 2_600);
            r.ret = 128;
            r
        },
        function(DIRECTION_RETURN, 9_000, "App", "main", "index.php"),
    ] {
        stream.extend(record_bytes(&record));
    }

    let (output, outcomes) = run_pipeline(&stream, false);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 4, "unexpected output:\n{output}");
    assert_eq!(lines[0], "12345  -          -> App.main from index.php");
    // openat (200ns) + read (600ns)
    assert!(lines[1].starts_with("12345  800 "));
    assert!(lines[1].ends_with("traced syscalls total latency"));
    assert!(lines[2].starts_with("12345  600 "));
    assert!(lines[2].ends_with("sys time spent on the disk |-> 0 bytes written, 128 bytes read"));
    assert_eq!(lines[3], "12345  8000       <- App.main from index.php");

    // Root frame returned: trace closed exactly once.
    assert_eq!(outcomes.last(), Some(&Outcome::TraceClosed(phpscope::domain::ProcessId(PROC))));
}

/// The connect scenario: the address captured at entry is attached to the
/// return, with latency equal to the gap between the two notifications.
#[test]
fn connect_reports_destination_and_latency() {
    let mut stream = Vec::new();
    for record in [
        function(DIRECTION_ENTER, 10, "Db", "open", "db.php"),
        {
            let mut r = syscall(ProbePoint::Connect, DIRECTION_ENTER, 1_000);
            r.fd = 9;
            r.addr = 0x0A00_0001_u32.to_be(); // 10.0.0.1
            r
        },
        syscall(ProbePoint::Connect, DIRECTION_RETURN, 4_500),
        function(DIRECTION_RETURN, 9_999, "Db", "open", "db.php"),
    ] {
        stream.extend(record_bytes(&record));
    }

    let (output, _) = run_pipeline(&stream, true);
    let connect_line = output
        .lines()
        .find(|line| line.contains("sys.connect"))
        .expect("connect line present");

    assert!(connect_line.contains("connect to: 10.0.0.1"));
    assert!(connect_line.contains("write on fd: 9"));
    assert!(connect_line.starts_with("12345  3500 "));
}

/// An orphan return inside a live frame still produces one best-effort line
/// with the zero-latency placeholder, and processing continues.
#[test]
fn orphan_return_emits_best_effort_line() {
    let mut stream = Vec::new();
    for record in [
        function(DIRECTION_ENTER, 100, "App", "main", "index.php"),
        function(DIRECTION_RETURN, 200, "App", "neverEntered", "index.php"),
        function(DIRECTION_ENTER, 300, "App", "next", "index.php"),
    ] {
        stream.extend(record_bytes(&record));
    }

    let (output, outcomes) = run_pipeline(&stream, false);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "12345  -          <- App.neverEntered from index.php");
    assert!(lines[2].contains("-> App.next from index.php"));
    assert!(outcomes.iter().all(|o| *o == Outcome::Continue));
}

/// Totals at a function return are identical whether or not per-syscall
/// detail lines were requested.
#[test]
fn totals_match_with_and_without_syscall_detail() {
    let mut stream = Vec::new();
    for record in [
        function(DIRECTION_ENTER, 0, "App", "work", "index.php"),
        {
            let mut r = syscall(ProbePoint::Socket, DIRECTION_RETURN, 50);
            r.ret = 7;
            r
        },
        {
            let mut r = syscall(ProbePoint::Sendto, DIRECTION_ENTER, 100);
            r.fd = 7;
            r
        },
        {
            let mut r = syscall(ProbePoint::Sendto, DIRECTION_RETURN, 350);
            r.ret = 2_048;
            r
        },
        function(DIRECTION_RETURN, 1_000, "App", "work", "index.php"),
    ] {
        stream.extend(record_bytes(&record));
    }

    let (plain, _) = run_pipeline(&stream, false);
    let (detailed, _) = run_pipeline(&stream, true);

    let summaries = |text: &str| -> Vec<String> {
        text.lines()
            .filter(|line| {
                line.contains("traced syscalls total latency")
                    || line.contains("sys time spent on")
            })
            .map(str::to_owned)
            .collect()
    };
    assert_eq!(summaries(&plain), summaries(&detailed));
    assert!(plain
        .lines()
        .any(|l| l.ends_with("sys time spent on the network |-> 2048 bytes written, 0 bytes read")));
    assert!(!plain.contains("sys.sendto"));
    assert!(detailed.contains("sys.sendto"));
}

/// Two traced processes retire independently; the session only completes
/// when the second root frame returns.
#[test]
fn session_completes_after_last_process() {
    let other_proc = (777_u64 << 32) | 778;
    let with_proc = |mut record: ProbeRecord, proc: u64| {
        record.pid_tgid = proc;
        record_bytes(&record)
    };

    let mut stream = Vec::new();
    stream.extend(with_proc(function(DIRECTION_ENTER, 10, "", "main", "a.php"), PROC));
    stream.extend(with_proc(function(DIRECTION_ENTER, 20, "", "main", "b.php"), other_proc));
    stream.extend(with_proc(function(DIRECTION_RETURN, 30, "", "main", "a.php"), PROC));
    stream.extend(with_proc(function(DIRECTION_RETURN, 40, "", "main", "b.php"), other_proc));

    let mut reader = RecordReader::new(stream.as_slice());
    let correlator = Correlator::new();
    let mut aggregator = Aggregator::new(false, Vec::new());
    let mut session = SessionTracker::new();

    let mut closed = 0;
    while let Some(record) = reader.next_record().unwrap() {
        if let Some(event) = correlator.correlate(&record) {
            if let Outcome::TraceClosed(_) = aggregator.consume(&mut session, &event).unwrap() {
                closed += 1;
                if closed == 1 {
                    assert!(!session.is_complete());
                }
            }
        }
    }
    assert_eq!(closed, 2);
    assert!(session.is_complete());
    assert_eq!(aggregator.process_count(), 0);
}

/// Records survive a trip through a real file, the way a captured stream
/// would be replayed with `--input`.
#[test]
fn replays_records_from_a_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    for record in [
        function(DIRECTION_ENTER, 1, "", "main", "cli.php"),
        function(DIRECTION_RETURN, 42, "", "main", "cli.php"),
    ] {
        file.write_all(&record_bytes(&record)).unwrap();
    }
    file.flush().unwrap();

    let reopened = std::fs::File::open(file.path()).unwrap();
    let mut reader = RecordReader::new(reopened);
    let correlator = Correlator::new();
    let mut aggregator = Aggregator::new(false, Vec::new());
    let mut session = SessionTracker::new();

    while let Some(record) = reader.next_record().unwrap() {
        if let Some(event) = correlator.correlate(&record) {
            aggregator.consume(&mut session, &event).unwrap();
        }
    }

    let output = String::from_utf8(aggregator.into_inner()).unwrap();
    assert!(output.contains("-> main from cli.php"));
    assert!(output.contains("<- main from cli.php"));
    assert!(session.is_complete());
}

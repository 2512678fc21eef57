//! Concurrent writers through one console reporter
//!
//! Many threads report at once; every line on the output must be exactly
//! one rendered verdict, never a mix of two.

use png_validator_rs::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn event(worker: usize, index: usize) -> ReportEvent {
    let unit = format!("Worker{worker:02}");
    let asset = format!("Gameplay/{}/sprite_{index:04}.png", "x".repeat(index % 97));
    let verdict = match index % 3 {
        0 => Verdict::Corrupt { detail: "unrecognized image format".into() },
        1 => Verdict::FormatMismatch { expected: "PNG".into(), actual: "JPEG".into() },
        _ => Verdict::Unreadable {
            kind: "PermissionDenied".into(),
            message: "Permission denied (os error 13)".into(),
        },
    };
    ReportEvent::for_asset(unit, asset, verdict)
}

#[test]
fn test_lines_are_never_torn() {
    const WORKERS: usize = 16;
    const PER_WORKER: usize = 400;

    let reporter = Arc::new(ConsoleReporter::new(Vec::new(), false));

    let handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let reporter = Arc::clone(&reporter);
            thread::spawn(move || {
                for index in 0..PER_WORKER {
                    reporter.report(event(worker, index));
                    if index % 50 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: HashSet<String> = (0..WORKERS)
        .flat_map(|worker| (0..PER_WORKER).map(move |index| event(worker, index)))
        .map(|event| render_line(&event).unwrap())
        .collect();

    let reporter = Arc::try_unwrap(reporter).ok().unwrap();
    let output = String::from_utf8(reporter.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), WORKERS * PER_WORKER);
    for line in &lines {
        assert!(expected.contains(*line), "torn or unknown line: {line}");
    }
    let distinct: HashSet<&str> = lines.iter().copied().collect();
    assert_eq!(distinct.len(), expected.len());
}

#[test]
fn test_colored_lines_stay_whole() {
    let reporter = Arc::new(ConsoleReporter::new(Vec::new(), true));

    thread::scope(|scope| {
        for worker in 0..8 {
            let reporter = &reporter;
            scope.spawn(move || {
                for index in 0..200 {
                    reporter.report(event(worker, index));
                }
            });
        }
    });

    let reporter = Arc::try_unwrap(reporter).ok().unwrap();
    let output = String::from_utf8(reporter.into_inner()).unwrap();
    for line in output.lines() {
        assert!(line.starts_with("\x1b["), "line lost its color prefix: {line:?}");
        assert!(line.ends_with("\x1b[0m"), "line lost its reset suffix: {line:?}");
        assert_eq!(line.matches("[Worker").count(), 1, "two verdicts in one line: {line:?}");
    }
}

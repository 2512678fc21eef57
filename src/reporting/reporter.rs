//! Line-atomic reporting of scan verdicts
//!
//! Workers hand [`ReportEvent`]s to an [`EventSink`]. The console sink takes
//! one lock per line, so lines from different units may interleave but a
//! single line is never split.

use indicatif::ProgressBar;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::core::verdict::{ScanSummary, Severity, Verdict};

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_GRAY: &str = "\x1b[37m";
const ANSI_DARK_YELLOW: &str = "\x1b[33m";
const ANSI_DARK_CYAN: &str = "\x1b[36m";

/// One verdict, attributed to its unit and, when it has one, its asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEvent {
    pub unit: String,
    pub asset: Option<String>,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl ReportEvent {
    pub fn for_unit(unit: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            unit: unit.into(),
            asset: None,
            verdict,
        }
    }

    pub fn for_asset(unit: impl Into<String>, asset: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            unit: unit.into(),
            asset: Some(asset.into()),
            verdict,
        }
    }

    pub fn severity(&self) -> Severity {
        self.verdict.severity()
    }
}

/// Receives verdicts from concurrent workers and the final summary.
pub trait EventSink: Send + Sync {
    fn report(&self, event: ReportEvent);

    fn complete(&self, _summary: &ScanSummary) {}
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn report(&self, event: ReportEvent) {
        self.0.report(event.clone());
        self.1.report(event);
    }

    fn complete(&self, summary: &ScanSummary) {
        self.0.complete(summary);
        self.1.complete(summary);
    }
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn report(&self, event: ReportEvent) {
        (**self).report(event)
    }

    fn complete(&self, summary: &ScanSummary) {
        (**self).complete(summary)
    }
}

/// Text of the report line for an event, without color. `None` for `Ok`.
pub fn render_line(event: &ReportEvent) -> Option<String> {
    let unit = &event.unit;
    let asset = event.asset.as_deref().unwrap_or_default();

    let line = match &event.verdict {
        Verdict::Ok => return None,
        Verdict::Skipped { .. } => format!("[{unit}] No everest.yaml, skipping."),
        Verdict::FormatMismatch { expected, actual } => {
            format!("[{unit}] Image \"{asset}\" is not in the {expected} format. (actual: {actual})")
        }
        Verdict::Corrupt { .. } => format!("[{unit}] Image \"{asset}\" is invalid or corrupted."),
        Verdict::Unreadable { kind, message } => {
            format!("[{unit}] Image \"{asset}\" could not be read. ({kind}: {message})")
        }
        Verdict::UnitUnreadable { kind, message } => {
            format!("[{unit}] The .zip file could not be read. ({kind}: {message})")
        }
    };
    Some(line)
}

/// Closing lines printed once the run is over.
pub fn render_summary(summary: &ScanSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if summary.cancelled {
        lines.push("Search cancelled. Results above are incomplete.".to_string());
    } else {
        lines.push("Search complete. See the above log for details.".to_string());
    }
    lines.push(format!(
        "Units: {} found, {} scanned, {} skipped, {} unreadable",
        summary.units_found, summary.units_scanned, summary.units_skipped, summary.units_unreadable
    ));
    lines.push(format!(
        "Images: {} checked, {} problem(s) found",
        summary.assets_checked, summary.problems_found
    ));
    lines
}

/// Writes each event as one line under a single lock.
pub struct ConsoleReporter<W: Write + Send> {
    out: Mutex<W>,
    color: bool,
    progress: Option<ProgressBar>,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
            progress: None,
        }
    }

    /// Keep lines clear of a live progress bar by suspending it per line.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn paint(&self, text: &str, ansi: &str) -> String {
        if self.color {
            format!("{ansi}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let write = |out: &mut W| {
            // Broken pipes are not worth crashing a worker over.
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        };
        match &self.progress {
            Some(progress) => progress.suspend(|| write(&mut *out)),
            None => write(&mut *out),
        }
    }
}

impl<W: Write + Send> EventSink for ConsoleReporter<W> {
    fn report(&self, event: ReportEvent) {
        let Some(line) = render_line(&event) else {
            return;
        };
        let ansi = match event.severity() {
            Severity::Neutral => ANSI_GRAY,
            Severity::Warning => ANSI_DARK_YELLOW,
        };
        self.write_line(&self.paint(&line, ansi));
    }

    fn complete(&self, summary: &ScanSummary) {
        self.write_line("");
        for line in render_summary(summary) {
            self.write_line(&self.paint(&line, ANSI_DARK_CYAN));
        }
    }
}

/// Keeps every reported event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ReportEvent>>,
    summary: Mutex<Option<ScanSummary>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn summary(&self) -> Option<ScanSummary> {
        self.summary
            .lock()
            .map(|summary| summary.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl EventSink for EventLog {
    fn report(&self, event: ReportEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    fn complete(&self, summary: &ScanSummary) {
        *self
            .summary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(summary.clone());
    }
}

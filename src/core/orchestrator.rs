//! Scan orchestration
//!
//! Lists the mod units, scans them on a bounded rayon pool (one worker per
//! unit, assets sequential within a unit) and aggregates the summary.

use anyhow::{Context, Result};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use super::cancel::{CancelToken, Cancelled};
use super::classifier::{classify_entry, classify_file};
use super::verdict::{ScanSummary, Verdict};
use crate::reporting::reporter::{EventSink, ReportEvent};
use crate::scanner::archive::{entry_unreadable, open_archive, unit_unreadable};
use crate::scanner::asset_walker::{
    archive_assets, archive_has_asset_root, directory_asset_root, walk_directory_assets,
    AssetWalkError,
};
use crate::scanner::marker::{archive_has_marker, directory_has_marker, NO_MARKER_REASON};
use crate::scanner::mod_units::{enumerate_units, ModUnit, UnitKind};

/// Run-wide knobs
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Worker threads; `None` lets rayon pick from available parallelism.
    pub workers: Option<usize>,
}

/// How a unit's scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Scanned,
    Skipped,
    Unreadable,
    Cancelled,
}

/// Per-unit tally, merged into the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub outcome: UnitOutcome,
    pub assets_checked: usize,
    pub problems_found: usize,
}

impl UnitReport {
    fn new(outcome: UnitOutcome) -> Self {
        Self {
            outcome,
            assets_checked: 0,
            problems_found: 0,
        }
    }
}

#[derive(Default)]
struct ScanCounters {
    units_scanned: AtomicUsize,
    units_skipped: AtomicUsize,
    units_unreadable: AtomicUsize,
    assets_checked: AtomicUsize,
    problems_found: AtomicUsize,
}

impl ScanCounters {
    fn add(&self, report: &UnitReport) {
        let counter = match report.outcome {
            UnitOutcome::Scanned => Some(&self.units_scanned),
            UnitOutcome::Skipped => Some(&self.units_skipped),
            UnitOutcome::Unreadable => Some(&self.units_unreadable),
            UnitOutcome::Cancelled => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        self.assets_checked.fetch_add(report.assets_checked, Ordering::Relaxed);
        self.problems_found.fetch_add(report.problems_found, Ordering::Relaxed);
    }

    fn into_summary(self, units_found: usize, cancelled: bool) -> ScanSummary {
        ScanSummary {
            units_found,
            units_scanned: self.units_scanned.into_inner(),
            units_skipped: self.units_skipped.into_inner(),
            units_unreadable: self.units_unreadable.into_inner(),
            assets_checked: self.assets_checked.into_inner(),
            problems_found: self.problems_found.into_inner(),
            cancelled,
        }
    }
}

/// Scan every mod unit under `root` and report verdicts to `sink`.
///
/// Only a failure to list `root` itself is returned as an error; everything
/// that goes wrong inside a unit becomes a verdict. Completion is signalled
/// to the sink once all workers have joined, also when cancelled.
pub fn run_scan(
    root: &Path,
    options: &ScanOptions,
    sink: &dyn EventSink,
    cancel: &CancelToken,
    progress: &ProgressBar,
) -> Result<ScanSummary> {
    let listing = enumerate_units(root)?;
    info!(
        directories = listing.directories.len(),
        archives = listing.archives.len(),
        "found mod units"
    );

    let units_found = listing.len();
    let units = listing.into_units();
    progress.set_length(units.len() as u64);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.unwrap_or(0))
        .thread_name(|index| format!("png-scan-{index}"))
        .build()
        .context("Failed to build worker pool")?;

    let counters = ScanCounters::default();
    pool.install(|| {
        units
            .par_iter()
            .progress_with(progress.clone())
            .for_each(|unit| {
                if cancel.is_cancelled() {
                    return;
                }
                let report = scan_unit_isolated(unit, sink, cancel);
                counters.add(&report);
            })
    });

    let summary = counters.into_summary(units_found, cancel.is_cancelled());
    sink.complete(&summary);
    Ok(summary)
}

/// Scan one unit; a panic inside it is turned into an unreadable-unit verdict
/// so sibling units keep going.
fn scan_unit_isolated(unit: &ModUnit, sink: &dyn EventSink, cancel: &CancelToken) -> UnitReport {
    match panic::catch_unwind(AssertUnwindSafe(|| scan_unit(unit, sink, cancel))) {
        Ok(report) => report,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(unit = %unit.path.display(), %message, "unit scan panicked");
            sink.report(ReportEvent::for_unit(
                unit.display_name(),
                Verdict::UnitUnreadable {
                    kind: "Panic".to_string(),
                    message,
                },
            ));
            UnitReport::new(UnitOutcome::Unreadable)
        }
    }
}

/// Marker filter, asset walk and classification for one unit.
pub fn scan_unit(unit: &ModUnit, sink: &dyn EventSink, cancel: &CancelToken) -> UnitReport {
    let name = unit.display_name();
    match unit.kind {
        UnitKind::Directory => scan_directory(unit, &name, sink, cancel),
        UnitKind::Archive => scan_archive(unit, &name, sink, cancel),
    }
}

fn skip(name: &str, sink: &dyn EventSink) -> UnitReport {
    debug!(unit = name, "no manifest marker, skipping");
    sink.report(ReportEvent::for_unit(
        name,
        Verdict::Skipped {
            reason: NO_MARKER_REASON.to_string(),
        },
    ));
    UnitReport::new(UnitOutcome::Skipped)
}

/// Count and forward one asset verdict. Returns `false` once cancelled.
fn record(
    report: &mut UnitReport,
    unit: &str,
    asset: &str,
    result: Result<Verdict, Cancelled>,
    sink: &dyn EventSink,
) -> bool {
    let Ok(verdict) = result else {
        debug!(unit, asset, "decode abandoned");
        report.outcome = UnitOutcome::Cancelled;
        return false;
    };

    report.assets_checked += 1;
    if verdict.is_problem() {
        report.problems_found += 1;
    }
    if verdict.is_reportable() {
        sink.report(ReportEvent::for_asset(unit, asset, verdict));
    }
    true
}

/// Report a path the walk could not read. It counts as a problem but not as
/// a checked asset, since nothing was classified.
fn record_walk_failure(report: &mut UnitReport, unit: &str, walk_error: &AssetWalkError, sink: &dyn EventSink) {
    let asset = walk_error.name.as_deref().unwrap_or(".");
    warn!(unit, asset, error = %walk_error, "asset walk failed");
    report.problems_found += 1;
    sink.report(ReportEvent::for_asset(unit, asset, walk_error.to_verdict()));
}

fn scan_directory(unit: &ModUnit, name: &str, sink: &dyn EventSink, cancel: &CancelToken) -> UnitReport {
    if !directory_has_marker(&unit.path) {
        return skip(name, sink);
    }

    let mut report = UnitReport::new(UnitOutcome::Scanned);
    let Some(asset_root) = directory_asset_root(&unit.path) else {
        debug!(unit = name, "no asset root");
        return report;
    };

    for asset in walk_directory_assets(&asset_root) {
        if cancel.is_cancelled() {
            report.outcome = UnitOutcome::Cancelled;
            break;
        }

        match asset {
            Ok(asset) => {
                let result = classify_file(&asset.location, cancel);
                if !record(&mut report, name, &asset.name, result, sink) {
                    break;
                }
            }
            Err(walk_error) => record_walk_failure(&mut report, name, &walk_error, sink),
        }
    }

    debug!(unit = name, assets = report.assets_checked, "directory unit done");
    report
}

fn scan_archive(unit: &ModUnit, name: &str, sink: &dyn EventSink, cancel: &CancelToken) -> UnitReport {
    let mut archive = match open_archive(&unit.path) {
        Ok(archive) => archive,
        Err(e) => {
            warn!(unit = name, error = %e, "archive could not be opened");
            sink.report(ReportEvent::for_unit(name, unit_unreadable(&e)));
            return UnitReport::new(UnitOutcome::Unreadable);
        }
    };

    if !archive_has_marker(&archive) {
        return skip(name, sink);
    }

    let mut report = UnitReport::new(UnitOutcome::Scanned);
    if !archive_has_asset_root(&archive) {
        debug!(unit = name, "no asset root");
        return report;
    }

    for asset in archive_assets(&archive) {
        if cancel.is_cancelled() {
            report.outcome = UnitOutcome::Cancelled;
            break;
        }

        let result = match archive.by_name(&asset.location) {
            Ok(entry) => classify_entry(entry, cancel),
            Err(e) => Ok(entry_unreadable(&e)),
        };
        if !record(&mut report, name, &asset.name, result, sink) {
            break;
        }
    }

    debug!(unit = name, assets = report.assets_checked, "archive unit done");
    report
}

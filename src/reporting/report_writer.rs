//! Report file writing

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::reporter::{render_line, ReportEvent};
use crate::core::verdict::{ScanSummary, Severity, Verdict};

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a ScanSummary,
    events: &'a [ReportEvent],
}

/// Write the report in the format implied by the file extension:
/// `.json` gets JSON, anything else plain text.
pub fn write_report_auto(output_path: &Path, events: &[ReportEvent], summary: &ScanSummary) -> Result<()> {
    let is_json = output_path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        write_json_report(output_path, events, summary)
    } else {
        write_report(output_path, events, summary)
    }
}

/// Write scan results as a plain text report
///
/// # Arguments
/// * `output_path` - Path to output file
/// * `events` - Reported verdicts, in arrival order
/// * `summary` - Run counters
pub fn write_report(output_path: &Path, events: &[ReportEvent], summary: &ScanSummary) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report file {}", output_path.display()))?;
    let mut file = BufWriter::new(file);

    writeln!(file, "PNG Atlas Scan Report")?;
    writeln!(file, "=====================")?;
    if summary.cancelled {
        writeln!(file, "Status: cancelled (partial results)")?;
    }
    writeln!(file)?;

    writeln!(file, "Summary Statistics:")?;
    writeln!(file, "-------------------")?;
    writeln!(file, "  Mod units found: {}", summary.units_found)?;
    writeln!(file, "  Mod units scanned: {}", summary.units_scanned)?;
    writeln!(file, "  Mod units skipped: {}", summary.units_skipped)?;
    writeln!(file, "  Mod units unreadable: {}", summary.units_unreadable)?;
    writeln!(file, "  Images checked: {}", summary.assets_checked)?;
    writeln!(file, "  Problems found: {}", summary.problems_found)?;
    writeln!(file)?;

    let (warnings, notices): (Vec<&ReportEvent>, Vec<&ReportEvent>) = events
        .iter()
        .partition(|event| event.severity() == Severity::Warning);

    if !warnings.is_empty() {
        writeln!(file, "Problem Images:")?;
        writeln!(file, "---------------")?;
        for event in &warnings {
            write_event(&mut file, event)?;
        }
        writeln!(file)?;
    }

    if !notices.is_empty() {
        writeln!(file, "Skipped or Unreadable Units:")?;
        writeln!(file, "----------------------------")?;
        for event in &notices {
            write_event(&mut file, event)?;
        }
    }

    file.flush()?;
    Ok(())
}

fn write_event<W: Write>(out: &mut W, event: &ReportEvent) -> Result<()> {
    if let Some(line) = render_line(event) {
        writeln!(out, "  {line}")?;
        if let Verdict::Corrupt { detail } = &event.verdict {
            writeln!(out, "      detail: {detail}")?;
        }
    }
    Ok(())
}

/// Write scan results as a JSON document with `summary` and `events`.
pub fn write_json_report(output_path: &Path, events: &[ReportEvent], summary: &ScanSummary) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report file {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &JsonReport { summary, events })
        .context("Failed to write JSON report")?;
    writer.flush()?;
    Ok(())
}

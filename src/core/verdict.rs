//! Scan outcomes for units and assets

use serde::Serialize;

/// Visual weight of a reported line. Rendering decides what it looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Neutral,
    Warning,
}

/// Classification outcome for one asset, or for a whole unit
/// (`Skipped` and `UnitUnreadable`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Skipped { reason: String },
    Ok,
    FormatMismatch { expected: String, actual: String },
    Corrupt { detail: String },
    Unreadable { kind: String, message: String },
    UnitUnreadable { kind: String, message: String },
}

impl Verdict {
    pub fn severity(&self) -> Severity {
        match self {
            Verdict::Skipped { .. } | Verdict::UnitUnreadable { .. } | Verdict::Ok => {
                Severity::Neutral
            }
            Verdict::FormatMismatch { .. } | Verdict::Corrupt { .. } | Verdict::Unreadable { .. } => {
                Severity::Warning
            }
        }
    }

    /// Whether this verdict surfaces to the reporter. `Ok` is silent.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Verdict::Ok)
    }

    /// Whether this verdict counts as a detected problem in the summary.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            Verdict::FormatMismatch { .. } | Verdict::Corrupt { .. } | Verdict::Unreadable { .. }
        )
    }
}

/// Final counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub units_found: usize,
    pub units_scanned: usize,
    pub units_skipped: usize,
    pub units_unreadable: usize,
    pub assets_checked: usize,
    pub problems_found: usize,
    pub cancelled: bool,
}

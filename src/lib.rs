//! PNG Atlas Validator Library
//!
//! Finds atlas images in a Celeste `Mods` folder that claim to be PNG but are
//! stored in another container or are corrupted. Mod units (folders and zip
//! files) are scanned in parallel; verdicts are reported line by line.

pub mod core;
pub mod scanner;
pub mod reporting;

pub use crate::core::classifier;
pub use crate::core::orchestrator;
pub use crate::reporting::reporter;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::core::cancel::{CancelToken, Cancelled};
    pub use crate::core::classifier::{classify_entry, classify_file, classify_stream, format_name};
    pub use crate::core::orchestrator::{run_scan, scan_unit, ScanOptions, UnitOutcome, UnitReport};
    pub use crate::core::verdict::{ScanSummary, Severity, Verdict};
    pub use crate::scanner::mod_units::{
        enumerate_units, validate_mods_root, ModUnit, RootPathError, UnitKind, UnitListing,
    };
    pub use crate::reporting::reporter::{
        render_line, render_summary, ConsoleReporter, EventLog, EventSink, ReportEvent,
    };
    pub use crate::reporting::report_writer::{write_json_report, write_report, write_report_auto};
}

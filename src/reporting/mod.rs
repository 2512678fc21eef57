//! Verdict reporting

pub mod report_writer;
pub mod reporter;

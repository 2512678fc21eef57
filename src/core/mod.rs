//! Verdicts, classification and scan orchestration

pub mod cancel;
pub mod classifier;
pub mod orchestrator;
pub mod verdict;

//! Manifest marker check
//!
//! A unit is only worth scanning when it ships an `everest.yaml` at its root.
//! The manifest is never parsed here, only checked for.

use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub const MANIFEST_MARKER: &str = "everest.yaml";

/// Reason attached to the `Skipped` verdict of a unit without a marker.
pub const NO_MARKER_REASON: &str = "no manifest marker";

/// Whether a directory unit has the marker as a direct child file.
pub fn directory_has_marker(unit_dir: &Path) -> bool {
    unit_dir.join(MANIFEST_MARKER).is_file()
}

/// Whether an archive has an entry named exactly `everest.yaml`.
pub fn archive_has_marker<R: Read + Seek>(archive: &ZipArchive<R>) -> bool {
    archive.file_names().any(|name| name == MANIFEST_MARKER)
}

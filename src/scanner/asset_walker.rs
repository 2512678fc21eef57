//! Atlas asset discovery for directory and archive units

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::core::verdict::Verdict;

/// Asset root, relative to a unit, as path components.
pub const ASSET_ROOT: [&str; 2] = ["Graphics", "Atlases"];

/// Asset root as a zip entry name prefix.
pub const ARCHIVE_ASSET_PREFIX: &str = "Graphics/Atlases/";

/// Literal, case-sensitive suffix of every candidate asset.
pub const ASSET_EXTENSION: &str = ".png";

/// One image beneath a unit's asset root, located by `L`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef<L> {
    /// Path relative to the asset root, always `/`-separated.
    pub name: String,
    pub location: L,
}

/// A file inside a directory unit.
pub type FileAsset = AssetRef<PathBuf>;

/// An entry of an archive unit, located by its full entry name.
pub type EntryAsset = AssetRef<String>;

/// A failure while walking a directory unit's asset root.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct AssetWalkError {
    /// Logical name of the path that failed, when it lies under the root.
    pub name: Option<String>,
    #[source]
    pub source: walkdir::Error,
}

impl AssetWalkError {
    pub fn to_verdict(&self) -> Verdict {
        let kind = match self.source.io_error() {
            Some(e) => format!("{:?}", e.kind()),
            None if self.source.loop_ancestor().is_some() => "FilesystemLoop".to_string(),
            None => "Walk".to_string(),
        };
        Verdict::Unreadable {
            kind,
            message: self.source.to_string(),
        }
    }
}

/// The unit's `Graphics/Atlases` directory, if it exists.
pub fn directory_asset_root(unit_dir: &Path) -> Option<PathBuf> {
    let root = ASSET_ROOT.iter().fold(unit_dir.to_path_buf(), |path, part| path.join(part));
    root.is_dir().then_some(root)
}

/// Recursively collect every `*.png` file under `asset_root`.
///
/// Symlinked directories are not descended into, but a symlink that resolves
/// to a file is checked like the file itself.
pub fn walk_directory_assets(asset_root: &Path) -> Vec<Result<FileAsset, AssetWalkError>> {
    let mut assets = Vec::new();

    for entry in WalkDir::new(asset_root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                let name = source.path().and_then(|path| logical_name(asset_root, path));
                assets.push(Err(AssetWalkError { name, source }));
                continue;
            }
        };

        if !entry.file_name().to_string_lossy().ends_with(ASSET_EXTENSION) {
            continue;
        }
        let is_file = if entry.path_is_symlink() {
            entry.path().is_file()
        } else {
            entry.file_type().is_file()
        };
        if !is_file {
            continue;
        }

        if let Some(name) = logical_name(asset_root, entry.path()) {
            assets.push(Ok(AssetRef {
                name,
                location: entry.path().to_path_buf(),
            }));
        }
    }

    assets
}

/// `path` relative to `asset_root`, joined with `/` whatever the host uses.
pub fn logical_name(asset_root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(asset_root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Whether any entry lives in (or is) the `Graphics/Atlases/` namespace.
pub fn archive_has_asset_root<R: Read + Seek>(archive: &ZipArchive<R>) -> bool {
    archive
        .file_names()
        .any(|name| name.starts_with(ARCHIVE_ASSET_PREFIX))
}

/// Every `Graphics/Atlases/**.png` entry of the archive.
pub fn archive_assets<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<EntryAsset> {
    let mut assets: Vec<EntryAsset> = archive
        .file_names()
        .filter(|name| name.ends_with(ASSET_EXTENSION))
        .filter_map(|name| {
            let logical = name.strip_prefix(ARCHIVE_ASSET_PREFIX)?;
            Some(AssetRef {
                name: logical.to_string(),
                location: name.to_string(),
            })
        })
        .collect();
    assets.sort_by(|a, b| a.name.cmp(&b.name));
    assets
}

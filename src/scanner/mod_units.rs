//! Mods folder validation and mod unit discovery

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name the root folder must carry.
pub const MODS_DIR_NAME: &str = "Mods";

/// Reserved directory under the root that never holds a mod.
pub const CACHE_DIR_NAME: &str = "Cache";

/// Why a candidate root folder was rejected
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RootPathError {
    #[error("The path must be absolute.")]
    NotAbsolute,
    #[error("The folder \"{0}\" does not exist.")]
    Missing(PathBuf),
    #[error("The folder \"{0}\" does not point to the \"Mods\" folder.")]
    NotModsFolder(PathBuf),
}

/// Kind of a mod unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Directory,
    Archive,
}

/// One independently distributed mod: an extracted folder or a zip file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModUnit {
    pub path: PathBuf,
    pub kind: UnitKind,
}

impl ModUnit {
    pub fn new(path: PathBuf, kind: UnitKind) -> Self {
        Self { path, kind }
    }

    /// Base name of the unit path, used to prefix report lines.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Top-level units found under the root, split by kind.
#[derive(Debug, Clone, Default)]
pub struct UnitListing {
    pub directories: Vec<ModUnit>,
    pub archives: Vec<ModUnit>,
}

impl UnitListing {
    pub fn len(&self) -> usize {
        self.directories.len() + self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_units(self) -> Vec<ModUnit> {
        let mut units = self.directories;
        units.extend(self.archives);
        units
    }
}

/// Check that `input` names an existing, absolute `Mods` folder.
///
/// Trailing separators are ignored.
pub fn validate_mods_root(input: &Path) -> Result<PathBuf, RootPathError> {
    let path: PathBuf = input.components().collect();

    if !path.is_absolute() {
        return Err(RootPathError::NotAbsolute);
    }
    if !path.is_dir() {
        return Err(RootPathError::Missing(path));
    }
    if path.file_name().map_or(true, |name| name != MODS_DIR_NAME) {
        return Err(RootPathError::NotModsFolder(path));
    }
    Ok(path)
}

/// List the mod units directly under `root`.
///
/// Every subdirectory except `root/Cache` is a directory unit; every file
/// with a `.zip` extension is an archive unit. Nothing below the first level
/// is looked at.
pub fn enumerate_units(root: &Path) -> Result<UnitListing> {
    let cache_dir = root.join(CACHE_DIR_NAME);
    let mut listing = UnitListing::default();

    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to list mods folder {}", root.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read mods folder {}", root.display()))?;
        let path = entry.path();

        if path.is_dir() {
            if path != cache_dir {
                listing.directories.push(ModUnit::new(path, UnitKind::Directory));
            }
        } else if path.is_file() && is_zip(&path) {
            listing.archives.push(ModUnit::new(path, UnitKind::Archive));
        }
    }

    listing.directories.sort_by(|a, b| a.path.cmp(&b.path));
    listing.archives.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(listing)
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn mods_root() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Mods");
        fs::create_dir(&root).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_enumerate_splits_directories_and_archives() {
        let (_guard, root) = mods_root();
        fs::create_dir(root.join("AlphaMod")).unwrap();
        fs::create_dir(root.join("Cache")).unwrap();
        File::create(root.join("BetaMod.zip")).unwrap();
        File::create(root.join("notes.txt")).unwrap();

        let listing = enumerate_units(&root).unwrap();
        assert_eq!(listing.directories.len(), 1);
        assert_eq!(listing.directories[0].display_name(), "AlphaMod");
        assert_eq!(listing.archives.len(), 1);
        assert_eq!(listing.archives[0].kind, UnitKind::Archive);
        assert_eq!(listing.len(), 2);
    }

    #[test]
    fn test_nested_cache_is_not_excluded() {
        let (_guard, root) = mods_root();
        fs::create_dir_all(root.join("Cache")).unwrap();
        fs::create_dir_all(root.join("SomeMod").join("Cache")).unwrap();

        let listing = enumerate_units(&root).unwrap();
        assert_eq!(listing.directories.len(), 1);
        assert_eq!(listing.directories[0].display_name(), "SomeMod");
    }

    #[test]
    fn test_no_recursion_into_units() {
        let (_guard, root) = mods_root();
        fs::create_dir_all(root.join("Outer").join("Inner")).unwrap();
        File::create(root.join("Outer").join("nested.zip")).unwrap();

        let listing = enumerate_units(&root).unwrap();
        assert_eq!(listing.directories.len(), 1);
        assert!(listing.archives.is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(enumerate_units(&temp_dir.path().join("Mods")).is_err());
    }

    #[test]
    fn test_validate_mods_root() {
        let (_guard, root) = mods_root();
        assert_eq!(validate_mods_root(&root).unwrap(), root);

        let with_slash = PathBuf::from(format!("{}/", root.display()));
        assert_eq!(validate_mods_root(&with_slash).unwrap(), root);

        assert_eq!(
            validate_mods_root(Path::new("relative/Mods")),
            Err(RootPathError::NotAbsolute)
        );

        let missing = root.join("Nope");
        assert_eq!(
            validate_mods_root(&missing),
            Err(RootPathError::Missing(missing.clone()))
        );

        let parent = root.parent().unwrap().to_path_buf();
        assert_eq!(
            validate_mods_root(&parent),
            Err(RootPathError::NotModsFolder(parent.clone()))
        );
    }
}

//! Zip archive access for archive units

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::core::verdict::Verdict;

pub type UnitArchive = ZipArchive<BufReader<File>>;

/// Open a zip unit and read its central directory.
pub fn open_archive(path: &Path) -> Result<UnitArchive, ZipError> {
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file))
}

/// Short category name of a zip error, for verdict kinds.
pub fn zip_error_kind(err: &ZipError) -> String {
    match err {
        ZipError::Io(e) => format!("{:?}", e.kind()),
        ZipError::InvalidArchive(_) => "InvalidArchive".to_string(),
        ZipError::UnsupportedArchive(_) => "UnsupportedArchive".to_string(),
        ZipError::FileNotFound => "FileNotFound".to_string(),
        _ => "Zip".to_string(),
    }
}

/// The whole archive could not be read.
pub fn unit_unreadable(err: &ZipError) -> Verdict {
    Verdict::UnitUnreadable {
        kind: zip_error_kind(err),
        message: err.to_string(),
    }
}

/// One entry of an otherwise readable archive could not be opened.
pub fn entry_unreadable(err: &ZipError) -> Verdict {
    Verdict::Unreadable {
        kind: zip_error_kind(err),
        message: err.to_string(),
    }
}

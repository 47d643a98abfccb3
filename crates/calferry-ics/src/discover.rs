//! Locating `.ics` files on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::IcsError;

/// Resolves a source path to the list of ICS files to process.
///
/// A file path is returned as-is (the caller named it explicitly, so the
/// extension is not second-guessed). A directory is scanned one level deep
/// for entries with a `.ics` extension, compared case-insensitively, and the
/// matches are returned in sorted order so runs are deterministic.
pub fn find_ics_files(source: &Path) -> Result<Vec<PathBuf>, IcsError> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    if !source.is_dir() {
        return Err(IcsError::NotFound {
            path: source.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(source).map_err(|source_err| IcsError::Io {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source_err| IcsError::Io {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let path = entry.path();
        if path.is_file() && has_ics_extension(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(IcsError::NoIcsFiles {
            path: source.to_path_buf(),
        });
    }

    files.sort();
    debug!(count = files.len(), "discovered ics files");
    Ok(files)
}

fn has_ics_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ics"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn single_file_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("export.ics");
        fs::write(&file, "BEGIN:VCALENDAR\nEND:VCALENDAR\n").unwrap();

        let files = find_ics_files(&file).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn directory_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ics"), "").unwrap();
        fs::write(dir.path().join("a.ICS"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.ics")).unwrap();

        let files = find_ics_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.ICS", "b.ics"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_ics_files(dir.path()).unwrap_err();
        assert!(matches!(err, IcsError::NoIcsFiles { .. }));
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = find_ics_files(Path::new("/nonexistent/calendar")).unwrap_err();
        assert!(matches!(err, IcsError::NotFound { .. }));
    }
}

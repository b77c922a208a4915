//! Markdown file discovery and modification times.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use pagelift_shared::{PageliftError, Result};

/// Recursively collect `.md` files under `dir`, sorted by path for
/// deterministic sync order.
pub fn find_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| PageliftError::io(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PageliftError::io(&current, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "md") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Filesystem modification time of `path` as UTC.
pub fn file_last_modified(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).map_err(|e| PageliftError::io(path, e))?;
    let modified = metadata.modified().map_err(|e| PageliftError::io(path, e))?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Page title for a markdown file: the file stem, verbatim.
pub fn title_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

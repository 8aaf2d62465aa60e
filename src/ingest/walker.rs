use walkdir::WalkDir;
use std::path::{Path, PathBuf};

use super::ALLOWED_EXTENSIONS;
use crate::error::Result;

fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Collect ingestible files under `root`.
///
/// A file path is returned as-is when its extension is allowed. Directories
/// are walked recursively for `.csv`, `.xlsx` and `.xls` files; anything else
/// is skipped. Results are sorted so repeated runs ingest in the same order.
pub fn discover_upload_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if has_allowed_extension(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    // Fail loudly on a missing root instead of silently finding nothing
    std::fs::metadata(root)?;

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && has_allowed_extension(p))
        .collect();
    files.sort();

    log::info!("Discovered {} ingestible files in {}", files.len(), root.display());
    Ok(files)
}

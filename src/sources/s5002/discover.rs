use crate::error::{ReportError, Result};
use crate::sources::common::read_head;
use std::path::{Path, PathBuf};

const HEAD_BYTES: usize = 2048;

/// `.xml` files directly under `base_dir`, sorted by name.
pub fn discover_s5002_files(base_dir: &Path) -> Result<Vec<PathBuf>> {
    if !base_dir.is_dir() {
        return Err(ReportError::MissingDirectory(base_dir.display().to_string()));
    }

    let entries = std::fs::read_dir(base_dir).map_err(|e| ReportError::io(base_dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ReportError::io(base_dir, e))?.path();
        if path.is_file() && has_xml_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Accepts files named like S-5002 exports, or whose first bytes mention the event.
pub fn looks_like_s5002(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_uppercase().contains("S-5002"))
        .unwrap_or(false);
    if name_matches {
        return true;
    }

    read_head(path, HEAD_BYTES)
        .map(|head| head.contains("evtIrrfBenef") || head.contains("S-5002"))
        .unwrap_or(false)
}

pub(crate) fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

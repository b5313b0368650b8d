use crate::error::{ReportError, Result};
use crate::sources::s5002::discover::has_xml_extension;
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static COMPETENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());

/// Whether `name` is a `YYYY-MM` competence with a real month.
pub fn is_competence(name: &str) -> bool {
    COMPETENCE_RE.is_match(name)
        && NaiveDate::parse_from_str(&format!("{name}-01"), "%Y-%m-%d").is_ok()
}

/// Competence sub-folders of `base_dir`, most recent first.
pub fn list_competences(base_dir: &Path) -> Result<Vec<String>> {
    if !base_dir.is_dir() {
        return Err(ReportError::MissingDirectory(base_dir.display().to_string()));
    }

    let entries = std::fs::read_dir(base_dir).map_err(|e| ReportError::io(base_dir, e))?;
    let mut competences = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ReportError::io(base_dir, e))?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if is_competence(name) {
                competences.push(name.to_string());
            }
        }
    }
    competences.sort_by(|a, b| b.cmp(a));
    Ok(competences)
}

/// REINF exports grouped by competence. An empty selection means every
/// competence found on disk; competences with no files are left out.
pub fn files_by_competence(
    base_dir: &Path,
    selected: &[String],
) -> Result<Vec<(String, Vec<PathBuf>)>> {
    let competences = if selected.is_empty() {
        list_competences(base_dir)?
    } else {
        selected.to_vec()
    };

    let mut grouped = Vec::new();
    for competence in competences {
        let dir = base_dir.join(&competence);
        if !dir.is_dir() {
            continue;
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| ReportError::io(&dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ReportError::io(&dir, e))?.path();
            if path.is_file() && is_reinf_export(&path) {
                files.push(path);
            }
        }
        files.sort();
        if !files.is_empty() {
            grouped.push((competence, files));
        }
    }
    Ok(grouped)
}

pub fn discover_reinf_files(base_dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(files_by_competence(base_dir, &[])?
        .into_iter()
        .flat_map(|(_, files)| files)
        .collect())
}

fn is_reinf_export(path: &Path) -> bool {
    has_xml_extension(path)
        && path
            .file_name()
            .map(|name| name.to_string_lossy().to_ascii_uppercase().contains("REINF"))
            .unwrap_or(false)
}

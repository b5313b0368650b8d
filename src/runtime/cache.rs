use crate::error::{ReportError, Result};
use crate::sources::common::read_file;
use crate::types::SubjectRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Bumped whenever the persisted record layout changes.
pub const CACHE_VERSION: u32 = 3;

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u32,
    pub data: T,
    pub timestamp: String,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// Reads an envelope. Anything unreadable, undecodable or written under a
/// different version is reported as `None`.
pub fn load_envelope<T: DeserializeOwned>(path: &Path) -> Option<Envelope<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read cache {}: {e}", path.display());
            return None;
        }
    };

    match bincode::deserialize::<VersionHeader>(&bytes) {
        Ok(header) if header.version == CACHE_VERSION => {}
        Ok(header) => {
            tracing::warn!(
                "Discarding cache {} (version {} != {CACHE_VERSION})",
                path.display(),
                header.version
            );
            return None;
        }
        Err(e) => {
            tracing::warn!("Discarding unreadable cache {}: {e}", path.display());
            return None;
        }
    }

    match bincode::deserialize::<Envelope<T>>(&bytes) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            tracing::warn!("Discarding corrupt cache {}: {e}", path.display());
            None
        }
    }
}

/// Writes an envelope through a sibling temp file and a rename.
pub fn save_envelope<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    #[derive(Serialize)]
    struct EnvelopeRef<'a, T> {
        version: u32,
        data: &'a T,
        timestamp: String,
    }

    let bytes = bincode::serialize(&EnvelopeRef {
        version: CACHE_VERSION,
        data,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
    .map_err(|e| ReportError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }
    let tmp = path.with_extension("bin.tmp");
    std::fs::write(&tmp, &bytes).map_err(|e| ReportError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ReportError::io(path, e))?;
    Ok(())
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn cache_key(file_name: &str, hash: &str) -> String {
    format!("{file_name}_{hash}")
}

pub struct CacheLookup {
    pub key: String,
    pub records: Vec<SubjectRecord>,
    pub hit: bool,
}

/// Extracted records keyed by file name and content hash.
pub struct ParseCache {
    path: PathBuf,
    entries: HashMap<String, Vec<SubjectRecord>>,
    dirty: bool,
}

impl ParseCache {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_envelope::<HashMap<String, Vec<SubjectRecord>>>(&path)
            .map(|envelope| envelope.data)
            .unwrap_or_default();
        tracing::debug!("Parse cache {} holds {} entries", path.display(), entries.len());
        Self {
            path,
            entries,
            dirty: false,
        }
    }

    /// Returns the cached records for the file's current content, running
    /// `parse` on a miss. Parse failures propagate and are not stored.
    pub fn get_or_compute<F>(&mut self, file: &Path, file_name: &str, parse: F) -> Result<CacheLookup>
    where
        F: FnOnce(&[u8]) -> Result<Vec<SubjectRecord>>,
    {
        let bytes = read_file(file)?;
        let key = cache_key(file_name, &content_hash(&bytes));

        if let Some(records) = self.entries.get(&key) {
            tracing::debug!("Cache hit for {file_name}");
            return Ok(CacheLookup {
                key,
                records: records.clone(),
                hit: true,
            });
        }

        let records = parse(&bytes)?;
        self.entries.insert(key.clone(), records.clone());
        self.dirty = true;
        Ok(CacheLookup {
            key,
            records,
            hit: false,
        })
    }

    /// Writes the cache if anything changed since it was opened or last saved.
    pub fn persist(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        save_envelope(&self.path, &self.entries)?;
        self.dirty = false;
        tracing::info!(
            "Saved parse cache {} ({} entries)",
            self.path.display(),
            self.entries.len()
        );
        Ok(true)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Subject id to the files (relative to the base directory) that mention it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl SubjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: &str, file: &str) {
        let files = self.entries.entry(subject.to_string()).or_default();
        if !files.iter().any(|known| known == file) {
            files.push(file.to_string());
        }
    }

    pub fn files_for(&self, subject: &str) -> &[String] {
        self.entries.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every indexed subject, ascending.
    pub fn subjects(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(path: &Path) -> Option<Self> {
        load_envelope::<SubjectIndex>(path).map(|envelope| envelope.data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_envelope(path, self)
    }
}

/// Deletes persisted cache files; missing files are not an error.
pub fn clear_persisted(paths: &[&Path]) -> Result<()> {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::info!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ReportError::io(path, e)),
        }
    }
    Ok(())
}

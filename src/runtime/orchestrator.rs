use crate::codes::{CodeCatalog, CorrectionRules, BUILT_IN_NAT_REND, NAT_REND};
use crate::error::Result;
use crate::report::aggregate::{filter_subjects, ConsolidatedRecord};
use crate::report::receipt::CodeMapping;
use crate::runtime::cache::{clear_persisted, ParseCache, SubjectIndex};
use crate::runtime::logging::{log_event, LogLevel, Notices};
use crate::sources::common::read_file;
use crate::sources::configs::SourceSettings;
use crate::sources::reinf4010::discover::{files_by_competence, list_competences};
use crate::sources::{adapter_for, extract_records, extract_subjects, ExtractContext, SourceAdapter};
use crate::types::{BatchStats, FileFailure, SourceKind, SubjectRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexProgress {
    pub done: usize,
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub source: SourceKind,
    pub xml_files: usize,
    pub indexed_subjects: Option<usize>,
    pub index_kb: Option<f64>,
    pub cache_kb: Option<f64>,
}

/// Per-module state: settings, code tables, mapping, index and the cached
/// subject list. One context serves one module.
pub struct ReportContext {
    kind: SourceKind,
    settings: SourceSettings,
    adapter: &'static dyn SourceAdapter,
    catalog: CodeCatalog,
    corrections: CorrectionRules,
    mapping: CodeMapping,
    index: Option<SubjectIndex>,
    subject_list: Option<(Instant, Vec<String>)>,
    notices: Notices,
}

fn load_catalog(settings: &SourceSettings) -> CodeCatalog {
    CodeCatalog::load(settings.codes_file.as_deref()).with_defaults(NAT_REND, BUILT_IN_NAT_REND)
}

fn file_size_kb(path: &Path) -> Option<f64> {
    std::fs::metadata(path).ok().map(|m| m.len() as f64 / 1024.0)
}

impl ReportContext {
    pub fn new(kind: SourceKind, settings: SourceSettings) -> Self {
        let catalog = load_catalog(&settings);
        let corrections = CorrectionRules::seed().with_extra(&settings.code_corrections);
        let mapping = CodeMapping::load(&settings.mapping_path(kind));
        Self {
            kind,
            adapter: adapter_for(kind),
            settings,
            catalog,
            corrections,
            mapping,
            index: None,
            subject_list: None,
            notices: Notices::new(),
        }
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    pub fn mapping(&self) -> &CodeMapping {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut CodeMapping {
        &mut self.mapping
    }

    pub fn save_mapping(&self) -> Result<()> {
        let path = self.settings.mapping_path(self.kind);
        self.mapping.save(&path)?;
        tracing::info!("Saved mapping to {}", path.display());
        Ok(())
    }

    pub fn take_notices(&mut self) -> Notices {
        std::mem::take(&mut self.notices)
    }

    fn parse_cache_path(&self) -> PathBuf {
        self.settings.parse_cache_path(self.kind)
    }

    fn index_path(&self) -> PathBuf {
        self.settings.index_path(self.kind)
    }

    /// Path relative to the base directory, `/`-separated.
    fn relative_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.settings.base_dir).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn warn(&mut self, message: &str) {
        log_event(&mut self.notices, LogLevel::Warn, message);
    }

    /// The subject index: in memory, else from disk, else built by a full scan.
    pub fn index(&mut self) -> Result<&SubjectIndex> {
        if self.index.is_none() {
            let loaded = SubjectIndex::load(&self.index_path());
            let index = match loaded {
                Some(index) => {
                    tracing::info!("Loaded index with {} subjects", index.len());
                    index
                }
                None => self.build_index_with_progress(|_| {})?,
            };
            self.index = Some(index);
        }
        let index: &SubjectIndex = self.index.get_or_insert_with(SubjectIndex::new);
        Ok(index)
    }

    /// Scans every discovered file for subject ids and persists the result
    /// when it is not empty.
    pub fn build_index_with_progress<F>(&mut self, mut progress: F) -> Result<SubjectIndex>
    where
        F: FnMut(IndexProgress),
    {
        let files = self.adapter.discover(&self.settings.base_dir)?;
        let total = files.len();
        if total == 0 {
            self.warn("No XML files found in the configured directory");
        }

        let mut index = SubjectIndex::new();
        let mut state = IndexProgress {
            done: 0,
            total,
            indexed: 0,
            failed: 0,
        };
        for path in &files {
            let name = self.relative_name(path);
            if self.adapter.quick_check(path) {
                let subjects = read_file(path).and_then(|bytes| {
                    extract_subjects(self.adapter, &name, &bytes, &self.settings.extra_namespaces)
                });
                match subjects {
                    Ok(subjects) if !subjects.is_empty() => {
                        for subject in &subjects {
                            index.insert(subject, &name);
                        }
                        state.indexed += 1;
                    }
                    Ok(_) => state.failed += 1,
                    Err(e) => {
                        state.failed += 1;
                        self.warn(&format!("Failed to index {name}: {e}"));
                    }
                }
            } else {
                state.failed += 1;
            }
            state.done += 1;
            progress(state);
        }

        tracing::info!(
            "[Report] Indexed {} subjects from {} of {} files ({} without subjects)",
            index.len(),
            state.indexed,
            total,
            state.failed
        );
        if !index.is_empty() {
            index.save(&self.index_path())?;
        }
        self.subject_list = None;
        Ok(index)
    }

    /// Sorted subject ids. Once the TTL expires the index is re-read from disk.
    pub fn list_subjects(&mut self) -> Result<Vec<String>> {
        let ttl = Duration::from_secs(self.settings.subject_list_ttl_secs);
        if let Some((loaded_at, subjects)) = &self.subject_list {
            if loaded_at.elapsed() < ttl {
                return Ok(subjects.clone());
            }
            self.index = None;
        }
        let subjects = self.index()?.subjects();
        self.subject_list = Some((Instant::now(), subjects.clone()));
        Ok(subjects)
    }

    pub fn search_subjects(&mut self, term: &str) -> Result<Vec<String>> {
        Ok(filter_subjects(&self.list_subjects()?, term))
    }

    /// Runs `paths` through the parse cache, persisting it once at the end.
    fn fetch_records(&mut self, paths: &[PathBuf]) -> (Vec<SubjectRecord>, BatchStats) {
        let mut cache = ParseCache::open(self.parse_cache_path());
        let mut stats = BatchStats::default();
        let mut records = Vec::new();
        let mut failures = Vec::new();

        for path in paths {
            let name = self.relative_name(path);
            let context = ExtractContext {
                file_name: &name,
                catalog: &self.catalog,
                corrections: &self.corrections,
            };
            let adapter = self.adapter;
            let extra = &self.settings.extra_namespaces;
            let lookup = cache.get_or_compute(path, &name, |bytes| {
                extract_records(adapter, bytes, extra, &context)
            });
            stats.files_processed += 1;
            match lookup {
                Ok(lookup) => {
                    if lookup.hit {
                        stats.cache_hits += 1;
                    } else {
                        stats.parsed_now += 1;
                    }
                    records.extend(lookup.records);
                }
                Err(e) => failures.push(FileFailure {
                    file: name,
                    reason: e.to_string(),
                }),
            }
        }

        for failure in &failures {
            self.warn(&format!("Failed to process {}: {}", failure.file, failure.reason));
        }
        stats.failures = failures;

        if let Err(e) = cache.persist() {
            self.warn(&format!("Failed to save parse cache: {e}"));
        }
        (records, stats)
    }

    /// Every record of `subject` merged into one, with batch statistics.
    pub fn aggregate(&mut self, subject: &str) -> Result<ConsolidatedRecord> {
        let base_dir = self.settings.base_dir.clone();
        let paths: Vec<PathBuf> = self
            .index()?
            .files_for(subject)
            .iter()
            .map(|name| base_dir.join(name))
            .collect();

        let mut consolidated = ConsolidatedRecord::empty(self.kind, subject);
        if paths.is_empty() {
            return Ok(consolidated);
        }

        let (records, stats) = self.fetch_records(&paths);
        for record in records {
            consolidated.absorb(record);
        }
        tracing::info!(
            "[Report] {subject}: {} files, {} cache hits, {} parsed, {} failed",
            stats.files_processed,
            stats.cache_hits,
            stats.parsed_now,
            stats.failures.len()
        );
        consolidated.stats = stats;
        Ok(consolidated)
    }

    /// Drops the persisted index and parse cache, then rebuilds the index.
    pub fn rebuild(&mut self) -> Result<SubjectIndex> {
        let index_path = self.index_path();
        let cache_path = self.parse_cache_path();
        clear_persisted(&[index_path.as_path(), cache_path.as_path()])?;
        self.index = None;
        self.subject_list = None;
        let index = self.build_index_with_progress(|p| {
            tracing::debug!("Indexing {}/{}", p.done, p.total);
        })?;
        self.index = Some(index.clone());
        Ok(index)
    }

    /// Competence folders available under the base directory, newest first.
    pub fn competences(&self) -> Result<Vec<String>> {
        list_competences(&self.settings.base_dir)
    }

    /// Every record found in the selected competences (all when empty).
    pub fn collect_records(&mut self, competences: &[String]) -> Result<(Vec<SubjectRecord>, BatchStats)> {
        let paths: Vec<PathBuf> = files_by_competence(&self.settings.base_dir, competences)?
            .into_iter()
            .flat_map(|(_, files)| files)
            .collect();
        Ok(self.fetch_records(&paths))
    }

    pub fn stats(&self) -> Result<SystemStats> {
        let xml_files = self.adapter.discover(&self.settings.base_dir)?.len();
        Ok(SystemStats {
            source: self.kind,
            xml_files,
            indexed_subjects: self.index.as_ref().map(SubjectIndex::len),
            index_kb: file_size_kb(&self.index_path()),
            cache_kb: file_size_kb(&self.parse_cache_path()),
        })
    }
}

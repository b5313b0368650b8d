use crate::report::aggregate::IncomeClasses;
use crate::types::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "sources.json";

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_subject_list_ttl_secs() -> u64 {
    3600
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    pub base_dir: PathBuf,
    #[serde(default)]
    pub codes_file: Option<PathBuf>,
    #[serde(default)]
    pub mapping_file: Option<PathBuf>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub extra_namespaces: Vec<String>,
    #[serde(default)]
    pub code_corrections: BTreeMap<String, String>,
    #[serde(default = "default_subject_list_ttl_secs")]
    pub subject_list_ttl_secs: u64,
    #[serde(default)]
    pub income_classes: IncomeClasses,
}

impl SourceSettings {
    pub fn new(base_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            codes_file: None,
            mapping_file: None,
            cache_dir: cache_dir.into(),
            extra_namespaces: Vec::new(),
            code_corrections: BTreeMap::new(),
            subject_list_ttl_secs: default_subject_list_ttl_secs(),
            income_classes: IncomeClasses::default(),
        }
    }

    pub fn parse_cache_path(&self, source: SourceKind) -> PathBuf {
        self.cache_dir.join(format!("cache_{}_xmls.bin", source.as_str()))
    }

    pub fn index_path(&self, source: SourceKind) -> PathBuf {
        self.cache_dir.join(format!("cache_{}_index.bin", source.as_str()))
    }

    pub fn mapping_path(&self, source: SourceKind) -> PathBuf {
        self.mapping_file.clone().unwrap_or_else(|| {
            self.cache_dir
                .join(format!("mapping_in2060_{}.json", source.as_str()))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub sources: HashMap<SourceKind, SourceSettings>,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl SourcesConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read sources.json: {e}"))?;
        let config: SourcesConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse sources.json: {e}"))?;
        Ok(config)
    }

    /// Loads `sources.json` from `$CONFIGS_PATH`, or the working directory.
    pub fn load_default() -> Result<Self, String> {
        let dir = std::env::var("CONFIGS_PATH").unwrap_or_else(|_| ".".to_string());
        Self::load_from_file(Path::new(&dir).join(CONFIG_FILE_NAME))
    }

    pub fn get(&self, source: SourceKind) -> Option<&SourceSettings> {
        self.sources.get(&source)
    }

    pub fn get_base_dir(&self, source: SourceKind) -> Option<&Path> {
        self.sources.get(&source).map(|s| s.base_dir.as_path())
    }
}

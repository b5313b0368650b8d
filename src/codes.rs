use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const TP_INFO_IR: &str = "TPInfoIR";
pub const COD_CATEG: &str = "CodCateg";
pub const TP_DEP: &str = "TPDep";
pub const NAT_REND: &str = "NatRend";

/// R-4010 natures of income known without any external table.
pub const BUILT_IN_NAT_REND: &[(&str, &str)] = &[
    ("10002", "Diárias"),
    ("10003", "Ajudas de custo"),
    ("10004", "Jetons"),
    ("10005", "Honorários"),
    ("10006", "Serviços prestados por pessoa física"),
    ("10007", "Comissões"),
    ("10008", "Rendimentos de trabalho sem vínculo"),
    ("10009", "Rendimentos de aluguéis"),
    ("10010", "Royalties"),
    ("99999", "Outros rendimentos"),
];

/// Known malformed codes observed in real files. Seed list; extended from config.
const SEED_CORRECTIONS: &[(&str, &str)] = &[
    ("011", "11"),
    ("341", "34"),
    ("431", "43"),
    ("179", "79"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    Exact,
    Corrected,
    ZeroStripped,
    Uncataloged,
    Missing,
}

impl CodeStatus {
    /// Whether the code should be surfaced to the user for review.
    pub fn needs_attention(self) -> bool {
        matches!(self, CodeStatus::Corrected | CodeStatus::Uncataloged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescription {
    pub text: String,
    pub status: CodeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRules {
    rules: BTreeMap<String, String>,
}

impl Default for CorrectionRules {
    fn default() -> Self {
        Self::seed()
    }
}

impl CorrectionRules {
    pub fn seed() -> Self {
        Self {
            rules: SEED_CORRECTIONS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, extra: &BTreeMap<String, String>) -> Self {
        self.extend(extra);
        self
    }

    pub fn extend(&mut self, extra: &BTreeMap<String, String>) {
        for (from, to) in extra {
            self.rules.insert(from.clone(), to.clone());
        }
    }

    pub fn correct<'a>(&'a self, code: &str) -> Option<&'a str> {
        self.rules.get(code).map(String::as_str)
    }
}

pub type CodeTable = HashMap<String, String>;

/// Code tables by category (`TPInfoIR`, `CodCateg`, `TPDep`, `NatRend`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeCatalog {
    #[serde(flatten)]
    categories: HashMap<String, CodeTable>,
}

impl CodeCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse code tables: {e}"))
    }

    /// Loads the catalog from disk. A missing or unreadable file yields an
    /// empty catalog; every code then resolves as not cataloged.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };
        if !path.exists() {
            tracing::warn!("Code table not found: {}", path.display());
            return Self::empty();
        }
        match std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))
            .and_then(|content| Self::from_json(&content))
        {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!("{err}");
                Self::empty()
            }
        }
    }

    /// Adds entries to a category without overriding codes already present.
    pub fn with_defaults(mut self, category: &str, entries: &[(&str, &str)]) -> Self {
        let table = self.categories.entry(category.to_string()).or_default();
        for (code, description) in entries {
            table
                .entry(code.to_string())
                .or_insert_with(|| description.to_string());
        }
        self
    }

    pub fn insert(&mut self, category: &str, code: &str, description: &str) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(code.to_string(), description.to_string());
    }

    pub fn table(&self, category: &str) -> Option<&CodeTable> {
        self.categories.get(category)
    }

    pub fn describe(&self, category: &str, code: &str, rules: &CorrectionRules) -> CodeDescription {
        static EMPTY: std::sync::LazyLock<CodeTable> = std::sync::LazyLock::new(CodeTable::new);
        let table = self.categories.get(category).unwrap_or(&EMPTY);
        resolve(code, table, rules, category)
    }
}

/// Resolves a code to its description.
///
/// Order: exact match, correction rule, leading zeros stripped, then an
/// explicit "not cataloged" sentinel carrying the literal code.
pub fn resolve(code: &str, table: &CodeTable, rules: &CorrectionRules, label: &str) -> CodeDescription {
    let code = code.trim();
    if code.is_empty() {
        return CodeDescription {
            text: format!("{label} não informado"),
            status: CodeStatus::Missing,
        };
    }

    if let Some(description) = table.get(code) {
        return CodeDescription {
            text: description.clone(),
            status: CodeStatus::Exact,
        };
    }

    if let Some(corrected) = rules.correct(code) {
        if corrected != code {
            if let Some(description) = table.get(corrected) {
                return CodeDescription {
                    text: format!("{description} (código original: {code})"),
                    status: CodeStatus::Corrected,
                };
            }
        }
    }

    let stripped = code.trim_start_matches('0');
    if !stripped.is_empty() && stripped != code {
        if let Some(description) = table.get(stripped) {
            return CodeDescription {
                text: format!("{description} (código: {code})"),
                status: CodeStatus::ZeroStripped,
            };
        }
    }

    CodeDescription {
        text: format!("Código {code} não catalogado no sistema"),
        status: CodeStatus::Uncataloged,
    }
}

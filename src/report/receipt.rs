use crate::error::{ReportError, Result};
use crate::report::aggregate::ConsolidatedRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub struct TemplateSection {
    pub id: &'static str,
    pub title: &'static str,
    pub lines: &'static [(&'static str, &'static str)],
}

/// Sections of the IN RFB 2060/2021 income receipt, in print order.
pub const IN2060_TEMPLATE: &[TemplateSection] = &[
    TemplateSection {
        id: "quadro3",
        title: "Quadro 3 - Rendimentos Tributáveis, Deduções e Imposto sobre a Renda Retido na Fonte (IRRF)",
        lines: &[
            ("linha1", "Total dos rendimentos tributáveis (inclusive férias e décimo terceiro salário)"),
            ("linha2", "Dedução: Contribuição à Previdência Oficial"),
            ("linha3", "Dedução: Contribuição a entidades de previdência complementar"),
            ("linha4", "Dedução: Pensão alimentícia"),
            ("linha5", "Imposto sobre a Renda Retido na Fonte (IRRF)"),
            ("linha6", "Rendimentos isentos de pensão, proventos de aposentadoria ou reforma por moléstia grave"),
        ],
    },
    TemplateSection {
        id: "quadro4",
        title: "Quadro 4 - Rendimentos Isentos e Não-Tributáveis",
        lines: &[
            ("linha1", "Parcela isenta dos proventos de aposentadoria (65 anos ou mais), exceto 13º"),
            ("linha2", "Parcela isenta do 13º salário (65 anos ou mais)"),
            ("linha3", "Diárias"),
            ("linha4", "Pensão e proventos por moléstia grave ou acidente em serviço"),
            ("linha5", "Outros rendimentos isentos e não-tributáveis"),
        ],
    },
    TemplateSection {
        id: "quadro5",
        title: "Quadro 5 - Rendimentos Sujeitos à Tributação Exclusiva",
        lines: &[
            ("linha1", "Décimo terceiro salário"),
            ("linha2", "Imposto sobre a Renda Retido na Fonte sobre 13º salário"),
            ("linha3", "Participação nos Lucros ou Resultados (PLR)"),
            ("linha4", "Imposto sobre a Renda Retido na Fonte sobre PLR"),
            ("linha5", "Outros rendimentos sujeitos à tributação exclusiva"),
        ],
    },
    TemplateSection {
        id: "quadro6",
        title: "Quadro 6 - Rendimentos Recebidos Acumuladamente (RRA)",
        lines: &[
            ("linha1", "Total dos rendimentos tributáveis (RRA)"),
            ("linha2", "Dedução: Contribuição à Previdência Oficial (RRA)"),
            ("linha3", "Dedução: Contribuição a entidades de previdência complementar (RRA)"),
            ("linha4", "Dedução: Pensão alimentícia (RRA)"),
            ("linha5", "Imposto sobre a Renda Retido na Fonte (RRA)"),
        ],
    },
    TemplateSection {
        id: "quadro7",
        title: "Quadro 7 - Informações Complementares",
        lines: &[
            ("linha1", "Rendimentos com exigibilidade suspensa"),
            ("linha2", "Depósitos judiciais"),
            ("linha3", "Outras informações"),
        ],
    },
];

const SUGGESTED_MAPPING: &[(&str, &str, &str)] = &[
    ("11", "quadro3", "linha1"),
    ("31", "quadro3", "linha1"),
    ("91", "quadro3", "linha1"),
    ("12", "quadro5", "linha1"),
    ("32", "quadro5", "linha1"),
    ("92", "quadro5", "linha1"),
    ("13", "quadro3", "linha1"),
    ("33", "quadro3", "linha1"),
    ("93", "quadro3", "linha1"),
    ("14", "quadro5", "linha3"),
    ("34", "quadro5", "linha3"),
    ("94", "quadro5", "linha3"),
    ("41", "quadro3", "linha2"),
    ("42", "quadro5", "linha2"),
    ("43", "quadro3", "linha2"),
    ("46", "quadro3", "linha3"),
    ("47", "quadro3", "linha3"),
    ("48", "quadro3", "linha3"),
    ("51", "quadro3", "linha4"),
    ("52", "quadro3", "linha4"),
    ("53", "quadro3", "linha4"),
    ("54", "quadro3", "linha4"),
    ("70", "quadro4", "linha1"),
    ("71", "quadro4", "linha2"),
    ("72", "quadro4", "linha3"),
    ("73", "quadro4", "linha5"),
    ("74", "quadro4", "linha5"),
    ("75", "quadro4", "linha5"),
    ("76", "quadro4", "linha4"),
    ("77", "quadro4", "linha4"),
    ("78", "quadro4", "linha5"),
    ("79", "quadro4", "linha5"),
    ("0", "quadro4", "linha5"),
    ("1", "quadro4", "linha5"),
    ("9", "quadro7", "linha3"),
    ("15", "quadro6", "linha1"),
    ("35", "quadro6", "linha1"),
    ("95", "quadro6", "linha1"),
    ("81", "quadro7", "linha2"),
    ("82", "quadro7", "linha2"),
    ("83", "quadro7", "linha2"),
];

pub const BENEFICIARY_NAME_PLACEHOLDER: &str = "A DEFINIR";
pub const INCOME_NATURE: &str = "RENDIMENTOS DO TRABALHO ASSALARIADO";

pub fn template_section(id: &str) -> Option<&'static TemplateSection> {
    IN2060_TEMPLATE.iter().find(|section| section.id == id)
}

pub fn line_label(section: &str, line: &str) -> Option<&'static str> {
    template_section(section)?
        .lines
        .iter()
        .find(|(id, _)| *id == line)
        .map(|(_, label)| *label)
}

pub fn template_has(section: &str, line: &str) -> bool {
    line_label(section, line).is_some()
}

/// Income code to `(section, line)` of the receipt template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeMapping {
    entries: BTreeMap<String, (String, String)>,
}

impl CodeMapping {
    pub fn suggested() -> Self {
        Self {
            entries: SUGGESTED_MAPPING
                .iter()
                .map(|(code, section, line)| {
                    (code.to_string(), (section.to_string(), line.to_string()))
                })
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The persisted mapping when the file exists, otherwise the suggested
    /// one. An unreadable file also falls back to the suggestions.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::suggested();
        }
        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| Self::from_json(&content).map_err(|e| e.to_string()))
        {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!("Ignoring mapping file {}: {err}", path.display());
                Self::suggested()
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReportError::Config(format!("Invalid mapping: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::Serialization(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
        }
        std::fs::write(path, self.to_json()?).map_err(|e| ReportError::io(path, e))
    }

    pub fn reset(&mut self) {
        *self = Self::suggested();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Maps `code` to a template line; unknown targets are rejected.
    pub fn set(&mut self, code: &str, section: &str, line: &str) -> Result<()> {
        if !template_has(section, line) {
            return Err(ReportError::Config(format!(
                "{section}/{line} is not a line of the receipt template"
            )));
        }
        self.entries
            .insert(code.trim().to_string(), (section.to_string(), line.to_string()));
        Ok(())
    }

    pub fn remove(&mut self, code: &str) -> Option<(String, String)> {
        self.entries.remove(code.trim())
    }

    pub fn get(&self, code: &str) -> Option<(&str, &str)> {
        self.entries
            .get(code)
            .map(|(section, line)| (section.as_str(), line.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &(String, String))> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptMetadata {
    pub subject_id: String,
    pub subject_name: String,
    pub employer_id: String,
    pub calendar_year: String,
    pub assessment_year: String,
    pub income_nature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappedCode {
    pub code: String,
    pub description: String,
    pub amount: Decimal,
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptTotals {
    /// Section id to line id to accumulated amount. Every template line is present.
    pub sections: BTreeMap<String, BTreeMap<String, Decimal>>,
    pub metadata: ReceiptMetadata,
    pub unmapped: Vec<UnmappedCode>,
}

impl ReceiptTotals {
    pub fn line(&self, section: &str, line: &str) -> Decimal {
        self.sections
            .get(section)
            .and_then(|lines| lines.get(line))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn section_total(&self, section: &str) -> Decimal {
        self.sections
            .get(section)
            .map(|lines| lines.values().copied().sum())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn mapped_total(&self) -> Decimal {
        self.sections
            .values()
            .flat_map(|lines| lines.values().copied())
            .sum()
    }

    pub fn unmapped_total(&self) -> Decimal {
        self.unmapped.iter().map(|u| u.amount).sum()
    }

    pub fn total_taxable(&self) -> Decimal {
        self.line("quadro3", "linha1")
    }

    pub fn total_withheld(&self) -> Decimal {
        self.line("quadro3", "linha5")
    }

    pub fn total_exempt(&self) -> Decimal {
        self.section_total("quadro4")
    }
}

/// Calendar year of the record: `perApur`, else the first payment period,
/// else the current year.
fn calendar_year(record: &ConsolidatedRecord) -> i32 {
    let year_of = |period: &str| period.get(0..4).and_then(|y| y.parse::<i32>().ok());
    year_of(&record.apportionment_period)
        .or_else(|| record.payments.iter().find_map(|p| year_of(&p.period)))
        .unwrap_or_else(|| chrono::Datelike::year(&chrono::Local::now()))
}

/// Folds every income line of `record` into the template through `mapping`.
pub fn assemble(record: &ConsolidatedRecord, mapping: &CodeMapping) -> ReceiptTotals {
    let mut sections: BTreeMap<String, BTreeMap<String, Decimal>> = IN2060_TEMPLATE
        .iter()
        .map(|section| {
            let lines = section
                .lines
                .iter()
                .map(|(line, _)| (line.to_string(), Decimal::ZERO))
                .collect();
            (section.id.to_string(), lines)
        })
        .collect();

    let mut unmapped: Vec<UnmappedCode> = Vec::new();
    for info in record.payments.iter().flat_map(|p| p.income.iter()) {
        let slot = match mapping.get(&info.code) {
            Some((section, line)) => sections
                .get_mut(section)
                .and_then(|lines| lines.get_mut(line)),
            None => None,
        };
        match slot {
            Some(total) => *total += info.amount,
            None => match unmapped.iter_mut().find(|u| u.code == info.code) {
                Some(existing) => {
                    existing.amount += info.amount;
                    existing.occurrences += 1;
                }
                None => unmapped.push(UnmappedCode {
                    code: info.code.clone(),
                    description: info.description.clone(),
                    amount: info.amount,
                    occurrences: 1,
                }),
            },
        }
    }
    if !unmapped.is_empty() {
        tracing::warn!(
            "{} income code(s) not mapped to the receipt for {}",
            unmapped.len(),
            record.subject_id
        );
    }

    let year = calendar_year(record);
    ReceiptTotals {
        sections,
        metadata: ReceiptMetadata {
            subject_id: record.subject_id.clone(),
            subject_name: BENEFICIARY_NAME_PLACEHOLDER.to_string(),
            employer_id: record.employer_id.clone(),
            calendar_year: year.to_string(),
            assessment_year: (year + 1).to_string(),
            income_nature: INCOME_NATURE.to_string(),
        },
        unmapped,
    }
}

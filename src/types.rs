use crate::codes::CodeStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    S5002,
    Reinf4010,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::S5002 => "s5002",
            SourceKind::Reinf4010 => "reinf4010",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::S5002 => "S-5002",
            SourceKind::Reinf4010 => "REINF 4010",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('-', "").as_str() {
            "s5002" => Ok(SourceKind::S5002),
            "reinf4010" => Ok(SourceKind::Reinf4010),
            other => Err(format!("Unknown source: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeInfo {
    pub code: String,
    pub description: String,
    pub status: CodeStatus,
    pub amount: Decimal,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub reference: String,
    pub gross_taxable: Decimal,
    pub official_pension: Decimal,
    pub withheld_tax: Decimal,
    pub exempt: Decimal,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    pub cpf: String,
    pub irrf_dependent: String,
    pub birth_date: String,
    pub name: String,
    pub kind_code: String,
    pub kind_description: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentDeduction {
    pub income_type: String,
    pub cpf: String,
    pub amount: Decimal,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub period: String,
    pub payment_date: String,
    pub payment_type: String,
    pub reference_id: String,
    pub category_code: String,
    pub category_description: String,
    pub income: Vec<IncomeInfo>,
    pub totals: Option<MonthlyTotals>,
    pub dependents: Vec<Dependent>,
    pub deductions: Vec<DependentDeduction>,
    pub competence: Option<String>,
    pub source_file: String,
}

impl PaymentEvent {
    /// Sum of every income line.
    pub fn gross(&self) -> Decimal {
        self.income.iter().map(|info| info.amount).sum()
    }

    pub fn withheld(&self) -> Decimal {
        self.totals
            .as_ref()
            .map(|t| t.withheld_tax)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn net(&self) -> Decimal {
        self.gross() - self.withheld()
    }
}

/// Everything one file says about one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub source: SourceKind,
    pub file_name: String,
    pub receipt_number: String,
    pub apportionment_period: String,
    pub employer_kind: String,
    pub employer_id: String,
    pub subject_id: String,
    pub payments: Vec<PaymentEvent>,
    pub dependents: Vec<Dependent>,
    pub deductions: Vec<DependentDeduction>,
}

impl SubjectRecord {
    /// Copies per-payment dependents and deductions into the record-level lists.
    pub fn consolidate_dependents(&mut self) {
        self.dependents = self
            .payments
            .iter()
            .flat_map(|p| p.dependents.iter().cloned())
            .collect();
        self.deductions = self
            .payments
            .iter()
            .flat_map(|p| p.deductions.iter().cloned())
            .collect();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub files_processed: usize,
    pub cache_hits: usize,
    pub parsed_now: usize,
    pub failures: Vec<FileFailure>,
}

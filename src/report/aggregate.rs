use crate::types::{
    BatchStats, Dependent, DependentDeduction, PaymentEvent, SourceKind, SubjectRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything known about one subject after merging its files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    pub source: SourceKind,
    pub subject_id: String,
    pub receipt_number: String,
    pub apportionment_period: String,
    pub employer_kind: String,
    pub employer_id: String,
    pub payments: Vec<PaymentEvent>,
    pub dependents: Vec<Dependent>,
    pub deductions: Vec<DependentDeduction>,
    #[serde(default)]
    pub stats: BatchStats,
}

impl ConsolidatedRecord {
    pub fn empty(source: SourceKind, subject_id: &str) -> Self {
        Self {
            source,
            subject_id: subject_id.to_string(),
            receipt_number: String::new(),
            apportionment_period: String::new(),
            employer_kind: String::new(),
            employer_id: String::new(),
            payments: Vec::new(),
            dependents: Vec::new(),
            deductions: Vec::new(),
            stats: BatchStats::default(),
        }
    }

    /// Folds one file's record in. Records for another subject are ignored.
    pub fn absorb(&mut self, record: SubjectRecord) -> bool {
        if record.subject_id != self.subject_id {
            return false;
        }
        fill_if_empty(&mut self.receipt_number, record.receipt_number);
        fill_if_empty(&mut self.apportionment_period, record.apportionment_period);
        fill_if_empty(&mut self.employer_kind, record.employer_kind);
        fill_if_empty(&mut self.employer_id, record.employer_id);
        self.payments.extend(record.payments);
        self.dependents.extend(record.dependents);
        self.deductions.extend(record.deductions);
        true
    }

    pub fn rebuild_dependents(&mut self) {
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

fn fill_if_empty(slot: &mut String, value: String) {
    if slot.is_empty() && !value.is_empty() {
        *slot = value;
    }
}

/// Merges the records of one subject, in the order given.
pub fn consolidate(
    source: SourceKind,
    subject_id: &str,
    records: impl IntoIterator<Item = SubjectRecord>,
) -> ConsolidatedRecord {
    let mut consolidated = ConsolidatedRecord::empty(source, subject_id);
    for record in records {
        consolidated.absorb(record);
    }
    consolidated
}

/// Distinct non-empty payment periods, ascending.
pub fn periods_of(record: &ConsolidatedRecord) -> Vec<String> {
    record
        .payments
        .iter()
        .filter(|p| !p.period.is_empty())
        .map(|p| p.period.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Payments keyed by period (ascending), each group sorted by payment date.
/// Payments without a period are left out.
pub fn group_by_period(record: &ConsolidatedRecord) -> BTreeMap<String, Vec<PaymentEvent>> {
    let mut groups: BTreeMap<String, Vec<PaymentEvent>> = BTreeMap::new();
    for payment in record.payments.iter().filter(|p| !p.period.is_empty()) {
        groups
            .entry(payment.period.clone())
            .or_default()
            .push(payment.clone());
    }
    for payments in groups.values_mut() {
        payments.sort_by(|a, b| a.payment_date.cmp(&b.payment_date));
    }
    groups
}

/// Keeps payments whose period is selected and rebuilds the dependent lists
/// from them. Payments without a period never match a selection. An empty
/// selection returns the record unchanged.
pub fn filter_by_periods(record: &ConsolidatedRecord, selected: &[String]) -> ConsolidatedRecord {
    if selected.is_empty() {
        return record.clone();
    }
    let mut filtered = record.clone();
    filtered
        .payments
        .retain(|p| selected.iter().any(|period| period == &p.period));
    filtered.rebuild_dependents();
    filtered
}

/// Income code classes used for the per-period summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeClasses {
    pub taxable: Vec<String>,
    pub withheld: Vec<String>,
    pub exempt: Vec<String>,
}

impl Default for IncomeClasses {
    fn default() -> Self {
        let codes = |list: &[&str]| list.iter().map(|c| c.to_string()).collect();
        Self {
            taxable: codes(&["11", "13", "31", "33", "91", "93"]),
            withheld: codes(&["41", "43"]),
            exempt: codes(&["70", "71", "72", "73", "74", "75"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: String,
    pub payment_count: usize,
    pub taxable: Decimal,
    pub withheld: Decimal,
    pub exempt: Decimal,
    pub gross: Decimal,
    pub net: Decimal,
}

/// S-5002 totals come from the income code classes. R-4010 payments carry
/// their withheld and exempt amounts in the monthly totals instead.
pub fn summarize_period(
    source: SourceKind,
    period: &str,
    payments: &[PaymentEvent],
    classes: &IncomeClasses,
) -> PeriodSummary {
    let mut summary = PeriodSummary {
        period: period.to_string(),
        payment_count: payments.len(),
        ..PeriodSummary::default()
    };
    match source {
        SourceKind::S5002 => {
            for info in payments.iter().flat_map(|p| p.income.iter()) {
                summary.gross += info.amount;
                if classes.taxable.contains(&info.code) {
                    summary.taxable += info.amount;
                } else if classes.withheld.contains(&info.code) {
                    summary.withheld += info.amount;
                } else if classes.exempt.contains(&info.code) {
                    summary.exempt += info.amount;
                }
            }
            summary.net = summary.gross - summary.withheld;
        }
        SourceKind::Reinf4010 => {
            for payment in payments {
                summary.gross += payment.gross();
                summary.withheld += payment.withheld();
                summary.net += payment.net();
                summary.exempt += payment
                    .totals
                    .as_ref()
                    .map(|t| t.exempt)
                    .unwrap_or(Decimal::ZERO);
            }
            summary.taxable = summary.gross - summary.exempt;
        }
    }
    summary
}

pub fn summarize(record: &ConsolidatedRecord, classes: &IncomeClasses) -> Vec<PeriodSummary> {
    group_by_period(record)
        .iter()
        .map(|(period, payments)| summarize_period(record.source, period, payments, classes))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAlert {
    pub code: String,
    pub description: String,
    pub amount: Decimal,
    pub period: String,
}

/// Income lines whose code was corrected or is missing from the catalog.
pub fn code_alerts(record: &ConsolidatedRecord) -> Vec<CodeAlert> {
    record
        .payments
        .iter()
        .flat_map(|p| p.income.iter().map(move |info| (p, info)))
        .filter(|(_, info)| info.status.needs_attention())
        .map(|(p, info)| CodeAlert {
            code: info.code.clone(),
            description: info.description.clone(),
            amount: info.amount,
            period: p.period.clone(),
        })
        .collect()
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| *c != '.' && *c != '-').collect()
}

/// Subjects containing `term`, ignoring CPF punctuation on both sides.
pub fn filter_subjects(subjects: &[String], term: &str) -> Vec<String> {
    let needle = digits_only(term.trim());
    if needle.is_empty() {
        return subjects.to_vec();
    }
    subjects
        .iter()
        .filter(|subject| digits_only(subject).contains(&needle))
        .cloned()
        .collect()
}

/// `12345678901` as `123.456.789-01`; anything not 11 digits is returned as is.
pub fn format_cpf(cpf: &str) -> String {
    let digits: String = cpf.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 11 {
        return cpf.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

/// Brazilian money notation without currency symbol: `1.234,56`.
pub fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped},{frac_part}")
    } else {
        format!("{grouped},{frac_part}")
    }
}

/// Plain two-decimal value with a comma separator, as spreadsheets expect.
pub fn format_decimal_comma(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2)).replace('.', ",")
}

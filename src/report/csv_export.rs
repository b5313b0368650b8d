use crate::error::{ReportError, Result};
use crate::report::aggregate::{format_cpf, format_decimal_comma};
use crate::types::SubjectRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const DETAILED_HEADER: [&str; 5] = [
    "CPF",
    "Valor Pago",
    "Natureza de Rendimento",
    "Período",
    "Arquivo",
];

pub const SUMMARY_HEADER: [&str; 4] = [
    "Natureza de Rendimento",
    "CPFs Únicos",
    "Qtd Pagamentos",
    "Total Pago",
];

/// One R-4010 payment, flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRow {
    pub cpf: String,
    pub amount: Decimal,
    pub nature: String,
    pub period: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NatureSummary {
    pub nature: String,
    pub unique_subjects: usize,
    pub payment_count: usize,
    pub total: Decimal,
}

fn competence_suffix(competences: &[String]) -> String {
    competences.join("_").replace('-', "")
}

pub fn detailed_file_name(competences: &[String]) -> String {
    format!("REINF_4010_Detalhado_{}.csv", competence_suffix(competences))
}

pub fn summary_file_name(competences: &[String]) -> String {
    format!("REINF_4010_Resumo_{}.csv", competence_suffix(competences))
}

/// Payment rows sorted by amount, largest first.
pub fn payment_rows(records: &[SubjectRecord]) -> Vec<PaymentRow> {
    let mut rows: Vec<PaymentRow> = records
        .iter()
        .flat_map(|record| {
            record.payments.iter().map(move |payment| PaymentRow {
                cpf: record.subject_id.clone(),
                amount: payment.gross(),
                nature: payment.category_description.clone(),
                period: payment.period.clone(),
                file: payment.source_file.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.amount.cmp(&a.amount));
    rows
}

/// Totals per nature of income, most frequent first.
pub fn summarize_by_nature(rows: &[PaymentRow]) -> Vec<NatureSummary> {
    let mut by_nature: BTreeMap<&str, (BTreeSet<&str>, usize, Decimal)> = BTreeMap::new();
    for row in rows {
        let entry = by_nature.entry(row.nature.as_str()).or_default();
        entry.0.insert(row.cpf.as_str());
        entry.1 += 1;
        entry.2 += row.amount;
    }

    let mut summaries: Vec<NatureSummary> = by_nature
        .into_iter()
        .map(|(nature, (cpfs, count, total))| NatureSummary {
            nature: nature.to_string(),
            unique_subjects: cpfs.len(),
            payment_count: count,
            total,
        })
        .collect();
    summaries.sort_by(|a, b| b.payment_count.cmp(&a.payment_count));
    summaries
}

/// Consolidated view of the selected competences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetenceOverview {
    pub competences: Vec<String>,
    pub beneficiaries: usize,
    pub payment_count: usize,
    pub total: Decimal,
    pub withheld: Decimal,
    pub natures: Vec<NatureSummary>,
}

pub fn overview(competences: &[String], records: &[SubjectRecord]) -> CompetenceOverview {
    let rows = payment_rows(records);
    let beneficiaries: BTreeSet<&str> = rows.iter().map(|row| row.cpf.as_str()).collect();
    CompetenceOverview {
        competences: competences.to_vec(),
        beneficiaries: beneficiaries.len(),
        payment_count: rows.len(),
        total: rows.iter().map(|row| row.amount).sum(),
        withheld: records
            .iter()
            .flat_map(|record| record.payments.iter())
            .map(|payment| payment.withheld())
            .sum(),
        natures: summarize_by_nature(&rows),
    }
}

fn export_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Export(e.to_string())
}

fn write_csv<I>(header: &[&str], rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(UTF8_BOM.to_vec());
    writer.write_record(header).map_err(export_error)?;
    for row in rows {
        writer.write_record(&row).map_err(export_error)?;
    }
    writer.into_inner().map_err(export_error)
}

pub fn detailed_csv(rows: &[PaymentRow]) -> Result<Vec<u8>> {
    write_csv(
        &DETAILED_HEADER,
        rows.iter().map(|row| {
            vec![
                format_cpf(&row.cpf),
                format_decimal_comma(row.amount),
                row.nature.clone(),
                row.period.clone(),
                row.file.clone(),
            ]
        }),
    )
}

pub fn summary_csv(summaries: &[NatureSummary]) -> Result<Vec<u8>> {
    write_csv(
        &SUMMARY_HEADER,
        summaries.iter().map(|summary| {
            vec![
                summary.nature.clone(),
                summary.unique_subjects.to_string(),
                summary.payment_count.to_string(),
                format_decimal_comma(summary.total),
            ]
        }),
    )
}

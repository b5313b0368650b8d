use crate::report::aggregate::{format_money, group_by_period, ConsolidatedRecord};
use crate::report::receipt::{ReceiptTotals, IN2060_TEMPLATE};
use serde::Serialize;

/// Usable width of an A4 page with 10 mm margins.
pub const CONTENT_WIDTH_MM: f32 = 190.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub text: String,
    pub width_mm: f32,
    pub align: Align,
}

impl Cell {
    pub fn new(text: impl Into<String>, width_mm: f32, align: Align) -> Self {
        Self {
            text: text.into(),
            width_mm,
            align,
        }
    }

    pub fn left(text: impl Into<String>, width_mm: f32) -> Self {
        Self::new(text, width_mm, Align::Left)
    }

    pub fn right(text: impl Into<String>, width_mm: f32) -> Self {
        Self::new(text, width_mm, Align::Right)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Centered, large.
    Heading(String),
    SectionTitle(String),
    Text(String),
    Row(Vec<Cell>),
    Spacer(f32),
}

/// Renderer-independent description of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLayout {
    pub title: String,
    /// Repeated at the top of every page.
    pub header: Vec<String>,
    /// Footer text; `{page}` is replaced by the page number.
    pub footer: String,
    pub blocks: Vec<Block>,
}

pub fn simple_receipt_file_name(subject: &str, apportionment_period: &str) -> String {
    format!("Comprovante_IRRF_{subject}_{apportionment_period}.pdf")
}

pub fn in2060_file_name(subject: &str, calendar_year: &str) -> String {
    format!("Comprovante_IN2060_{subject}_{calendar_year}.pdf")
}

fn label_row(label: &str, value: &str, label_width: f32) -> Block {
    Block::Row(vec![
        Cell::left(label, label_width),
        Cell::left(value, CONTENT_WIDTH_MM - label_width),
    ])
}

fn money_row(label: &str, value: &str) -> Block {
    Block::Row(vec![Cell::left(label, 100.0), Cell::right(value, CONTENT_WIDTH_MM - 100.0)])
}

/// Per-period payment listing for one subject.
pub fn simple_receipt_layout(record: &ConsolidatedRecord) -> DocumentLayout {
    let title = format!(
        "INFORME DE IMPOSTO DE RENDA RETIDO NA FONTE ({})",
        record.source.label()
    );
    let mut blocks = vec![
        Block::Heading(title.clone()),
        Block::Spacer(5.0),
        Block::SectionTitle("Informações Básicas:".to_string()),
        label_row("CPF do Beneficiário:", &record.subject_id, 60.0),
        label_row("Período de Apuração:", &record.apportionment_period, 60.0),
        label_row("CNPJ do Empregador:", &record.employer_id, 60.0),
        Block::Spacer(5.0),
    ];

    for (period, payments) in group_by_period(record) {
        blocks.push(Block::SectionTitle(format!("Competência: {period}")));
        for payment in &payments {
            blocks.push(Block::Text(format!(
                "Data do Pagamento: {}",
                payment.payment_date
            )));
            blocks.push(label_row("Tipo de Pagamento:", &payment.payment_type, 60.0));

            if !payment.income.is_empty() {
                blocks.push(Block::Text("Informações de IR:".to_string()));
                for info in &payment.income {
                    blocks.push(money_row(
                        &format!("Tipo {}:", info.code),
                        &format_money(info.amount),
                    ));
                }
            }

            if let Some(totals) = &payment.totals {
                blocks.push(Block::Text("Totalização Mensal:".to_string()));
                blocks.push(money_row(
                    "Rendimentos Tributáveis:",
                    &format_money(totals.gross_taxable),
                ));
                blocks.push(money_row("Valor do IRRF:", &format_money(totals.withheld_tax)));
            }

            if !payment.dependents.is_empty() {
                blocks.push(Block::Text(format!("Dependentes ({period}):")));
                for dep in &payment.dependents {
                    blocks.push(Block::Row(vec![
                        Cell::left(format!("Nome: {}", dep.name), 60.0),
                        Cell::left(format!("CPF: {}", dep.cpf), CONTENT_WIDTH_MM - 60.0),
                    ]));
                }
            }
            blocks.push(Block::Spacer(3.0));
        }
        blocks.push(Block::Spacer(5.0));
    }

    DocumentLayout {
        title: title.clone(),
        header: vec![title],
        footer: "Página {page}".to_string(),
        blocks,
    }
}

/// Official receipt layout. Zero lines are omitted except the taxable total
/// and the withheld tax lines.
pub fn in2060_receipt_layout(totals: &ReceiptTotals) -> DocumentLayout {
    let meta = &totals.metadata;
    let mut blocks = vec![
        Block::Row(vec![
            Cell::left("Exercício:", 40.0),
            Cell::new(meta.assessment_year.clone(), 40.0, Align::Center),
            Cell::left("Ano-calendário:", 40.0),
            Cell::new(meta.calendar_year.clone(), 70.0, Align::Center),
        ]),
        Block::Spacer(3.0),
        Block::SectionTitle("QUADRO 1 - FONTE PAGADORA".to_string()),
        label_row("CNPJ:", &meta.employer_id, 30.0),
        Block::Spacer(3.0),
        Block::SectionTitle("QUADRO 2 - PESSOA FÍSICA BENEFICIÁRIA".to_string()),
        label_row("CPF:", &meta.subject_id, 30.0),
        label_row("Nome:", &meta.subject_name, 30.0),
        label_row("Natureza:", &meta.income_nature, 30.0),
        Block::Spacer(3.0),
    ];

    for section in IN2060_TEMPLATE {
        blocks.push(Block::SectionTitle(section.title.to_uppercase()));
        for (line, label) in section.lines {
            let value = totals.line(section.id, line);
            if value.is_zero() && *line != "linha1" && *line != "linha5" {
                continue;
            }
            blocks.push(Block::Row(vec![
                Cell::left(*label, 120.0),
                Cell::right(format_money(value), 70.0),
            ]));
        }
        blocks.push(Block::Spacer(3.0));
    }

    DocumentLayout {
        title: "Comprovante de Rendimentos IN RFB 2060/2021".to_string(),
        header: vec![
            "COMPROVANTE DE RENDIMENTOS PAGOS".to_string(),
            "E DE IMPOSTO SOBRE A RENDA RETIDO NA FONTE".to_string(),
        ],
        footer: "Página {page} - Conforme IN RFB nº 2060/2021".to_string(),
        blocks,
    }
}

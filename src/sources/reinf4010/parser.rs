use crate::codes::NAT_REND;
use crate::sources::ExtractContext;
use crate::types::{IncomeInfo, MonthlyTotals, PaymentEvent, SourceKind, SubjectRecord};
use crate::xml_tree::ElementRef;
use rust_decimal::Decimal;

pub const EVENT_ELEMENT: &str = "evtRetPF";

/// Distinct beneficiary CPFs in document order.
pub fn extract_beneficiaries(event: ElementRef<'_>) -> Vec<String> {
    let mut cpfs: Vec<String> = Vec::new();
    for benef in event.find_all("ideBenef") {
        if let Some(cpf) = benef.field("cpfBenef").filter(|cpf| !cpf.is_empty()) {
            if !cpfs.iter().any(|known| known == cpf) {
                cpfs.push(cpf.to_string());
            }
        }
    }
    cpfs
}

/// One record per beneficiary. Files without `perApur` or the contributor
/// number carry nothing usable and yield no records.
pub fn parse_payment_event(event: ElementRef<'_>, context: &ExtractContext<'_>) -> Vec<SubjectRecord> {
    let (Some(ide_evento), Some(ide_contri)) = (event.child("ideEvento"), event.child("ideContri"))
    else {
        return Vec::new();
    };

    let per_apur = ide_evento.string("perApur");
    let employer_id = ide_contri.string("nrInsc");
    if per_apur.is_empty() || employer_id.is_empty() {
        return Vec::new();
    }

    let mut records: Vec<SubjectRecord> = Vec::new();
    for estab in event.find_all("ideEstab") {
        for benef in estab.children("ideBenef") {
            let cpf = benef.string("cpfBenef");
            let payments: Vec<PaymentEvent> = benef
                .children("idePgto")
                .flat_map(|ide_pgto| parse_payments(ide_pgto, &per_apur, context))
                .collect();

            match records.iter_mut().find(|r| r.subject_id == cpf) {
                Some(existing) => existing.payments.extend(payments),
                None => records.push(SubjectRecord {
                    source: SourceKind::Reinf4010,
                    file_name: context.file_name.to_string(),
                    receipt_number: ide_evento.string("nrRecArqBase"),
                    apportionment_period: per_apur.clone(),
                    employer_kind: ide_contri.string("tpInsc"),
                    employer_id: employer_id.clone(),
                    subject_id: cpf,
                    payments,
                    dependents: Vec::new(),
                    deductions: Vec::new(),
                }),
            }
        }
    }
    records
}

fn parse_payments(
    ide_pgto: ElementRef<'_>,
    per_apur: &str,
    context: &ExtractContext<'_>,
) -> Vec<PaymentEvent> {
    let nat_rend = ide_pgto.string("natRend");
    let nature = context
        .catalog
        .describe(NAT_REND, &nat_rend, context.corrections);

    ide_pgto
        .children("infoPgto")
        .map(|info| {
            let gross = info.amount("vlrRendBruto");
            let exempt = info
                .child("rendIsento")
                .map(|r| r.amount("vlrIsento"))
                .unwrap_or(Decimal::ZERO);
            let withheld = info
                .child("retPgto")
                .map(|r| r.amount("vlrRetIR"))
                .unwrap_or(Decimal::ZERO);
            let note = info.string("observ");
            let competence = info.field("compFP").filter(|c| !c.is_empty()).map(str::to_string);

            PaymentEvent {
                period: per_apur.to_string(),
                payment_date: info.string("dtFG"),
                payment_type: String::new(),
                reference_id: String::new(),
                category_code: nat_rend.clone(),
                category_description: nature.text.clone(),
                income: vec![IncomeInfo {
                    code: nat_rend.clone(),
                    description: nature.text.clone(),
                    status: nature.status,
                    amount: gross,
                    note: note.clone(),
                }],
                totals: Some(MonthlyTotals {
                    reference: String::new(),
                    gross_taxable: gross,
                    official_pension: Decimal::ZERO,
                    withheld_tax: withheld,
                    exempt,
                    note,
                }),
                dependents: Vec::new(),
                deductions: Vec::new(),
                competence,
                source_file: context.file_name.to_string(),
            }
        })
        .collect()
}

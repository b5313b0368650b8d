use crate::codes::{COD_CATEG, TP_DEP, TP_INFO_IR};
use crate::sources::ExtractContext;
use crate::types::{
    Dependent, DependentDeduction, IncomeInfo, MonthlyTotals, PaymentEvent, SourceKind,
    SubjectRecord,
};
use crate::xml_tree::{field_or_empty, ElementRef};

pub const EVENT_ELEMENT: &str = "evtIrrfBenef";

/// CPF of the worker, `None` when absent or blank.
pub fn extract_beneficiary(event: ElementRef<'_>) -> Option<String> {
    event
        .find("ideTrabalhador")
        .and_then(|worker| worker.field("cpfBenef"))
        .filter(|cpf| !cpf.is_empty())
        .map(str::to_string)
}

pub fn parse_irrf_event(event: ElementRef<'_>, context: &ExtractContext<'_>) -> SubjectRecord {
    let ide_evento = event.child("ideEvento");
    let ide_empregador = event.child("ideEmpregador");
    let ide_trabalhador = event.child("ideTrabalhador");

    let payments = ide_trabalhador
        .map(|worker| {
            worker
                .children("dmDev")
                .map(|dm_dev| parse_demonstrative(dm_dev, context))
                .collect()
        })
        .unwrap_or_default();

    let mut record = SubjectRecord {
        source: SourceKind::S5002,
        file_name: context.file_name.to_string(),
        receipt_number: field_or_empty(ide_evento, "nrRecArqBase"),
        apportionment_period: field_or_empty(ide_evento, "perApur"),
        employer_kind: field_or_empty(ide_empregador, "tpInsc"),
        employer_id: field_or_empty(ide_empregador, "nrInsc"),
        subject_id: field_or_empty(ide_trabalhador, "cpfBenef"),
        payments,
        dependents: Vec::new(),
        deductions: Vec::new(),
    };
    record.consolidate_dependents();
    record
}

fn parse_demonstrative(dm_dev: ElementRef<'_>, context: &ExtractContext<'_>) -> PaymentEvent {
    let period = dm_dev.string("perRef");
    let category_code = dm_dev.string("codCateg");
    let category = context
        .catalog
        .describe(COD_CATEG, &category_code, context.corrections);

    let income = dm_dev
        .children("infoIR")
        .map(|info| {
            let code = info.string("tpInfoIR");
            let resolved = context
                .catalog
                .describe(TP_INFO_IR, &code, context.corrections);
            IncomeInfo {
                code,
                description: resolved.text,
                status: resolved.status,
                amount: info.amount("valor"),
                note: info.string("descRendimento"),
            }
        })
        .collect();

    let totals = dm_dev.child("totApurMen").map(|tot| MonthlyTotals {
        reference: tot.string("CRMen"),
        gross_taxable: tot.amount("vlrRendTrib"),
        official_pension: tot.amount("vlrPrevOficial"),
        withheld_tax: tot.amount("vlrCRMen"),
        exempt: tot.amount("vlrIsenOutros"),
        note: tot.string("descRendimento"),
    });

    let mut dependents = Vec::new();
    let mut deductions = Vec::new();
    if let Some(complem) = dm_dev.child("infoIRComplem") {
        for dep in complem.children("ideDep") {
            let kind_code = dep.string("tpDep");
            let kind = context
                .catalog
                .describe(TP_DEP, &kind_code, context.corrections);
            dependents.push(Dependent {
                cpf: dep.string("cpfDep"),
                irrf_dependent: dep.string("depIRRF"),
                birth_date: dep.string("dtNascto"),
                name: dep.string("nome"),
                kind_code,
                kind_description: kind.text,
                period: period.clone(),
            });
        }

        for info_ircr in complem.children("infoIRCR") {
            for ded in info_ircr.children("dedDepen") {
                deductions.push(DependentDeduction {
                    income_type: ded.string("tpRend"),
                    cpf: ded.string("cpfDep"),
                    amount: ded.amount("vlrDedDep"),
                    period: period.clone(),
                });
            }
        }
    }

    PaymentEvent {
        period,
        payment_date: dm_dev.string("dtPgto"),
        payment_type: dm_dev.string("tpPgto"),
        reference_id: dm_dev.string("ideDmDev"),
        category_code,
        category_description: category.text,
        income,
        totals,
        dependents,
        deductions,
        competence: None,
        source_file: context.file_name.to_string(),
    }
}

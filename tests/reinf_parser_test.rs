mod common;

use common::{load_fixture, seed_rules, test_catalog, write_file, REINF_NS};
use informe::codes::{CodeStatus, BUILT_IN_NAT_REND, NAT_REND};
use informe::sources::reinf4010::discover::{
    discover_reinf_files, files_by_competence, is_competence, list_competences,
};
use informe::sources::{adapter_for, extract_records, extract_subjects, ExtractContext};
use informe::types::{SourceKind, SubjectRecord};
use rust_decimal::Decimal;

fn extract(xml: &str) -> Vec<SubjectRecord> {
    let catalog = test_catalog().with_defaults(NAT_REND, BUILT_IN_NAT_REND);
    let rules = seed_rules();
    let context = ExtractContext {
        file_name: "2024-02/REINF_4010.xml",
        catalog: &catalog,
        corrections: &rules,
    };
    extract_records(adapter_for(SourceKind::Reinf4010), xml.as_bytes(), &[], &context)
        .expect("R-4010 fixture should extract")
}

#[test]
fn one_record_per_beneficiary() {
    let records = extract(&load_fixture("reinf_4010_multi.xml"));
    let cpfs: Vec<&str> = records.iter().map(|r| r.subject_id.as_str()).collect();
    assert_eq!(cpfs, vec!["11111111111", "22222222222"]);

    for record in &records {
        assert_eq!(record.source, SourceKind::Reinf4010);
        assert_eq!(record.apportionment_period, "2024-02");
        assert_eq!(record.employer_id, "11222333");
        assert_eq!(record.file_name, "2024-02/REINF_4010.xml");
    }
}

#[test]
fn each_payment_carries_nature_and_amounts() {
    let records = extract(&load_fixture("reinf_4010_multi.xml"));
    let first = &records[0];
    assert_eq!(first.payments.len(), 2);

    let jeton = &first.payments[0];
    assert_eq!(jeton.period, "2024-02");
    assert_eq!(jeton.payment_date, "2024-02-10");
    assert_eq!(jeton.category_code, "10004");
    assert_eq!(jeton.category_description, "Jetons");
    assert_eq!(jeton.competence.as_deref(), Some("2024-02"));
    assert_eq!(jeton.gross(), Decimal::new(150050, 2));
    assert_eq!(jeton.withheld(), Decimal::new(12004, 2));
    assert_eq!(jeton.income[0].note, "Jeton de conselho");
    assert_eq!(jeton.income[0].status, CodeStatus::Exact);

    let exempt = &first.payments[1];
    assert_eq!(exempt.competence, None);
    assert_eq!(exempt.totals.as_ref().unwrap().exempt, Decimal::new(30000, 2));
    assert_eq!(exempt.withheld(), Decimal::ZERO);

    let rent = &records[1].payments[0];
    assert_eq!(rent.category_description, "Rendimentos de aluguéis");
    assert_eq!(rent.gross(), Decimal::new(200000, 2));
}

#[test]
fn repeated_beneficiary_is_merged() {
    let xml = format!(
        r#"<Reinf xmlns="{REINF_NS}"><evtRetPF>
            <ideEvento><perApur>2024-03</perApur></ideEvento>
            <ideContri><tpInsc>1</tpInsc><nrInsc>99</nrInsc></ideContri>
            <ideEstab><ideBenef><cpfBenef>1</cpfBenef>
                <idePgto><natRend>10002</natRend><infoPgto><vlrRendBruto>10</vlrRendBruto></infoPgto></idePgto>
            </ideBenef></ideEstab>
            <ideEstab><ideBenef><cpfBenef>1</cpfBenef>
                <idePgto><natRend>10003</natRend><infoPgto><vlrRendBruto>20</vlrRendBruto></infoPgto></idePgto>
            </ideBenef></ideEstab>
        </evtRetPF></Reinf>"#
    );
    let records = extract(&xml);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payments.len(), 2);
    assert_eq!(records[0].payments[1].category_description, "Ajudas de custo");
}

#[test]
fn missing_period_or_contributor_yields_nothing() {
    let without_period = format!(
        r#"<Reinf xmlns="{REINF_NS}"><evtRetPF>
            <ideEvento><perApur></perApur></ideEvento>
            <ideContri><nrInsc>99</nrInsc></ideContri>
            <ideEstab><ideBenef><cpfBenef>1</cpfBenef></ideBenef></ideEstab>
        </evtRetPF></Reinf>"#
    );
    assert!(extract(&without_period).is_empty());

    let without_contributor = format!(
        r#"<Reinf xmlns="{REINF_NS}"><evtRetPF>
            <ideEvento><perApur>2024-01</perApur></ideEvento>
            <ideEstab><ideBenef><cpfBenef>1</cpfBenef></ideBenef></ideEstab>
        </evtRetPF></Reinf>"#
    );
    assert!(extract(&without_contributor).is_empty());
}

#[test]
fn subject_extraction_returns_distinct_cpfs() {
    let xml = load_fixture("reinf_4010_multi.xml");
    let subjects = extract_subjects(
        adapter_for(SourceKind::Reinf4010),
        "REINF.xml",
        xml.as_bytes(),
        &[],
    )
    .unwrap();
    assert_eq!(subjects, vec!["11111111111".to_string(), "22222222222".to_string()]);
}

#[test]
fn competence_names_are_validated() {
    assert!(is_competence("2024-02"));
    assert!(is_competence("2023-12"));
    assert!(!is_competence("2024-13"));
    assert!(!is_competence("2024-2"));
    assert!(!is_competence("backup"));
}

#[test]
fn competences_and_files_are_discovered() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    write_file(base, "2024-01/REINF_4010_jan.xml", "<a/>");
    write_file(base, "2024-02/reinf_4010_fev.xml", "<a/>");
    write_file(base, "2024-02/R-2010.xml", "<a/>");
    write_file(base, "2024-02/REINF_leia.txt", "x");
    write_file(base, "2024-13/REINF.xml", "<a/>");
    write_file(base, "2024-03/outro.xml", "<a/>");
    write_file(base, "REINF_raiz.xml", "<a/>");

    assert_eq!(list_competences(base).unwrap(), vec!["2024-03", "2024-02", "2024-01"]);

    let grouped = files_by_competence(base, &[]).unwrap();
    let names: Vec<&str> = grouped.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(names, vec!["2024-02", "2024-01"]);
    assert_eq!(grouped[0].1.len(), 1);
    assert!(grouped[0].1[0].ends_with("reinf_4010_fev.xml"));

    let selected = files_by_competence(base, &["2024-01".to_string(), "2025-01".to_string()]).unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].0, "2024-01");

    assert_eq!(discover_reinf_files(base).unwrap().len(), 2);
    assert!(list_competences(&base.join("ausente")).is_err());
}

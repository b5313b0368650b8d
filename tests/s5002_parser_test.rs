mod common;

use common::{load_fixture, s5002_xml, seed_rules, test_catalog, S5002_NS};
use informe::codes::CodeStatus;
use informe::sources::s5002::discover::{discover_s5002_files, looks_like_s5002};
use informe::sources::{adapter_for, extract_records, extract_subjects, ExtractContext};
use informe::types::{SourceKind, SubjectRecord};
use rust_decimal::Decimal;

fn extract(file_name: &str, xml: &str) -> Vec<SubjectRecord> {
    let catalog = test_catalog();
    let rules = seed_rules();
    let context = ExtractContext {
        file_name,
        catalog: &catalog,
        corrections: &rules,
    };
    extract_records(adapter_for(SourceKind::S5002), xml.as_bytes(), &[], &context)
        .expect("S-5002 fixture should extract")
}

#[test]
fn extracts_identification_fields() {
    let records = extract("s5002_basic.xml", &load_fixture("s5002_basic.xml"));
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.source, SourceKind::S5002);
    assert_eq!(record.file_name, "s5002_basic.xml");
    assert_eq!(record.subject_id, "12345678901");
    assert_eq!(record.apportionment_period, "2024-01");
    assert_eq!(record.receipt_number, "1.1.0000000012345678901");
    assert_eq!(record.employer_kind, "1");
    assert_eq!(record.employer_id, "12345678");
}

#[test]
fn extracts_income_lines_and_monthly_totals() {
    let records = extract("s5002_basic.xml", &load_fixture("s5002_basic.xml"));
    let payment = &records[0].payments[0];

    assert_eq!(payment.period, "2024-01");
    assert_eq!(payment.payment_date, "2024-01-31");
    assert_eq!(payment.reference_id, "FOLHA-01");
    assert_eq!(payment.category_code, "101");
    assert!(payment.category_description.starts_with("Empregado - Geral"));
    assert_eq!(payment.competence, None);

    assert_eq!(payment.income.len(), 2);
    assert_eq!(payment.income[0].code, "11");
    assert_eq!(payment.income[0].description, "Remuneração mensal");
    assert_eq!(payment.income[0].amount, Decimal::new(100000, 2));
    assert_eq!(payment.income[1].amount, Decimal::new(11000, 2));

    let totals = payment.totals.as_ref().expect("totApurMen present");
    assert_eq!(totals.reference, "056107");
    assert_eq!(totals.gross_taxable, Decimal::new(89000, 2));
    assert_eq!(totals.withheld_tax, Decimal::new(1550, 2));
    assert_eq!(payment.gross(), Decimal::new(111000, 2));
    assert_eq!(payment.net(), Decimal::new(109450, 2));
}

#[test]
fn dependents_are_copied_to_record_level() {
    let records = extract("s5002_basic.xml", &load_fixture("s5002_basic.xml"));
    let record = &records[0];

    assert_eq!(record.dependents.len(), 1);
    let dependent = &record.dependents[0];
    assert_eq!(dependent.name, "MARIA DA SILVA");
    assert_eq!(dependent.kind_code, "03");
    assert_eq!(dependent.kind_description, "Filho(a) ou enteado(a) (código: 03)");
    assert_eq!(dependent.period, "2024-01");

    assert_eq!(record.deductions.len(), 1);
    assert_eq!(record.deductions[0].amount, Decimal::new(18959, 2));
    assert_eq!(record.deductions[0].income_type, "11");
}

#[test]
fn uncataloged_code_is_kept_with_sentinel() {
    let records = extract("s5002_february.xml", &load_fixture("s5002_february.xml"));
    let info = &records[0].payments[0].income[1];

    assert_eq!(info.code, "999");
    assert_eq!(info.status, CodeStatus::Uncataloged);
    assert_eq!(info.description, "Código 999 não catalogado no sistema");
    assert_eq!(info.note, "Verba sem tabela");
    assert!(records[0].payments[0].totals.is_none());
}

#[test]
fn missing_sections_default_to_empty() {
    let xml = format!(
        r#"<eSocial xmlns="{S5002_NS}"><evtIrrfBenef><ideTrabalhador><cpfBenef>1</cpfBenef></ideTrabalhador></evtIrrfBenef></eSocial>"#
    );
    let records = extract("minimal.xml", &xml);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].subject_id, "1");
    assert_eq!(records[0].apportionment_period, "");
    assert!(records[0].payments.is_empty());
}

#[test]
fn subject_extraction_skips_blank_cpf() {
    let adapter = adapter_for(SourceKind::S5002);
    let xml = s5002_xml(S5002_NS, "", "2024-01", &[("11", "1.00")]);
    assert!(extract_subjects(adapter, "blank.xml", xml.as_bytes(), &[])
        .unwrap()
        .is_empty());

    let xml = s5002_xml(S5002_NS, "55566677788", "2024-01", &[]);
    assert_eq!(
        extract_subjects(adapter, "one.xml", xml.as_bytes(), &[]).unwrap(),
        vec!["55566677788".to_string()]
    );
}

#[test]
fn discovery_lists_xml_files_and_prefilters_by_content() {
    let dir = tempfile::tempdir().unwrap();
    common::write_file(dir.path(), "b_evento.XML", &s5002_xml(S5002_NS, "1", "2024-01", &[]));
    common::write_file(dir.path(), "a_S-5002.xml", "<vazio/>");
    common::write_file(dir.path(), "notas.txt", "irrelevante");
    common::write_file(dir.path(), "outro.xml", "<evtRetPF/>");
    common::write_file(dir.path(), "sub/c.xml", &s5002_xml(S5002_NS, "2", "2024-01", &[]));

    let files = discover_s5002_files(dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a_S-5002.xml", "b_evento.XML", "outro.xml"]);

    assert!(looks_like_s5002(&files[0]));
    assert!(looks_like_s5002(&files[1]));
    assert!(!looks_like_s5002(&files[2]));
}

#[test]
fn discovery_of_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = discover_s5002_files(&dir.path().join("ausente")).unwrap_err();
    assert!(matches!(err, informe::error::ReportError::MissingDirectory(_)));
}

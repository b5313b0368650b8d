#![allow(dead_code)]
use informe::codes::{CodeCatalog, CorrectionRules};
use informe::sources::configs::SourceSettings;
use informe::xml_tree::RawDocument;
use std::path::{Path, PathBuf};

pub const S5002_NS: &str = "http://www.esocial.gov.br/schema/evt/evtIrrfBenef/v_S_01_02_00";
pub const REINF_NS: &str = "http://www.reinf.esocial.gov.br/schemas/evt4010PagtoBeneficiarioPF/v2_01_02";

pub fn fixtures_dir() -> String {
    format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

pub fn fixture_path(filename: &str) -> PathBuf {
    Path::new(&fixtures_dir()).join(filename)
}

pub fn load_fixture(filename: &str) -> String {
    let path = fixture_path(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

pub fn parse(xml: &str) -> RawDocument {
    RawDocument::parse_str(xml).expect("fixture XML should parse")
}

pub fn test_catalog() -> CodeCatalog {
    CodeCatalog::load(Some(&fixture_path("codigos_s5002.json")))
}

pub fn seed_rules() -> CorrectionRules {
    CorrectionRules::seed()
}

/// One S-5002 event with a single `dmDev` holding the given `infoIR` lines.
pub fn s5002_xml(namespace: &str, cpf: &str, per_apur: &str, income: &[(&str, &str)]) -> String {
    let info_ir: String = income
        .iter()
        .map(|(code, value)| {
            format!("<infoIR><tpInfoIR>{code}</tpInfoIR><valor>{value}</valor></infoIR>")
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<eSocial xmlns="{namespace}">
  <evtIrrfBenef Id="ID1">
    <ideEvento><nrRecArqBase>REC-{per_apur}</nrRecArqBase><perApur>{per_apur}</perApur></ideEvento>
    <ideEmpregador><tpInsc>1</tpInsc><nrInsc>12345678</nrInsc></ideEmpregador>
    <ideTrabalhador>
      <cpfBenef>{cpf}</cpfBenef>
      <dmDev>
        <perRef>{per_apur}</perRef>
        <ideDmDev>D1</ideDmDev>
        <tpPgto>1</tpPgto>
        <dtPgto>{per_apur}-28</dtPgto>
        <codCateg>101</codCateg>
        {info_ir}
      </dmDev>
    </ideTrabalhador>
  </evtIrrfBenef>
</eSocial>"#
    )
}

/// Settings for a module reading `base_dir` and caching under `cache_dir`.
pub fn settings(base_dir: &Path, cache_dir: &Path) -> SourceSettings {
    let mut settings = SourceSettings::new(base_dir, cache_dir);
    settings.codes_file = Some(fixture_path("codigos_s5002.json"));
    settings
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    std::fs::write(&path, content).expect("write fixture file");
    path
}

use crate::error::Result;
use crate::sources::reinf4010::discover::discover_reinf_files;
use crate::sources::reinf4010::parser::{extract_beneficiaries, parse_payment_event, EVENT_ELEMENT};
use crate::sources::{ExtractContext, SourceAdapter};
use crate::types::{SourceKind, SubjectRecord};
use crate::xml_tree::ElementRef;
use std::path::{Path, PathBuf};

pub struct Reinf4010Adapter;

pub const REINF4010_ADAPTER: Reinf4010Adapter = Reinf4010Adapter;

const NAMESPACES: &[(&str, &str)] = &[
    ("ns1", "http://www.reinf.esocial.gov.br/schemas/evt4010PagtoBeneficiarioPF/v2_01_02"),
    ("ns2", "http://www.reinf.esocial.gov.br/schemas/evt4010PagtoBeneficiarioPF/v2_01_01"),
    ("ns3", "http://www.reinf.esocial.gov.br/schemas/evt4010PagtoBeneficiarioPF/v2_01_00"),
    ("ns4", "http://www.reinf.esocial.gov.br/schemas/evt4010PagtoBeneficiarioPF/v1_06_00"),
    ("ns5", "http://www.reinf.esocial.gov.br/schemas/evt4010PagtoBeneficiarioPF/v1_05_01"),
];

impl SourceAdapter for Reinf4010Adapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Reinf4010
    }

    fn root_element(&self) -> &'static str {
        EVENT_ELEMENT
    }

    fn known_namespaces(&self) -> &'static [(&'static str, &'static str)] {
        NAMESPACES
    }

    fn discover(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        discover_reinf_files(base_dir)
    }

    fn extract_subjects(&self, event: ElementRef<'_>) -> Vec<String> {
        extract_beneficiaries(event)
    }

    fn extract(&self, event: ElementRef<'_>, context: &ExtractContext<'_>) -> Vec<SubjectRecord> {
        parse_payment_event(event, context)
    }
}

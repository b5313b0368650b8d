use crate::error::Result;
use crate::sources::s5002::discover::{discover_s5002_files, looks_like_s5002};
use crate::sources::s5002::parser::{extract_beneficiary, parse_irrf_event, EVENT_ELEMENT};
use crate::sources::{ExtractContext, SourceAdapter};
use crate::types::{SourceKind, SubjectRecord};
use crate::xml_tree::ElementRef;
use std::path::{Path, PathBuf};

pub struct S5002Adapter;

pub const S5002_ADAPTER: S5002Adapter = S5002Adapter;

const NAMESPACES: &[(&str, &str)] = &[
    ("ns1", "http://www.esocial.gov.br/schema/evt/evtIrrfBenef/v_S_01_03_00"),
    ("ns2", "http://www.esocial.gov.br/schema/evt/evtIrrfBenef/v_S_01_02_00"),
    ("ns3", "http://www.esocial.gov.br/schema/evt/evtIrrfBenef/v_S_01_01_00"),
    ("ns4", "http://www.esocial.gov.br/schema/evt/evtIrrfBenef/v02_05_00"),
    ("ns5", "http://www.esocial.gov.br/schema/evt/evtIrrfBenef/v02_04_02"),
];

impl SourceAdapter for S5002Adapter {
    fn kind(&self) -> SourceKind {
        SourceKind::S5002
    }

    fn root_element(&self) -> &'static str {
        EVENT_ELEMENT
    }

    fn known_namespaces(&self) -> &'static [(&'static str, &'static str)] {
        NAMESPACES
    }

    fn discover(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        discover_s5002_files(base_dir)
    }

    fn quick_check(&self, path: &Path) -> bool {
        looks_like_s5002(path)
    }

    fn extract_subjects(&self, event: ElementRef<'_>) -> Vec<String> {
        extract_beneficiary(event).into_iter().collect()
    }

    fn extract(&self, event: ElementRef<'_>, context: &ExtractContext<'_>) -> Vec<SubjectRecord> {
        vec![parse_irrf_event(event, context)]
    }
}

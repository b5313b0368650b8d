use crate::codes::{CodeCatalog, CorrectionRules};
use crate::error::{ReportError, Result};
use crate::sources::common::{module_root, namespace_candidates, parse_document, resolve_namespace};
use crate::types::{SourceKind, SubjectRecord};
use crate::xml_tree::ElementRef;
use std::path::{Path, PathBuf};

pub mod common;
pub mod configs;
pub mod reinf4010;
pub mod s5002;

/// Borrowed state the extractor needs to resolve codes while walking a file.
pub struct ExtractContext<'a> {
    pub file_name: &'a str,
    pub catalog: &'a CodeCatalog,
    pub corrections: &'a CorrectionRules,
}

pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Local name of the event element, e.g. `evtIrrfBenef`.
    fn root_element(&self) -> &'static str;

    /// Known `(alias, uri)` pairs, most recent schema first.
    fn known_namespaces(&self) -> &'static [(&'static str, &'static str)];

    /// Lists candidate files under the module's base directory.
    fn discover(&self, base_dir: &Path) -> Result<Vec<PathBuf>>;

    /// Cheap pre-filter applied before a file is read in full.
    fn quick_check(&self, _path: &Path) -> bool {
        true
    }

    /// Subject ids mentioned by the event, used to build the index.
    fn extract_subjects(&self, event: ElementRef<'_>) -> Vec<String>;

    fn extract(&self, event: ElementRef<'_>, context: &ExtractContext<'_>) -> Vec<SubjectRecord>;
}

pub fn adapter_for(source: SourceKind) -> &'static dyn SourceAdapter {
    match source {
        SourceKind::S5002 => &s5002::adapter::S5002_ADAPTER,
        SourceKind::Reinf4010 => &reinf4010::adapter::REINF4010_ADAPTER,
    }
}

/// Parses raw bytes and hands the resolved event element to `visit`.
///
/// Fails when the XML is malformed or when no known (or fallback) namespace
/// carries the event element. A resolved namespace without the event
/// element yields `T::default()`.
pub fn with_event<T: Default>(
    adapter: &dyn SourceAdapter,
    file_name: &str,
    bytes: &[u8],
    extra_namespaces: &[String],
    visit: impl FnOnce(ElementRef<'_>) -> T,
) -> Result<T> {
    let doc = parse_document(file_name, bytes)?;
    let candidates = namespace_candidates(adapter.known_namespaces(), extra_namespaces);
    let ns = resolve_namespace(&doc, &candidates, adapter.root_element()).ok_or_else(|| {
        ReportError::UnresolvedNamespace {
            file: file_name.to_string(),
        }
    })?;
    match module_root(&doc, &ns, adapter.root_element()) {
        Some(root) => {
            tracing::trace!(
                "{file_name}: {} via namespace {}",
                doc.element(root).expanded_name(),
                ns.alias
            );
            Ok(visit(doc.scoped(&ns.uri, root)))
        }
        None => Ok(T::default()),
    }
}

/// Full extraction of one file's bytes.
pub fn extract_records(
    adapter: &dyn SourceAdapter,
    bytes: &[u8],
    extra_namespaces: &[String],
    context: &ExtractContext<'_>,
) -> Result<Vec<SubjectRecord>> {
    with_event(adapter, context.file_name, bytes, extra_namespaces, |event| {
        adapter.extract(event, context)
    })
}

/// Subject-only extraction of one file's bytes.
pub fn extract_subjects(
    adapter: &dyn SourceAdapter,
    file_name: &str,
    bytes: &[u8],
    extra_namespaces: &[String],
) -> Result<Vec<String>> {
    with_event(adapter, file_name, bytes, extra_namespaces, |event| {
        adapter.extract_subjects(event)
    })
}

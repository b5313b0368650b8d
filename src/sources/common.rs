use crate::error::{ReportError, Result};
use crate::xml_tree::{NodeId, RawDocument};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    pub alias: String,
    pub uri: String,
}

/// Builds the ordered candidate list for a module: built-ins first, then
/// configured extras under `cfg1`, `cfg2`, ...
pub fn namespace_candidates(
    built_in: &[(&str, &str)],
    extra: &[String],
) -> Vec<(String, String)> {
    let mut candidates: Vec<(String, String)> = built_in
        .iter()
        .map(|(alias, uri)| (alias.to_string(), uri.to_string()))
        .collect();
    for (i, uri) in extra.iter().enumerate() {
        if candidates.iter().any(|(_, known)| known == uri) {
            continue;
        }
        candidates.push((format!("cfg{}", i + 1), uri.clone()));
    }
    candidates
}

/// Finds the namespace under which `root_element` lives.
///
/// Known URIs are tried in order. When none matches, every element whose
/// local name ends with `root_element` is considered and the namespace is
/// taken from the element itself.
pub fn resolve_namespace(
    doc: &RawDocument,
    candidates: &[(String, String)],
    root_element: &str,
) -> Option<NamespaceContext> {
    let root = doc.root()?;

    for (alias, uri) in candidates {
        if doc.find_first(root, uri, root_element).is_some() {
            return Some(NamespaceContext {
                alias: alias.clone(),
                uri: uri.clone(),
            });
        }
    }

    doc.iter()
        .find(|(_, el)| el.local_name.ends_with(root_element) && el.namespace.is_some())
        .and_then(|(_, el)| el.namespace.clone())
        .map(|uri| NamespaceContext {
            alias: "ns".to_string(),
            uri,
        })
}

/// Locates the module root element once the namespace is known.
pub fn module_root(doc: &RawDocument, ns: &NamespaceContext, root_element: &str) -> Option<NodeId> {
    let root = doc.root()?;
    doc.find_first(root, &ns.uri, root_element).or_else(|| {
        // Fallback resolution may have matched on a suffix only.
        doc.iter()
            .find(|(_, el)| {
                el.namespace.as_deref() == Some(ns.uri.as_str())
                    && el.local_name.ends_with(root_element)
            })
            .map(|(id, _)| id)
    })
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ReportError::io(path, e))
}

pub fn parse_document(file_name: &str, bytes: &[u8]) -> Result<RawDocument> {
    RawDocument::parse_bytes(bytes).map_err(|e| ReportError::Xml {
        file: file_name.to_string(),
        message: e.to_string(),
    })
}

/// Reads at most `limit` bytes from the start of a file, decoded leniently.
pub fn read_head(path: &Path, limit: usize) -> Option<String> {
    use std::io::Read;

    let file = std::fs::File::open(path).ok()?;
    let mut head = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut head).ok()?;
    Some(crate::xml_tree::decode_text(&head).into_owned())
}

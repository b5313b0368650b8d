use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::str::FromStr;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Element {
    /// Resolved namespace URI, `None` when the element is unqualified.
    pub namespace: Option<String>,
    pub local_name: String,
    pub text: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Element {
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }

    /// Clark notation, `{uri}local`.
    pub fn expanded_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{ns}}}{}", self.local_name),
            None => self.local_name.clone(),
        }
    }
}

/// Element arena for one XML file. Nodes are stored in document order, so
/// node 0 is the root element.
#[derive(Debug, Default)]
pub struct RawDocument {
    nodes: Vec<Element>,
}

impl RawDocument {
    /// Decodes raw file bytes (UTF-8 with optional BOM, falling back to
    /// ISO-8859-1) and parses them.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, quick_xml::Error> {
        Self::parse_str(&decode_text(bytes))
    }

    pub fn parse_str(xml: &str) -> Result<Self, quick_xml::Error> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut doc = RawDocument::default();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_resolved_event_into(&mut buf)? {
                (ns, Event::Start(ref start)) => {
                    let id = doc.open(&ns, start, stack.last().copied());
                    stack.push(id);
                }
                (ns, Event::Empty(ref start)) => {
                    doc.open(&ns, start, stack.last().copied());
                }
                (_, Event::Text(ref text)) => {
                    if let Some(&current) = stack.last() {
                        let unescaped = text.unescape()?;
                        doc.nodes[current].text.push_str(&unescaped);
                    }
                }
                (_, Event::CData(ref cdata)) => {
                    if let Some(&current) = stack.last() {
                        let raw: &[u8] = cdata.as_ref();
                        doc.nodes[current]
                            .text
                            .push_str(&String::from_utf8_lossy(raw));
                    }
                }
                (_, Event::End(_)) => {
                    stack.pop();
                }
                (_, Event::Eof) => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(doc)
    }

    fn open(&mut self, ns: &ResolveResult<'_>, start: &BytesStart<'_>, parent: Option<NodeId>) -> NodeId {
        let namespace = match ns {
            ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
            _ => None,
        };
        let id = self.nodes.len();
        self.nodes.push(Element {
            namespace,
            local_name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            text: String::new(),
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All elements in document order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Element)> {
        self.nodes.iter().enumerate()
    }

    /// The subtree rooted at `id` (inclusive), in document order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(node) = pending.pop() {
            out.push(node);
            pending.extend(self.nodes[node].children.iter().rev().copied());
        }
        out
    }

    /// First element named `{namespace}local_name` in the subtree of `id`,
    /// `id` itself included.
    pub fn find_first(&self, id: NodeId, namespace: &str, local_name: &str) -> Option<NodeId> {
        self.subtree(id)
            .into_iter()
            .find(|&node| self.nodes[node].is(namespace, local_name))
    }

    pub fn scoped<'a>(&'a self, namespace: &'a str, id: NodeId) -> ElementRef<'a> {
        ElementRef {
            doc: self,
            namespace,
            node: id,
        }
    }
}

/// Namespace-bound view of one element. Field accessors return `Option` or a
/// defined default instead of failing, so a missing leaf never aborts a record.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a RawDocument,
    namespace: &'a str,
    node: NodeId,
}

impl<'a> ElementRef<'a> {
    pub fn element(&self) -> &'a Element {
        self.doc.element(self.node)
    }

    pub fn text(&self) -> &'a str {
        self.element().text.trim()
    }

    pub fn child(&self, local_name: &str) -> Option<ElementRef<'a>> {
        self.children(local_name).next()
    }

    pub fn children<'n>(&self, local_name: &'n str) -> impl Iterator<Item = ElementRef<'a>> + 'n
    where
        'a: 'n,
    {
        let doc = self.doc;
        let namespace = self.namespace;
        doc.element(self.node)
            .children
            .iter()
            .copied()
            .filter(move |&child| doc.element(child).is(namespace, local_name))
            .map(move |child| ElementRef {
                doc,
                namespace,
                node: child,
            })
    }

    /// First descendant (or self) with the given name.
    pub fn find(&self, local_name: &str) -> Option<ElementRef<'a>> {
        self.doc
            .find_first(self.node, self.namespace, local_name)
            .map(|node| ElementRef { node, ..*self })
    }

    /// Every descendant with the given name, in document order.
    pub fn find_all(&self, local_name: &str) -> Vec<ElementRef<'a>> {
        self.doc
            .subtree(self.node)
            .into_iter()
            .skip(1)
            .filter(|&node| self.doc.element(node).is(self.namespace, local_name))
            .map(|node| ElementRef { node, ..*self })
            .collect()
    }

    /// Trimmed text of a direct child, `None` when the child is absent.
    pub fn field(&self, local_name: &str) -> Option<&'a str> {
        self.child(local_name).map(|child| child.text())
    }

    pub fn string(&self, local_name: &str) -> String {
        self.field(local_name).unwrap_or_default().to_string()
    }

    pub fn amount(&self, local_name: &str) -> Decimal {
        self.field(local_name)
            .and_then(parse_amount)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Text of `local_name` under an optional parent; empty when either is missing.
pub fn field_or_empty(parent: Option<ElementRef<'_>>, local_name: &str) -> String {
    parent.map(|p| p.string(local_name)).unwrap_or_default()
}

pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Parses a monetary value, accepting `1234.56`, `1234,56`, `1.234,56` and
/// `1,234.56`. The last separator present is the decimal one. The result is
/// rounded to cents.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if dot > comma => trimmed.replace(',', ""),
        (Some(_), _) => trimmed.replace('.', "").replace(',', "."),
        (None, Some(_)) if trimmed.matches('.').count() > 1 => trimmed.replace('.', ""),
        _ => trimmed.to_string(),
    };
    Decimal::from_str(&normalized).ok().map(|d| d.round_dp(2))
}

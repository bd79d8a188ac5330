//! Minimal namespace-aware element tree used by the command parser.

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{ProtoError, ProtoResult};

/// A parsed element: local name, resolved namespace, attributes, children
/// and accumulated text content.
#[derive(Debug, Clone, Default)]
pub(crate) struct Elem {
    pub name: String,
    pub namespace: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Elem>,
    pub text: String,
}

impl Elem {
    /// Parses a full document into its root element.
    pub(crate) fn parse(bytes: &[u8]) -> ProtoResult<Self> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Elem> = Vec::new();
        let mut root: Option<Elem> = None;
        loop {
            let (resolve, event) = reader
                .read_resolved_event()
                .map_err(|e| ProtoError::Syntax(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    let elem = Self::from_start(&resolve, &start)?;
                    stack.push(elem);
                }
                Event::Empty(start) => {
                    let elem = Self::from_start(&resolve, &start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(elem),
                        None => root = Some(elem),
                    }
                }
                Event::Text(text) => {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| ProtoError::Syntax(e.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&unescaped);
                    }
                }
                Event::End(_) => {
                    let finished = stack
                        .pop()
                        .ok_or_else(|| ProtoError::Syntax("unbalanced end tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(finished),
                        None => root = Some(finished),
                    }
                }
                Event::Eof => break,
                // Declarations, comments and processing instructions carry
                // nothing the command model needs.
                _ => {}
            }
        }
        if !stack.is_empty() {
            return Err(ProtoError::Syntax("unclosed element".to_string()));
        }
        root.ok_or_else(|| ProtoError::Syntax("empty document".to_string()))
    }

    fn from_start(
        resolve: &ResolveResult<'_>,
        start: &quick_xml::events::BytesStart<'_>,
    ) -> ProtoResult<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let namespace = match resolve {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            _ => None,
        };
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ProtoError::Syntax(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            // Namespace declarations are resolved by the reader already.
            if attr.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| ProtoError::Syntax(e.to_string()))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            namespace,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// First child with the given local name.
    pub(crate) fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given local name, or a `MissingElement` error.
    pub(crate) fn require(&self, name: &str) -> ProtoResult<&Self> {
        self.child(name)
            .ok_or_else(|| ProtoError::MissingElement(name.to_string()))
    }

    /// All children with the given local name.
    pub(crate) fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Attribute value by local name.
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text content of this element.
    pub(crate) fn text(&self) -> &str {
        self.text.trim()
    }

    /// Trimmed text of a required child.
    pub(crate) fn require_text(&self, name: &str) -> ProtoResult<String> {
        Ok(self.require(name)?.text().to_string())
    }

    /// Trimmed text of an optional child, `None` when absent or empty.
    pub(crate) fn optional_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(Self::text)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

//! XML element trees
//!
//! A small, namespace-resolved element tree: the structure instances consumed
//! by decoding and produced by encoding. Parsing uses quick-xml's `NsReader`
//! and serialization its `Writer`.

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, PrefixDeclaration, ResolveResult};
use quick_xml::{NsReader, Writer};
use std::collections::BTreeSet;

/// XML Element in the document tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Element qualified name
    pub name: QName,
    /// Element attributes, in document order
    pub attributes: IndexMap<QName, String>,
    /// Text before the first child (if any)
    pub text: Option<String>,
    /// Text following this element's end tag, inside the parent
    pub tail: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace declarations in scope for this element
    pub namespaces: NamespaceContext,
}

impl Element {
    /// Create a new element
    pub fn new(name: QName) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: QName, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value.into());
        self
    }

    /// Builder: set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: append a child
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.name.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.name.ns()
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute(&self, name: &QName) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Get an unqualified attribute value by local name
    pub fn get_local_attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.namespace.is_none() && k.local_name == local_name)
            .map(|(_, v)| v.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set text content
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Child elements with the given qualified name
    pub fn find_children<'a>(&'a self, name: &'a QName) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |e| &e.name == name)
    }

    /// True if the element has non-whitespace character data anywhere in its own content
    pub fn has_character_data(&self) -> bool {
        let non_blank = |s: &Option<String>| s.as_deref().map_or(false, |t| !t.trim().is_empty());
        non_blank(&self.text) || self.children.iter().any(|c| non_blank(&c.tail))
    }

    /// Concatenated own text (text plus children's tails)
    pub fn text_content(&self) -> String {
        let mut out = self.text.clone().unwrap_or_default();
        for child in &self.children {
            if let Some(tail) = &child.tail {
                out.push_str(tail);
            }
        }
        out
    }

    /// Parse an element tree from XML text
    pub fn parse(xml: &str) -> Result<Element> {
        Document::from_string(xml)?
            .root
            .ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    /// Serialize the tree, declaring every namespace used on the root element
    pub fn to_xml_string(&self) -> Result<String> {
        let prefixes = assign_prefixes(self);
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self, &prefixes, true)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::Xml(format!("serialized XML is not UTF-8: {}", e)))
    }
}

/// XML Document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        let mut doc = Document::new();
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let namespace = owned_namespace(resolved)?;

            match event {
                Event::Start(e) => {
                    let scope = stack.last().map(|p| p.namespaces.clone()).unwrap_or_default();
                    let element = start_element(&reader, &e, namespace, scope)?;
                    stack.push(element);
                }
                Event::Empty(e) => {
                    let scope = stack.last().map(|p| p.namespaces.clone()).unwrap_or_default();
                    let element = start_element(&reader, &e, namespace, scope)?;
                    attach(&mut stack, &mut doc, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut doc, element);
                    }
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::Xml(format!("failed to unescape text: {}", e)))?;
                    append_text(&mut stack, &text);
                }
                Event::CData(e) => {
                    let text = String::from_utf8(e.into_inner().into_owned())
                        .map_err(|e| Error::Xml(format!("CDATA is not UTF-8: {}", e)))?;
                    append_text(&mut stack, &text);
                }
                Event::Eof => break,
                _ => {} // comments, processing instructions, doctype
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml("unexpected end of document".to_string()));
        }
        Ok(doc)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(
            std::str::from_utf8(ns)
                .map_err(|e| Error::Xml(format!("namespace URI is not UTF-8: {}", e)))?
                .to_string(),
        )),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Xml(format!(
            "unknown namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn start_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    namespace: Option<String>,
    mut scope: NamespaceContext,
) -> Result<Element> {
    let local = std::str::from_utf8(start.local_name().into_inner())
        .map_err(|e| Error::Xml(format!("invalid element name: {}", e)))?;
    let mut attributes = IndexMap::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("failed to parse attribute: {}", e)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("failed to unescape attribute value: {}", e)))?
            .into_owned();

        if let Some(binding) = attr.key.as_namespace_binding() {
            match binding {
                PrefixDeclaration::Default => scope.set_default_namespace(value),
                PrefixDeclaration::Named(prefix) => {
                    scope.add_prefix(String::from_utf8_lossy(prefix), value)
                }
            }
            continue;
        }

        let (resolved, local_name) = reader.resolve_attribute(attr.key);
        let attr_ns = owned_namespace(resolved)?;
        let attr_local = std::str::from_utf8(local_name.into_inner())
            .map_err(|e| Error::Xml(format!("invalid attribute name: {}", e)))?;
        attributes.insert(QName::new(attr_ns, attr_local), value);
    }

    Ok(Element {
        name: QName::new(namespace, local),
        attributes,
        namespaces: scope,
        ..Default::default()
    })
}

fn attach(stack: &mut [Element], doc: &mut Document, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => doc.root = Some(element),
    }
}

fn append_text(stack: &mut [Element], text: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    let slot = match current.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut current.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

fn collect_namespaces(element: &Element, out: &mut BTreeSet<String>) {
    if let Some(ns) = element.namespace() {
        out.insert(ns.to_string());
    }
    for name in element.attributes.keys() {
        if let Some(ns) = name.ns() {
            out.insert(ns.to_string());
        }
    }
    for (_, uri) in element.namespaces.iter() {
        out.insert(uri.to_string());
    }
    for child in &element.children {
        collect_namespaces(child, out);
    }
}

fn assign_prefixes(root: &Element) -> IndexMap<String, String> {
    let mut used = BTreeSet::new();
    collect_namespaces(root, &mut used);

    let mut prefixes: IndexMap<String, String> = IndexMap::new();
    for ns in used {
        if ns == crate::XML_NAMESPACE {
            continue;
        }
        let declared = root
            .namespaces
            .prefix_for(&ns)
            .filter(|p| !prefixes.values().any(|v| v == p))
            .map(str::to_string);
        let prefix = declared.unwrap_or_else(|| {
            let mut n = 0;
            loop {
                let candidate = format!("ns{}", n);
                if !prefixes.values().any(|v| v == &candidate)
                    && root.namespaces.get_namespace(&candidate).is_none()
                {
                    break candidate;
                }
                n += 1;
            }
        });
        prefixes.insert(ns, prefix);
    }
    prefixes
}

fn prefixed(name: &QName, prefixes: &IndexMap<String, String>) -> String {
    match name.ns() {
        Some(crate::XML_NAMESPACE) => format!("xml:{}", name.local_name),
        Some(ns) => match prefixes.get(ns) {
            Some(prefix) => format!("{}:{}", prefix, name.local_name),
            None => name.local_name.clone(),
        },
        None => name.local_name.clone(),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    prefixes: &IndexMap<String, String>,
    is_root: bool,
) -> Result<()> {
    let tag = prefixed(&element.name, prefixes);
    let mut start = BytesStart::new(tag.as_str());
    if is_root {
        for (ns, prefix) in prefixes {
            let key = format!("xmlns:{}", prefix);
            start.push_attribute((key.as_str(), ns.as_str()));
        }
    }
    for (name, value) in &element.attributes {
        let key = prefixed(name, prefixes);
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let has_text = element.text.as_deref().map_or(false, |t| !t.is_empty());
    if element.children.is_empty() && !has_text {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        if let Some(text) = element.text.as_deref().filter(|t| !t.is_empty()) {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &element.children {
            write_element(writer, child, prefixes, false)?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    }

    if !is_root {
        if let Some(tail) = element.tail.as_deref().filter(|t| !t.is_empty()) {
            writer.write_event(Event::Text(BytesText::new(tail)))?;
        }
    }
    Ok(())
}

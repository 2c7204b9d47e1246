//! Native values produced by decoding and consumed by encoding

use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::namespaces::QName;

use super::builtins::XsdValue;

/// Decoded form of an element, a simple value or a list
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// A single atomic value
    Atomic(XsdValue),
    /// Ordered items of a list type
    List(Vec<NativeValue>),
    /// Element with attributes and content
    Element(ElementData),
}

/// Attributes and content of a decoded element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementData {
    /// Decoded attributes in document order
    pub attributes: IndexMap<QName, NativeValue>,
    /// Simple content value (simple types and simple content)
    pub value: Option<Box<NativeValue>>,
    /// Child elements and, for mixed content, text fragments
    pub content: Vec<ContentItem>,
}

/// One entry of element content
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    /// A child element and its decoded value
    Element(QName, NativeValue),
    /// A text fragment of mixed content
    Text(String),
}

impl NativeValue {
    /// An element value with no attributes and no content
    pub fn empty_element() -> Self {
        NativeValue::Element(ElementData::default())
    }

    /// The atomic value, if this is one
    pub fn as_atomic(&self) -> Option<&XsdValue> {
        match self {
            NativeValue::Atomic(v) => Some(v),
            _ => None,
        }
    }

    /// The list items, if this is a list
    pub fn as_list(&self) -> Option<&[NativeValue]> {
        match self {
            NativeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The element data, if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            NativeValue::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Simple value of an element, or the value itself when it is not an element
    pub fn simple_value(&self) -> Option<&NativeValue> {
        match self {
            NativeValue::Element(data) => data.value.as_deref(),
            other => Some(other),
        }
    }

    /// Untyped text form: list items are space separated, elements give their simple value
    pub fn to_text(&self) -> String {
        match self {
            NativeValue::Atomic(v) => v.to_string(),
            NativeValue::List(items) => items.iter().map(NativeValue::to_text).collect::<Vec<_>>().join(" "),
            NativeValue::Element(data) => data.value.as_deref().map(NativeValue::to_text).unwrap_or_default(),
        }
    }
}

impl ElementData {
    /// Element data holding a simple value
    pub fn with_value(value: NativeValue) -> Self {
        Self {
            value: Some(Box::new(value)),
            ..Self::default()
        }
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &QName) -> Option<&NativeValue> {
        self.attributes.get(name)
    }

    /// Iterate over the child elements with a given name
    pub fn children<'a, 'n>(&'a self, name: &'n QName) -> impl Iterator<Item = &'a NativeValue> + 'n
    where
        'a: 'n,
    {
        self.content.iter().filter_map(move |item| match item {
            ContentItem::Element(n, v) if n == name => Some(v),
            _ => None,
        })
    }

    /// First child element with a given name
    pub fn child<'a>(&'a self, name: &QName) -> Option<&'a NativeValue> {
        self.children(name).next()
    }

    /// Names of the child elements in order
    pub fn child_names(&self) -> Vec<&QName> {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::Element(n, _) => Some(n),
                ContentItem::Text(_) => None,
            })
            .collect()
    }

    /// Append a child element
    pub fn push_child(&mut self, name: QName, value: NativeValue) {
        self.content.push(ContentItem::Element(name, value));
    }
}

impl From<XsdValue> for NativeValue {
    fn from(value: XsdValue) -> Self {
        NativeValue::Atomic(value)
    }
}

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Atomic(XsdValue::Boolean(value))
    }
}

impl From<i64> for NativeValue {
    fn from(value: i64) -> Self {
        NativeValue::Atomic(XsdValue::Integer(value.into()))
    }
}

impl From<u64> for NativeValue {
    fn from(value: u64) -> Self {
        NativeValue::Atomic(XsdValue::Integer(value.into()))
    }
}

impl From<i128> for NativeValue {
    fn from(value: i128) -> Self {
        NativeValue::Atomic(XsdValue::Integer(value))
    }
}

impl From<f64> for NativeValue {
    fn from(value: f64) -> Self {
        NativeValue::Atomic(XsdValue::Float(value))
    }
}

impl From<Decimal> for NativeValue {
    fn from(value: Decimal) -> Self {
        NativeValue::Atomic(XsdValue::Decimal(value))
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::Atomic(XsdValue::String(value.to_string()))
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::Atomic(XsdValue::String(value))
    }
}

impl From<ElementData> for NativeValue {
    fn from(value: ElementData) -> Self {
        NativeValue::Element(value)
    }
}

impl<T: Into<NativeValue>> From<Vec<T>> for NativeValue {
    fn from(items: Vec<T>) -> Self {
        NativeValue::List(items.into_iter().map(Into::into).collect())
    }
}

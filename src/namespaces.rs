//! XML namespace handling
//!
//! Qualified names (QNames) and namespace prefix mappings.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()).filter(|s: &String| !s.is_empty()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self::new(Some(namespace), local_name)
    }

    /// Parse Clark notation (`{uri}local` or `local`)
    pub fn from_clark(name: &str) -> Result<Self> {
        match name.strip_prefix('{') {
            Some(rest) => {
                let (ns, local) = rest
                    .split_once('}')
                    .ok_or_else(|| Error::Value(format!("malformed Clark name: '{}'", name)))?;
                if local.is_empty() {
                    return Err(Error::Value(format!("missing local name in '{}'", name)));
                }
                Ok(Self::new(Some(ns), local))
            }
            None => Ok(Self::local(name)),
        }
    }

    /// Namespace as a string slice, `None` for the absent namespace
    pub fn ns(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// True if the name is in the given namespace (`None` = absent)
    pub fn is_in(&self, namespace: Option<&str>) -> bool {
        self.ns() == namespace
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: IndexMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace (an empty URI undeclares it)
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => Some(crate::XML_NAMESPACE),
            _ => self.prefixes.get(prefix).map(|s| s.as_str()),
        }
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// First prefix bound to a namespace URI
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, uri)| uri.as_str() == namespace)
            .map(|(prefix, _)| prefix.as_str())
    }

    /// Iterate over the prefixed declarations
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Resolve a prefixed name to a QName; unprefixed names take the default namespace
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        self.resolve_with_default(prefixed_name, self.default_namespace.as_deref())
    }

    /// Resolve a prefixed name, using `default` for unprefixed names
    pub fn resolve_with_default(&self, prefixed_name: &str, default: Option<&str>) -> Result<QName> {
        let prefixed_name = prefixed_name.trim();
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Value(format!("unknown namespace prefix '{}'", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(default, prefixed_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
        assert_eq!(QName::namespaced("", "x"), QName::local("x"));
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");
        assert_eq!(QName::local("element").to_string(), "element");
    }

    #[test]
    fn test_from_clark() {
        assert_eq!(
            QName::from_clark("{tns1}foo").unwrap(),
            QName::namespaced("tns1", "foo")
        );
        assert_eq!(QName::from_clark("foo").unwrap(), QName::local("foo"));
        assert!(QName::from_clark("{tns1foo").is_err());
        assert!(QName::from_clark("{tns1}").is_err());
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", "http://www.w3.org/2001/XMLSchema");
        ctx.set_default_namespace("http://example.com");

        assert_eq!(
            ctx.get_namespace("xs"),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));
        assert_eq!(ctx.prefix_for("http://www.w3.org/2001/XMLSchema"), Some("xs"));
        assert_eq!(ctx.get_namespace("xml"), Some(crate::XML_NAMESPACE));
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("xs", "http://www.w3.org/2001/XMLSchema");

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(qname.ns(), Some("http://www.w3.org/2001/XMLSchema"));
        assert_eq!(qname.local_name, "element");

        assert_eq!(ctx.resolve("plain").unwrap(), QName::local("plain"));
        assert!(ctx.resolve("nope:thing").is_err());
        assert_eq!(
            ctx.resolve_with_default("plain", Some("tns")).unwrap(),
            QName::namespaced("tns", "plain")
        );
    }
}

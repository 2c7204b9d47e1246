//! Base converter types
//!
//! This module provides the configuration shared by both conversion
//! directions and the mapping between qualified names and JSON keys.

use crate::namespaces::{NamespaceContext, QName};

/// Configuration for converters
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Key used for simple content and mixed text
    text_key: String,
    /// Prefix for attribute keys
    attr_prefix: String,
    /// Whether to force list output for children
    force_list: bool,
    /// Whether to drop namespaces from keys
    strip_namespaces: bool,
    /// Prefixes used to shorten and resolve keys
    namespaces: NamespaceContext,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            text_key: "$".to_string(),
            attr_prefix: "@".to_string(),
            force_list: false,
            strip_namespaces: false,
            namespaces: NamespaceContext::new(),
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the text key
    pub fn text_key(&self) -> &str {
        &self.text_key
    }

    /// Get the attribute prefix
    pub fn attr_prefix(&self) -> &str {
        &self.attr_prefix
    }

    /// Check if force list is enabled
    pub fn force_list(&self) -> bool {
        self.force_list
    }

    /// Check if namespaces are stripped from keys
    pub fn strip_namespaces(&self) -> bool {
        self.strip_namespaces
    }

    /// Prefix map used for keys
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// Set the text key
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Set the attribute prefix
    pub fn with_attr_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attr_prefix = prefix.into();
        self
    }

    /// Set force list
    pub fn with_force_list(mut self, force: bool) -> Self {
        self.force_list = force;
        self
    }

    /// Set namespace stripping
    pub fn with_strip_namespaces(mut self, strip: bool) -> Self {
        self.strip_namespaces = strip;
        self
    }

    /// Set the prefix map
    pub fn with_namespaces(mut self, namespaces: NamespaceContext) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// JSON key of a child element: the default namespace is implied,
    /// bound namespaces use their prefix, others use Clark notation
    pub fn element_key(&self, name: &QName) -> String {
        match name.ns() {
            None => name.local_name.clone(),
            Some(_) if self.strip_namespaces => name.local_name.clone(),
            Some(ns) if self.namespaces.get_default_namespace() == Some(ns) => name.local_name.clone(),
            Some(ns) => self.prefixed(ns, name),
        }
    }

    /// JSON key of an attribute, without the attribute prefix
    pub fn attribute_key(&self, name: &QName) -> String {
        match name.ns() {
            None => name.local_name.clone(),
            Some(_) if self.strip_namespaces => name.local_name.clone(),
            Some(ns) => self.prefixed(ns, name),
        }
    }

    fn prefixed(&self, namespace: &str, name: &QName) -> String {
        match self.namespaces.prefix_for(namespace) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name.local_name),
            _ => name.to_string(),
        }
    }

    /// Element name of a JSON key; unprefixed keys take the default namespace
    pub fn element_name(&self, key: &str) -> QName {
        self.resolve(key, self.namespaces.get_default_namespace())
    }

    /// Attribute name of a JSON key (attribute prefix already removed)
    pub fn attribute_name(&self, key: &str) -> QName {
        self.resolve(key, None)
    }

    fn resolve(&self, key: &str, default: Option<&str>) -> QName {
        let resolved = if key.starts_with('{') {
            QName::from_clark(key)
        } else {
            self.namespaces.resolve_with_default(key, default)
        };
        resolved.unwrap_or_else(|err| {
            tracing::warn!(key, %err, "unresolved JSON key, using it as a local name");
            QName::local(key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConverterConfig {
        let mut namespaces = NamespaceContext::new();
        namespaces.add_prefix("tns", "urn:t");
        namespaces.set_default_namespace("urn:d");
        ConverterConfig::new().with_namespaces(namespaces)
    }

    #[test]
    fn test_element_keys() {
        let config = config();
        assert_eq!(config.element_key(&QName::namespaced("urn:d", "a")), "a");
        assert_eq!(config.element_key(&QName::namespaced("urn:t", "b")), "tns:b");
        assert_eq!(config.element_key(&QName::namespaced("urn:x", "c")), "{urn:x}c");
        assert_eq!(config.element_key(&QName::local("d")), "d");
        assert_eq!(config.element_name("tns:b"), QName::namespaced("urn:t", "b"));
        assert_eq!(config.element_name("a"), QName::namespaced("urn:d", "a"));
        assert_eq!(config.element_name("{urn:x}c"), QName::namespaced("urn:x", "c"));
    }

    #[test]
    fn test_attribute_keys() {
        let config = config();
        assert_eq!(config.attribute_name("id"), QName::local("id"));
        assert_eq!(config.attribute_key(&QName::namespaced("urn:t", "id")), "tns:id");
        assert_eq!(config.attribute_name("bogus:id"), QName::local("bogus:id"));
    }

    #[test]
    fn test_strip_namespaces() {
        let config = config().with_strip_namespaces(true);
        assert_eq!(config.element_key(&QName::namespaced("urn:x", "c")), "c");
    }
}

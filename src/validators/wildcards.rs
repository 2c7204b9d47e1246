//! XSD wildcards
//!
//! Namespace constraints of `xs:any`, `xs:anyAttribute` and open content,
//! plus the `notQName` exclusions of XSD 1.1. Admission is a pure function
//! of the wildcard, the candidate name and the [`NameScope`].
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Wildcards

use indexmap::IndexSet;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, SchemaError};
use crate::namespaces::{NamespaceContext, QName};

/// A namespace URI, `None` being the absent namespace
pub type NamespaceName = Option<String>;

/// Process contents mode for wildcards, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProcessContents {
    /// Skip validation entirely
    Skip,
    /// Validate if a declaration is found, otherwise accept
    Lax,
    /// Validate strictly - a declaration is required
    #[default]
    Strict,
}

impl ProcessContents {
    /// Attribute literal
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::Skip => "skip",
        }
    }
}

impl FromStr for ProcessContents {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "skip" => Ok(Self::Skip),
            _ => Err(Error::Value(format!("invalid processContents value '{}'", s))),
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Namespace constraint for wildcards
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace (##any)
    #[default]
    Any,
    /// Every namespace except the listed ones (##other, notNamespace)
    Not(BTreeSet<NamespaceName>),
    /// Only the listed namespaces
    Enumeration(BTreeSet<NamespaceName>),
}

fn parse_namespace_list(
    value: &str,
    attribute: &str,
    target_namespace: Option<&str>,
) -> Result<BTreeSet<NamespaceName>, SchemaError> {
    value
        .split_whitespace()
        .map(|token| match token {
            "##local" => Ok(None),
            "##targetNamespace" => Ok(target_namespace.map(String::from)),
            t if t.starts_with("##") => Err(SchemaError::new(format!(
                "wrong value '{}' in '{}' attribute",
                t, attribute
            ))),
            uri => Ok(Some(uri.to_string())),
        })
        .collect()
}

impl NamespaceConstraint {
    /// Parse a `namespace` attribute
    pub fn from_namespace_attr(value: &str, target_namespace: Option<&str>) -> Result<Self, SchemaError> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::other(target_namespace)),
            list => {
                if list.split_whitespace().any(|t| t == "##any" || t == "##other") {
                    return Err(SchemaError::new(format!(
                        "'##any' and '##other' cannot be combined with other values in '{}'",
                        list
                    )));
                }
                Ok(Self::Enumeration(parse_namespace_list(list, "namespace", target_namespace)?))
            }
        }
    }

    /// Parse a `notNamespace` attribute
    pub fn from_not_namespace_attr(value: &str, target_namespace: Option<&str>) -> Result<Self, SchemaError> {
        let excluded = parse_namespace_list(value, "notNamespace", target_namespace)?;
        if excluded.is_empty() {
            return Err(SchemaError::new("the 'notNamespace' attribute cannot be empty"));
        }
        Ok(Self::Not(excluded))
    }

    /// `##other`: the target namespace and the absent namespace are excluded
    pub fn other(target_namespace: Option<&str>) -> Self {
        let mut excluded = BTreeSet::new();
        excluded.insert(None);
        if let Some(tns) = target_namespace {
            excluded.insert(Some(tns.to_string()));
        }
        Self::Not(excluded)
    }

    /// An enumeration of the given namespaces
    pub fn only<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self::Enumeration(namespaces.into_iter().map(|ns| ns.map(Into::into)).collect())
    }

    /// Check if a namespace is allowed by this constraint
    pub fn admits(&self, namespace: Option<&str>) -> bool {
        let key = namespace.map(String::from);
        match self {
            Self::Any => true,
            Self::Not(excluded) => !excluded.contains(&key),
            Self::Enumeration(allowed) => allowed.contains(&key),
        }
    }

    fn normalized(self) -> Self {
        match self {
            Self::Not(excluded) if excluded.is_empty() => Self::Any,
            other => other,
        }
    }

    /// True if every namespace admitted by `self` is admitted by `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Any) => true,
            (Self::Any, Self::Not(excluded)) => excluded.is_empty(),
            (Self::Any, Self::Enumeration(_)) => false,
            (Self::Enumeration(a), Self::Enumeration(b)) => a.is_subset(b),
            (Self::Enumeration(a), Self::Not(excluded)) => a.is_disjoint(excluded),
            (Self::Not(_), Self::Enumeration(_)) => false,
            (Self::Not(a), Self::Not(b)) => b.is_subset(a),
        }
    }

    /// Namespaces admitted by either constraint
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::Enumeration(a), Self::Enumeration(b)) => Self::Enumeration(a.union(b).cloned().collect()),
            (Self::Not(excluded), Self::Enumeration(allowed)) | (Self::Enumeration(allowed), Self::Not(excluded)) => {
                Self::Not(excluded.difference(allowed).cloned().collect()).normalized()
            }
            (Self::Not(a), Self::Not(b)) => Self::Not(a.intersection(b).cloned().collect()).normalized(),
        }
    }

    /// Namespaces admitted by both constraints
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, x) | (x, Self::Any) => x.clone(),
            (Self::Enumeration(a), Self::Enumeration(b)) => {
                Self::Enumeration(a.intersection(b).cloned().collect())
            }
            (Self::Not(excluded), Self::Enumeration(allowed)) | (Self::Enumeration(allowed), Self::Not(excluded)) => {
                Self::Enumeration(allowed.difference(excluded).cloned().collect())
            }
            (Self::Not(a), Self::Not(b)) => Self::Not(a.union(b).cloned().collect()),
        }
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |set: &BTreeSet<NamespaceName>| {
            set.iter()
                .map(|ns| ns.clone().unwrap_or_else(|| "##local".to_string()))
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self {
            Self::Any => write!(f, "##any"),
            Self::Not(excluded) => write!(f, "not({})", list(excluded)),
            Self::Enumeration(allowed) => write!(f, "{}", list(allowed)),
        }
    }
}

/// A member of a `notQName` list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QNameExclusion {
    /// A literal qualified name
    Name(QName),
    /// `##defined`: names of global element declarations
    Defined,
    /// `##definedSibling`: names declared in the same content model
    DefinedSibling,
}

/// Global element names, for `##defined`
pub trait DefinedNames {
    /// True if a global element with this name exists
    fn is_defined(&self, name: &QName) -> bool;
}

impl DefinedNames for IndexSet<QName> {
    fn is_defined(&self, name: &QName) -> bool {
        self.contains(name)
    }
}

/// What the `notQName` markers are evaluated against
#[derive(Clone, Copy, Default)]
pub struct NameScope<'a> {
    /// Global element declarations
    pub defined: Option<&'a dyn DefinedNames>,
    /// Element names of the enclosing content model
    pub siblings: Option<&'a IndexSet<QName>>,
}

impl<'a> NameScope<'a> {
    /// A scope with global names and sibling names
    pub fn new(defined: &'a dyn DefinedNames, siblings: &'a IndexSet<QName>) -> Self {
        Self {
            defined: Some(defined),
            siblings: Some(siblings),
        }
    }
}

impl fmt::Debug for NameScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameScope")
            .field("defined", &self.defined.is_some())
            .field("siblings", &self.siblings)
            .finish()
    }
}

/// An element or attribute wildcard
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wildcard {
    /// Namespace test
    pub namespace: NamespaceConstraint,
    /// Exclusions applied after the namespace test
    pub not_qname: IndexSet<QNameExclusion>,
    /// How matched items are validated
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// A wildcard with the given namespace constraint and strict processing
    pub fn new(namespace: NamespaceConstraint) -> Self {
        Self {
            namespace,
            ..Self::default()
        }
    }

    /// `##any` wildcard
    pub fn any() -> Self {
        Self::default()
    }

    /// Set the process contents mode
    pub fn with_process_contents(mut self, process_contents: ProcessContents) -> Self {
        self.process_contents = process_contents;
        self
    }

    /// Add a `notQName` exclusion
    pub fn excluding(mut self, exclusion: QNameExclusion) -> Self {
        self.not_qname.insert(exclusion);
        self
    }

    /// Parse a `notQName` attribute value, resolving prefixes with `namespaces`
    ///
    /// Unprefixed names take the default namespace of the context.
    pub fn parse_not_qname(
        value: &str,
        namespaces: &NamespaceContext,
    ) -> Result<IndexSet<QNameExclusion>, SchemaError> {
        value
            .split_whitespace()
            .map(|token| match token {
                "##defined" => Ok(QNameExclusion::Defined),
                "##definedSibling" => Ok(QNameExclusion::DefinedSibling),
                t if t.starts_with("##") => Err(SchemaError::new(format!(
                    "wrong value '{}' in 'notQName' attribute",
                    t
                ))),
                name => namespaces
                    .resolve(name)
                    .map(QNameExclusion::Name)
                    .map_err(|e| SchemaError::new(format!("invalid notQName '{}': {}", name, e))),
            })
            .collect()
    }

    /// Check whether the wildcard admits a name
    pub fn admits(&self, name: &QName, scope: &NameScope<'_>) -> bool {
        if !self.namespace.admits(name.ns()) {
            return false;
        }
        !self.not_qname.iter().any(|exclusion| match exclusion {
            QNameExclusion::Name(excluded) => excluded == name,
            QNameExclusion::Defined => scope.defined.is_some_and(|d| d.is_defined(name)),
            QNameExclusion::DefinedSibling => scope.siblings.is_some_and(|s| s.contains(name)),
        })
    }

    /// Check whether the namespace test alone passes
    pub fn admits_namespace(&self, namespace: Option<&str>) -> bool {
        self.namespace.admits(namespace)
    }

    /// True if `self` admits no name that `base` rejects
    ///
    /// Every exclusion of `base` must also be enforced by `self`, unless the
    /// excluded literal name is outside `self`'s namespaces anyway.
    pub fn is_subset(&self, base: &Wildcard) -> bool {
        if !self.namespace.is_subset(&base.namespace) {
            return false;
        }
        base.not_qname.iter().all(|exclusion| match exclusion {
            QNameExclusion::Name(name) => {
                !self.namespace.admits(name.ns()) || self.not_qname.contains(exclusion)
            }
            marker => self.not_qname.contains(marker),
        })
    }

    /// Wildcard admitting what either admits; exclusions are combined by union
    pub fn union(&self, other: &Wildcard) -> Wildcard {
        let mut not_qname = self.not_qname.clone();
        not_qname.extend(other.not_qname.iter().cloned());
        Wildcard {
            namespace: self.namespace.union(&other.namespace),
            not_qname,
            process_contents: self.process_contents,
        }
    }

    /// Wildcard admitting what both admit
    pub fn intersection(&self, other: &Wildcard) -> Wildcard {
        let mut not_qname = self.not_qname.clone();
        not_qname.extend(other.not_qname.iter().cloned());
        Wildcard {
            namespace: self.namespace.intersection(&other.namespace),
            not_qname,
            process_contents: self.process_contents.max(other.process_contents),
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "any(namespace={}, processContents={})", self.namespace, self.process_contents)
    }
}

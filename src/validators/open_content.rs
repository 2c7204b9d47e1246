//! XSD 1.1 open content
//!
//! Per-type `openContent`, schema-wide `defaultOpenContent`, the rule that
//! picks the effective one for a complex type, and the derivation checks
//! between a type's open content and its base's.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#oc

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, SchemaError};

use super::wildcards::Wildcard;

/// Open content mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpenContentMode {
    /// No extra children
    None,
    /// Extra children at any position
    #[default]
    Interleave,
    /// Extra children after the declared ones
    Suffix,
}

impl OpenContentMode {
    /// Attribute literal
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Interleave => "interleave",
            Self::Suffix => "suffix",
        }
    }
}

impl FromStr for OpenContentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "none" => Ok(Self::None),
            "interleave" => Ok(Self::Interleave),
            "suffix" => Ok(Self::Suffix),
            _ => Err(Error::Value(format!("wrong value '{}' for 'mode' attribute", s))),
        }
    }
}

impl fmt::Display for OpenContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An `openContent` declaration
///
/// The wildcard always has `minOccurs=0` and `maxOccurs=unbounded`.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenContent {
    /// Mode
    pub mode: OpenContentMode,
    any: Option<Wildcard>,
}

impl OpenContent {
    /// Create open content; `none` takes no wildcard, the other modes need one
    pub fn new(mode: OpenContentMode, any: Option<Wildcard>) -> Result<Self, SchemaError> {
        match (mode, &any) {
            (OpenContentMode::None, Some(_)) => Err(SchemaError::new(
                "an openContent with mode='none' must not have an <any> child",
            )),
            (OpenContentMode::Interleave | OpenContentMode::Suffix, None) => Err(SchemaError::new(format!(
                "an openContent with mode='{}' requires an <any> child",
                mode
            ))),
            _ => Ok(Self { mode, any }),
        }
    }

    /// `mode="none"`
    pub fn none() -> Self {
        Self {
            mode: OpenContentMode::None,
            any: None,
        }
    }

    /// The open content wildcard (`None` for mode `none`)
    pub fn wildcard(&self) -> Option<&Wildcard> {
        self.any.as_ref()
    }

    /// True for mode `none`
    pub fn is_none(&self) -> bool {
        self.mode == OpenContentMode::None
    }

    /// Add literal and marker exclusions inherited from another open content
    pub fn with_exclusions_of(mut self, other: &OpenContent) -> Self {
        if let (Some(any), Some(inherited)) = (self.any.as_mut(), other.any.as_ref()) {
            any.not_qname.extend(inherited.not_qname.iter().cloned());
        }
        self
    }
}

/// A schema-level `defaultOpenContent`
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultOpenContent {
    /// The open content injected into complex types
    pub open_content: OpenContent,
    /// Also inject into types with empty content
    pub applies_to_empty: bool,
}

impl DefaultOpenContent {
    /// Create a default open content; its mode cannot be `none`
    pub fn new(open_content: OpenContent, applies_to_empty: bool) -> Result<Self, SchemaError> {
        if open_content.is_none() {
            return Err(SchemaError::new(
                "the mode of a defaultOpenContent cannot be 'none'",
            ));
        }
        Ok(Self {
            open_content,
            applies_to_empty,
        })
    }
}

/// How the content of a complex type is being derived
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentDerivation<'a> {
    /// No base content to inherit from (restriction or a type derived from anyType)
    Standalone,
    /// Extension of a base whose effective open content is given
    Extension(Option<&'a OpenContent>),
}

/// Pick the effective open content of a complex type
///
/// An explicit declaration wins, `mode="none"` included. Otherwise the
/// schema default applies, unless the declared content is empty and the
/// default does not apply to empty content. An extension with neither
/// inherits the open content of its base.
pub fn resolve(
    explicit: Option<&OpenContent>,
    default: Option<&DefaultOpenContent>,
    content_is_empty: bool,
    derivation: ContentDerivation<'_>,
) -> Option<OpenContent> {
    if let Some(explicit) = explicit {
        return (!explicit.is_none()).then(|| explicit.clone());
    }
    if let Some(default) = default {
        if !content_is_empty || default.applies_to_empty {
            tracing::trace!(mode = %default.open_content.mode, "applied default open content");
            return Some(default.open_content.clone());
        }
    }
    match derivation {
        ContentDerivation::Extension(base) => base.cloned(),
        ContentDerivation::Standalone => None,
    }
}

/// Check the open content of a type derived by restriction
pub fn check_restriction(derived: Option<&OpenContent>, base: Option<&OpenContent>) -> Result<(), SchemaError> {
    let (derived, base) = match (derived.filter(|d| !d.is_none()), base.filter(|b| !b.is_none())) {
        (None, _) => return Ok(()),
        (Some(_), None) => {
            return Err(SchemaError::new(
                "a restriction cannot add open content to a base type without it",
            ))
        }
        (Some(d), Some(b)) => (d, b),
    };
    if derived.mode == OpenContentMode::Interleave && base.mode == OpenContentMode::Suffix {
        return Err(SchemaError::new(
            "a restriction cannot change the open content mode from 'suffix' to 'interleave'",
        ));
    }
    if let (Some(d), Some(b)) = (derived.wildcard(), base.wildcard()) {
        if !d.is_subset(b) {
            return Err(SchemaError::new(format!(
                "the open content wildcard {} is wider than the base's {}",
                d.namespace, b.namespace
            )));
        }
    }
    Ok(())
}

/// Check the open content of a type derived by extension
pub fn check_extension(derived: Option<&OpenContent>, base: Option<&OpenContent>) -> Result<(), SchemaError> {
    let base = match base.filter(|b| !b.is_none()) {
        Some(base) => base,
        None => return Ok(()),
    };
    let derived = derived.filter(|d| !d.is_none()).ok_or_else(|| {
        SchemaError::new("an extension cannot remove the open content of its base type")
    })?;
    if base.mode == OpenContentMode::Interleave && derived.mode != OpenContentMode::Interleave {
        return Err(SchemaError::new(
            "an extension of a type with 'interleave' open content must keep the 'interleave' mode",
        ));
    }
    if let (Some(d), Some(b)) = (derived.wildcard(), base.wildcard()) {
        if !b.namespace.is_subset(&d.namespace) {
            return Err(SchemaError::new(format!(
                "the open content wildcard {} does not include the base's {}",
                d.namespace, b.namespace
            )));
        }
        if d.process_contents < b.process_contents {
            return Err(SchemaError::new(format!(
                "the open content processContents '{}' is weaker than the base's '{}'",
                d.process_contents, b.process_contents
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::wildcards::{NamespaceConstraint, ProcessContents, QNameExclusion};

    fn oc(mode: OpenContentMode, namespaces: &[&str]) -> OpenContent {
        let wildcard = Wildcard::new(NamespaceConstraint::only(namespaces.iter().map(|n| Some(*n))));
        OpenContent::new(mode, Some(wildcard)).unwrap()
    }

    #[test]
    fn test_new_checks_wildcard_presence() {
        assert!(OpenContent::new(OpenContentMode::None, Some(Wildcard::any())).is_err());
        assert!(OpenContent::new(OpenContentMode::Suffix, None).is_err());
        assert!(OpenContent::new(OpenContentMode::None, None).is_ok());
        assert!("append".parse::<OpenContentMode>().is_err());
        assert!(DefaultOpenContent::new(OpenContent::none(), false).is_err());
    }

    #[test]
    fn test_resolve() {
        let default = DefaultOpenContent::new(oc(OpenContentMode::Interleave, &["d"]), false).unwrap();
        let own = oc(OpenContentMode::Suffix, &["own"]);

        let resolved = resolve(Some(&own), Some(&default), false, ContentDerivation::Standalone);
        assert_eq!(resolved, Some(own));

        let none = OpenContent::none();
        assert_eq!(resolve(Some(&none), Some(&default), false, ContentDerivation::Standalone), None);

        assert_eq!(
            resolve(None, Some(&default), false, ContentDerivation::Standalone),
            Some(default.open_content.clone())
        );
        assert_eq!(resolve(None, Some(&default), true, ContentDerivation::Standalone), None);

        let to_empty = DefaultOpenContent {
            applies_to_empty: true,
            ..default.clone()
        };
        assert!(resolve(None, Some(&to_empty), true, ContentDerivation::Standalone).is_some());

        let inherited = oc(OpenContentMode::Suffix, &["base"]);
        assert_eq!(
            resolve(None, None, false, ContentDerivation::Extension(Some(&inherited))),
            Some(inherited)
        );
    }

    #[test]
    fn test_content_derivation_compares_base_open_content() {
        let base = oc(OpenContentMode::Interleave, &["tns1"]);
        let other = oc(OpenContentMode::Interleave, &["tns2"]);
        assert_eq!(ContentDerivation::Extension(Some(&base)), ContentDerivation::Extension(Some(&base.clone())));
        assert_ne!(ContentDerivation::Extension(Some(&base)), ContentDerivation::Extension(Some(&other)));
        assert_ne!(ContentDerivation::Extension(None), ContentDerivation::Standalone);
    }

    #[test]
    fn test_restriction_narrowing() {
        let base = oc(OpenContentMode::Interleave, &["tns1", "tns2"]);
        assert!(check_restriction(Some(&oc(OpenContentMode::Interleave, &["tns1"])), Some(&base)).is_ok());
        let any = OpenContent::new(OpenContentMode::Interleave, Some(Wildcard::any())).unwrap();
        assert!(check_restriction(Some(&any), Some(&base)).is_err());
        assert!(check_restriction(None, Some(&base)).is_ok());
        assert!(check_restriction(Some(&base), None).is_err());

        let suffix = oc(OpenContentMode::Suffix, &["tns1"]);
        assert!(check_restriction(Some(&oc(OpenContentMode::Interleave, &["tns1"])), Some(&suffix)).is_err());
        assert!(check_restriction(Some(&suffix), Some(&base)).is_ok());
    }

    #[test]
    fn test_extension_rules() {
        let base = oc(OpenContentMode::Suffix, &["tns1"]);
        assert!(check_extension(Some(&oc(OpenContentMode::Suffix, &["tns1", "tns2"])), Some(&base)).is_ok());
        assert!(check_extension(Some(&oc(OpenContentMode::Interleave, &["tns1"])), Some(&base)).is_ok());
        assert!(check_extension(Some(&oc(OpenContentMode::Suffix, &["tns2"])), Some(&base)).is_err());
        assert!(check_extension(None, Some(&base)).is_err());
        assert!(check_extension(Some(&base), None).is_ok());

        let interleave = oc(OpenContentMode::Interleave, &["tns1"]);
        assert!(check_extension(Some(&base), Some(&interleave)).is_err());

        let lax = OpenContent::new(
            OpenContentMode::Suffix,
            Some(Wildcard::new(NamespaceConstraint::only([Some("tns1")])).with_process_contents(ProcessContents::Lax)),
        )
        .unwrap();
        assert!(check_extension(Some(&lax), Some(&base)).is_err());
        assert!(check_extension(Some(&base), Some(&lax)).is_ok());
    }

    #[test]
    fn test_inherited_exclusions_are_combined() {
        let base = OpenContent::new(
            OpenContentMode::Interleave,
            Some(Wildcard::any().excluding(QNameExclusion::Defined)),
        )
        .unwrap();
        let own = OpenContent::new(
            OpenContentMode::Interleave,
            Some(Wildcard::any().excluding(QNameExclusion::DefinedSibling)),
        )
        .unwrap()
        .with_exclusions_of(&base);
        let exclusions = &own.wildcard().unwrap().not_qname;
        assert!(exclusions.contains(&QNameExclusion::Defined));
        assert!(exclusions.contains(&QNameExclusion::DefinedSibling));
    }
}

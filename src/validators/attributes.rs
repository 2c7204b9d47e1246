//! XSD attribute validators
//!
//! Attribute declarations, attribute uses and the attribute-use map of a
//! complex type, with its optional `anyAttribute` wildcard. Decoding and
//! encoding of an element's attributes go through [`AttributeUses`].

use indexmap::IndexMap;
use std::str::FromStr;

use crate::error::{Error, Result, SchemaError, ValidationError};
use crate::namespaces::{NamespaceContext, QName};

use super::globals::{TypeId, XsdGlobals};
use super::validation::ValidationContext;
use super::values::NativeValue;
use super::wildcards::{DefinedNames, NameScope, ProcessContents, Wildcard};

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UseMode {
    /// Attribute is optional (default)
    #[default]
    Optional,
    /// Attribute is required
    Required,
    /// Attribute is prohibited
    Prohibited,
}

impl UseMode {
    /// Get the use as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            UseMode::Optional => "optional",
            UseMode::Required => "required",
            UseMode::Prohibited => "prohibited",
        }
    }
}

impl FromStr for UseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "optional" => Ok(UseMode::Optional),
            "required" => Ok(UseMode::Required),
            "prohibited" => Ok(UseMode::Prohibited),
            _ => Err(Error::Value(format!(
                "Invalid attribute use value: '{}'. Must be 'optional', 'required', or 'prohibited'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for UseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// XSD attribute declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    /// Attribute name
    pub name: QName,
    /// Simple type of the value
    pub type_id: TypeId,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
}

impl AttributeDecl {
    /// Create a new attribute declaration
    pub fn new(name: QName, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            default: None,
            fixed: None,
        }
    }

    /// Set the value constraint; `default` and `fixed` are mutually exclusive
    pub fn with_value_constraint(
        mut self,
        default: Option<String>,
        fixed: Option<String>,
    ) -> std::result::Result<Self, SchemaError> {
        if default.is_some() && fixed.is_some() {
            return Err(SchemaError::new("'default' and 'fixed' attributes are mutually exclusive")
                .with_component(self.name.to_string()));
        }
        self.default = default;
        self.fixed = fixed;
        Ok(self)
    }

    /// Value used when the attribute is missing
    pub fn value_constraint(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.default.as_deref())
    }

    /// Decode a value, checking the fixed constraint
    pub fn decode(
        &self,
        globals: &XsdGlobals,
        text: &str,
        namespaces: Option<&NamespaceContext>,
        ctx: &mut ValidationContext,
    ) -> Result<Option<NativeValue>> {
        let simple = globals.expect_simple(self.type_id)?;
        let value = match simple.decode(globals, text, namespaces, ctx)? {
            Some(value) => value,
            None => return Ok(None),
        };
        if let (Some(fixed), true) = (&self.fixed, ctx.checks()) {
            let mut trial = ctx.trial();
            let expected = simple.decode(globals, fixed, namespaces, &mut trial).ok().flatten();
            if expected.as_ref() != Some(&value) {
                let error = ValidationError::new(format!(
                    "attribute {} has value '{}', but its fixed value is '{}'",
                    self.name, text, fixed
                ))
                .with_schema_component(self.name.to_string())
                .with_reason("fixed value mismatch");
                ctx.raise_or_collect(error)?;
                return Ok(None);
            }
        }
        Ok(Some(value))
    }

    /// Encode a value
    pub fn encode(
        &self,
        globals: &XsdGlobals,
        value: &NativeValue,
        namespaces: Option<&NamespaceContext>,
        ctx: &mut ValidationContext,
    ) -> Result<Option<String>> {
        let text = match globals.expect_simple(self.type_id)?.encode(globals, value, namespaces, ctx)? {
            Some(text) => text,
            None => return Ok(None),
        };
        if let (Some(fixed), true) = (&self.fixed, ctx.checks()) {
            if fixed.trim() != text {
                let error = ValidationError::new(format!(
                    "attribute {} has value '{}', but its fixed value is '{}'",
                    self.name, text, fixed
                ))
                .with_schema_component(self.name.to_string())
                .with_reason("fixed value mismatch");
                ctx.raise_or_collect(error)?;
                return Ok(None);
            }
        }
        Ok(Some(text))
    }
}

/// An attribute declaration as used by a complex type
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUse {
    /// Local declaration or a copy of the referenced global one
    pub decl: AttributeDecl,
    /// Use mode
    pub mode: UseMode,
}

impl AttributeUse {
    /// An optional use
    pub fn optional(decl: AttributeDecl) -> Self {
        Self {
            decl,
            mode: UseMode::Optional,
        }
    }

    /// A required use
    pub fn required(decl: AttributeDecl) -> Self {
        Self {
            decl,
            mode: UseMode::Required,
        }
    }

    /// Check the use against its value constraint
    pub fn new(decl: AttributeDecl, mode: UseMode) -> std::result::Result<Self, SchemaError> {
        if decl.default.is_some() && mode != UseMode::Optional {
            return Err(SchemaError::new("attribute 'use' must be 'optional' if 'default' is present")
                .with_component(decl.name.to_string()));
        }
        Ok(Self { decl, mode })
    }

    /// Attribute name
    pub fn name(&self) -> &QName {
        &self.decl.name
    }
}

/// Global attribute names, for `##defined` in attribute wildcards
struct DefinedAttributes<'a>(&'a XsdGlobals);

impl DefinedNames for DefinedAttributes<'_> {
    fn is_defined(&self, name: &QName) -> bool {
        self.0.attribute(name).is_some()
    }
}

/// Attribute uses of a complex type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeUses {
    uses: IndexMap<QName, AttributeUse>,
    /// `anyAttribute` wildcard
    pub wildcard: Option<Wildcard>,
}

impl AttributeUses {
    /// Create an empty set of uses
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a use, rejecting duplicate names
    pub fn insert(&mut self, attribute_use: AttributeUse) -> std::result::Result<(), SchemaError> {
        let name = attribute_use.name().clone();
        if self.uses.contains_key(&name) {
            return Err(SchemaError::new(format!("duplicate attribute {}", name)));
        }
        self.uses.insert(name, attribute_use);
        Ok(())
    }

    /// Set the `anyAttribute` wildcard
    pub fn with_wildcard(mut self, wildcard: Wildcard) -> Self {
        self.wildcard = Some(wildcard);
        self
    }

    /// Get a use by name
    pub fn get(&self, name: &QName) -> Option<&AttributeUse> {
        self.uses.get(name)
    }

    /// Iterate over the uses in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &AttributeUse> {
        self.uses.values()
    }

    /// Number of uses
    pub fn len(&self) -> usize {
        self.uses.len()
    }

    /// True when there are no uses and no wildcard
    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.wildcard.is_none()
    }

    /// Attribute uses of a type derived by extension
    pub fn extend(base: &AttributeUses, derived: AttributeUses) -> std::result::Result<Self, SchemaError> {
        let mut uses = base.clone();
        for (_, attribute_use) in derived.uses {
            uses.insert(attribute_use).map_err(|e| {
                SchemaError::new(format!("{}: an extension cannot redeclare a base attribute", e.message))
            })?;
        }
        uses.wildcard = match (&base.wildcard, derived.wildcard) {
            (Some(b), Some(d)) => Some(d.union(b)),
            (None, d) => d,
            (b, None) => b.clone(),
        };
        Ok(uses)
    }

    /// Attribute uses of a type derived by restriction
    ///
    /// Base uses that the restriction does not mention are inherited;
    /// prohibited uses remove them.
    pub fn restrict(
        globals: &XsdGlobals,
        base: &AttributeUses,
        derived: AttributeUses,
    ) -> std::result::Result<Self, SchemaError> {
        let mut uses = base.uses.clone();
        for (name, attribute_use) in derived.uses {
            match base.uses.get(&name) {
                Some(base_use) => {
                    if attribute_use.mode == UseMode::Prohibited {
                        if base_use.mode == UseMode::Required {
                            return Err(SchemaError::new(format!(
                                "attribute {} is required in the base type and cannot be prohibited",
                                name
                            )));
                        }
                        uses.shift_remove(&name);
                        continue;
                    }
                    if base_use.mode == UseMode::Required && attribute_use.mode != UseMode::Required {
                        return Err(SchemaError::new(format!(
                            "attribute {} is required in the base type",
                            name
                        )));
                    }
                    if !globals.is_derived_from(attribute_use.decl.type_id, base_use.decl.type_id) {
                        return Err(SchemaError::new(format!(
                            "type of attribute {} is not derived from {}",
                            name,
                            globals.display_name(base_use.decl.type_id)
                        )));
                    }
                    if let Some(fixed) = &base_use.decl.fixed {
                        if attribute_use.decl.fixed.as_ref() != Some(fixed) {
                            return Err(SchemaError::new(format!(
                                "attribute {} must keep the fixed value '{}' of the base type",
                                name, fixed
                            )));
                        }
                    }
                    uses.insert(name, attribute_use);
                }
                None if attribute_use.mode == UseMode::Prohibited => {}
                None => {
                    let scope = NameScope::default();
                    let admitted = base.wildcard.as_ref().is_some_and(|w| w.admits(&name, &scope));
                    if !admitted {
                        return Err(SchemaError::new(format!(
                            "attribute {} is not declared in the base type nor admitted by its wildcard",
                            name
                        )));
                    }
                    uses.insert(name, attribute_use);
                }
            }
        }
        let wildcard = match (&base.wildcard, derived.wildcard) {
            (_, None) => None,
            (None, Some(_)) => {
                return Err(SchemaError::new(
                    "an attribute wildcard cannot be added by restriction",
                ))
            }
            (Some(b), Some(d)) => {
                if !d.is_subset(b) {
                    return Err(SchemaError::new(
                        "the attribute wildcard is not a subset of the base type's wildcard",
                    ));
                }
                Some(d)
            }
        };
        Ok(Self { uses, wildcard })
    }

    /// Decode the attributes of an element
    pub fn decode(
        &self,
        globals: &XsdGlobals,
        attributes: &IndexMap<QName, String>,
        namespaces: Option<&NamespaceContext>,
        ctx: &mut ValidationContext,
    ) -> Result<IndexMap<QName, NativeValue>> {
        let mut result = IndexMap::new();
        let defined = DefinedAttributes(globals);
        let scope = NameScope {
            defined: Some(&defined),
            siblings: None,
        };
        for (name, text) in attributes {
            if name.is_in(Some(crate::XSI_NAMESPACE)) {
                continue;
            }
            let decoded = match self.uses.get(name) {
                Some(u) if u.mode != UseMode::Prohibited => u.decl.decode(globals, text, namespaces, ctx)?,
                _ => match &self.wildcard {
                    Some(wildcard) if wildcard.admits(name, &scope) => {
                        decode_wildcard_attribute(globals, wildcard, name, text, namespaces, ctx)?
                    }
                    _ => {
                        let error = ValidationError::new(format!("attribute {} is not allowed", name))
                            .with_instance(text.clone())
                            .with_reason("unexpected attribute");
                        ctx.raise_or_collect(error)?;
                        if ctx.checks() {
                            None
                        } else {
                            Some(NativeValue::from(text.as_str()))
                        }
                    }
                },
            };
            if let Some(value) = decoded {
                result.insert(name.clone(), value);
            }
        }

        for attribute_use in self.uses.values() {
            let name = attribute_use.name();
            if attributes.contains_key(name) {
                continue;
            }
            match attribute_use.mode {
                UseMode::Required => {
                    let error = ValidationError::new(format!("missing required attribute {}", name))
                        .with_reason("required attribute");
                    ctx.raise_or_collect(error)?;
                }
                UseMode::Optional if ctx.fill_defaults => {
                    if let Some(text) = attribute_use.decl.value_constraint() {
                        let simple = globals.expect_simple(attribute_use.decl.type_id)?;
                        let mut trial = ctx.trial();
                        if let Ok(Some(value)) = simple.decode(globals, text, namespaces, &mut trial) {
                            result.insert(name.clone(), value);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(result)
    }

    /// Encode attribute values into their lexical forms
    pub fn encode(
        &self,
        globals: &XsdGlobals,
        attributes: &IndexMap<QName, NativeValue>,
        namespaces: Option<&NamespaceContext>,
        ctx: &mut ValidationContext,
    ) -> Result<IndexMap<QName, String>> {
        let mut result = IndexMap::new();
        let defined = DefinedAttributes(globals);
        let scope = NameScope {
            defined: Some(&defined),
            siblings: None,
        };
        for (name, value) in attributes {
            if name.is_in(Some(crate::XSI_NAMESPACE)) {
                result.insert(name.clone(), value.to_text());
                continue;
            }
            let encoded = match self.uses.get(name) {
                Some(u) if u.mode != UseMode::Prohibited => u.decl.encode(globals, value, namespaces, ctx)?,
                _ => match &self.wildcard {
                    Some(wildcard) if wildcard.admits(name, &scope) => {
                        match (wildcard.process_contents, globals.attribute(name)) {
                            (ProcessContents::Skip, _) | (ProcessContents::Lax, None) => Some(value.to_text()),
                            (_, Some(decl)) => decl.encode(globals, value, namespaces, ctx)?,
                            (ProcessContents::Strict, None) => {
                                let error = ValidationError::new(format!(
                                    "no global declaration for attribute {} matched by a strict wildcard",
                                    name
                                ));
                                ctx.raise_or_collect(error)?;
                                None
                            }
                        }
                    }
                    _ => {
                        let error = ValidationError::new(format!("attribute {} is not allowed", name))
                            .with_reason("unexpected attribute");
                        ctx.raise_or_collect(error)?;
                        if ctx.checks() {
                            None
                        } else {
                            Some(value.to_text())
                        }
                    }
                },
            };
            if let Some(text) = encoded {
                result.insert(name.clone(), text);
            }
        }

        for attribute_use in self.uses.values() {
            if attribute_use.mode == UseMode::Required && !attributes.contains_key(attribute_use.name()) {
                let error = ValidationError::new(format!("missing required attribute {}", attribute_use.name()))
                    .with_reason("required attribute");
                ctx.raise_or_collect(error)?;
            }
        }
        Ok(result)
    }
}

fn decode_wildcard_attribute(
    globals: &XsdGlobals,
    wildcard: &Wildcard,
    name: &QName,
    text: &str,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<Option<NativeValue>> {
    match (wildcard.process_contents, globals.attribute(name)) {
        (ProcessContents::Skip, _) | (ProcessContents::Lax, None) => Ok(Some(NativeValue::from(text))),
        (_, Some(decl)) => decl.decode(globals, text, namespaces, ctx),
        (ProcessContents::Strict, None) => {
            let error = ValidationError::new(format!(
                "no global declaration for attribute {} matched by a strict wildcard",
                name
            ))
            .with_instance(text.to_string());
            ctx.raise_or_collect(error)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::base::ValidationMode;
    use crate::validators::wildcards::NamespaceConstraint;

    fn xs(globals: &XsdGlobals, name: &str) -> TypeId {
        globals
            .lookup_type(&QName::namespaced(crate::XSD_1_0_NAMESPACE, name))
            .unwrap()
    }

    fn uses(globals: &XsdGlobals) -> AttributeUses {
        let mut uses = AttributeUses::new();
        uses.insert(AttributeUse::required(AttributeDecl::new(QName::local("id"), xs(globals, "int"))))
            .unwrap();
        let lang = AttributeDecl::new(QName::local("lang"), xs(globals, "language"))
            .with_value_constraint(Some("en".into()), None)
            .unwrap();
        uses.insert(AttributeUse::optional(lang)).unwrap();
        uses
    }

    fn attrs(pairs: &[(&str, &str)]) -> IndexMap<QName, String> {
        pairs
            .iter()
            .map(|(k, v)| (QName::local(*k), v.to_string()))
            .collect()
    }

    #[test]
    fn test_decode_fills_defaults() {
        let globals = XsdGlobals::new();
        let uses = uses(&globals);
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        let decoded = uses.decode(&globals, &attrs(&[("id", "7")]), None, &mut ctx).unwrap();
        assert_eq!(decoded.get(&QName::local("id")), Some(&NativeValue::from(7i64)));
        assert_eq!(decoded.get(&QName::local("lang")), Some(&NativeValue::from("en")));
    }

    #[test]
    fn test_missing_and_unknown_attributes() {
        let globals = XsdGlobals::new();
        let uses = uses(&globals);
        let mut strict = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(uses.decode(&globals, &attrs(&[]), None, &mut strict).is_err());

        let mut lax = ValidationContext::with_mode(ValidationMode::Lax);
        let decoded = uses
            .decode(&globals, &attrs(&[("id", "1"), ("extra", "x")]), None, &mut lax)
            .unwrap();
        assert_eq!(lax.errors.len(), 1);
        assert!(!decoded.contains_key(&QName::local("extra")));
    }

    #[test]
    fn test_wildcard_and_xsi_attributes() {
        let globals = XsdGlobals::new();
        let uses = uses(&globals).with_wildcard(
            Wildcard::new(NamespaceConstraint::only([Some("urn:ext")]))
                .with_process_contents(ProcessContents::Lax),
        );
        let mut input = attrs(&[("id", "1")]);
        input.insert(QName::namespaced("urn:ext", "note"), "hi".into());
        input.insert(QName::namespaced(crate::XSI_NAMESPACE, "nil"), "false".into());
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        let decoded = uses.decode(&globals, &input, None, &mut ctx).unwrap();
        assert_eq!(
            decoded.get(&QName::namespaced("urn:ext", "note")),
            Some(&NativeValue::from("hi"))
        );
        assert!(!decoded.contains_key(&QName::namespaced(crate::XSI_NAMESPACE, "nil")));
    }

    #[test]
    fn test_fixed_value() {
        let globals = XsdGlobals::new();
        let decl = AttributeDecl::new(QName::local("v"), xs(&globals, "decimal"))
            .with_value_constraint(None, Some("1.0".into()))
            .unwrap();
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(decl.decode(&globals, "1.00", None, &mut ctx).unwrap().is_some());
        assert!(decl.decode(&globals, "2", None, &mut ctx).is_err());
        assert!(AttributeDecl::new(QName::local("v"), xs(&globals, "int"))
            .with_value_constraint(Some("1".into()), Some("1".into()))
            .is_err());
    }

    #[test]
    fn test_restriction_rules() {
        let globals = XsdGlobals::new();
        let base = uses(&globals);

        let mut prohibit_required = AttributeUses::new();
        prohibit_required
            .insert(AttributeUse::new(AttributeDecl::new(QName::local("id"), xs(&globals, "int")), UseMode::Prohibited).unwrap())
            .unwrap();
        assert!(AttributeUses::restrict(&globals, &base, prohibit_required).is_err());

        let mut narrower = AttributeUses::new();
        narrower
            .insert(AttributeUse::required(AttributeDecl::new(QName::local("id"), xs(&globals, "short"))))
            .unwrap();
        let restricted = AttributeUses::restrict(&globals, &base, narrower).unwrap();
        assert_eq!(restricted.len(), 2);

        let mut new_attr = AttributeUses::new();
        new_attr
            .insert(AttributeUse::optional(AttributeDecl::new(QName::local("new"), xs(&globals, "string"))))
            .unwrap();
        assert!(AttributeUses::restrict(&globals, &base, new_attr).is_err());
    }

    #[test]
    fn test_extension_unions_uses() {
        let globals = XsdGlobals::new();
        let base = uses(&globals);
        let mut derived = AttributeUses::new();
        derived
            .insert(AttributeUse::optional(AttributeDecl::new(QName::local("extra"), xs(&globals, "string"))))
            .unwrap();
        let extended = AttributeUses::extend(&base, derived).unwrap();
        assert_eq!(extended.len(), 3);

        let mut clash = AttributeUses::new();
        clash
            .insert(AttributeUse::optional(AttributeDecl::new(QName::local("id"), xs(&globals, "int"))))
            .unwrap();
        assert!(AttributeUses::extend(&base, clash).is_err());
    }
}

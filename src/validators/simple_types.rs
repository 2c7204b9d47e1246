//! XSD simple types
//!
//! Atomic, list and union varieties as one closed enum. Item and member
//! types are referenced by [`TypeId`] through the [`XsdGlobals`] registry.
//!
//! Decoding returns `Ok(None)` when a lax-mode violation dropped the value;
//! callers treat that as "omit this unit".

use crate::error::{Result, SchemaError, ValidationError};
use crate::namespaces::{NamespaceContext, QName};

use super::base::ValidationMode;
use super::builtins::{AtomicKind, BuiltinType, Coerced, XsdValue};
use super::facets::{Facet, FacetKind, FacetSet, Pattern, WhiteSpace};
use super::globals::{TypeId, XsdGlobals};
use super::validation::ValidationContext;
use super::values::NativeValue;

const LIST_FACETS: &[FacetKind] = &[
    FacetKind::Length,
    FacetKind::MinLength,
    FacetKind::MaxLength,
    FacetKind::Pattern,
    FacetKind::Enumeration,
    FacetKind::WhiteSpace,
];

const UNION_FACETS: &[FacetKind] = &[FacetKind::Pattern, FacetKind::Enumeration];

/// Variety of a simple type
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleTypeVariety {
    /// A single value of a primitive
    Atomic {
        /// Value space
        primitive: AtomicKind,
    },
    /// Whitespace separated items of an atomic or union type
    List {
        /// Item type
        item: TypeId,
    },
    /// A value of the first member type that accepts it
    Union {
        /// Member types, in declaration order
        members: Vec<TypeId>,
    },
}

/// A facet as written in a restriction: name, literal value and `fixed` flag
#[derive(Debug, Clone, PartialEq)]
pub struct FacetDef {
    /// Facet name
    pub kind: FacetKind,
    /// Literal value
    pub value: String,
    /// The facet cannot be changed by further restrictions
    pub fixed: bool,
}

impl FacetDef {
    /// A non-fixed facet
    pub fn new(kind: FacetKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            fixed: false,
        }
    }

    /// Mark the facet as fixed
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

/// A simple type definition
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleType {
    /// Name of a global type, `None` for anonymous types
    pub name: Option<QName>,
    /// Base type (`None` only for anySimpleType)
    pub base: Option<TypeId>,
    /// Atomic, list or union
    pub variety: SimpleTypeVariety,
    /// Effective facets
    pub facets: FacetSet,
}

impl SimpleType {
    /// Build a built-in type from its table entry
    pub(crate) fn builtin(
        builtin: &BuiltinType,
        base: Option<TypeId>,
        list_item: Option<TypeId>,
    ) -> Self {
        let name = Some(QName::namespaced(crate::XSD_1_0_NAMESPACE, builtin.name));
        match list_item {
            Some(item) => Self {
                name,
                base,
                variety: SimpleTypeVariety::List { item },
                facets: FacetSet {
                    white_space: Some(WhiteSpace::Collapse),
                    min_length: Some(1),
                    ..FacetSet::default()
                },
            },
            None => {
                let mut facets = match builtin.range {
                    (None, None) if builtin.kind != AtomicKind::Integer => FacetSet::new(),
                    (min, max) => FacetSet::integer_range(min, max),
                };
                facets.white_space = Some(builtin.kind.default_white_space());
                Self {
                    name,
                    base,
                    variety: SimpleTypeVariety::Atomic {
                        primitive: builtin.kind,
                    },
                    facets,
                }
            }
        }
    }

    /// Derive a type by restriction of `base`
    pub fn restriction(
        globals: &XsdGlobals,
        base: TypeId,
        facets: &[FacetDef],
        namespaces: Option<&NamespaceContext>,
    ) -> std::result::Result<Self, SchemaError> {
        let base_type = globals
            .simple(base)
            .ok_or_else(|| SchemaError::new("the base of a simple type restriction must be a simple type"))?;
        let (kind, admitted) = match &base_type.variety {
            SimpleTypeVariety::Atomic { primitive } => (Some(*primitive), primitive.admitted_facets()),
            SimpleTypeVariety::List { .. } => (None, LIST_FACETS),
            SimpleTypeVariety::Union { .. } => (None, UNION_FACETS),
        };

        let mut parsed: Vec<(Facet, bool)> = Vec::new();
        let mut patterns: Vec<Pattern> = Vec::new();
        let mut enumeration: Vec<NativeValue> = Vec::new();
        for def in facets {
            if !admitted.contains(&def.kind) {
                return Err(SchemaError::new(format!(
                    "facet '{}' is not applicable to type {}",
                    def.kind,
                    base_type.display_name()
                )));
            }
            let invalid = |reason: String| {
                SchemaError::new(format!("invalid {} facet value '{}': {}", def.kind, def.value, reason))
            };
            let value = def.value.trim();
            let facet = match def.kind {
                FacetKind::Length => Facet::Length(parse_count(value).map_err(invalid)?),
                FacetKind::MinLength => Facet::MinLength(parse_count(value).map_err(invalid)?),
                FacetKind::MaxLength => Facet::MaxLength(parse_count(value).map_err(invalid)?),
                FacetKind::TotalDigits => {
                    let n = parse_count(value).map_err(invalid)?;
                    if n == 0 {
                        return Err(invalid("totalDigits must be positive".to_string()));
                    }
                    Facet::TotalDigits(n as u32)
                }
                FacetKind::FractionDigits => Facet::FractionDigits(parse_count(value).map_err(invalid)? as u32),
                FacetKind::WhiteSpace => Facet::WhiteSpace(value.parse().map_err(|e: crate::error::Error| invalid(e.to_string()))?),
                FacetKind::Pattern => {
                    patterns.push(Pattern::new(&def.value).map_err(invalid)?);
                    continue;
                }
                FacetKind::Enumeration => {
                    let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
                    match base_type.decode(globals, &def.value, namespaces, &mut ctx) {
                        Ok(Some(v)) => enumeration.push(v),
                        Ok(None) => return Err(invalid("not a valid base type value".to_string())),
                        Err(e) => return Err(invalid(e.to_string())),
                    }
                    continue;
                }
                FacetKind::MinInclusive
                | FacetKind::MinExclusive
                | FacetKind::MaxInclusive
                | FacetKind::MaxExclusive => {
                    let primitive = kind.ok_or_else(|| invalid("range facets need an atomic base".to_string()))?;
                    let normalized = base_type.white_space().normalize(value);
                    let bound = primitive.parse(&normalized, namespaces).map_err(invalid)?;
                    match def.kind {
                        FacetKind::MinInclusive => Facet::MinInclusive(bound),
                        FacetKind::MinExclusive => Facet::MinExclusive(bound),
                        FacetKind::MaxInclusive => Facet::MaxInclusive(bound),
                        _ => Facet::MaxExclusive(bound),
                    }
                }
            };
            parsed.push((facet, def.fixed));
        }
        if !patterns.is_empty() {
            parsed.push((Facet::Pattern(patterns), false));
        }
        if !enumeration.is_empty() {
            parsed.push((Facet::Enumeration(enumeration), false));
        }
        if matches!(base_type.variety, SimpleTypeVariety::List { .. })
            && parsed
                .iter()
                .any(|(f, _)| matches!(f, Facet::WhiteSpace(ws) if *ws != WhiteSpace::Collapse))
        {
            return Err(SchemaError::new("the whiteSpace facet of a list type must be 'collapse'"));
        }

        let narrowed = base_type
            .facets
            .restrict(kind, parsed)
            .map_err(SchemaError::new)?;
        tracing::trace!(base = %base_type.display_name(), "simple type restriction checked");
        Ok(Self {
            name: None,
            base: Some(base),
            variety: base_type.variety.clone(),
            facets: narrowed,
        })
    }

    /// Define a list type of `item`
    pub fn list(globals: &XsdGlobals, item: TypeId) -> std::result::Result<Self, SchemaError> {
        let item_type = globals
            .simple(item)
            .ok_or_else(|| SchemaError::new("the item type of a list must be a simple type"))?;
        if matches!(item_type.variety, SimpleTypeVariety::List { .. }) {
            return Err(SchemaError::new(format!(
                "list item type {} cannot itself be a list",
                item_type.display_name()
            )));
        }
        Ok(Self {
            name: None,
            base: Some(globals.any_simple_type()),
            variety: SimpleTypeVariety::List { item },
            facets: FacetSet {
                white_space: Some(WhiteSpace::Collapse),
                ..FacetSet::default()
            },
        })
    }

    /// Define a union of `members`
    pub fn union(globals: &XsdGlobals, members: Vec<TypeId>) -> std::result::Result<Self, SchemaError> {
        if members.is_empty() {
            return Err(SchemaError::new("a union type needs at least one member type"));
        }
        if let Some(bad) = members.iter().find(|m| globals.simple(**m).is_none()) {
            return Err(SchemaError::new(format!(
                "union member {} is not a simple type",
                globals.display_name(*bad)
            )));
        }
        Ok(Self {
            name: None,
            base: Some(globals.any_simple_type()),
            variety: SimpleTypeVariety::Union { members },
            facets: FacetSet::default(),
        })
    }

    /// Set the global name
    pub fn with_name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Name for messages
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "anonymous simpleType".to_string(),
        }
    }

    /// Primitive of an atomic type
    pub fn primitive(&self) -> Option<AtomicKind> {
        match self.variety {
            SimpleTypeVariety::Atomic { primitive } => Some(primitive),
            _ => None,
        }
    }

    /// Effective white space handling
    pub fn white_space(&self) -> WhiteSpace {
        match (self.facets.white_space, &self.variety) {
            (Some(ws), _) => ws,
            (None, SimpleTypeVariety::Atomic { primitive }) => primitive.default_white_space(),
            (None, SimpleTypeVariety::List { .. }) => WhiteSpace::Collapse,
            (None, SimpleTypeVariety::Union { .. }) => WhiteSpace::Preserve,
        }
    }

    fn invalid(&self, text: &str, message: String) -> ValidationError {
        ValidationError::new(message)
            .with_schema_component(self.display_name())
            .with_instance(text.to_string())
    }

    /// Decode text into a native value
    pub fn decode(
        &self,
        globals: &XsdGlobals,
        text: &str,
        namespaces: Option<&NamespaceContext>,
        ctx: &mut ValidationContext,
    ) -> Result<Option<NativeValue>> {
        let normalized = self.white_space().normalize(text);
        let value = match &self.variety {
            SimpleTypeVariety::Atomic { primitive } => match primitive.parse(&normalized, namespaces) {
                Ok(v) => NativeValue::Atomic(v),
                Err(reason) => {
                    let error = self
                        .invalid(text, format!("invalid value '{}' for type {}", normalized, self.display_name()))
                        .with_reason(reason);
                    ctx.raise_or_collect(error)?;
                    return Ok(self.literal_fallback(ctx, &normalized));
                }
            },
            SimpleTypeVariety::List { item } => {
                let item_type = globals.expect_simple(*item)?;
                let mut items = Vec::new();
                for token in normalized.split(' ').filter(|t| !t.is_empty()) {
                    if let Some(v) = item_type.decode(globals, token, namespaces, ctx)? {
                        items.push(v);
                    }
                }
                NativeValue::List(items)
            }
            SimpleTypeVariety::Union { members } => {
                let mut found = None;
                for member in members {
                    let member_type = globals.expect_simple(*member)?;
                    let mut trial = ctx.trial();
                    if let Ok(Some(v)) = member_type.decode(globals, &normalized, namespaces, &mut trial) {
                        found = Some(v);
                        break;
                    }
                }
                match found {
                    Some(v) => v,
                    None => {
                        let error = self.invalid(
                            text,
                            format!("value '{}' is not valid for any member of {}", normalized, self.display_name()),
                        );
                        ctx.raise_or_collect(error)?;
                        return Ok(self.literal_fallback(ctx, &normalized));
                    }
                }
            }
        };

        if ctx.checks() {
            if let Err(error) = self.facets.check(self.primitive(), &value, &normalized) {
                ctx.raise_or_collect(error.with_schema_component(self.display_name()))?;
                return Ok(None);
            }
        }
        Ok(Some(value))
    }

    fn literal_fallback(&self, ctx: &ValidationContext, normalized: &str) -> Option<NativeValue> {
        match ctx.mode {
            ValidationMode::Skip => Some(NativeValue::Atomic(XsdValue::String(normalized.to_string()))),
            _ => None,
        }
    }

    /// Encode a native value into its lexical form
    pub fn encode(
        &self,
        globals: &XsdGlobals,
        value: &NativeValue,
        namespaces: Option<&NamespaceContext>,
        ctx: &mut ValidationContext,
    ) -> Result<Option<String>> {
        Ok(self
            .encode_value(globals, value, namespaces, ctx, false)?
            .map(|(text, _)| text))
    }

    /// Encode, also returning the value in this type's representation.
    /// `droppable` marks list items, which lax mode may omit on coercion failure.
    fn encode_value(
        &self,
        globals: &XsdGlobals,
        value: &NativeValue,
        namespaces: Option<&NamespaceContext>,
        ctx: &mut ValidationContext,
        droppable: bool,
    ) -> Result<Option<(String, NativeValue)>> {
        let (text, coerced) = match &self.variety {
            SimpleTypeVariety::Atomic { primitive } => {
                let atomic = match value {
                    NativeValue::Atomic(v) => v,
                    other => {
                        let error = crate::error::CoercionError::new(
                            format!("expected an atomic value, got {}", shape(other)),
                            self.display_name(),
                        );
                        ctx.coercion_failed(error, droppable)?;
                        return Ok(None);
                    }
                };
                let coerced = match primitive.coerce(atomic) {
                    Ok(Coerced::Exact(v)) => v,
                    Ok(Coerced::Converted(v, reason)) => {
                        ctx.coerced(reason)?;
                        v
                    }
                    Err(error) => {
                        ctx.coercion_failed(error, droppable)?;
                        return Ok(self.literal_text(ctx, atomic));
                    }
                };
                match primitive.format(&coerced, namespaces) {
                    Ok(text) => (text, NativeValue::Atomic(coerced)),
                    Err(reason) => {
                        let error = crate::error::CoercionError::new(reason, self.display_name())
                            .with_value(atomic.to_string());
                        ctx.coercion_failed(error, droppable)?;
                        return Ok(self.literal_text(ctx, atomic));
                    }
                }
            }
            SimpleTypeVariety::List { item } => {
                let item_type = globals.expect_simple(*item)?;
                let items: Vec<NativeValue> = match value {
                    NativeValue::List(items) => items.clone(),
                    NativeValue::Atomic(_) => vec![value.clone()],
                    other => {
                        let error = crate::error::CoercionError::new(
                            format!("expected a list value, got {}", shape(other)),
                            self.display_name(),
                        );
                        ctx.coercion_failed(error, droppable)?;
                        return Ok(None);
                    }
                };
                let mut texts = Vec::new();
                let mut values = Vec::new();
                for item_value in &items {
                    if let Some((text, v)) = item_type.encode_value(globals, item_value, namespaces, ctx, true)? {
                        texts.push(text);
                        values.push(v);
                    }
                }
                (texts.join(" "), NativeValue::List(values))
            }
            SimpleTypeVariety::Union { members } => {
                let mut found = None;
                for member in members {
                    let member_type = globals.expect_simple(*member)?;
                    let mut trial = ctx.trial();
                    if let Ok(Some(pair)) = member_type.encode_value(globals, value, namespaces, &mut trial, false) {
                        found = Some(pair);
                        break;
                    }
                }
                match found {
                    Some(pair) => pair,
                    None => {
                        let literal = match value {
                            NativeValue::Atomic(v) => v.to_string(),
                            other => shape(other).to_string(),
                        };
                        let error = self.invalid(
                            &literal,
                            format!("value {} is not valid for any member of {}", literal, self.display_name()),
                        );
                        ctx.raise_or_collect(error)?;
                        return Ok(match (ctx.mode, value) {
                            (ValidationMode::Skip, NativeValue::Atomic(v)) => self.literal_text(ctx, v),
                            _ => None,
                        });
                    }
                }
            }
        };

        if ctx.checks() {
            if let Err(error) = self.facets.check(self.primitive(), &coerced, &text) {
                ctx.raise_or_collect(error.with_schema_component(self.display_name()))?;
                return Ok(None);
            }
        }
        Ok(Some((text, coerced)))
    }

    fn literal_text(&self, ctx: &ValidationContext, value: &XsdValue) -> Option<(String, NativeValue)> {
        match ctx.mode {
            ValidationMode::Skip => Some((value.to_string(), NativeValue::Atomic(value.clone()))),
            _ => None,
        }
    }
}

fn parse_count(value: &str) -> std::result::Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("'{}' is not a non-negative integer", value))
}

fn shape(value: &NativeValue) -> &'static str {
    match value {
        NativeValue::Atomic(_) => "an atomic value",
        NativeValue::List(_) => "a list",
        NativeValue::Element(_) => "an element",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn xs(name: &str) -> QName {
        QName::namespaced(crate::XSD_1_0_NAMESPACE, name)
    }

    fn int_list(globals: &XsdGlobals) -> SimpleType {
        let int = globals.lookup_type(&xs("int")).unwrap();
        SimpleType::list(globals, int).unwrap()
    }

    fn ints(values: &[i64]) -> NativeValue {
        NativeValue::List(values.iter().map(|v| NativeValue::from(*v)).collect())
    }

    #[test]
    fn test_list_decode_strict_and_lax() {
        let globals = XsdGlobals::new();
        let list = int_list(&globals);

        let mut strict = ValidationContext::with_mode(ValidationMode::Strict);
        let value = list.decode(&globals, "10 25 40", None, &mut strict).unwrap();
        assert_eq!(value, Some(ints(&[10, 25, 40])));

        let mut strict = ValidationContext::with_mode(ValidationMode::Strict);
        let err = list.decode(&globals, "10 25.0 40", None, &mut strict).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let mut lax = ValidationContext::with_mode(ValidationMode::Lax);
        let value = list.decode(&globals, "10 25.0 40", None, &mut lax).unwrap();
        assert_eq!(value, Some(ints(&[10, 40])));
        assert_eq!(lax.errors.len(), 1);
    }

    #[test]
    fn test_skip_keeps_literal_tokens() {
        let globals = XsdGlobals::new();
        let list = int_list(&globals);
        let mut skip = ValidationContext::with_mode(ValidationMode::Skip);
        let value = list.decode(&globals, "10 x", None, &mut skip).unwrap();
        assert_eq!(
            value,
            Some(NativeValue::List(vec![10i64.into(), "x".into()]))
        );
        assert!(!skip.has_errors());
    }

    #[test]
    fn test_builtin_list_needs_an_item() {
        let globals = XsdGlobals::new();
        let tokens = globals.simple(globals.lookup_type(&xs("NMTOKENS")).unwrap()).unwrap();
        assert_eq!(tokens.facets.min_length, Some(1));
        let mut strict = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(tokens.decode(&globals, "", None, &mut strict).is_err());

        let list = int_list(&globals);
        assert_eq!(list.facets.white_space, Some(WhiteSpace::Collapse));
        assert_eq!(list.facets.min_length, None);
    }

    #[test]
    fn test_builtin_range_is_a_validation_error() {
        let globals = XsdGlobals::new();
        let short = globals.simple(globals.lookup_type(&xs("short")).unwrap()).unwrap();
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        let err = short.decode(&globals, "10000000", None, &mut ctx).unwrap_err();
        assert!(err.is_validation());

        let positive = globals
            .simple(globals.lookup_type(&xs("positiveInteger")).unwrap())
            .unwrap();
        let mut ctx = ValidationContext::with_mode(ValidationMode::Lax);
        assert_eq!(positive.decode(&globals, "0", None, &mut ctx).unwrap(), None);
        assert_eq!(ctx.errors.len(), 1);
    }

    #[test]
    fn test_integers_beyond_64_bits() {
        let globals = XsdGlobals::new();
        let unsigned_long = globals.simple(globals.lookup_type(&xs("unsignedLong")).unwrap()).unwrap();
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        assert_eq!(
            unsigned_long.decode(&globals, "18446744073709551615", None, &mut ctx).unwrap(),
            Some(NativeValue::from(u64::MAX))
        );
        let err = unsigned_long
            .decode(&globals, "18446744073709551616", None, &mut ctx)
            .unwrap_err();
        assert!(err.is_validation());

        let integer = globals.simple(globals.lookup_type(&xs("integer")).unwrap()).unwrap();
        assert_eq!(
            integer.decode(&globals, "-99999999999999999999", None, &mut ctx).unwrap(),
            Some(NativeValue::from(-99_999_999_999_999_999_999i128))
        );
        let text = integer
            .encode(&globals, &NativeValue::from(99_999_999_999_999_999_999i128), None, &mut ctx)
            .unwrap();
        assert_eq!(text.as_deref(), Some("99999999999999999999"));
    }

    #[test]
    fn test_restriction_facets() {
        let globals = XsdGlobals::new();
        let string = globals.lookup_type(&xs("string")).unwrap();
        let colors = SimpleType::restriction(
            &globals,
            string,
            &[
                FacetDef::new(FacetKind::Enumeration, "red"),
                FacetDef::new(FacetKind::Enumeration, "green"),
            ],
            None,
        )
        .unwrap();
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(colors.decode(&globals, "red", None, &mut ctx).unwrap().is_some());
        assert!(colors.decode(&globals, "blue", None, &mut ctx).is_err());

        let boolean = globals.lookup_type(&xs("boolean")).unwrap();
        let err = SimpleType::restriction(&globals, boolean, &[FacetDef::new(FacetKind::MaxLength, "3")], None)
            .unwrap_err();
        assert!(err.message.contains("not applicable"));
    }

    #[test]
    fn test_restriction_of_integer_subtype_keeps_range() {
        let globals = XsdGlobals::new();
        let byte = globals.lookup_type(&xs("byte")).unwrap();
        assert!(SimpleType::restriction(&globals, byte, &[FacetDef::new(FacetKind::MaxInclusive, "500")], None).is_err());
        let small = SimpleType::restriction(&globals, byte, &[FacetDef::new(FacetKind::MaxInclusive, "50")], None).unwrap();
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(small.decode(&globals, "51", None, &mut ctx).is_err());
        assert!(small.decode(&globals, " 49 ", None, &mut ctx).is_ok());
    }

    #[test]
    fn test_union_first_member_wins() {
        let globals = XsdGlobals::new();
        let int = globals.lookup_type(&xs("int")).unwrap();
        let boolean = globals.lookup_type(&xs("boolean")).unwrap();
        let union = SimpleType::union(&globals, vec![int, boolean]).unwrap();

        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        assert_eq!(union.decode(&globals, "1", None, &mut ctx).unwrap(), Some(1i64.into()));
        assert_eq!(union.decode(&globals, "true", None, &mut ctx).unwrap(), Some(true.into()));
        assert!(union.decode(&globals, "maybe", None, &mut ctx).is_err());
    }

    #[test]
    fn test_list_encode_modes() {
        let globals = XsdGlobals::new();
        let boolean = globals.lookup_type(&xs("boolean")).unwrap();
        let list = SimpleType::list(&globals, boolean).unwrap();
        let value = NativeValue::List(vec![true.into(), false.into(), 40.0.into()]);

        let mut lax = ValidationContext::with_mode(ValidationMode::Lax);
        let text = list.encode(&globals, &value, None, &mut lax).unwrap();
        assert_eq!(text.as_deref(), Some("true false"));
        assert_eq!(lax.errors.len(), 1);
        assert!(lax.errors[0].is_coercion());

        let mut skip = ValidationContext::with_mode(ValidationMode::Skip);
        let text = list.encode(&globals, &value, None, &mut skip).unwrap();
        assert_eq!(text.as_deref(), Some("true false 40.0"));
        assert!(!skip.has_errors());

        let mut strict = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(matches!(
            list.encode(&globals, &value, None, &mut strict),
            Err(Error::Coercion(_))
        ));
    }

    #[test]
    fn test_atomic_encode_coercion() {
        let globals = XsdGlobals::new();
        let int = globals.simple(globals.lookup_type(&xs("int")).unwrap()).unwrap();

        let mut lax = ValidationContext::with_mode(ValidationMode::Lax);
        let text = int.encode(&globals, &100.0.into(), None, &mut lax).unwrap();
        assert_eq!(text.as_deref(), Some("100"));
        assert_eq!(lax.errors.len(), 1);

        let mut lax = ValidationContext::with_mode(ValidationMode::Lax);
        assert!(int.encode(&globals, &2.5.into(), None, &mut lax).is_err());

        let mut skip = ValidationContext::with_mode(ValidationMode::Skip);
        let text = int.encode(&globals, &2.5.into(), None, &mut skip).unwrap();
        assert_eq!(text.as_deref(), Some("2.5"));

        let mut strict = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(int.encode(&globals, &"3000000000".into(), None, &mut strict).unwrap_err().is_validation());
    }
}

//! XSD built-in types
//!
//! The built-in primitive and derived types, the atomic value representation
//! and the lexical <-> value conversions used by simple types. Integer
//! subtypes are modelled as `integer` plus range facets, so an out-of-range
//! value is a facet (validation) failure rather than a lexical one.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::fmt;

use crate::error::CoercionError;
use crate::namespaces::{NamespaceContext, QName};
use crate::names;

use super::facets::{FacetKind, WhiteSpace};
use super::helpers::{self, LexicalResult};

// =============================================================================
// XSD type names
// =============================================================================

/// XSD anyType type name
pub const XSD_ANY_TYPE: &str = "anyType";
/// XSD anySimpleType type name
pub const XSD_ANY_SIMPLE_TYPE: &str = "anySimpleType";
/// XSD anyAtomicType type name
pub const XSD_ANY_ATOMIC_TYPE: &str = "anyAtomicType";
/// XSD string type name
pub const XSD_STRING: &str = "string";
/// XSD boolean type name
pub const XSD_BOOLEAN: &str = "boolean";
/// XSD decimal type name
pub const XSD_DECIMAL: &str = "decimal";
/// XSD integer type name
pub const XSD_INTEGER: &str = "integer";
/// XSD int type name
pub const XSD_INT: &str = "int";
/// XSD float type name
pub const XSD_FLOAT: &str = "float";
/// XSD double type name
pub const XSD_DOUBLE: &str = "double";
/// XSD QName type name
pub const XSD_QNAME: &str = "QName";

// =============================================================================
// Atomic values
// =============================================================================

/// An atomic value in the value space of a built-in primitive
///
/// Integers are limited to the `i64` range; larger literals are lexical
/// failures.
#[derive(Debug, Clone, PartialEq)]
pub enum XsdValue {
    /// String-like values: string family, anyURI, dates, times and durations
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i128),
    /// Decimal value
    Decimal(Decimal),
    /// Float or double value
    Float(f64),
    /// Decoded hexBinary or base64Binary octets
    Binary(Vec<u8>),
    /// Resolved QName or NOTATION value
    QName(QName),
}

impl XsdValue {
    /// Short description of the representation, used in coercion errors
    pub fn representation(&self) -> &'static str {
        match self {
            XsdValue::String(_) => "string",
            XsdValue::Boolean(_) => "boolean",
            XsdValue::Integer(_) => "integer",
            XsdValue::Decimal(_) => "decimal",
            XsdValue::Float(_) => "float",
            XsdValue::Binary(_) => "bytes",
            XsdValue::QName(_) => "qualified name",
        }
    }
}

impl fmt::Display for XsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XsdValue::String(s) => write!(f, "{}", s),
            XsdValue::Boolean(b) => write!(f, "{}", helpers::format_boolean(*b)),
            XsdValue::Integer(i) => write!(f, "{}", i),
            XsdValue::Decimal(d) => write!(f, "{}", d),
            XsdValue::Float(v) => write!(f, "{}", helpers::format_float(*v)),
            XsdValue::Binary(b) => write!(f, "{}", helpers::format_hex_binary(b)),
            XsdValue::QName(q) => write!(f, "{}", q),
        }
    }
}

// =============================================================================
// Atomic kinds
// =============================================================================

/// Lexical and value space of an atomic type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicKind {
    /// anySimpleType / anyAtomicType: any text
    AnySimple,
    /// xs:string
    String,
    /// xs:normalizedString
    NormalizedString,
    /// xs:token
    Token,
    /// xs:language
    Language,
    /// xs:Name
    Name,
    /// xs:NCName, xs:ID, xs:IDREF, xs:ENTITY
    NCName,
    /// xs:NMTOKEN
    NMToken,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// xs:integer and its subtypes
    Integer,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:duration
    Duration,
    /// xs:dateTime
    DateTime,
    /// xs:date
    Date,
    /// xs:time
    Time,
    /// xs:gYearMonth
    GYearMonth,
    /// xs:gYear
    GYear,
    /// xs:gMonthDay
    GMonthDay,
    /// xs:gDay
    GDay,
    /// xs:gMonth
    GMonth,
    /// xs:hexBinary
    HexBinary,
    /// xs:base64Binary
    Base64Binary,
    /// xs:anyURI
    AnyUri,
    /// xs:QName
    QName,
    /// xs:NOTATION
    Notation,
}

/// Result of converting a native value to the representation of a kind
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// The value already had the expected representation
    Exact(XsdValue),
    /// The value was converted without loss; the error is reported per mode
    Converted(XsdValue, CoercionError),
}

impl Coerced {
    /// The coerced value
    pub fn value(&self) -> &XsdValue {
        match self {
            Coerced::Exact(v) | Coerced::Converted(v, _) => v,
        }
    }
}

const STRING_FACETS: &[FacetKind] = &[
    FacetKind::Length,
    FacetKind::MinLength,
    FacetKind::MaxLength,
    FacetKind::Pattern,
    FacetKind::Enumeration,
    FacetKind::WhiteSpace,
];

const BOOLEAN_FACETS: &[FacetKind] = &[FacetKind::Pattern, FacetKind::WhiteSpace];

const ORDERED_FACETS: &[FacetKind] = &[
    FacetKind::Pattern,
    FacetKind::Enumeration,
    FacetKind::WhiteSpace,
    FacetKind::MaxInclusive,
    FacetKind::MaxExclusive,
    FacetKind::MinInclusive,
    FacetKind::MinExclusive,
];

const DECIMAL_FACETS: &[FacetKind] = &[
    FacetKind::TotalDigits,
    FacetKind::FractionDigits,
    FacetKind::Pattern,
    FacetKind::Enumeration,
    FacetKind::WhiteSpace,
    FacetKind::MaxInclusive,
    FacetKind::MaxExclusive,
    FacetKind::MinInclusive,
    FacetKind::MinExclusive,
];

impl AtomicKind {
    /// Name of the primitive this kind belongs to
    pub fn primitive_name(&self) -> &'static str {
        match self {
            AtomicKind::AnySimple => XSD_ANY_SIMPLE_TYPE,
            AtomicKind::String
            | AtomicKind::NormalizedString
            | AtomicKind::Token
            | AtomicKind::Language
            | AtomicKind::Name
            | AtomicKind::NCName
            | AtomicKind::NMToken => XSD_STRING,
            AtomicKind::Boolean => XSD_BOOLEAN,
            AtomicKind::Decimal | AtomicKind::Integer => XSD_DECIMAL,
            AtomicKind::Float => XSD_FLOAT,
            AtomicKind::Double => XSD_DOUBLE,
            AtomicKind::Duration => "duration",
            AtomicKind::DateTime => "dateTime",
            AtomicKind::Date => "date",
            AtomicKind::Time => "time",
            AtomicKind::GYearMonth => "gYearMonth",
            AtomicKind::GYear => "gYear",
            AtomicKind::GMonthDay => "gMonthDay",
            AtomicKind::GDay => "gDay",
            AtomicKind::GMonth => "gMonth",
            AtomicKind::HexBinary => "hexBinary",
            AtomicKind::Base64Binary => "base64Binary",
            AtomicKind::AnyUri => "anyURI",
            AtomicKind::QName => XSD_QNAME,
            AtomicKind::Notation => "NOTATION",
        }
    }

    /// Facets that may restrict a type of this kind
    pub fn admitted_facets(&self) -> &'static [FacetKind] {
        match self {
            AtomicKind::Boolean => BOOLEAN_FACETS,
            AtomicKind::Decimal | AtomicKind::Integer => DECIMAL_FACETS,
            AtomicKind::Float
            | AtomicKind::Double
            | AtomicKind::Duration
            | AtomicKind::DateTime
            | AtomicKind::Date
            | AtomicKind::Time
            | AtomicKind::GYearMonth
            | AtomicKind::GYear
            | AtomicKind::GMonthDay
            | AtomicKind::GDay
            | AtomicKind::GMonth => ORDERED_FACETS,
            _ => STRING_FACETS,
        }
    }

    /// White space handling of the built-in type
    pub fn default_white_space(&self) -> WhiteSpace {
        match self {
            AtomicKind::AnySimple | AtomicKind::String => WhiteSpace::Preserve,
            AtomicKind::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// True for kinds with a total or partial order (range facets apply)
    pub fn is_ordered(&self) -> bool {
        self.admitted_facets().contains(&FacetKind::MinInclusive)
    }

    /// Parse normalized text into a value of this kind
    ///
    /// QName and NOTATION literals are resolved with `namespaces`; without a
    /// context only unprefixed names are accepted.
    pub fn parse(&self, text: &str, namespaces: Option<&NamespaceContext>) -> LexicalResult<XsdValue> {
        let string = || Ok(XsdValue::String(text.to_string()));
        match self {
            AtomicKind::AnySimple | AtomicKind::String => string(),
            AtomicKind::NormalizedString => {
                if text.contains(['\t', '\n', '\r']) {
                    Err(format!("'{}' is not a normalized string", text))
                } else {
                    string()
                }
            }
            AtomicKind::Token => {
                if text.starts_with(' ') || text.ends_with(' ') || text.contains("  ") {
                    Err(format!("'{}' is not a token", text))
                } else {
                    string()
                }
            }
            AtomicKind::Language => check_name(text, names::is_valid_language, "language tag"),
            AtomicKind::Name => check_name(text, names::is_valid_name, "Name"),
            AtomicKind::NCName => check_name(text, names::is_valid_ncname, "NCName"),
            AtomicKind::NMToken => check_name(text, names::is_valid_nmtoken, "NMTOKEN"),
            AtomicKind::Boolean => helpers::parse_boolean(text).map(XsdValue::Boolean),
            AtomicKind::Decimal => helpers::parse_decimal(text).map(XsdValue::Decimal),
            AtomicKind::Integer => helpers::parse_integer(text).map(XsdValue::Integer),
            AtomicKind::Float | AtomicKind::Double => helpers::parse_float(text).map(XsdValue::Float),
            AtomicKind::Duration => helpers::check_duration_literal(text).and_then(|_| string()),
            AtomicKind::DateTime => helpers::check_datetime_literal(text).and_then(|_| string()),
            AtomicKind::Date => helpers::check_date_literal(text).and_then(|_| string()),
            AtomicKind::Time => helpers::check_time_literal(text).and_then(|_| string()),
            AtomicKind::GYearMonth
            | AtomicKind::GYear
            | AtomicKind::GMonthDay
            | AtomicKind::GDay
            | AtomicKind::GMonth => {
                helpers::check_gregorian_literal(self.primitive_name(), text).and_then(|_| string())
            }
            AtomicKind::HexBinary => helpers::parse_hex_binary(text).map(XsdValue::Binary),
            AtomicKind::Base64Binary => helpers::parse_base64_binary(text).map(XsdValue::Binary),
            AtomicKind::AnyUri => {
                if text.chars().any(|c| c.is_control() || "<>\"{}|\\^`".contains(c)) {
                    Err(format!("'{}' is not a valid URI", text))
                } else {
                    string()
                }
            }
            AtomicKind::QName | AtomicKind::Notation => {
                if !names::is_valid_qname(text) {
                    return Err(format!("'{}' is not a valid QName", text));
                }
                let qname = match (names::split_qname(text), namespaces) {
                    (_, Some(ns)) => ns.resolve(text).map_err(|e| e.to_string())?,
                    ((None, local), None) => QName::local(local),
                    ((Some(prefix), _), None) => {
                        return Err(format!("unbound namespace prefix '{}'", prefix))
                    }
                };
                Ok(XsdValue::QName(qname))
            }
        }
    }

    /// Convert a native value to the representation of this kind
    ///
    /// Strings are parsed as lexical literals. Lossless representation
    /// changes come back as [`Coerced::Converted`]; anything else is a
    /// coercion error.
    pub fn coerce(&self, value: &XsdValue) -> Result<Coerced, CoercionError> {
        let type_name = match self {
            AtomicKind::Integer => format!("xs:{}", XSD_INTEGER),
            _ => format!("xs:{}", self.primitive_name()),
        };
        let incompatible = || {
            CoercionError::new(
                format!("cannot convert {} value to {}", value.representation(), type_name),
                type_name.clone(),
            )
            .with_value(value.to_string())
        };
        let converted = |v: XsdValue| {
            let reason = CoercionError::new(
                format!("{} value converted to {}", value.representation(), type_name),
                type_name.clone(),
            )
            .with_value(value.to_string());
            Ok(Coerced::Converted(v, reason))
        };

        if let XsdValue::String(text) = value {
            let normalized = self.default_white_space().normalize(text);
            return self
                .parse(&normalized, None)
                .map(Coerced::Exact)
                .map_err(|reason| CoercionError::new(reason, type_name.clone()).with_value(text.clone()));
        }

        match (self, value) {
            (AtomicKind::AnySimple, v) => Ok(Coerced::Exact(v.clone())),
            (AtomicKind::Boolean, XsdValue::Boolean(_)) => Ok(Coerced::Exact(value.clone())),
            (AtomicKind::Integer, XsdValue::Integer(_)) => Ok(Coerced::Exact(value.clone())),
            (AtomicKind::Integer, XsdValue::Float(f)) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e38 {
                    converted(XsdValue::Integer(*f as i128))
                } else {
                    Err(incompatible())
                }
            }
            (AtomicKind::Integer, XsdValue::Decimal(d)) if d.fract().is_zero() => d
                .to_i128()
                .map(XsdValue::Integer)
                .map_or_else(|| Err(incompatible()), converted),
            (AtomicKind::Decimal, XsdValue::Decimal(_)) => Ok(Coerced::Exact(value.clone())),
            (AtomicKind::Decimal, XsdValue::Integer(i)) => Decimal::from_i128(*i)
                .map(|d| Coerced::Exact(XsdValue::Decimal(d)))
                .ok_or_else(incompatible),
            (AtomicKind::Decimal, XsdValue::Float(f)) => Decimal::from_f64(*f)
                .map(XsdValue::Decimal)
                .map_or_else(|| Err(incompatible()), converted),
            (AtomicKind::Float | AtomicKind::Double, XsdValue::Float(_)) => Ok(Coerced::Exact(value.clone())),
            (AtomicKind::Float | AtomicKind::Double, XsdValue::Integer(i)) => {
                Ok(Coerced::Exact(XsdValue::Float(*i as f64)))
            }
            (AtomicKind::Float | AtomicKind::Double, XsdValue::Decimal(d)) => d
                .to_f64()
                .map(|f| Coerced::Exact(XsdValue::Float(f)))
                .ok_or_else(incompatible),
            (AtomicKind::HexBinary | AtomicKind::Base64Binary, XsdValue::Binary(_)) => {
                Ok(Coerced::Exact(value.clone()))
            }
            (AtomicKind::QName | AtomicKind::Notation, XsdValue::QName(_)) => Ok(Coerced::Exact(value.clone())),
            _ => Err(incompatible()),
        }
    }

    /// Canonical lexical form of a value already in this kind's representation
    pub fn format(&self, value: &XsdValue, namespaces: Option<&NamespaceContext>) -> LexicalResult<String> {
        match (self, value) {
            (AtomicKind::HexBinary, XsdValue::Binary(b)) => Ok(helpers::format_hex_binary(b)),
            (AtomicKind::Base64Binary, XsdValue::Binary(b)) => Ok(helpers::format_base64_binary(b)),
            (_, XsdValue::QName(q)) => match q.ns() {
                None => Ok(q.local_name.clone()),
                Some(ns) => {
                    let ctx = namespaces.ok_or_else(|| format!("no prefix available for namespace '{}'", ns))?;
                    if ctx.get_default_namespace() == Some(ns) {
                        Ok(q.local_name.clone())
                    } else {
                        ctx.prefix_for(ns)
                            .map(|prefix| format!("{}:{}", prefix, q.local_name))
                            .ok_or_else(|| format!("no prefix bound to namespace '{}'", ns))
                    }
                }
            },
            (_, v) => Ok(v.to_string()),
        }
    }
}

fn check_name(text: &str, valid: fn(&str) -> bool, what: &str) -> LexicalResult<XsdValue> {
    if valid(text) {
        Ok(XsdValue::String(text.to_string()))
    } else {
        Err(format!("'{}' is not a valid {}", text, what))
    }
}

// =============================================================================
// Built-in type table
// =============================================================================

/// Definition of a built-in simple type
#[derive(Debug, Clone)]
pub struct BuiltinType {
    /// Local name in the XSD namespace
    pub name: &'static str,
    /// Local name of the base type (`None` for anySimpleType)
    pub base: Option<&'static str>,
    /// Value space
    pub kind: AtomicKind,
    /// Item type name for the built-in list types
    pub list_item: Option<&'static str>,
    /// Inclusive integer bounds of the integer subtypes
    pub range: (Option<i128>, Option<i128>),
}

impl BuiltinType {
    const fn atomic(name: &'static str, base: &'static str, kind: AtomicKind) -> Self {
        Self {
            name,
            base: Some(base),
            kind,
            list_item: None,
            range: (None, None),
        }
    }

    const fn integer(name: &'static str, base: &'static str, min: Option<i128>, max: Option<i128>) -> Self {
        Self {
            name,
            base: Some(base),
            kind: AtomicKind::Integer,
            list_item: None,
            range: (min, max),
        }
    }

    const fn list(name: &'static str, item: &'static str) -> Self {
        Self {
            name,
            base: Some(XSD_ANY_SIMPLE_TYPE),
            kind: AtomicKind::AnySimple,
            list_item: Some(item),
            range: (None, None),
        }
    }
}

lazy_static::lazy_static! {
    /// Registry of the built-in simple types, bases before derived types
    pub static ref BUILTIN_TYPES: Vec<BuiltinType> = vec![
        BuiltinType {
            name: XSD_ANY_SIMPLE_TYPE,
            base: None,
            kind: AtomicKind::AnySimple,
            list_item: None,
            range: (None, None),
        },
        BuiltinType::atomic(XSD_ANY_ATOMIC_TYPE, XSD_ANY_SIMPLE_TYPE, AtomicKind::AnySimple),
        // primitives
        BuiltinType::atomic(XSD_STRING, XSD_ANY_ATOMIC_TYPE, AtomicKind::String),
        BuiltinType::atomic(XSD_BOOLEAN, XSD_ANY_ATOMIC_TYPE, AtomicKind::Boolean),
        BuiltinType::atomic(XSD_DECIMAL, XSD_ANY_ATOMIC_TYPE, AtomicKind::Decimal),
        BuiltinType::atomic(XSD_FLOAT, XSD_ANY_ATOMIC_TYPE, AtomicKind::Float),
        BuiltinType::atomic(XSD_DOUBLE, XSD_ANY_ATOMIC_TYPE, AtomicKind::Double),
        BuiltinType::atomic("duration", XSD_ANY_ATOMIC_TYPE, AtomicKind::Duration),
        BuiltinType::atomic("dateTime", XSD_ANY_ATOMIC_TYPE, AtomicKind::DateTime),
        BuiltinType::atomic("time", XSD_ANY_ATOMIC_TYPE, AtomicKind::Time),
        BuiltinType::atomic("date", XSD_ANY_ATOMIC_TYPE, AtomicKind::Date),
        BuiltinType::atomic("gYearMonth", XSD_ANY_ATOMIC_TYPE, AtomicKind::GYearMonth),
        BuiltinType::atomic("gYear", XSD_ANY_ATOMIC_TYPE, AtomicKind::GYear),
        BuiltinType::atomic("gMonthDay", XSD_ANY_ATOMIC_TYPE, AtomicKind::GMonthDay),
        BuiltinType::atomic("gDay", XSD_ANY_ATOMIC_TYPE, AtomicKind::GDay),
        BuiltinType::atomic("gMonth", XSD_ANY_ATOMIC_TYPE, AtomicKind::GMonth),
        BuiltinType::atomic("hexBinary", XSD_ANY_ATOMIC_TYPE, AtomicKind::HexBinary),
        BuiltinType::atomic("base64Binary", XSD_ANY_ATOMIC_TYPE, AtomicKind::Base64Binary),
        BuiltinType::atomic("anyURI", XSD_ANY_ATOMIC_TYPE, AtomicKind::AnyUri),
        BuiltinType::atomic(XSD_QNAME, XSD_ANY_ATOMIC_TYPE, AtomicKind::QName),
        BuiltinType::atomic("NOTATION", XSD_ANY_ATOMIC_TYPE, AtomicKind::Notation),
        // string family
        BuiltinType::atomic("normalizedString", XSD_STRING, AtomicKind::NormalizedString),
        BuiltinType::atomic("token", "normalizedString", AtomicKind::Token),
        BuiltinType::atomic("language", "token", AtomicKind::Language),
        BuiltinType::atomic("Name", "token", AtomicKind::Name),
        BuiltinType::atomic("NMTOKEN", "token", AtomicKind::NMToken),
        BuiltinType::atomic("NCName", "Name", AtomicKind::NCName),
        BuiltinType::atomic("ID", "NCName", AtomicKind::NCName),
        BuiltinType::atomic("IDREF", "NCName", AtomicKind::NCName),
        BuiltinType::atomic("ENTITY", "NCName", AtomicKind::NCName),
        // integer family
        BuiltinType::integer(XSD_INTEGER, XSD_DECIMAL, None, None),
        BuiltinType::integer("long", XSD_INTEGER, Some(i64::MIN as i128), Some(i64::MAX as i128)),
        BuiltinType::integer(XSD_INT, "long", Some(i32::MIN as i128), Some(i32::MAX as i128)),
        BuiltinType::integer("short", XSD_INT, Some(i16::MIN as i128), Some(i16::MAX as i128)),
        BuiltinType::integer("byte", "short", Some(i8::MIN as i128), Some(i8::MAX as i128)),
        BuiltinType::integer("nonNegativeInteger", XSD_INTEGER, Some(0), None),
        BuiltinType::integer("positiveInteger", "nonNegativeInteger", Some(1), None),
        BuiltinType::integer("unsignedLong", "nonNegativeInteger", Some(0), Some(u64::MAX as i128)),
        BuiltinType::integer("unsignedInt", "unsignedLong", Some(0), Some(u32::MAX as i128)),
        BuiltinType::integer("unsignedShort", "unsignedInt", Some(0), Some(u16::MAX as i128)),
        BuiltinType::integer("unsignedByte", "unsignedShort", Some(0), Some(u8::MAX as i128)),
        BuiltinType::integer("nonPositiveInteger", XSD_INTEGER, None, Some(0)),
        BuiltinType::integer("negativeInteger", "nonPositiveInteger", None, Some(-1)),
        // lists
        BuiltinType::list("NMTOKENS", "NMTOKEN"),
        BuiltinType::list("IDREFS", "IDREF"),
        BuiltinType::list("ENTITIES", "ENTITY"),
    ];
}

/// Look up a built-in simple type by local name
pub fn get_builtin_type(name: &str) -> Option<&'static BuiltinType> {
    BUILTIN_TYPES.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_bases_come_first() {
        for (i, builtin) in BUILTIN_TYPES.iter().enumerate() {
            if let Some(base) = builtin.base {
                let pos = BUILTIN_TYPES.iter().position(|t| t.name == base).unwrap();
                assert!(pos < i, "{} listed before its base {}", builtin.name, base);
            }
        }
        assert_eq!(get_builtin_type("short").unwrap().range, (Some(-32768), Some(32767)));
        assert!(get_builtin_type("nope").is_none());
    }

    #[test]
    fn test_parse_lexical() {
        assert_eq!(AtomicKind::Integer.parse("42", None), Ok(XsdValue::Integer(42)));
        assert!(AtomicKind::Integer.parse("25.0", None).is_err());
        assert_eq!(AtomicKind::Boolean.parse("1", None), Ok(XsdValue::Boolean(true)));
        assert!(AtomicKind::NCName.parse("a:b", None).is_err());
        assert!(AtomicKind::Token.parse("a  b", None).is_err());
        assert!(AtomicKind::Date.parse("2023-13-01", None).is_err());
    }

    #[test]
    fn test_parse_qname() {
        let mut ns = NamespaceContext::new();
        ns.add_prefix("tns", "http://example.com/ns");
        assert_eq!(
            AtomicKind::QName.parse("tns:item", Some(&ns)),
            Ok(XsdValue::QName(QName::namespaced("http://example.com/ns", "item")))
        );
        assert!(AtomicKind::QName.parse("zz:item", Some(&ns)).is_err());
        assert!(AtomicKind::QName.parse("zz:item", None).is_err());
        assert_eq!(
            AtomicKind::QName.parse("item", None),
            Ok(XsdValue::QName(QName::local("item")))
        );
    }

    #[test]
    fn test_coerce_exact_and_converted() {
        assert!(matches!(
            AtomicKind::Integer.coerce(&XsdValue::Integer(5)),
            Ok(Coerced::Exact(XsdValue::Integer(5)))
        ));
        assert!(matches!(
            AtomicKind::Integer.coerce(&XsdValue::Float(100.0)),
            Ok(Coerced::Converted(XsdValue::Integer(100), _))
        ));
        assert!(matches!(
            AtomicKind::Decimal.coerce(&XsdValue::Integer(1)),
            Ok(Coerced::Exact(XsdValue::Decimal(_)))
        ));
        assert!(matches!(
            AtomicKind::Float.coerce(&XsdValue::String("2.5".into())),
            Ok(Coerced::Exact(XsdValue::Float(f))) if f == 2.5
        ));
    }

    #[test]
    fn test_coerce_incompatible() {
        assert!(AtomicKind::Boolean.coerce(&XsdValue::Float(40.0)).is_err());
        assert!(AtomicKind::Integer.coerce(&XsdValue::Float(2.5)).is_err());
        assert!(AtomicKind::Float.coerce(&XsdValue::String("hello".into())).is_err());
        assert!(AtomicKind::String.coerce(&XsdValue::Integer(3)).is_err());
        let err = AtomicKind::Boolean.coerce(&XsdValue::Float(40.0)).unwrap_err();
        assert_eq!(err.value.as_deref(), Some("40.0"));
    }

    #[test]
    fn test_format() {
        assert_eq!(AtomicKind::Float.format(&XsdValue::Float(40.0), None).unwrap(), "40.0");
        assert_eq!(
            AtomicKind::Base64Binary.format(&XsdValue::Binary(b"Hi".to_vec()), None).unwrap(),
            "SGk="
        );
        let mut ns = NamespaceContext::new();
        ns.add_prefix("p", "urn:p");
        let q = XsdValue::QName(QName::namespaced("urn:p", "x"));
        assert_eq!(AtomicKind::QName.format(&q, Some(&ns)).unwrap(), "p:x");
        assert!(AtomicKind::QName.format(&q, None).is_err());
    }
}

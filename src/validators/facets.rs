//! XSD constraining facets
//!
//! A [`FacetSet`] is the accumulated set of facets of a simple type: the
//! built-in ones plus every restriction step. Restriction narrows a base set
//! ([`FacetSet::restrict`]) and decoding checks values against it
//! ([`FacetSet::check`]).

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result, ValidationError};

use super::builtins::{AtomicKind, XsdValue};
use super::helpers;
use super::values::NativeValue;

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace, then collapse runs of spaces and trim
    Collapse,
}

impl WhiteSpace {
    /// Facet literal
    pub fn as_str(&self) -> &'static str {
        match self {
            WhiteSpace::Preserve => "preserve",
            WhiteSpace::Replace => "replace",
            WhiteSpace::Collapse => "collapse",
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s
                .split([' ', '\t', '\n', '\r'])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl FromStr for WhiteSpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::Value(format!(
                "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                s
            ))),
        }
    }
}

/// Facet names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// length
    Length,
    /// minLength
    MinLength,
    /// maxLength
    MaxLength,
    /// pattern
    Pattern,
    /// enumeration
    Enumeration,
    /// whiteSpace
    WhiteSpace,
    /// maxInclusive
    MaxInclusive,
    /// maxExclusive
    MaxExclusive,
    /// minInclusive
    MinInclusive,
    /// minExclusive
    MinExclusive,
    /// totalDigits
    TotalDigits,
    /// fractionDigits
    FractionDigits,
}

impl FacetKind {
    /// Local name of the facet element
    pub fn name(&self) -> &'static str {
        match self {
            FacetKind::Length => "length",
            FacetKind::MinLength => "minLength",
            FacetKind::MaxLength => "maxLength",
            FacetKind::Pattern => "pattern",
            FacetKind::Enumeration => "enumeration",
            FacetKind::WhiteSpace => "whiteSpace",
            FacetKind::MaxInclusive => "maxInclusive",
            FacetKind::MaxExclusive => "maxExclusive",
            FacetKind::MinInclusive => "minInclusive",
            FacetKind::MinExclusive => "minExclusive",
            FacetKind::TotalDigits => "totalDigits",
            FacetKind::FractionDigits => "fractionDigits",
        }
    }

    /// Facet for an element local name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "length" => FacetKind::Length,
            "minLength" => FacetKind::MinLength,
            "maxLength" => FacetKind::MaxLength,
            "pattern" => FacetKind::Pattern,
            "enumeration" => FacetKind::Enumeration,
            "whiteSpace" => FacetKind::WhiteSpace,
            "maxInclusive" => FacetKind::MaxInclusive,
            "maxExclusive" => FacetKind::MaxExclusive,
            "minInclusive" => FacetKind::MinInclusive,
            "minExclusive" => FacetKind::MinExclusive,
            "totalDigits" => FacetKind::TotalDigits,
            "fractionDigits" => FacetKind::FractionDigits,
            _ => return None,
        })
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Patterns
// =============================================================================

const NAME_START: &str = r"\p{L}_:";
const NAME_CHAR: &str = r"\p{L}\p{M}\p{N}._:\-";

/// Translate an XSD regular expression into an anchored `regex` pattern
pub fn translate_pattern(xsd: &str) -> std::result::Result<String, String> {
    let mut out = String::from("^(?:");
    let mut chars = xsd.chars().peekable();
    let mut class_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| format!("trailing backslash in pattern '{}'", xsd))?;
                match (escaped, class_depth > 0) {
                    ('i', true) => out.push_str(NAME_START),
                    ('c', true) => out.push_str(NAME_CHAR),
                    ('i', false) => out.push_str(&format!("[{}]", NAME_START)),
                    ('c', false) => out.push_str(&format!("[{}]", NAME_CHAR)),
                    ('I', false) => out.push_str(&format!("[^{}]", NAME_START)),
                    ('C', false) => out.push_str(&format!("[^{}]", NAME_CHAR)),
                    ('I' | 'C', true) => {
                        return Err(format!("'\\{}' inside a character class is not supported", escaped))
                    }
                    (other, _) => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' => {
                class_depth += 1;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            // character class subtraction
            '-' if class_depth > 0 && chars.peek() == Some(&'[') => out.push_str("--"),
            '^' | '$' if class_depth == 0 => {
                out.push('\\');
                out.push(c);
            }
            '&' | '~' if class_depth > 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    if class_depth > 0 {
        return Err(format!("unterminated character class in pattern '{}'", xsd));
    }
    out.push_str(")$");
    Ok(out)
}

/// A compiled pattern facet value
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile an XSD regular expression
    pub fn new(xsd: &str) -> std::result::Result<Self, String> {
        let translated = translate_pattern(xsd)?;
        let regex = Regex::new(&translated)
            .map_err(|e| format!("invalid pattern '{}': {}", xsd, e))?;
        Ok(Self {
            source: xsd.to_string(),
            regex,
        })
    }

    /// The pattern as written in the schema
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the whole text matches
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

// =============================================================================
// Facet values
// =============================================================================

/// One facet of a restriction step, with its value parsed
#[derive(Debug, Clone, PartialEq)]
pub enum Facet {
    /// Exact length
    Length(usize),
    /// Minimum length
    MinLength(usize),
    /// Maximum length
    MaxLength(usize),
    /// Patterns of a single derivation step (any one must match)
    Pattern(Vec<Pattern>),
    /// Allowed values
    Enumeration(Vec<NativeValue>),
    /// White space handling
    WhiteSpace(WhiteSpace),
    /// Inclusive upper bound
    MaxInclusive(XsdValue),
    /// Exclusive upper bound
    MaxExclusive(XsdValue),
    /// Inclusive lower bound
    MinInclusive(XsdValue),
    /// Exclusive lower bound
    MinExclusive(XsdValue),
    /// Maximum number of significant digits
    TotalDigits(u32),
    /// Maximum number of fraction digits
    FractionDigits(u32),
}

impl Facet {
    /// The facet name
    pub fn kind(&self) -> FacetKind {
        match self {
            Facet::Length(_) => FacetKind::Length,
            Facet::MinLength(_) => FacetKind::MinLength,
            Facet::MaxLength(_) => FacetKind::MaxLength,
            Facet::Pattern(_) => FacetKind::Pattern,
            Facet::Enumeration(_) => FacetKind::Enumeration,
            Facet::WhiteSpace(_) => FacetKind::WhiteSpace,
            Facet::MaxInclusive(_) => FacetKind::MaxInclusive,
            Facet::MaxExclusive(_) => FacetKind::MaxExclusive,
            Facet::MinInclusive(_) => FacetKind::MinInclusive,
            Facet::MinExclusive(_) => FacetKind::MinExclusive,
            Facet::TotalDigits(_) => FacetKind::TotalDigits,
            Facet::FractionDigits(_) => FacetKind::FractionDigits,
        }
    }
}

// Integers beyond the 96-bit decimal range order by sign alone
fn compare_integer_decimal(x: i128, y: &rust_decimal::Decimal) -> Ordering {
    use rust_decimal::prelude::FromPrimitive;

    match rust_decimal::Decimal::from_i128(x) {
        Some(x) => x.cmp(y),
        None if x > 0 => Ordering::Greater,
        None => Ordering::Less,
    }
}

/// Order two atomic values of the same kind; `None` when incomparable
pub fn compare_values(kind: Option<AtomicKind>, a: &XsdValue, b: &XsdValue) -> Option<Ordering> {
    use rust_decimal::prelude::ToPrimitive;

    match (a, b) {
        (XsdValue::Integer(x), XsdValue::Integer(y)) => Some(x.cmp(y)),
        (XsdValue::Decimal(x), XsdValue::Decimal(y)) => Some(x.cmp(y)),
        (XsdValue::Integer(x), XsdValue::Decimal(y)) => Some(compare_integer_decimal(*x, y)),
        (XsdValue::Decimal(x), XsdValue::Integer(y)) => Some(compare_integer_decimal(*y, x).reverse()),
        (XsdValue::Float(x), XsdValue::Float(y)) => x.partial_cmp(y),
        (XsdValue::Float(x), XsdValue::Integer(y)) => x.partial_cmp(&(*y as f64)),
        (XsdValue::Integer(x), XsdValue::Float(y)) => (*x as f64).partial_cmp(y),
        (XsdValue::Float(x), XsdValue::Decimal(y)) => x.partial_cmp(&y.to_f64()?),
        (XsdValue::Decimal(x), XsdValue::Float(y)) => x.to_f64()?.partial_cmp(y),
        (XsdValue::String(x), XsdValue::String(y)) => match kind {
            Some(kind) if kind.is_ordered() => helpers::compare_temporal(kind.primitive_name(), x, y),
            _ => None,
        },
        _ => None,
    }
}

// =============================================================================
// Facet sets
// =============================================================================

/// The effective facets of a simple type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetSet {
    /// White space handling applied before lexical checks
    pub white_space: Option<WhiteSpace>,
    /// Exact length
    pub length: Option<usize>,
    /// Minimum length
    pub min_length: Option<usize>,
    /// Maximum length
    pub max_length: Option<usize>,
    /// Pattern groups: every group must have a matching pattern
    pub patterns: Vec<Vec<Pattern>>,
    /// Allowed values
    pub enumeration: Option<Vec<NativeValue>>,
    /// Inclusive lower bound
    pub min_inclusive: Option<XsdValue>,
    /// Exclusive lower bound
    pub min_exclusive: Option<XsdValue>,
    /// Inclusive upper bound
    pub max_inclusive: Option<XsdValue>,
    /// Exclusive upper bound
    pub max_exclusive: Option<XsdValue>,
    /// Maximum total digits
    pub total_digits: Option<u32>,
    /// Maximum fraction digits
    pub fraction_digits: Option<u32>,
    pub(crate) fixed: Vec<FacetKind>,
}

fn bound_error(kind: FacetKind, value: &XsdValue, relation: &str, base: FacetKind, base_value: &XsdValue) -> String {
    format!(
        "{} value {} must be {} the base {} value {}",
        kind, value, relation, base, base_value
    )
}

impl FacetSet {
    /// An empty facet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Facets of an integer subtype with inclusive bounds
    pub fn integer_range(min: Option<i128>, max: Option<i128>) -> Self {
        Self {
            white_space: Some(WhiteSpace::Collapse),
            fraction_digits: Some(0),
            min_inclusive: min.map(XsdValue::Integer),
            max_inclusive: max.map(XsdValue::Integer),
            ..Self::default()
        }
    }

    /// True when the facet is fixed and cannot change in restrictions
    pub fn is_fixed(&self, kind: FacetKind) -> bool {
        self.fixed.contains(&kind)
    }

    fn check_bound(
        kind: Option<AtomicKind>,
        facet: FacetKind,
        value: &XsdValue,
        base: Option<&XsdValue>,
        base_facet: FacetKind,
        allowed: &[Ordering],
        relation: &str,
    ) -> std::result::Result<(), String> {
        if let Some(base_value) = base {
            match compare_values(kind, value, base_value) {
                Some(ord) if allowed.contains(&ord) => {}
                Some(_) => return Err(bound_error(facet, value, relation, base_facet, base_value)),
                None => {
                    return Err(format!(
                        "{} value {} is not comparable with the base {} value {}",
                        facet, value, base_facet, base_value
                    ))
                }
            }
        }
        Ok(())
    }

    /// Apply the facets of a restriction step, checking they narrow `self`
    ///
    /// `kind` is the primitive of an atomic type, `None` for list and union
    /// types. Each facet comes with its `fixed` flag.
    pub fn restrict(
        &self,
        kind: Option<AtomicKind>,
        facets: Vec<(Facet, bool)>,
    ) -> std::result::Result<FacetSet, String> {
        use Ordering::{Equal, Greater, Less};

        let mut derived = self.clone();
        for (facet, fixed) in facets {
            let facet_kind = facet.kind();
            if self.is_fixed(facet_kind) && !self.same_value(&facet) {
                return Err(format!("the {} facet is fixed in the base type", facet_kind));
            }
            match facet {
                Facet::Length(n) => {
                    if self.length.is_some_and(|l| l != n) {
                        return Err(format!("length {} differs from the base length", n));
                    }
                    if self.min_length.is_some_and(|m| n < m) || self.max_length.is_some_and(|m| n > m) {
                        return Err(format!("length {} is outside the base length bounds", n));
                    }
                    derived.length = Some(n);
                }
                Facet::MinLength(n) => {
                    if self.min_length.is_some_and(|m| n < m) {
                        return Err(format!("minLength {} is lower than the base minLength", n));
                    }
                    if self.max_length.is_some_and(|m| n > m) || self.length.is_some_and(|l| n > l) {
                        return Err(format!("minLength {} exceeds the base maximum length", n));
                    }
                    derived.min_length = Some(n);
                }
                Facet::MaxLength(n) => {
                    if self.max_length.is_some_and(|m| n > m) {
                        return Err(format!("maxLength {} is greater than the base maxLength", n));
                    }
                    if self.min_length.is_some_and(|m| n < m) || self.length.is_some_and(|l| n < l) {
                        return Err(format!("maxLength {} is lower than the base minimum length", n));
                    }
                    derived.max_length = Some(n);
                }
                Facet::Pattern(group) => derived.patterns.push(group),
                Facet::Enumeration(values) => derived.enumeration = Some(values),
                Facet::WhiteSpace(ws) => {
                    if self.white_space.is_some_and(|base| ws < base) {
                        return Err(format!(
                            "whiteSpace '{}' is weaker than the base whiteSpace",
                            ws.as_str()
                        ));
                    }
                    derived.white_space = Some(ws);
                }
                Facet::MinInclusive(v) => {
                    let f = FacetKind::MinInclusive;
                    Self::check_bound(kind, f, &v, self.min_inclusive.as_ref(), FacetKind::MinInclusive, &[Greater, Equal], "at least")?;
                    Self::check_bound(kind, f, &v, self.min_exclusive.as_ref(), FacetKind::MinExclusive, &[Greater], "greater than")?;
                    Self::check_bound(kind, f, &v, self.max_inclusive.as_ref(), FacetKind::MaxInclusive, &[Less, Equal], "at most")?;
                    Self::check_bound(kind, f, &v, self.max_exclusive.as_ref(), FacetKind::MaxExclusive, &[Less], "lower than")?;
                    derived.min_inclusive = Some(v);
                    derived.min_exclusive = None;
                }
                Facet::MinExclusive(v) => {
                    let f = FacetKind::MinExclusive;
                    Self::check_bound(kind, f, &v, self.min_inclusive.as_ref(), FacetKind::MinInclusive, &[Greater, Equal], "at least")?;
                    Self::check_bound(kind, f, &v, self.min_exclusive.as_ref(), FacetKind::MinExclusive, &[Greater, Equal], "at least")?;
                    Self::check_bound(kind, f, &v, self.max_inclusive.as_ref(), FacetKind::MaxInclusive, &[Less], "lower than")?;
                    Self::check_bound(kind, f, &v, self.max_exclusive.as_ref(), FacetKind::MaxExclusive, &[Less], "lower than")?;
                    derived.min_exclusive = Some(v);
                    derived.min_inclusive = None;
                }
                Facet::MaxInclusive(v) => {
                    let f = FacetKind::MaxInclusive;
                    Self::check_bound(kind, f, &v, self.max_inclusive.as_ref(), FacetKind::MaxInclusive, &[Less, Equal], "at most")?;
                    Self::check_bound(kind, f, &v, self.max_exclusive.as_ref(), FacetKind::MaxExclusive, &[Less], "lower than")?;
                    Self::check_bound(kind, f, &v, self.min_inclusive.as_ref(), FacetKind::MinInclusive, &[Greater, Equal], "at least")?;
                    Self::check_bound(kind, f, &v, self.min_exclusive.as_ref(), FacetKind::MinExclusive, &[Greater], "greater than")?;
                    derived.max_inclusive = Some(v);
                    derived.max_exclusive = None;
                }
                Facet::MaxExclusive(v) => {
                    let f = FacetKind::MaxExclusive;
                    Self::check_bound(kind, f, &v, self.max_inclusive.as_ref(), FacetKind::MaxInclusive, &[Less, Equal], "at most")?;
                    Self::check_bound(kind, f, &v, self.max_exclusive.as_ref(), FacetKind::MaxExclusive, &[Less, Equal], "at most")?;
                    Self::check_bound(kind, f, &v, self.min_inclusive.as_ref(), FacetKind::MinInclusive, &[Greater], "greater than")?;
                    Self::check_bound(kind, f, &v, self.min_exclusive.as_ref(), FacetKind::MinExclusive, &[Greater], "greater than")?;
                    derived.max_exclusive = Some(v);
                    derived.max_inclusive = None;
                }
                Facet::TotalDigits(n) => {
                    if self.total_digits.is_some_and(|t| n > t) {
                        return Err(format!("totalDigits {} is greater than the base totalDigits", n));
                    }
                    derived.total_digits = Some(n);
                }
                Facet::FractionDigits(n) => {
                    if self.fraction_digits.is_some_and(|t| n > t) {
                        return Err(format!(
                            "fractionDigits {} is greater than the base fractionDigits",
                            n
                        ));
                    }
                    derived.fraction_digits = Some(n);
                }
            }
            if fixed && !derived.fixed.contains(&facet_kind) {
                derived.fixed.push(facet_kind);
            }
        }

        if let (Some(min), Some(max)) = (derived.min_length, derived.max_length) {
            if min > max {
                return Err(format!("minLength {} is greater than maxLength {}", min, max));
            }
        }
        if let (Some(total), Some(fraction)) = (derived.total_digits, derived.fraction_digits) {
            if fraction > total {
                return Err(format!(
                    "fractionDigits {} is greater than totalDigits {}",
                    fraction, total
                ));
            }
        }
        Ok(derived)
    }

    fn same_value(&self, facet: &Facet) -> bool {
        match facet {
            Facet::Length(n) => self.length == Some(*n),
            Facet::MinLength(n) => self.min_length == Some(*n),
            Facet::MaxLength(n) => self.max_length == Some(*n),
            Facet::WhiteSpace(ws) => self.white_space == Some(*ws),
            Facet::MaxInclusive(v) => self.max_inclusive.as_ref() == Some(v),
            Facet::MaxExclusive(v) => self.max_exclusive.as_ref() == Some(v),
            Facet::MinInclusive(v) => self.min_inclusive.as_ref() == Some(v),
            Facet::MinExclusive(v) => self.min_exclusive.as_ref() == Some(v),
            Facet::TotalDigits(n) => self.total_digits == Some(*n),
            Facet::FractionDigits(n) => self.fraction_digits == Some(*n),
            Facet::Pattern(_) | Facet::Enumeration(_) => true,
        }
    }

    /// Check a decoded value and its normalized lexical form
    pub fn check(
        &self,
        kind: Option<AtomicKind>,
        value: &NativeValue,
        lexical: &str,
    ) -> std::result::Result<(), ValidationError> {
        let fail = |facet: FacetKind, message: String| {
            Err(ValidationError::new(message)
                .with_reason(format!("{} facet", facet))
                .with_instance(lexical.to_string()))
        };

        if let Some(len) = measure(value, lexical) {
            if let Some(expected) = self.length {
                if len != expected {
                    return fail(FacetKind::Length, format!("length must be exactly {}, got {}", expected, len));
                }
            }
            if let Some(min) = self.min_length {
                if len < min {
                    return fail(FacetKind::MinLength, format!("length must be at least {}, got {}", min, len));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    return fail(FacetKind::MaxLength, format!("length must be at most {}, got {}", max, len));
                }
            }
        }

        for group in &self.patterns {
            if !group.iter().any(|p| p.is_match(lexical)) {
                let sources: Vec<&str> = group.iter().map(|p| p.as_str()).collect();
                return fail(
                    FacetKind::Pattern,
                    format!("value '{}' does not match pattern {:?}", lexical, sources),
                );
            }
        }

        if let Some(ref allowed) = self.enumeration {
            if !allowed.contains(value) {
                return fail(FacetKind::Enumeration, format!("value '{}' is not an enumerated value", lexical));
            }
        }

        if let NativeValue::Atomic(atomic) = value {
            let bounds = [
                (&self.min_inclusive, FacetKind::MinInclusive, &[Ordering::Greater, Ordering::Equal][..], "at least"),
                (&self.min_exclusive, FacetKind::MinExclusive, &[Ordering::Greater][..], "greater than"),
                (&self.max_inclusive, FacetKind::MaxInclusive, &[Ordering::Less, Ordering::Equal][..], "at most"),
                (&self.max_exclusive, FacetKind::MaxExclusive, &[Ordering::Less][..], "lower than"),
            ];
            for (bound, facet, allowed, relation) in bounds {
                if let Some(bound) = bound {
                    let ok = compare_values(kind, atomic, bound).is_some_and(|ord| allowed.contains(&ord));
                    if !ok {
                        return fail(facet, format!("value {} must be {} {}", lexical, relation, bound));
                    }
                }
            }

            let digits = match atomic {
                XsdValue::Decimal(d) => Some(helpers::decimal_digits(d)),
                XsdValue::Integer(i) => Some((i.unsigned_abs().to_string().len() as u32, 0)),
                _ => None,
            };
            if let Some((total, fraction)) = digits {
                if let Some(max) = self.total_digits {
                    if total > max {
                        return fail(
                            FacetKind::TotalDigits,
                            format!("value {} has more than {} digits", lexical, max),
                        );
                    }
                }
                if let Some(max) = self.fraction_digits {
                    if fraction > max {
                        return fail(
                            FacetKind::FractionDigits,
                            format!("value {} has more than {} fraction digits", lexical, max),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

fn measure(value: &NativeValue, lexical: &str) -> Option<usize> {
    match value {
        NativeValue::List(items) => Some(items.len()),
        NativeValue::Atomic(XsdValue::Binary(bytes)) => Some(bytes.len()),
        NativeValue::Atomic(XsdValue::QName(_)) => None,
        NativeValue::Atomic(_) => Some(lexical.chars().count()),
        NativeValue::Element(_) => None,
    }
}

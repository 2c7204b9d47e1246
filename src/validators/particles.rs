//! XSD particles
//!
//! A particle is a content-model node with occurrence bounds: an element,
//! a wildcard or a model group. Groups live in [`super::groups`].

use std::fmt;

use crate::error::SchemaError;
use crate::namespaces::QName;

use super::elements::ElementDecl;
use super::globals::XsdGlobals;
use super::groups::ModelGroup;
use super::wildcards::Wildcard;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl Occurs {
    /// Create occurrence bounds, checking `min <= max`
    pub fn new(min: u32, max: Option<u32>) -> Result<Self, SchemaError> {
        match max {
            Some(max) if max < min => Err(SchemaError::new(format!(
                "maxOccurs ({}) must not be lower than minOccurs ({})",
                max, min
            ))),
            _ => Ok(Self { min, max }),
        }
    }

    /// Parse the `minOccurs`/`maxOccurs` attribute values, defaulting to 1
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self, SchemaError> {
        let min = match min.map(str::trim) {
            None => 1,
            Some(text) => text.parse::<u32>().map_err(|_| {
                SchemaError::new(format!("minOccurs must be a non-negative integer, got '{}'", text))
            })?,
        };
        let max = match max.map(str::trim) {
            None => Some(1),
            Some("unbounded") => None,
            Some(text) => Some(text.parse::<u32>().map_err(|_| {
                SchemaError::new(format!(
                    "maxOccurs must be a non-negative integer or 'unbounded', got '{}'",
                    text
                ))
            })?),
        };
        Self::new(min, max)
    }

    /// Default occurrence (1, 1)
    pub const fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub const fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub const fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub const fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// minOccurs == 0
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// maxOccurs == 0: the particle is pointless
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Whether `count` more occurrences are still allowed
    pub fn allows(&self, count: u32) -> bool {
        self.max.map_or(true, |max| count < max)
    }

    /// Whether `count` occurrences satisfy the minimum
    pub fn satisfied_by(&self, count: u32) -> bool {
        count >= self.min
    }

    /// True if these bounds are within `base` (restriction rule)
    pub fn is_within(&self, base: &Occurs) -> bool {
        if self.min < base.min {
            return false;
        }
        match (self.max, base.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(max), Some(base_max)) => max <= base_max,
        }
    }

    /// Product of nested bounds, used when flattening groups
    pub fn times(&self, outer: &Occurs) -> Occurs {
        Occurs {
            min: self.min.saturating_mul(outer.min),
            max: match (self.max, outer.max) {
                (Some(0), _) | (_, Some(0)) => Some(0),
                (Some(a), Some(b)) => Some(a.saturating_mul(b)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}..{}]", self.min, max),
            None => write!(f, "[{}..unbounded]", self.min),
        }
    }
}

/// Element declaration of an element particle
#[derive(Debug, Clone, PartialEq)]
pub enum ElementTerm {
    /// A local declaration owned by the particle
    Local(Box<ElementDecl>),
    /// A reference to the global element with the particle's name
    Global,
}

/// An element particle
#[derive(Debug, Clone, PartialEq)]
pub struct ElementParticle {
    /// Element name
    pub name: QName,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// Local declaration or global reference
    pub term: ElementTerm,
}

impl ElementParticle {
    /// A particle owning a local declaration
    pub fn local(decl: ElementDecl, occurs: Occurs) -> Self {
        Self {
            name: decl.name.clone(),
            occurs,
            term: ElementTerm::Local(Box::new(decl)),
        }
    }

    /// A particle referencing a global element
    pub fn reference(name: QName, occurs: Occurs) -> Self {
        Self {
            name,
            occurs,
            term: ElementTerm::Global,
        }
    }

    /// Resolve the declaration
    pub fn decl<'a>(&'a self, globals: &'a XsdGlobals) -> Option<&'a ElementDecl> {
        match &self.term {
            ElementTerm::Local(decl) => Some(decl),
            ElementTerm::Global => globals.element(&self.name),
        }
    }
}

/// A wildcard particle (`xs:any`)
#[derive(Debug, Clone, PartialEq)]
pub struct WildcardParticle {
    /// Admitted names and processing
    pub wildcard: Wildcard,
    /// Occurrence bounds
    pub occurs: Occurs,
}

/// A content-model node
#[derive(Debug, Clone, PartialEq)]
pub enum Particle {
    /// Element declaration or reference
    Element(ElementParticle),
    /// Element wildcard
    Wildcard(WildcardParticle),
    /// Sequence, choice or all group
    Group(ModelGroup),
}

impl Particle {
    /// Occurrence bounds of the particle
    pub fn occurs(&self) -> Occurs {
        match self {
            Particle::Element(e) => e.occurs,
            Particle::Wildcard(w) => w.occurs,
            Particle::Group(g) => g.occurs,
        }
    }

    /// True if the particle can match nothing at all
    pub fn is_emptiable(&self) -> bool {
        match self {
            Particle::Group(g) => g.is_emptiable(),
            other => other.occurs().is_emptiable(),
        }
    }

    /// Short description for messages and positions
    pub fn describe(&self) -> String {
        match self {
            Particle::Element(e) => format!("element {}", e.name),
            Particle::Wildcard(_) => "any".to_string(),
            Particle::Group(g) => g.compositor.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_parse() {
        assert_eq!(Occurs::parse(None, None).unwrap(), Occurs::once());
        assert_eq!(Occurs::parse(Some("0"), Some("unbounded")).unwrap(), Occurs::zero_or_more());
        assert!(Occurs::parse(Some("-1"), None).is_err());
        assert!(Occurs::parse(Some("x"), None).is_err());
        assert!(Occurs::parse(Some("3"), Some("2")).is_err());
        assert!(Occurs::parse(Some("2"), None).is_err());
        assert_eq!(Occurs::parse(Some(" 2 "), Some("5")).unwrap(), Occurs::new(2, Some(5)).unwrap());
    }

    #[test]
    fn test_occurs_counts() {
        let occurs = Occurs::new(1, Some(2)).unwrap();
        assert!(occurs.allows(1));
        assert!(!occurs.allows(2));
        assert!(!occurs.satisfied_by(0));
        assert!(Occurs::zero_or_more().allows(1000));
    }

    #[test]
    fn test_occurs_restriction() {
        let base = Occurs::new(0, Some(5)).unwrap();
        assert!(Occurs::new(1, Some(3)).unwrap().is_within(&base));
        assert!(!Occurs::new(0, Some(6)).unwrap().is_within(&base));
        assert!(!Occurs::one_or_more().is_within(&base));
        assert!(Occurs::one_or_more().is_within(&Occurs::zero_or_more()));
        assert!(!Occurs::optional().is_within(&Occurs::once()));
    }

    #[test]
    fn test_occurs_times() {
        let inner = Occurs::new(1, Some(2)).unwrap();
        let outer = Occurs::new(2, Some(3)).unwrap();
        assert_eq!(inner.times(&outer), Occurs::new(2, Some(6)).unwrap());
        assert_eq!(inner.times(&Occurs::zero_or_more()), Occurs::zero_or_more());
        assert_eq!(Occurs::once().to_string(), "[1..1]");
    }
}

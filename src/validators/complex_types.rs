//! XSD Complex Type Validators
//!
//! This module implements complex type definitions for XSD schemas.
//! Complex types can have element content (model groups), simple content,
//! or mixed content with both text and elements.
//!
//! A complex type is always built by [`ComplexType::derive`] from a base type
//! and a [`Derivation`]: the content is combined (extension) or checked
//! against the base (restriction), the attribute uses are merged and the
//! effective open content is resolved.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Complex_Type_Definitions

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, SchemaError};
use crate::limits::Limits;
use crate::namespaces::QName;

use super::attributes::AttributeUses;
use super::globals::{TypeId, XsdGlobals, XsdType};
use super::groups::{ModelGroup, ModelType};
use super::models::{self, ContentModel};
use super::open_content::{self, ContentDerivation, DefaultOpenContent, OpenContent};
use super::particles::Particle;
use super::wildcards::{ProcessContents, Wildcard};

/// Derivation method for complex types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivationMethod {
    /// Type derived by restriction
    #[default]
    Restriction,
    /// Type derived by extension
    Extension,
}

impl FromStr for DerivationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "restriction" => Ok(Self::Restriction),
            "extension" => Ok(Self::Extension),
            _ => Err(Error::Value(format!("unknown derivation method '{}'", s))),
        }
    }
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// Compiled content of a complex type
#[derive(Debug, Clone, PartialEq)]
pub enum ContentType {
    /// No children, no text
    Empty,
    /// Text only, typed by a simple type
    Simple(TypeId),
    /// Children only
    ElementOnly(ContentModel),
    /// Children and text
    Mixed(ContentModel),
}

impl ContentType {
    /// The content model, for element-only and mixed content
    pub fn model(&self) -> Option<&ContentModel> {
        match self {
            ContentType::ElementOnly(m) | ContentType::Mixed(m) => Some(m),
            _ => None,
        }
    }

    /// The simple type of simple content
    pub fn simple_type(&self) -> Option<TypeId> {
        match self {
            ContentType::Simple(id) => Some(*id),
            _ => None,
        }
    }

    /// True for mixed content
    pub fn is_mixed(&self) -> bool {
        matches!(self, ContentType::Mixed(_))
    }

    /// True when no child element can ever be accepted
    pub fn is_empty(&self) -> bool {
        match self {
            ContentType::Empty => true,
            ContentType::Simple(_) => false,
            ContentType::ElementOnly(m) | ContentType::Mixed(m) => m.is_empty() && m.open_content().is_none(),
        }
    }

    /// Effective open content
    pub fn open_content(&self) -> Option<&OpenContent> {
        self.model().and_then(ContentModel::open_content)
    }

    fn group(&self) -> Option<&ModelGroup> {
        self.model().map(ContentModel::group)
    }

    fn label(&self) -> &'static str {
        match self {
            ContentType::Empty => "empty",
            ContentType::Simple(_) => "simple",
            ContentType::ElementOnly(_) => "element-only",
            ContentType::Mixed(_) => "mixed",
        }
    }
}

/// Declared content of a derivation, before combining with the base
#[derive(Debug, Clone, PartialEq)]
pub enum ContentDef {
    /// `complexContent` (or a shorthand complex type): an optional particle
    Complex {
        /// Declared model group, `None` when no particle is given
        group: Option<ModelGroup>,
        /// `mixed` attribute
        mixed: bool,
    },
    /// `simpleContent`: the narrowed simple type of a restriction, or `None`
    /// to keep the simple type of the base
    Simple(Option<TypeId>),
}

impl ContentDef {
    /// Element-only content with the given group
    pub fn group(group: ModelGroup) -> Self {
        ContentDef::Complex {
            group: Some(group),
            mixed: false,
        }
    }

    /// No particle at all
    pub fn empty() -> Self {
        ContentDef::Complex {
            group: None,
            mixed: false,
        }
    }
}

/// Everything a complex type declares about itself
#[derive(Debug, Clone)]
pub struct Derivation {
    /// Base type
    pub base: TypeId,
    /// Derivation method
    pub method: DerivationMethod,
    /// Declared content
    pub content: ContentDef,
    /// Declared attribute uses and wildcard
    pub attributes: AttributeUses,
    /// Explicit `openContent`
    pub open_content: Option<OpenContent>,
}

impl Derivation {
    /// A restriction of `base` with the given content
    pub fn restriction(base: TypeId, content: ContentDef) -> Self {
        Self {
            base,
            method: DerivationMethod::Restriction,
            content,
            attributes: AttributeUses::new(),
            open_content: None,
        }
    }

    /// An extension of `base` with the given content
    pub fn extension(base: TypeId, content: ContentDef) -> Self {
        Self {
            method: DerivationMethod::Extension,
            ..Self::restriction(base, content)
        }
    }

    /// Builder: set the attribute uses
    pub fn with_attributes(mut self, attributes: AttributeUses) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder: set an explicit open content
    pub fn with_open_content(mut self, open_content: OpenContent) -> Self {
        self.open_content = Some(open_content);
        self
    }
}

/// A complex type definition
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// Type name (`None` for anonymous types)
    pub name: Option<QName>,
    /// Base type (`None` only for anyType)
    pub base: Option<TypeId>,
    /// Derivation method from the base
    pub derivation: Option<DerivationMethod>,
    /// Compiled content
    pub content: ContentType,
    /// Effective attribute uses
    pub attributes: AttributeUses,
    /// Abstract types cannot be used directly by instances
    pub abstract_: bool,
}

impl ComplexType {
    /// The anyType definition
    pub fn any_type() -> Self {
        Self {
            name: Some(QName::namespaced(crate::XSD_1_0_NAMESPACE, super::builtins::XSD_ANY_TYPE)),
            base: None,
            derivation: None,
            content: ContentType::Mixed(ContentModel::any_content()),
            attributes: AttributeUses::new()
                .with_wildcard(Wildcard::any().with_process_contents(ProcessContents::Lax)),
            abstract_: false,
        }
    }

    /// Builder: set the name
    pub fn with_name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    /// Builder: set abstract
    pub fn abstract_(mut self, abstract_: bool) -> Self {
        self.abstract_ = abstract_;
        self
    }

    /// Name for messages
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "anonymous complexType".to_string(),
        }
    }

    /// True for mixed content
    pub fn is_mixed(&self) -> bool {
        self.content.is_mixed()
    }

    /// Effective open content
    pub fn open_content(&self) -> Option<&OpenContent> {
        self.content.open_content()
    }

    /// Build a complex type from its base and declared parts
    pub fn derive(
        globals: &XsdGlobals,
        derivation: Derivation,
        default_open_content: Option<&DefaultOpenContent>,
        limits: &Limits,
    ) -> Result<Self, SchemaError> {
        let base = globals
            .get(derivation.base)
            .ok_or_else(|| SchemaError::new("the base type is not defined"))?;
        let method = derivation.method;
        let base_id = derivation.base;
        let (content, attributes) = match derivation.content {
            ContentDef::Simple(narrowed) => {
                if derivation.open_content.as_ref().map_or(false, |oc| !oc.is_none()) {
                    return Err(SchemaError::new("an openContent is not allowed with simple content"));
                }
                derive_simple(globals, base, base_id, method, narrowed, derivation.attributes)?
            }
            ContentDef::Complex { group, mixed } => {
                let base = base
                    .as_complex()
                    .ok_or_else(|| SchemaError::new("the base of a complexContent must be a complex type"))?;
                let standalone = base_id == globals.any_type() && method == DerivationMethod::Restriction;
                let declared = ComplexParts {
                    group: group.unwrap_or_else(|| ModelGroup::sequence(Vec::new())),
                    mixed,
                    attributes: derivation.attributes,
                    open_content: derivation.open_content,
                };
                derive_complex(globals, base, method, standalone, declared, default_open_content, limits)?
            }
        };
        tracing::debug!(
            base = %globals.display_name(base_id),
            method = %method,
            content = content.label(),
            attributes = attributes.len(),
            "derived complex type"
        );
        Ok(Self {
            name: None,
            base: Some(base_id),
            derivation: Some(method),
            content,
            attributes,
            abstract_: false,
        })
    }
}

struct ComplexParts {
    group: ModelGroup,
    mixed: bool,
    attributes: AttributeUses,
    open_content: Option<OpenContent>,
}

fn derive_simple(
    globals: &XsdGlobals,
    base: &XsdType,
    base_id: TypeId,
    method: DerivationMethod,
    narrowed: Option<TypeId>,
    attributes: AttributeUses,
) -> Result<(ContentType, AttributeUses), SchemaError> {
    match base {
        XsdType::Simple(_) => {
            if method != DerivationMethod::Extension {
                return Err(SchemaError::new(
                    "a simpleContent with a simple base type must be an extension",
                ));
            }
            Ok((ContentType::Simple(base_id), attributes))
        }
        XsdType::Complex(complex) => {
            let base_simple = complex.content.simple_type().ok_or_else(|| {
                SchemaError::new(format!(
                    "the base type {} of a simpleContent has no simple content",
                    complex.display_name()
                ))
            })?;
            match method {
                DerivationMethod::Extension => Ok((
                    ContentType::Simple(base_simple),
                    AttributeUses::extend(&complex.attributes, attributes)?,
                )),
                DerivationMethod::Restriction => {
                    let simple = match narrowed {
                        Some(id) if id == base_simple || globals.is_derived_from(id, base_simple) => id,
                        Some(id) => {
                            return Err(SchemaError::new(format!(
                                "{} is not derived from the simple content type {}",
                                globals.display_name(id),
                                globals.display_name(base_simple)
                            )))
                        }
                        None => base_simple,
                    };
                    Ok((
                        ContentType::Simple(simple),
                        AttributeUses::restrict(globals, &complex.attributes, attributes)?,
                    ))
                }
            }
        }
    }
}

fn derive_complex(
    globals: &XsdGlobals,
    base: &ComplexType,
    method: DerivationMethod,
    standalone: bool,
    declared: ComplexParts,
    default_open_content: Option<&DefaultOpenContent>,
    limits: &Limits,
) -> Result<(ContentType, AttributeUses), SchemaError> {
    if matches!(base.content, ContentType::Simple(_)) && !standalone {
        return Err(SchemaError::new(format!(
            "a complexContent cannot derive from {} which has simple content",
            base.display_name()
        )));
    }
    let empty_group = ModelGroup::sequence(Vec::new());
    let base_group = base.content.group().unwrap_or(&empty_group);
    let base_open_content = base.content.open_content();

    let (group, mixed, attributes) = if standalone {
        (declared.group, declared.mixed, declared.attributes)
    } else {
        match method {
            DerivationMethod::Extension => {
                if !base_group.is_empty() && !declared.group.is_empty() && base.is_mixed() != declared.mixed {
                    return Err(SchemaError::new(
                        "the mixed attribute of an extension must match the base type",
                    ));
                }
                let mixed = declared.mixed || (declared.group.is_empty() && base.is_mixed());
                let group = combine_extension(base_group, declared.group)?;
                let attributes = AttributeUses::extend(&base.attributes, declared.attributes)?;
                (group, mixed, attributes)
            }
            DerivationMethod::Restriction => {
                if declared.mixed && !base.is_mixed() {
                    return Err(SchemaError::new(
                        "a restriction of an element-only type cannot be mixed",
                    ));
                }
                if base_group.is_empty() && !declared.group.is_empty() {
                    return Err(SchemaError::new(
                        "a restriction of a type with empty content must have empty content",
                    ));
                }
                models::check_restriction(&declared.group, base_group, globals)?;
                let attributes = AttributeUses::restrict(globals, &base.attributes, declared.attributes)?;
                (declared.group, declared.mixed, attributes)
            }
        }
    };

    let content_is_empty = group.is_empty();
    if content_is_empty && declared.open_content.as_ref().map_or(false, |oc| !oc.is_none()) {
        return Err(SchemaError::new("an openContent requires a non-empty content model"));
    }
    let context = match method {
        DerivationMethod::Extension if !standalone => ContentDerivation::Extension(base_open_content),
        _ => ContentDerivation::Standalone,
    };
    let effective = open_content::resolve(
        declared.open_content.as_ref(),
        default_open_content,
        content_is_empty,
        context,
    )
    .map(|oc| match (&declared.open_content, default_open_content) {
        (Some(_), Some(default)) => oc.with_exclusions_of(&default.open_content),
        _ => oc,
    });
    if !standalone {
        match method {
            DerivationMethod::Extension => open_content::check_extension(effective.as_ref(), base_open_content)?,
            DerivationMethod::Restriction => {
                open_content::check_restriction(effective.as_ref(), base_open_content)?
            }
        }
    }

    let content = if content_is_empty && effective.is_none() && !mixed {
        ContentType::Empty
    } else {
        let model = ContentModel::compile(group, effective, limits)?;
        if mixed {
            ContentType::Mixed(model)
        } else {
            ContentType::ElementOnly(model)
        }
    };
    Ok((content, attributes))
}

fn combine_extension(base: &ModelGroup, derived: ModelGroup) -> Result<ModelGroup, SchemaError> {
    if base.is_empty() {
        return Ok(derived);
    }
    if derived.is_empty() {
        return Ok(base.clone());
    }
    match (base.compositor, derived.compositor) {
        (ModelType::All, ModelType::All) => {
            let mut merged = base.clone();
            merged.particles.extend(derived.particles);
            Ok(merged)
        }
        (ModelType::All, _) | (_, ModelType::All) => Err(SchemaError::new(
            "an 'all' model group can only be extended by another 'all' group",
        )),
        _ => Ok(ModelGroup::sequence(vec![
            Particle::Group(base.clone()),
            Particle::Group(derived),
        ])),
    }
}

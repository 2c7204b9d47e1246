//! XSD component builders
//!
//! [`SchemaBuilder`] collects component definitions that refer to each other
//! by name ([`TypeRef`], [`ParticleDef`], ...) and compiles them into an
//! immutable [`Schema`]. Bases are compiled before the types derived from
//! them; a circular derivation is a schema error. Compilation of a type that
//! fails does not stop its independent siblings: every error is collected
//! into one [`SchemaErrors`].

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{SchemaError, SchemaErrors};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};

use super::attributes::{AttributeDecl, AttributeUse, AttributeUses, UseMode};
use super::complex_types::{ComplexType, ContentDef, Derivation, DerivationMethod};
use super::elements::ElementDecl;
use super::globals::{TypeId, XsdGlobals, XsdType};
use super::groups::{ModelGroup, ModelType};
use super::open_content::{DefaultOpenContent, OpenContent};
use super::particles::{ElementParticle, Occurs, Particle, WildcardParticle};
use super::schemas::Schema;
use super::simple_types::{FacetDef, SimpleType};
use super::validation::ValidationContext;
use super::wildcards::Wildcard;

/// Reference to a type: by name, or an anonymous definition
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// A named type, built-in or defined in the builder
    Named(QName),
    /// An anonymous type
    Anonymous(Box<TypeDef>),
}

impl TypeRef {
    /// Reference to a built-in type by local name
    pub fn xsd(local: &str) -> Self {
        TypeRef::Named(QName::namespaced(crate::XSD_1_0_NAMESPACE, local))
    }

    /// Reference to an anonymous type
    pub fn anonymous(def: TypeDef) -> Self {
        TypeRef::Anonymous(Box::new(def))
    }
}

/// A type definition
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    /// `simpleType`
    Simple(SimpleTypeDef),
    /// `complexType`
    Complex(ComplexTypeDef),
}

/// A simple type definition
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleTypeDef {
    /// Restriction of a base with facets
    Restriction {
        /// Base type
        base: TypeRef,
        /// Facets
        facets: Vec<FacetDef>,
    },
    /// List of an item type
    List {
        /// Item type
        item: TypeRef,
    },
    /// Union of member types
    Union {
        /// Member types
        members: Vec<TypeRef>,
    },
}

/// Content of a complex type definition
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSpec {
    /// Element content; `particle` is `None` for empty content
    Complex {
        /// Content particle
        particle: Option<ParticleDef>,
        /// Mixed content
        mixed: bool,
    },
    /// Simple content
    Simple {
        /// Restriction facets applied to the base's simple type
        facets: Vec<FacetDef>,
        /// Explicit simple type of a restriction
        simple_type: Option<TypeRef>,
    },
}

impl Default for ContentSpec {
    fn default() -> Self {
        ContentSpec::Complex {
            particle: None,
            mixed: false,
        }
    }
}

/// A complex type definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexTypeDef {
    /// Base type; `None` is a restriction of anyType
    pub base: Option<TypeRef>,
    /// Derivation method
    pub method: DerivationMethod,
    /// Declared content
    pub content: ContentSpec,
    /// Attribute uses
    pub attributes: Vec<AttributeUseDef>,
    /// `anyAttribute`
    pub any_attribute: Option<Wildcard>,
    /// Explicit `openContent`
    pub open_content: Option<OpenContent>,
    /// Abstract type
    pub abstract_: bool,
}

impl ComplexTypeDef {
    /// Element content with the given particle, derived from anyType
    pub fn with_particle(particle: ParticleDef) -> Self {
        Self {
            content: ContentSpec::Complex {
                particle: Some(particle),
                mixed: false,
            },
            ..Self::default()
        }
    }

    /// Builder: derive from a base
    pub fn derived_from(mut self, base: TypeRef, method: DerivationMethod) -> Self {
        self.base = Some(base);
        self.method = method;
        self
    }

    /// Builder: set mixed content
    pub fn mixed(mut self, mixed: bool) -> Self {
        if let ContentSpec::Complex { mixed: m, .. } = &mut self.content {
            *m = mixed;
        }
        self
    }

    /// Builder: add an attribute use
    pub fn with_attribute(mut self, attribute: AttributeUseDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Builder: set the open content
    pub fn with_open_content(mut self, open_content: OpenContent) -> Self {
        self.open_content = Some(open_content);
        self
    }
}

/// A particle definition
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleDef {
    /// Local element declaration
    Element(ElementDef, Occurs),
    /// Reference to a global element
    ElementRef(QName, Occurs),
    /// `any` wildcard
    Any(Wildcard, Occurs),
    /// Model group
    Group(ModelType, Vec<ParticleDef>, Occurs),
    /// Reference to a named group
    GroupRef(QName, Occurs),
}

impl ParticleDef {
    /// A sequence occurring once
    pub fn sequence(particles: Vec<ParticleDef>) -> Self {
        ParticleDef::Group(ModelType::Sequence, particles, Occurs::once())
    }

    /// A choice occurring once
    pub fn choice(particles: Vec<ParticleDef>) -> Self {
        ParticleDef::Group(ModelType::Choice, particles, Occurs::once())
    }

    /// An all group occurring once
    pub fn all(particles: Vec<ParticleDef>) -> Self {
        ParticleDef::Group(ModelType::All, particles, Occurs::once())
    }

    /// A local element occurring once
    pub fn element(name: QName, type_ref: TypeRef) -> Self {
        ParticleDef::Element(ElementDef::new(name, type_ref), Occurs::once())
    }

    /// Builder: set the occurrence bounds
    pub fn occurs(mut self, occurs: Occurs) -> Self {
        match &mut self {
            ParticleDef::Element(_, o)
            | ParticleDef::ElementRef(_, o)
            | ParticleDef::Any(_, o)
            | ParticleDef::Group(_, _, o)
            | ParticleDef::GroupRef(_, o) => *o = occurs,
        }
        self
    }
}

/// An element declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDef {
    /// Element name
    pub name: QName,
    /// Type; `None` is anyType
    pub type_ref: Option<TypeRef>,
    /// Nillable
    pub nillable: bool,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
    /// Abstract
    pub abstract_: bool,
}

impl ElementDef {
    /// An element of the given type
    pub fn new(name: QName, type_ref: TypeRef) -> Self {
        Self {
            name,
            type_ref: Some(type_ref),
            nillable: false,
            default: None,
            fixed: None,
            abstract_: false,
        }
    }

    /// An element of anyType
    pub fn untyped(name: QName) -> Self {
        Self {
            type_ref: None,
            ..Self::new(name, TypeRef::xsd(super::builtins::XSD_ANY_TYPE))
        }
    }
}

/// An attribute declaration
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    /// Attribute name
    pub name: QName,
    /// Simple type; `None` is anySimpleType
    pub type_ref: Option<TypeRef>,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
}

impl AttributeDef {
    /// An attribute of the given type
    pub fn new(name: QName, type_ref: TypeRef) -> Self {
        Self {
            name,
            type_ref: Some(type_ref),
            default: None,
            fixed: None,
        }
    }
}

/// An attribute use inside a complex type
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeUseDef {
    /// Local attribute declaration
    Local(AttributeDef, UseMode),
    /// Reference to a global attribute
    Reference(QName, UseMode),
}

/// Collects component definitions and compiles them into a [`Schema`]
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    target_namespace: Option<String>,
    namespaces: NamespaceContext,
    types: IndexMap<QName, TypeDef>,
    elements: IndexMap<QName, ElementDef>,
    attributes: IndexMap<QName, AttributeDef>,
    groups: IndexMap<QName, ParticleDef>,
    default_open_content: Option<DefaultOpenContent>,
    limits: Limits,
    errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target namespace
    pub fn target_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.target_namespace = Some(namespace.into());
        self
    }

    /// Set the namespace prefixes used by QName literals (facets, defaults)
    pub fn namespaces(mut self, namespaces: NamespaceContext) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Set the compile limits
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// A name in the target namespace
    pub fn qname(&self, local: &str) -> QName {
        QName::new(self.target_namespace.clone(), local)
    }

    fn duplicate(&mut self, kind: &str, name: &QName) {
        self.errors
            .push(SchemaError::new(format!("duplicate global {}", kind)).with_component(name.to_string()));
    }

    /// Add a named type
    pub fn add_type(&mut self, name: QName, def: TypeDef) -> &mut Self {
        if self.types.contains_key(&name) {
            self.duplicate("type", &name);
        } else {
            self.types.insert(name, def);
        }
        self
    }

    /// Add a named simple type
    pub fn add_simple_type(&mut self, name: QName, def: SimpleTypeDef) -> &mut Self {
        self.add_type(name, TypeDef::Simple(def))
    }

    /// Add a named complex type
    pub fn add_complex_type(&mut self, name: QName, def: ComplexTypeDef) -> &mut Self {
        self.add_type(name, TypeDef::Complex(def))
    }

    /// Add a global element
    pub fn add_element(&mut self, def: ElementDef) -> &mut Self {
        if self.elements.contains_key(&def.name) {
            let name = def.name.clone();
            self.duplicate("element", &name);
        } else {
            self.elements.insert(def.name.clone(), def);
        }
        self
    }

    /// Add a global attribute
    pub fn add_attribute(&mut self, def: AttributeDef) -> &mut Self {
        if self.attributes.contains_key(&def.name) {
            let name = def.name.clone();
            self.duplicate("attribute", &name);
        } else {
            self.attributes.insert(def.name.clone(), def);
        }
        self
    }

    /// Add a named model group
    pub fn add_group(&mut self, name: QName, group: ParticleDef) -> &mut Self {
        if self.groups.contains_key(&name) {
            self.duplicate("group", &name);
        } else {
            self.groups.insert(name, group);
        }
        self
    }

    /// Set the schema-wide default open content; only one is allowed
    pub fn default_open_content(&mut self, default: DefaultOpenContent) -> &mut Self {
        if self.default_open_content.is_some() {
            self.errors
                .push(SchemaError::new("a schema can have only one defaultOpenContent"));
        } else {
            self.default_open_content = Some(default);
        }
        self
    }

    /// Record an error found while reading definitions
    pub fn add_error(&mut self, error: SchemaError) -> &mut Self {
        self.errors.push(error);
        self
    }

    /// Compile every component into a schema
    pub fn build(&self) -> Result<Schema, SchemaErrors> {
        let mut compiler = Compiler::new(self);
        compiler.run();
        let Compiler { globals, errors, .. } = compiler;
        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "schema compilation failed");
            return Err(SchemaErrors(errors));
        }
        tracing::debug!(
            types = globals.type_count(),
            elements = globals.element_count(),
            target_namespace = ?self.target_namespace,
            "schema compiled"
        );
        Ok(Schema::new(
            self.target_namespace.clone(),
            self.namespaces.clone(),
            globals,
            self.default_open_content.clone(),
            self.limits.clone(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    InProgress,
    Done,
    Failed,
}

struct Compiler<'a> {
    builder: &'a SchemaBuilder,
    globals: XsdGlobals,
    types: HashMap<QName, Status>,
    groups: HashMap<QName, Status>,
    errors: Vec<SchemaError>,
}

impl<'a> Compiler<'a> {
    fn new(builder: &'a SchemaBuilder) -> Self {
        Self {
            builder,
            globals: XsdGlobals::new(),
            types: HashMap::new(),
            groups: HashMap::new(),
            errors: builder.errors.clone(),
        }
    }

    fn run(&mut self) {
        let builder = self.builder;
        for name in builder.types.keys() {
            if self.globals.lookup_type(name).is_some() {
                self.errors
                    .push(SchemaError::new("redefinition of a built-in type").with_component(name.to_string()));
                self.types.insert(name.clone(), Status::Failed);
            } else {
                self.globals.reserve(Some(name.clone()));
            }
        }

        // Global elements are registered first so that references and
        // `##defined` exclusions resolve while types compile.
        let mut pending = Vec::new();
        for def in builder.elements.values() {
            let type_id = match &def.type_ref {
                None => Ok(self.globals.any_type()),
                Some(TypeRef::Named(name)) => self.lookup(name),
                Some(TypeRef::Anonymous(anonymous)) => {
                    let id = self.globals.reserve(None);
                    pending.push((id, anonymous.as_ref(), &def.name));
                    Ok(id)
                }
            };
            let decl = type_id.and_then(|id| {
                ElementDecl::new(def.name.clone(), id)
                    .nillable(def.nillable)
                    .abstract_(def.abstract_)
                    .with_value_constraint(def.default.clone(), def.fixed.clone())
            });
            match decl.and_then(|decl| self.globals.add_element(decl)) {
                Ok(()) => {}
                Err(e) => self.errors.push(e.with_component(def.name.to_string())),
            }
        }

        for name in builder.types.keys() {
            let _ = self.ensure_named(name, false);
        }
        for (id, def, element) in pending {
            match self.compile_def(def).and_then(|ty| self.globals.define(id, ty)) {
                Ok(()) => {}
                Err(e) => self.errors.push(e.with_component(element.to_string())),
            }
        }
        for name in builder.attributes.keys() {
            if let Err(e) = self.global_attribute(name) {
                self.errors.push(e.with_component(name.to_string()));
            }
        }
        for name in builder.groups.keys() {
            if let Err(e) = self.named_group(name) {
                self.errors.push(e.with_component(name.to_string()));
            }
        }
        self.check_element_constraints();
    }

    fn lookup(&self, name: &QName) -> Result<TypeId, SchemaError> {
        self.globals
            .lookup_type(name)
            .ok_or_else(|| SchemaError::new(format!("unknown type {}", name)))
    }

    /// Compile a named type if not done yet. `base` marks a derivation edge,
    /// where an unfinished or failed dependency is an error.
    fn ensure_named(&mut self, name: &QName, base: bool) -> Result<(), SchemaError> {
        let builder = self.builder;
        let def = match builder.types.get(name) {
            Some(def) => def,
            None => return Ok(()),
        };
        match self.types.get(name) {
            Some(Status::Done) => return Ok(()),
            Some(Status::Failed) if base => {
                return Err(SchemaError::new(format!("base type {} is invalid", name)))
            }
            Some(Status::InProgress) if base => {
                return Err(SchemaError::new(format!("circular derivation of type {}", name)))
            }
            Some(_) => return Ok(()),
            None => {}
        }
        self.types.insert(name.clone(), Status::InProgress);
        let id = self.lookup(name)?;
        let compiled = self.compile_def(def).map(|ty| match ty {
            XsdType::Simple(t) => XsdType::Simple(t.with_name(name.clone())),
            XsdType::Complex(t) => XsdType::Complex(t.with_name(name.clone())),
        });
        match compiled.and_then(|ty| self.globals.define(id, ty)) {
            Ok(()) => {
                tracing::trace!(name = %name, "registered type");
                self.types.insert(name.clone(), Status::Done);
                Ok(())
            }
            Err(e) => {
                self.types.insert(name.clone(), Status::Failed);
                self.errors.push(e.with_component(name.to_string()));
                Err(SchemaError::new(format!("type {} is invalid", name)))
            }
        }
    }

    fn resolve(&mut self, type_ref: &TypeRef, base: bool) -> Result<TypeId, SchemaError> {
        match type_ref {
            TypeRef::Named(name) => {
                let id = self.lookup(name)?;
                self.ensure_named(name, base)?;
                Ok(id)
            }
            TypeRef::Anonymous(def) => {
                let id = self.globals.reserve(None);
                let ty = self.compile_def(def)?;
                self.globals.define(id, ty)?;
                Ok(id)
            }
        }
    }

    fn compile_def(&mut self, def: &TypeDef) -> Result<XsdType, SchemaError> {
        match def {
            TypeDef::Simple(simple) => self.compile_simple(simple).map(XsdType::Simple),
            TypeDef::Complex(complex) => self.compile_complex(complex).map(XsdType::Complex),
        }
    }

    fn compile_simple(&mut self, def: &SimpleTypeDef) -> Result<SimpleType, SchemaError> {
        match def {
            SimpleTypeDef::Restriction { base, facets } => {
                let base = self.resolve(base, true)?;
                SimpleType::restriction(&self.globals, base, facets, Some(&self.builder.namespaces))
            }
            SimpleTypeDef::List { item } => {
                let item = self.resolve(item, true)?;
                SimpleType::list(&self.globals, item)
            }
            SimpleTypeDef::Union { members } => {
                let members = members
                    .iter()
                    .map(|m| self.resolve(m, true))
                    .collect::<Result<Vec<_>, _>>()?;
                SimpleType::union(&self.globals, members)
            }
        }
    }

    fn compile_complex(&mut self, def: &ComplexTypeDef) -> Result<ComplexType, SchemaError> {
        let base = match &def.base {
            Some(base) => self.resolve(base, true)?,
            None => self.globals.any_type(),
        };
        let content = match &def.content {
            ContentSpec::Complex { particle, mixed } => ContentDef::Complex {
                group: particle.as_ref().map(|p| self.root_group(p)).transpose()?,
                mixed: *mixed,
            },
            ContentSpec::Simple { facets, simple_type } => {
                let explicit = simple_type.as_ref().map(|t| self.resolve(t, true)).transpose()?;
                if facets.is_empty() {
                    ContentDef::Simple(explicit)
                } else {
                    let restricted = match explicit.or_else(|| self.globals.complex(base).and_then(|ct| ct.content.simple_type())) {
                        Some(id) => id,
                        None => {
                            return Err(SchemaError::new(
                                "facets of a simpleContent restriction need a base with simple content",
                            ))
                        }
                    };
                    let narrowed =
                        SimpleType::restriction(&self.globals, restricted, facets, Some(&self.builder.namespaces))?;
                    ContentDef::Simple(Some(self.globals.register(XsdType::Simple(narrowed))))
                }
            }
        };
        let mut attributes = AttributeUses::new();
        for use_def in &def.attributes {
            let attribute_use = self.attribute_use(use_def)?;
            attributes.insert(attribute_use)?;
        }
        attributes.wildcard = def.any_attribute.clone();
        let derivation = Derivation {
            base,
            method: def.method,
            content,
            attributes,
            open_content: def.open_content.clone(),
        };
        Ok(ComplexType::derive(
            &self.globals,
            derivation,
            self.builder.default_open_content.as_ref(),
            &self.builder.limits,
        )?
        .abstract_(def.abstract_))
    }

    fn root_group(&mut self, particle: &ParticleDef) -> Result<ModelGroup, SchemaError> {
        match self.particle(particle)? {
            Particle::Group(group) => Ok(group),
            other => Ok(ModelGroup::sequence(vec![other])),
        }
    }

    fn particle(&mut self, def: &ParticleDef) -> Result<Particle, SchemaError> {
        match def {
            ParticleDef::Element(element, occurs) => {
                let decl = self.element_decl(element)?;
                Ok(Particle::Element(ElementParticle::local(decl, *occurs)))
            }
            ParticleDef::ElementRef(name, occurs) => {
                if self.globals.element(name).is_none() {
                    return Err(SchemaError::new(format!("reference to unknown element {}", name)));
                }
                Ok(Particle::Element(ElementParticle::reference(name.clone(), *occurs)))
            }
            ParticleDef::Any(wildcard, occurs) => Ok(Particle::Wildcard(WildcardParticle {
                wildcard: wildcard.clone(),
                occurs: *occurs,
            })),
            ParticleDef::Group(compositor, particles, occurs) => {
                let particles = particles
                    .iter()
                    .map(|p| self.particle(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Particle::Group(ModelGroup::new(*compositor, particles).with_occurs(*occurs)))
            }
            ParticleDef::GroupRef(name, occurs) => {
                let group = self.named_group(name)?;
                Ok(Particle::Group(group.with_occurs(*occurs)))
            }
        }
    }

    fn named_group(&mut self, name: &QName) -> Result<ModelGroup, SchemaError> {
        if let Some(group) = self.globals.group(name) {
            return Ok(group.clone());
        }
        let builder = self.builder;
        let def = builder
            .groups
            .get(name)
            .ok_or_else(|| SchemaError::new(format!("reference to unknown group {}", name)))?;
        match self.groups.get(name) {
            Some(Status::InProgress) => {
                return Err(SchemaError::new(format!("circular reference to group {}", name)))
            }
            Some(Status::Failed) => return Err(SchemaError::new(format!("group {} is invalid", name))),
            _ => {}
        }
        self.groups.insert(name.clone(), Status::InProgress);
        let result = self.root_group(def);
        match &result {
            Ok(group) => {
                self.globals.add_group(name.clone(), group.clone());
                self.groups.insert(name.clone(), Status::Done);
            }
            Err(_) => {
                self.groups.insert(name.clone(), Status::Failed);
            }
        }
        result
    }

    fn element_decl(&mut self, def: &ElementDef) -> Result<ElementDecl, SchemaError> {
        let type_id = match &def.type_ref {
            Some(type_ref) => self.resolve(type_ref, false)?,
            None => self.globals.any_type(),
        };
        let decl = ElementDecl::new(def.name.clone(), type_id)
            .nillable(def.nillable)
            .abstract_(def.abstract_)
            .with_value_constraint(def.default.clone(), def.fixed.clone())?;
        if let Some(text) = decl.value_constraint() {
            self.check_value(type_id, text)
                .map_err(|e| e.with_component(def.name.to_string()))?;
        }
        Ok(decl)
    }

    fn attribute_decl(&mut self, def: &AttributeDef) -> Result<AttributeDecl, SchemaError> {
        let type_id = match &def.type_ref {
            Some(type_ref) => self.resolve(type_ref, false)?,
            None => self.globals.any_simple_type(),
        };
        if !self.globals.get(type_id).map_or(true, XsdType::is_simple) {
            return Err(SchemaError::new(format!(
                "the type of attribute {} must be a simple type",
                def.name
            )));
        }
        let decl = AttributeDecl::new(def.name.clone(), type_id)
            .with_value_constraint(def.default.clone(), def.fixed.clone())?;
        if let Some(text) = decl.value_constraint() {
            self.check_value(type_id, text)?;
        }
        Ok(decl)
    }

    fn global_attribute(&mut self, name: &QName) -> Result<AttributeDecl, SchemaError> {
        if let Some(decl) = self.globals.attribute(name) {
            return Ok(decl.clone());
        }
        let builder = self.builder;
        let def = builder
            .attributes
            .get(name)
            .ok_or_else(|| SchemaError::new(format!("reference to unknown attribute {}", name)))?;
        let decl = self.attribute_decl(def)?;
        self.globals.add_attribute(decl.clone())?;
        Ok(decl)
    }

    fn attribute_use(&mut self, def: &AttributeUseDef) -> Result<AttributeUse, SchemaError> {
        match def {
            AttributeUseDef::Local(attribute, mode) => AttributeUse::new(self.attribute_decl(attribute)?, *mode),
            AttributeUseDef::Reference(name, mode) => AttributeUse::new(self.global_attribute(name)?, *mode),
        }
    }

    /// A default or fixed value must be valid for its type
    fn check_value(&self, type_id: TypeId, text: &str) -> Result<(), SchemaError> {
        let simple = match self.globals.get(type_id) {
            Some(XsdType::Simple(simple)) => simple,
            Some(XsdType::Complex(ct)) => match ct.content.simple_type().and_then(|id| self.globals.simple(id)) {
                Some(simple) => simple,
                None if ct.is_mixed() => return Ok(()),
                None => {
                    return Err(SchemaError::new(
                        "a value constraint needs a simple type or simple or mixed content",
                    ))
                }
            },
            None => return Ok(()),
        };
        let mut ctx = ValidationContext::with_mode(super::base::ValidationMode::Strict);
        simple
            .decode(&self.globals, text, Some(&self.builder.namespaces), &mut ctx)
            .map(|_| ())
            .map_err(|e| SchemaError::new(format!("invalid value constraint '{}': {}", text, e)))
    }

    fn check_element_constraints(&mut self) {
        let mut found = Vec::new();
        for decl in self.globals.iter_elements() {
            if let Some(text) = decl.value_constraint() {
                if let Err(e) = self.check_value(decl.type_id, text) {
                    found.push(e.with_component(decl.name.to_string()));
                }
            }
        }
        self.errors.extend(found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::facets::FacetKind;
    use crate::validators::open_content::OpenContentMode;
    use crate::validators::wildcards::{NamespaceConstraint, ProcessContents};
    use pretty_assertions::assert_eq;

    fn local(name: &str) -> QName {
        QName::local(name)
    }

    #[test]
    fn test_bases_compile_before_derivations() {
        let mut builder = SchemaBuilder::new();
        builder.add_complex_type(
            local("derived"),
            ComplexTypeDef::with_particle(ParticleDef::sequence(vec![ParticleDef::element(
                local("b"),
                TypeRef::xsd("int"),
            )]))
            .derived_from(TypeRef::Named(local("base")), DerivationMethod::Extension),
        );
        builder.add_complex_type(
            local("base"),
            ComplexTypeDef::with_particle(ParticleDef::sequence(vec![ParticleDef::element(
                local("a"),
                TypeRef::xsd("string"),
            )])),
        );
        let schema = builder.build().unwrap();
        let derived = schema.lookup_type(&local("derived")).unwrap();
        let base = schema.lookup_type(&local("base")).unwrap();
        assert!(schema.globals().is_derived_from(derived, base));
    }

    #[test]
    fn test_circular_derivation_is_an_error() {
        let mut builder = SchemaBuilder::new();
        builder.add_simple_type(
            local("a"),
            SimpleTypeDef::Restriction {
                base: TypeRef::Named(local("b")),
                facets: vec![],
            },
        );
        builder.add_simple_type(
            local("b"),
            SimpleTypeDef::Restriction {
                base: TypeRef::Named(local("a")),
                facets: vec![],
            },
        );
        let errors = builder.build().unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("circular")));
    }

    #[test]
    fn test_independent_errors_are_all_collected() {
        let mut builder = SchemaBuilder::new();
        builder.add_simple_type(
            local("bad1"),
            SimpleTypeDef::Restriction {
                base: TypeRef::xsd("boolean"),
                facets: vec![FacetDef::new(FacetKind::MaxLength, "2")],
            },
        );
        builder.add_simple_type(
            local("good"),
            SimpleTypeDef::List {
                item: TypeRef::xsd("int"),
            },
        );
        builder.add_simple_type(
            local("bad2"),
            SimpleTypeDef::Restriction {
                base: TypeRef::Named(local("missing")),
                facets: vec![],
            },
        );
        let errors = builder.build().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.0[0].component.as_deref(), Some("bad1"));
    }

    #[test]
    fn test_recursive_type() {
        let mut builder = SchemaBuilder::new();
        builder.add_complex_type(
            local("node"),
            ComplexTypeDef::with_particle(ParticleDef::sequence(vec![ParticleDef::element(
                local("node"),
                TypeRef::Named(local("node")),
            )
            .occurs(Occurs::zero_or_more())])),
        );
        builder.add_element(ElementDef::new(local("tree"), TypeRef::Named(local("node"))));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_duplicates_and_unknown_references() {
        let mut builder = SchemaBuilder::new();
        builder.add_element(ElementDef::untyped(local("a")));
        builder.add_element(ElementDef::untyped(local("a")));
        let open = OpenContent::new(
            OpenContentMode::Interleave,
            Some(Wildcard::new(NamespaceConstraint::Any).with_process_contents(ProcessContents::Lax)),
        )
        .unwrap();
        builder.default_open_content(DefaultOpenContent::new(open.clone(), false).unwrap());
        builder.default_open_content(DefaultOpenContent::new(open, false).unwrap());
        builder.add_complex_type(
            local("t"),
            ComplexTypeDef::with_particle(ParticleDef::ElementRef(local("nowhere"), Occurs::once())),
        );
        let errors = builder.build().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_invalid_default_value() {
        let mut builder = SchemaBuilder::new();
        let mut def = ElementDef::new(local("n"), TypeRef::xsd("int"));
        def.default = Some("many".into());
        builder.add_element(def);
        assert!(builder.build().is_err());
    }
}

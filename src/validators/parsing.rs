//! XSD Document Parsing
//!
//! Reads an XSD 1.1 schema document into [`SchemaBuilder`] definitions and
//! compiles them. Component errors are collected: a broken type does not
//! stop the reader from looking at the next one, and every problem found is
//! reported in one [`SchemaErrors`](crate::error::SchemaErrors).
//!
//! Only single-document schemas are read. `import`, `include`, `redefine`
//! and `override` are skipped with a warning, and `assert` is ignored.

use std::collections::HashMap;

use crate::documents::Element;
use crate::error::{Error, ParseError, Result, SchemaError};
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::XSD_1_0_NAMESPACE;

use super::attributes::UseMode;
use super::builders::{
    AttributeDef, AttributeUseDef, ComplexTypeDef, ContentSpec, ElementDef, ParticleDef, SchemaBuilder,
    SimpleTypeDef, TypeDef, TypeRef,
};
use super::complex_types::DerivationMethod;
use super::facets::FacetKind;
use super::groups::ModelType;
use super::open_content::{DefaultOpenContent, OpenContent, OpenContentMode};
use super::particles::Occurs;
use super::schemas::Schema;
use super::simple_types::FacetDef;
use super::wildcards::{NamespaceConstraint, ProcessContents, Wildcard};

/// XSD element local names
mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const REDEFINE: &str = "redefine";
    pub const OVERRIDE: &str = "override";
    pub const NOTATION: &str = "notation";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const OPEN_CONTENT: &str = "openContent";
    pub const DEFAULT_OPEN_CONTENT: &str = "defaultOpenContent";
    pub const ASSERT: &str = "assert";
    pub const ASSERTION: &str = "assertion";
}

/// XSD attribute names
mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const REF: &str = "ref";
    pub const TYPE: &str = "type";
    pub const BASE: &str = "base";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const VALUE: &str = "value";
    pub const FIXED: &str = "fixed";
    pub const DEFAULT: &str = "default";
    pub const USE: &str = "use";
    pub const FORM: &str = "form";
    pub const MIXED: &str = "mixed";
    pub const ABSTRACT: &str = "abstract";
    pub const NILLABLE: &str = "nillable";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const NAMESPACE: &str = "namespace";
    pub const NOT_NAMESPACE: &str = "notNamespace";
    pub const NOT_QNAME: &str = "notQName";
    pub const PROCESS_CONTENTS: &str = "processContents";
    pub const MODE: &str = "mode";
    pub const APPLIES_TO_EMPTY: &str = "appliesToEmpty";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const ELEMENT_FORM_DEFAULT: &str = "elementFormDefault";
    pub const ATTRIBUTE_FORM_DEFAULT: &str = "attributeFormDefault";
}

use xsd_elements as tags;

type ParseResult<T> = std::result::Result<T, SchemaError>;

/// Parse and compile an XSD document
pub fn parse_schema(text: &str, limits: &Limits) -> Result<Schema> {
    let root = Element::parse(text)?;
    if !is_xsd(&root, tags::SCHEMA) {
        return Err(ParseError::new(format!("the root element {} is not an xs:schema", root.name)).into());
    }

    let mut reader = SchemaReader::new(&root);
    let mut builder = SchemaBuilder::new()
        .namespaces(root.namespaces.clone())
        .limits(limits.clone());
    if let Some(tns) = reader.target_namespace.clone() {
        builder = builder.target_namespace(tns);
    }

    reader.read_components(&root, &mut builder);
    tracing::debug!(
        target_namespace = ?reader.target_namespace,
        "schema document read"
    );
    builder.build().map_err(Error::SchemaErrors)
}

fn is_xsd(elem: &Element, local: &str) -> bool {
    elem.namespace() == Some(XSD_1_0_NAMESPACE) && elem.local_name() == local
}

/// XSD children of a component, without annotations
fn xsd_children(elem: &Element) -> impl Iterator<Item = &Element> {
    elem.children
        .iter()
        .filter(|c| c.namespace() == Some(XSD_1_0_NAMESPACE) && c.local_name() != tags::ANNOTATION)
}

fn value_error(err: Error) -> SchemaError {
    match err {
        Error::Value(message) => SchemaError::new(message),
        Error::Schema(e) => e,
        other => SchemaError::new(other.to_string()),
    }
}

fn parse_bool(elem: &Element, attr: &str) -> ParseResult<Option<bool>> {
    match elem.get_local_attribute(attr).map(str::trim) {
        None => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(SchemaError::new(format!(
            "wrong value '{}' for '{}' attribute: a boolean is required",
            other, attr
        ))),
    }
}

fn unexpected(child: &Element, parent: &Element) -> SchemaError {
    SchemaError::new(format!(
        "unexpected <{}> in <{}>",
        child.local_name(),
        parent.local_name()
    ))
}

/// Reads the components of one schema document
struct SchemaReader<'a> {
    target_namespace: Option<String>,
    qualified_elements: bool,
    qualified_attributes: bool,
    attribute_groups: HashMap<QName, &'a Element>,
    expanding: Vec<QName>,
}

impl<'a> SchemaReader<'a> {
    fn new(root: &'a Element) -> Self {
        let target_namespace = root
            .get_local_attribute(xsd_attrs::TARGET_NAMESPACE)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);
        let form = |attr| root.get_local_attribute(attr) == Some("qualified");

        let mut reader = Self {
            qualified_elements: form(xsd_attrs::ELEMENT_FORM_DEFAULT),
            qualified_attributes: form(xsd_attrs::ATTRIBUTE_FORM_DEFAULT),
            target_namespace,
            attribute_groups: HashMap::new(),
            expanding: Vec::new(),
        };
        for child in xsd_children(root).filter(|c| c.local_name() == tags::ATTRIBUTE_GROUP) {
            if let Some(name) = child.get_local_attribute(xsd_attrs::NAME) {
                let name = reader.global_name(name);
                reader.attribute_groups.insert(name, child);
            }
        }
        reader
    }

    fn global_name(&self, local: &str) -> QName {
        QName::new(self.target_namespace.clone(), local.trim())
    }

    fn local_name(&self, elem: &Element, local: &str, qualified_default: bool) -> QName {
        let qualified = match elem.get_local_attribute(xsd_attrs::FORM) {
            Some(form) => form == "qualified",
            None => qualified_default,
        };
        if qualified {
            self.global_name(local)
        } else {
            QName::local(local.trim())
        }
    }

    fn resolve(&self, elem: &Element, value: &str) -> ParseResult<QName> {
        elem.namespaces.resolve(value).map_err(value_error)
    }

    fn required<'e>(&self, elem: &'e Element, attr: &str) -> ParseResult<&'e str> {
        elem.get_local_attribute(attr).ok_or_else(|| {
            SchemaError::new(format!("<{}> requires a '{}' attribute", elem.local_name(), attr))
        })
    }

    fn read_components(&mut self, root: &Element, builder: &mut SchemaBuilder) {
        let mut other_components = false;
        for child in &root.children {
            if child.namespace() != Some(XSD_1_0_NAMESPACE) {
                builder.add_error(SchemaError::new(format!(
                    "unexpected {} in a schema document",
                    child.name
                )));
                continue;
            }

            let component = child.get_local_attribute(xsd_attrs::NAME).unwrap_or_default().to_string();
            let outcome = match child.local_name() {
                tags::ANNOTATION | tags::NOTATION => Ok(()),
                tags::IMPORT | tags::INCLUDE | tags::REDEFINE | tags::OVERRIDE => {
                    tracing::warn!(component = child.local_name(), "schema composition is not supported, skipped");
                    Ok(())
                }
                tags::DEFAULT_OPEN_CONTENT => {
                    let result = if other_components {
                        Err(SchemaError::new(
                            "a defaultOpenContent must precede the other schema components",
                        ))
                    } else {
                        self.default_open_content(child)
                            .map(|default| {
                                builder.default_open_content(default);
                            })
                    };
                    other_components = true;
                    result
                }
                name => {
                    other_components = true;
                    self.global_component(name, child, builder)
                }
            };

            if let Err(err) = outcome {
                let err = if component.is_empty() || err.component.is_some() {
                    err
                } else {
                    err.with_component(component)
                };
                builder.add_error(err.with_position(format!("/schema/{}", child.local_name())));
            }
        }
    }

    fn global_component(&mut self, tag: &str, elem: &Element, builder: &mut SchemaBuilder) -> ParseResult<()> {
        match tag {
            tags::ELEMENT => {
                let def = self.element_def(elem, true)?;
                builder.add_element(def);
            }
            tags::SIMPLE_TYPE => {
                let name = self.global_name(self.required(elem, xsd_attrs::NAME)?);
                let def = self.simple_type(elem)?;
                builder.add_simple_type(name, def);
            }
            tags::COMPLEX_TYPE => {
                let name = self.global_name(self.required(elem, xsd_attrs::NAME)?);
                let def = self.complex_type(elem)?;
                builder.add_complex_type(name, def);
            }
            tags::ATTRIBUTE => {
                let def = self.attribute_def(elem, true)?;
                builder.add_attribute(def);
            }
            tags::GROUP => {
                let name = self.global_name(self.required(elem, xsd_attrs::NAME)?);
                let mut groups = xsd_children(elem);
                let group = match (groups.next(), groups.next()) {
                    (Some(g), None) if ModelType::from_tag(g.local_name()).is_some() => {
                        if g.get_local_attribute(xsd_attrs::MIN_OCCURS).is_some()
                            || g.get_local_attribute(xsd_attrs::MAX_OCCURS).is_some()
                        {
                            return Err(SchemaError::new(
                                "the model group of a named group cannot have occurrence attributes",
                            ));
                        }
                        self.particle(g)?
                    }
                    _ => {
                        return Err(SchemaError::new(
                            "a named group must contain exactly one sequence, choice or all",
                        ))
                    }
                };
                builder.add_group(name, group);
            }
            // expanded where referenced
            tags::ATTRIBUTE_GROUP => {
                self.required(elem, xsd_attrs::NAME)?;
            }
            tags::OPEN_CONTENT => {
                return Err(SchemaError::new(
                    "openContent is not allowed at schema level, use defaultOpenContent",
                ))
            }
            _ => return Err(SchemaError::new(format!("unexpected <{}> in a schema document", tag))),
        }
        Ok(())
    }

    fn default_open_content(&mut self, elem: &Element) -> ParseResult<DefaultOpenContent> {
        let applies_to_empty = parse_bool(elem, xsd_attrs::APPLIES_TO_EMPTY)?.unwrap_or(false);
        let open_content = self.open_content(elem)?;
        DefaultOpenContent::new(open_content, applies_to_empty)
    }

    /// `openContent` or the content of a `defaultOpenContent`
    fn open_content(&mut self, elem: &Element) -> ParseResult<OpenContent> {
        let mode = match elem.get_local_attribute(xsd_attrs::MODE) {
            Some(mode) => mode.trim().parse::<OpenContentMode>().map_err(value_error)?,
            None => OpenContentMode::Interleave,
        };

        let mut any = None;
        for child in xsd_children(elem) {
            if child.local_name() != tags::ANY || any.is_some() {
                return Err(unexpected(child, elem));
            }
            if child.get_local_attribute(xsd_attrs::MIN_OCCURS).is_some()
                || child.get_local_attribute(xsd_attrs::MAX_OCCURS).is_some()
            {
                return Err(SchemaError::new(format!(
                    "the <any> of an {} cannot have minOccurs or maxOccurs",
                    elem.local_name()
                )));
            }
            any = Some(self.wildcard(child)?);
        }
        OpenContent::new(mode, any)
    }

    fn wildcard(&self, elem: &Element) -> ParseResult<Wildcard> {
        let tns = self.target_namespace.as_deref();
        let namespace = match (
            elem.get_local_attribute(xsd_attrs::NAMESPACE),
            elem.get_local_attribute(xsd_attrs::NOT_NAMESPACE),
        ) {
            (Some(_), Some(_)) => {
                return Err(SchemaError::new(
                    "'namespace' and 'notNamespace' attributes are mutually exclusive",
                ))
            }
            (Some(value), None) => NamespaceConstraint::from_namespace_attr(value, tns)?,
            (None, Some(value)) => NamespaceConstraint::from_not_namespace_attr(value, tns)?,
            (None, None) => NamespaceConstraint::Any,
        };
        let process_contents = match elem.get_local_attribute(xsd_attrs::PROCESS_CONTENTS) {
            Some(value) => value.trim().parse::<ProcessContents>().map_err(value_error)?,
            None => ProcessContents::Strict,
        };

        let mut wildcard = Wildcard::new(namespace).with_process_contents(process_contents);
        if let Some(value) = elem.get_local_attribute(xsd_attrs::NOT_QNAME) {
            wildcard.not_qname = Wildcard::parse_not_qname(value, &elem.namespaces)?;
        }
        Ok(wildcard)
    }

    fn occurs(&self, elem: &Element) -> ParseResult<Occurs> {
        Occurs::parse(
            elem.get_local_attribute(xsd_attrs::MIN_OCCURS),
            elem.get_local_attribute(xsd_attrs::MAX_OCCURS),
        )
    }

    fn type_ref(&self, elem: &Element, value: &str) -> ParseResult<TypeRef> {
        self.resolve(elem, value).map(TypeRef::Named)
    }

    /// The type of an element or attribute: `type` attribute or inline definition
    fn declared_type(&mut self, elem: &Element, allow_complex: bool) -> ParseResult<Option<TypeRef>> {
        let inline = xsd_children(elem)
            .find(|c| c.local_name() == tags::SIMPLE_TYPE || c.local_name() == tags::COMPLEX_TYPE);
        match (elem.get_local_attribute(xsd_attrs::TYPE), inline) {
            (Some(_), Some(_)) => Err(SchemaError::new(format!(
                "<{}> cannot have both a 'type' attribute and an inline type",
                elem.local_name()
            ))),
            (Some(value), None) => self.type_ref(elem, value).map(Some),
            (None, Some(def)) if def.local_name() == tags::SIMPLE_TYPE => Ok(Some(TypeRef::anonymous(
                TypeDef::Simple(self.simple_type(def)?),
            ))),
            (None, Some(def)) if allow_complex => Ok(Some(TypeRef::anonymous(TypeDef::Complex(
                self.complex_type(def)?,
            )))),
            (None, Some(def)) => Err(unexpected(def, elem)),
            (None, None) => Ok(None),
        }
    }

    fn element_def(&mut self, elem: &Element, global: bool) -> ParseResult<ElementDef> {
        let local = self.required(elem, xsd_attrs::NAME)?;
        let name = if global {
            self.global_name(local)
        } else {
            self.local_name(elem, local, self.qualified_elements)
        };
        let default = elem.get_local_attribute(xsd_attrs::DEFAULT).map(str::to_string);
        let fixed = elem.get_local_attribute(xsd_attrs::FIXED).map(str::to_string);
        if default.is_some() && fixed.is_some() {
            return Err(SchemaError::new("'default' and 'fixed' attributes are mutually exclusive")
                .with_component(name.to_string()));
        }

        Ok(ElementDef {
            type_ref: self.declared_type(elem, true)?,
            nillable: parse_bool(elem, xsd_attrs::NILLABLE)?.unwrap_or(false),
            abstract_: parse_bool(elem, xsd_attrs::ABSTRACT)?.unwrap_or(false),
            default,
            fixed,
            name,
        })
    }

    fn attribute_def(&mut self, elem: &Element, global: bool) -> ParseResult<AttributeDef> {
        let local = self.required(elem, xsd_attrs::NAME)?;
        let name = if global {
            self.global_name(local)
        } else {
            self.local_name(elem, local, self.qualified_attributes)
        };
        let default = elem.get_local_attribute(xsd_attrs::DEFAULT).map(str::to_string);
        let fixed = elem.get_local_attribute(xsd_attrs::FIXED).map(str::to_string);
        if default.is_some() && fixed.is_some() {
            return Err(SchemaError::new("'default' and 'fixed' attributes are mutually exclusive"));
        }
        Ok(AttributeDef {
            type_ref: self.declared_type(elem, false)?,
            name,
            default,
            fixed,
        })
    }

    fn attribute_use(&mut self, elem: &Element) -> ParseResult<AttributeUseDef> {
        let mode = match elem.get_local_attribute(xsd_attrs::USE) {
            Some(value) => value.trim().parse::<UseMode>().map_err(value_error)?,
            None => UseMode::Optional,
        };
        match elem.get_local_attribute(xsd_attrs::REF) {
            Some(reference) => Ok(AttributeUseDef::Reference(self.resolve(elem, reference)?, mode)),
            None => Ok(AttributeUseDef::Local(self.attribute_def(elem, false)?, mode)),
        }
    }

    /// Attribute uses and wildcard of an `attributeGroup` reference
    fn attribute_group(&mut self, elem: &Element) -> ParseResult<(Vec<AttributeUseDef>, Option<Wildcard>)> {
        let name = self.resolve(elem, self.required(elem, xsd_attrs::REF)?)?;
        let group = *self
            .attribute_groups
            .get(&name)
            .ok_or_else(|| SchemaError::new(format!("unknown attribute group {}", name)))?;
        if self.expanding.contains(&name) {
            return Err(SchemaError::new(format!("circular reference to attribute group {}", name)));
        }

        self.expanding.push(name);
        let result = self.attribute_list(group, xsd_children(group).collect());
        self.expanding.pop();
        result
    }

    /// `attribute`, `attributeGroup` and `anyAttribute` children
    fn attribute_list(
        &mut self,
        parent: &Element,
        children: Vec<&Element>,
    ) -> ParseResult<(Vec<AttributeUseDef>, Option<Wildcard>)> {
        let mut uses = Vec::new();
        let mut wildcard: Option<Wildcard> = None;
        for child in children {
            match child.local_name() {
                tags::ATTRIBUTE => uses.push(self.attribute_use(child)?),
                tags::ATTRIBUTE_GROUP => {
                    let (group_uses, group_wildcard) = self.attribute_group(child)?;
                    uses.extend(group_uses);
                    wildcard = match (wildcard, group_wildcard) {
                        (Some(w), Some(g)) => Some(w.intersection(&g)),
                        (w, g) => w.or(g),
                    };
                }
                tags::ANY_ATTRIBUTE => {
                    let any = self.wildcard(child)?;
                    wildcard = Some(match wildcard {
                        Some(w) => w.intersection(&any),
                        None => any,
                    });
                }
                tags::ASSERT => tracing::debug!("assertion ignored"),
                _ => return Err(unexpected(child, parent)),
            }
        }
        Ok((uses, wildcard))
    }

    fn simple_type(&mut self, elem: &Element) -> ParseResult<SimpleTypeDef> {
        let mut children = xsd_children(elem);
        let (Some(derivation), None) = (children.next(), children.next()) else {
            return Err(SchemaError::new(
                "a simpleType must contain exactly one restriction, list or union",
            ));
        };

        match derivation.local_name() {
            tags::RESTRICTION => {
                let inline = xsd_children(derivation).find(|c| c.local_name() == tags::SIMPLE_TYPE);
                let base = match (derivation.get_local_attribute(xsd_attrs::BASE), inline) {
                    (Some(base), None) => self.type_ref(derivation, base)?,
                    (None, Some(def)) => TypeRef::anonymous(TypeDef::Simple(self.simple_type(def)?)),
                    _ => {
                        return Err(SchemaError::new(
                            "a simpleType restriction needs either a 'base' attribute or an inline simpleType",
                        ))
                    }
                };
                let facets = self.facets(derivation)?;
                Ok(SimpleTypeDef::Restriction { base, facets })
            }
            tags::LIST => {
                let inline = xsd_children(derivation).find(|c| c.local_name() == tags::SIMPLE_TYPE);
                let item = match (derivation.get_local_attribute(xsd_attrs::ITEM_TYPE), inline) {
                    (Some(item), None) => self.type_ref(derivation, item)?,
                    (None, Some(def)) => TypeRef::anonymous(TypeDef::Simple(self.simple_type(def)?)),
                    _ => {
                        return Err(SchemaError::new(
                            "a list needs either an 'itemType' attribute or an inline simpleType",
                        ))
                    }
                };
                Ok(SimpleTypeDef::List { item })
            }
            tags::UNION => {
                let mut members = Vec::new();
                if let Some(value) = derivation.get_local_attribute(xsd_attrs::MEMBER_TYPES) {
                    for name in value.split_whitespace() {
                        members.push(self.type_ref(derivation, name)?);
                    }
                }
                for child in xsd_children(derivation) {
                    if child.local_name() != tags::SIMPLE_TYPE {
                        return Err(unexpected(child, derivation));
                    }
                    members.push(TypeRef::anonymous(TypeDef::Simple(self.simple_type(child)?)));
                }
                if members.is_empty() {
                    return Err(SchemaError::new("a union needs at least one member type"));
                }
                Ok(SimpleTypeDef::Union { members })
            }
            _ => Err(unexpected(derivation, elem)),
        }
    }

    /// Facets of a restriction; other children are left to the caller
    fn facets(&self, restriction: &Element) -> ParseResult<Vec<FacetDef>> {
        let mut facets = Vec::new();
        for child in xsd_children(restriction) {
            let Some(kind) = FacetKind::from_name(child.local_name()) else {
                continue;
            };
            let value = self.required(child, xsd_attrs::VALUE)?;
            let mut facet = FacetDef::new(kind, value);
            if parse_bool(child, xsd_attrs::FIXED)?.unwrap_or(false) {
                facet = facet.fixed();
            }
            facets.push(facet);
        }
        Ok(facets)
    }

    fn complex_type(&mut self, elem: &Element) -> ParseResult<ComplexTypeDef> {
        let mixed = parse_bool(elem, xsd_attrs::MIXED)?.unwrap_or(false);
        let abstract_ = parse_bool(elem, xsd_attrs::ABSTRACT)?.unwrap_or(false);

        let children: Vec<&Element> = xsd_children(elem).collect();
        let content = children
            .iter()
            .copied()
            .find(|c| c.local_name() == tags::SIMPLE_CONTENT || c.local_name() == tags::COMPLEX_CONTENT);

        let mut def = match content {
            Some(content) => {
                if let Some(other) = children.iter().copied().find(|c| !std::ptr::eq(*c, content)) {
                    if other.local_name() == tags::OPEN_CONTENT && content.local_name() == tags::SIMPLE_CONTENT {
                        return Err(SchemaError::new("an openContent is not allowed on simple content"));
                    }
                    return Err(unexpected(other, elem));
                }
                if content.local_name() == tags::SIMPLE_CONTENT {
                    self.simple_content(content)?
                } else {
                    let mixed = parse_bool(content, xsd_attrs::MIXED)?.unwrap_or(mixed);
                    self.complex_content(content, mixed)?
                }
            }
            None => {
                let mut def = ComplexTypeDef::default();
                self.content_body(elem, children, mixed, &mut def)?;
                def
            }
        };
        def.abstract_ = abstract_;
        Ok(def)
    }

    fn derivation<'e>(&self, content: &'e Element) -> ParseResult<(&'e Element, DerivationMethod, TypeRef)> {
        let mut children = xsd_children(content);
        let (Some(derivation), None) = (children.next(), children.next()) else {
            return Err(SchemaError::new(format!(
                "a {} must contain exactly one restriction or extension",
                content.local_name()
            )));
        };
        let method = match derivation.local_name() {
            tags::RESTRICTION => DerivationMethod::Restriction,
            tags::EXTENSION => DerivationMethod::Extension,
            _ => return Err(unexpected(derivation, content)),
        };
        let base = self.type_ref(derivation, self.required(derivation, xsd_attrs::BASE)?)?;
        Ok((derivation, method, base))
    }

    fn simple_content(&mut self, content: &Element) -> ParseResult<ComplexTypeDef> {
        let (derivation, method, base) = self.derivation(content)?;
        let mut simple_type = None;
        let mut attributes = Vec::new();
        for child in xsd_children(derivation) {
            match child.local_name() {
                tags::SIMPLE_TYPE if method == DerivationMethod::Restriction && simple_type.is_none() => {
                    simple_type = Some(TypeRef::anonymous(TypeDef::Simple(self.simple_type(child)?)));
                }
                tags::OPEN_CONTENT => {
                    return Err(SchemaError::new("an openContent is not allowed on simple content"))
                }
                name if FacetKind::from_name(name).is_some() && method == DerivationMethod::Restriction => {}
                _ => attributes.push(child),
            }
        }
        let facets = if method == DerivationMethod::Restriction {
            self.facets(derivation)?
        } else {
            Vec::new()
        };

        let (attributes, any_attribute) = self.attribute_list(derivation, attributes)?;
        Ok(ComplexTypeDef {
            base: Some(base),
            method,
            content: ContentSpec::Simple { facets, simple_type },
            attributes,
            any_attribute,
            ..ComplexTypeDef::default()
        })
    }

    fn complex_content(&mut self, content: &Element, mixed: bool) -> ParseResult<ComplexTypeDef> {
        let (derivation, method, base) = self.derivation(content)?;
        let mut def = ComplexTypeDef {
            base: Some(base),
            method,
            ..ComplexTypeDef::default()
        };
        self.content_body(derivation, xsd_children(derivation).collect(), mixed, &mut def)?;
        Ok(def)
    }

    /// `openContent?, (group | all | choice | sequence)?, attributes` of a
    /// complexType or a complexContent derivation
    fn content_body(
        &mut self,
        parent: &Element,
        children: Vec<&Element>,
        mixed: bool,
        def: &mut ComplexTypeDef,
    ) -> ParseResult<()> {
        let mut particle = None;
        let mut rest = Vec::new();
        for child in children {
            match child.local_name() {
                tags::OPEN_CONTENT => {
                    if particle.is_some() || !rest.is_empty() || def.open_content.is_some() {
                        return Err(SchemaError::new("an openContent must be the first content child"));
                    }
                    def.open_content = Some(self.open_content(child)?);
                }
                tags::SEQUENCE | tags::CHOICE | tags::ALL | tags::GROUP => {
                    if particle.is_some() || !rest.is_empty() {
                        return Err(unexpected(child, parent));
                    }
                    particle = Some(self.particle(child)?);
                }
                _ => rest.push(child),
            }
        }

        let (attributes, any_attribute) = self.attribute_list(parent, rest)?;
        def.content = ContentSpec::Complex { particle, mixed };
        def.attributes = attributes;
        def.any_attribute = any_attribute;
        Ok(())
    }

    fn particle(&mut self, elem: &Element) -> ParseResult<ParticleDef> {
        let occurs = self.occurs(elem)?;
        match elem.local_name() {
            tags::ELEMENT => match elem.get_local_attribute(xsd_attrs::REF) {
                Some(reference) => Ok(ParticleDef::ElementRef(self.resolve(elem, reference)?, occurs)),
                None => Ok(ParticleDef::Element(self.element_def(elem, false)?, occurs)),
            },
            tags::ANY => Ok(ParticleDef::Any(self.wildcard(elem)?, occurs)),
            tags::GROUP => {
                let reference = self.required(elem, xsd_attrs::REF)?;
                Ok(ParticleDef::GroupRef(self.resolve(elem, reference)?, occurs))
            }
            tag => {
                let Some(model) = ModelType::from_tag(tag) else {
                    return Err(SchemaError::new(format!("unexpected <{}> in a model group", tag)));
                };
                let particles = xsd_children(elem)
                    .filter(|c| c.local_name() != tags::ASSERTION)
                    .map(|c| self.particle(c))
                    .collect::<ParseResult<Vec<_>>>()?;
                Ok(ParticleDef::Group(model, particles, occurs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::validation::DecodeOptions;
    use pretty_assertions::assert_eq;

    fn xsd(body: &str) -> String {
        format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:test"
                 targetNamespace="urn:test" elementFormDefault="qualified">{}</xs:schema>"#,
            body
        )
    }

    fn schema_errors(body: &str) -> Vec<SchemaError> {
        match parse_schema(&xsd(body), &Limits::default()) {
            Err(Error::SchemaErrors(errors)) => errors.0,
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("schema unexpectedly compiled"),
        }
    }

    #[test]
    fn test_simple_schema() {
        let schema = parse_schema(
            &xsd(r#"
                <xs:simpleType name="percent">
                  <xs:restriction base="xs:int">
                    <xs:minInclusive value="0"/>
                    <xs:maxInclusive value="100"/>
                  </xs:restriction>
                </xs:simpleType>
                <xs:element name="root">
                  <xs:complexType>
                    <xs:sequence>
                      <xs:element name="value" type="tns:percent" maxOccurs="unbounded"/>
                    </xs:sequence>
                    <xs:attribute name="id" type="xs:string" use="required"/>
                  </xs:complexType>
                </xs:element>"#),
            &Limits::default(),
        )
        .unwrap();

        assert_eq!(schema.target_namespace(), Some("urn:test"));
        let ok = r#"<root xmlns="urn:test" id="a"><value>10</value><value>100</value></root>"#;
        assert!(schema.decode_str(ok, &DecodeOptions::strict()).is_ok());
        let bad = r#"<root xmlns="urn:test" id="a"><value>101</value></root>"#;
        assert!(schema.decode_str(bad, &DecodeOptions::strict()).is_err());
        let missing = r#"<root xmlns="urn:test"><value>1</value></root>"#;
        assert!(schema.decode_str(missing, &DecodeOptions::strict()).is_err());
    }

    #[test]
    fn test_open_content_errors() {
        let errors = schema_errors(
            r#"
            <xs:complexType name="a">
              <xs:openContent mode="suffix"/>
              <xs:sequence/>
            </xs:complexType>
            <xs:complexType name="b">
              <xs:openContent mode="none"><xs:any/></xs:openContent>
              <xs:sequence/>
            </xs:complexType>
            <xs:complexType name="c">
              <xs:openContent mode="append"><xs:any/></xs:openContent>
            </xs:complexType>
            <xs:complexType name="d">
              <xs:openContent><xs:any minOccurs="0"/></xs:openContent>
            </xs:complexType>"#,
        );
        assert_eq!(errors.len(), 4);
        let components: Vec<_> = errors.iter().map(|e| e.component.as_deref()).collect();
        assert_eq!(components, vec![Some("a"), Some("b"), Some("c"), Some("d")]);
        assert!(errors[2].message.contains("mode"));
    }

    #[test]
    fn test_open_content_on_simple_content() {
        let errors = schema_errors(
            r#"
            <xs:complexType name="priced">
              <xs:openContent><xs:any/></xs:openContent>
              <xs:simpleContent>
                <xs:extension base="xs:decimal"/>
              </xs:simpleContent>
            </xs:complexType>"#,
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("simple content"));

        let empty = schema_errors(
            r#"
            <xs:complexType name="nothing">
              <xs:openContent><xs:any/></xs:openContent>
            </xs:complexType>"#,
        );
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn test_default_open_content_rules() {
        let late = schema_errors(
            r#"
            <xs:element name="x" type="xs:string"/>
            <xs:defaultOpenContent><xs:any/></xs:defaultOpenContent>"#,
        );
        assert!(late[0].message.contains("precede"));

        let none = schema_errors(r#"<xs:defaultOpenContent mode="none"/>"#);
        assert!(none[0].message.contains("none"));

        let flag = schema_errors(r#"<xs:defaultOpenContent appliesToEmpty="yes"><xs:any/></xs:defaultOpenContent>"#);
        assert!(flag[0].message.contains("appliesToEmpty"));

        let schema_level = schema_errors(r#"<xs:openContent><xs:any/></xs:openContent>"#);
        assert_eq!(schema_level.len(), 1);
    }

    #[test]
    fn test_wildcard_attribute_errors() {
        let errors = schema_errors(
            r###"
            <xs:complexType name="both">
              <xs:sequence><xs:any namespace="##any" notNamespace="urn:x"/></xs:sequence>
            </xs:complexType>
            <xs:complexType name="token">
              <xs:sequence><xs:any namespace="##everything"/></xs:sequence>
            </xs:complexType>
            <xs:complexType name="occurs">
              <xs:sequence><xs:element name="e" minOccurs="-1"/></xs:sequence>
            </xs:complexType>"###,
        );
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_default_open_content_applies() {
        let schema = parse_schema(
            &xsd(r###"
                <xs:defaultOpenContent mode="suffix">
                  <xs:any namespace="##other" processContents="skip"/>
                </xs:defaultOpenContent>
                <xs:element name="root">
                  <xs:complexType>
                    <xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence>
                  </xs:complexType>
                </xs:element>"###),
            &Limits::default(),
        )
        .unwrap();
        assert!(schema.default_open_content().is_some());

        let ok = r#"<root xmlns="urn:test" xmlns:o="urn:other"><a>x</a><o:extra/><o:more/></root>"#;
        assert!(schema.decode_str(ok, &DecodeOptions::strict()).is_ok());
        let early = r#"<root xmlns="urn:test" xmlns:o="urn:other"><o:extra/><a>x</a></root>"#;
        assert!(schema.decode_str(early, &DecodeOptions::strict()).is_err());
    }

    #[test]
    fn test_attribute_group_expansion() {
        let schema = parse_schema(
            &xsd(r###"
                <xs:attributeGroup name="common">
                  <xs:attribute name="lang" type="xs:language"/>
                  <xs:anyAttribute namespace="##other" processContents="skip"/>
                </xs:attributeGroup>
                <xs:element name="note">
                  <xs:complexType>
                    <xs:simpleContent>
                      <xs:extension base="xs:string">
                        <xs:attributeGroup ref="tns:common"/>
                      </xs:extension>
                    </xs:simpleContent>
                  </xs:complexType>
                </xs:element>"###),
            &Limits::default(),
        )
        .unwrap();
        let xml = r#"<note xmlns="urn:test" xmlns:o="urn:other" lang="en" o:flag="1">hi</note>"#;
        assert!(schema.decode_str(xml, &DecodeOptions::strict()).is_ok());
        let bad = r#"<note xmlns="urn:test" lang="en" other="1">hi</note>"#;
        assert!(schema.decode_str(bad, &DecodeOptions::strict()).is_err());
    }

    #[test]
    fn test_not_a_schema() {
        let err = parse_schema("<root/>", &Limits::default()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}

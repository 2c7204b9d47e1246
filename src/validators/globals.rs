//! Global XSD declarations management
//!
//! [`XsdGlobals`] is the type registry: every simple and complex type,
//! built-in or user defined, named or anonymous, lives in one arena and is
//! referenced by [`TypeId`]. Derived types hold the id of their base, so
//! the derivation graph is plain data. Global elements, attributes and
//! named model groups are kept in ordered maps next to it.
//!
//! Ids can be reserved before a type is compiled, so that recursive
//! content models and forward references resolve to a stable id.

use indexmap::IndexMap;

use crate::error::{Error, Result, SchemaError};
use crate::namespaces::QName;

use super::attributes::AttributeDecl;
use super::builtins::{XSD_ANY_SIMPLE_TYPE, XSD_ANY_TYPE, BUILTIN_TYPES};
use super::complex_types::ComplexType;
use super::elements::ElementDecl;
use super::groups::ModelGroup;
use super::simple_types::SimpleType;
use super::wildcards::DefinedNames;

/// Index of a type in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

impl TypeId {
    /// Position in the registry
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A simple or a complex type
#[derive(Debug, Clone, PartialEq)]
pub enum XsdType {
    /// Simple type
    Simple(SimpleType),
    /// Complex type
    Complex(ComplexType),
}

impl XsdType {
    /// Global name, if any
    pub fn name(&self) -> Option<&QName> {
        match self {
            XsdType::Simple(t) => t.name.as_ref(),
            XsdType::Complex(t) => t.name.as_ref(),
        }
    }

    /// Base type id (`None` only for anyType)
    pub fn base(&self) -> Option<TypeId> {
        match self {
            XsdType::Simple(t) => t.base,
            XsdType::Complex(t) => t.base,
        }
    }

    /// Check if this is a simple type
    pub fn is_simple(&self) -> bool {
        matches!(self, XsdType::Simple(_))
    }

    /// Get as simple type
    pub fn as_simple(&self) -> Option<&SimpleType> {
        match self {
            XsdType::Simple(t) => Some(t),
            XsdType::Complex(_) => None,
        }
    }

    /// Get as complex type
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match self {
            XsdType::Complex(t) => Some(t),
            XsdType::Simple(_) => None,
        }
    }
}

struct Slot {
    name: Option<QName>,
    ty: Option<XsdType>,
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.ty) {
            (Some(name), None) => write!(f, "reserved({})", name),
            (None, None) => write!(f, "reserved"),
            (_, Some(ty)) => write!(f, "{:?}", ty),
        }
    }
}

/// Registry of global declarations and of every type
#[derive(Debug)]
pub struct XsdGlobals {
    slots: Vec<Slot>,
    type_names: IndexMap<QName, TypeId>,
    elements: IndexMap<QName, ElementDecl>,
    attributes: IndexMap<QName, AttributeDecl>,
    groups: IndexMap<QName, ModelGroup>,
    any_type: TypeId,
    any_simple_type: TypeId,
}

impl Default for XsdGlobals {
    fn default() -> Self {
        Self::new()
    }
}

impl XsdGlobals {
    /// Create a registry holding the XSD built-in types
    pub fn new() -> Self {
        let mut globals = Self {
            slots: Vec::new(),
            type_names: IndexMap::new(),
            elements: IndexMap::new(),
            attributes: IndexMap::new(),
            groups: IndexMap::new(),
            any_type: TypeId(0),
            any_simple_type: TypeId(0),
        };
        let any_type = globals.reserve(Some(xsd_name(XSD_ANY_TYPE)));
        globals.any_type = any_type;
        for builtin in BUILTIN_TYPES.iter() {
            let base = match builtin.base {
                Some(base) => globals.lookup_type(&xsd_name(base)),
                None => Some(any_type),
            };
            let list_item = builtin.list_item.and_then(|item| globals.lookup_type(&xsd_name(item)));
            let ty = SimpleType::builtin(builtin, base, list_item);
            let id = globals.register(XsdType::Simple(ty));
            if builtin.name == XSD_ANY_SIMPLE_TYPE {
                globals.any_simple_type = id;
            }
        }
        globals.slots[any_type.0].ty = Some(XsdType::Complex(ComplexType::any_type()));
        tracing::trace!(count = globals.slots.len(), "registered built-in types");
        globals
    }

    /// Reserve an id for a type compiled later
    pub fn reserve(&mut self, name: Option<QName>) -> TypeId {
        let id = TypeId(self.slots.len());
        if let Some(name) = &name {
            self.type_names.insert(name.clone(), id);
        }
        self.slots.push(Slot { name, ty: None });
        id
    }

    /// Store the compiled type of a reserved id
    pub fn define(&mut self, id: TypeId, ty: XsdType) -> std::result::Result<(), SchemaError> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or_else(|| SchemaError::new(format!("unknown type id {}", id.0)))?;
        if slot.ty.is_some() {
            return Err(SchemaError::new(format!("type {} is already defined", id.0)));
        }
        if slot.name.is_none() {
            slot.name = ty.name().cloned();
        }
        slot.ty = Some(ty);
        Ok(())
    }

    /// Add a compiled type, registering its name when it has one
    pub fn register(&mut self, ty: XsdType) -> TypeId {
        let id = self.reserve(ty.name().cloned());
        self.slots[id.0].ty = Some(ty);
        id
    }

    /// The anyType id
    pub fn any_type(&self) -> TypeId {
        self.any_type
    }

    /// The anySimpleType id
    pub fn any_simple_type(&self) -> TypeId {
        self.any_simple_type
    }

    /// Lookup a global type by name
    pub fn lookup_type(&self, name: &QName) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Get a compiled type
    pub fn get(&self, id: TypeId) -> Option<&XsdType> {
        self.slots.get(id.0).and_then(|slot| slot.ty.as_ref())
    }

    /// Get a compiled type, failing for reserved or unknown ids
    pub fn expect(&self, id: TypeId) -> Result<&XsdType> {
        self.get(id).ok_or_else(|| {
            Error::Schema(SchemaError::new(format!(
                "type {} is referenced but not compiled",
                self.display_name(id)
            )))
        })
    }

    /// Get a simple type
    pub fn simple(&self, id: TypeId) -> Option<&SimpleType> {
        self.get(id).and_then(XsdType::as_simple)
    }

    /// Get a complex type
    pub fn complex(&self, id: TypeId) -> Option<&ComplexType> {
        self.get(id).and_then(XsdType::as_complex)
    }

    /// Get a simple type, failing if the id names a complex type
    pub fn expect_simple(&self, id: TypeId) -> Result<&SimpleType> {
        self.expect(id)?.as_simple().ok_or_else(|| {
            Error::Schema(SchemaError::new(format!(
                "{} is not a simple type",
                self.display_name(id)
            )))
        })
    }

    /// True once the id holds a compiled type
    pub fn is_defined(&self, id: TypeId) -> bool {
        self.get(id).is_some()
    }

    /// Name of a type for messages
    pub fn display_name(&self, id: TypeId) -> String {
        match self.slots.get(id.0) {
            Some(Slot { name: Some(name), .. }) => name.to_string(),
            Some(_) => format!("anonymous type #{}", id.0),
            None => format!("unknown type #{}", id.0),
        }
    }

    /// Base type of a compiled type
    pub fn base_of(&self, id: TypeId) -> Option<TypeId> {
        self.get(id).and_then(XsdType::base)
    }

    /// True if `id` is `base` or derived from it through any number of steps
    pub fn is_derived_from(&self, id: TypeId, base: TypeId) -> bool {
        if base == self.any_type {
            return true;
        }
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(ty) = current {
            if ty == base {
                return true;
            }
            steps += 1;
            if steps > self.slots.len() {
                return false;
            }
            current = self.base_of(ty);
        }
        false
    }

    /// Register a global element declaration
    pub fn add_element(&mut self, decl: ElementDecl) -> std::result::Result<(), SchemaError> {
        if self.elements.contains_key(&decl.name) {
            return Err(SchemaError::new(format!("duplicate global element {}", decl.name)));
        }
        self.elements.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Lookup a global element
    pub fn element(&self, name: &QName) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Register a global attribute declaration
    pub fn add_attribute(&mut self, decl: AttributeDecl) -> std::result::Result<(), SchemaError> {
        if self.attributes.contains_key(&decl.name) {
            return Err(SchemaError::new(format!("duplicate global attribute {}", decl.name)));
        }
        self.attributes.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Lookup a global attribute
    pub fn attribute(&self, name: &QName) -> Option<&AttributeDecl> {
        self.attributes.get(name)
    }

    /// Register a compiled named model group
    pub fn add_group(&mut self, name: QName, group: ModelGroup) {
        self.groups.insert(name, group);
    }

    /// Lookup a named model group
    pub fn group(&self, name: &QName) -> Option<&ModelGroup> {
        self.groups.get(name)
    }

    /// Iterate over global elements in declaration order
    pub fn iter_elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.elements.values()
    }

    /// Number of types, anonymous ones included
    pub fn type_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of global elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

impl DefinedNames for XsdGlobals {
    fn is_defined(&self, name: &QName) -> bool {
        self.elements.contains_key(name)
    }
}

fn xsd_name(local: &str) -> QName {
    QName::namespaced(crate::XSD_1_0_NAMESPACE, local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let globals = XsdGlobals::new();
        let int = globals.lookup_type(&xsd_name("int")).unwrap();
        assert!(globals.simple(int).is_some());
        assert!(globals.complex(globals.any_type()).is_some());
        assert_eq!(globals.display_name(int), format!("{{{}}}int", crate::XSD_1_0_NAMESPACE));
        assert!(globals.lookup_type(&xsd_name("NMTOKENS")).is_some());
    }

    #[test]
    fn test_derivation_chain() {
        let globals = XsdGlobals::new();
        let short = globals.lookup_type(&xsd_name("short")).unwrap();
        let decimal = globals.lookup_type(&xsd_name("decimal")).unwrap();
        let string = globals.lookup_type(&xsd_name("string")).unwrap();
        assert!(globals.is_derived_from(short, decimal));
        assert!(globals.is_derived_from(short, globals.any_simple_type()));
        assert!(globals.is_derived_from(short, globals.any_type()));
        assert!(!globals.is_derived_from(short, string));
        assert!(!globals.is_derived_from(decimal, short));
    }

    #[test]
    fn test_reserve_and_define() {
        let mut globals = XsdGlobals::new();
        let name = QName::namespaced("urn:t", "myInt");
        let id = globals.reserve(Some(name.clone()));
        assert_eq!(globals.lookup_type(&name), Some(id));
        assert!(globals.expect(id).is_err());

        let int = globals.lookup_type(&xsd_name("int")).unwrap();
        let ty = SimpleType::restriction(&globals, int, &[], None).unwrap().with_name(name);
        globals.define(id, XsdType::Simple(ty.clone())).unwrap();
        assert!(globals.is_derived_from(id, int));
        assert!(globals.define(id, XsdType::Simple(ty)).is_err());
    }
}

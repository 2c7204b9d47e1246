//! XSD Schema
//!
//! A compiled [`Schema`] is immutable and cheap to clone: all components
//! live in one [`XsdGlobals`] registry behind an `Arc`, so a schema can be
//! shared between threads and used by any number of concurrent decode and
//! encode calls. Every call builds its own [`ValidationContext`] from the
//! [`DecodeOptions`] it receives.

use std::path::Path;
use std::sync::Arc;

use crate::documents::Element;
use crate::error::{Error, Result, ValidationError};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};

use super::decoding::{decode_element, decode_untyped};
use super::elements::ElementDecl;
use super::encoding::{encode_element, encode_untyped};
use super::globals::{TypeId, XsdGlobals, XsdType};
use super::open_content::DefaultOpenContent;
use super::validation::{DecodeOptions, ValidationContext};
use super::values::NativeValue;

pub use super::builders::SchemaBuilder;

/// Result of a decode or encode call: the best-effort value and the errors
/// collected on the way (always empty in strict mode)
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// Converted value; `None` when the whole unit was dropped
    pub value: Option<T>,
    /// Collected errors in detection order
    pub errors: Vec<ValidationError>,
}

impl<T> Decoded<T> {
    fn from_context(value: Option<T>, ctx: ValidationContext) -> Self {
        Self {
            value,
            errors: ctx.into_errors(),
        }
    }

    /// True if no error was collected
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
struct SchemaInner {
    target_namespace: Option<String>,
    namespaces: NamespaceContext,
    globals: XsdGlobals,
    default_open_content: Option<DefaultOpenContent>,
    limits: Limits,
}

/// A compiled XML schema
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    pub(crate) fn new(
        target_namespace: Option<String>,
        namespaces: NamespaceContext,
        globals: XsdGlobals,
        default_open_content: Option<DefaultOpenContent>,
        limits: Limits,
    ) -> Self {
        Self {
            inner: Arc::new(SchemaInner {
                target_namespace,
                namespaces,
                globals,
                default_open_content,
                limits,
            }),
        }
    }

    /// Start a programmatic schema definition
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Compile a schema from XSD text
    pub fn from_xsd(text: &str) -> Result<Self> {
        super::parsing::parse_schema(text, &Limits::default())
    }

    /// Compile a schema from XSD text with custom limits
    pub fn from_xsd_with_limits(text: &str, limits: &Limits) -> Result<Self> {
        super::parsing::parse_schema(text, limits)
    }

    /// Load and compile an XSD file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading schema");
        Self::from_xsd(&text)
    }

    /// Target namespace
    pub fn target_namespace(&self) -> Option<&str> {
        self.inner.target_namespace.as_deref()
    }

    /// Prefixes declared by the schema document
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.inner.namespaces
    }

    /// The component registry
    pub fn globals(&self) -> &XsdGlobals {
        &self.inner.globals
    }

    /// Schema-wide default open content
    pub fn default_open_content(&self) -> Option<&DefaultOpenContent> {
        self.inner.default_open_content.as_ref()
    }

    /// Limits the schema was compiled with
    pub fn limits(&self) -> &Limits {
        &self.inner.limits
    }

    /// Lookup a type by name
    pub fn lookup_type(&self, name: &QName) -> Option<TypeId> {
        self.inner.globals.lookup_type(name)
    }

    /// Get a type by id
    pub fn get_type(&self, id: TypeId) -> Option<&XsdType> {
        self.inner.globals.get(id)
    }

    /// Lookup a global element
    pub fn element(&self, name: &QName) -> Option<&ElementDecl> {
        self.inner.globals.element(name)
    }

    /// Global elements in declaration order
    pub fn elements(&self) -> impl Iterator<Item = &ElementDecl> {
        self.inner.globals.iter_elements()
    }

    /// A name in the target namespace
    pub fn qname(&self, local: &str) -> QName {
        QName::new(self.inner.target_namespace.clone(), local)
    }

    fn type_named(&self, name: &QName) -> Result<TypeId> {
        self.lookup_type(name)
            .ok_or_else(|| Error::Value(format!("unknown type {}", name)))
    }

    /// Decode an element whose name is a global element of the schema
    pub fn decode(&self, elem: &Element, options: &DecodeOptions) -> Result<Decoded<NativeValue>> {
        let mut ctx = ValidationContext::new(options);
        tracing::debug!(root = %elem.name, mode = %options.mode, "decoding");
        let value = match self.element(&elem.name) {
            Some(decl) => decode_element(&self.inner.globals, elem, decl, &mut ctx)?,
            None => {
                ctx.raise_or_collect(
                    ValidationError::new(format!("{} is not a global element of the schema", elem.name))
                        .with_path(format!("/{}", elem.local_name())),
                )?;
                (!ctx.checks()).then(|| decode_untyped(elem))
            }
        };
        Ok(Decoded::from_context(value, ctx))
    }

    /// Parse XML text and decode its root element
    pub fn decode_str(&self, xml: &str, options: &DecodeOptions) -> Result<Decoded<NativeValue>> {
        let elem = Element::parse(xml)?;
        self.decode(&elem, options)
    }

    /// Decode an element against a named type instead of a global declaration
    pub fn decode_as(&self, elem: &Element, type_name: &QName, options: &DecodeOptions) -> Result<Decoded<NativeValue>> {
        let decl = ElementDecl::new(elem.name.clone(), self.type_named(type_name)?);
        let mut ctx = ValidationContext::new(options);
        let value = decode_element(&self.inner.globals, elem, &decl, &mut ctx)?;
        Ok(Decoded::from_context(value, ctx))
    }

    /// Decode text with a named simple type
    pub fn decode_text(&self, text: &str, type_name: &QName, options: &DecodeOptions) -> Result<Decoded<NativeValue>> {
        let simple = self.inner.globals.expect_simple(self.type_named(type_name)?)?;
        let mut ctx = ValidationContext::new(options);
        let value = simple.decode(&self.inner.globals, text, Some(&self.inner.namespaces), &mut ctx)?;
        Ok(Decoded::from_context(value, ctx))
    }

    /// Encode a value as the global element `name`
    pub fn encode(&self, value: &NativeValue, name: &QName, options: &DecodeOptions) -> Result<Decoded<Element>> {
        let mut ctx = ValidationContext::new(options);
        tracing::debug!(root = %name, mode = %options.mode, "encoding");
        let elem = match self.element(name) {
            Some(decl) => encode_element(&self.inner.globals, value, decl, Some(&self.inner.namespaces), &mut ctx)?,
            None => {
                ctx.raise_or_collect(ValidationError::new(format!(
                    "{} is not a global element of the schema",
                    name
                )))?;
                (!ctx.checks()).then(|| encode_untyped(name, value))
            }
        };
        Ok(Decoded::from_context(elem, ctx))
    }

    /// Encode a value as an element `name` of a named type
    pub fn encode_as(
        &self,
        value: &NativeValue,
        name: &QName,
        type_name: &QName,
        options: &DecodeOptions,
    ) -> Result<Decoded<Element>> {
        let decl = ElementDecl::new(name.clone(), self.type_named(type_name)?);
        let mut ctx = ValidationContext::new(options);
        let elem = encode_element(&self.inner.globals, value, &decl, Some(&self.inner.namespaces), &mut ctx)?;
        Ok(Decoded::from_context(elem, ctx))
    }

    /// Encode a value to text with a named simple type
    pub fn encode_text(&self, value: &NativeValue, type_name: &QName, options: &DecodeOptions) -> Result<Decoded<String>> {
        let simple = self.inner.globals.expect_simple(self.type_named(type_name)?)?;
        let mut ctx = ValidationContext::new(options);
        let text = simple.encode(&self.inner.globals, value, Some(&self.inner.namespaces), &mut ctx)?;
        Ok(Decoded::from_context(text, ctx))
    }

    /// Validate an element, failing on the first violation
    pub fn validate(&self, elem: &Element) -> Result<()> {
        self.decode(elem, &DecodeOptions::strict().with_limits(self.inner.limits.clone()))
            .map(|_| ())
    }

    /// True if the element is valid
    pub fn is_valid(&self, elem: &Element) -> bool {
        self.validate(elem).is_ok()
    }

    /// All the violations of an element, in document order
    ///
    /// A failure that lax mode cannot record (a coercion error or an
    /// exceeded limit) ends the sequence as a final entry.
    pub fn iter_errors(&self, elem: &Element) -> impl Iterator<Item = ValidationError> {
        let options = DecodeOptions::lax().with_limits(self.inner.limits.clone());
        let mut ctx = ValidationContext::new(&options);
        let outcome = match self.element(&elem.name) {
            Some(decl) => decode_element(&self.inner.globals, elem, decl, &mut ctx).map(|_| ()),
            None => ctx.raise_or_collect(ValidationError::new(format!(
                "{} is not a global element of the schema",
                elem.name
            ))),
        };
        let mut errors = ctx.into_errors();
        match outcome {
            Ok(()) => {}
            Err(Error::Validation(e)) => errors.push(e),
            Err(Error::Coercion(e)) => errors.push(e.into()),
            Err(other) => errors.push(ValidationError::new(other.to_string())),
        }
        errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::builders::{ComplexTypeDef, ElementDef, ParticleDef, TypeRef};
    use crate::validators::builtins::XsdValue;
    use pretty_assertions::assert_eq;

    fn assert_send_sync<T: Send + Sync>() {}

    fn schema() -> Schema {
        let mut builder = Schema::builder().target_namespace("urn:t");
        let item = builder.qname("item");
        let items = builder.qname("items");
        builder.add_element(ElementDef::new(
            items,
            TypeRef::anonymous(crate::validators::builders::TypeDef::Complex(ComplexTypeDef::with_particle(
                ParticleDef::sequence(vec![
                    ParticleDef::element(item, TypeRef::xsd("int")).occurs(crate::validators::particles::Occurs::zero_or_more())
                ]),
            ))),
        ));
        builder.build().unwrap()
    }

    #[test]
    fn test_schema_is_shareable() {
        assert_send_sync::<Schema>();
        let schema = schema();
        let clone = schema.clone();
        let handle = std::thread::spawn(move || clone.element(&clone.qname("items")).is_some());
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_decode_and_iter_errors() {
        let schema = schema();
        let xml = r#"<items xmlns="urn:t"><item>1</item><item>x</item><item>3</item></items>"#;
        let elem = Element::parse(xml).unwrap();
        assert!(!schema.is_valid(&elem));

        let lax = schema.decode(&elem, &DecodeOptions::lax()).unwrap();
        assert_eq!(lax.errors.len(), 1);
        let value = lax.value.unwrap();
        let items: Vec<_> = value.as_element().unwrap().children(&schema.qname("item")).collect();
        assert_eq!(items, vec![&NativeValue::from(XsdValue::Integer(1)), &NativeValue::from(XsdValue::Integer(3))]);

        assert_eq!(schema.iter_errors(&elem).count(), 1);
    }

    #[test]
    fn test_unknown_root() {
        let schema = schema();
        let elem = Element::parse("<other/>").unwrap();
        assert!(schema.validate(&elem).is_err());
        let skipped = schema.decode(&elem, &DecodeOptions::skip()).unwrap();
        assert_eq!(skipped.value, Some(NativeValue::from("")));
    }
}

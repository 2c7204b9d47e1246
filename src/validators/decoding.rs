//! Element decoding
//!
//! Walks an element tree against the declared types, converting attribute
//! values and simple content into native values and matching the children
//! against the compiled content model. Every violation goes through the
//! [`ValidationContext`], so the same walk serves strict validation, lax
//! best-effort decoding and skip-mode conversion.

use crate::documents::Element;
use crate::error::{Result, ValidationError};
use crate::namespaces::{NamespaceContext, QName};

use super::complex_types::{ComplexType, ContentType};
use super::elements::ElementDecl;
use super::globals::{TypeId, XsdGlobals, XsdType};
use super::models::{ContentModel, ModelMatch};
use super::validation::ValidationContext;
use super::values::{ContentItem, ElementData, NativeValue};
use super::wildcards::{ProcessContents, Wildcard};

/// Local name of the `xsi:type` attribute
pub const XSI_TYPE: &str = "type";
/// Local name of the `xsi:nil` attribute
pub const XSI_NIL: &str = "nil";

pub(crate) fn xsi_name(local: &str) -> QName {
    QName::namespaced(crate::XSI_NAMESPACE, local)
}

pub(crate) fn is_true(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

/// Resolve an `xsi:type` value against the declared type of an element
///
/// Returns the declared type when the attribute is absent or unusable (after
/// reporting the problem).
pub(crate) fn resolve_xsi_type(
    globals: &XsdGlobals,
    declared: TypeId,
    value: Option<&str>,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<TypeId> {
    let value = match value {
        Some(v) => v.trim(),
        None => return Ok(declared),
    };
    let name = match namespaces {
        Some(ns) => ns.resolve(value).ok(),
        None => QName::from_clark(value).ok(),
    };
    let id = match name.as_ref().and_then(|n| globals.lookup_type(n)) {
        Some(id) => id,
        None => {
            ctx.raise_or_collect(
                ValidationError::new(format!("unknown type '{}' in xsi:type", value)).with_instance(value),
            )?;
            return Ok(declared);
        }
    };
    if !globals.is_derived_from(id, declared) {
        ctx.raise_or_collect(
            ValidationError::new(format!(
                "xsi:type {} is not derived from the declared type {}",
                globals.display_name(id),
                globals.display_name(declared)
            ))
            .with_instance(value),
        )?;
        return Ok(declared);
    }
    Ok(id)
}

/// Decode an element with its declaration
///
/// `Ok(None)` means the element was dropped by lax validation.
pub fn decode_element(
    globals: &XsdGlobals,
    elem: &Element,
    decl: &ElementDecl,
    ctx: &mut ValidationContext,
) -> Result<Option<NativeValue>> {
    ctx.enter(elem.local_name())?;
    let result = decode_declared(globals, elem, decl, ctx);
    ctx.leave();
    result
}

fn decode_declared(
    globals: &XsdGlobals,
    elem: &Element,
    decl: &ElementDecl,
    ctx: &mut ValidationContext,
) -> Result<Option<NativeValue>> {
    ctx.limits().check_attributes(elem.attributes.len())?;
    let xsi_type = elem.get_attribute(&xsi_name(XSI_TYPE));
    if decl.abstract_ && xsi_type.is_none() {
        ctx.raise_or_collect(
            ValidationError::new(format!("element {} is abstract", decl.name))
                .with_schema_component(decl.name.to_string()),
        )?;
    }
    let type_id = resolve_xsi_type(globals, decl.type_id, xsi_type, Some(&elem.namespaces), ctx)?;

    if let Some(nil) = elem.get_attribute(&xsi_name(XSI_NIL)) {
        if is_true(nil) {
            return decode_nilled(globals, elem, decl, type_id, ctx);
        }
    }

    match globals.expect(type_id)? {
        XsdType::Simple(_) => decode_simple_element(globals, elem, decl, type_id, ctx),
        XsdType::Complex(ct) => {
            if ct.abstract_ {
                ctx.raise_or_collect(
                    ValidationError::new(format!("type {} is abstract", ct.display_name()))
                        .with_schema_component(decl.name.to_string()),
                )?;
            }
            decode_complex(globals, elem, decl, ct, ctx).map(|data| data.map(NativeValue::Element))
        }
    }
}

fn decode_nilled(
    globals: &XsdGlobals,
    elem: &Element,
    decl: &ElementDecl,
    type_id: TypeId,
    ctx: &mut ValidationContext,
) -> Result<Option<NativeValue>> {
    if !decl.nillable {
        ctx.raise_or_collect(
            ValidationError::new(format!("element {} is not nillable", decl.name))
                .with_reason("xsi:nil='true' used on a non-nillable element"),
        )?;
    } else if !elem.children.is_empty() || elem.has_character_data() {
        ctx.raise_or_collect(ValidationError::new(format!("nilled element {} must be empty", decl.name)))?;
    } else if decl.fixed.is_some() {
        ctx.raise_or_collect(ValidationError::new(format!(
            "element {} has a fixed value and cannot be nilled",
            decl.name
        )))?;
    }
    let mut data = ElementData::default();
    if let Some(ct) = globals.complex(type_id) {
        data.attributes = ct.attributes.decode(globals, &elem.attributes, Some(&elem.namespaces), ctx)?;
    }
    Ok(Some(NativeValue::Element(data)))
}

fn decode_simple_element(
    globals: &XsdGlobals,
    elem: &Element,
    decl: &ElementDecl,
    type_id: TypeId,
    ctx: &mut ValidationContext,
) -> Result<Option<NativeValue>> {
    if !elem.children.is_empty() {
        ctx.raise_or_collect(ValidationError::new(format!(
            "element {} has a simple type and cannot contain child elements",
            decl.name
        )))?;
    }
    for name in elem.attributes.keys() {
        if !name.is_in(Some(crate::XSI_NAMESPACE)) {
            ctx.raise_or_collect(
                ValidationError::new(format!("attribute {} is not allowed", name))
                    .with_reason("an element with a simple type has no attributes"),
            )?;
        }
    }
    decode_simple_content(globals, elem, decl, type_id, ctx)
}

/// Decode text content with a simple type, honouring default and fixed values
fn decode_simple_content(
    globals: &XsdGlobals,
    elem: &Element,
    decl: &ElementDecl,
    type_id: TypeId,
    ctx: &mut ValidationContext,
) -> Result<Option<NativeValue>> {
    let simple = globals.expect_simple(type_id)?;
    let namespaces = Some(&elem.namespaces);
    let text = elem.text_content();
    let text = match decl.value_constraint() {
        Some(constraint) if text.is_empty() => constraint.to_string(),
        _ => text,
    };
    let value = match simple.decode(globals, &text, namespaces, ctx)? {
        Some(value) => value,
        None => return Ok(None),
    };
    if let (Some(fixed), true) = (decl.fixed.as_deref(), ctx.checks()) {
        let mut trial = ctx.trial();
        let expected = simple.decode(globals, fixed, namespaces, &mut trial).ok().flatten();
        if expected.as_ref() != Some(&value) {
            ctx.raise_or_collect(
                ValidationError::new(format!("value of element {} must be the fixed value '{}'", decl.name, fixed))
                    .with_instance(text),
            )?;
            return Ok(None);
        }
    }
    Ok(Some(value))
}

fn decode_complex(
    globals: &XsdGlobals,
    elem: &Element,
    decl: &ElementDecl,
    ct: &ComplexType,
    ctx: &mut ValidationContext,
) -> Result<Option<ElementData>> {
    let mut data = ElementData {
        attributes: ct.attributes.decode(globals, &elem.attributes, Some(&elem.namespaces), ctx)?,
        ..ElementData::default()
    };
    match &ct.content {
        ContentType::Empty => {
            if !elem.children.is_empty() || elem.has_character_data() {
                ctx.raise_or_collect(
                    ValidationError::new(format!("element {} must be empty", elem.name))
                        .with_schema_component(ct.display_name()),
                )?;
            }
        }
        ContentType::Simple(simple) => {
            if !elem.children.is_empty() {
                ctx.raise_or_collect(
                    ValidationError::new(format!("element {} has simple content and cannot contain child elements", elem.name))
                        .with_schema_component(ct.display_name()),
                )?;
            }
            data.value = decode_simple_content(globals, elem, decl, *simple, ctx)?.map(Box::new);
        }
        ContentType::ElementOnly(model) | ContentType::Mixed(model) => {
            decode_model(globals, elem, ct, model, &mut data, ctx)?;
        }
    }
    Ok(Some(data))
}

fn decode_model(
    globals: &XsdGlobals,
    elem: &Element,
    ct: &ComplexType,
    model: &ContentModel,
    data: &mut ElementData,
    ctx: &mut ValidationContext,
) -> Result<()> {
    let mixed = ct.is_mixed();
    if !mixed && ctx.checks() && elem.has_character_data() {
        ctx.raise_or_collect(
            ValidationError::new(format!("character data is not allowed in element-only content of {}", elem.name))
                .with_schema_component(ct.display_name()),
        )?;
    }
    let keep_text = mixed || !ctx.checks();
    push_text(data, elem.text.as_deref(), keep_text);

    let mut visitor = model.visitor(globals);
    for (index, child) in elem.children.iter().enumerate() {
        let decoded = match visitor.consume(&child.name) {
            Some(ModelMatch::Element(particle)) => match particle.decl(globals) {
                Some(child_decl) => decode_element(globals, child, child_decl, ctx)?,
                None => {
                    ctx.raise_or_collect(ValidationError::new(format!(
                        "no declaration found for element {}",
                        particle.name
                    )))?;
                    None
                }
            },
            Some(ModelMatch::Wildcard(wildcard)) | Some(ModelMatch::OpenContent(wildcard)) => {
                decode_wildcard_child(globals, wildcard, child, ctx)?
            }
            None => {
                let expected = visitor.expected();
                let mut error = ValidationError::new(format!("unexpected child element {} at position {}", child.name, index + 1))
                    .with_schema_component(ct.display_name());
                if !expected.is_empty() {
                    error = error.with_reason(format!("expected one of: {}", expected.join(", ")));
                }
                ctx.raise_or_collect(error)?;
                if ctx.checks() {
                    None
                } else {
                    Some(decode_untyped(child))
                }
            }
        };
        if let Some(value) = decoded {
            data.push_child(child.name.clone(), value);
        }
        push_text(data, child.tail.as_deref(), keep_text);
    }

    if !visitor.is_complete() {
        let expected = visitor.expected();
        let error = ValidationError::new(format!("the content of element {} is not complete", elem.name))
            .with_schema_component(ct.display_name())
            .with_reason(format!("missing: {}", expected.join(", ")));
        ctx.raise_or_collect(error)?;
    }
    Ok(())
}

fn push_text(data: &mut ElementData, text: Option<&str>, keep: bool) {
    if let Some(text) = text.filter(|t| keep && !t.trim().is_empty()) {
        data.content.push(ContentItem::Text(text.to_string()));
    }
}

/// Decode a child matched by a wildcard, following its `processContents`
pub(crate) fn decode_wildcard_child(
    globals: &XsdGlobals,
    wildcard: &Wildcard,
    child: &Element,
    ctx: &mut ValidationContext,
) -> Result<Option<NativeValue>> {
    if wildcard.process_contents == ProcessContents::Skip || !ctx.checks() {
        return Ok(Some(decode_untyped(child)));
    }
    if let Some(decl) = globals.element(&child.name) {
        return decode_element(globals, child, decl, ctx);
    }
    if let Some(xsi_type) = child.get_attribute(&xsi_name(XSI_TYPE)) {
        let type_id = resolve_xsi_type(globals, globals.any_type(), Some(xsi_type), Some(&child.namespaces), ctx)?;
        if type_id != globals.any_type() {
            let decl = ElementDecl::new(child.name.clone(), type_id);
            return decode_element(globals, child, &decl, ctx);
        }
    }
    match wildcard.process_contents {
        ProcessContents::Strict => {
            ctx.raise_or_collect(
                ValidationError::new(format!(
                    "no global declaration for element {} matched by a strict wildcard",
                    child.name
                ))
                .with_reason(format!("wildcard {}", wildcard)),
            )?;
            Ok(None)
        }
        _ => Ok(Some(decode_untyped(child))),
    }
}

/// Convert an element without any type information
///
/// A leaf element without attributes becomes its text; anything else keeps
/// its attributes, text and children as strings.
pub fn decode_untyped(elem: &Element) -> NativeValue {
    if elem.children.is_empty() && elem.attributes.is_empty() {
        return NativeValue::from(elem.text.clone().unwrap_or_default());
    }
    let mut data = ElementData::default();
    for (name, value) in &elem.attributes {
        data.attributes.insert(name.clone(), NativeValue::from(value.as_str()));
    }
    if elem.children.is_empty() {
        data.value = elem.text.as_deref().map(|t| Box::new(NativeValue::from(t)));
        return NativeValue::Element(data);
    }
    push_text(&mut data, elem.text.as_deref(), true);
    for child in &elem.children {
        data.push_child(child.name.clone(), decode_untyped(child));
        push_text(&mut data, child.tail.as_deref(), true);
    }
    NativeValue::Element(data)
}

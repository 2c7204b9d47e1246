//! Element encoding
//!
//! The inverse walk of [`super::decoding`]: a native value is matched
//! against the declared type and rebuilt as an element tree. Child entries
//! are fed to the same content-model visitor that decoding uses, in order.

use indexmap::IndexMap;

use crate::documents::Element;
use crate::error::{CoercionError, Result, ValidationError};
use crate::namespaces::{NamespaceContext, QName};

use super::complex_types::{ComplexType, ContentType};
use super::decoding::{is_true, resolve_xsi_type, xsi_name, XSI_NIL, XSI_TYPE};
use super::elements::ElementDecl;
use super::globals::{TypeId, XsdGlobals, XsdType};
use super::models::ModelMatch;
use super::validation::ValidationContext;
use super::values::{ContentItem, ElementData, NativeValue};
use super::wildcards::{ProcessContents, Wildcard};

/// Encode a native value as an element of the given declaration
///
/// `Ok(None)` means the value was dropped by lax validation.
pub fn encode_element(
    globals: &XsdGlobals,
    value: &NativeValue,
    decl: &ElementDecl,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<Option<Element>> {
    ctx.enter(decl.name.local_name.clone())?;
    let result = encode_declared(globals, value, decl, namespaces, ctx);
    ctx.leave();
    result
}

fn xsi_attribute(value: &NativeValue, local: &str) -> Option<String> {
    value
        .as_element()
        .and_then(|data| data.attribute(&xsi_name(local)))
        .map(NativeValue::to_text)
}

fn encode_declared(
    globals: &XsdGlobals,
    value: &NativeValue,
    decl: &ElementDecl,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<Option<Element>> {
    let xsi_type = xsi_attribute(value, XSI_TYPE);
    let type_id = resolve_xsi_type(globals, decl.type_id, xsi_type.as_deref(), namespaces, ctx)?;
    if decl.abstract_ && xsi_type.is_none() {
        ctx.raise_or_collect(ValidationError::new(format!("element {} is abstract", decl.name)))?;
    }

    if xsi_attribute(value, XSI_NIL).as_deref().map_or(false, is_true) {
        if !decl.nillable {
            ctx.raise_or_collect(ValidationError::new(format!("element {} is not nillable", decl.name)))?;
        }
        let mut elem = Element::new(decl.name.clone());
        if let Some(data) = value.as_element() {
            elem.attributes = match globals.complex(type_id) {
                Some(ct) => ct.attributes.encode(globals, &data.attributes, namespaces, ctx)?,
                None => xsi_only(&data.attributes),
            };
        }
        return Ok(Some(elem));
    }

    match globals.expect(type_id)? {
        XsdType::Simple(_) => encode_simple_element(globals, value, decl, type_id, namespaces, ctx),
        XsdType::Complex(ct) => encode_complex(globals, value, decl, ct, namespaces, ctx),
    }
}

fn xsi_only(attributes: &IndexMap<QName, NativeValue>) -> IndexMap<QName, String> {
    attributes
        .iter()
        .filter(|(name, _)| name.is_in(Some(crate::XSI_NAMESPACE)))
        .map(|(name, value)| (name.clone(), value.to_text()))
        .collect()
}

fn encode_simple_element(
    globals: &XsdGlobals,
    value: &NativeValue,
    decl: &ElementDecl,
    type_id: TypeId,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<Option<Element>> {
    let mut elem = Element::new(decl.name.clone());
    let simple_value = match value {
        NativeValue::Element(data) => {
            for name in data.attributes.keys().filter(|n| !n.is_in(Some(crate::XSI_NAMESPACE))) {
                ctx.raise_or_collect(
                    ValidationError::new(format!("attribute {} is not allowed", name))
                        .with_reason("an element with a simple type has no attributes"),
                )?;
            }
            elem.attributes = xsi_only(&data.attributes);
            if !data.content.is_empty() {
                ctx.raise_or_collect(ValidationError::new(format!(
                    "element {} has a simple type and cannot contain child elements",
                    decl.name
                )))?;
            }
            data.value.as_deref()
        }
        other => Some(other),
    };
    match encode_simple_content(globals, simple_value, decl, type_id, namespaces, ctx)? {
        Some(text) => {
            if !text.is_empty() {
                elem.set_text(text);
            }
            Ok(Some(elem))
        }
        None => Ok(None),
    }
}

fn encode_simple_content(
    globals: &XsdGlobals,
    value: Option<&NativeValue>,
    decl: &ElementDecl,
    type_id: TypeId,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<Option<String>> {
    let simple = globals.expect_simple(type_id)?;
    let value = match value {
        Some(value) => value,
        None => {
            return Ok(Some(decl.value_constraint().map(str::to_string).unwrap_or_default()));
        }
    };
    let text = match simple.encode(globals, value, namespaces, ctx)? {
        Some(text) => text,
        None => return Ok(None),
    };
    if let (Some(fixed), true) = (decl.fixed.as_deref(), ctx.checks()) {
        let mut trial = ctx.trial();
        let expected = simple.decode(globals, fixed, namespaces, &mut trial).ok().flatten();
        let actual = simple.decode(globals, &text, namespaces, &mut trial).ok().flatten();
        if expected.is_none() || expected != actual {
            ctx.raise_or_collect(
                ValidationError::new(format!("value of element {} must be the fixed value '{}'", decl.name, fixed))
                    .with_instance(text),
            )?;
            return Ok(None);
        }
    }
    Ok(Some(text))
}

fn encode_complex(
    globals: &XsdGlobals,
    value: &NativeValue,
    decl: &ElementDecl,
    ct: &ComplexType,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<Option<Element>> {
    let wrapped;
    let data = match value {
        NativeValue::Element(data) => data,
        other if matches!(ct.content, ContentType::Simple(_)) || other.to_text().is_empty() => {
            wrapped = ElementData::with_value(other.clone());
            &wrapped
        }
        other => {
            let error = CoercionError::new(
                format!("element {} needs a structured value", decl.name),
                ct.display_name(),
            )
            .with_value(other.to_text());
            ctx.coercion_failed(error, false)?;
            return Ok(Some(encode_untyped(&decl.name, other)));
        }
    };

    let mut elem = Element::new(decl.name.clone());
    elem.attributes = ct.attributes.encode(globals, &data.attributes, namespaces, ctx)?;

    match &ct.content {
        ContentType::Empty => {
            if !data.content.is_empty() || data.value.as_ref().map_or(false, |v| !v.to_text().is_empty()) {
                ctx.raise_or_collect(
                    ValidationError::new(format!("element {} must be empty", decl.name))
                        .with_schema_component(ct.display_name()),
                )?;
            }
        }
        ContentType::Simple(simple) => {
            if !data.content.is_empty() {
                ctx.raise_or_collect(
                    ValidationError::new(format!("element {} has simple content and cannot contain child elements", decl.name))
                        .with_schema_component(ct.display_name()),
                )?;
            }
            match encode_simple_content(globals, data.value.as_deref(), decl, *simple, namespaces, ctx)? {
                Some(text) if !text.is_empty() => elem.set_text(text),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        ContentType::ElementOnly(model) | ContentType::Mixed(model) => {
            let mixed = ct.is_mixed();
            let mut visitor = model.visitor(globals);
            for item in &data.content {
                match item {
                    ContentItem::Text(text) => {
                        if !mixed && ctx.checks() && !text.trim().is_empty() {
                            ctx.raise_or_collect(
                                ValidationError::new(format!(
                                    "character data is not allowed in element-only content of {}",
                                    decl.name
                                ))
                                .with_instance(text.clone()),
                            )?;
                            continue;
                        }
                        append_text(&mut elem, text);
                    }
                    ContentItem::Element(name, child_value) => {
                        let child = match visitor.consume(name) {
                            Some(ModelMatch::Element(particle)) => match particle.decl(globals) {
                                Some(child_decl) => encode_element(globals, child_value, child_decl, namespaces, ctx)?,
                                None => {
                                    ctx.raise_or_collect(ValidationError::new(format!(
                                        "no declaration found for element {}",
                                        particle.name
                                    )))?;
                                    None
                                }
                            },
                            Some(ModelMatch::Wildcard(wildcard)) | Some(ModelMatch::OpenContent(wildcard)) => {
                                encode_wildcard_child(globals, wildcard, name, child_value, namespaces, ctx)?
                            }
                            None => {
                                let expected = visitor.expected();
                                let mut error = ValidationError::new(format!("unexpected child element {}", name))
                                    .with_schema_component(ct.display_name());
                                if !expected.is_empty() {
                                    error = error.with_reason(format!("expected one of: {}", expected.join(", ")));
                                }
                                ctx.raise_or_collect(error)?;
                                if ctx.checks() {
                                    None
                                } else {
                                    Some(encode_untyped(name, child_value))
                                }
                            }
                        };
                        if let Some(child) = child {
                            elem.add_child(child);
                        }
                    }
                }
            }
            if !visitor.is_complete() {
                let error = ValidationError::new(format!("the content of element {} is not complete", decl.name))
                    .with_schema_component(ct.display_name())
                    .with_reason(format!("missing: {}", visitor.expected().join(", ")));
                ctx.raise_or_collect(error)?;
            }
        }
    }
    Ok(Some(elem))
}

fn append_text(elem: &mut Element, text: &str) {
    let slot = match elem.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut elem.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

fn encode_wildcard_child(
    globals: &XsdGlobals,
    wildcard: &Wildcard,
    name: &QName,
    value: &NativeValue,
    namespaces: Option<&NamespaceContext>,
    ctx: &mut ValidationContext,
) -> Result<Option<Element>> {
    if wildcard.process_contents == ProcessContents::Skip || !ctx.checks() {
        return Ok(Some(encode_untyped(name, value)));
    }
    if let Some(decl) = globals.element(name) {
        return encode_element(globals, value, decl, namespaces, ctx);
    }
    match wildcard.process_contents {
        ProcessContents::Strict => {
            ctx.raise_or_collect(ValidationError::new(format!(
                "no global declaration for element {} matched by a strict wildcard",
                name
            )))?;
            Ok(None)
        }
        _ => Ok(Some(encode_untyped(name, value))),
    }
}

/// Build an element from a native value without type information
pub fn encode_untyped(name: &QName, value: &NativeValue) -> Element {
    let mut elem = Element::new(name.clone());
    match value {
        NativeValue::Element(data) => {
            for (attr, v) in &data.attributes {
                elem.attributes.insert(attr.clone(), v.to_text());
            }
            if let Some(v) = &data.value {
                elem.set_text(v.to_text());
            }
            for item in &data.content {
                match item {
                    ContentItem::Element(child_name, child_value) => {
                        elem.add_child(encode_untyped(child_name, child_value))
                    }
                    ContentItem::Text(text) => append_text(&mut elem, text),
                }
            }
        }
        other => {
            let text = other.to_text();
            if !text.is_empty() {
                elem.set_text(text);
            }
        }
    }
    elem
}

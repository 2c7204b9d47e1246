//! XML Schema Converters
//!
//! Conversion between decoded values and JSON, following the default
//! xmlschema convention:
//! - attributes are keys prefixed with `@`
//! - simple content and mixed text go under `$`
//! - child elements become object properties, repeated children become arrays
//!
//! [`from_json`] is untyped: it only rebuilds the value shape. Atomic values
//! are matched against the schema types when the result is encoded.

mod base;

pub use base::ConverterConfig;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value as JsonValue};

use crate::validators::builtins::XsdValue;
use crate::validators::values::{ContentItem, ElementData, NativeValue};

/// Convert a decoded value to JSON
pub fn to_json(value: &NativeValue, config: &ConverterConfig) -> JsonValue {
    match value {
        NativeValue::Atomic(v) => atomic_to_json(v),
        NativeValue::List(items) => JsonValue::Array(items.iter().map(|v| to_json(v, config)).collect()),
        NativeValue::Element(data) => element_to_json(data, config),
    }
}

fn atomic_to_json(value: &XsdValue) -> JsonValue {
    match value {
        XsdValue::Boolean(b) => JsonValue::Bool(*b),
        XsdValue::Integer(i) => integer_to_json(*i),
        XsdValue::Decimal(d) => d
            .to_string()
            .parse::<Number>()
            .map(JsonValue::Number)
            .unwrap_or_else(|_| JsonValue::String(d.to_string())),
        XsdValue::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(value.to_string())),
        other => JsonValue::String(other.to_string()),
    }
}

fn integer_to_json(i: i128) -> JsonValue {
    if let Ok(v) = i64::try_from(i) {
        JsonValue::from(v)
    } else if let Ok(v) = u64::try_from(i) {
        JsonValue::from(v)
    } else {
        JsonValue::String(i.to_string())
    }
}

fn element_to_json(data: &ElementData, config: &ConverterConfig) -> JsonValue {
    if data.attributes.is_empty() && data.content.is_empty() {
        return data
            .value
            .as_deref()
            .map_or(JsonValue::Null, |v| to_json(v, config));
    }

    let mut map = Map::new();
    for (name, value) in &data.attributes {
        let key = format!("{}{}", config.attr_prefix(), config.attribute_key(name));
        map.insert(key, to_json(value, config));
    }

    let mut text = String::new();
    let mut children: IndexMap<String, Vec<JsonValue>> = IndexMap::new();
    for item in &data.content {
        match item {
            ContentItem::Element(name, value) => children
                .entry(config.element_key(name))
                .or_default()
                .push(to_json(value, config)),
            ContentItem::Text(fragment) => text.push_str(fragment),
        }
    }

    if let Some(value) = data.value.as_deref() {
        map.insert(config.text_key().to_string(), to_json(value, config));
    } else if !text.trim().is_empty() {
        map.insert(config.text_key().to_string(), JsonValue::String(text));
    }

    for (key, mut values) in children {
        let value = if values.len() == 1 && !config.force_list() {
            values.remove(0)
        } else {
            JsonValue::Array(values)
        };
        map.insert(key, value);
    }
    JsonValue::Object(map)
}

/// Rebuild an untyped value from JSON
///
/// Objects become elements, arrays under an element key become repeated
/// children and any other array becomes a list value.
pub fn from_json(value: &JsonValue, config: &ConverterConfig) -> NativeValue {
    match value {
        JsonValue::Null => NativeValue::empty_element(),
        JsonValue::Bool(b) => NativeValue::from(*b),
        JsonValue::Number(n) => number_from_json(n),
        JsonValue::String(s) => NativeValue::from(s.as_str()),
        JsonValue::Array(items) => NativeValue::List(items.iter().map(|v| from_json(v, config)).collect()),
        JsonValue::Object(map) => NativeValue::Element(element_from_json(map, config)),
    }
}

fn number_from_json(n: &Number) -> NativeValue {
    if let Some(i) = n.as_i64() {
        return NativeValue::from(i);
    }
    if let Some(u) = n.as_u64() {
        return NativeValue::from(u);
    }
    match n.to_string().parse::<Decimal>() {
        Ok(d) => NativeValue::from(d),
        Err(_) => NativeValue::from(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn element_from_json(map: &Map<String, JsonValue>, config: &ConverterConfig) -> ElementData {
    let mut data = ElementData::default();
    for (key, value) in map {
        if key == config.text_key() {
            data.value = Some(Box::new(from_json(value, config)));
        } else if let Some(name) = key.strip_prefix(config.attr_prefix()).filter(|_| !config.attr_prefix().is_empty()) {
            data.attributes
                .insert(config.attribute_name(name), from_json(value, config));
        } else {
            let name = config.element_name(key);
            match value {
                JsonValue::Array(items) => {
                    for item in items {
                        data.push_child(name.clone(), from_json(item, config));
                    }
                }
                other => data.push_child(name, from_json(other, config)),
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::QName;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn order() -> NativeValue {
        let mut data = ElementData::default();
        data.attributes.insert(QName::local("id"), NativeValue::from(7i64));
        data.push_child(QName::local("item"), NativeValue::from("pen"));
        data.push_child(QName::local("item"), NativeValue::from("ink"));
        data.push_child(
            QName::local("total"),
            NativeValue::from("12.50".parse::<Decimal>().unwrap()),
        );
        data.push_child(QName::local("sizes"), NativeValue::List(vec![NativeValue::from(1i64), NativeValue::from(2i64)]));
        NativeValue::Element(data)
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&order(), &ConverterConfig::new());
        assert_eq!(
            json,
            json!({"@id": 7, "item": ["pen", "ink"], "total": 12.50, "sizes": [1, 2]})
        );
    }

    #[test]
    fn test_simple_content_and_force_list() {
        let mut data = ElementData::with_value(NativeValue::from("EUR"));
        data.attributes.insert(QName::local("rate"), NativeValue::from(true));
        let json = to_json(&NativeValue::Element(data), &ConverterConfig::new());
        assert_eq!(json, json!({"@rate": true, "$": "EUR"}));

        let mut data = ElementData::default();
        data.push_child(QName::local("a"), NativeValue::from(1i64));
        let config = ConverterConfig::new().with_force_list(true);
        assert_eq!(to_json(&NativeValue::Element(data), &config), json!({"a": [1]}));
    }

    #[test]
    fn test_from_json() {
        let config = ConverterConfig::new();
        let value = from_json(&json!({"@id": "7", "item": ["pen", "ink"], "total": 12.5}), &config);
        let data = value.as_element().unwrap();
        assert_eq!(data.attribute(&QName::local("id")), Some(&NativeValue::from("7")));
        let item = QName::local("item");
        assert_eq!(data.children(&item).count(), 2);
        assert_eq!(
            data.child(&QName::local("total")),
            Some(&NativeValue::from("12.5".parse::<Decimal>().unwrap()))
        );
        assert_eq!(from_json(&json!(null), &config), NativeValue::empty_element());
    }

    #[test]
    fn test_unsigned_long_range() {
        let config = ConverterConfig::new();
        let max = NativeValue::from(u64::MAX);
        assert_eq!(to_json(&max, &config), json!(18446744073709551615u64));
        assert_eq!(from_json(&json!(18446744073709551615u64), &config), max);
        assert_eq!(
            to_json(&NativeValue::from(i128::from(u64::MAX) + 1), &config),
            json!("18446744073709551616")
        );
    }
}

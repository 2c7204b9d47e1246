//! Decoding and encoding through the public API
//!
//! Schemas are read from XSD text, instances are parsed with
//! `Element::parse` and decoded in the three validation modes.

use pretty_assertions::assert_eq;
use xmlschema_core::{DecodeOptions, Element, Error, NativeValue, QName, Schema, XsdValue};

const TNS: &str = "urn:orders";

fn schema() -> Schema {
    Schema::from_xsd(&format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="{TNS}"
             targetNamespace="{TNS}" elementFormDefault="qualified">
  <xs:simpleType name="intList"><xs:list itemType="xs:int"/></xs:simpleType>
  <xs:simpleType name="flags"><xs:list itemType="xs:boolean"/></xs:simpleType>
  <xs:complexType name="item">
    <xs:sequence>
      <xs:element name="sku" type="xs:string"/>
      <xs:element name="qty" type="xs:positiveInteger"/>
      <xs:element name="price" type="xs:decimal" minOccurs="0"/>
    </xs:sequence>
    <xs:attribute name="gift" type="xs:boolean" default="false"/>
  </xs:complexType>
  <xs:complexType name="discountedItem">
    <xs:complexContent>
      <xs:extension base="tns:item">
        <xs:sequence><xs:element name="discount" type="xs:decimal"/></xs:sequence>
      </xs:extension>
    </xs:complexContent>
  </xs:complexType>
  <xs:element name="order">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="item" type="tns:item" maxOccurs="unbounded"/>
        <xs:element name="sizes" type="tns:intList" minOccurs="0"/>
        <xs:element name="note" type="xs:string" nillable="true" minOccurs="0"/>
      </xs:sequence>
      <xs:attribute name="id" type="xs:int" use="required"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#
    ))
    .unwrap()
}

fn q(local: &str) -> QName {
    QName::namespaced(TNS, local)
}

fn ints(values: &[i64]) -> NativeValue {
    NativeValue::List(values.iter().map(|v| NativeValue::from(*v)).collect())
}

#[test]
fn test_integer_list_in_three_modes() {
    let schema = schema();
    let strict = schema.decode_text("10 25 40", &q("intList"), &DecodeOptions::strict()).unwrap();
    assert_eq!(strict.value, Some(ints(&[10, 25, 40])));
    assert!(strict.is_valid());

    let err = schema
        .decode_text("10 25.0 40", &q("intList"), &DecodeOptions::strict())
        .unwrap_err();
    assert!(err.is_validation());

    let lax = schema.decode_text("10 25.0 40", &q("intList"), &DecodeOptions::lax()).unwrap();
    assert_eq!(lax.value, Some(ints(&[10, 40])));
    assert_eq!(lax.errors.len(), 1);
}

#[test]
fn test_boolean_list_encoding_in_three_modes() {
    let schema = schema();
    let value = NativeValue::List(vec![
        NativeValue::from(true),
        NativeValue::from(false),
        NativeValue::from(40.0),
    ]);

    let err = schema
        .encode_text(&value, &q("flags"), &DecodeOptions::strict())
        .unwrap_err();
    assert!(err.is_coercion());

    let lax = schema.encode_text(&value, &q("flags"), &DecodeOptions::lax()).unwrap();
    assert_eq!(lax.value.as_deref(), Some("true false"));
    assert_eq!(lax.errors.len(), 1);
    assert!(lax.errors[0].is_coercion());

    let skip = schema.encode_text(&value, &q("flags"), &DecodeOptions::skip()).unwrap();
    assert_eq!(skip.value.as_deref(), Some("true false 40.0"));
    assert!(skip.errors.is_empty());
}

const ORDER: &str = r#"<order xmlns="urn:orders" id="7">
  <item><sku>pen</sku><qty>2</qty><price>1.50</price></item>
  <item gift="true"><sku>ink</sku><qty>1</qty></item>
  <sizes>1 2 3</sizes>
</order>"#;

#[test]
fn test_decode_document() {
    let schema = schema();
    let decoded = schema.decode_str(ORDER, &DecodeOptions::strict()).unwrap();
    let value = decoded.value.unwrap();
    let order = value.as_element().unwrap();

    assert_eq!(order.attribute(&QName::local("id")), Some(&NativeValue::from(7i64)));
    let items: Vec<_> = order.children(&q("item")).collect();
    assert_eq!(items.len(), 2);

    let first = items[0].as_element().unwrap();
    assert_eq!(first.child(&q("sku")), Some(&NativeValue::from("pen")));
    assert_eq!(
        first.child(&q("price")).and_then(NativeValue::as_atomic),
        Some(&XsdValue::Decimal("1.50".parse().unwrap()))
    );
    // default attribute filled in
    assert_eq!(first.attribute(&QName::local("gift")), Some(&NativeValue::from(false)));
    assert_eq!(order.child(&q("sizes")), Some(&ints(&[1, 2, 3])));
}

#[test]
fn test_lax_collects_and_strict_fails() {
    let schema = schema();
    let xml = r#"<order xmlns="urn:orders" id="7">
      <item><sku>pen</sku><qty>0</qty></item>
    </order>"#;

    let err = schema.decode_str(xml, &DecodeOptions::strict()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let lax = schema.decode_str(xml, &DecodeOptions::lax()).unwrap();
    assert!(lax.value.is_some());
    assert!(!lax.errors.is_empty());
    assert_eq!(lax.errors[0].path.as_deref(), Some("/order/item/qty"));

    let elem = Element::parse(xml).unwrap();
    assert!(!schema.is_valid(&elem));
    assert_eq!(schema.iter_errors(&elem).count(), lax.errors.len());
}

#[test]
fn test_skip_mode_accepts_unknown_children() {
    let schema = schema();
    let xml = r#"<order xmlns="urn:orders" id="x"><unknown>1</unknown></order>"#;
    let skip = schema.decode_str(xml, &DecodeOptions::skip()).unwrap();
    assert!(skip.errors.is_empty());
    let value = skip.value.unwrap();
    assert_eq!(value.as_element().unwrap().child(&q("unknown")), Some(&NativeValue::from("1")));
}

#[test]
fn test_missing_required_attribute() {
    let schema = schema();
    let xml = r#"<order xmlns="urn:orders"><item><sku>a</sku><qty>1</qty></item></order>"#;
    assert!(schema.decode_str(xml, &DecodeOptions::strict()).is_err());
    let lax = schema.decode_str(xml, &DecodeOptions::lax()).unwrap();
    assert_eq!(lax.errors.len(), 1);
}

#[test]
fn test_xsi_type_and_nil() {
    let schema = schema();
    let xml = r#"<order xmlns="urn:orders" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                   xmlns:o="urn:orders" id="1">
      <item xsi:type="o:discountedItem"><sku>a</sku><qty>1</qty><discount>0.5</discount></item>
      <note xsi:nil="true"/>
    </order>"#;
    let decoded = schema.decode_str(xml, &DecodeOptions::strict()).unwrap();
    let value = decoded.value.unwrap();
    let item = value.as_element().unwrap().child(&q("item")).unwrap();
    assert!(item.as_element().unwrap().child(&q("discount")).is_some());

    // without xsi:type the extra child is rejected
    let plain = r#"<order xmlns="urn:orders" id="1">
      <item><sku>a</sku><qty>1</qty><discount>0.5</discount></item>
    </order>"#;
    assert!(schema.decode_str(plain, &DecodeOptions::strict()).is_err());
}

#[test]
fn test_encode_round_trip() {
    let schema = schema();
    let decoded = schema.decode_str(ORDER, &DecodeOptions::strict()).unwrap();
    let value = decoded.value.unwrap();

    let encoded = schema.encode(&value, &q("order"), &DecodeOptions::strict()).unwrap();
    let elem = encoded.value.unwrap();
    let again = schema.decode(&elem, &DecodeOptions::strict()).unwrap();
    assert_eq!(again.value, Some(value));

    let text = elem.to_xml_string().unwrap();
    let reparsed = Element::parse(&text).unwrap();
    assert!(schema.is_valid(&reparsed));
}

#[test]
fn test_integers_beyond_64_bits() {
    let schema = Schema::from_xsd(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="n">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="u" type="xs:unsignedLong"/>
                <xs:element name="i" type="xs:integer"/>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#,
    )
    .unwrap();

    let xml = "<n><u>18446744073709551615</u><i>99999999999999999999</i></n>";
    let value = schema.decode_str(xml, &DecodeOptions::strict()).unwrap().value.unwrap();
    let data = value.as_element().unwrap();
    assert_eq!(data.child(&QName::local("u")), Some(&NativeValue::from(u64::MAX)));
    assert_eq!(
        data.child(&QName::local("i")),
        Some(&NativeValue::from(99_999_999_999_999_999_999i128))
    );

    let too_big = "<n><u>18446744073709551616</u><i>0</i></n>";
    assert!(schema.decode_str(too_big, &DecodeOptions::strict()).unwrap_err().is_validation());
}

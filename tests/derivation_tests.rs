//! Type derivation: restriction narrowing, extension and schema errors

use pretty_assertions::assert_eq;
use xmlschema_core::{DecodeOptions, Error, QName, Schema, SchemaError};

fn xsd(body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:d"
             targetNamespace="urn:d" elementFormDefault="qualified">{}</xs:schema>"#,
        body
    )
}

fn schema_errors(body: &str) -> Vec<SchemaError> {
    match Schema::from_xsd(&xsd(body)) {
        Err(Error::SchemaErrors(errors)) => errors.0,
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("schema unexpectedly compiled"),
    }
}

const BASE: &str = r#"
    <xs:complexType name="base">
      <xs:sequence>
        <xs:element name="a" type="xs:string"/>
        <xs:element name="b" type="xs:decimal" minOccurs="0" maxOccurs="3"/>
      </xs:sequence>
      <xs:attribute name="lang" type="xs:string"/>
    </xs:complexType>"#;

#[test]
fn test_valid_restriction() {
    let schema = Schema::from_xsd(&xsd(&format!(
        r#"{}
        <xs:complexType name="narrow">
          <xs:complexContent>
            <xs:restriction base="tns:base">
              <xs:sequence>
                <xs:element name="a" type="xs:string"/>
                <xs:element name="b" type="xs:int" maxOccurs="2"/>
              </xs:sequence>
            </xs:restriction>
          </xs:complexContent>
        </xs:complexType>
        <xs:element name="n" type="tns:narrow"/>"#,
        BASE
    )))
    .unwrap();

    let narrow = schema.lookup_type(&QName::namespaced("urn:d", "narrow")).unwrap();
    let base = schema.lookup_type(&QName::namespaced("urn:d", "base")).unwrap();
    assert!(schema.globals().is_derived_from(narrow, base));

    let ok = r#"<n xmlns="urn:d" lang="en"><a>x</a><b>1</b></n>"#;
    assert!(schema.decode_str(ok, &DecodeOptions::strict()).is_ok());
    let too_many = r#"<n xmlns="urn:d"><a>x</a><b>1</b><b>2</b><b>3</b></n>"#;
    assert!(schema.decode_str(too_many, &DecodeOptions::strict()).is_err());
}

#[test]
fn test_restrictions_that_widen_fail() {
    let errors = schema_errors(&format!(
        r#"{}
        <xs:complexType name="moreOccurs">
          <xs:complexContent>
            <xs:restriction base="tns:base">
              <xs:sequence>
                <xs:element name="a" type="xs:string"/>
                <xs:element name="b" type="xs:decimal" maxOccurs="5"/>
              </xs:sequence>
            </xs:restriction>
          </xs:complexContent>
        </xs:complexType>
        <xs:complexType name="newElement">
          <xs:complexContent>
            <xs:restriction base="tns:base">
              <xs:sequence>
                <xs:element name="a" type="xs:string"/>
                <xs:element name="c" type="xs:string"/>
              </xs:sequence>
            </xs:restriction>
          </xs:complexContent>
        </xs:complexType>
        <xs:complexType name="widerType">
          <xs:complexContent>
            <xs:restriction base="tns:base">
              <xs:sequence>
                <xs:element name="a" type="xs:anySimpleType"/>
              </xs:sequence>
            </xs:restriction>
          </xs:complexContent>
        </xs:complexType>
        <xs:complexType name="newAttribute">
          <xs:complexContent>
            <xs:restriction base="tns:base">
              <xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence>
              <xs:attribute name="extra" type="xs:string"/>
            </xs:restriction>
          </xs:complexContent>
        </xs:complexType>"#,
        BASE
    ));
    let components: Vec<_> = errors.iter().filter_map(|e| e.component.clone()).collect();
    assert_eq!(
        components,
        vec![
            "{urn:d}moreOccurs".to_string(),
            "{urn:d}newElement".to_string(),
            "{urn:d}widerType".to_string(),
            "{urn:d}newAttribute".to_string(),
        ]
    );
}

#[test]
fn test_extension_projection() {
    let schema = Schema::from_xsd(&xsd(&format!(
        r#"{}
        <xs:complexType name="extended">
          <xs:complexContent>
            <xs:extension base="tns:base">
              <xs:sequence><xs:element name="c" type="xs:boolean"/></xs:sequence>
              <xs:attribute name="id" type="xs:ID"/>
            </xs:extension>
          </xs:complexContent>
        </xs:complexType>
        <xs:element name="e" type="tns:extended"/>
        <xs:element name="b" type="tns:base"/>"#,
        BASE
    )))
    .unwrap();

    let extended = schema
        .decode_str(
            r#"<e xmlns="urn:d" lang="it" id="x1"><a>v</a><b>2.5</b><c>true</c></e>"#,
            &DecodeOptions::strict(),
        )
        .unwrap()
        .value
        .unwrap();
    let base = schema
        .decode_str(r#"<b xmlns="urn:d" lang="it"><a>v</a><b>2.5</b></b>"#, &DecodeOptions::strict())
        .unwrap()
        .value
        .unwrap();

    let extended = extended.as_element().unwrap();
    let base = base.as_element().unwrap();
    for local in ["a", "b"] {
        let name = QName::namespaced("urn:d", local);
        assert_eq!(
            extended.children(&name).collect::<Vec<_>>(),
            base.children(&name).collect::<Vec<_>>()
        );
    }
    assert_eq!(extended.attribute(&QName::local("lang")), base.attribute(&QName::local("lang")));
}

#[test]
fn test_circular_and_unknown_bases() {
    let errors = schema_errors(
        r#"
        <xs:complexType name="x">
          <xs:complexContent><xs:extension base="tns:y"/></xs:complexContent>
        </xs:complexType>
        <xs:complexType name="y">
          <xs:complexContent><xs:extension base="tns:x"/></xs:complexContent>
        </xs:complexType>
        <xs:complexType name="z">
          <xs:complexContent><xs:extension base="tns:missing"/></xs:complexContent>
        </xs:complexType>"#,
    );
    assert!(errors.iter().any(|e| e.message.contains("circular")));
    assert!(errors.iter().any(|e| e.message.contains("unknown type")));
}

#[test]
fn test_simple_type_restriction_cannot_widen_facets() {
    let errors = schema_errors(
        r#"
        <xs:simpleType name="small">
          <xs:restriction base="xs:int"><xs:maxInclusive value="10"/></xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="wider">
          <xs:restriction base="tns:small"><xs:maxInclusive value="20"/></xs:restriction>
        </xs:simpleType>"#,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].component.as_deref(), Some("{urn:d}wider"));
}

#[test]
fn test_recursive_types() {
    let schema = Schema::from_xsd(&xsd(
        r#"
        <xs:complexType name="node">
          <xs:sequence>
            <xs:element name="node" type="tns:node" minOccurs="0" maxOccurs="unbounded"/>
          </xs:sequence>
          <xs:attribute name="label" type="xs:string"/>
        </xs:complexType>
        <xs:element name="tree" type="tns:node"/>"#,
    ))
    .unwrap();
    let xml = r#"<tree xmlns="urn:d"><node label="a"><node label="b"/></node><node/></tree>"#;
    assert!(schema.decode_str(xml, &DecodeOptions::strict()).is_ok());
}

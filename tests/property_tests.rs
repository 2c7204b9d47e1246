//! Property tests for wildcard admission, list round-trips and suffix
//! open-content ordering

use indexmap::IndexSet;
use proptest::prelude::*;
use xmlschema_core::validators::wildcards::NameScope;
use xmlschema_core::validators::{NamespaceConstraint, QNameExclusion, Wildcard};
use xmlschema_core::{DecodeOptions, NativeValue, QName, Schema};

const TNS: &str = "urn:p";

fn schema() -> Schema {
    Schema::from_xsd(&format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="{TNS}"
             targetNamespace="{TNS}" elementFormDefault="qualified">
          <xs:simpleType name="ints"><xs:list itemType="xs:int"/></xs:simpleType>
          <xs:element name="root">
            <xs:complexType>
              <xs:openContent mode="suffix">
                <xs:any namespace="urn:extra" processContents="skip"/>
              </xs:openContent>
              <xs:sequence>
                <xs:element name="a" type="xs:string"/>
                <xs:element name="b" type="xs:string" maxOccurs="2"/>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#
    ))
    .unwrap()
}

fn namespace() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(TNS.to_string())),
        "urn:[a-z]{1,6}".prop_map(Some),
    ]
}

proptest! {
    #[test]
    fn wildcard_admission_is_pure(ns in namespace(), local in "[a-z]{1,8}", sibling in "[a-z]{1,8}") {
        let wildcard = Wildcard::new(NamespaceConstraint::other(Some(TNS)))
            .excluding(QNameExclusion::DefinedSibling);
        let name = QName::new(ns.clone(), local);
        let defined: IndexSet<QName> = IndexSet::new();
        let siblings: IndexSet<QName> = [QName::new(ns.clone(), sibling)].into_iter().collect();
        let scope = NameScope::new(&defined, &siblings);

        let first = wildcard.admits(&name, &scope);
        prop_assert_eq!(first, wildcard.admits(&name, &scope));
        if ns.is_none() || ns.as_deref() == Some(TNS) {
            prop_assert!(!first);
        }
        if siblings.contains(&name) {
            prop_assert!(!first);
        }
    }

    #[test]
    fn target_namespace_admits_only_itself(ns in namespace()) {
        let constraint = NamespaceConstraint::from_namespace_attr("##targetNamespace", Some(TNS)).unwrap();
        prop_assert_eq!(constraint.admits(ns.as_deref()), ns.as_deref() == Some(TNS));
    }

    #[test]
    fn integer_list_round_trip(values in prop::collection::vec(any::<i32>(), 1..12)) {
        let schema = schema();
        let type_name = QName::namespaced(TNS, "ints");
        let value = NativeValue::List(values.iter().map(|v| NativeValue::from(i64::from(*v))).collect());

        let text = schema.encode_text(&value, &type_name, &DecodeOptions::strict()).unwrap().value.unwrap();
        let decoded = schema.decode_text(&text, &type_name, &DecodeOptions::strict()).unwrap();
        prop_assert_eq!(decoded.value, Some(value));
    }

    #[test]
    fn suffix_never_precedes_required_particles(
        extras in prop::collection::vec(0usize..3, 0..4),
        with_second_b in any::<bool>(),
    ) {
        // extras[i] is the position of an extra element: 0 before a, 1 before b, 2 at the end
        let schema = schema();
        let mut children: Vec<(usize, &str)> = vec![(0, "<a/>"), (1, "<b/>")];
        if with_second_b {
            children.push((1, "<b/>"));
        }
        let mut xml = String::new();
        for slot in 0..3 {
            for _ in extras.iter().filter(|e| **e == slot) {
                xml.push_str("<x:e/>");
            }
            for (_, child) in children.iter().filter(|(s, _)| *s == slot) {
                xml.push_str(child);
            }
        }
        let doc = format!(r#"<root xmlns="{TNS}" xmlns:x="urn:extra">{}</root>"#, xml);
        let valid = schema.decode_str(&doc, &DecodeOptions::strict()).is_ok();
        prop_assert_eq!(valid, extras.iter().all(|e| *e == 2));
    }
}

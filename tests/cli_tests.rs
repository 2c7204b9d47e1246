//! CLI integration tests
//!
//! These tests run the built binary against schema and instance files
//! written to a temporary directory.

#![cfg(feature = "cli")]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="note">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="to" type="xs:string"/>
        <xs:element name="priority" type="xs:int" minOccurs="0"/>
      </xs:sequence>
      <xs:attribute name="id" type="xs:int" use="required"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

fn xmlschema_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xmlschema-core"))
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn run(args: &[&Path]) -> Output {
    Command::new(xmlschema_bin())
        .args(args)
        .output()
        .expect("failed to execute xmlschema-core")
}

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let schema = write(&dir, "note.xsd", SCHEMA);
    (dir, schema)
}

#[test]
fn test_validate_valid_document() {
    let (dir, schema) = setup();
    let xml = write(&dir, "ok.xml", r#"<note id="1"><to>bob</to><priority>2</priority></note>"#);

    let output = run(&[Path::new("validate"), Path::new("-s"), &schema, &xml]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("is valid"));
}

#[test]
fn test_validate_reports_errors() {
    let (dir, schema) = setup();
    let xml = write(&dir, "bad.xml", r#"<note id="x"><to>bob</to><priority>high</priority></note>"#);

    let output = run(&[Path::new("validate"), Path::new("-s"), &schema, &xml]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/note/priority"), "stderr: {}", stderr);

    // strict mode stops at the first error
    let output = run(&[Path::new("validate"), Path::new("-m"), Path::new("strict"), Path::new("-s"), &schema, &xml]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unreadable_schema_exits_with_two() {
    let dir = TempDir::new().unwrap();
    let schema = write(&dir, "broken.xsd", r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
      <xs:element name="a" type="xs:missing"/>
    </xs:schema>"#);
    let xml = write(&dir, "a.xml", "<a/>");

    let output = run(&[Path::new("validate"), Path::new("-s"), &schema, &xml]);
    assert_eq!(output.status.code(), Some(2));

    let missing = dir.path().join("nothing.xml");
    let (_, good) = setup();
    let output = run(&[Path::new("validate"), Path::new("-s"), &good, &missing]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_xml2json() {
    let (dir, schema) = setup();
    let xml = write(&dir, "ok.xml", r#"<note id="7"><to>bob</to><priority>2</priority></note>"#);
    let out = dir.path().join("note.json");

    let output = run(&[Path::new("xml2json"), Path::new("-s"), &schema, &xml, Path::new("-o"), &out]);
    assert_eq!(output.status.code(), Some(0));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json, serde_json::json!({"@id": 7, "to": "bob", "priority": 2}));
}

#[test]
fn test_json2xml() {
    let (dir, schema) = setup();
    let json = write(&dir, "note.json", r#"{"@id": 3, "to": "ann"}"#);

    let output = run(&[
        Path::new("json2xml"),
        Path::new("-s"),
        &schema,
        Path::new("-e"),
        Path::new("note"),
        &json,
    ]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<note"), "stdout: {}", stdout);
    assert!(stdout.contains("<to>ann</to>"), "stdout: {}", stdout);

    let bad = write(&dir, "bad.json", r#"{"@id": 3, "priority": 1}"#);
    let output = run(&[
        Path::new("json2xml"),
        Path::new("-s"),
        &schema,
        Path::new("-e"),
        Path::new("note"),
        &bad,
    ]);
    assert_eq!(output.status.code(), Some(1));
}

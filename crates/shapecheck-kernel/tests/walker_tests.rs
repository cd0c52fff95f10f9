//! How annotated fields are found: union arms, recursion, inheritance.

use rstest::rstest;
use serde_json::{json, Value};
use shapecheck_kernel::{TypeSelector, ValidatorOptions, ValidatorSession};

const SCHEMA: &str = r#"
export interface A {
  /** @pattern ^a+$ */
  name: string;
  kind: "a";
}
export interface B {
  name: string;
  kind: "b";
}
export type Either = A | B;

export type Node = {
  /** @unique */
  id: string;
  child?: Node;
};

export interface Base {
  /** @pattern ^[A-Z] */
  title: string;
}
export interface Page extends Base {
  /** @uuid 4 */
  id: string;
}
export type Pages = Page[];

export type Lookup = {
  [key: string]: {
    /** @pattern ^\d+$ */
    code: string;
  };
};
"#;

fn session() -> (tempfile::TempDir, ValidatorSession) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    std::fs::write(dir.path().join("index.d.ts"), SCHEMA).unwrap_or_else(|e| panic!("write: {e}"));
    let session = ValidatorSession::new(&ValidatorOptions::new(dir.path()))
        .unwrap_or_else(|e| panic!("session: {e}"));
    (dir, session)
}

fn messages(ty: &str, value: Value) -> Option<Vec<(String, String)>> {
    let (_dir, mut session) = session();
    session
        .diagnose(&TypeSelector::module(".", ty), &value)
        .unwrap_or_else(|e| panic!("diagnose: {e}"))
        .map(|list| list.into_iter().map(|d| (d.path.to_string(), d.message)).collect())
}

#[test]
fn every_union_arm_is_checked() {
    let found = messages("Either", json!({"name": "zzz", "kind": "b"}));
    assert_eq!(
        found,
        Some(vec![(
            "[\"name\"]".to_string(),
            "Value \"zzz\" does not match pattern ^a+$".to_string()
        )])
    );
}

#[test]
fn recursive_types_terminate_and_report_once() {
    let mut value = json!({"id": "x"});
    for depth in 0..30 {
        let id = if depth == 10 { "x".to_string() } else { format!("n{depth}") };
        value = json!({"id": id, "child": value});
    }
    let found = messages("Node", value).unwrap_or_default();
    assert_eq!(found.len(), 1, "{found:?}");
    assert!(found[0].1.starts_with("Duplicate value \"x\""));
    assert!(found[0].0.ends_with("[\"id\"]"));
}

#[test]
fn inherited_annotations_apply() {
    let found = messages(
        "Pages",
        json!([
            {"title": "Home", "id": "a89439c1-e4bf-4b2d-8118-c7f752ab7842"},
            {"title": "about", "id": "a89439c1-e4bf-4b2d-8118-c7f752ab7842"},
        ]),
    );
    assert_eq!(
        found,
        Some(vec![
            ("[1][\"id\"]".to_string(), "Duplicate UUID \"a89439c1-e4bf-4b2d-8118-c7f752ab7842\"".to_string()),
            ("[1][\"title\"]".to_string(), "Value \"about\" does not match pattern ^[A-Z]".to_string()),
        ])
    );
}

#[rstest]
#[case::valid(json!({"x": {"code": "12"}, "y": {"code": "3"}}), None)]
#[case::invalid(
    json!({"x": {"code": "12"}, "y": {"code": "c"}}),
    Some(vec![("[\"y\"][\"code\"]".to_string(), "Value \"c\" does not match pattern ^\\d+$".to_string())]),
)]
fn index_signature_values_are_walked(#[case] value: Value, #[case] expected: Option<Vec<(String, String)>>) {
    assert_eq!(messages("Lookup", value), expected);
}

#[test]
fn structural_errors_win_over_annotations() {
    let found = messages("Pages", json!([{"title": "lower", "id": 7}])).unwrap_or_default();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, "Type 'number' is not assignable to type 'string'.");
}

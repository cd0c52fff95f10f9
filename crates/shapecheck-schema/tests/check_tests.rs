//! Structural checking through whole projects: imports, re-exports, globals,
//! generics, and recursive declarations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use rstest::rstest;
use shapecheck_schema::{CompilerOptions, Program, Project, SchemaError};

const SCHEMA: &str = r#"
export interface Hello { hello: "world" }
export interface Foo { foo: string; bar: number }
export type Mapping<K extends string, V> = { [P in K]: V };
export type Cond<T> = T extends "left" ? { conditionLeft: string } : { conditionRight: number };
export type Tree = { value: number; children?: Tree[] };
export type Many = { a: string; b: string; c: string; d: string; e: string; f: string };
export interface Base { id: string }
export interface Derived extends Base { name?: string }
"#;

fn write_all(root: &Path, files: &[(&str, &str)]) {
    for (name, text) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, text).expect("write");
    }
}

fn messages(project: Arc<Project>, head: &str, module: &str, ty: &str, value: &str) -> Vec<String> {
    let mut program = Program::new(project);
    program.update_unit(format!(
        "import {{ {head} }} from \"{module}\";\nexport const __value: {ty} = {value};"
    ));
    program
        .semantic_diagnostics()
        .expect("schema should compile")
        .into_iter()
        .map(|d| d.message)
        .collect()
}

fn schema_project() -> (tempfile::TempDir, Arc<Project>) {
    let dir = tempfile::tempdir().expect("tempdir");
    write_all(dir.path(), &[("schema.ts", SCHEMA)]);
    let project = Arc::new(Project::new(CompilerOptions::new(dir.path())));
    (dir, project)
}

#[rstest]
#[case::literal("Hello", "Hello", r#"{"hello": "world"}"#, &[])]
#[case::literal_mismatch(
    "Hello",
    "Hello",
    r#"{"hello": "tiva"}"#,
    &["Type '\"tiva\"' is not assignable to type '\"world\"'."]
)]
#[case::two_mismatches(
    "Foo",
    "Foo",
    r#"{"foo": 1, "bar": 2}"#,
    &["Type 'number' is not assignable to type 'string'."]
)]
#[case::mapped_missing(
    "Mapping",
    "Mapping<\"hello\" | \"world\", boolean>",
    r#"{"world": false}"#,
    &["Property 'hello' is missing in type '{ world: false; }' but required in type 'Mapping<\"hello\" | \"world\", boolean>'."]
)]
#[case::conditional_excess(
    "Cond",
    "Cond<\"left\">",
    r#"{"conditionLeft": "x", "conditionRight": 1}"#,
    &["Object literal may only specify known properties, and '\"conditionRight\"' does not exist in type '{ conditionLeft: string; }'."]
)]
#[case::many_missing(
    "Many",
    "Many",
    r#"{"a": "x"}"#,
    &["Type '{ a: string; }' is missing the following properties from type 'Many': b, c, d, e, and 1 more."]
)]
#[case::inherited_required("Derived", "Derived", r#"{"name": "n"}"#, &["Property 'id' is missing in type '{ name: string; }' but required in type 'Derived'."])]
fn check_against_schema(
    #[case] head: &str,
    #[case] ty: &str,
    #[case] value: &str,
    #[case] expected: &[&str],
) {
    let (_dir, project) = schema_project();
    assert_eq!(messages(project, head, "./schema", ty, value), expected);
}

#[test]
fn recursive_type_reports_deep_mismatch() {
    let (_dir, project) = schema_project();
    let found = messages(
        project,
        "Tree",
        "./schema",
        "Tree",
        r#"{"value": 1, "children": [{"value": 2}, {"value": 3, "children": [{"value": "x"}]}]}"#,
    );
    assert_eq!(found, vec!["Type 'string' is not assignable to type 'number'."]);
}

#[test]
fn re_exports_are_followed() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_all(
        dir.path(),
        &[
            ("types/inner.ts", "export interface Point { x: number; y: number }"),
            ("types/index.ts", "export * from \"./inner\";"),
            ("api.ts", "export { Point as Coord } from \"./types\";"),
        ],
    );
    let project = Arc::new(Project::new(CompilerOptions::new(dir.path())));
    let found = messages(project, "Coord", "./api", "Coord", r#"{"x": 1, "y": "2"}"#);
    assert_eq!(found, vec!["Type 'string' is not assignable to type 'number'."]);
}

#[test]
fn globals_are_visible_without_import() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_all(
        dir.path(),
        &[
            ("global.d.ts", "declare interface Flag { on: boolean }"),
            ("empty.ts", "export type Unused = string;"),
        ],
    );
    let mut options = CompilerOptions::new(dir.path());
    options.types.push("global.d.ts".into());
    let project = Arc::new(Project::new(options));
    let found = messages(project, "Unused", "./empty", "Flag", r#"{"on": "yes"}"#);
    assert_eq!(found, vec!["Type 'string' is not assignable to type 'boolean'."]);
}

#[test]
fn project_files_are_shared_between_programs() {
    let (_dir, project) = schema_project();
    let first = messages(Arc::clone(&project), "Foo", "./schema", "Foo", r#"{"foo": "a", "bar": 1}"#);
    let loaded = project.cached_files();
    let second = messages(Arc::clone(&project), "Foo", "./schema", "Foo", r#"{"foo": "b", "bar": 2}"#);
    assert!(first.is_empty() && second.is_empty());
    assert_eq!(project.cached_files(), loaded);
}

#[test]
fn unresolved_name_is_a_schema_error() {
    let (_dir, project) = schema_project();
    let mut program = Program::new(project);
    program.update_unit("import { Nope } from \"./schema\";\nexport const __value: Nope = 1;".to_string());
    let err = program.semantic_diagnostics().expect_err("unknown type");
    assert!(matches!(err, SchemaError::UnresolvedName { .. }));
    let message = err.to_string();
    let head = message.split(" in ").next().unwrap_or_default();
    insta::assert_snapshot!(head, @"cannot find name 'Nope'");
}

#[test]
fn wrong_type_argument_count_is_a_schema_error() {
    let (_dir, project) = schema_project();
    let mut program = Program::new(project);
    program.update_unit("import { Cond } from \"./schema\";\nexport const __value: Cond = 1;".to_string());
    let err = program.semantic_diagnostics().expect_err("missing argument");
    insta::assert_snapshot!(err.to_string(), @"generic type 'Cond' requires 1 type argument(s)");
}

fn nested(depth: usize) -> String {
    let mut value = String::from(r#"{"value": 0}"#);
    for level in 1..=depth {
        value = format!(r#"{{"value": {level}, "children": [{value}]}}"#);
    }
    value
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // Recursive declarations are checked lazily, so depth only costs work
    // proportional to the value.
    #[test]
    fn recursion_terminates_at_any_depth(depth in 0usize..48) {
        let (_dir, project) = schema_project();
        let found = messages(project, "Tree", "./schema", "Tree", &nested(depth));
        prop_assert!(found.is_empty());
    }
}

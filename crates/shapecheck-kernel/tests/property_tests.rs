//! Property tests over arbitrary JSON values.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use shapecheck_kernel::{TypeSelector, ValidatorOptions, ValidatorSession};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(|n| json!(n)),
        "[a-z @#]{0,6}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-d]", inner), 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

const SCHEMA: &str = r#"
export interface Item {
  /** @pattern ^[a-z]+$ */
  a: string;
  b?: number[];
  /** @unique */
  c?: string;
}
"#;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn diagnose_is_none_or_non_empty(value in value()) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("index.d.ts"), SCHEMA).unwrap_or_else(|e| panic!("write: {e}"));
        let mut session = ValidatorSession::new(&ValidatorOptions::new(dir.path()))
            .unwrap_or_else(|e| panic!("session: {e}"));

        for selector in [TypeSelector::module(".", "Item"), TypeSelector::module(".", "Item[]")] {
            let result = session.diagnose(&selector, &value);
            prop_assert!(result.is_ok(), "diagnose failed: {:?}", result);
            if let Ok(Some(list)) = result {
                prop_assert!(!list.is_empty());
            }
        }
    }
}

//! Structural helpers over the document value tree.
//!
//! Documents are plain `serde_json::Value` trees. These helpers give the
//! comparisons the engine relies on a single definition: numeric-aware
//! structural equality (used by `deleteValue`) and a total ordering (used by
//! the sort opcodes, which must behave identically during replay).

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Returns a full structural copy of `value`.
///
/// Cost is proportional to the size of the tree.
pub fn deep_clone(value: &Value) -> Value {
    value.clone()
}

/// Structural equality over the value tree.
///
/// Unlike `Value`'s `PartialEq`, numbers compare by numeric value, so `1`
/// and `1.0` are equal. Two integers are compared exactly, whatever their
/// magnitude.
pub fn structural_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Ordering::Equal,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| structural_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, l)| y.get(k).is_some_and(|r| structural_eq(l, r)))
        }
        _ => false,
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Integers compare exactly; anything involving a float compares as `f64`.
fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (as_integer(x), as_integer(y)) {
        return x.cmp(&y);
    }
    let x = x.as_f64().unwrap_or(f64::NAN);
    let y = y.as_f64().unwrap_or(f64::NAN);
    x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over values: null < bool < number < string < array < object.
///
/// Arrays compare lexicographically; objects compare by their (sorted) entries.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Returns `true` if the value is an array or a map.
pub fn is_container(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// Emptiness as seen by guards: null, empty arrays, empty maps, empty strings
/// and all other scalars have no entries.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => true,
    }
}

/// Short name of the value's kind, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_numerically() {
        assert!(structural_eq(&json!(1), &json!(1.0)));
        assert!(!structural_eq(&json!(1), &json!("1")));
    }

    #[test]
    fn nested_structures_are_equal() {
        let a = json!({"tags": ["a", "b"], "n": 2});
        let b = json!({"n": 2.0, "tags": ["a", "b"]});
        assert!(structural_eq(&a, &b));
        assert!(!structural_eq(&a, &json!({"tags": ["a"], "n": 2})));
    }

    #[test]
    fn large_integers_stay_distinct() {
        let low = json!(9_007_199_254_740_992u64);
        let high = json!(9_007_199_254_740_993u64);
        assert!(!structural_eq(&low, &high));
        assert_eq!(compare_values(&high, &low), Ordering::Greater);
        assert_eq!(compare_values(&json!(i64::MIN), &json!(u64::MAX)), Ordering::Less);
        assert!(structural_eq(&json!(u64::MAX), &json!(u64::MAX)));
    }

    #[test]
    fn integers_and_floats_compare_numerically() {
        assert_eq!(compare_values(&json!(2), &json!(1.5)), Ordering::Greater);
        assert_eq!(compare_values(&json!(-0.0), &json!(0)), Ordering::Equal);
        assert!(structural_eq(&json!(3), &json!(3.0)));
    }

    #[test]
    fn ordering_ranks_kinds() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(10), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 2, 0])), Ordering::Less);
    }

    #[test]
    fn emptiness() {
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(is_empty_value(&json!(null)));
        assert!(!is_empty_value(&json!(["x"])));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn deep_clone_is_independent() {
        let original = json!({"posts": [{"text": "A"}]});
        let mut copy = deep_clone(&original);
        copy["posts"][0]["text"] = json!("B");
        assert_eq!(original["posts"][0]["text"], json!("A"));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (-50i64..50).prop_map(Value::from),
            "[a-d]{0,3}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-c]", inner, 0..3)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn ordering_is_antisymmetric(a in arb_value(), b in arb_value()) {
            prop_assert_eq!(compare_values(&a, &b), compare_values(&b, &a).reverse());
        }

        #[test]
        fn equal_values_compare_equal(a in arb_value()) {
            let copy = deep_clone(&a);
            prop_assert!(structural_eq(&a, &copy));
            prop_assert_eq!(compare_values(&a, &copy), Ordering::Equal);
        }
    }
}

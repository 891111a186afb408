//! Deep merging of nested value trees.
//!
//! Flattened leaf values are rebuilt into nested mappings by wrapping each
//! value along its qualifier path ([`nest`]) and folding the single-path
//! trees together ([`deep_merge`]). Mapping/mapping conflicts merge
//! recursively; any other conflict is resolved by the incoming value.
//!
//! # Example
//!
//! ```
//! use model_cli_core::{deep_merge, nest};
//! use serde_json::{Map, json};
//!
//! let mut tree = Map::new();
//! deep_merge(&mut tree, nest(&["user", "address", "zip"], json!("12345")));
//! deep_merge(&mut tree, nest(&["user", "id"], json!(7)));
//!
//! assert_eq!(
//!     serde_json::Value::Object(tree),
//!     json!({"user": {"address": {"zip": "12345"}, "id": 7}})
//! );
//! ```

use serde_json::{Map, Value};

/// Wraps `value` in one single-key mapping per path segment.
///
/// The result for `["a", "b"]` is `{"a": {"b": value}}`. An empty path
/// yields an empty mapping, since there is no key to place the value under.
pub fn nest<S: AsRef<str>>(path: &[S], value: Value) -> Map<String, Value> {
    let Some((last, parents)) = path.split_last() else {
        return Map::new();
    };
    let mut tree = Map::new();
    tree.insert(last.as_ref().to_string(), value);
    for segment in parents.iter().rev() {
        let mut outer = Map::new();
        outer.insert(segment.as_ref().to_string(), Value::Object(tree));
        tree = outer;
    }
    tree
}

/// Merges `update` into `target` in place.
pub fn deep_merge(target: &mut Map<String, Value>, update: Map<String, Value>) {
    for (key, incoming) in update {
        match (target.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                deep_merge(existing, nested);
            }
            (_, incoming) => {
                target.insert(key, incoming);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_nest_single_segment() {
        let tree = nest(&["num"], json!(1));
        assert_eq!(Value::Object(tree), json!({"num": 1}));
    }

    #[test]
    fn test_nest_empty_path_is_empty() {
        let path: [&str; 0] = [];
        assert!(nest(&path, json!(1)).is_empty());
    }

    #[test]
    fn test_scalar_overwrites_mapping() {
        let mut tree = nest(&["a", "b"], json!(1));
        deep_merge(&mut tree, nest(&["a"], json!("flat")));
        assert_eq!(Value::Object(tree), json!({"a": "flat"}));
    }

    #[test]
    fn test_mapping_overwrites_scalar() {
        let mut tree = nest(&["a"], json!("flat"));
        deep_merge(&mut tree, nest(&["a", "b"], json!(1)));
        assert_eq!(Value::Object(tree), json!({"a": {"b": 1}}));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z]{1,4}"
    }

    proptest! {
        /// Merging distinct paths keeps every leaf reachable along its path.
        #[test]
        fn merged_leaves_stay_reachable(
            paths in prop::collection::btree_set(prop::collection::vec(segment(), 1..4), 1..8)
        ) {
            // Drop paths that are a strict prefix of another; their leaf would be
            // overwritten by the deeper mapping or vice versa.
            let paths: Vec<Vec<String>> = paths
                .iter()
                .filter(|p| !paths.iter().any(|q| q.len() > p.len() && q.starts_with(p)))
                .cloned()
                .collect();

            let mut tree = Map::new();
            for (index, path) in paths.iter().enumerate() {
                deep_merge(&mut tree, nest(path, json!(index)));
            }

            for (index, path) in paths.iter().enumerate() {
                let mut node = &Value::Object(tree.clone());
                for segment in path {
                    node = &node[segment.as_str()];
                }
                prop_assert_eq!(node, &json!(index));
            }
        }
    }
}

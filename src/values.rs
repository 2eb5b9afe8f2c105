//! Value tree construction from flat dotted-path assignments.
//!
//! Callers supply assignments as flat `"one.two.three" = "value"` pairs;
//! this module expands each path into nested maps, coercing the raw string
//! value into a typed leaf. A path component can be either a scalar leaf or
//! an interior map across all assignments seen so far, never both.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Nested mapping of assignment data driving template rendering
pub type ValueTree = Map<String, Value>;

/// Coerces a raw assignment string into a typed leaf value.
///
/// Tried in order: 64-bit signed integer, 64-bit unsigned integer, finite
/// float, boolean (`true`/`false`); anything else stays a string. Callers
/// relying on string-only values must quote accordingly in their templates.
pub fn coerce(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(u) = raw.parse::<u64>() {
        return Value::from(u);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    if let Ok(b) = raw.parse::<bool>() {
        return Value::from(b);
    }
    Value::from(raw)
}

/// Inserts `value` at the dot-separated `path`, creating intermediate map
/// nodes on demand.
///
/// Fails with [`Error::KeyConflict`] if the terminal segment already holds
/// a map (reporting the full path), or if a non-terminal segment already
/// holds a leaf (reporting the prefix up to and including that segment).
/// The check is local to each insertion, so conflicts are detected
/// regardless of the order assignments are processed in.
pub fn insert_path(path: &str, value: Value, tree: &mut ValueTree) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut node = tree;
    for (i, segment) in segments.iter().enumerate() {
        if i == segments.len() - 1 {
            if let Some(Value::Object(_)) = node.get(*segment) {
                return Err(Error::KeyConflict(path.to_string()));
            }
            node.insert((*segment).to_string(), value);
            return Ok(());
        }
        node = match node
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(map) => map,
            _ => return Err(Error::KeyConflict(segments[..=i].join("."))),
        };
    }
    Ok(())
}

/// Builds a value tree from flat `(path, raw value)` assignment pairs.
pub fn build(assignments: &[(String, String)]) -> Result<ValueTree> {
    let mut tree = Map::new();
    for (path, raw) in assignments {
        insert_path(path, coerce(raw), &mut tree)?;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_coerce_types() {
        assert_eq!(coerce("42"), json!(42));
        assert_eq!(coerce("-7"), json!(-7));
        assert_eq!(coerce("18446744073709551615"), json!(18446744073709551615u64));
        assert_eq!(coerce("6.5"), json!(6.5));
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("false"), json!(false));
        assert_eq!(coerce("hello"), json!("hello"));
        assert_eq!(coerce("-"), json!("-"));
    }

    #[test]
    fn test_coerce_non_finite_stays_string() {
        assert_eq!(coerce("inf"), json!("inf"));
        assert_eq!(coerce("NaN"), json!("NaN"));
    }

    #[test]
    fn test_build_nested_paths() {
        let tree = build(&pairs(&[
            ("one.two.three", "3"),
            ("one.two.four", "yes"),
            ("five", "5.5"),
        ]))
        .unwrap();
        assert_eq!(
            Value::Object(tree),
            json!({"one": {"two": {"three": 3, "four": "yes"}}, "five": 5.5})
        );
    }

    #[test]
    fn test_build_is_order_independent() {
        let forward = build(&pairs(&[
            ("a.b", "1"),
            ("a.c", "2"),
            ("d", "3"),
        ]))
        .unwrap();
        let backward = build(&pairs(&[
            ("d", "3"),
            ("a.c", "2"),
            ("a.b", "1"),
        ]))
        .unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_insert_path_leaf_over_branch_conflict() {
        let mut tree = Map::new();
        insert_path("a.b.c.d", json!(123), &mut tree).unwrap();
        let err = insert_path("a.b.c", json!(456), &mut tree).unwrap_err();
        assert_eq!(err.to_string(), "key conflict at a.b.c");
    }

    #[test]
    fn test_insert_path_branch_over_leaf_conflict() {
        let mut tree = Map::new();
        insert_path("a.b.c", json!(456), &mut tree).unwrap();
        let err = insert_path("a.b.c.d", json!(123), &mut tree).unwrap_err();
        assert_eq!(err.to_string(), "key conflict at a.b.c");
    }

    #[test]
    fn test_insert_path_overwrites_leaf() {
        let mut tree = Map::new();
        insert_path("n", json!(1), &mut tree).unwrap();
        insert_path("n", json!(2), &mut tree).unwrap();
        assert_eq!(tree.get("n"), Some(&json!(2)));
    }
}

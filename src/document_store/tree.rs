//! Helpers operating on JSON document trees.
//!
//! Both store implementations keep documents as `serde_json::Value` trees and share the
//! read/write semantics defined here:
//! - `null` members, empty objects and empty lists are never stored (they are pruned),
//!   so a path whose subtree became empty reads as absent.
//! - Lists are addressed by their decimal index. Writing `null` to a list element splices
//!   it out of the list.
use super::{Result, StoreError};
use serde_json::{Map, Value};

/// Resolves `keys` below `root`.
pub fn value_at<'a>(root: &'a Value, keys: &[String]) -> Option<&'a Value> {
    let mut current = root;
    for key in keys {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(list) => list.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if is_empty(current) {
        None
    } else {
        Some(current)
    }
}

/// Writes `value` to `keys` below `root`, creating intermediate objects as required.
/// Primitive values on the way are replaced by objects. A `null` value removes the target.
pub fn set_at(root: &mut Value, keys: &[String], value: Value) -> Result<()> {
    let value = prune(value).unwrap_or(Value::Null);

    let (key, rest) = match keys.split_first() {
        Some(split) => split,
        None => {
            *root = value;
            return Ok(());
        }
    };

    if let Value::Array(list) = root {
        let index = key
            .parse::<usize>()
            .ok()
            .filter(|index| *index <= list.len())
            .ok_or_else(|| StoreError::IndexOutOfRange {
                path: keys.join("/"),
            })?;
        if index == list.len() {
            if value.is_null() {
                return Ok(());
            }
            list.push(Value::Null);
        }

        set_at(&mut list[index], rest, value)?;
        if is_empty(&list[index]) {
            list.remove(index);
        }
        return Ok(());
    }

    if !root.is_object() {
        if value.is_null() {
            // Nothing stored below a primitive, so there is nothing to remove.
            return Ok(());
        }
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        if rest.is_empty() {
            if value.is_null() {
                map.remove(key);
            } else {
                map.insert(key.clone(), value);
            }
        } else {
            let child = map.entry(key.clone()).or_insert(Value::Null);
            set_at(child, rest, value)?;
            if is_empty(child) {
                map.remove(key);
            }
        }
    }

    Ok(())
}

/// Recursively drops `null` members, empty objects and empty lists.
/// Returns None if nothing is left of the value.
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| prune(child).map(|child| (key, child)))
                .collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        Value::Array(list) => {
            let pruned: Vec<Value> = list.into_iter().filter_map(prune).collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Array(pruned))
            }
        }
        other => Some(other),
    }
}

pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(list) => list.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(path: &str) -> Vec<String> {
        path.split('/').map(String::from).collect()
    }

    #[test]
    fn create_nested_objects() {
        let mut root = json!({});
        set_at(&mut root, &keys("entries/a/status"), json!("Closed")).unwrap();
        set_at(&mut root, &keys("entries/b"), json!({"fileNo": "F-2"})).unwrap();

        assert_eq!(
            root,
            json!({"entries": {"a": {"status": "Closed"}, "b": {"fileNo": "F-2"}}})
        );
        assert_eq!(
            value_at(&root, &keys("entries/a/status")),
            Some(&json!("Closed"))
        );
        assert_eq!(value_at(&root, &keys("entries/c")), None);
    }

    #[test]
    fn removing_prunes_empty_parents() {
        let mut root = json!({"entries": {"a": {"status": "Closed"}}, "racks": {"r": 1}});
        set_at(&mut root, &keys("entries/a/status"), Value::Null).unwrap();

        assert_eq!(root, json!({"racks": {"r": 1}}));
    }

    #[test]
    fn list_elements() {
        let mut root = json!({"history": ["a", "b"]});
        set_at(&mut root, &keys("history/1"), json!("B")).unwrap();
        set_at(&mut root, &keys("history/2"), json!("c")).unwrap();
        assert_eq!(root, json!({"history": ["a", "B", "c"]}));

        set_at(&mut root, &keys("history/0"), Value::Null).unwrap();
        assert_eq!(root, json!({"history": ["B", "c"]}));
        assert_eq!(value_at(&root, &keys("history/1")), Some(&json!("c")));

        match set_at(&mut root, &keys("history/7"), json!("x")) {
            Err(StoreError::IndexOutOfRange { .. }) => (),
            _ => panic!("Must not write past the end of a list!"),
        }
    }

    #[test]
    fn prune_drops_empty_values() {
        assert_eq!(
            prune(json!({"a": null, "b": {}, "c": [], "d": [null, 1], "e": ""})),
            Some(json!({"d": [1], "e": ""}))
        );
        assert_eq!(prune(json!({"a": {"b": null}})), None);
    }
}

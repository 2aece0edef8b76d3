//! Path addressed reads and writes on a JSON tree.
//!
//! Empty objects and nulls are never stored: writing one removes the node,
//! and parents left empty are pruned on the way back up.

use serde_json::{Map, Value};

use makeitmeme_shared::StorePath;

pub fn get<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    (!is_empty(node)).then_some(node)
}

pub fn set(root: &mut Value, path: &StorePath, value: Value) {
    set_in(root, path.segments(), value);
    if root.is_null() {
        *root = Value::Object(Map::new());
    }
}

fn set_in(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = if is_empty(&value) { Value::Null } else { value };
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_in(child, rest, value);
        if is_empty(child) {
            map.remove(head);
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[test]
    fn test_set_creates_intermediate_nodes() {
        let mut root = json!({});
        set(&mut root, &path("users/u1/message"), json!("hi"));
        assert_eq!(root, json!({ "users": { "u1": { "message": "hi" } } }));
        assert_eq!(get(&root, &path("users/u1/message")), Some(&json!("hi")));
    }

    #[test]
    fn test_null_removes_and_prunes() {
        let mut root = json!({ "users": { "u1": { "message": "hi" } }, "chat": { "k": 1 } });
        set(&mut root, &path("users/u1/message"), Value::Null);
        assert_eq!(root, json!({ "chat": { "k": 1 } }));
        assert_eq!(get(&root, &path("users")), None);
    }

    #[test]
    fn test_set_overwrites_scalar_parent() {
        let mut root = json!({ "a": 5 });
        set(&mut root, &path("a/b"), json!(true));
        assert_eq!(root, json!({ "a": { "b": true } }));
    }

    #[test]
    fn test_clearing_root_keeps_object() {
        let mut root = json!({ "a": 1 });
        set(&mut root, &StorePath::root(), Value::Null);
        assert_eq!(root, json!({}));
        assert_eq!(get(&root, &StorePath::root()), None);
    }
}

//! Structural diff between the last-applied spec of an object and its
//! current spec. The controller hands the resulting entries to the update
//! handlers, which only consult them to detect a change of the immutable
//! `type` field.

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffOp {
    Add,
    Change,
    Remove,
}

/// One changed field, with its path rooted at `spec`.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffEntry {
    pub op: DiffOp,
    pub path: Vec<String>,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

pub type SpecDiff = Vec<DiffEntry>;

/// Computes the ordered list of changed fields between two spec values.
/// Objects are walked recursively; arrays and scalars are compared whole.
pub fn diff(old: &Value, new: &Value) -> SpecDiff {
    let mut entries = Vec::new();
    diff_at(&["spec".to_string()], old, new, &mut entries);
    entries
}

fn diff_at(path: &[String], old: &Value, new: &Value, entries: &mut SpecDiff) {
    match (old.as_object(), new.as_object()) {
        (Some(old_map), Some(new_map)) => {
            for (key, old_value) in old_map {
                let child = child_path(path, key);
                match new_map.get(key) {
                    Some(new_value) => diff_at(&child, old_value, new_value, entries),
                    None => entries.push(DiffEntry {
                        op: DiffOp::Remove,
                        path: child,
                        old: Some(old_value.clone()),
                        new: None,
                    }),
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    entries.push(DiffEntry {
                        op: DiffOp::Add,
                        path: child_path(path, key),
                        old: None,
                        new: Some(new_value.clone()),
                    });
                }
            }
        }
        _ => {
            if old != new {
                entries.push(DiffEntry {
                    op: DiffOp::Change,
                    path: path.to_vec(),
                    old: Some(old.clone()),
                    new: Some(new.clone()),
                });
            }
        }
    }
}

fn child_path(path: &[String], key: &str) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(key.to_string());
    child
}

/// Whether the diff contains an in-place change of the `type` spec field.
/// Adding or removing the field does not count, matching the recreate policy
/// of the handlers: only an actual value change forces delete+recreate.
pub fn type_changed(diff: &SpecDiff) -> bool {
    diff.iter()
        .any(|entry| entry.op == DiffOp::Change && entry.path == ["spec", "type"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unchanged_specs_produce_no_entries() {
        let spec = json!({"url": "https://foo.com", "type": "HTTPS"});
        assert!(diff(&spec, &spec).is_empty());
    }

    #[test]
    fn changed_scalar_is_reported_with_spec_rooted_path() {
        let old = json!({"duration": 300});
        let new = json!({"duration": 600});
        let entries = diff(&old, &new);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].op, DiffOp::Change);
        assert_eq!(entries[0].path, ["spec", "duration"]);
        assert_eq!(entries[0].old, Some(json!(300)));
        assert_eq!(entries[0].new, Some(json!(600)));
    }

    #[test]
    fn added_and_removed_fields_are_reported() {
        let old = json!({"url": "https://foo.com", "interval": 300});
        let new = json!({"url": "https://foo.com", "path": "/health"});
        let entries = diff(&old, &new);
        assert!(entries.iter().any(|e| e.op == DiffOp::Remove && e.path == ["spec", "interval"]));
        assert!(entries.iter().any(|e| e.op == DiffOp::Add && e.path == ["spec", "path"]));
    }

    #[test]
    fn nested_objects_are_walked() {
        let old = json!({"customHttpHeaders": {"X-Env": "staging"}});
        let new = json!({"customHttpHeaders": {"X-Env": "prod"}});
        let entries = diff(&old, &new);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, ["spec", "customHttpHeaders", "X-Env"]);
    }

    #[test]
    fn type_change_is_detected() {
        let old = json!({"url": "foo.com", "type": "HTTPS"});
        let new = json!({"url": "foo.com", "type": "PING"});
        assert!(type_changed(&diff(&old, &new)));
    }

    #[test]
    fn type_addition_is_not_a_type_change() {
        let old = json!({"url": "foo.com"});
        let new = json!({"url": "foo.com", "type": "PING"});
        assert!(!type_changed(&diff(&old, &new)));
    }

    #[test]
    fn unrelated_change_is_not_a_type_change() {
        let old = json!({"url": "foo.com", "type": "HTTPS", "interval": 300});
        let new = json!({"url": "foo.com", "type": "HTTPS", "interval": 60});
        assert!(!type_changed(&diff(&old, &new)));
    }
}

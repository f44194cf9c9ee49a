//! Path-addressed mutation of JSON trees.
//!
//! All four primitives resolve paths through [`walk`], so they agree on
//! what a path means.

use serde_json::{Map, Value};

use super::path::PathSegment;
use crate::contracts::kind_of;
use crate::errors::EditError;

fn mismatch(segment: &PathSegment, found: &Value) -> EditError {
    EditError::TypeMismatch {
        segment: segment.to_string(),
        expected: segment.container_kind(),
        found: kind_of(found),
    }
}

/// How many nulls a single index may pad an array with.
pub(crate) const MAX_INDEX_GAP: usize = 1024;

/// Extends `items` with nulls so that `index` is addressable.
fn grow(items: &mut Vec<Value>, index: usize) -> Result<(), EditError> {
    if index < items.len() {
        return Ok(());
    }
    if index - items.len() > MAX_INDEX_GAP {
        return Err(EditError::IndexOutOfBounds);
    }
    let len = index.checked_add(1).ok_or(EditError::IndexOutOfBounds)?;
    items.resize(len, Value::Null);
    Ok(())
}

/// Turns a null slot into the container `segment` needs.
fn prepare(slot: &mut Value, segment: &PathSegment) {
    if slot.is_null() {
        *slot = match segment {
            PathSegment::Key(_) => Value::Object(Map::new()),
            PathSegment::Index(_) => Value::Array(Vec::new()),
        };
    }
}

fn descend<'a>(
    current: &'a mut Value,
    segment: &PathSegment,
    create: bool,
    path: &str,
) -> Result<&'a mut Value, EditError> {
    if create {
        prepare(current, segment);
    }

    match (segment, current) {
        (PathSegment::Key(key), Value::Object(map)) => {
            if create {
                Ok(map.entry(key.clone()).or_insert(Value::Null))
            } else {
                map.get_mut(key)
                    .ok_or_else(|| EditError::PathNotFound(path.to_string()))
            }
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            if create {
                grow(items, *index)?;
            }
            items
                .get_mut(*index)
                .ok_or_else(|| EditError::PathNotFound(path.to_string()))
        }
        (_, Value::Null) => Err(EditError::PathNotFound(path.to_string())),
        (segment, other) => Err(mismatch(segment, other)),
    }
}

/// Resolves `segments` from `root`.
///
/// With `create`, missing keys and indices are filled in and null slots
/// become containers whose kind follows the segment addressing them.
pub(crate) fn walk<'a>(
    root: &'a mut Value,
    segments: &[PathSegment],
    create: bool,
    path: &str,
) -> Result<&'a mut Value, EditError> {
    let mut current = root;
    for segment in segments {
        current = descend(current, segment, create, path)?;
    }
    Ok(current)
}

fn split<'s>(
    segments: &'s [PathSegment],
    path: &str,
) -> Result<(&'s PathSegment, &'s [PathSegment]), EditError> {
    segments.split_last().ok_or_else(|| EditError::InvalidPath {
        path: path.to_string(),
        reason: "path is empty".to_string(),
    })
}

/// Assigns `value` at the path, creating intermediates.
///
/// Indices past the end of an array pad it with nulls, up to
/// [`MAX_INDEX_GAP`] of them.
pub(crate) fn set_at(
    root: &mut Value,
    segments: &[PathSegment],
    value: Value,
    path: &str,
) -> Result<(), EditError> {
    let (last, parents) = split(segments, path)?;
    let parent = walk(root, parents, true, path)?;
    prepare(parent, last);

    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            grow(items, *index)?;
            match items.get_mut(*index) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(EditError::IndexOutOfBounds),
            }
        }
        (segment, other) => Err(mismatch(segment, other)),
    }
}

/// Removes the key or array element at the path.
pub(crate) fn delete_at(root: &mut Value, segments: &[PathSegment], path: &str) -> Result<Value, EditError> {
    let (last, parents) = split(segments, path)?;
    let parent = walk(root, parents, false, path)?;

    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => map
            .remove(key)
            .ok_or_else(|| EditError::PathNotFound(path.to_string())),
        (PathSegment::Index(index), Value::Array(items)) => {
            if *index >= items.len() {
                return Err(EditError::IndexOutOfBounds);
            }
            Ok(items.remove(*index))
        }
        (_, Value::Null) => Err(EditError::PathNotFound(path.to_string())),
        (segment, other) => Err(mismatch(segment, other)),
    }
}

/// Appends to the array at the path, creating `[value]` if nothing is there.
pub(crate) fn push_at(
    root: &mut Value,
    segments: &[PathSegment],
    value: Value,
    path: &str,
) -> Result<usize, EditError> {
    let (last, _) = split(segments, path)?;
    let target = walk(root, segments, true, path)?;

    match target {
        Value::Null => {
            *target = Value::Array(vec![value]);
            Ok(1)
        }
        Value::Array(items) => {
            items.push(value);
            Ok(items.len())
        }
        other => Err(EditError::TypeMismatch {
            segment: last.to_string(),
            expected: "array",
            found: kind_of(other),
        }),
    }
}

/// Removes the element at `index`, or the last one, from the array at the path.
pub(crate) fn pop_at(
    root: &mut Value,
    segments: &[PathSegment],
    index: Option<usize>,
    path: &str,
) -> Result<Value, EditError> {
    let (last, _) = split(segments, path)?;
    let target = walk(root, segments, false, path)?;

    let Value::Array(items) = target else {
        return Err(EditError::TypeMismatch {
            segment: last.to_string(),
            expected: "array",
            found: kind_of(target),
        });
    };
    if items.is_empty() {
        return Err(EditError::EmptyArray);
    }

    let index = index.unwrap_or(items.len() - 1);
    if index >= items.len() {
        return Err(EditError::IndexOutOfBounds);
    }
    Ok(items.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::parse_path;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn set(root: &mut Value, path: &str, value: Value) -> Result<(), EditError> {
        set_at(root, &parse_path(path).unwrap(), value, path)
    }

    #[test]
    fn test_set_creates_objects_and_arrays() {
        let mut root = json!({});
        set(&mut root, "apis.1.path", json!("/todos")).unwrap();
        assert_eq!(root, json!({"apis": [null, {"path": "/todos"}]}));
    }

    #[test]
    fn test_set_replaces_null_intermediate() {
        let mut root = json!({"screens": null});
        set(&mut root, "screens[0].name", json!("Home")).unwrap();
        assert_eq!(root, json!({"screens": [{"name": "Home"}]}));
    }

    #[test]
    fn test_set_index_into_object_is_mismatch() {
        let mut root = json!({"components": {"api": {}}});
        let err = set(&mut root, "components.0", json!(1)).unwrap_err();
        assert_eq!(
            err,
            EditError::TypeMismatch {
                segment: "0".to_string(),
                expected: "array",
                found: "object",
            }
        );
        assert_eq!(root, json!({"components": {"api": {}}}));
    }

    #[test]
    fn test_set_rejects_huge_indices() {
        let mut root = json!({"apis": [{"path": "/a"}]});
        let original = root.clone();

        for path in ["apis[18446744073709551615]", "apis.100000000000", "apis.5000.path"] {
            assert_eq!(set(&mut root, path, json!(1)).unwrap_err(), EditError::IndexOutOfBounds, "{path}");
        }
        assert_eq!(root, original);
    }

    #[test]
    fn test_set_pads_up_to_gap_limit() {
        let mut root = json!({"items": []});
        let path = format!("items.{MAX_INDEX_GAP}");
        set(&mut root, &path, json!("last")).unwrap();
        let items = root["items"].as_array().unwrap();
        assert_eq!(items.len(), MAX_INDEX_GAP + 1);
        assert_eq!(items[MAX_INDEX_GAP], json!("last"));
    }

    #[test]
    fn test_walk_without_create_reports_missing() {
        let mut root = json!({"a": {"b": 1}});
        let segments = parse_path("a.c").unwrap();
        assert_eq!(
            walk(&mut root, &segments, false, "a.c").unwrap_err(),
            EditError::PathNotFound("a.c".to_string())
        );
    }

    #[test]
    fn test_delete_array_element_splices() {
        let mut root = json!({"tasks": ["a", "b", "c"]});
        let removed = delete_at(&mut root, &parse_path("tasks[1]").unwrap(), "tasks[1]").unwrap();
        assert_eq!(removed, json!("b"));
        assert_eq!(root, json!({"tasks": ["a", "c"]}));
    }

    #[test]
    fn test_delete_out_of_bounds() {
        let mut root = json!({"tasks": []});
        let err = delete_at(&mut root, &parse_path("tasks.0").unwrap(), "tasks.0").unwrap_err();
        assert_eq!(err, EditError::IndexOutOfBounds);
    }

    #[test]
    fn test_push_onto_scalar_is_mismatch() {
        let mut root = json!({"title": "Todo"});
        let err = push_at(&mut root, &parse_path("title").unwrap(), json!("x"), "title").unwrap_err();
        assert_eq!(err.to_string(), "Type mismatch at 'title': expected array, found string");
    }

    #[test]
    fn test_pop_defaults_to_last() {
        let mut root = json!({"threats": ["xss", "csrf"]});
        let removed = pop_at(&mut root, &parse_path("threats").unwrap(), None, "threats").unwrap();
        assert_eq!(removed, json!("csrf"));
        assert_eq!(root, json!({"threats": ["xss"]}));
    }

    #[test]
    fn test_pop_empty_array() {
        let mut root = json!({"threats": []});
        let err = pop_at(&mut root, &parse_path("threats").unwrap(), Some(0), "threats").unwrap_err();
        assert_eq!(err, EditError::EmptyArray);
    }
}

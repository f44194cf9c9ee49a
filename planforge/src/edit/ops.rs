//! Edit operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::parse_path;
use super::tree;
use crate::errors::EditError;

/// One deterministic, path-addressed mutation of an artifact.
///
/// Serialized with an `op` tag:
///
/// ```json
/// {"op": "set_at_path", "artifact_id": "architecture", "path": "apis.1.path", "value": "/todos/:id"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    /// Assigns `value`, creating missing intermediates.
    SetAtPath {
        /// Target artifact.
        artifact_id: String,
        /// Path into its content.
        path: String,
        /// New value.
        value: Value,
    },
    /// Removes a key or array element.
    DeleteAtPath {
        /// Target artifact.
        artifact_id: String,
        /// Path into its content.
        path: String,
    },
    /// Appends to an array, creating it if absent.
    AddArrayItem {
        /// Target artifact.
        artifact_id: String,
        /// Path of the array.
        path: String,
        /// Item to append.
        value: Value,
    },
    /// Removes an array element, the last one by default.
    RemoveArrayItem {
        /// Target artifact.
        artifact_id: String,
        /// Path of the array.
        path: String,
        /// Element to remove.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
}

impl EditOp {
    /// Builds a `set_at_path` operation.
    pub fn set(artifact_id: impl Into<String>, path: impl Into<String>, value: Value) -> Self {
        Self::SetAtPath {
            artifact_id: artifact_id.into(),
            path: path.into(),
            value,
        }
    }

    /// Builds a `delete_at_path` operation.
    pub fn delete(artifact_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::DeleteAtPath {
            artifact_id: artifact_id.into(),
            path: path.into(),
        }
    }

    /// Builds an `add_array_item` operation.
    pub fn add_item(artifact_id: impl Into<String>, path: impl Into<String>, value: Value) -> Self {
        Self::AddArrayItem {
            artifact_id: artifact_id.into(),
            path: path.into(),
            value,
        }
    }

    /// Builds a `remove_array_item` operation.
    pub fn remove_item(artifact_id: impl Into<String>, path: impl Into<String>, index: Option<usize>) -> Self {
        Self::RemoveArrayItem {
            artifact_id: artifact_id.into(),
            path: path.into(),
            index,
        }
    }

    /// The artifact this operation targets.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        match self {
            Self::SetAtPath { artifact_id, .. }
            | Self::DeleteAtPath { artifact_id, .. }
            | Self::AddArrayItem { artifact_id, .. }
            | Self::RemoveArrayItem { artifact_id, .. } => artifact_id,
        }
    }

    /// The path this operation addresses.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::SetAtPath { path, .. }
            | Self::DeleteAtPath { path, .. }
            | Self::AddArrayItem { path, .. }
            | Self::RemoveArrayItem { path, .. } => path,
        }
    }

    /// The wire name of the operation.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SetAtPath { .. } => "set_at_path",
            Self::DeleteAtPath { .. } => "delete_at_path",
            Self::AddArrayItem { .. } => "add_array_item",
            Self::RemoveArrayItem { .. } => "remove_array_item",
        }
    }

    /// Applies the operation to `content` in place.
    ///
    /// On error `content` may be partially modified; callers that need
    /// atomicity apply to a copy.
    pub fn apply_to(&self, content: &mut Value) -> Result<(), EditError> {
        let path = self.path();
        let segments = parse_path(path)?;

        match self {
            Self::SetAtPath { value, .. } => tree::set_at(content, &segments, value.clone(), path),
            Self::DeleteAtPath { .. } => tree::delete_at(content, &segments, path).map(drop),
            Self::AddArrayItem { value, .. } => {
                tree::push_at(content, &segments, value.clone(), path).map(drop)
            }
            Self::RemoveArrayItem { index, .. } => {
                tree::pop_at(content, &segments, *index, path).map(drop)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let op: EditOp = serde_json::from_value(json!({
            "op": "remove_array_item",
            "artifact_id": "security",
            "path": "threats"
        }))
        .unwrap();

        assert_eq!(op, EditOp::remove_item("security", "threats", None));
        assert_eq!(op.kind(), "remove_array_item");
        assert_eq!(
            serde_json::to_value(EditOp::set("ui", "screens.0.name", json!("Home"))).unwrap(),
            json!({"op": "set_at_path", "artifact_id": "ui", "path": "screens.0.name", "value": "Home"})
        );
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let parsed = serde_json::from_value::<EditOp>(json!({
            "op": "rename_key",
            "artifact_id": "ui",
            "path": "screens"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_set_then_delete_leaves_empty_parent() {
        let mut content = json!({});
        EditOp::set("a", "a.b", json!(5)).apply_to(&mut content).unwrap();
        assert_eq!(content, json!({"a": {"b": 5}}));

        EditOp::delete("a", "a.b").apply_to(&mut content).unwrap();
        assert_eq!(content, json!({"a": {}}));
    }

    #[test]
    fn test_add_array_item_creates_then_appends() {
        let mut content = json!({});
        EditOp::add_item("x", "tags", json!("a")).apply_to(&mut content).unwrap();
        EditOp::add_item("x", "tags", json!("b")).apply_to(&mut content).unwrap();
        assert_eq!(content, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_delete_missing_key_is_error() {
        let mut content = json!({"a": {}});
        let err = EditOp::delete("x", "a.b").apply_to(&mut content).unwrap_err();
        assert_eq!(err, EditError::PathNotFound("a.b".to_string()));
    }

    #[test]
    fn test_invalid_path_surfaces() {
        let mut content = json!({});
        let err = EditOp::set("x", "a..b", json!(1)).apply_to(&mut content).unwrap_err();
        assert!(matches!(err, EditError::InvalidPath { .. }));
    }
}

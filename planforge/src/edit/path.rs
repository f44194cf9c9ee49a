//! Path expressions addressing a node inside artifact content.
//!
//! Grammar: dot-separated segments, each a key optionally followed by
//! bracket indices. A segment made only of digits is an index.
//!
//! ```text
//! apis.1.path
//! user_stories[2].title
//! matrix[0][3]
//! ```

use std::fmt;

use crate::errors::EditError;

/// One resolved step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

impl PathSegment {
    /// Kind of container this segment addresses.
    #[must_use]
    pub const fn container_kind(&self) -> &'static str {
        match self {
            Self::Key(_) => "object",
            Self::Index(_) => "array",
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Parses a path into segments.
///
/// # Errors
///
/// Returns [`EditError::InvalidPath`] for empty paths, empty segments,
/// unbalanced brackets or non-numeric bracket contents.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, EditError> {
    let invalid = |reason: &str| EditError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.trim().is_empty() {
        return Err(invalid("path is empty"));
    }

    let mut segments = Vec::new();
    for (position, part) in path.split('.').enumerate() {
        let (key, mut rest) = part.find('[').map_or((part, ""), |at| part.split_at(at));

        if key.is_empty() && (rest.is_empty() || position > 0) {
            return Err(invalid("empty segment"));
        }
        if key.contains(']') {
            return Err(invalid("unexpected ']'"));
        }
        if !key.is_empty() {
            segments.push(if is_index(key) {
                PathSegment::Index(parse_index(key).ok_or_else(|| invalid("index too large"))?)
            } else {
                PathSegment::Key(key.to_string())
            });
        }

        while !rest.is_empty() {
            let Some(inner) = rest.strip_prefix('[') else {
                return Err(invalid("expected '[' after ']'"));
            };
            let Some(close) = inner.find(']') else {
                return Err(invalid("unclosed '['"));
            };
            let digits = &inner[..close];
            if !is_index(digits) {
                return Err(invalid("bracket index must be a non-negative integer"));
            }
            segments.push(PathSegment::Index(
                parse_index(digits).ok_or_else(|| invalid("index too large"))?,
            ));
            rest = &inner[close + 1..];
        }
    }

    Ok(segments)
}

fn is_index(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn parse_index(text: &str) -> Option<usize> {
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn test_dotted_keys() {
        assert_eq!(parse_path("a.b.c").unwrap(), vec![key("a"), key("b"), key("c")]);
    }

    #[test]
    fn test_numeric_dot_segment_is_index() {
        assert_eq!(
            parse_path("apis.1.path").unwrap(),
            vec![key("apis"), PathSegment::Index(1), key("path")]
        );
    }

    #[test]
    fn test_bracket_indices() {
        assert_eq!(
            parse_path("user_stories[2].title").unwrap(),
            vec![key("user_stories"), PathSegment::Index(2), key("title")]
        );
        assert_eq!(
            parse_path("matrix[0][3]").unwrap(),
            vec![key("matrix"), PathSegment::Index(0), PathSegment::Index(3)]
        );
        assert_eq!(parse_path("[4].name").unwrap(), vec![PathSegment::Index(4), key("name")]);
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["", "  ", "a..b", ".a", "a.", "a[", "a[x]", "a[-1]", "a[1]b", "a]", "a.[0]"] {
            assert!(
                matches!(parse_path(path), Err(EditError::InvalidPath { .. })),
                "{path:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_path_message() {
        let err = parse_path("tasks[one]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid path 'tasks[one]': bracket index must be a non-negative integer"
        );
    }

    #[test]
    fn test_segment_display() {
        let rendered: Vec<String> = parse_path("apis[0].path")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["apis", "0", "path"]);
    }
}

//! Deterministic editing of generated artifacts.
//!
//! Edits are path-addressed mutations applied after a run, without
//! involving the generator:
//!
//! ```rust,ignore
//! use planforge::edit::{apply, EditOp};
//!
//! let result = apply(&artifacts, &[
//!     EditOp::set("architecture", "apis.1.path", json!("/todos/:id")),
//!     EditOp::add_item("security", "threats", json!({"title": "CSRF"})),
//! ]);
//! for failure in &result.errors {
//!     eprintln!("{}: {}", failure.op.path(), failure.error);
//! }
//! ```

mod engine;
mod ops;
mod path;
mod tree;

pub use engine::{apply, EditFailure, EditResult};
pub use ops::EditOp;
pub use path::{parse_path, PathSegment};

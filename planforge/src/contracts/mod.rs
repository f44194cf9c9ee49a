//! Schema contracts for step outputs.
//!
//! A contract lists the top-level fields a step's content must carry and
//! the JSON kind of each. Validation runs only on complete values.

mod schema;

pub use schema::{kind_of, FieldKind, FieldRule, SchemaContract, ValidationError};

//! Generator configuration: JSON-facing definitions, schema validation and the runtime category
//! tree.

/// JSON boundary object for a generator document.
pub mod document;
/// Serde definition types for the configuration document.
pub mod model;
/// Validated category tree and reference lookup.
pub mod tree;
pub(crate) mod validate;

//! Trait resolution: the recursive walk over the category tree.

/// Trait-value and trait-type formatting.
pub mod naming;
/// Resolution output types and trait deduplication.
pub mod resolution;
/// The recursive resolver.
pub mod resolver;

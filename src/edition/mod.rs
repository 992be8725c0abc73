//! Edition driver: per-item resolution, rendering and metadata assembly.

/// Item scheduling and production.
pub mod driver;
/// Metadata record assembly.
pub mod metadata;

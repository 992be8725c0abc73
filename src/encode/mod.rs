//! Item output: sinks that persist rendered items.

/// Sink trait, filesystem writer and in-memory collector.
pub mod sink;

//! Error taxonomy and small shared value types.

/// Canvas and placement types.
pub mod core;
/// Error type and result alias.
pub mod error;

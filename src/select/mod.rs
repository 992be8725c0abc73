//! Probability extraction and weighted random selection.

/// Weighted selector over an ordered candidate distribution.
pub mod sampler;
/// Probability extraction from weight-marked asset names.
pub mod weights;

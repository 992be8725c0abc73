use std::sync::LazyLock;

use regex::Regex;

use crate::foundation::error::LayergenResult;
use crate::select::sampler::WeightedSet;

/// Embedded weight marker: `#<digits>` with an optional fractional part, read as a percentage.
static WEIGHT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+(?:\.\d+)?)").expect("weight marker pattern is valid"));

/// Unnormalized weight for one asset name.
///
/// `red#80.png` weighs `0.8`; names without a marker weigh `1.0`.
pub fn marker_weight(name: &str) -> f64 {
    WEIGHT_MARKER
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|pct| pct / 100.0)
        .unwrap_or(1.0)
}

/// Remove the first weight marker from `name`.
pub fn strip_marker(name: &str) -> String {
    WEIGHT_MARKER.replace(name, "").into_owned()
}

/// Probability distribution over the asset names of one directory.
///
/// Probabilities follow the names' order and sum to 1. An empty listing gives an empty set (the
/// caller decides how to fail); a listing whose markers are all zero is a configuration error.
pub fn extract_probabilities<S: AsRef<str>>(names: &[S]) -> LayergenResult<WeightedSet<String>> {
    let raw = names
        .iter()
        .map(|n| {
            let n = n.as_ref();
            (n.to_string(), marker_weight(n))
        })
        .collect();
    WeightedSet::normalize(raw)
}

#[cfg(test)]
#[path = "../../tests/unit/select/weights.rs"]
mod tests;

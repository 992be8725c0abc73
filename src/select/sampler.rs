use rand::Rng;

use crate::foundation::error::{LayergenError, LayergenResult};

/// Ordered candidate distribution.
///
/// Iteration order is significant: selection accumulates probabilities in insertion order and
/// returns the first candidate whose cumulative sum reaches the draw.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedSet<T> {
    entries: Vec<(T, f64)>,
}

impl<T> Default for WeightedSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> WeightedSet<T> {
    /// Wrap already-normalized `(candidate, probability)` pairs.
    pub fn from_normalized(entries: Vec<(T, f64)>) -> Self {
        Self { entries }
    }

    /// Normalize raw non-negative weights so they sum to 1.
    ///
    /// An empty input yields an empty set. A non-empty input whose weights sum to zero (or that
    /// carries a negative or non-finite weight) is a configuration error.
    pub fn normalize(raw: Vec<(T, f64)>) -> LayergenResult<Self> {
        if raw.is_empty() {
            return Ok(Self::default());
        }
        if raw.iter().any(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(LayergenError::config(
                "weights must be finite and non-negative",
            ));
        }
        let total: f64 = raw.iter().map(|(_, w)| *w).sum();
        if total <= 0.0 {
            return Err(LayergenError::config(
                "weights sum to zero; at least one candidate needs a positive weight",
            ));
        }
        Ok(Self {
            entries: raw.into_iter().map(|(c, w)| (c, w / total)).collect(),
        })
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Probability of `candidate`, if present.
    pub fn probability_of(&self, candidate: &T) -> Option<f64>
    where
        T: PartialEq,
    {
        self.entries
            .iter()
            .find(|(c, _)| c == candidate)
            .map(|(_, p)| *p)
    }

    /// Borrow the `(candidate, probability)` pairs in selection order.
    pub fn entries(&self) -> &[(T, f64)] {
        &self.entries
    }

    /// Pick a candidate using one uniform draw in `[0, 1)` from `rng`.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        if self.entries.is_empty() {
            return None;
        }
        self.select_with_draw(rng.r#gen::<f64>())
    }

    /// Pick the first candidate whose cumulative probability is `>= draw`.
    ///
    /// Zero-probability candidates are never returned while a positive one exists. Cumulative sums
    /// can fall fractionally short of 1.0; a draw past the final sum clamps to the last candidate.
    /// Returns `None` only for an empty set.
    pub fn select_with_draw(&self, draw: f64) -> Option<&T> {
        let mut sum = 0.0;
        for (candidate, p) in &self.entries {
            sum += *p;
            if *p > 0.0 && draw <= sum {
                return Some(candidate);
            }
        }
        self.entries
            .iter()
            .rev()
            .find(|(_, p)| *p > 0.0)
            .or(self.entries.last())
            .map(|(c, _)| c)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/select/sampler.rs"]
mod tests;

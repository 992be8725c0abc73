use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Placement;

/// One `(trait_type, value)` pair of an item, already formatted for metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitRecord {
    /// Humanized category name.
    pub trait_type: String,
    /// Formatted value.
    pub value: String,
}

impl TraitRecord {
    /// Build a record.
    pub fn new(trait_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: value.into(),
        }
    }
}

/// A trait record plus the raw names it was produced from.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTrait {
    /// Category name as written in the configuration.
    pub category: String,
    /// Selected subcategory name, child name or cleaned file name, before humanization.
    pub raw_value: String,
    /// Formatted record.
    pub record: TraitRecord,
    /// Asset drawn for this trait. `None` for branch and group picks, which have no layer.
    pub asset: Option<PathBuf>,
}

/// One asset to draw, in render order.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRef {
    /// Category that produced the layer.
    pub category: String,
    /// Asset file name as listed.
    pub file: String,
    /// Location handed to the compositor.
    pub path: PathBuf,
    /// Natural asset size from the probe.
    pub natural: (u32, u32),
    /// Placement on the canvas.
    pub placement: Placement,
}

/// A layer dropped because its asset could not be used.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedLayer {
    /// Category whose layer was dropped.
    pub category: String,
    /// Offending asset.
    pub path: PathBuf,
    /// Human-readable cause.
    pub reason: String,
}

/// Output of resolving one category (or a whole item).
///
/// Resolution never mutates shared state; callers merge child results with [`Resolution::extend`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    /// Trait records in resolution order, duplicates included.
    pub traits: Vec<ResolvedTrait>,
    /// Layers in render order.
    pub layers: Vec<LayerRef>,
    /// Layers dropped by per-asset failures.
    pub skipped: Vec<SkippedLayer>,
}

impl Resolution {
    /// Append `other` after everything already resolved.
    pub fn extend(&mut self, other: Resolution) {
        self.traits.extend(other.traits);
        self.layers.extend(other.layers);
        self.skipped.extend(other.skipped);
    }

    /// Drop the layers in `undrawn` together with the traits they produced.
    ///
    /// Called with the compositor's decode failures, so metadata never lists a layer that is
    /// not in the image.
    pub fn drop_undrawn(&mut self, undrawn: Vec<SkippedLayer>) {
        if undrawn.is_empty() {
            return;
        }
        let paths: HashSet<&PathBuf> = undrawn.iter().map(|s| &s.path).collect();
        self.traits
            .retain(|t| t.asset.as_ref().is_none_or(|p| !paths.contains(p)));
        self.layers.retain(|l| !paths.contains(&l.path));
        self.skipped.extend(undrawn);
    }

    /// Trait records deduplicated by `(trait_type, value)`, first occurrence kept in place.
    pub fn unique_traits(&self) -> Vec<TraitRecord> {
        dedup_traits(self.traits.iter().map(|t| &t.record))
    }
}

/// Deduplicate records by full equality, keeping first-occurrence order.
pub fn dedup_traits<'a>(records: impl IntoIterator<Item = &'a TraitRecord>) -> Vec<TraitRecord> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for r in records {
        if seen.insert(r) {
            out.push(r.clone());
        }
    }
    out
}

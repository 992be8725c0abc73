use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{LayergenError, LayergenResult};
use crate::resolve::resolution::TraitRecord;

/// Identity columns, in output order.
pub const IDENTITY_FIELDS: [&str; 5] = ["filename", "title", "nbcopies", "nbself", "description"];

/// Metadata record written next to each rendered item.
///
/// Serializes as one flat JSON object: identity fields first, then one property per trait.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// `<prefix>-<n>.png`.
    pub filename: String,
    /// `<prefix>-<n>`.
    pub title: String,
    /// Always `"1"`.
    pub nbcopies: String,
    /// Always `"0"`.
    pub nbself: String,
    /// Fixed description of the edition configuration.
    pub description: String,
    /// Trait type -> value.
    #[serde(flatten)]
    pub traits: IndexMap<String, String>,
}

impl ItemMetadata {
    /// Assemble the record for item `number` of an edition named `prefix`.
    ///
    /// A trait whose type is already present overwrites the earlier value in place.
    pub fn build(prefix: &str, number: u64, description: &str, traits: &[TraitRecord]) -> Self {
        let title = item_stem(prefix, number);
        let mut map = IndexMap::with_capacity(traits.len());
        for t in traits {
            map.insert(t.trait_type.clone(), t.value.clone());
        }
        Self {
            filename: format!("{title}.png"),
            title,
            nbcopies: "1".to_string(),
            nbself: "0".to_string(),
            description: description.to_string(),
            traits: map,
        }
    }

    /// Two-space indented JSON document.
    pub fn to_json_pretty(&self) -> LayergenResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LayergenError::serde(format!("serialize metadata '{}': {e}", self.title)))
    }
}

/// File stem shared by an item's image and metadata files.
pub fn item_stem(prefix: &str, number: u64) -> String {
    format!("{prefix}-{number}")
}

#[cfg(test)]
#[path = "../../tests/unit/edition/metadata.rs"]
mod tests;

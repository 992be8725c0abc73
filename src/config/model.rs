use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{Anchor, Canvas};

/// Root of a generator document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorDef {
    /// Default output canvas for every edition configuration.
    #[serde(default)]
    pub canvas: Canvas,
    /// Global category table, keyed by category name.
    #[serde(default)]
    pub layers: IndexMap<String, CategoryDef>,
    /// Conditional bonus layers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<TriggerRuleDef>,
    /// Edition configurations, generated in listed order.
    #[serde(rename = "layerConfigurations")]
    pub layer_configurations: Vec<EditionDef>,
}

/// How a group category resolves its nested layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    /// Every nested layer is resolved, in order.
    #[default]
    All,
    /// One nested layer is chosen by weight and recorded as a trait.
    One,
}

/// A category node: exactly one of `path` (leaf), `subcategories` (branch) or `layers` (group).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Directory of candidate assets, relative to the assets root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Weighted subcategories, in selection order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategories: Option<IndexMap<String, SubcategoryDef>>,
    /// Nested layers of a group category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<LayerRefDef>>,
    /// Group resolution mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<Pick>,
    /// Humanize trait values recorded by this category (default `true`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humanize: Option<bool>,
    /// Child name resolved after every other child of this branch or group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred: Option<String>,
    /// Explicit layer width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Explicit layer height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Layer anchor on the canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
}

/// Borrowed view of a category's structural kind.
#[derive(Debug, Clone, Copy)]
pub enum CategoryShape<'a> {
    /// Bound to an asset directory.
    Leaf(&'a str),
    /// Bound to weighted subcategories.
    Branch(&'a IndexMap<String, SubcategoryDef>),
    /// Bound to nested layers.
    Group(&'a [LayerRefDef], Pick),
}

impl CategoryDef {
    /// Leaf category bound to `path`.
    pub fn leaf(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Branch category over `subcategories`.
    pub fn branch(subcategories: IndexMap<String, SubcategoryDef>) -> Self {
        Self {
            subcategories: Some(subcategories),
            ..Default::default()
        }
    }

    /// Group category over `layers`.
    pub fn group(layers: Vec<LayerRefDef>, pick: Pick) -> Self {
        Self {
            layers: Some(layers),
            pick: Some(pick),
            ..Default::default()
        }
    }

    /// `true` when any structural field is present.
    pub fn has_shape(&self) -> bool {
        self.path.is_some() || self.subcategories.is_some() || self.layers.is_some()
    }

    /// Structural kind, or `None` when zero or several structural fields are set.
    pub fn shape(&self) -> Option<CategoryShape<'_>> {
        match (&self.path, &self.subcategories, &self.layers) {
            (Some(p), None, None) => Some(CategoryShape::Leaf(p)),
            (None, Some(s), None) => Some(CategoryShape::Branch(s)),
            (None, None, Some(l)) => Some(CategoryShape::Group(l, self.pick.unwrap_or_default())),
            _ => None,
        }
    }

    /// Whether trait values recorded by this category are humanized.
    pub fn humanizes(&self) -> bool {
        self.humanize.unwrap_or(true)
    }
}

/// A weighted subcategory of a branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryDef {
    /// Relative weight among sibling subcategories.
    pub probability: f64,
    /// Child layers resolved when this subcategory is chosen.
    #[serde(default)]
    pub layers: Vec<LayerRefDef>,
    /// Branch-specific variants of categories, keyed by category name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub overrides: IndexMap<String, CategoryDef>,
}

/// Reference to a category by name, optionally carrying an inline definition.
///
/// Deserializes from either a bare string (`"eyes"`) or an object
/// (`{"name": "eyes", "path": "layers/eyes"}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerRefDef {
    /// Category name; also the trait type label.
    pub name: String,
    /// Weight inside a single-pick group (default 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Inline definition and placement overrides.
    #[serde(flatten)]
    pub def: CategoryDef,
}

impl LayerRefDef {
    /// Reference by name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reference carrying an inline definition.
    pub fn inline(name: impl Into<String>, def: CategoryDef) -> Self {
        Self {
            name: name.into(),
            weight: None,
            def,
        }
    }
}

impl<'de> Deserialize<'de> for LayerRefDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Full {
            name: String,
            #[serde(default)]
            weight: Option<f64>,
            #[serde(flatten)]
            def: CategoryDef,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Full(Full),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Name(name) => Ok(Self::named(name)),
            Repr::Full(f) => Ok(Self {
                name: f.name,
                weight: f.weight,
                def: f.def,
            }),
        }
    }
}

/// Conditional bonus layers fired by one resolved trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRuleDef {
    /// Category name that must resolve.
    pub trait_type: String,
    /// Raw value (marker and extension stripped) that fires the rule.
    pub value: String,
    /// Global leaf categories resolved when the rule fires.
    pub layers: Vec<String>,
}

/// One edition configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionDef {
    /// Top-level categories resolved for every item, in order.
    pub layers_order: Vec<LayerRefDef>,
    /// Number of items to generate.
    pub grow_edition_size_to: u64,
    /// File and title prefix.
    pub name_prefix: String,
    /// Fixed description copied into every item.
    #[serde(default)]
    pub description: String,
    /// First sequence number.
    #[serde(default)]
    pub start_number: u64,
    /// Canvas override for this configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Canvas>,
}

/// Item count across `editions`, or `None` when it does not fit in a `u64`.
pub fn total_edition_size(editions: &[EditionDef]) -> Option<u64> {
    editions
        .iter()
        .try_fold(0u64, |acc, e| acc.checked_add(e.grow_edition_size_to))
}

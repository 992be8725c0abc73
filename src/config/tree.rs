use indexmap::IndexMap;

use crate::config::document::GeneratorConfig;
use crate::config::model::{
    CategoryDef, CategoryShape, EditionDef, GeneratorDef, SubcategoryDef, TriggerRuleDef,
};
use crate::foundation::core::Canvas;
use crate::foundation::error::{LayergenError, LayergenResult};

/// Active branch context: the chain of subcategories selected above the current node.
///
/// Innermost frame last. A selected subcategory may own its own variant of a category, which
/// shadows the global definition for everything resolved below it.
#[derive(Debug, Clone, Default)]
pub struct BranchContext<'t> {
    frames: Vec<(&'t str, &'t SubcategoryDef)>,
}

impl<'t> BranchContext<'t> {
    /// Empty context used for top-level categories.
    pub fn root() -> Self {
        Self::default()
    }

    /// Context for children of `subcategory` (named `name`).
    pub fn enter(&self, name: &'t str, subcategory: &'t SubcategoryDef) -> Self {
        let mut frames = self.frames.clone();
        frames.push((name, subcategory));
        Self { frames }
    }

    /// Name of the innermost selected subcategory.
    pub fn current(&self) -> Option<&'t str> {
        self.frames.last().map(|(name, _)| *name)
    }

    /// Branch-specific variant of `name`, searching innermost first.
    pub fn variant(&self, name: &str) -> Option<&'t CategoryDef> {
        for (_, sub) in self.frames.iter().rev() {
            if let Some(def) = sub.overrides.get(name) {
                return Some(def);
            }
            if let Some(r) = sub
                .layers
                .iter()
                .find(|l| l.name == name && l.def.has_shape())
            {
                return Some(&r.def);
            }
        }
        None
    }
}

/// Where a looked-up definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefSource {
    /// Defined inline on the reference itself.
    Inline,
    /// Branch-specific variant owned by an active subcategory.
    Branch,
    /// Global category table.
    Global,
}

/// Find the definition a reference named `name` with inline part `inline` resolves to.
pub(crate) fn lookup<'t>(
    globals: &'t IndexMap<String, CategoryDef>,
    name: &str,
    inline: &'t CategoryDef,
    ctx: &BranchContext<'t>,
) -> Option<(&'t CategoryDef, DefSource)> {
    if inline.has_shape() {
        return Some((inline, DefSource::Inline));
    }
    if let Some(def) = ctx.variant(name) {
        return Some((def, DefSource::Branch));
    }
    globals.get(name).map(|def| (def, DefSource::Global))
}

/// A leaf directory reachable from some edition configuration or trigger rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSite {
    /// Category name.
    pub category: String,
    /// Asset directory, relative to the assets root.
    pub dir: String,
}

/// Validated, read-only category tree shared by every item of a run.
#[derive(Debug, Clone)]
pub struct CategoryTree {
    def: GeneratorDef,
    leaves: Vec<LeafSite>,
}

impl CategoryTree {
    /// Validate `config` and build the runtime tree.
    pub fn new(config: GeneratorConfig) -> LayergenResult<Self> {
        let def = config.into_def();
        let leaves = crate::config::validate::validate_generator(&def)
            .map_err(|e| LayergenError::config(format!("invalid generator config:\n{e}")))?;
        Ok(Self { def, leaves })
    }

    /// Build from an in-memory definition.
    pub fn from_def(def: GeneratorDef) -> LayergenResult<Self> {
        Self::new(GeneratorConfig::from_def(def))
    }

    /// Global category by name.
    pub fn global(&self, name: &str) -> Option<&CategoryDef> {
        self.def.layers.get(name)
    }

    /// Resolve a reference against the active context and the global table.
    pub fn lookup<'t>(
        &'t self,
        name: &str,
        inline: &'t CategoryDef,
        ctx: &BranchContext<'t>,
    ) -> Option<(&'t CategoryDef, DefSource)> {
        lookup(&self.def.layers, name, inline, ctx)
    }

    /// Edition configurations in run order.
    pub fn editions(&self) -> &[EditionDef] {
        &self.def.layer_configurations
    }

    /// Effective canvas for an edition configuration.
    pub fn canvas_for(&self, edition: &EditionDef) -> Canvas {
        edition.canvas.unwrap_or(self.def.canvas)
    }

    /// Trigger rules fired by a resolved `(category, raw value)` pair.
    pub fn triggers_for<'a>(
        &'a self,
        category: &'a str,
        raw_value: &'a str,
    ) -> impl Iterator<Item = (usize, &'a TriggerRuleDef)> + 'a {
        self.def.triggers.iter().enumerate().filter(move |(_, t)| {
            t.trait_type.eq_ignore_ascii_case(category) && t.value.eq_ignore_ascii_case(raw_value)
        })
    }

    /// Every leaf directory reachable from the configuration.
    pub fn leaves(&self) -> &[LeafSite] {
        &self.leaves
    }

    /// Borrow the underlying definition.
    pub fn def(&self) -> &GeneratorDef {
        &self.def
    }

    /// `Leaf` shape of a global trigger layer.
    pub(crate) fn global_leaf(&self, name: &str) -> Option<(&CategoryDef, &str)> {
        let def = self.global(name)?;
        match def.shape()? {
            CategoryShape::Leaf(dir) => Some((def, dir)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/tree.rs"]
mod tests;

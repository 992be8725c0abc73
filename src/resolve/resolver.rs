use std::collections::HashSet;
use std::path::PathBuf;

use indexmap::IndexMap;
use rand::Rng;

use crate::assets::source::AssetSource;
use crate::config::model::{CategoryDef, CategoryShape, LayerRefDef, Pick, SubcategoryDef};
use crate::config::tree::{BranchContext, CategoryTree};
use crate::foundation::core::Placement;
use crate::foundation::error::{LayergenError, LayergenResult};
use crate::resolve::naming::{clean_asset_name, humanize_trait_type, humanize_value};
use crate::resolve::resolution::{
    LayerRef, Resolution, ResolvedTrait, SkippedLayer, TraitRecord,
};
use crate::select::sampler::WeightedSet;
use crate::select::weights::extract_probabilities;

/// Walks the category tree for one item.
///
/// The resolver holds only read-only references; every call returns a fresh [`Resolution`].
pub struct Resolver<'t> {
    tree: &'t CategoryTree,
    assets: &'t dyn AssetSource,
}

impl<'t> Resolver<'t> {
    /// Resolver over `tree`, listing and probing assets through `assets`.
    pub fn new(tree: &'t CategoryTree, assets: &'t dyn AssetSource) -> Self {
        Self { tree, assets }
    }

    /// Resolve every top-level reference of `order` in sequence, then fire trigger rules.
    pub fn resolve_item<R: Rng + ?Sized>(
        &self,
        order: &'t [LayerRefDef],
        rng: &mut R,
    ) -> LayergenResult<Resolution> {
        let ctx = BranchContext::root();
        let mut out = Resolution::default();
        for r in order {
            out.extend(self.resolve(r, &ctx, rng)?);
        }
        let bonus = self.resolve_triggers(&out, rng)?;
        out.extend(bonus);
        Ok(out)
    }

    /// Resolve one reference under the active branch context.
    #[tracing::instrument(level = "debug", skip_all, fields(category = %r.name))]
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        r: &'t LayerRefDef,
        ctx: &BranchContext<'t>,
        rng: &mut R,
    ) -> LayergenResult<Resolution> {
        let (def, source) = self.tree.lookup(&r.name, &r.def, ctx).ok_or_else(|| {
            LayergenError::config(format!("unknown category '{}'", r.name))
        })?;
        let shape = def.shape().ok_or_else(|| {
            LayergenError::config(format!(
                "category '{}' must set exactly one of 'path', 'subcategories' or 'layers'",
                r.name
            ))
        })?;
        tracing::trace!(?source, branch = ?ctx.current(), "resolving");

        let humanize = r.def.humanize.or(def.humanize).unwrap_or(true);
        match shape {
            CategoryShape::Leaf(dir) => {
                self.resolve_leaf(&r.name, dir, placement(&r.def, def), humanize, rng)
            }
            CategoryShape::Branch(subs) => {
                self.resolve_branch(&r.name, def, subs, humanize, ctx, rng)
            }
            CategoryShape::Group(children, Pick::All) => {
                self.resolve_children(children, def.deferred.as_deref(), ctx, rng)
            }
            CategoryShape::Group(children, Pick::One) => {
                self.resolve_single_pick(&r.name, children, humanize, ctx, rng)
            }
        }
    }

    fn resolve_branch<R: Rng + ?Sized>(
        &self,
        name: &str,
        def: &'t CategoryDef,
        subs: &'t IndexMap<String, SubcategoryDef>,
        humanize: bool,
        ctx: &BranchContext<'t>,
        rng: &mut R,
    ) -> LayergenResult<Resolution> {
        let weights = subs
            .iter()
            .map(|(k, s)| (k.as_str(), s.probability))
            .collect::<Vec<_>>();
        let dist = WeightedSet::normalize(weights)
            .map_err(|e| in_category(e, &format!("subcategories of '{name}'")))?;
        let chosen: &'t str = dist.select(rng).copied().ok_or_else(|| {
            LayergenError::config(format!("branch '{name}' has no subcategories"))
        })?;
        let sub = subs.get(chosen).ok_or_else(|| {
            LayergenError::config(format!("branch '{name}' lost subcategory '{chosen}'"))
        })?;
        tracing::debug!(category = name, selected = chosen, "selected subcategory");

        let mut out = Resolution::default();
        out.traits.push(record(name, chosen, humanize, None));
        let inner = ctx.enter(chosen, sub);
        out.extend(self.resolve_children(&sub.layers, def.deferred.as_deref(), &inner, rng)?);
        Ok(out)
    }

    fn resolve_single_pick<R: Rng + ?Sized>(
        &self,
        name: &str,
        children: &'t [LayerRefDef],
        humanize: bool,
        ctx: &BranchContext<'t>,
        rng: &mut R,
    ) -> LayergenResult<Resolution> {
        let weights = children
            .iter()
            .map(|c| (c, c.weight.unwrap_or(1.0)))
            .collect::<Vec<_>>();
        let dist = WeightedSet::normalize(weights)
            .map_err(|e| in_category(e, &format!("layers of '{name}'")))?;
        let chosen: &'t LayerRefDef = dist
            .select(rng)
            .copied()
            .ok_or_else(|| LayergenError::config(format!("group '{name}' has no layers")))?;
        tracing::debug!(category = name, selected = %chosen.name, "selected layer");

        let mut out = Resolution::default();
        out.traits.push(record(name, &chosen.name, humanize, None));
        out.extend(self.resolve(chosen, ctx, rng)?);
        Ok(out)
    }

    /// Resolve a child list; children named `deferred` go after all the others.
    fn resolve_children<R: Rng + ?Sized>(
        &self,
        children: &'t [LayerRefDef],
        deferred: Option<&str>,
        ctx: &BranchContext<'t>,
        rng: &mut R,
    ) -> LayergenResult<Resolution> {
        let (later, now): (Vec<&LayerRefDef>, Vec<&LayerRefDef>) = children
            .iter()
            .partition(|c| deferred == Some(c.name.as_str()));

        let mut out = Resolution::default();
        for child in now.into_iter().chain(later) {
            out.extend(self.resolve(child, ctx, rng)?);
        }
        Ok(out)
    }

    /// Pick one asset from `dir`.
    ///
    /// An empty directory fails the run; an asset that cannot be probed only drops this layer.
    fn resolve_leaf<R: Rng + ?Sized>(
        &self,
        name: &str,
        dir: &str,
        placement: Placement,
        humanize: bool,
        rng: &mut R,
    ) -> LayergenResult<Resolution> {
        let names = self.assets.list(dir)?;
        let dist = extract_probabilities(&names)
            .map_err(|e| in_category(e, &format!("assets of '{name}' in '{dir}'")))?;
        let file = dist.select(rng).ok_or_else(|| {
            LayergenError::config(format!(
                "category '{name}' has no candidate assets in '{dir}'"
            ))
        })?;
        let path = self.assets.locate(dir, file);

        let natural = match self.assets.probe(&path) {
            Ok(size) => size,
            Err(e) if e.is_config() => return Err(e),
            Err(e) => {
                tracing::error!(
                    category = name,
                    path = %path.display(),
                    "skipping layer: {e}"
                );
                return Ok(Resolution {
                    skipped: vec![SkippedLayer {
                        category: name.to_string(),
                        path,
                        reason: e.to_string(),
                    }],
                    ..Default::default()
                });
            }
        };
        tracing::debug!(category = name, file = %file, "selected asset");

        let raw = clean_asset_name(file);
        Ok(Resolution {
            traits: vec![record(name, &raw, humanize, Some(path.clone()))],
            layers: vec![LayerRef {
                category: name.to_string(),
                file: file.clone(),
                path,
                natural,
                placement,
            }],
            skipped: Vec::new(),
        })
    }

    /// Resolve the bonus layers of every trigger rule matched by `resolved`.
    ///
    /// Each rule fires at most once per item, and bonus layers never fire rules themselves.
    fn resolve_triggers<R: Rng + ?Sized>(
        &self,
        resolved: &Resolution,
        rng: &mut R,
    ) -> LayergenResult<Resolution> {
        let mut fired = HashSet::new();
        let mut out = Resolution::default();
        for t in &resolved.traits {
            for (idx, rule) in self.tree.triggers_for(&t.category, &t.raw_value) {
                if !fired.insert(idx) {
                    continue;
                }
                tracing::debug!(
                    trait_type = %rule.trait_type,
                    value = %rule.value,
                    "trigger fired"
                );
                for layer in &rule.layers {
                    let (def, dir) = self.tree.global_leaf(layer).ok_or_else(|| {
                        LayergenError::config(format!(
                            "trigger layer '{layer}' must be a global leaf category"
                        ))
                    })?;
                    out.extend(self.resolve_leaf(
                        layer,
                        dir,
                        placement(def, def),
                        def.humanizes(),
                        rng,
                    )?);
                }
            }
        }
        Ok(out)
    }
}

fn record(category: &str, raw: &str, humanize: bool, asset: Option<PathBuf>) -> ResolvedTrait {
    let value = if humanize {
        humanize_value(raw)
    } else {
        raw.to_string()
    };
    ResolvedTrait {
        category: category.to_string(),
        raw_value: raw.to_string(),
        record: TraitRecord::new(humanize_trait_type(category), value),
        asset,
    }
}

/// Placement from the reference, falling back to the resolved definition.
fn placement(reference: &CategoryDef, def: &CategoryDef) -> Placement {
    Placement {
        width: reference.width.or(def.width),
        height: reference.height.or(def.height),
        anchor: reference.anchor.or(def.anchor).unwrap_or_default(),
    }
}

fn in_category(e: LayergenError, what: &str) -> LayergenError {
    match e {
        LayergenError::Config(msg) => LayergenError::config(format!("{what}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/resolver.rs"]
mod tests;

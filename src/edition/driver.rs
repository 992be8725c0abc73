use image::RgbaImage;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assets::source::AssetSource;
use crate::config::model::{EditionDef, total_edition_size};
use crate::config::tree::CategoryTree;
use crate::edition::metadata::{ItemMetadata, item_stem};
use crate::foundation::core::Canvas;
use crate::foundation::error::{LayergenError, LayergenResult};
use crate::render::compositor::Compositor;
use crate::resolve::resolution::{LayerRef, Resolution, SkippedLayer};
use crate::resolve::resolver::Resolver;
use crate::select::weights::extract_probabilities;

/// Identity of one item inside a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemTicket {
    /// Position in run order (configuration order, then sequence number).
    pub ordinal: u64,
    /// Index of the edition configuration.
    pub config_index: usize,
    /// Sequence number, starting at the configuration's `startNumber`.
    pub number: u64,
}

/// One resolved item, ready for writing.
#[derive(Clone, Debug)]
pub struct EditionItem {
    /// Where the item sits in the run.
    pub ticket: ItemTicket,
    /// `<prefix>-<n>`, shared by the image and metadata files.
    pub stem: String,
    /// Canvas the item is rendered on.
    pub canvas: Canvas,
    /// Metadata record with deduplicated traits.
    pub metadata: ItemMetadata,
    /// Layers in render order.
    pub layers: Vec<LayerRef>,
    /// Layers dropped by asset failures during resolution or compositing.
    pub skipped: Vec<SkippedLayer>,
}

/// Per-item RNG seed derived from the run seed and the item's identity.
///
/// Items never share random state, so the output does not depend on scheduling.
pub fn item_seed(run_seed: u64, config_index: usize, number: u64) -> u64 {
    let mut state = mix64(run_seed ^ 0x9E37_79B9_7F4A_7C15);
    state = mix64(state ^ config_index as u64);
    mix64(state ^ number)
}

fn mix64(mut z: u64) -> u64 {
    // SplitMix64 finalizer.
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Produces edition items from a validated tree.
///
/// The driver only holds shared references, so one instance may serve every worker thread.
pub struct EditionDriver<'t> {
    tree: &'t CategoryTree,
    assets: &'t dyn AssetSource,
    compositor: &'t dyn Compositor,
    run_seed: u64,
}

impl<'t> EditionDriver<'t> {
    pub fn new(
        tree: &'t CategoryTree,
        assets: &'t dyn AssetSource,
        compositor: &'t dyn Compositor,
        run_seed: u64,
    ) -> Self {
        Self {
            tree,
            assets,
            compositor,
            run_seed,
        }
    }

    /// Seed every item RNG derives from.
    pub fn run_seed(&self) -> u64 {
        self.run_seed
    }

    /// Number of items across all edition configurations.
    pub fn total(&self) -> u64 {
        total_edition_size(self.tree.editions()).unwrap_or(u64::MAX)
    }

    /// Every item of the run, in delivery order.
    pub fn tickets(&self) -> impl Iterator<Item = ItemTicket> + 't {
        self.tree
            .editions()
            .iter()
            .enumerate()
            .flat_map(|(config_index, e)| {
                (0..e.grow_edition_size_to).map(move |i| (config_index, e.start_number + i))
            })
            .zip(0u64..)
            .map(|((config_index, number), ordinal)| ItemTicket {
                ordinal,
                config_index,
                number,
            })
    }

    /// List every reachable leaf directory once.
    ///
    /// Fails when a directory is unreadable, empty, or weighted to zero, before anything is
    /// written.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn preflight(&self) -> LayergenResult<()> {
        for leaf in self.tree.leaves() {
            let names = self.assets.list(&leaf.dir)?;
            let dist = extract_probabilities(&names).map_err(|e| match e {
                LayergenError::Config(msg) => LayergenError::config(format!(
                    "assets of '{}' in '{}': {msg}",
                    leaf.category, leaf.dir
                )),
                other => other,
            })?;
            if dist.is_empty() {
                return Err(LayergenError::config(format!(
                    "category '{}' has no candidate assets in '{}'",
                    leaf.category, leaf.dir
                )));
            }
            tracing::debug!(
                category = %leaf.category,
                dir = %leaf.dir,
                candidates = dist.len(),
                "leaf ok"
            );
        }
        Ok(())
    }

    /// Resolve one item's traits and layers without rendering it.
    #[tracing::instrument(
        level = "debug",
        skip(self),
        fields(config = ticket.config_index, number = ticket.number)
    )]
    pub fn resolve(&self, ticket: ItemTicket) -> LayergenResult<EditionItem> {
        let (edition, resolution) = self.resolution(ticket)?;
        Ok(self.assemble(ticket, edition, resolution))
    }

    /// Resolve and render one item.
    ///
    /// Layers the compositor could not decode are removed from the item together with their
    /// traits before the metadata is built.
    pub fn produce(&self, ticket: ItemTicket) -> LayergenResult<(EditionItem, RgbaImage)> {
        let (edition, mut resolution) = self.resolution(ticket)?;
        let composite = self
            .compositor
            .render(&resolution.layers, self.tree.canvas_for(edition))?;
        resolution.drop_undrawn(composite.skipped);
        Ok((self.assemble(ticket, edition, resolution), composite.image))
    }

    fn resolution(&self, ticket: ItemTicket) -> LayergenResult<(&'t EditionDef, Resolution)> {
        let edition = self.tree.editions().get(ticket.config_index).ok_or_else(|| {
            LayergenError::config(format!(
                "edition configuration {} does not exist",
                ticket.config_index
            ))
        })?;

        let mut rng =
            StdRng::seed_from_u64(item_seed(self.run_seed, ticket.config_index, ticket.number));
        let resolution =
            Resolver::new(self.tree, self.assets).resolve_item(&edition.layers_order, &mut rng)?;
        Ok((edition, resolution))
    }

    fn assemble(
        &self,
        ticket: ItemTicket,
        edition: &EditionDef,
        resolution: Resolution,
    ) -> EditionItem {
        let traits = resolution.unique_traits();
        EditionItem {
            ticket,
            stem: item_stem(&edition.name_prefix, ticket.number),
            canvas: self.tree.canvas_for(edition),
            metadata: ItemMetadata::build(
                &edition.name_prefix,
                ticket.number,
                &edition.description,
                &traits,
            ),
            layers: resolution.layers,
            skipped: resolution.skipped,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/edition/driver.rs"]
mod tests;

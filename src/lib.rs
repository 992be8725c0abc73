//! Layergen generates editions of layered images from weighted asset directories.
//!
//! A JSON document describes a tree of categories: leaves bound to asset directories, branches
//! with weighted subcategories, and groups of simultaneous layers. Every item of an edition is an
//! independent weighted walk of that tree producing trait records plus an ordered layer list,
//! which is composited into one PNG and described by one JSON metadata file.
//!
//! - Load and validate a [`GeneratorConfig`], then build a [`CategoryTree`]
//! - Create a [`GenerateSession`] and stream items into an [`ItemSink`]
//! - Aggregate written metadata with [`export_csv`]
#![forbid(unsafe_code)]

/// Asset listing, probing and decoding.
pub mod assets;
/// Generator document model, validation and the runtime category tree.
pub mod config;
/// Per-item production and metadata assembly.
pub mod edition;
/// Item sinks.
pub mod encode;
/// Bulk CSV export.
pub mod export;
mod foundation;
/// Layer compositing.
pub mod render;
/// Trait resolution.
pub mod resolve;
/// Weighted selection and weight markers.
pub mod select;
/// Session-oriented generation API.
pub mod session;

pub use crate::foundation::core::{Anchor, Canvas, Placement};
pub use crate::foundation::error::{LayergenError, LayergenResult};

pub use crate::assets::source::{AssetSource, FsAssetSource};
pub use crate::config::document::GeneratorConfig;
pub use crate::config::tree::CategoryTree;
pub use crate::edition::driver::{EditionDriver, EditionItem, ItemTicket};
pub use crate::edition::metadata::ItemMetadata;
pub use crate::encode::sink::{FsItemSink, InMemorySink, ItemSink, SinkConfig};
pub use crate::export::csv::{export_csv, load_metadata_dir, write_csv_file};
pub use crate::render::compositor::{Composite, Compositor, ImageCompositor};
pub use crate::resolve::resolution::{Resolution, TraitRecord};
pub use crate::resolve::resolver::Resolver;
pub use crate::select::sampler::WeightedSet;
pub use crate::select::weights::extract_probabilities;
pub use crate::session::generate_session::{
    GenerateSession, GenerateSessionOpts, ItemFailure, RunReport,
};

use std::path::{Path, PathBuf};

use anyhow::Context;
use image::RgbaImage;

use crate::edition::driver::EditionItem;
use crate::foundation::error::{LayergenError, LayergenResult};

/// Configuration provided to an [`ItemSink`] at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Items the run will deliver.
    pub items_total: u64,
    /// Seed the run was generated with.
    pub run_seed: u64,
}

/// Sink contract for consuming rendered items in run order.
///
/// Ordering contract: `push_item` is called in strictly increasing ticket ordinal order
/// (configuration order, then sequence number).
pub trait ItemSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> LayergenResult<()>;
    fn push_item(&mut self, item: &EditionItem, image: &RgbaImage) -> LayergenResult<()>;
    fn end(&mut self) -> LayergenResult<()>;
}

/// Writes `<prefix>-<n>.png` and `<prefix>-<n>.json` into an output directory.
#[derive(Debug, Clone)]
pub struct FsItemSink {
    out_dir: PathBuf,
    write_retries: u32,
}

impl FsItemSink {
    /// Sink writing into `out_dir` (created on `begin` when missing).
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            write_retries: 2,
        }
    }

    /// Retry each failed write up to `retries` more times.
    pub fn with_write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries;
        self
    }

    /// Directory items are written into.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn write_with_retries(
        &self,
        path: &Path,
        mut write: impl FnMut(&Path) -> anyhow::Result<()>,
    ) -> LayergenResult<()> {
        let mut attempt = 0u32;
        loop {
            match write(path) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.write_retries => {
                    attempt += 1;
                    tracing::warn!(
                        path = %path.display(),
                        attempt,
                        error = %format!("{e:#}"),
                        "write failed, retrying"
                    );
                }
                Err(e) => return Err(LayergenError::output(format!("{e:#}"))),
            }
        }
    }
}

impl ItemSink for FsItemSink {
    fn begin(&mut self, cfg: SinkConfig) -> LayergenResult<()> {
        std::fs::create_dir_all(&self.out_dir).map_err(|e| {
            LayergenError::output(format!(
                "create output dir '{}': {e}",
                self.out_dir.display()
            ))
        })?;
        tracing::info!(
            out_dir = %self.out_dir.display(),
            items = cfg.items_total,
            "writing items"
        );
        Ok(())
    }

    fn push_item(&mut self, item: &EditionItem, image: &RgbaImage) -> LayergenResult<()> {
        let png_path = self.out_dir.join(&item.metadata.filename);
        self.write_with_retries(&png_path, |p| {
            image::save_buffer_with_format(
                p,
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
                image::ImageFormat::Png,
            )
            .with_context(|| format!("write png '{}'", p.display()))
        })?;

        let json = item.metadata.to_json_pretty()?;
        let json_path = self.out_dir.join(format!("{}.json", item.stem));
        self.write_with_retries(&json_path, |p| {
            std::fs::write(p, json.as_bytes())
                .with_context(|| format!("write metadata '{}'", p.display()))
        })?;

        tracing::info!(
            item = %item.stem,
            layers = item.layers.len(),
            skipped = item.skipped.len(),
            "wrote item"
        );
        Ok(())
    }

    fn end(&mut self) -> LayergenResult<()> {
        Ok(())
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    /// Items in run order.
    pub items: Vec<(EditionItem, RgbaImage)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// `true` once `end` has been called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl ItemSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> LayergenResult<()> {
        self.cfg = Some(cfg);
        self.items.clear();
        self.ended = false;
        Ok(())
    }

    fn push_item(&mut self, item: &EditionItem, image: &RgbaImage) -> LayergenResult<()> {
        self.items.push((item.clone(), image.clone()));
        Ok(())
    }

    fn end(&mut self) -> LayergenResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;

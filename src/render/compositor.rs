use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::assets::decode::read_layer;
use crate::foundation::core::Canvas;
use crate::foundation::error::LayergenResult;
use crate::resolve::resolution::{LayerRef, SkippedLayer};

/// Result of compositing one item.
#[derive(Debug, Clone)]
pub struct Composite {
    /// Final straight-alpha RGBA image at canvas size.
    pub image: RgbaImage,
    /// Layers that failed to decode and were left out.
    pub skipped: Vec<SkippedLayer>,
}

/// Rendering gateway.
///
/// Layers are drawn in the given order, each alpha-composited over everything before it.
pub trait Compositor: Send + Sync {
    /// Render `layers` onto a transparent canvas.
    fn render(&self, layers: &[LayerRef], canvas: Canvas) -> LayergenResult<Composite>;
}

/// [`Compositor`] decoding layers from disk with the `image` crate.
#[derive(Clone, Copy, Debug)]
pub struct ImageCompositor {
    filter: FilterType,
}

impl Default for ImageCompositor {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl ImageCompositor {
    /// Compositor using `filter` when a layer must be resized.
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Compositor for ImageCompositor {
    #[tracing::instrument(level = "debug", skip_all, fields(layers = layers.len()))]
    fn render(&self, layers: &[LayerRef], canvas: Canvas) -> LayergenResult<Composite> {
        let mut image = RgbaImage::new(canvas.width, canvas.height);
        let mut skipped = Vec::new();

        for layer in layers {
            let decoded = match read_layer(&layer.path) {
                Ok(img) => img,
                Err(e) => {
                    tracing::error!(
                        category = %layer.category,
                        path = %layer.path.display(),
                        error = %e,
                        "skipping layer that failed to decode"
                    );
                    skipped.push(SkippedLayer {
                        category: layer.category.clone(),
                        path: layer.path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let (x, y, w, h) = layer.placement.rect(decoded.dimensions(), canvas);
            if w == 0 || h == 0 {
                continue;
            }
            let top = if decoded.dimensions() == (w, h) {
                decoded
            } else {
                imageops::resize(&decoded, w, h, self.filter)
            };
            imageops::overlay(&mut image, &top, x, y);
        }

        Ok(Composite { image, skipped })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;

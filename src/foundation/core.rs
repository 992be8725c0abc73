use crate::foundation::error::{LayergenError, LayergenResult};

/// Output canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas with non-zero dimensions.
    pub fn new(width: u32, height: u32) -> LayergenResult<Self> {
        if width == 0 || height == 0 {
            return Err(LayergenError::config("canvas width and height must be > 0"));
        }
        Ok(Self { width, height })
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1772,
            height: 1772,
        }
    }
}

/// Where a layer lands on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Centered on the canvas at its natural (or overridden) size.
    #[default]
    Center,
    /// Top-left corner at the canvas origin.
    TopLeft,
    /// Stretched over the whole canvas.
    Fill,
}

/// Placement of one layer: optional size override plus anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Placement {
    /// Explicit width; natural asset width when `None`.
    pub width: Option<u32>,
    /// Explicit height; natural asset height when `None`.
    pub height: Option<u32>,
    /// Anchor on the canvas.
    pub anchor: Anchor,
}

impl Placement {
    /// Compute the destination rectangle `(x, y, w, h)` for an asset of natural size `natural`.
    ///
    /// Coordinates may be negative when the layer is larger than the canvas.
    pub fn rect(self, natural: (u32, u32), canvas: Canvas) -> (i64, i64, u32, u32) {
        if self.anchor == Anchor::Fill {
            return (0, 0, canvas.width, canvas.height);
        }
        let w = self.width.unwrap_or(natural.0);
        let h = self.height.unwrap_or(natural.1);
        match self.anchor {
            Anchor::TopLeft => (0, 0, w, h),
            _ => (
                (i64::from(canvas.width) - i64::from(w)) / 2,
                (i64::from(canvas.height) - i64::from(h)) / 2,
                w,
                h,
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

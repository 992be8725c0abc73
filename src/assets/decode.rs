use std::path::Path;

use anyhow::Context;
use image::RgbaImage;

use crate::foundation::error::{LayergenError, LayergenResult};

/// Decode an encoded layer image into straight-alpha RGBA8.
pub fn decode_layer(bytes: &[u8]) -> LayergenResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

/// Read and decode a layer image from disk.
///
/// Both a missing file and an undecodable payload are per-layer [`LayergenError::Asset`] errors.
pub fn read_layer(path: &Path) -> LayergenResult<RgbaImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| LayergenError::asset(format!("read layer '{}': {e}", path.display())))?;
    decode_layer(&bytes)
        .map_err(|e| LayergenError::asset(format!("decode layer '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;

//! Rendering gateway: layer compositing onto the item canvas.

/// Compositor trait and the `image`-backed implementation.
pub mod compositor;

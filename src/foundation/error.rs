/// Convenience result type used across layergen.
pub type LayergenResult<T> = Result<T, LayergenError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum LayergenError {
    /// Malformed or self-contradictory configuration, empty candidate sets and zero-sum weights.
    ///
    /// Always fatal for the run.
    #[error("configuration error: {0}")]
    Config(String),

    /// A single layer's asset is missing or cannot be decoded.
    ///
    /// Recoverable: the layer is skipped and the item continues.
    #[error("asset error: {0}")]
    Asset(String),

    /// Writing an item's output files failed.
    #[error("output error: {0}")]
    Output(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LayergenError {
    /// Build a [`LayergenError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`LayergenError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`LayergenError::Output`] value.
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Build a [`LayergenError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors that must abort the whole run.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

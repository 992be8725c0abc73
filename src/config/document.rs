use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::model::{GeneratorDef, total_edition_size};
use crate::foundation::error::{LayergenError, LayergenResult};

/// Generator document boundary object.
///
/// This is the JSON-facing, human-edited representation of the category tree and edition
/// configurations. It is validated into a [`crate::CategoryTree`] before any generation starts.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    def: GeneratorDef,
}

impl GeneratorConfig {
    /// Parse a generator document from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> LayergenResult<Self> {
        let def: GeneratorDef = serde_json::from_reader(r)
            .map_err(|e| LayergenError::config(format!("parse generator JSON: {e}")))?;
        Ok(Self { def })
    }

    /// Parse a generator document from a JSON string.
    pub fn from_json_str(s: &str) -> LayergenResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    /// Parse a generator document from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> LayergenResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            LayergenError::config(format!("open generator JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Validate the document without building a tree.
    pub fn validate(&self) -> LayergenResult<()> {
        crate::config::validate::validate_generator(&self.def)
            .map(|_| ())
            .map_err(|e| LayergenError::config(format!("invalid generator config:\n{e}")))
    }

    /// Total number of items across all edition configurations, saturating at `u64::MAX`.
    ///
    /// Validation rejects documents whose total overflows.
    pub fn total_items(&self) -> u64 {
        total_edition_size(&self.def.layer_configurations).unwrap_or(u64::MAX)
    }

    /// Wrap an in-memory definition.
    pub fn from_def(def: GeneratorDef) -> Self {
        Self { def }
    }

    /// Borrow the definition.
    pub fn def(&self) -> &GeneratorDef {
        &self.def
    }

    pub(crate) fn into_def(self) -> GeneratorDef {
        self.def
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/document.rs"]
mod tests;

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{LayergenError, LayergenResult};

/// Filesystem gateway used by the resolver.
///
/// Directories are re-listed on every selection, so distributions always reflect the current
/// directory contents.
pub trait AssetSource: Send + Sync {
    /// Candidate file names in `dir`, sorted.
    ///
    /// An unreadable directory is a configuration error.
    fn list(&self, dir: &str) -> LayergenResult<Vec<String>>;

    /// Path of `file` inside `dir`, as handed to the compositor.
    fn locate(&self, dir: &str, file: &str) -> PathBuf;

    /// Natural pixel size of an asset.
    ///
    /// A missing or undecodable file is an [`LayergenError::Asset`] error.
    fn probe(&self, path: &Path) -> LayergenResult<(u32, u32)>;
}

/// [`AssetSource`] over a directory tree rooted at `root`.
#[derive(Clone, Debug)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    /// Resolve relative asset directories against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Assets root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FsAssetSource {
    fn list(&self, dir: &str) -> LayergenResult<Vec<String>> {
        let path = self.root.join(dir);
        let entries = std::fs::read_dir(&path).map_err(|e| {
            LayergenError::config(format!("read asset directory '{}': {e}", path.display()))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("list asset directory '{}'", path.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn locate(&self, dir: &str, file: &str) -> PathBuf {
        self.root.join(dir).join(file)
    }

    fn probe(&self, path: &Path) -> LayergenResult<(u32, u32)> {
        if !path.exists() {
            return Err(LayergenError::asset(format!(
                "path not found: '{}'",
                path.display()
            )));
        }
        image::image_dimensions(path).map_err(|e| {
            LayergenError::asset(format!("failed to load image '{}': {e}", path.display()))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;

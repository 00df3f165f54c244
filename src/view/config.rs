//! View provisioning configuration

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Buffer update-frequency hint, advisory to the renderer.
///
/// Mirrors the attribute draw-usage of the underlying graphics API; it does
/// not change behavior on this side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawUsage {
    #[default]
    Static,
    Stream,
    Dynamic,
}

/// How a view's instance buffers are written each frame.
///
/// The bulk and sparse paths share the same physical storage; fixing the
/// mode at construction keeps them from interleaving writes for the same
/// entities within a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Buffers are rewritten from visible chunks every frame.
    #[default]
    Bulk,
    /// Instances are registered individually and updated in place.
    Sparse,
}

/// Provisioning for one view: how many LODs, how many instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewConfig {
    /// View name. Must match the chunk entity-group name.
    pub name: String,
    /// Per-LOD instance capacity.
    pub capacity: usize,
    /// Upper bound on individually registered objects (sparse path).
    pub max_objects: usize,
    /// Buffer update-frequency hint.
    #[serde(default)]
    pub draw_usage: DrawUsage,
    /// Which update path owns this view's buffers.
    #[serde(default)]
    pub mode: ViewMode,
}

impl ViewConfig {
    /// Create a bulk-mode config with default hints.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            max_objects: capacity,
            draw_usage: DrawUsage::default(),
            mode: ViewMode::default(),
        }
    }

    /// Switch to the sparse update path.
    pub fn sparse(mut self) -> Self {
        self.mode = ViewMode::Sparse;
        self
    }

    /// Set the registered-object bound.
    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    /// Set the draw-usage hint.
    pub fn with_draw_usage(mut self, draw_usage: DrawUsage) -> Self {
        self.draw_usage = draw_usage;
        self
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self, io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

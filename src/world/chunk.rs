//! Spatial chunks and their per-view entity groups
//!
//! A chunk is one spatial partition of the world. The world system decides
//! which chunks are visible each frame and which LOD each chunk renders at;
//! this module only carries the data the view system reads back: per entity
//! class, a contiguous block of instance transforms.

use std::collections::HashMap;

use glam::Mat4;

/// A contiguous block of instance transforms for one entity class in one chunk.
///
/// The block is laid out flat so the bulk repack can copy it into an instance
/// buffer at an element offset with a single slice copy.
#[derive(Clone, Debug, Default)]
pub struct EntityGroup {
    transforms: Vec<Mat4>,
}

impl EntityGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group from an existing transform block.
    pub fn from_transforms(transforms: Vec<Mat4>) -> Self {
        Self { transforms }
    }

    /// Append one entity's transform.
    pub fn push(&mut self, transform: Mat4) {
        self.transforms.push(transform);
    }

    /// Number of entities in this group.
    pub fn entity_count(&self) -> usize {
        self.transforms.len()
    }

    /// The contiguous transform block.
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }
}

/// One spatial partition of the world, as seen by the view system.
///
/// Chunks are heterogeneous: a chunk carries groups only for the entity
/// classes actually placed in it, so lookups by view name may return `None`.
#[derive(Clone, Debug)]
pub struct Chunk {
    /// LOD level this chunk renders at this frame, 0 = finest.
    current_lod: usize,
    /// Entity groups keyed by view-system name.
    entity_groups: HashMap<String, EntityGroup>,
}

impl Chunk {
    /// Create a chunk rendering at the given LOD level.
    pub fn new(current_lod: usize) -> Self {
        Self {
            current_lod,
            entity_groups: HashMap::new(),
        }
    }

    /// The LOD level the world selected for this chunk.
    pub fn current_lod(&self) -> usize {
        self.current_lod
    }

    /// Set the LOD level (called by the world when the viewer moves).
    pub fn set_current_lod(&mut self, lod: usize) {
        self.current_lod = lod;
    }

    /// Look up the entity group for a view-system name.
    pub fn entity_group(&self, name: &str) -> Option<&EntityGroup> {
        self.entity_groups.get(name)
    }

    /// Get or create the entity group for a view-system name.
    pub fn entity_group_mut(&mut self, name: impl Into<String>) -> &mut EntityGroup {
        self.entity_groups.entry(name.into()).or_default()
    }
}

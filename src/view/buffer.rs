//! Fixed-capacity instance-transform buffer for one LOD level
//!
//! Storage is allocated once at construction and never grows: the renderer
//! registered this exact capacity, and reallocation would invalidate its GPU
//! binding. Only the leading `active_count` entries are valid for drawing;
//! everything past them is stale and must not be read.

use glam::Mat4;

use crate::render::LodModel;

/// Instance-transform buffer bound to one LOD level and one geometry/material pair.
pub struct LodBuffer {
    model: LodModel,
    capacity: usize,
    /// Always `capacity` entries long; `[0, active_count)` are valid.
    transforms: Vec<Mat4>,
    active_count: usize,
    /// GPU copy is stale and must be re-uploaded before the next draw.
    dirty: bool,
}

impl LodBuffer {
    /// Create a buffer with `capacity` pre-allocated instance slots.
    pub fn new(model: LodModel, capacity: usize) -> Self {
        Self {
            model,
            capacity,
            transforms: vec![Mat4::IDENTITY; capacity],
            active_count: 0,
            dirty: false,
        }
    }

    /// Fixed instance capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of leading valid instances to draw this frame.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Free slots remaining before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.capacity - self.active_count
    }

    /// The valid instance region, `[0, active_count)`.
    pub fn active(&self) -> &[Mat4] {
        &self.transforms[..self.active_count]
    }

    /// Read one slot. Valid only for `slot < active_count`.
    pub fn transform_at(&self, slot: usize) -> Mat4 {
        self.transforms[slot]
    }

    /// Whether the GPU copy needs a refresh.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after the GPU copy has been refreshed.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Drop all instances and mark the buffer for re-upload.
    pub fn reset(&mut self) {
        self.active_count = 0;
        self.dirty = true;
    }

    /// Overwrite one slot in place. Does not change the active count.
    pub fn write_slot(&mut self, slot: usize, transform: Mat4) {
        debug_assert!(slot < self.active_count, "write to inactive slot {slot}");
        self.transforms[slot] = transform;
        self.dirty = true;
    }

    /// Append one instance at the end of the active region. Returns its slot.
    ///
    /// Caller must have checked `remaining() > 0`.
    pub fn push(&mut self, transform: Mat4) -> usize {
        debug_assert!(self.active_count < self.capacity);
        let slot = self.active_count;
        self.transforms[slot] = transform;
        self.active_count += 1;
        self.dirty = true;
        slot
    }

    /// Append a contiguous transform block at the end of the active region.
    ///
    /// Caller must have checked `block.len() <= remaining()`; this never
    /// writes past capacity.
    pub fn extend_from_block(&mut self, block: &[Mat4]) {
        debug_assert!(block.len() <= self.remaining());
        let start = self.active_count;
        self.transforms[start..start + block.len()].copy_from_slice(block);
        self.active_count += block.len();
        self.dirty = true;
    }

    /// Remove one slot, keeping the active region contiguous.
    ///
    /// The last active instance is moved into the freed slot and the active
    /// count is decremented. Returns the slot the last instance previously
    /// occupied when a move happened, so the caller can redirect whatever
    /// bookkeeping pointed at it; `None` when the removed slot was the last.
    pub fn swap_remove_slot(&mut self, slot: usize) -> Option<usize> {
        debug_assert!(slot < self.active_count, "remove of inactive slot {slot}");
        self.active_count -= 1;
        let last = self.active_count;
        self.dirty = true;
        if slot == last {
            return None;
        }
        self.transforms[slot] = self.transforms[last];
        Some(last)
    }

    /// Geometry and materials drawn from this buffer.
    pub fn model(&self) -> &LodModel {
        &self.model
    }

    /// Mutable access for shader-uniform propagation and material swaps.
    pub fn model_mut(&mut self) -> &mut LodModel {
        &mut self.model
    }
}

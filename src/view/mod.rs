//! LOD-partitioned instanced view system
//!
//! One `LodInstancedView` represents a whole class of similar entities
//! (trees, rocks, props) as a sequence of fixed-capacity instance buffers,
//! one per LOD level, finest at index 0. Entities reach the buffers on one
//! of two paths:
//!
//! - **bulk**: `update()` rewrites every buffer from scratch each frame out
//!   of the visible chunks' per-LOD transform blocks;
//! - **sparse**: entities are registered individually and push their own
//!   transforms into an assigned slot.
//!
//! Both paths write the same physical storage, so each view commits to one
//! of them at construction ([`ViewMode`]); calling the other path's
//! operations fails with [`Error::WrongMode`] instead of racing.

pub mod buffer;
pub mod config;
pub mod object;

pub use buffer::LodBuffer;
pub use config::{DrawUsage, ViewConfig, ViewMode};
pub use object::{ObjectId, TrackedObject};

use glam::Mat4;
use log::{debug, trace, warn};

use crate::core::error::Error;
use crate::render::{LodModel, Material};
use crate::world::Chunk;

/// Instanced view of one entity class across all its LOD levels.
pub struct LodInstancedView {
    /// Must match the entity-group name chunks use for this class.
    name: String,
    mode: ViewMode,
    draw_usage: DrawUsage,
    max_objects: usize,
    /// Index = LOD level, 0 = finest detail.
    buffers: Vec<LodBuffer>,
    /// Insertion order = registration order. Bounded by `max_objects`.
    tracked: Vec<TrackedObject>,
}

impl LodInstancedView {
    /// Build a view from its per-LOD models, finest first.
    ///
    /// One instance buffer of `config.capacity` slots is created per model.
    /// Per-instance frustum culling is deliberately absent: chunk visibility
    /// already culled everything upstream, and the renderer draws each
    /// buffer's active region as-is.
    pub fn new(models: Vec<LodModel>, config: ViewConfig) -> Self {
        let buffers = models
            .into_iter()
            .map(|model| LodBuffer::new(model, config.capacity))
            .collect::<Vec<_>>();

        debug!(
            "view '{}': {} LOD levels, capacity {}, {:?} mode",
            config.name,
            buffers.len(),
            config.capacity,
            config.mode
        );

        Self {
            name: config.name,
            mode: config.mode,
            draw_usage: config.draw_usage,
            max_objects: config.max_objects,
            buffers,
            // Reserved up front so registration never reallocates.
            tracked: Vec::with_capacity(config.max_objects),
        }
    }

    /// View name, shared with chunk entity groups.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which update path owns this view's buffers.
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Buffer update-frequency hint, advisory to the renderer.
    pub fn draw_usage(&self) -> DrawUsage {
        self.draw_usage
    }

    /// Number of LOD levels.
    pub fn lod_count(&self) -> usize {
        self.buffers.len()
    }

    /// All per-LOD buffers, finest first, for render-pipeline attachment.
    pub fn buffers(&self) -> &[LodBuffer] {
        &self.buffers
    }

    /// Mutable buffer access for the GPU uploader.
    pub fn buffers_mut(&mut self) -> &mut [LodBuffer] {
        &mut self.buffers
    }

    /// One LOD buffer, if the level exists.
    pub fn buffer(&self, lod: usize) -> Option<&LodBuffer> {
        self.buffers.get(lod)
    }

    /// Number of currently registered objects.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Registered objects in registration order.
    pub fn tracked(&self) -> &[TrackedObject] {
        &self.tracked
    }

    fn find(&self, id: ObjectId) -> Option<usize> {
        self.tracked.iter().position(|obj| obj.id == id)
    }

    fn require_mode(&self, expected: ViewMode) -> Result<(), Error> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(Error::WrongMode { expected })
        }
    }

    /// Register an entity on the sparse path.
    ///
    /// The entity starts at LOD 0 and is granted the next free slot in the
    /// LOD 0 buffer. Fails with [`Error::CapacityExceeded`] when the view
    /// was provisioned with too few object slots for its world.
    pub fn register(&mut self, id: ObjectId, transform: Mat4) -> Result<(), Error> {
        self.require_mode(ViewMode::Sparse)?;
        debug_assert!(self.find(id).is_none(), "object {id:?} already registered");

        if self.tracked.len() >= self.max_objects {
            return Err(Error::CapacityExceeded {
                view: self.name.clone(),
                capacity: self.max_objects,
            });
        }
        if self.buffers[0].remaining() == 0 {
            return Err(Error::CapacityExceeded {
                view: self.name.clone(),
                capacity: self.buffers[0].capacity(),
            });
        }

        let slot = self.buffers[0].push(transform);
        self.tracked.push(TrackedObject::new(id, slot, transform));
        trace!("view '{}': registered {id:?} at LOD 0 slot {slot}", self.name);
        Ok(())
    }

    /// Unregister an entity. No-op when the id is not tracked.
    ///
    /// The freed slot is back-filled with the buffer's last active instance
    /// so the active region stays contiguous; the displaced object's slot
    /// record is updated to match.
    pub fn unregister(&mut self, id: ObjectId) -> Result<(), Error> {
        self.require_mode(ViewMode::Sparse)?;

        let Some(index) = self.find(id) else {
            return Ok(());
        };
        let removed = self.tracked.remove(index);
        let lod = removed.current_lod;

        if let Some(moved_from) = self.buffers[lod].swap_remove_slot(removed.instance_slot) {
            self.redirect_slot(lod, moved_from, removed.instance_slot);
        }
        trace!("view '{}': unregistered {id:?}", self.name);
        Ok(())
    }

    /// Write an entity's transform into its assigned slot.
    ///
    /// Pure in-place write: the buffer is marked dirty, active counts are
    /// untouched, nothing allocates.
    pub fn push_transform(&mut self, id: ObjectId, transform: Mat4) -> Result<(), Error> {
        self.require_mode(ViewMode::Sparse)?;

        let Some(index) = self.find(id) else {
            warn!("view '{}': push_transform on untracked {id:?}", self.name);
            return Ok(());
        };
        let obj = &mut self.tracked[index];
        obj.transform = transform;
        self.buffers[obj.current_lod].write_slot(obj.instance_slot, transform);
        Ok(())
    }

    /// Move a registered entity to another LOD level.
    ///
    /// The instance leaves its old buffer (back-filled as in
    /// [`unregister`](Self::unregister)) and is appended to the new one.
    pub fn set_lod(&mut self, id: ObjectId, lod: usize) -> Result<(), Error> {
        self.require_mode(ViewMode::Sparse)?;
        if lod >= self.buffers.len() {
            return Err(Error::LodOutOfRange {
                lod,
                lod_count: self.buffers.len(),
            });
        }

        let Some(index) = self.find(id) else {
            warn!("view '{}': set_lod on untracked {id:?}", self.name);
            return Ok(());
        };
        let (old_lod, old_slot, transform) = {
            let obj = &self.tracked[index];
            (obj.current_lod, obj.instance_slot, obj.transform)
        };
        if old_lod == lod {
            return Ok(());
        }
        if self.buffers[lod].remaining() == 0 {
            return Err(Error::CapacityExceeded {
                view: self.name.clone(),
                capacity: self.buffers[lod].capacity(),
            });
        }

        if let Some(moved_from) = self.buffers[old_lod].swap_remove_slot(old_slot) {
            self.redirect_slot(old_lod, moved_from, old_slot);
        }
        let slot = self.buffers[lod].push(transform);

        // redirect_slot neither adds nor removes entries, so index is still valid.
        let obj = &mut self.tracked[index];
        obj.current_lod = lod;
        obj.instance_slot = slot;
        Ok(())
    }

    /// Point the object that occupied `moved_from` in `lod`'s buffer at its
    /// new slot after a swap-with-last back-fill.
    fn redirect_slot(&mut self, lod: usize, moved_from: usize, moved_to: usize) {
        if let Some(obj) = self
            .tracked
            .iter_mut()
            .find(|obj| obj.current_lod == lod && obj.instance_slot == moved_from)
        {
            obj.instance_slot = moved_to;
        }
    }

    /// Bulk per-frame repack: rewrite every buffer from the visible chunks.
    ///
    /// Every buffer is reset, then each chunk's entity group for this view
    /// is copied as one contiguous block into the buffer for the chunk's
    /// declared LOD. Instance order within a buffer is chunk-iteration
    /// order; slots are not stable across frames.
    ///
    /// Runs once per frame against the whole visible set; all work is
    /// bounded slice copies into pre-allocated storage.
    pub fn update(&mut self, visible_chunks: &[Chunk]) -> Result<(), Error> {
        self.require_mode(ViewMode::Bulk)?;

        for buffer in &mut self.buffers {
            buffer.reset();
        }

        for chunk in visible_chunks {
            // Chunks are heterogeneous and may not carry this entity class.
            let Some(group) = chunk.entity_group(&self.name) else {
                continue;
            };
            let lod = chunk.current_lod();
            let Some(buffer) = self.buffers.get_mut(lod) else {
                return Err(Error::LodOutOfRange {
                    lod,
                    lod_count: self.buffers.len(),
                });
            };
            if group.entity_count() > buffer.remaining() {
                return Err(Error::CapacityExceeded {
                    view: self.name.clone(),
                    capacity: buffer.capacity(),
                });
            }
            buffer.extend_from_block(group.transforms());
        }

        trace!(
            "view '{}': repacked {} instances from {} chunks",
            self.name,
            self.buffers.iter().map(|b| b.active_count()).sum::<usize>(),
            visible_chunks.len()
        );
        Ok(())
    }

    /// Propagate elapsed time into every time-aware material.
    ///
    /// Sweeps the base material and all auxiliary materials (shadow depth,
    /// shadow distance, depth prepass) of every LOD; materials without a
    /// time uniform are skipped.
    pub fn update_shaders(&mut self, _delta: f32, time_elapsed: f32) {
        for buffer in &mut self.buffers {
            let model = buffer.model_mut();
            model.material.set_time(time_elapsed);
            if let Some(mat) = model.custom_depth_material.as_mut() {
                mat.set_time(time_elapsed);
            }
            if let Some(mat) = model.custom_distance_material.as_mut() {
                mat.set_time(time_elapsed);
            }
            if let Some(mat) = model.depth_prepass_material.as_mut() {
                mat.set_time(time_elapsed);
            }
        }
    }

    /// Set the depth-prepass material for one LOD level.
    pub fn set_depth_prepass_material(
        &mut self,
        material: Material,
        lod: usize,
    ) -> Result<(), Error> {
        let lod_count = self.buffers.len();
        let buffer = self
            .buffers
            .get_mut(lod)
            .ok_or(Error::LodOutOfRange { lod, lod_count })?;
        buffer.model_mut().depth_prepass_material = Some(material);
        Ok(())
    }

    /// Get the depth-prepass material for one LOD level, if set.
    pub fn depth_prepass_material(&self, lod: usize) -> Result<Option<&Material>, Error> {
        let buffer = self.buffers.get(lod).ok_or(Error::LodOutOfRange {
            lod,
            lod_count: self.buffers.len(),
        })?;
        Ok(buffer.model().depth_prepass_material.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::GeometryHandle;
    use glam::Vec3;

    fn models(lod_count: usize) -> Vec<LodModel> {
        (0..lod_count)
            .map(|i| LodModel::new(GeometryHandle(i as u64), Material::new(format!("lod{i}"))))
            .collect()
    }

    fn bulk_view(lod_count: usize, capacity: usize) -> LodInstancedView {
        LodInstancedView::new(models(lod_count), ViewConfig::new("trees", capacity))
    }

    fn sparse_view(lod_count: usize, capacity: usize, max_objects: usize) -> LodInstancedView {
        LodInstancedView::new(
            models(lod_count),
            ViewConfig::new("trees", capacity)
                .sparse()
                .with_max_objects(max_objects),
        )
    }

    fn at(x: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    fn chunk(lod: usize, name: &str, positions: &[f32]) -> Chunk {
        let mut chunk = Chunk::new(lod);
        let group = chunk.entity_group_mut(name);
        for &x in positions {
            group.push(at(x));
        }
        chunk
    }

    // -- registration ------------------------------------------------------

    #[test]
    fn test_register_assigns_increasing_unique_slots() {
        let mut view = sparse_view(2, 16, 8);
        for i in 0..8 {
            view.register(ObjectId(i), at(i as f32)).unwrap();
        }

        let slots: Vec<usize> = view.tracked().iter().map(|o| o.instance_slot).collect();
        assert_eq!(slots, (0..8).collect::<Vec<_>>());
        assert!(view.tracked().iter().all(|o| o.current_lod == 0));
        assert_eq!(view.buffer(0).unwrap().active_count(), 8);
    }

    #[test]
    fn test_register_beyond_capacity_fails() {
        let mut view = sparse_view(1, 16, 2);
        view.register(ObjectId(0), at(0.0)).unwrap();
        view.register(ObjectId(1), at(1.0)).unwrap();

        let err = view.register(ObjectId(2), at(2.0)).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { capacity: 2, .. }));
        assert_eq!(view.tracked_count(), 2);
    }

    #[test]
    fn test_register_on_bulk_view_is_wrong_mode() {
        let mut view = bulk_view(1, 16);
        let err = view.register(ObjectId(0), at(0.0)).unwrap_err();
        assert!(matches!(
            err,
            Error::WrongMode {
                expected: ViewMode::Sparse
            }
        ));
    }

    // -- unregistration ----------------------------------------------------

    #[test]
    fn test_unregister_decrements_count_and_backfills() {
        let mut view = sparse_view(1, 16, 8);
        view.register(ObjectId(0), at(0.0)).unwrap();
        view.register(ObjectId(1), at(1.0)).unwrap();
        view.register(ObjectId(2), at(2.0)).unwrap();

        view.unregister(ObjectId(0)).unwrap();

        let buf = view.buffer(0).unwrap();
        assert_eq!(buf.active_count(), 2);
        // Last instance was moved into the freed slot.
        assert_eq!(buf.active(), &[at(2.0), at(1.0)]);
        // The displaced object's bookkeeping follows it.
        let obj2 = view.tracked().iter().find(|o| o.id == ObjectId(2)).unwrap();
        assert_eq!(obj2.instance_slot, 0);
    }

    #[test]
    fn test_unregister_untracked_is_noop() {
        let mut view = sparse_view(1, 16, 8);
        view.register(ObjectId(0), at(0.0)).unwrap();
        view.unregister(ObjectId(99)).unwrap();
        assert_eq!(view.tracked_count(), 1);
        assert_eq!(view.buffer(0).unwrap().active_count(), 1);
    }

    #[test]
    fn test_push_after_unregister_hits_redirected_slot() {
        let mut view = sparse_view(1, 16, 8);
        view.register(ObjectId(0), at(0.0)).unwrap();
        view.register(ObjectId(1), at(1.0)).unwrap();
        view.register(ObjectId(2), at(2.0)).unwrap();
        view.unregister(ObjectId(1)).unwrap();

        // Object 2 now lives in slot 1; its pushes must land there.
        view.push_transform(ObjectId(2), at(9.0)).unwrap();
        let buf = view.buffer(0).unwrap();
        assert_eq!(buf.active(), &[at(0.0), at(9.0)]);
    }

    // -- sparse transform pushes -------------------------------------------

    #[test]
    fn test_push_transform_writes_only_own_slot() {
        let mut view = sparse_view(1, 16, 8);
        view.register(ObjectId(0), at(0.0)).unwrap();
        view.register(ObjectId(1), at(1.0)).unwrap();

        view.push_transform(ObjectId(0), at(5.0)).unwrap();

        let buf = view.buffer(0).unwrap();
        assert_eq!(buf.active_count(), 2);
        assert_eq!(buf.transform_at(0), at(5.0));
        assert_eq!(buf.transform_at(1), at(1.0));
        assert!(buf.is_dirty());
    }

    // -- LOD switching -----------------------------------------------------

    #[test]
    fn test_set_lod_moves_instance_between_buffers() {
        let mut view = sparse_view(3, 16, 8);
        view.register(ObjectId(0), at(0.0)).unwrap();
        view.register(ObjectId(1), at(1.0)).unwrap();

        view.set_lod(ObjectId(0), 2).unwrap();

        assert_eq!(view.buffer(0).unwrap().active_count(), 1);
        assert_eq!(view.buffer(0).unwrap().active(), &[at(1.0)]);
        assert_eq!(view.buffer(2).unwrap().active(), &[at(0.0)]);

        let obj = view.tracked().iter().find(|o| o.id == ObjectId(0)).unwrap();
        assert_eq!(obj.current_lod, 2);
        assert_eq!(obj.instance_slot, 0);
    }

    #[test]
    fn test_set_lod_out_of_range() {
        let mut view = sparse_view(2, 16, 8);
        view.register(ObjectId(0), at(0.0)).unwrap();
        let err = view.set_lod(ObjectId(0), 5).unwrap_err();
        assert!(matches!(err, Error::LodOutOfRange { lod: 5, lod_count: 2 }));
    }

    // -- bulk repack -------------------------------------------------------

    #[test]
    fn test_update_counts_follow_chunk_groups() {
        // 2 LOD levels, capacity 10. Chunk A (LOD 0) has 3 entities, chunk B
        // (LOD 1) has 2, chunk C carries no group for this view.
        let mut view = bulk_view(2, 10);
        let a = chunk(0, "trees", &[0.0, 1.0, 2.0]);
        let b = chunk(1, "trees", &[10.0, 11.0]);
        let c = Chunk::new(0);

        view.update(&[a, b, c]).unwrap();

        assert_eq!(view.buffer(0).unwrap().active_count(), 3);
        assert_eq!(view.buffer(1).unwrap().active_count(), 2);
        assert_eq!(view.buffer(0).unwrap().active(), &[at(0.0), at(1.0), at(2.0)]);
    }

    #[test]
    fn test_update_concatenates_in_chunk_order() {
        let mut view = bulk_view(1, 16);
        let chunks = [
            chunk(0, "trees", &[0.0, 1.0]),
            chunk(0, "trees", &[2.0]),
            chunk(0, "trees", &[3.0, 4.0]),
        ];

        view.update(&chunks).unwrap();

        let buf = view.buffer(0).unwrap();
        assert_eq!(buf.active(), &[at(0.0), at(1.0), at(2.0), at(3.0), at(4.0)]);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut view = bulk_view(2, 16);
        let chunks = [chunk(0, "trees", &[0.0, 1.0]), chunk(1, "trees", &[2.0])];

        view.update(&chunks).unwrap();
        let first: Vec<Vec<Mat4>> = view.buffers().iter().map(|b| b.active().to_vec()).collect();

        view.update(&chunks).unwrap();
        let second: Vec<Vec<Mat4>> = view.buffers().iter().map(|b| b.active().to_vec()).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_update_leaves_no_residue_from_previous_frame() {
        let mut view = bulk_view(2, 16);
        view.update(&[chunk(0, "trees", &[0.0, 1.0, 2.0])]).unwrap();
        view.update(&[chunk(1, "trees", &[7.0])]).unwrap();

        assert_eq!(view.buffer(0).unwrap().active_count(), 0);
        assert_eq!(view.buffer(1).unwrap().active(), &[at(7.0)]);
    }

    #[test]
    fn test_update_marks_all_buffers_dirty() {
        let mut view = bulk_view(2, 16);
        for buf in view.buffers_mut() {
            buf.clear_dirty();
        }
        view.update(&[]).unwrap();
        assert!(view.buffers().iter().all(|b| b.is_dirty()));
    }

    #[test]
    fn test_update_overflow_fails_fast() {
        let mut view = bulk_view(1, 4);
        let chunks = [chunk(0, "trees", &[0.0, 1.0, 2.0]), chunk(0, "trees", &[3.0, 4.0])];

        let err = view.update(&chunks).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { capacity: 4, .. }));
        // Nothing was written past capacity.
        assert!(view.buffer(0).unwrap().active_count() <= 4);
    }

    #[test]
    fn test_update_on_sparse_view_is_wrong_mode() {
        let mut view = sparse_view(1, 16, 8);
        let err = view.update(&[]).unwrap_err();
        assert!(matches!(
            err,
            Error::WrongMode {
                expected: ViewMode::Bulk
            }
        ));
    }

    #[test]
    fn test_update_rejects_chunk_lod_beyond_view() {
        let mut view = bulk_view(2, 16);
        let err = view.update(&[chunk(7, "trees", &[0.0])]).unwrap_err();
        assert!(matches!(err, Error::LodOutOfRange { lod: 7, lod_count: 2 }));
    }

    // -- shader uniforms and prepass materials -----------------------------

    #[test]
    fn test_update_shaders_sets_time_on_capable_materials() {
        let mut view = LodInstancedView::new(
            vec![
                LodModel::new(GeometryHandle(0), Material::new("wind").with_time_uniform())
                    .with_custom_depth_material(Material::new("wind_depth").with_time_uniform()),
                LodModel::new(GeometryHandle(1), Material::new("plain")),
            ],
            ViewConfig::new("trees", 4),
        );

        view.update_shaders(0.016, 42.0);

        let lod0 = view.buffer(0).unwrap().model();
        assert_eq!(lod0.material.time(), Some(42.0));
        assert_eq!(
            lod0.custom_depth_material.as_ref().unwrap().time(),
            Some(42.0)
        );
        // Materials without the uniform stay untouched.
        assert_eq!(view.buffer(1).unwrap().model().material.time(), None);
    }

    #[test]
    fn test_depth_prepass_material_round_trip() {
        let mut view = bulk_view(2, 4);
        view.set_depth_prepass_material(Material::new("prepass"), 1)
            .unwrap();

        let mat = view.depth_prepass_material(1).unwrap().unwrap();
        assert_eq!(mat.name(), "prepass");
        assert!(view.depth_prepass_material(0).unwrap().is_none());
    }

    #[test]
    fn test_depth_prepass_material_out_of_range() {
        let mut view = bulk_view(2, 4);
        let err = view
            .set_depth_prepass_material(Material::new("prepass"), 99)
            .unwrap_err();
        assert!(matches!(err, Error::LodOutOfRange { lod: 99, lod_count: 2 }));
        assert!(view.depth_prepass_material(99).is_err());
    }
}

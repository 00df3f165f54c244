//! Tracked-object bookkeeping for the sparse update path

use glam::Mat4;

/// External identity of an entity registered with a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// Bookkeeping record for one individually registered entity.
///
/// `instance_slot` always points at a valid slot inside
/// `current_lod`'s buffer; the view rewrites it whenever swap-with-last
/// compaction or a LOD switch relocates the instance.
#[derive(Clone, Debug)]
pub struct TrackedObject {
    pub id: ObjectId,
    /// Index into the view's buffer sequence, 0 = finest detail.
    pub current_lod: usize,
    /// Slot inside the current LOD buffer.
    pub instance_slot: usize,
    /// Last transform pushed for this entity.
    pub transform: Mat4,
}

impl TrackedObject {
    /// Create a record for a freshly registered entity at LOD 0.
    pub fn new(id: ObjectId, instance_slot: usize, transform: Mat4) -> Self {
        Self {
            id,
            current_lod: 0,
            instance_slot,
            transform,
        }
    }
}

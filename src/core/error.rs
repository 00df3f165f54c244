//! Error types for the thicket view system

use thiserror::Error;

use crate::view::ViewMode;

/// Main error type for the view system
///
/// All failures are deterministic configuration or usage errors. There is no
/// retry path: a `CapacityExceeded` means the view was provisioned too small
/// for its world, and must surface to the caller rather than silently
/// truncating the visible set.
#[derive(Debug, Error)]
pub enum Error {
    #[error("instance capacity exceeded on view '{view}' (capacity {capacity})")]
    CapacityExceeded { view: String, capacity: usize },

    #[error("LOD index {lod} out of range (view has {lod_count} LOD levels)")]
    LodOutOfRange { lod: usize, lod_count: usize },

    #[error("operation requires a {expected:?}-mode view")]
    WrongMode { expected: ViewMode },
}

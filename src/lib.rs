//! Thicket - GPU-instanced LOD rendering for large entity populations
//!
//! Renders tens of thousands of similar entities (trees, rocks, props) as a
//! handful of instanced draw batches, one per level of detail. Each frame the
//! currently visible world chunks stream their per-LOD transform blocks into
//! fixed-capacity instance buffers, so exactly the visible entities at each
//! LOD are drawn contiguously, with no gaps and no per-frame allocation.

pub mod core;
pub mod render;
pub mod view;
pub mod world;

pub use crate::core::error::Error;
pub use view::LodInstancedView;

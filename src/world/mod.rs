//! World-side data consumed by the view system

pub mod chunk;

pub use chunk::{Chunk, EntityGroup};

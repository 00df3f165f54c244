//! Rendering-side interfaces: materials, LOD models, GPU instance upload

pub mod instance_buffer;
pub mod material;

pub use instance_buffer::{InstanceBuffer, ViewGpuBuffers};
pub use material::{GeometryHandle, LodModel, Material};

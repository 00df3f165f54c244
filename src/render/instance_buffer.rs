//! GPU instance buffers for the per-LOD transform storage
//!
//! One fixed-size `wgpu::Buffer` per LOD, created once at view setup and
//! never reallocated. Each frame the uploader copies the dirty buffers'
//! active regions to the GPU; the renderer then draws `active_count`
//! instances from each.

use glam::Mat4;

use crate::view::{DrawUsage, LodBuffer, LodInstancedView};

/// Bytes per instance transform (4x4 f32 matrix).
const MAT4_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;

/// Fixed-size GPU vertex buffer holding one LOD's instance transforms.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
}

impl InstanceBuffer {
    /// Create a buffer for `capacity` instance transforms.
    pub fn new(device: &wgpu::Device, label: &str, capacity: usize) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64 * MAT4_SIZE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { buffer, capacity }
    }

    /// Refresh the GPU copy from a dirty LOD buffer.
    ///
    /// Writes only the active region and clears the dirty flag; a clean
    /// buffer is left alone.
    pub fn upload(&self, queue: &wgpu::Queue, lod_buffer: &mut LodBuffer) {
        if !lod_buffer.is_dirty() {
            return;
        }
        debug_assert!(lod_buffer.capacity() <= self.capacity);
        if lod_buffer.active_count() > 0 {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(lod_buffer.active()));
        }
        lod_buffer.clear_dirty();
    }

    /// Instance capacity the buffer was sized for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the raw buffer
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Vertex layout for the per-instance transform, one Float32x4 column
    /// per attribute starting at `start_location`.
    pub fn vertex_layout(start_location: u32) -> [wgpu::VertexAttribute; 4] {
        [
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 0,
                shader_location: start_location,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 16,
                shader_location: start_location + 1,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 32,
                shader_location: start_location + 2,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 48,
                shader_location: start_location + 3,
            },
        ]
    }
}

/// The full set of GPU buffers for one view, one per LOD level.
pub struct ViewGpuBuffers {
    buffers: Vec<InstanceBuffer>,
}

impl ViewGpuBuffers {
    /// Create GPU buffers matching a view's LOD buffers.
    ///
    /// The draw-usage hint only informs the label; wgpu carries no
    /// per-buffer update-frequency hint.
    pub fn new(device: &wgpu::Device, view: &LodInstancedView) -> Self {
        let usage_tag = match view.draw_usage() {
            DrawUsage::Static => "static",
            DrawUsage::Stream => "stream",
            DrawUsage::Dynamic => "dynamic",
        };
        let buffers = view
            .buffers()
            .iter()
            .enumerate()
            .map(|(lod, buf)| {
                let label = format!("{}_lod{}_{}", view.name(), lod, usage_tag);
                InstanceBuffer::new(device, &label, buf.capacity())
            })
            .collect();

        Self { buffers }
    }

    /// Upload every dirty LOD buffer. Called after `update()` and before
    /// any draw of the view, so no draw ever sees a half-repacked frame.
    pub fn upload(&self, queue: &wgpu::Queue, view: &mut LodInstancedView) {
        for (gpu, cpu) in self.buffers.iter().zip(view.buffers_mut()) {
            gpu.upload(queue, cpu);
        }
    }

    /// GPU buffer for one LOD level.
    pub fn buffer(&self, lod: usize) -> Option<&InstanceBuffer> {
        self.buffers.get(lod)
    }
}

//! Vertex formats and GPU buffers for the switch geometry.
//!
//! - [`Vertex`]: the per-vertex record shared by every switch instance
//! - [`SwitchMesh`]: the static, non-indexed vertex buffer uploaded once
//! - [`InstanceAngles`]: the per-instance angle buffer rewritten every frame
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Step     | Shader Location |
//! |-----------|-----------|--------|----------|-----------------|
//! | position  | Float32x3 | 0      | vertex   | 0               |
//! | normal    | Float32x3 | 12     | vertex   | 1               |
//! | angle     | Float32   | 0      | instance | 2               |

use crate::gpu::GpuContext;
use crate::puzzle::TILE_COUNT;
use wgpu::util::DeviceExt;

/// A vertex with position and normal.
///
/// Uses `#[repr(C)]` and derives [`bytemuck::Pod`] so a whole slice can be cast
/// to bytes for upload. Each vertex occupies 24 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in model space.
    pub position: [f32; 3],
    /// Surface normal (should be normalized for correct lighting).
    pub normal: [f32; 3],
}

impl Vertex {
    /// The wgpu vertex buffer layout descriptor for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    /// Creates a new vertex.
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// The switch geometry resident on the GPU.
///
/// One copy is shared by all instances; placement and rotation happen in the
/// vertex shader. The buffer is a plain triangle list, so `vertex_count` is
/// the draw range.
#[derive(Debug)]
pub struct SwitchMesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) vertex_count: u32,
}

impl SwitchMesh {
    /// Uploads a triangle list to a new vertex buffer.
    pub fn new(gpu: &GpuContext, vertices: &[Vertex]) -> Self {
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Switch Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        }
    }

    /// Number of vertices drawn per instance.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// One `f32` rotation per switch, fetched once per instance by the vertex stage.
pub struct InstanceAngles {
    pub(crate) buffer: wgpu::Buffer,
}

impl InstanceAngles {
    /// Layout for the instance-rate angle attribute.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<f32>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32,
        }],
    };

    /// Allocates a zeroed angle buffer with one slot per tile.
    pub fn new(gpu: &GpuContext) -> Self {
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Switch Angle Buffer"),
                contents: bytemuck::cast_slice(&[0.0f32; TILE_COUNT]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        Self { buffer }
    }

    /// Overwrites every angle with this frame's values.
    pub fn write(&self, gpu: &GpuContext, angles: &[f32; TILE_COUNT]) {
        gpu.queue
            .write_buffer(&self.buffer, 0, bytemuck::cast_slice(angles));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(Vertex::LAYOUT.array_stride, 24);
    }

    #[test]
    fn vertex_casts_to_flat_floats() {
        let vertices = [
            Vertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0]),
            Vertex::new([4.0, 5.0, 6.0], [0.0, 0.0, 1.0]),
        ];
        let floats: &[f32] = bytemuck::cast_slice(&vertices);
        assert_eq!(
            floats,
            &[1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 4.0, 5.0, 6.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn angle_attribute_steps_per_instance() {
        assert_eq!(InstanceAngles::LAYOUT.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(InstanceAngles::LAYOUT.attributes[0].shader_location, 2);
    }
}

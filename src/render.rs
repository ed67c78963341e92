//! The instanced switch pass and the blit onto the visible surface.
//!
//! Each frame the whole board is drawn with a single instanced draw into the
//! [`OffscreenFramebuffer`], producing the shaded image and the object-ID
//! image together. The shaded image is then copied onto the surface the host
//! presents.
//!
//! # Bindings
//!
//! - **Group 0**: [`Uniforms`] (view-projection matrix and light position)
//! - **Vertex buffer 0**: [`Vertex`] per vertex
//! - **Vertex buffer 1**: [`InstanceAngles`] per instance
//!
//! # Pipeline Configuration
//!
//! - Back-face culling (counter-clockwise front faces)
//! - No blending on either target
//! - Depth write with Less-than comparison

use std::path::Path;

use thiserror::Error;

use crate::camera::Camera;
use crate::framebuffer::{DEPTH_STENCIL_FORMAT, OBJECT_ID_FORMAT, OffscreenFramebuffer};
use crate::geometry::{GeometryError, SceneGeometry};
use crate::gpu::GpuContext;
use crate::mesh::{InstanceAngles, SwitchMesh, Vertex};
use crate::picking::PickingResolver;
use crate::puzzle::TILE_COUNT;

/// Clear color of the shaded target.
pub const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.2,
    b: 0.3,
    a: 0.0,
};

/// Position of the single point light.
pub const LIGHT_POSITION: [f32; 3] = [0.0, 300.0, 0.0];

/// Failures of the render component.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The switch asset could not be loaded.
    #[error("failed to load switch geometry: {0}")]
    Geometry(#[from] GeometryError),
    /// A shader or pipeline failed validation.
    #[error("failed to build {stage}: {message}")]
    Pipeline {
        /// What was being built.
        stage: &'static str,
        /// The validation message reported by wgpu.
        message: String,
    },
    /// Reading the object-ID target back failed.
    #[error("object id readback failed: {0}")]
    Readback(String),
}

/// Uniforms shared by both shader stages.
///
/// Matches `Uniforms` in `shaders/switch.wgsl` (80 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Uniforms {
    /// World to clip space.
    pub mvp: [[f32; 4]; 4],
    /// Point light position in world space.
    pub light_pos: [f32; 3],
    _pad: f32,
}

impl Uniforms {
    /// Uniforms for the fixed camera and light.
    pub fn new(camera: &Camera) -> Self {
        Self {
            mvp: camera.view_proj().to_cols_array_2d(),
            light_pos: LIGHT_POSITION,
            _pad: 0.0,
        }
    }
}

/// Pipelines and bindings of the switch pass and the blit.
pub struct SwitchPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
}

impl SwitchPass {
    /// Compiles both shaders and builds both pipelines.
    ///
    /// Validation errors are captured and returned rather than left to the
    /// device's uncaptured-error handler.
    pub fn new(gpu: &GpuContext) -> Result<Self, RenderError> {
        let device = &gpu.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Switch Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/switch.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Switch Uniforms"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Switch Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Switch Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Switch Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Switch Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex::LAYOUT, InstanceAngles::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[
                    Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                    Some(wgpu::ColorTargetState {
                        format: OBJECT_ID_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    }),
                ],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_STENCIL_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        check_scope(gpu, "switch pipeline")?;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        // Same size in and out, so nearest sampling is an exact pixel copy.
        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Blit Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&blit_bind_group_layout],
            push_constant_ranges: &[],
        });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        check_scope(gpu, "blit pipeline")?;

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            blit_pipeline,
            blit_bind_group_layout,
            blit_sampler,
        })
    }

    /// Records the switch draw into `framebuffer`.
    ///
    /// Clears shaded output to [`BACKGROUND`], the ID target to zero ("no
    /// object") and depth to the far plane, then draws every switch in one
    /// instanced call.
    pub fn draw(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        framebuffer: &OffscreenFramebuffer,
        camera: &Camera,
        mesh: &SwitchMesh,
        angles: &InstanceAngles,
    ) {
        gpu.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[Uniforms::new(camera)]),
        );

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Switch Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &framebuffer.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &framebuffer.object_id.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &framebuffer.depth_stencil.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, angles.buffer.slice(..));
        render_pass.draw(0..mesh.vertex_count, 0..TILE_COUNT as u32);
    }

    /// Records a copy of the shaded target onto `target`.
    pub fn blit(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        framebuffer: &OffscreenFramebuffer,
        target: &wgpu::TextureView,
    ) {
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout: &self.blit_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&framebuffer.color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.blit_sampler),
                },
            ],
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.blit_pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

fn check_scope(gpu: &GpuContext, stage: &'static str) -> Result<(), RenderError> {
    match pollster::block_on(gpu.device.pop_error_scope()) {
        Some(error) => Err(RenderError::Pipeline {
            stage,
            message: error.to_string(),
        }),
        None => Ok(()),
    }
}

/// All GPU state of the switch board.
///
/// Created on the first paint; the framebuffer alone is replaced on resize.
pub struct SwitchRenderer {
    pass: SwitchPass,
    mesh: SwitchMesh,
    angles: InstanceAngles,
    picking: PickingResolver,
    framebuffer: Option<OffscreenFramebuffer>,
    camera: Camera,
}

impl SwitchRenderer {
    /// Loads the switch asset and builds every GPU resource for a viewport
    /// of `width` x `height`.
    pub fn new(
        gpu: &GpuContext,
        asset: &Path,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        tracing::info!(asset = %asset.display(), "initializing switch renderer");

        let geometry = SceneGeometry::load(asset)?;
        let pass = SwitchPass::new(gpu)?;
        let mesh = SwitchMesh::new(gpu, geometry.vertices());
        let angles = InstanceAngles::new(gpu);
        let picking = PickingResolver::new(gpu);

        let mut renderer = Self {
            pass,
            mesh,
            angles,
            picking,
            framebuffer: None,
            camera: Camera::new(),
        };
        renderer.resize(gpu, width, height);
        Ok(renderer)
    }

    /// Reallocates the framebuffer and recomputes the projection.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        OffscreenFramebuffer::ensure_size(&mut self.framebuffer, gpu, width, height);
        if let Some(framebuffer) = &self.framebuffer {
            self.camera.set_aspect(framebuffer.aspect());
        }
    }

    /// Draws the board with the given angles and blits it onto `target`.
    ///
    /// Returns `false` without drawing while the viewport is degenerate.
    pub fn render(
        &self,
        gpu: &GpuContext,
        target: &wgpu::TextureView,
        angles: &[f32; TILE_COUNT],
    ) -> bool {
        let Some(framebuffer) = &self.framebuffer else {
            return false;
        };

        self.angles.write(gpu, angles);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Switch Frame Encoder"),
            });

        self.pass
            .draw(gpu, &mut encoder, framebuffer, &self.camera, &self.mesh, &self.angles);
        self.pass.blit(gpu, &mut encoder, framebuffer, target);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        true
    }

    /// The switch under bottom-up framebuffer coordinates, if any.
    pub fn pick(
        &self,
        gpu: &GpuContext,
        x: u32,
        y_bottom_up: u32,
    ) -> Result<Option<usize>, RenderError> {
        match &self.framebuffer {
            Some(framebuffer) => self
                .picking
                .resolve_object_id(gpu, framebuffer, x, y_bottom_up),
            None => Ok(None),
        }
    }

    /// Size of the current framebuffer, if one is allocated.
    pub fn framebuffer_size(&self) -> Option<(u32, u32)> {
        self.framebuffer.as_ref().map(OffscreenFramebuffer::size)
    }

    /// Vertices drawn per switch.
    pub fn vertex_count(&self) -> u32 {
        self.mesh.vertex_count()
    }
}

//! The offscreen framebuffer the switch pass draws into.
//!
//! A single render pass writes two color targets at once plus depth/stencil:
//!
//! | Attachment | Format                 | Contents                     |
//! |------------|------------------------|------------------------------|
//! | color 0    | surface format         | shaded switches, blitted out |
//! | color 1    | `Rgba32Float`          | encoded object IDs           |
//! | depth      | `Depth24PlusStencil8`  | nearest-fragment depth       |
//!
//! The ID target is float so that the decimal-digit encoding reads back
//! exactly; see [`crate::picking`].

use crate::gpu::GpuContext;

/// Format of the object-ID attachment.
pub const OBJECT_ID_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Format of the combined depth/stencil attachment.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// One attachment of the offscreen framebuffer.
pub struct RenderTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used as attachment or for sampling.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        gpu: &GpuContext,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Color, object-ID and depth/stencil attachments sized to the viewport.
pub struct OffscreenFramebuffer {
    /// Shaded image. Sampled by the blit onto the visible surface.
    pub color: RenderTarget,
    /// Encoded object IDs. Copied from when picking.
    pub object_id: RenderTarget,
    /// Depth/stencil shared by both color outputs.
    pub depth_stencil: RenderTarget,
    width: u32,
    height: u32,
}

impl OffscreenFramebuffer {
    /// Allocates all attachments at `width` x `height`.
    ///
    /// Returns `None` for a degenerate size; nothing can be drawn until a
    /// real size arrives.
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            tracing::warn!(width, height, "skipping framebuffer allocation for empty viewport");
            return None;
        }
        let size = (width, height);

        let color = RenderTarget::new(
            gpu,
            "Switch Color Target",
            size,
            gpu.config.format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let object_id = RenderTarget::new(
            gpu,
            "Switch Object ID Target",
            size,
            OBJECT_ID_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );
        let depth_stencil = RenderTarget::new(
            gpu,
            "Switch Depth Stencil",
            size,
            DEPTH_STENCIL_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        tracing::debug!(width, height, "allocated offscreen framebuffer");
        Some(Self {
            color,
            object_id,
            depth_stencil,
            width,
            height,
        })
    }

    /// Recreates `slot` at the new size, or empties it for a degenerate size.
    ///
    /// Keeps the existing framebuffer when the size is unchanged.
    pub fn ensure_size(slot: &mut Option<Self>, gpu: &GpuContext, width: u32, height: u32) {
        if slot.as_ref().is_some_and(|fb| fb.size() == (width, height)) {
            return;
        }
        *slot = Self::new(gpu, width, height);
    }

    /// Current `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

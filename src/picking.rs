//! Pixel-accurate picking through the object-ID render target.
//!
//! The switch pass writes, next to the shaded image, a second image in which
//! every visible fragment carries its instance's ID spread across two color
//! channels as decimal digits:
//!
//! | Channel | Value                     |
//! |---------|---------------------------|
//! | red     | `(id mod 10) * 0.1`       |
//! | green   | `floor(id / 10) * 0.1`    |
//!
//! where `id = instance + 1`, so a cleared pixel (all zeros) means "no switch".
//! Depth testing applies to this image too, so the nearest switch wins.
//!
//! Picking copies the single texel under the cursor back to the CPU and
//! reverses the encoding.

use crate::framebuffer::OffscreenFramebuffer;
use crate::gpu::GpuContext;
use crate::puzzle::TILE_COUNT;
use crate::render::RenderError;

/// Bytes in one texel of the ID target (`Rgba32Float`).
const ID_TEXEL_SIZE: u64 = 4 * std::mem::size_of::<f32>() as u64;

// Two decimal digits are all the encoding carries.
const _: () = assert!(TILE_COUNT < 100);

/// The color the switch shader writes for `instance`.
pub fn encode_object_id(instance: usize) -> [f32; 4] {
    let id = (instance + 1) as f32;
    [(id % 10.0) * 0.1, (id / 10.0).floor() * 0.1, 0.0, 1.0]
}

/// Reverses [`encode_object_id`] on a texel read back from the ID target.
///
/// Returns `-1` for the cleared background.
pub fn decode_object_id(texel: [f32; 4]) -> i32 {
    let [r, g, ..] = texel;
    ((r * 10.0).round() + (g * 10.0).round() * 10.0) as i32 - 1
}

/// Converts between top-down window rows and bottom-up framebuffer rows.
///
/// The conversion is its own inverse.
pub fn flip_y(height: u32, y: u32) -> u32 {
    height.saturating_sub(y)
}

/// The texel `(column, row)` under bottom-up coordinates, with rows counted
/// from the top as textures store them.
///
/// `y_bottom_up` is valid in `1..=height`, which is what [`flip_y`] yields for
/// window rows `0..height`. Anything outside the framebuffer is `None`.
pub fn texel_origin((width, height): (u32, u32), x: u32, y_bottom_up: u32) -> Option<(u32, u32)> {
    if x >= width || y_bottom_up == 0 || y_bottom_up > height {
        return None;
    }
    Some((x, flip_y(height, y_bottom_up)))
}

/// Reads single texels of the ID target back to the CPU.
pub struct PickingResolver {
    readback: wgpu::Buffer,
}

impl PickingResolver {
    /// Allocates the staging buffer used for readback.
    pub fn new(gpu: &GpuContext) -> Self {
        let readback = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object ID Readback"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self { readback }
    }

    /// Returns the switch drawn at `(x, y_bottom_up)`, if any.
    ///
    /// `y_bottom_up` counts rows from the bottom edge, as produced by
    /// [`flip_y`]. Coordinates outside the framebuffer pick nothing. Blocks
    /// until the GPU has finished every previously submitted draw.
    pub fn resolve_object_id(
        &self,
        gpu: &GpuContext,
        framebuffer: &OffscreenFramebuffer,
        x: u32,
        y_bottom_up: u32,
    ) -> Result<Option<usize>, RenderError> {
        let Some((x, row)) = texel_origin(framebuffer.size(), x, y_bottom_up) else {
            return Ok(None);
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Object ID Readback Encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &framebuffer.object_id.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y: row, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        let submission = gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = self.readback.slice(..ID_TEXEL_SIZE);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let mapped = gpu
            .device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map_err(|e| RenderError::Readback(e.to_string()))
            .and_then(|_| match rx.recv() {
                Ok(result) => result.map_err(|e| RenderError::Readback(e.to_string())),
                Err(e) => Err(RenderError::Readback(e.to_string())),
            });
        if let Err(e) = mapped {
            self.readback.unmap();
            return Err(e);
        }

        let texel = {
            let data = slice.get_mapped_range();
            let floats: &[f32] = bytemuck::cast_slice(&data);
            [floats[0], floats[1], floats[2], floats[3]]
        };
        self.readback.unmap();

        let decoded = decode_object_id(texel);
        tracing::debug!(x, row, decoded, "object id readback");

        Ok(usize::try_from(decoded)
            .ok()
            .filter(|&index| index < TILE_COUNT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_instance_round_trips() {
        for instance in 0..TILE_COUNT {
            assert_eq!(decode_object_id(encode_object_id(instance)), instance as i32);
        }
    }

    #[test]
    fn cleared_pixel_decodes_to_background() {
        assert_eq!(decode_object_id([0.0; 4]), -1);
    }

    #[test]
    fn encoding_splits_decimal_digits() {
        let [r, g, b, a] = encode_object_id(15);
        assert!((r - 0.6).abs() < 1e-6);
        assert!((g - 0.1).abs() < 1e-6);
        assert_eq!((b, a), (0.0, 1.0));
    }

    #[test]
    fn decoding_tolerates_precision_loss() {
        // Slightly off values, as an 8-bit or half-float target would return.
        assert_eq!(decode_object_id([0.298, 0.102, 0.0, 1.0]), 12);
        assert_eq!(decode_object_id([0.0, 0.098, 0.0, 1.0]), 9);
    }

    #[test]
    fn flip_is_an_involution() {
        let height = 600;
        for y in [0, 1, 299, 599, 600] {
            assert_eq!(flip_y(height, flip_y(height, y)), y);
        }
        assert_eq!(flip_y(height, 0), 600);
        assert_eq!(flip_y(height, 600), 0);
    }

    #[test]
    fn window_rows_land_on_the_same_texture_row() {
        let size = (640, 480);
        for window_row in [0, 1, 239, 479] {
            assert_eq!(
                texel_origin(size, 10, flip_y(480, window_row)),
                Some((10, window_row))
            );
        }
    }

    #[test]
    fn coordinates_outside_the_framebuffer_pick_nothing() {
        let size = (640, 480);
        assert_eq!(texel_origin(size, 640, 1), None);
        assert_eq!(texel_origin(size, 0, 0), None);
        assert_eq!(texel_origin(size, 0, 481), None);
        // Below the window: the flip saturates to zero.
        assert_eq!(texel_origin(size, 0, flip_y(480, 500)), None);
        assert_eq!(texel_origin(size, 639, 480), Some((639, 0)));
        assert_eq!(texel_origin(size, 0, 1), Some((0, 479)));
    }
}

//! GPU textures backing images and off-screen framebuffers.
//!
//! This module provides [`Texture`], a wrapper around a WGPU texture whose
//! storage is rounded up to power-of-two dimensions. The logical size is what
//! callers see; the extra storage stays transparent and is never sampled
//! because texel coordinates are computed against the storage size.

use anyhow::*;
use image::GenericImageView;

use crate::{
    context::Gpu,
    math::{checked_next_pow2, next_pow2},
};

/// Sampling filter used when a texture is scaled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

impl From<Filter> for wgpu::FilterMode {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => wgpu::FilterMode::Nearest,
            Filter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// A GPU texture with a view and sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    width: u32,
    height: u32,
    filter: Filter,
}

impl Texture {
    /// Colour format of every off-screen texture.
    ///
    /// Linear (non-sRGB) so that read-back pixels equal the values written.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Create an empty (transparent) texture that can be drawn into and read back.
    pub fn new(gpu: &Gpu, width: u32, height: u32, filter: Filter) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "texture size must be positive, got {}x{}",
            width,
            height
        );
        let limit = gpu.device.limits().max_texture_dimension_2d;
        let storage = storage_extent(width, height, limit)?;

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("image texture"),
            size: storage,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(&gpu.device, filter);

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
            filter,
        })
    }

    /// Upload a decoded image into the top-left corner of a fresh texture.
    pub fn from_image(gpu: &Gpu, img: &image::DynamicImage, filter: Filter) -> Result<Self> {
        let (width, height) = img.dimensions();
        let texture = Self::new(gpu, width, height, filter)?;
        let rgba = img.to_rgba8();

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Ok(texture)
    }

    /// Decode raw image file contents (PNG, JPEG, ...) and upload them.
    pub fn from_bytes(gpu: &Gpu, bytes: &[u8], filter: Filter) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("could not decode image")?;
        Self::from_image(gpu, &img, filter)
    }

    /// Logical size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Allocated (power-of-two) size in pixels.
    pub fn storage_size(&self) -> (u32, u32) {
        (next_pow2(self.width), next_pow2(self.height))
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub(crate) fn bind_group(&self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("source_texture_bind_group"),
        })
    }
}

fn create_sampler(device: &wgpu::Device, filter: Filter) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter.into(),
        min_filter: filter.into(),
        ..Default::default()
    })
}

/// Power-of-two storage for a `width`x`height` texture on a device whose
/// largest 2D texture side is `limit`.
fn storage_extent(width: u32, height: u32, limit: u32) -> Result<wgpu::Extent3d> {
    ensure!(
        width <= limit && height <= limit,
        "texture size {}x{} exceeds the device limit of {}",
        width,
        height,
        limit
    );
    let (Some(storage_width), Some(storage_height)) = (checked_next_pow2(width), checked_next_pow2(height)) else {
        bail!("texture size {}x{} has no power-of-two storage", width, height);
    };
    ensure!(
        storage_width <= limit && storage_height <= limit,
        "texture storage {}x{} exceeds the device limit of {}",
        storage_width,
        storage_height,
        limit
    );
    Ok(wgpu::Extent3d {
        width: storage_width,
        height: storage_height,
        depth_or_array_layers: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_rounds_each_side_up() {
        let extent = storage_extent(3, 5, 8192).unwrap();
        assert_eq!((extent.width, extent.height, extent.depth_or_array_layers), (4, 8, 1));
    }

    #[test]
    fn sizes_above_the_limit_are_errors() {
        assert!(storage_extent(3_000_000_000, 1, 8192).is_err());
        assert!(storage_extent(1, u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn rounding_past_the_limit_is_an_error() {
        assert!(storage_extent(5000, 16, 8000).is_err());
        assert!(storage_extent(4096, 16, 8000).is_ok());
    }
}

//! Render targets.
//!
//! A [`Framebuffer`] is either the window surface (the screen) or an
//! off-screen [`Texture`]. Every draw operation records one render pass into
//! a fresh encoder and submits it right away, so operations are ordered
//! exactly as they are issued.

use std::iter;

use anyhow::*;
use image::Rgba;

use crate::{
    context::Gpu,
    data_structures::{
        quads::{self, Lines, Rects, TextureQuads},
        texture::Texture,
    },
    math::{ColorM, GeoM, next_pow2, ortho_projection},
    pipelines::DrawUniform,
};

#[derive(Debug)]
enum Target {
    /// The window surface. The view is only present while a frame is being drawn.
    Screen {
        format: wgpu::TextureFormat,
        view: Option<wgpu::TextureView>,
    },
    Texture(Texture),
}

#[derive(Debug)]
pub struct Framebuffer {
    target: Target,
    width: u32,
    height: u32,
}

impl Framebuffer {
    /// The on-screen framebuffer for a surface of the given format and size.
    pub fn new_screen(format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        Self {
            target: Target::Screen { format, view: None },
            width,
            height,
        }
    }

    pub fn from_texture(texture: &Texture) -> Self {
        let (width, height) = texture.size();
        Self {
            target: Target::Texture(texture.clone()),
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_screen(&self) -> bool {
        matches!(self.target, Target::Screen { .. })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match &self.target {
            Target::Screen { format, .. } => *format,
            Target::Texture(_) => Texture::FORMAT,
        }
    }

    /// Track a resized surface. No-op for texture-backed framebuffers.
    pub fn resize_screen(&mut self, width: u32, height: u32) {
        if self.is_screen() {
            self.width = width;
            self.height = height;
        }
    }

    /// Point the screen framebuffer at the surface texture of the current frame.
    pub fn attach_view(&mut self, frame_view: wgpu::TextureView) -> Result<()> {
        match &mut self.target {
            Target::Screen { view, .. } => {
                *view = Some(frame_view);
                Ok(())
            }
            Target::Texture(_) => bail!("only the screen framebuffer takes a surface view"),
        }
    }

    pub fn detach_view(&mut self) {
        if let Target::Screen { view, .. } = &mut self.target {
            *view = None;
        }
    }

    /// Viewport dimensions used for drawing.
    ///
    /// Texture-backed framebuffers cover their whole power-of-two storage; the
    /// surface is allocated at its exact size.
    pub fn viewport_size(&self) -> (u32, u32) {
        match self.target {
            Target::Screen { .. } => (self.width.max(1), self.height.max(1)),
            Target::Texture(_) => (next_pow2(self.width), next_pow2(self.height)),
        }
    }

    /// Y-down orthographic projection over the viewport: pixel `(0, 0)` is the top-left.
    pub fn projection_matrix(&self) -> cgmath::Matrix4<f32> {
        let (width, height) = self.viewport_size();
        ortho_projection(0, width as i32, height as i32, 0)
    }

    fn view(&self) -> Result<&wgpu::TextureView> {
        match &self.target {
            Target::Screen { view, .. } => view
                .as_ref()
                .ok_or_else(|| anyhow!("the screen can only be drawn while a frame is acquired")),
            Target::Texture(texture) => Ok(&texture.view),
        }
    }

    fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> Result<wgpu::RenderPass<'e>> {
        let view = self.view()?;
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Framebuffer Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        let (width, height) = self.viewport_size();
        render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        Ok(render_pass)
    }

    fn encoder(gpu: &Gpu, label: &str) -> wgpu::CommandEncoder {
        gpu.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Clear the whole target to a colour (components in `0.0..=1.0`).
    pub fn fill(&self, gpu: &Gpu, r: f64, g: f64, b: f64, a: f64) -> Result<()> {
        let mut encoder = Self::encoder(gpu, "Fill Encoder");
        {
            let _render_pass = self.begin_pass(
                &mut encoder,
                wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
            )?;
        }
        gpu.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }

    /// Draw textured quads from `texture` through the geometry and colour matrices.
    pub fn draw_texture<Q: TextureQuads + ?Sized>(
        &self,
        gpu: &Gpu,
        texture: &Texture,
        quads: &Q,
        geo: &GeoM,
        color: &ColorM,
    ) -> Result<()> {
        if quads.is_empty() {
            return Ok(());
        }
        use wgpu::util::DeviceExt;

        let pipelines = gpu.pipelines(self.format());
        let (vertices, indices) = quads::texture_vertices(quads, texture.storage_size());
        let uniform = DrawUniform::new(self.projection_matrix(), geo, color);
        let uniform_group = pipelines.uniform_bind_group(&gpu.device, &uniform);
        let texture_group = texture.bind_group(&gpu.device, &pipelines.texture_layout);
        let vertex = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Texture Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Texture Quad Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut encoder = Self::encoder(gpu, "Texture Quad Encoder");
        {
            let mut render_pass = self.begin_pass(&mut encoder, wgpu::LoadOp::Load)?;
            render_pass.set_pipeline(&pipelines.texture);
            render_pass.set_bind_group(0, &uniform_group, &[]);
            render_pass.set_bind_group(1, &texture_group, &[]);
            render_pass.set_vertex_buffer(0, vertex.slice(..));
            render_pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..indices.len() as u32, 0, 0..1);
        }
        gpu.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }

    pub fn draw_lines<L: Lines + ?Sized>(&self, gpu: &Gpu, lines: &L) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let vertices = quads::line_vertices(lines);
        let pipelines = gpu.pipelines(self.format());
        self.draw_shapes(gpu, &pipelines.lines, &pipelines, &vertices, "Line")
    }

    pub fn draw_filled_rects<R: Rects + ?Sized>(&self, gpu: &Gpu, rects: &R) -> Result<()> {
        if rects.is_empty() {
            return Ok(());
        }
        let vertices = quads::rect_vertices(rects);
        let pipelines = gpu.pipelines(self.format());
        self.draw_shapes(gpu, &pipelines.rects, &pipelines, &vertices, "Filled Rect")
    }

    fn draw_shapes(
        &self,
        gpu: &Gpu,
        pipeline: &wgpu::RenderPipeline,
        pipelines: &crate::pipelines::Pipelines,
        vertices: &[crate::pipelines::shape::ColoredVertex],
        label: &str,
    ) -> Result<()> {
        use wgpu::util::DeviceExt;

        let uniform = DrawUniform::new(
            self.projection_matrix(),
            &GeoM::identity(),
            &ColorM::identity(),
        );
        let uniform_group = pipelines.uniform_bind_group(&gpu.device, &uniform);
        let vertex = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let mut encoder = Self::encoder(gpu, label);
        {
            let mut render_pass = self.begin_pass(&mut encoder, wgpu::LoadOp::Load)?;
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &uniform_group, &[]);
            render_pass.set_vertex_buffer(0, vertex.slice(..));
            render_pass.draw(0..vertices.len() as u32, 0..1);
        }
        gpu.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }

    /// Read back the full power-of-two storage as tightly packed RGBA8 rows.
    ///
    /// Only texture-backed framebuffers can be read.
    pub async fn read_pixels(&self, gpu: &Gpu) -> Result<Vec<u8>> {
        let texture = match &self.target {
            Target::Texture(texture) => texture,
            Target::Screen { .. } => bail!("the screen framebuffer cannot be read back"),
        };
        let (width, height) = texture.storage_size();
        let unpadded = 4 * width;
        let padded = padded_bytes_per_row(width);

        let output_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("Pixel Read-back Buffer"),
            mapped_at_creation: false,
        });
        let mut encoder = Self::encoder(gpu, "Pixel Read-back Encoder");
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        #[cfg(not(target_arch = "wasm32"))]
        gpu.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .context("waiting for the read-back copy failed")?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow!("read-back buffer mapping was cancelled"))?
            .context("could not map the read-back buffer")?;

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            strip_row_padding(&data, unpadded as usize, padded as usize, height as usize)
        };
        output_buffer.unmap();
        Ok(pixels)
    }
}

/// Row pitch required by `copy_texture_to_buffer`.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

pub(crate) fn strip_row_padding(data: &[u8], unpadded: usize, padded: usize, rows: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(unpadded * rows);
    for row in data.chunks(padded).take(rows) {
        pixels.extend_from_slice(&row[..unpadded]);
    }
    pixels
}

/// Crop a row-major RGBA8 buffer of `stride_width` pixels per row down to `width x height`.
pub(crate) fn crop_pixels(pixels: &[u8], stride_width: u32, width: u32, height: u32) -> Vec<u8> {
    let stride = 4 * stride_width as usize;
    let row_len = 4 * width as usize;
    pixels
        .chunks(stride)
        .take(height as usize)
        .flat_map(|row| row[..row_len].iter().copied())
        .collect()
}

pub(crate) fn color_to_wgpu(color: Rgba<u8>) -> wgpu::Color {
    let [r, g, b, a] = quads::normalize_color(color);
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: f64::from(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn screen_viewport_is_exact() {
        let fb = Framebuffer::new_screen(wgpu::TextureFormat::Bgra8Unorm, 640, 480);
        assert!(fb.is_screen());
        assert_eq!(fb.size(), (640, 480));
        assert_eq!(fb.viewport_size(), (640, 480));
    }

    #[test]
    fn screen_projection_maps_pixels_top_down() {
        let fb = Framebuffer::new_screen(wgpu::TextureFormat::Bgra8Unorm, 512, 256);
        let p = fb.projection_matrix();
        let origin = p * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let far = p * Vector4::new(512.0, 256.0, 0.0, 1.0);
        assert_eq!((origin.x, origin.y), (-1.0, 1.0));
        assert_eq!((far.x, far.y), (1.0, -1.0));
    }

    #[test]
    fn resize_only_touches_the_screen() {
        let mut fb = Framebuffer::new_screen(wgpu::TextureFormat::Rgba8Unorm, 10, 10);
        fb.resize_screen(20, 30);
        assert_eq!(fb.size(), (20, 30));
    }

    #[test]
    fn screen_without_frame_cannot_be_drawn() {
        let mut fb = Framebuffer::new_screen(wgpu::TextureFormat::Rgba8Unorm, 10, 10);
        assert!(fb.view().is_err());
        fb.detach_view();
        assert!(fb.view().is_err());
    }

    #[test]
    fn row_pitch_is_aligned() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(128), 512);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        let mut data = vec![0u8; 2 * 8];
        data[0..4].copy_from_slice(&[1, 2, 3, 4]);
        data[8..12].copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(strip_row_padding(&data, 4, 8, 2), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn crop_keeps_the_top_left_region() {
        // 2x2 image, crop to 1x1
        let pixels = vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
        assert_eq!(crop_pixels(&pixels, 2, 1, 1), vec![1, 1, 1, 1]);
        assert_eq!(crop_pixels(&pixels, 2, 2, 1), vec![1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn colors_convert_to_unit_range() {
        let c = color_to_wgpu(Rgba([255, 0, 0, 255]));
        assert_eq!((c.r, c.g, c.b, c.a), (1.0, 0.0, 0.0, 1.0));
    }
}

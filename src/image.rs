//! Drawable images.
//!
//! An [`Image`] pairs a [`Framebuffer`] with the [`Texture`] behind it, so it
//! can be both drawn into and drawn from. The screen handed to
//! [`crate::flow::Game::on_draw`] is an `Image` too.

use anyhow::*;
use image::Rgba;

use crate::{
    context::Gpu,
    data_structures::{
        framebuffer::{self, Framebuffer},
        quads::{FilledRect, ImagePart, Line, Lines, Rect, Rects, TextureQuads},
        texture::{Filter, Texture},
    },
    math::{ColorM, GeoM},
};

/// How [`Image::draw_image`] maps the source onto the target.
#[derive(Clone, Debug, Default)]
pub struct DrawImageOptions {
    pub geo: GeoM,
    pub color: ColorM,
    /// Regions to copy. `None` draws the whole source at the origin.
    pub parts: Option<Vec<ImagePart>>,
}

#[derive(Debug)]
pub struct Image {
    gpu: Gpu,
    framebuffer: Framebuffer,
    texture: Option<Texture>,
}

impl Image {
    /// A transparent off-screen image.
    pub fn new(gpu: &Gpu, width: u32, height: u32, filter: Filter) -> Result<Self> {
        let texture = Texture::new(gpu, width, height, filter)?;
        Ok(Self::from_texture(gpu, texture))
    }

    pub fn from_image(gpu: &Gpu, img: &image::DynamicImage, filter: Filter) -> Result<Self> {
        let texture = Texture::from_image(gpu, img, filter)?;
        Ok(Self::from_texture(gpu, texture))
    }

    fn from_texture(gpu: &Gpu, texture: Texture) -> Self {
        Self {
            gpu: gpu.clone(),
            framebuffer: Framebuffer::from_texture(&texture),
            texture: Some(texture),
        }
    }

    /// The on-screen image. It has no texture and cannot be a draw source.
    pub(crate) fn screen(gpu: &Gpu, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        Self {
            gpu: gpu.clone(),
            framebuffer: Framebuffer::new_screen(format, width, height),
            texture: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.framebuffer.size()
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub(crate) fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Make every pixel transparent.
    pub fn clear(&mut self) -> Result<()> {
        self.framebuffer.fill(&self.gpu, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn fill(&mut self, color: Rgba<u8>) -> Result<()> {
        let c = framebuffer::color_to_wgpu(color);
        self.framebuffer.fill(&self.gpu, c.r, c.g, c.b, c.a)
    }

    pub fn draw_image(&mut self, src: &Image, options: &DrawImageOptions) -> Result<()> {
        let texture = src
            .texture
            .as_ref()
            .ok_or_else(|| anyhow!("the screen image cannot be used as a draw source"))?;
        match &options.parts {
            Some(parts) => self.draw_texture_quads(texture, parts.as_slice(), options),
            None => {
                let (width, height) = texture.size();
                let whole = Rect::new(0, 0, width as i32, height as i32);
                let parts = [ImagePart {
                    dst: whole,
                    src: whole,
                }];
                self.draw_texture_quads(texture, &parts[..], options)
            }
        }
    }

    /// Draw any batch of quads sampling `src`, e.g. a sprite list implementing [`TextureQuads`].
    pub fn draw_quads<Q: TextureQuads + ?Sized>(
        &mut self,
        src: &Image,
        quads: &Q,
        options: &DrawImageOptions,
    ) -> Result<()> {
        let texture = src
            .texture
            .as_ref()
            .ok_or_else(|| anyhow!("the screen image cannot be used as a draw source"))?;
        self.draw_texture_quads(texture, quads, options)
    }

    fn draw_texture_quads<Q: TextureQuads + ?Sized>(
        &self,
        texture: &Texture,
        quads: &Q,
        options: &DrawImageOptions,
    ) -> Result<()> {
        self.framebuffer
            .draw_texture(&self.gpu, texture, quads, &options.geo, &options.color)
    }

    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) -> Result<()> {
        let line = [Line {
            x0,
            y0,
            x1,
            y1,
            color,
        }];
        self.draw_lines(&line[..])
    }

    pub fn draw_lines<L: Lines + ?Sized>(&mut self, lines: &L) -> Result<()> {
        self.framebuffer.draw_lines(&self.gpu, lines)
    }

    pub fn draw_filled_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Rgba<u8>,
    ) -> Result<()> {
        let rect = [FilledRect {
            rect: Rect::new(x, y, width, height),
            color,
        }];
        self.draw_filled_rects(&rect[..])
    }

    pub fn draw_filled_rects<R: Rects + ?Sized>(&mut self, rects: &R) -> Result<()> {
        self.framebuffer.draw_filled_rects(&self.gpu, rects)
    }

    /// RGBA8 pixels of the logical area, row-major, 4 bytes per pixel.
    pub async fn read_pixels(&self) -> Result<Vec<u8>> {
        let pixels = self.framebuffer.read_pixels(&self.gpu).await?;
        let (width, height) = self.size();
        let stride_width = self
            .texture
            .as_ref()
            .map(|texture| texture.storage_size().0)
            .unwrap_or(width);
        Ok(framebuffer::crop_pixels(&pixels, stride_width, width, height))
    }

    /// Blocking variant of [`Image::read_pixels`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn pixels(&self) -> Result<Vec<u8>> {
        futures::executor::block_on(self.read_pixels())
    }

    /// Colour of a single pixel. Reads the whole image back; batch with [`Image::pixels`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn at(&self, x: u32, y: u32) -> Result<Rgba<u8>> {
        let (width, height) = self.size();
        ensure!(
            x < width && y < height,
            "({}, {}) is outside the {}x{} image",
            x,
            y,
            width,
            height
        );
        let pixels = self.pixels()?;
        let i = 4 * (y * width + x) as usize;
        Ok(Rgba([pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]))
    }
}

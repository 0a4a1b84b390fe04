#![allow(dead_code)]

use flat_ngin::{
    Gpu, HeadlessContext, Rgba,
    data_structures::{framebuffer::Framebuffer, texture::Texture},
};

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Run `f` against a fresh windowless GPU and unwrap every layer of failure.
pub fn with_gpu<R, F>(f: F) -> R
where
    F: FnOnce(&Gpu) -> anyhow::Result<R> + Send + 'static,
    R: Send + 'static,
{
    let ctx = HeadlessContext::new().expect("no GPU adapter available for integration tests");
    ctx.use_gpu(f)
        .expect("GPU job panicked")
        .expect("GPU job failed")
}

/// Pixel `(x, y)` of a tightly packed RGBA buffer `width` pixels wide.
pub fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> Rgba<u8> {
    let i = 4 * (y * width + x) as usize;
    Rgba([pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]])
}

/// Read a texture's whole power-of-two storage back; rows are `storage_size().0` pixels wide.
pub fn read_texture(gpu: &Gpu, texture: &Texture) -> anyhow::Result<Vec<u8>> {
    futures::executor::block_on(Framebuffer::from_texture(texture).read_pixels(gpu))
}

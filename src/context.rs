//! GPU and window contexts.
//!
//! - [`Gpu`] is the cheap-to-clone handle every image and framebuffer draws
//!   through: device, queue and the per-format pipeline cache.
//! - [`Context`] binds a [`Gpu`] to a window surface.
//! - [`GraphicsContext`] owns the off-screen `screen` image games draw into
//!   and the on-screen image it is scaled onto once per frame.

use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    data_structures::texture::Filter,
    image::{DrawImageOptions, Image},
    pipelines::{PipelineCache, Pipelines},
};

/// Device, queue and pipelines.
///
/// Cloning only clones reference counts; all clones share the same device and
/// pipeline cache.
#[derive(Clone, Debug)]
pub struct Gpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pipelines: Arc<PipelineCache>,
}

impl Gpu {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            pipelines: Arc::new(PipelineCache::default()),
        }
    }

    /// Request an adapter and device from `instance`.
    ///
    /// Pass the window surface when there is one so the adapter can present to it.
    pub async fn request(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> anyhow::Result<(wgpu::Adapter, Self)> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flat-ngin device"),
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create the GPU device")?;

        Ok((adapter, Self::new(device, queue)))
    }

    pub(crate) fn pipelines(&self, format: wgpu::TextureFormat) -> Arc<Pipelines> {
        self.pipelines.get(&self.device, format)
    }
}

/// A [`Gpu`] bound to a window surface.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    pub gpu: Gpu,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create the window surface")?;
        let (adapter, gpu) = Gpu::request(&instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps.formats)
            .context("the surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            // Fifo waits for vblank.
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        log::debug!("Surface configured as {:?}", config);

        Ok(Self {
            window,
            surface,
            config,
            gpu,
        })
    }

    /// Reconfigure the surface. Zero-sized requests are ignored and return `false`.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.gpu.device, &self.config);
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn acquire_frame(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}

/// Prefer a linear 8-bit format so colours reach the screen unchanged.
pub(crate) fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
        .into_iter()
        .find(|preferred| formats.contains(preferred))
        .or_else(|| formats.iter().copied().find(|f| !f.is_srgb()))
        .or_else(|| formats.first().copied())
}

/// The game's logical screen and the surface it is presented on.
#[derive(Debug)]
pub struct GraphicsContext {
    screen: Image,
    default: Image,
    scale: f64,
    clear_color: image::Rgba<u8>,
}

impl GraphicsContext {
    /// `screen_width x screen_height` is the logical resolution games draw at;
    /// it is magnified by `scale` onto a surface of `surface_size`.
    pub fn new(
        gpu: &Gpu,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
        screen_width: u32,
        screen_height: u32,
        scale: f64,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(scale > 0.0, "scale must be positive, got {}", scale);
        let screen = Image::new(gpu, screen_width, screen_height, Filter::Nearest)?;
        let default = Image::screen(gpu, surface_format, surface_size.0, surface_size.1);
        Ok(Self {
            screen,
            default,
            scale,
            clear_color: image::Rgba([0, 0, 0, 0]),
        })
    }

    pub fn screen(&self) -> &Image {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Image {
        &mut self.screen
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Follow a change of the actual scale, e.g. after moving to a high-DPI monitor.
    pub fn set_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.scale = scale;
        }
    }

    /// Colour of the surface around and behind the magnified screen.
    pub fn set_clear_color(&mut self, color: image::Rgba<u8>) {
        self.clear_color = color;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.default.framebuffer_mut().resize_screen(width, height);
    }

    /// Start a frame: wipe the logical screen.
    pub fn pre_update(&mut self) -> anyhow::Result<()> {
        self.screen.clear()
    }

    /// Finish a frame: present the logical screen, magnified, into `frame_view`.
    pub fn post_update(&mut self, frame_view: wgpu::TextureView) -> anyhow::Result<()> {
        self.default.framebuffer_mut().attach_view(frame_view)?;
        let result = self.draw_screen();
        self.default.framebuffer_mut().detach_view();
        result
    }

    fn draw_screen(&mut self) -> anyhow::Result<()> {
        self.default.fill(self.clear_color)?;
        let mut options = DrawImageOptions::default();
        options.geo.scale(self.scale, self.scale);
        self.default.draw_image(&self.screen, &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn linear_formats_win() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn falls_back_to_any_non_srgb_then_first() {
        let formats = [TextureFormat::Rgba8UnormSrgb, TextureFormat::Rgba16Float];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Rgba16Float));
        let formats = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(choose_surface_format(&[]), None);
    }
}

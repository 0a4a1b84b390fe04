//! Windowless GPU access for off-screen rendering and tests.

use anyhow::*;

use crate::{affinity::ContextThread, context::Gpu};

/// A GPU device without a window, owned by its own [`ContextThread`].
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use flat_ngin::{Filter, HeadlessContext, Image, Rgba};
///
/// let ctx = HeadlessContext::new()?;
/// let pixel = ctx.use_gpu(|gpu| -> anyhow::Result<Rgba<u8>> {
///     let mut image = Image::new(gpu, 4, 4, Filter::Nearest)?;
///     image.fill(Rgba([255, 0, 0, 255]))?;
///     image.at(0, 0)
/// })??;
/// assert_eq!(pixel, Rgba([255, 0, 0, 255]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HeadlessContext {
    thread: ContextThread<Gpu>,
}

impl HeadlessContext {
    pub fn new() -> Result<Self> {
        let thread = ContextThread::spawn("flat-ngin-gpu", || {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let (adapter, gpu) = futures::executor::block_on(Gpu::request(&instance, None))?;
            log::info!("Headless context on {:?}", adapter.get_info().backend);
            Ok(gpu)
        })?;
        Ok(Self { thread })
    }

    /// Run `f` with the GPU on the context thread and wait for the result.
    pub fn use_gpu<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Gpu) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.thread.use_context(move |gpu| f(gpu))
    }
}

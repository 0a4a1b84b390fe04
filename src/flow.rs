//! Game loop and application event handling.
//!
//! A game implements [`Game`] and hands itself to [`run`] together with the
//! [`Settings`] of its window. The engine opens the window (or canvas),
//! creates the GPU context and then drives the game once per displayed frame.
//!
//! # Lifecycle Flow
//!
//! Each frame:
//! 1. Poll gamepads into [`Input`]
//! 2. Call [`Game::on_update`] with the elapsed time
//! 3. Clear the logical screen
//! 4. Call [`Game::on_draw`] with the logical screen
//! 5. Acquire the surface texture and draw the screen onto it, magnified
//! 6. Present (vsync)
//!
//! While the window is unfocused (desktop) or the page is hidden (browser)
//! events keep flowing but frames are skipped.

use std::sync::Arc;

use anyhow::Context as _;
use image::Rgba;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::Window,
};

use crate::{
    context::{Context, Gpu, GraphicsContext},
    image::Image,
    input::{Gamepads, Input},
    ui,
};

/// Window and screen configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Logical screen width in pixels.
    pub width: u32,
    /// Logical screen height in pixels.
    pub height: u32,
    /// Integer magnification of the screen in the window.
    pub scale: u32,
    pub title: String,
    /// Surface colour around and behind the screen.
    pub clear_color: Rgba<u8>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            scale: 2,
            title: String::from("flat-ngin"),
            clear_color: Rgba([0, 0, 0, 255]),
        }
    }
}

impl Settings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_clear_color(mut self, clear_color: Rgba<u8>) -> Self {
        self.clear_color = clear_color;
        self
    }

    /// Window size in logical (unscaled by DPI) pixels.
    ///
    /// Saturates at `u32::MAX`; [`run`] rejects settings where that happens.
    pub fn window_size(&self) -> (u32, u32) {
        (self.width.saturating_mul(self.scale), self.height.saturating_mul(self.scale))
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.width > 0 && self.height > 0,
            "screen size must be positive, got {}x{}",
            self.width,
            self.height
        );
        anyhow::ensure!(self.scale > 0, "scale must be positive");
        anyhow::ensure!(
            self.width.checked_mul(self.scale).is_some() && self.height.checked_mul(self.scale).is_some(),
            "window size {}x{} at scale {} does not fit in a u32",
            self.width,
            self.height,
            self.scale
        );
        Ok(())
    }
}

/// A game driven by [`run`].
///
/// # Lifecycle
///
/// 1. `on_init()` is called once the GPU is ready; load images here
/// 2. `on_window_event()` is called for each winit window event
/// 3. `on_update()` is called every frame
/// 4. `on_draw()` is called every frame right after `on_update()`
///
/// Returning an error from any hook stops the loop; [`run`] returns it.
pub trait Game: 'static {
    fn on_init(&mut self, _gpu: &Gpu) -> anyhow::Result<()> {
        Ok(())
    }

    /// Advance the simulation by `dt`.
    fn on_update(&mut self, input: &Input, dt: Duration) -> anyhow::Result<()>;

    /// Draw the current state into `screen`, which was cleared just before.
    fn on_draw(&self, screen: &mut Image) -> anyhow::Result<()>;

    fn on_window_event(&mut self, _event: &WindowEvent) {}
}

/// Everything that exists once the window and GPU are up.
pub(crate) struct AppState {
    ctx: Context,
    graphics: GraphicsContext,
    input: Input,
    gamepads: Gamepads,
    focused: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, settings: Settings) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        let (surface_width, _) = ctx.size();
        let mut graphics = GraphicsContext::new(
            &ctx.gpu,
            ctx.config.format,
            ctx.size(),
            settings.width,
            settings.height,
            ui::actual_scale(surface_width, settings.width),
        )?;
        graphics.set_clear_color(settings.clear_color);
        log::info!(
            "Screen {}x{} at scale {}",
            settings.width,
            settings.height,
            graphics.scale()
        );

        Ok(Self {
            ctx,
            graphics,
            input: Input::new(),
            gamepads: Gamepads::new(),
            focused: true,
        })
    }

    fn resize(&mut self, width: u32, height: u32, screen_width: u32) {
        if self.ctx.resize(width, height) {
            self.graphics.resize(width, height);
            self.graphics.set_scale(ui::actual_scale(width, screen_width));
        }
    }

    fn frame<G: Game>(&mut self, game: &mut G, dt: Duration, screen_width: u32) -> anyhow::Result<()> {
        self.gamepads.poll(&mut self.input);
        game.on_update(&self.input, dt)?;

        self.graphics.pre_update()?;
        game.on_draw(self.graphics.screen_mut())?;

        let output = match self.ctx.acquire_frame() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.ctx.window.inner_size();
                self.resize(size.width, size.height, screen_width);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e).context("unable to acquire the next frame"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.graphics.post_update(view)?;

        self.ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized(anyhow::Result<AppState>),
}

impl std::fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.as_ref().map(|_| "AppState"))
                .finish(),
        }
    }
}

pub(crate) struct App<G: Game> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    settings: Settings,
    game: G,
    state: Option<AppState>,
    initializing: bool,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl<G: Game> App<G> {
    fn new(event_loop: &EventLoop<FlowEvent>, game: G, settings: Settings) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime =
            tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            settings,
            game,
            state: None,
            initializing: false,
            last_time: Instant::now(),
            error: None,
        })
    }

    /// Wire a freshly created state to the game and start drawing.
    fn start(&mut self, event_loop: &ActiveEventLoop, mut state: AppState) {
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height, self.settings.width);
        if let Err(e) = self.game.on_init(&state.ctx.gpu) {
            self.fail(event_loop, e.context("game initialisation failed"));
            return;
        }
        state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(state);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }
}

impl<G: Game> ApplicationHandler<FlowEvent> for App<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.initializing {
            return;
        }

        let window_attributes = match ui::window_attributes(event_loop, &self.settings) {
            Ok(attributes) => attributes,
            Err(e) => return self.fail(event_loop, e.context("failed to prepare the window")),
        };
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, anyhow::Error::new(e).context("failed to create the window")),
        };

        let init_future = AppState::new(window, self.settings.clone());
        self.initializing = true;

        #[cfg(not(target_arch = "wasm32"))]
        {
            let state = self
                .async_runtime
                .block_on(init_future)
                .unwrap_or_else(|e| panic!("App initialization failed. Cannot create the main context: {:#}", e));
            self.initializing = false;
            self.start(event_loop, state);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = init_future.await;
                if proxy.send_event(FlowEvent::Initialized(result)).is_err() {
                    log::error!("Event loop closed before the context was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized(result) => {
                self.initializing = false;
                let state = result
                    .unwrap_or_else(|e| panic!("App initialization failed. Cannot create the main context: {:#}", e));
                self.start(event_loop, state);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let actual_scale = state.graphics.scale();
        state.input.handle_window_event(&event, actual_scale);
        self.game.on_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height, self.settings.width),
            WindowEvent::Focused(focused) => state.focused = focused,
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                if ui::is_paused(state.focused) {
                    return;
                }
                if let Err(e) = state.frame(&mut self.game, dt, self.settings.width) {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &self.state else {
            return;
        };
        #[cfg(not(target_arch = "wasm32"))]
        if ui::is_paused(state.focused) {
            event_loop.set_control_flow(ControlFlow::WaitUntil(
                std::time::Instant::now() + ui::PAUSE_POLL_INTERVAL,
            ));
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);
        // Hidden pages get no animation frames, so this also waits in the browser.
        state.ctx.window.request_redraw();
    }
}

/// Open the window, run `game` until the window closes and return the first error.
pub fn run<G: Game>(game: G, settings: Settings) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).context("could not initialize logger")?;
    }

    settings.validate()?;

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, game, settings)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!((settings.width, settings.height, settings.scale), (320, 240, 2));
        assert_eq!(settings.window_size(), (640, 480));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn builders_override_fields() {
        let settings = Settings::new(256, 240)
            .with_scale(3)
            .with_title("Sprites")
            .with_clear_color(Rgba([1, 2, 3, 4]));
        assert_eq!(settings.window_size(), (768, 720));
        assert_eq!(settings.title, "Sprites");
        assert_eq!(settings.clear_color, Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(Settings::new(0, 10).validate().is_err());
        assert!(Settings::new(10, 10).with_scale(0).validate().is_err());
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let settings = Settings::new(1 << 20, 240).with_scale(1 << 12);
        assert!(settings.validate().is_err());
        assert_eq!(settings.window_size(), (u32::MAX, 240 << 12));
        assert!(Settings::new(256, 1 << 31).with_scale(2).validate().is_err());
        assert!(Settings::new(1 << 16, 1 << 16).with_scale(1 << 15).validate().is_ok());
    }
}

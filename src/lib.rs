//! flat-ngin
//!
//! A small cross-platform 2D rendering library for native and WASM. Games
//! draw into a fixed-resolution logical screen made of texture-backed
//! images; the engine magnifies that screen into a window (or browser
//! canvas) once per frame and feeds keyboard, mouse and gamepad input back.
//!
//! High-level modules
//! - `math`: power-of-two sizes, orthographic projection, geometry and colour matrices
//! - `context`: GPU handle, window surface and the per-frame screen composition
//! - `data_structures`: textures, framebuffers and draw batches
//! - `image`: the drawable [`Image`] games work with
//! - `pipelines`: WGSL render pipelines for quads, rects and lines
//! - `flow`: the [`Game`] trait and the event/render loop
//! - `input` / `gamepad`: input state and gamepad button configuration
//! - `affinity` / `headless`: a thread owning a GPU context and windowless rendering
//! - `resources`: helpers to load images and files from `assets/`
//!

#[cfg(not(target_arch = "wasm32"))]
pub mod affinity;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gamepad;
#[cfg(not(target_arch = "wasm32"))]
pub mod headless;
pub mod image;
pub mod input;
pub mod math;
pub mod pipelines;
pub mod resources;
mod ui;

// Re-exports commonly used types for convenience in downstream code.
pub use crate::context::Gpu;
pub use crate::data_structures::quads::{FilledRect, ImagePart, Line, Lines, Rect, Rects, TextureQuads};
pub use crate::data_structures::texture::Filter;
pub use crate::flow::{Game, Settings, run};
#[cfg(not(target_arch = "wasm32"))]
pub use crate::headless::HeadlessContext;
pub use crate::image::{DrawImageOptions, Image};
pub use crate::input::Input;
pub use crate::math::{ColorM, GeoM};
pub use ::image::Rgba;
pub use instant::Duration;
pub use winit::event::{MouseButton, WindowEvent};
pub use winit::keyboard::KeyCode;

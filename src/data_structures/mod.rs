//! Engine data structures: textures, framebuffers and draw batches.
//!
//! - `texture` wraps a power-of-two GPU texture with its logical size
//! - `framebuffer` is a render target (the window surface or a texture) and the draw calls on it
//! - `quads` holds the batch traits and their vertex generation
//!

pub mod framebuffer;
pub mod quads;
pub mod texture;

//! Multi-pass feedback renderer.
//!
//! Every frame runs five full-screen fragment passes over shared float
//! targets, in a fixed order:
//!
//! ```text
//!   bufferA ──reads──> prior(A), prior(B)
//!   bufferB ──reads──> current(A), prior(B)
//!   bufferC ──reads──> current(A), prior(C)
//!   bufferD ──reads──> current(A), prior(D)
//!   image   ──reads──> current(A), current(B), current(C) ──blit──> window
//! ```
//!
//! Each buffer pass owns a read/write texture pair. Within a frame every
//! pass writes its pair's write half while reads resolve against either the
//! read half (prior frame) or the write half of an earlier pass in the same
//! frame. After present, all four pairs swap, so this frame's output is the
//! next frame's history.
//!
//! Pass programs are plain `mainImage`-style GLSL; the crate wraps them
//! with an injected uniform prelude before handing them to naga.

mod compile;
mod gpu;
mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use runtime::{FrameScheduler, SystemTimeSource, TimeSample, TimeSource};
pub use types::{
    scaled_size, RendererConfig, ShaderSet, ShaderSources, BUFFER_A_FILE, BUFFER_B_FILE,
    CHANNEL_COUNT, IMAGE_FILE,
};

/// Owns a renderer configuration and drives the windowed event loop.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Runs until the window closes or the surface is lost beyond recovery.
    pub fn run(&mut self) -> Result<()> {
        window::run(&self.config)
    }
}

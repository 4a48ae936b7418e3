//! GPU orchestration for the feedback pipeline.
//!
//! - `context` owns wgpu instance/device/surface wiring and knows how to
//!   rebuild swapchain state when the window resizes.
//! - `graph` describes the fixed pass order and channel wiring as plain
//!   data, keeping same-frame vs. prior-frame reads explicit and testable.
//! - `target` holds the offscreen float targets and the read/write pairs
//!   behind each feedback channel.
//! - `pipeline` compiles wrapped GLSL into render pipelines sharing one
//!   uniform layout and one channel layout.
//! - `uniforms` mirrors the injected `FrameParams` block and is uploaded
//!   once per frame.
//! - `state` glues everything together and exposes the `GpuState` API used
//!   by `window`.

mod context;
mod graph;
mod pipeline;
mod state;
mod target;
mod uniforms;

pub(crate) use state::GpuState;

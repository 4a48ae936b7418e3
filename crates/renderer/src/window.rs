use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::runtime::{FrameScheduler, SystemTimeSource, TimeSample, TimeSource};
use crate::types::{RendererConfig, ShaderSources};

/// Aggregates the window handle, GPU state, and pointer state for the
/// interactive surface.
pub(crate) struct WindowState {
    // Field order matters: the surface inside `gpu` must drop before the
    // window it was created from.
    gpu: GpuState,
    window: Arc<Window>,
    mouse: MouseState,
}

impl WindowState {
    pub(crate) fn new(
        window: Arc<Window>,
        sources: &ShaderSources,
        config: &RendererConfig,
    ) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, sources, config.render_scale)?;
        Ok(Self {
            gpu,
            window,
            mouse: MouseState::default(),
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    pub(crate) fn render_frame(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        let mouse = self
            .mouse
            .as_uniform(self.gpu.size(), self.gpu.offscreen_size());
        self.gpu.render(mouse, sample)
    }

    pub(crate) fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.mouse.handle_cursor_moved(position);
    }

    pub(crate) fn handle_mouse_button(&mut self, state: ElementState) {
        self.mouse.handle_button(state);
    }
}

/// Opens the preview window and drives the `winit` event loop.
///
/// Everything runs on this one thread: input and resize events mutate state
/// strictly between `render_frame` calls, which keeps the cooperative
/// single-writer model intact without locks.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    // All three programs must be readable before any GPU work starts.
    let sources = config.shader_set.load()?;

    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(window_size)
        .build(&event_loop)
        .context("failed to create preview window")?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &sources, config)?;
    let mut time_source = SystemTimeSource::new();
    let mut scheduler = FrameScheduler::new(config.target_fps);

    info!(
        surface = ?state.size(),
        offscreen = ?state.gpu.offscreen_size(),
        render_scale = config.render_scale,
        "feedback pipeline ready"
    );

    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        state.handle_cursor_moved(position);
                    }
                    WindowEvent::MouseInput {
                        state: button_state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        state.handle_mouse_button(button_state);
                    }
                    WindowEvent::RedrawRequested => {
                        match state.render_frame(time_source.sample()) {
                            Ok(()) => {
                                // Only a presented frame consumes an iFrame.
                                time_source.advance_frame();
                                scheduler.mark_rendered(Instant::now());
                            }
                            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                                state.resize(state.size());
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                error!("surface out of memory; exiting");
                                elwt.exit();
                            }
                            Err(wgpu::SurfaceError::Timeout) => {
                                warn!("surface timeout; retrying next frame");
                            }
                            Err(other) => {
                                warn!("surface error: {other:?}; retrying next frame");
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                if scheduler.ready_for_frame(now) {
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = scheduler.next_deadline() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Pointer state in surface coordinates, converted to the offscreen pixel
/// space when building the frame uniform.
#[derive(Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
    is_pressed: bool,
}

impl MouseState {
    /// Updates position only; button state is untouched.
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
    }

    /// Updates button state only; the last position is untouched.
    fn handle_button(&mut self, state: ElementState) {
        self.is_pressed = matches!(state, ElementState::Pressed);
    }

    /// Pointer uniform: x/y scaled to the offscreen resolution with y
    /// measured from the bottom, z carrying the button as 0/1.
    ///
    /// The scale is derived per axis from the actual target dimensions, so a
    /// target clamped to adapter limits still maps the pointer inside it.
    fn as_uniform(
        &self,
        surface: PhysicalSize<u32>,
        offscreen: PhysicalSize<u32>,
    ) -> [f32; 4] {
        let scale_x = offscreen.width as f32 / surface.width.max(1) as f32;
        let scale_y = offscreen.height as f32 / surface.height.max(1) as f32;
        let mut data = [0.0; 4];
        if let Some(pos) = self.position {
            data[0] = pos.x as f32 * scale_x;
            data[1] = (surface.height as f32 - pos.y as f32) * scale_y;
        }
        data[2] = if self.is_pressed { 1.0 } else { 0.0 };
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: PhysicalSize<u32> = PhysicalSize::new(800, 600);

    #[test]
    fn pointer_maps_to_offscreen_bottom_left() {
        let mut mouse = MouseState::default();
        mouse.handle_cursor_moved(PhysicalPosition::new(400.0, 300.0));
        let uniform = mouse.as_uniform(SURFACE, PhysicalSize::new(1600, 1200));
        assert_eq!(uniform, [800.0, 600.0, 0.0, 0.0]);
    }

    #[test]
    fn pointer_stays_inside_clamped_offscreen_target() {
        // An offscreen target clamped below 2x the surface size.
        let offscreen = PhysicalSize::new(1000, 600);
        let mut mouse = MouseState::default();

        mouse.handle_cursor_moved(PhysicalPosition::new(800.0, 0.0));
        let corner = mouse.as_uniform(SURFACE, offscreen);
        assert_eq!(corner[0], 1000.0);
        assert_eq!(corner[1], 600.0);

        mouse.handle_cursor_moved(PhysicalPosition::new(400.0, 300.0));
        let center = mouse.as_uniform(SURFACE, offscreen);
        assert_eq!(center[0], 500.0);
        assert_eq!(center[1], 300.0);
    }

    #[test]
    fn click_without_motion_preserves_position() {
        let offscreen = PhysicalSize::new(800, 600);
        let mut mouse = MouseState::default();
        mouse.handle_cursor_moved(PhysicalPosition::new(100.0, 50.0));
        let before = mouse.as_uniform(SURFACE, offscreen);

        mouse.handle_button(ElementState::Pressed);
        let pressed = mouse.as_uniform(SURFACE, offscreen);
        assert_eq!(pressed[0], before[0]);
        assert_eq!(pressed[1], before[1]);
        assert_eq!(pressed[2], 1.0);

        mouse.handle_button(ElementState::Released);
        let released = mouse.as_uniform(SURFACE, offscreen);
        assert_eq!(&released[0..2], &before[0..2]);
        assert_eq!(released[2], 0.0);
    }

    #[test]
    fn pointer_defaults_to_origin_before_first_motion() {
        let mouse = MouseState::default();
        assert_eq!(
            mouse.as_uniform(SURFACE, PhysicalSize::new(1600, 1200)),
            [0.0; 4]
        );
    }
}

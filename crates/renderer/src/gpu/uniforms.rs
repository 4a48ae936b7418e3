use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

use crate::runtime::TimeSample;

/// Per-frame uniform block shared read-only by all passes.
///
/// Layout must match the `FrameParams` block injected by `compile.rs`:
/// `_iResolution` carries the offscreen target size in xy and mirrors the
/// time in w, followed by time, delta, frame index, and the pointer vector
/// (x, y in offscreen pixels with a bottom-left origin, z = button state).
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct FrameUniforms {
    pub i_resolution: [f32; 4],
    pub i_time: f32,
    pub i_time_delta: f32,
    pub i_frame: i32,
    pub i_padding0: f32,
    pub i_mouse: [f32; 4],
}

unsafe impl Zeroable for FrameUniforms {}
unsafe impl Pod for FrameUniforms {}

impl FrameUniforms {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            i_resolution: [size.width as f32, size.height as f32, 1.0, 0.0],
            i_time: 0.0,
            i_time_delta: 0.0,
            i_frame: 0,
            i_padding0: 0.0,
            i_mouse: [0.0; 4],
        }
    }

    /// Updates the resolution fields only; everything else is untouched so
    /// a resize never disturbs time or frame state.
    pub fn set_resolution(&mut self, size: PhysicalSize<u32>) {
        self.i_resolution[0] = size.width as f32;
        self.i_resolution[1] = size.height as f32;
    }

    pub fn resolution(&self) -> (f32, f32) {
        (self.i_resolution[0], self.i_resolution[1])
    }

    /// Stamps time, frame index, and pointer state for the next frame.
    pub fn update_frame(&mut self, sample: TimeSample, mouse: [f32; 4]) {
        self.i_time_delta = (sample.seconds - self.i_time).max(0.0);
        self.i_time = sample.seconds;
        self.i_frame = sample.frame_index.min(i32::MAX as u64) as i32;
        self.i_mouse = mouse;
        self.i_resolution[3] = self.i_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_matches_std140_layout() {
        // vec4 + float + float + int + float + vec4 under std140.
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 48);
        assert_eq!(std::mem::align_of::<FrameUniforms>(), 16);
    }

    #[test]
    fn update_frame_stamps_time_and_pointer() {
        let mut uniforms = FrameUniforms::new(PhysicalSize::new(1600, 1200));
        uniforms.update_frame(TimeSample::new(1.5, 3), [800.0, 600.0, 1.0, 0.0]);
        assert_eq!(uniforms.i_time, 1.5);
        assert_eq!(uniforms.i_frame, 3);
        assert_eq!(uniforms.i_mouse, [800.0, 600.0, 1.0, 0.0]);
        assert_eq!(uniforms.i_resolution[3], 1.5);

        uniforms.update_frame(TimeSample::new(1.4, 4), [800.0, 600.0, 0.0, 0.0]);
        assert_eq!(uniforms.i_time_delta, 0.0);
        assert_eq!(uniforms.i_frame, 4);
    }

    #[test]
    fn resize_leaves_frame_state_alone() {
        let mut uniforms = FrameUniforms::new(PhysicalSize::new(100, 100));
        uniforms.update_frame(TimeSample::new(2.0, 7), [0.0; 4]);
        uniforms.set_resolution(PhysicalSize::new(200, 300));
        assert_eq!(uniforms.resolution(), (200.0, 300.0));
        assert_eq!(uniforms.i_frame, 7);
        assert_eq!(uniforms.i_time, 2.0);
    }
}

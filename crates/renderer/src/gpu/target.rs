use std::sync::Arc;

use winit::dpi::PhysicalSize;

use super::pipeline::PassPipeline;

/// Color format for every offscreen target. Rgba16Float keeps feedback
/// fields in floating point while staying filterable on all backends.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// A read/write pair whose roles can be exchanged without copying.
///
/// `swap` is a logical relabeling in O(1); it is exactly this cheap exchange
/// (rather than a texture copy) that makes per-frame temporal feedback
/// affordable.
#[derive(Debug)]
pub(crate) struct PingPong<T> {
    read: T,
    write: T,
}

impl<T> PingPong<T> {
    pub fn new(read: T, write: T) -> Self {
        Self { read, write }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }

    pub fn read(&self) -> &T {
        &self.read
    }

    pub fn write(&self) -> &T {
        &self.write
    }

    pub fn each_mut(&mut self, mut apply: impl FnMut(&mut T)) {
        apply(&mut self.read);
        apply(&mut self.write);
    }
}

/// One offscreen render target bound to a compiled pass program.
pub(crate) struct PassTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    resolution: PhysicalSize<u32>,
    pipeline: Arc<PassPipeline>,
}

impl PassTarget {
    pub fn new(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        pipeline: Arc<PassPipeline>,
    ) -> Self {
        let (texture, view) = allocate_target(device, size, pipeline.label());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            _texture: texture,
            view,
            sampler,
            resolution: size,
            pipeline,
        }
    }

    /// Reallocates the target at `size`, leaving program and sampler state
    /// untouched. The new texture's contents are undefined; feedback shaders
    /// are expected to tolerate or reinitialize stale history after a
    /// resize.
    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        if size == self.resolution {
            return;
        }
        let (texture, view) = allocate_target(device, size, self.pipeline.label());
        self._texture = texture;
        self.view = view;
        self.resolution = size;
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn resolution(&self) -> PhysicalSize<u32> {
        self.resolution
    }

    pub fn pipeline(&self) -> &PassPipeline {
        &self.pipeline
    }
}

fn allocate_target(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// One feedback channel: two identically shaped [`PassTarget`]s sharing a
/// program, flipped after every frame.
pub(crate) struct FeedbackPair {
    pair: PingPong<PassTarget>,
}

impl FeedbackPair {
    pub fn new(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        pipeline: Arc<PassPipeline>,
    ) -> Self {
        let read = PassTarget::new(device, size, pipeline.clone());
        let write = PassTarget::new(device, size, pipeline);
        Self {
            pair: PingPong::new(read, write),
        }
    }

    /// The target this pass renders into during the current frame.
    pub fn current_frame_output(&self) -> &PassTarget {
        self.pair.write()
    }

    /// The completed result from the previous frame.
    pub fn prior_frame_output(&self) -> &PassTarget {
        self.pair.read()
    }

    /// Flips read/write roles; called once per channel after each frame.
    pub fn swap(&mut self) {
        self.pair.swap();
    }

    /// Resizes both halves, preserving their roles. History is not
    /// resampled.
    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.pair.each_mut(|target| target.resize(device, size));
    }
}

#[cfg(test)]
mod tests {
    use super::PingPong;

    #[test]
    fn swap_exchanges_roles_without_copying() {
        let mut pair = PingPong::new(1u32, 2u32);
        assert_eq!((*pair.read(), *pair.write()), (1, 2));
        pair.swap();
        assert_eq!((*pair.read(), *pair.write()), (2, 1));
    }

    #[test]
    fn even_swap_count_restores_identities() {
        let mut pair = PingPong::new("read", "write");
        for _ in 0..6 {
            pair.swap();
        }
        assert_eq!(*pair.read(), "read");
        assert_eq!(*pair.write(), "write");
        pair.swap();
        assert_eq!(*pair.read(), "write");
    }

    #[test]
    fn read_and_write_stay_distinct() {
        let mut pair = PingPong::new(Box::new(0u8), Box::new(1u8));
        for _ in 0..3 {
            let read_ptr: *const u8 = &**pair.read();
            let write_ptr: *const u8 = &**pair.write();
            assert_ne!(read_ptr, write_ptr);
            pair.swap();
        }
    }

    #[test]
    fn each_mut_visits_both_halves() {
        let mut pair = PingPong::new(10i32, 20i32);
        pair.each_mut(|value| *value += 1);
        assert_eq!((*pair.read(), *pair.write()), (11, 21));
    }
}

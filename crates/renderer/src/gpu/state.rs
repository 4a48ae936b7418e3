use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use wgpu::util::{DeviceExt, TextureDataOrder};
use winit::dpi::PhysicalSize;

use crate::runtime::TimeSample;
use crate::types::{scaled_size, ShaderSources, CHANNEL_COUNT};

use super::context::GpuContext;
use super::graph::{frame_graph, ChannelTap, PassId, PassSpec};
use super::pipeline::{build_channel_entries, BlitPipeline, PassPipeline, PipelineLayouts};
use super::target::{FeedbackPair, PassTarget};
use super::uniforms::FrameUniforms;

/// Owns every GPU resource of the feedback pipeline and drives one frame
/// per `render` call.
///
/// Mutated only from the event-loop thread; resize and input updates land
/// strictly between frames.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    blit: BlitPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: FrameUniforms,
    placeholder: PlaceholderChannel,
    buffer_a: FeedbackPair,
    buffer_b: FeedbackPair,
    buffer_c: FeedbackPair,
    buffer_d: FeedbackPair,
    image: PassTarget,
    render_scale: f32,
    last_fps_update: Instant,
    frames_since_last_update: u32,
}

/// 1x1 white texture bound to channel slots the wiring leaves empty.
struct PlaceholderChannel {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl PlaceholderChannel {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let data = [255u8, 255, 255, 255];
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("placeholder channel texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            _texture: texture,
            view,
            sampler,
        }
    }
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        sources: &ShaderSources,
        render_scale: f32,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let offscreen = offscreen_size(context.size, render_scale, context.max_texture_dimension);

        let layouts = PipelineLayouts::new(&context.device)?;
        let blit = BlitPipeline::new(&context.device, &layouts, context.surface_format)?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniform buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("frame uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let pipeline_a = Arc::new(PassPipeline::new(
            &context.device,
            &layouts,
            &sources.buffer_a,
            PassId::BufferA.label(),
        )?);
        // B, C, and D run the same program against their own feedback
        // history, so the compiled pipeline is shared.
        let pipeline_b = Arc::new(PassPipeline::new(
            &context.device,
            &layouts,
            &sources.buffer_b,
            PassId::BufferB.label(),
        )?);
        let pipeline_image = Arc::new(PassPipeline::new(
            &context.device,
            &layouts,
            &sources.image,
            PassId::Image.label(),
        )?);

        let buffer_a = FeedbackPair::new(&context.device, offscreen, pipeline_a);
        let buffer_b = FeedbackPair::new(&context.device, offscreen, pipeline_b.clone());
        let buffer_c = FeedbackPair::new(&context.device, offscreen, pipeline_b.clone());
        let buffer_d = FeedbackPair::new(&context.device, offscreen, pipeline_b);
        let image = PassTarget::new(&context.device, offscreen, pipeline_image);

        let placeholder = PlaceholderChannel::new(&context.device, &context.queue);
        let uniforms = FrameUniforms::new(offscreen);

        Ok(Self {
            context,
            layouts,
            blit,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            placeholder,
            buffer_a,
            buffer_b,
            buffer_c,
            buffer_d,
            image,
            render_scale,
            last_fps_update: Instant::now(),
            frames_since_last_update: 0,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn offscreen_size(&self) -> PhysicalSize<u32> {
        self.image.resolution()
    }

    /// Reconfigures the surface and reallocates every offscreen target at
    /// the new scaled size. Idempotent; never touches time or frame index.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        let offscreen = offscreen_size(
            self.context.size,
            self.render_scale,
            self.context.max_texture_dimension,
        );
        let device = &self.context.device;
        self.buffer_a.resize(device, offscreen);
        self.buffer_b.resize(device, offscreen);
        self.buffer_c.resize(device, offscreen);
        self.buffer_d.resize(device, offscreen);
        self.image.resize(device, offscreen);
        self.uniforms.set_resolution(offscreen);
    }

    /// Renders one frame: stamps the uniforms, executes the five passes in
    /// their fixed order, blits the image pass to the swapchain, presents,
    /// and swaps all feedback pairs.
    pub(crate) fn render(
        &mut self,
        mouse: [f32; 4],
        sample: TimeSample,
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;

        let now = Instant::now();
        self.frames_since_last_update += 1;
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed >= Duration::from_secs(1) {
            debug!(
                fps = (self.frames_since_last_update as f32 / elapsed.as_secs_f32()).round(),
                frame_index = sample.frame_index,
                time = sample.seconds,
                "render stats"
            );
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
        }

        self.uniforms.update_frame(sample, mouse);
        self.context.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        for spec in frame_graph() {
            self.encode_pass(&mut encoder, &spec);
        }

        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let blit_bind_group = self.blit.bind_source(
            &self.context.device,
            self.image.view(),
            self.image.sampler(),
        );
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("present pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(self.blit.pipeline());
            pass.set_bind_group(0, &blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        // This frame's writes become next frame's history.
        self.buffer_a.swap();
        self.buffer_b.swap();
        self.buffer_c.swap();
        self.buffer_d.swap();

        Ok(())
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, spec: &PassSpec) {
        let mut channels: [(&wgpu::TextureView, &wgpu::Sampler); CHANNEL_COUNT] =
            [(&self.placeholder.view, &self.placeholder.sampler); CHANNEL_COUNT];
        for (slot, tap) in spec.channels.iter().enumerate() {
            if let Some(tap) = tap {
                channels[slot] = self.resolve_tap(*tap);
            }
        }
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(spec.id.label()),
                layout: &self.layouts.channel_layout,
                entries: &build_channel_entries(&channels),
            });

        let target = match self.feedback(spec.id) {
            Some(pair) => pair.current_frame_output(),
            None => &self.image,
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(spec.id.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view(),
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(target.pipeline().pipeline());
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn resolve_tap(&self, tap: ChannelTap) -> (&wgpu::TextureView, &wgpu::Sampler) {
        let target = match tap {
            ChannelTap::CurrentFrame(id) => {
                self.feedback(id).map(FeedbackPair::current_frame_output)
            }
            ChannelTap::PriorFrame(id) => self.feedback(id).map(FeedbackPair::prior_frame_output),
        };
        match target {
            Some(target) => (target.view(), target.sampler()),
            // The graph never taps the image pass.
            None => (&self.placeholder.view, &self.placeholder.sampler),
        }
    }

    fn feedback(&self, id: PassId) -> Option<&FeedbackPair> {
        match id {
            PassId::BufferA => Some(&self.buffer_a),
            PassId::BufferB => Some(&self.buffer_b),
            PassId::BufferC => Some(&self.buffer_c),
            PassId::BufferD => Some(&self.buffer_d),
            PassId::Image => None,
        }
    }
}

/// Scaled offscreen size, clamped to what the adapter can allocate.
fn offscreen_size(
    surface: PhysicalSize<u32>,
    render_scale: f32,
    max_dimension: u32,
) -> PhysicalSize<u32> {
    let size = scaled_size(surface, render_scale);
    if size.width > max_dimension || size.height > max_dimension {
        tracing::warn!(
            requested_width = size.width,
            requested_height = size.height,
            max_dimension,
            "scaled target exceeds adapter limits; clamping"
        );
        return PhysicalSize::new(
            size.width.min(max_dimension),
            size.height.min(max_dimension),
        );
    }
    size
}

use anyhow::{bail, Result};
use winit::dpi::PhysicalSize;

use crate::error::RendererError;
use crate::handle::Owned;
use crate::program::{LinkedProgram, UniformLocation};
use crate::render::{FrameParams, FrameStatus, FrameTarget};
use crate::shaders::{ANGLE_UNIFORM, POINT_ATTRIBUTE};

use super::context::{is_drawable_size, GpuContext};
use super::geometry::{GeometryBuffer, QUAD};
use super::pipeline::ShaderPipeline;

struct MultisampleTarget {
    texture: Owned<wgpu::Texture>,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture: Owned::new(texture),
            view,
        }
    }
}

/// Draws the quad into the window surface.
pub(crate) struct GpuRenderer {
    context: GpuContext,
    pipeline: ShaderPipeline,
    geometry: GeometryBuffer,
    angle_location: Option<UniformLocation>,
    multisample_target: Option<MultisampleTarget>,
    pending_frame: Option<wgpu::SurfaceTexture>,
}

impl GpuRenderer {
    pub(crate) fn new(context: GpuContext, program: &LinkedProgram) -> Result<Self, RendererError> {
        let attribute = program.attribute_location(POINT_ATTRIBUTE).ok_or_else(|| {
            RendererError::link(format!(
                "vertex stage declares no `{POINT_ATTRIBUTE}` attribute"
            ))
        })?;

        let angle_location = program.uniform_location(ANGLE_UNIFORM);
        if angle_location.is_none() {
            tracing::warn!(
                uniform = ANGLE_UNIFORM,
                "uniform not found in program; rotation updates are skipped"
            );
        }

        let geometry = GeometryBuffer::upload(&context.device, &QUAD);
        let pipeline = ShaderPipeline::new(
            &context.device,
            program,
            &geometry.bind_as(attribute),
            context.surface_format,
            context.sample_count,
        )?;
        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        Ok(Self {
            context,
            pipeline,
            geometry,
            angle_location,
            multisample_target,
            pending_frame: None,
        })
    }

    fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.context.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout; retrying next frame");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => bail!("surface out of memory"),
            Err(other) => {
                tracing::warn!(error = ?other, "surface error; retrying next frame");
                Ok(None)
            }
        }
    }
}

impl FrameTarget for GpuRenderer {
    fn draw(&mut self, frame: &FrameParams) -> Result<FrameStatus> {
        if self.geometry.slice().is_none() {
            return Ok(FrameStatus::Skipped);
        }
        let Some(surface_texture) = self.acquire()? else {
            return Ok(FrameStatus::Skipped);
        };

        if let Some(location) = self.angle_location {
            self.pipeline.write_uniform(
                &self.context.queue,
                location,
                bytemuck::bytes_of(&frame.angle),
            );
        }

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        let [r, g, b, a] = frame.clear_color;

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let Some(vertices) = self.geometry.slice() {
                if self.pipeline.bind(&mut render_pass) {
                    render_pass.set_vertex_buffer(0, vertices);
                    render_pass.draw(0..frame.vertex_count, 0..1);
                }
            }
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));

        self.pending_frame = Some(surface_texture);
        Ok(FrameStatus::Drawn)
    }

    fn present(&mut self, vsync: bool) -> Result<()> {
        if let Some(frame) = self.pending_frame.take() {
            frame.present();
        }
        // Reconfiguring with a texture still acquired is invalid, so the
        // present mode is only touched between frames.
        self.context.set_vsync(vsync);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let size = PhysicalSize::new(width, height);
        if !is_drawable_size(size) {
            tracing::debug!(width, height, "ignoring zero-area resize");
            return;
        }
        self.context.resize(size);
        if let Some(msaa) = self.multisample_target.as_mut() {
            msaa.texture.release();
            *msaa = MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            );
        }
    }

    fn vertex_count(&self) -> u32 {
        self.geometry.vertex_count()
    }

    fn release(&mut self) {
        self.pending_frame = None;
        self.geometry.release();
        self.pipeline.release();
        if let Some(mut msaa) = self.multisample_target.take() {
            msaa.texture.release();
        }
    }
}

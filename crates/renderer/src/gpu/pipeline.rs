use std::borrow::Cow;

use crate::compile::ENTRY_POINT;
use crate::error::RendererError;
use crate::handle::Owned;
use crate::program::{LinkedProgram, UniformBlock, UniformLocation};

use super::geometry::VertexLayout;

struct UniformBuffer {
    group: u32,
    binding: u32,
    buffer: Owned<wgpu::Buffer>,
}

/// Device-side program: render pipeline plus the uniform buffers its
/// reflected blocks read from.
pub(crate) struct ShaderPipeline {
    pipeline: Owned<wgpu::RenderPipeline>,
    bind_groups: Vec<wgpu::BindGroup>,
    uniform_buffers: Vec<UniformBuffer>,
}

impl ShaderPipeline {
    /// Builds the render pipeline for `program`.
    ///
    /// Validation errors raised by the device while creating the pipeline are
    /// reported as [`RendererError::Link`].
    pub fn new(
        device: &wgpu::Device,
        program: &LinkedProgram,
        vertex_layout: &VertexLayout,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self, RendererError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad vertex"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(program.vertex_module().clone())),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad fragment"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(program.fragment_module().clone())),
        });

        let group_count = program
            .uniform_blocks()
            .iter()
            .map(|block| block.group + 1)
            .max()
            .unwrap_or(0);

        let mut group_layouts = Vec::with_capacity(group_count as usize);
        let mut bind_groups = Vec::with_capacity(group_count as usize);
        let mut uniform_buffers = Vec::new();
        for group in 0..group_count {
            let blocks: Vec<&UniformBlock> = program
                .uniform_blocks()
                .iter()
                .filter(|block| block.group == group)
                .collect();

            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("uniform layout"),
                entries: &blocks
                    .iter()
                    .map(|block| wgpu::BindGroupLayoutEntry {
                        binding: block.binding,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    })
                    .collect::<Vec<_>>(),
            });

            let buffers: Vec<wgpu::Buffer> = blocks
                .iter()
                .map(|block| {
                    device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("uniform buffer"),
                        size: block.size,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    })
                })
                .collect();

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("uniform bind group"),
                layout: &layout,
                entries: &blocks
                    .iter()
                    .zip(&buffers)
                    .map(|(block, buffer)| wgpu::BindGroupEntry {
                        binding: block.binding,
                        resource: buffer.as_entire_binding(),
                    })
                    .collect::<Vec<_>>(),
            });

            uniform_buffers.extend(blocks.iter().zip(buffers).map(|(block, buffer)| {
                UniformBuffer {
                    group: block.group,
                    binding: block.binding,
                    buffer: Owned::new(buffer),
                }
            }));
            group_layouts.push(layout);
            bind_groups.push(bind_group);
        }

        let layout_refs: Vec<&wgpu::BindGroupLayout> = group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad pipeline layout"),
            bind_group_layouts: &layout_refs,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quad pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(ENTRY_POINT),
                buffers: &[vertex_layout.as_buffer_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some(ENTRY_POINT),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RendererError::link(err.to_string()));
        }

        tracing::debug!(
            groups = group_count,
            uniform_buffers = uniform_buffers.len(),
            sample_count,
            "created render pipeline"
        );
        Ok(Self {
            pipeline: Owned::new(pipeline),
            bind_groups,
            uniform_buffers,
        })
    }

    /// Writes `bytes` at `location`; no-op when the block is gone.
    pub fn write_uniform(&self, queue: &wgpu::Queue, location: UniformLocation, bytes: &[u8]) {
        let buffer = self
            .uniform_buffers
            .iter()
            .find(|slot| slot.group == location.group && slot.binding == location.binding)
            .and_then(|slot| slot.buffer.get());
        if let Some(buffer) = buffer {
            queue.write_buffer(buffer, u64::from(location.offset), bytes);
        }
    }

    /// Activates the pipeline and its bind groups. Returns `false` once released.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) -> bool {
        let Some(pipeline) = self.pipeline.get() else {
            return false;
        };
        render_pass.set_pipeline(pipeline);
        for (index, bind_group) in self.bind_groups.iter().enumerate() {
            render_pass.set_bind_group(index as u32, bind_group, &[]);
        }
        true
    }

    pub fn release(&mut self) {
        let released = self.pipeline.release();
        self.bind_groups.clear();
        for slot in &mut self.uniform_buffers {
            slot.buffer.release();
        }
        if released {
            tracing::debug!("released render pipeline");
        }
    }
}

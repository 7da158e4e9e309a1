use wgpu::util::DeviceExt;

use crate::handle::Owned;
use crate::program::AttributeLocation;

/// Floats per vertex (`x`, `y`).
pub const COMPONENTS_PER_VERTEX: u32 = 2;

/// Full clip-space square as a four-vertex triangle strip.
pub const QUAD: VertexData = VertexData::new([[-1.0, 1.0], [-1.0, -1.0], [1.0, 1.0], [1.0, -1.0]]);

/// Four 2D positions in triangle-strip order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexData([[f32; 2]; 4]);

impl VertexData {
    pub const fn new(points: [[f32; 2]; 4]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[[f32; 2]; 4] {
        &self.0
    }

    pub fn vertex_count(&self) -> u32 {
        self.0.len() as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.0.as_slice())
    }
}

/// How the vertex buffer feeds one attribute slot.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    attributes: [wgpu::VertexAttribute; 1],
}

impl VertexLayout {
    pub fn for_attribute(location: AttributeLocation) -> Self {
        Self {
            attributes: [wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: location.slot(),
            }],
        }
    }

    pub fn stride(&self) -> u64 {
        u64::from(COMPONENTS_PER_VERTEX) * std::mem::size_of::<f32>() as u64
    }

    pub fn attribute(&self) -> &wgpu::VertexAttribute {
        &self.attributes[0]
    }

    pub(crate) fn as_buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Device copy of the quad, uploaded once and never rewritten.
pub struct GeometryBuffer {
    buffer: Owned<wgpu::Buffer>,
    vertex_count: u32,
}

impl GeometryBuffer {
    pub fn upload(device: &wgpu::Device, vertices: &VertexData) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: vertices.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        tracing::debug!(
            vertices = vertices.vertex_count(),
            bytes = vertices.as_bytes().len(),
            "uploaded quad geometry"
        );
        Self {
            buffer: Owned::new(buffer),
            vertex_count: vertices.vertex_count(),
        }
    }

    /// Layout binding this buffer to `location`.
    ///
    /// The layout is baked into the render pipeline, so it is set up once
    /// rather than re-asserted per draw.
    pub fn bind_as(&self, location: AttributeLocation) -> VertexLayout {
        VertexLayout::for_attribute(location)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// `None` once released.
    pub fn slice(&self) -> Option<wgpu::BufferSlice<'_>> {
        self.buffer.get().map(|buffer| buffer.slice(..))
    }

    pub fn release(&mut self) {
        if self.buffer.release() {
            tracing::debug!("released quad geometry");
        }
    }
}

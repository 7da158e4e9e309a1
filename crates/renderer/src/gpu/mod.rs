//! wgpu side of the renderer.
//!
//! - `context` owns instance/device/surface wiring and knows how to
//!   reconfigure the swapchain on resize or vsync changes.
//! - `geometry` uploads the static quad and describes its vertex layout.
//! - `pipeline` turns a linked program into a render pipeline with one
//!   uniform buffer per reflected block.
//! - `state` implements the frame target the render loop draws through.

mod context;
mod geometry;
mod pipeline;
mod state;

pub(crate) use context::GpuContext;
pub use geometry::{GeometryBuffer, VertexData, VertexLayout, QUAD};
pub(crate) use state::GpuRenderer;

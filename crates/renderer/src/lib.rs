//! Renderer crate for quadspin.
//!
//! Compiles a two-stage GLSL program, uploads a four-vertex quad, and spins
//! it in a window while printing the frame rate once per second. The overall
//! flow is:
//!
//! ```text
//!   CLI / quadspin
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ compile ──▶ link ──▶ GpuRenderer
//!                                              │
//!   RenderLoop ◀── SystemTimeSource            │ FrameTarget
//!       │  frame(): draw ─▶ present ─▶ AnimationClock::tick ─▶ FrameCounter
//!       └─ pump(): winit events ─▶ Stop / Resized
//! ```
//!
//! Everything above the GPU boundary (compile, link, clock, frame counter and
//! the loop state machine) runs without a device, so it is covered by plain
//! unit tests. The `gpu` and `window` modules are the only parts that touch
//! `wgpu` surfaces or `winit`.

mod clock;
mod compile;
mod error;
mod fps;
mod gpu;
mod handle;
mod program;
mod render;
mod runtime;
mod shaders;
mod types;
mod window;

use anyhow::Result;

pub use clock::{AnimationClock, RADIANS_PER_MICROSECOND};
pub use compile::{compile, CompiledShader, ENTRY_POINT};
pub use error::{RendererError, DIAGNOSTIC_LOG_LIMIT};
pub use fps::{FpsSample, FrameCounter};
pub use gpu::{GeometryBuffer, VertexData, VertexLayout, QUAD};
pub use handle::{Owned, Release};
pub use program::{link, AttributeLocation, LinkedProgram, UniformBlock, UniformLocation};
pub use render::{
    EventPump, FrameParams, FrameStatus, FrameTarget, LoopEvent, LoopState, RenderLoop,
    RenderState, CLEAR_COLOR,
};
pub use runtime::{Micros, SystemTimeSource, TimeSource, MICROS_PER_SECOND};
pub use shaders::{ANGLE_UNIFORM, FRAGMENT, POINT_ATTRIBUTE, VERTEX};
pub use types::{RendererConfig, ShaderSource, ShaderStage};

/// Entry point used by the CLI.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and renders until the user quits.
    ///
    /// Returns an error if the window or GPU context cannot be created, or if
    /// the embedded shaders fail to compile or link.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            fullscreen = self.config.fullscreen,
            vsync = self.config.vsync,
            "starting renderer"
        );
        window::run(&self.config)
    }
}

use std::fmt;

use wgpu::naga;

use crate::compile::{compile, CompiledShader};
use crate::error::RendererError;

/// Pipeline stage a shader unit is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Short tag used in diagnostics (`vert` / `frag`).
    pub fn tag(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// GLSL text for one stage, embedded in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub text: &'static str,
}

impl ShaderSource {
    pub const fn vertex(text: &'static str) -> Self {
        Self {
            stage: ShaderStage::Vertex,
            text,
        }
    }

    pub const fn fragment(text: &'static str) -> Self {
        Self {
            stage: ShaderStage::Fragment,
            text,
        }
    }

    /// Compiles this source for its stage.
    pub fn compile(&self) -> Result<CompiledShader, RendererError> {
        compile(self.stage, self.text)
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// The defaults mirror the classic demo: a 640x640 window, vsync on, and a
/// request for 4x multisampling that the GPU context may lower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Window title.
    pub title: String,
    /// Initial inner size of the window in physical pixels.
    pub window_size: (u32, u32),
    /// Cover the primary monitor instead of opening a regular window.
    pub fullscreen: bool,
    /// Pace presentation to the display refresh rate.
    pub vsync: bool,
    /// Requested MSAA sample count (clamped to what the device supports).
    pub sample_count: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "quadspin".to_string(),
            window_size: (640, 640),
            fullscreen: false,
            vsync: true,
            sample_count: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tags_match_diagnostic_prefixes() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vert");
        assert_eq!(ShaderStage::Fragment.to_string(), "frag");
    }

    #[test]
    fn default_config_matches_demo_window() {
        let config = RendererConfig::default();
        assert_eq!(config.window_size, (640, 640));
        assert!(config.vsync);
        assert!(!config.fullscreen);
        assert_eq!(config.sample_count, 4);
    }
}

use wgpu::naga;
use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::RendererError;
use crate::types::ShaderStage;

/// Name of the entry point every stage must define.
pub const ENTRY_POINT: &str = "main";

/// One successfully compiled shader stage.
///
/// Holds the validated naga module until [`crate::link`] consumes it; dropping
/// a `CompiledShader` releases it.
#[derive(Debug)]
pub struct CompiledShader {
    stage: ShaderStage,
    module: naga::Module,
}

impl CompiledShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub(crate) fn module(&self) -> &naga::Module {
        &self.module
    }

    pub(crate) fn into_module(self) -> naga::Module {
        self.module
    }

    pub(crate) fn entry_point(&self) -> Option<&naga::EntryPoint> {
        self.module
            .entry_points
            .iter()
            .find(|entry| entry.name == ENTRY_POINT && entry.stage == self.stage.to_naga())
    }
}

/// Parses and validates GLSL `source` for `stage`.
///
/// Parse and validation failures are reported as [`RendererError::Compile`]
/// carrying the frontend's rendered diagnostic.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledShader, RendererError> {
    if source.trim().is_empty() {
        return Err(RendererError::compile(stage, "shader source is empty"));
    }

    let mut frontend = Frontend::default();
    let module = frontend
        .parse(&Options::from(stage.to_naga()), source)
        .map_err(|errors| RendererError::compile(stage, errors.emit_to_string(source)))?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
    validator
        .validate(&module)
        .map_err(|err| RendererError::compile(stage, err.emit_to_string(source)))?;

    tracing::debug!(
        %stage,
        globals = module.global_variables.len(),
        entry_points = module.entry_points.len(),
        "compiled shader stage"
    );
    Ok(CompiledShader { stage, module })
}

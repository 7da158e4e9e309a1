//! Linking of compiled stages into one program and reflection of its
//! uniform and attribute bindings.

use std::collections::BTreeMap;
use std::fmt;

use wgpu::naga;

use crate::compile::CompiledShader;
use crate::error::RendererError;
use crate::types::ShaderStage;

/// Where a named uniform lives: the buffer binding plus its byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
    pub offset: u32,
    pub size: u32,
}

/// Vertex input slot of a named attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeLocation(pub u32);

impl AttributeLocation {
    pub fn slot(self) -> u32 {
        self.0
    }
}

/// A uniform buffer the program reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub group: u32,
    pub binding: u32,
    /// Buffer size in bytes, rounded up to 16 for std140.
    pub size: u64,
}

/// Vertex and fragment modules whose interfaces agree.
///
/// The compiled stages are consumed by [`link`]; the program keeps only the
/// validated modules and the reflected binding table.
pub struct LinkedProgram {
    vertex: naga::Module,
    fragment: naga::Module,
    uniforms: BTreeMap<String, UniformLocation>,
    attributes: BTreeMap<String, AttributeLocation>,
    blocks: Vec<UniformBlock>,
}

impl LinkedProgram {
    /// Looks up a uniform by variable, block, or member name.
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Looks up a vertex input by name.
    pub fn attribute_location(&self, name: &str) -> Option<AttributeLocation> {
        self.attributes.get(name).copied()
    }

    pub fn uniform_blocks(&self) -> &[UniformBlock] {
        &self.blocks
    }

    pub(crate) fn vertex_module(&self) -> &naga::Module {
        &self.vertex
    }

    pub(crate) fn fragment_module(&self) -> &naga::Module {
        &self.fragment
    }
}

impl fmt::Debug for LinkedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedProgram")
            .field("uniforms", &self.uniforms)
            .field("attributes", &self.attributes)
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}

/// Links a vertex and a fragment stage.
///
/// Fails with [`RendererError::Link`] when the stages are swapped, an entry
/// point is missing, the vertex stage never writes a position, the fragment
/// stage writes no colour, a fragment input has no matching vertex output, or
/// the two stages disagree on a uniform's binding.
pub fn link(
    vertex: CompiledShader,
    fragment: CompiledShader,
) -> Result<LinkedProgram, RendererError> {
    expect_stage(&vertex, ShaderStage::Vertex)?;
    expect_stage(&fragment, ShaderStage::Fragment)?;

    let vertex_entry = entry_point(&vertex)?;
    let fragment_entry = entry_point(&fragment)?;

    let vertex_outputs = interface_outputs(vertex.module(), &vertex_entry.function);
    if !vertex_outputs
        .iter()
        .any(|var| matches!(var.binding, naga::Binding::BuiltIn(naga::BuiltIn::Position { .. })))
    {
        return Err(RendererError::link(
            "vertex stage does not write gl_Position",
        ));
    }

    for input in interface_inputs(fragment.module(), &fragment_entry.function) {
        let naga::Binding::Location { location, .. } = input.binding else {
            continue;
        };
        let matching = vertex_outputs.iter().find(|output| {
            matches!(output.binding, naga::Binding::Location { location: out, .. } if out == location)
        });
        match matching {
            Some(output) if output.inner == input.inner => {}
            Some(output) => {
                return Err(RendererError::link(format!(
                    "fragment input `{}` at location {location} is {:?} but the vertex stage writes {:?}",
                    input.display_name(),
                    input.inner,
                    output.inner
                )));
            }
            None => {
                return Err(RendererError::link(format!(
                    "fragment input `{}` at location {location} has no matching vertex output",
                    input.display_name()
                )));
            }
        }
    }

    let fragment_outputs = interface_outputs(fragment.module(), &fragment_entry.function);
    if !fragment_outputs
        .iter()
        .any(|var| matches!(var.binding, naga::Binding::Location { .. }))
    {
        return Err(RendererError::link("fragment stage writes no colour output"));
    }

    let attributes = interface_inputs(vertex.module(), &vertex_entry.function)
        .into_iter()
        .filter_map(|input| match (input.name, input.binding) {
            (Some(name), naga::Binding::Location { location, .. }) => {
                Some((name, AttributeLocation(location)))
            }
            _ => None,
        })
        .collect::<BTreeMap<_, _>>();

    let mut uniforms = BTreeMap::new();
    let mut blocks: Vec<UniformBlock> = Vec::new();
    for module in [vertex.module(), fragment.module()] {
        reflect_uniforms(module, &mut uniforms, &mut blocks)?;
    }
    blocks.sort_by_key(|block| (block.group, block.binding));

    tracing::debug!(
        uniforms = ?uniforms.keys().collect::<Vec<_>>(),
        attributes = ?attributes,
        blocks = blocks.len(),
        "linked shader program"
    );

    Ok(LinkedProgram {
        vertex: vertex.into_module(),
        fragment: fragment.into_module(),
        uniforms,
        attributes,
        blocks,
    })
}

fn expect_stage(shader: &CompiledShader, expected: ShaderStage) -> Result<(), RendererError> {
    if shader.stage() == expected {
        Ok(())
    } else {
        Err(RendererError::link(format!(
            "expected a {expected} shader, got a {} shader",
            shader.stage()
        )))
    }
}

fn entry_point(shader: &CompiledShader) -> Result<&naga::EntryPoint, RendererError> {
    shader.entry_point().ok_or_else(|| {
        RendererError::link(format!(
            "{} stage has no `main` entry point",
            shader.stage()
        ))
    })
}

/// One variable crossing a stage boundary.
struct InterfaceVar {
    name: Option<String>,
    binding: naga::Binding,
    inner: naga::TypeInner,
}

impl InterfaceVar {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

fn interface_inputs(module: &naga::Module, function: &naga::Function) -> Vec<InterfaceVar> {
    let mut vars = Vec::new();
    for argument in &function.arguments {
        flatten_interface(
            module,
            argument.name.clone(),
            argument.ty,
            argument.binding.as_ref(),
            &mut vars,
        );
    }
    vars
}

fn interface_outputs(module: &naga::Module, function: &naga::Function) -> Vec<InterfaceVar> {
    let mut vars = Vec::new();
    if let Some(result) = &function.result {
        flatten_interface(module, None, result.ty, result.binding.as_ref(), &mut vars);
    }
    vars
}

fn flatten_interface(
    module: &naga::Module,
    name: Option<String>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<InterfaceVar>,
) {
    let inner = &module.types[ty].inner;
    match (binding, inner) {
        (Some(binding), _) => out.push(InterfaceVar {
            name,
            binding: binding.clone(),
            inner: inner.clone(),
        }),
        (None, naga::TypeInner::Struct { members, .. }) => {
            for member in members {
                flatten_interface(
                    module,
                    member.name.clone(),
                    member.ty,
                    member.binding.as_ref(),
                    out,
                );
            }
        }
        (None, _) => {}
    }
}

fn reflect_uniforms(
    module: &naga::Module,
    uniforms: &mut BTreeMap<String, UniformLocation>,
    blocks: &mut Vec<UniformBlock>,
) -> Result<(), RendererError> {
    for (_, global) in module.global_variables.iter() {
        if global.space != naga::AddressSpace::Uniform {
            continue;
        }
        let Some(resource) = global.binding.as_ref() else {
            continue;
        };
        let ty = &module.types[global.ty];
        let size = ty.inner.size(module.to_ctx());

        let mut names = Vec::new();
        if let Some(name) = global.name.as_ref() {
            names.push((name.clone(), 0, size));
        }
        if let naga::TypeInner::Struct { members, .. } = &ty.inner {
            if let Some(name) = ty.name.as_ref() {
                names.push((name.clone(), 0, size));
            }
            for member in members {
                if let Some(name) = member.name.as_ref() {
                    let member_size = module.types[member.ty].inner.size(module.to_ctx());
                    names.push((name.clone(), member.offset, member_size));
                }
            }
        }

        for (name, offset, size) in names {
            let location = UniformLocation {
                group: resource.group,
                binding: resource.binding,
                offset,
                size,
            };
            match uniforms.get(&name) {
                Some(existing) if *existing != location => {
                    return Err(RendererError::link(format!(
                        "uniform `{name}` is declared with conflicting bindings in the two stages"
                    )));
                }
                Some(_) => {}
                None => {
                    uniforms.insert(name, location);
                }
            }
        }

        let padded = u64::from(size).max(1).next_multiple_of(16);
        match blocks
            .iter_mut()
            .find(|block| block.group == resource.group && block.binding == resource.binding)
        {
            Some(block) => block.size = block.size.max(padded),
            None => blocks.push(UniformBlock {
                group: resource.group,
                binding: resource.binding,
                size: padded,
            }),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::shaders;

    fn embedded_program() -> LinkedProgram {
        let vertex = shaders::VERTEX.compile().expect("vertex");
        let fragment = shaders::FRAGMENT.compile().expect("fragment");
        link(vertex, fragment).expect("embedded program links")
    }

    #[test]
    fn embedded_program_reflects_angle_and_point() {
        let program = embedded_program();

        let angle = program
            .uniform_location(shaders::ANGLE_UNIFORM)
            .expect("angle uniform");
        assert_eq!((angle.group, angle.binding), (0, 0));
        assert_eq!(angle.offset, 0);
        assert_eq!(angle.size, 4);

        let point = program
            .attribute_location(shaders::POINT_ATTRIBUTE)
            .expect("point attribute");
        assert_eq!(point.slot(), 0);

        assert_eq!(
            program.uniform_blocks(),
            &[UniformBlock {
                group: 0,
                binding: 0,
                size: 16
            }]
        );
    }

    #[test]
    fn unknown_names_are_not_found() {
        let program = embedded_program();
        assert!(program.uniform_location("scale").is_none());
        assert!(program.attribute_location("color").is_none());
    }

    #[test]
    fn attribute_slot_follows_layout_qualifier() {
        let vertex = compile(
            ShaderStage::Vertex,
            "#version 450\nlayout(location = 3) in vec2 point;\nvoid main() {\n    gl_Position = vec4(point, 0.0, 1.0);\n}\n",
        )
        .expect("vertex");
        let fragment = shaders::FRAGMENT.compile().expect("fragment");
        let program = link(vertex, fragment).expect("links");
        assert_eq!(
            program.attribute_location("point"),
            Some(AttributeLocation(3))
        );
    }

    #[test]
    fn fragment_input_without_vertex_output_fails() {
        let fragment = compile(
            ShaderStage::Fragment,
            "#version 450\nlayout(location = 0) in vec3 tint;\nlayout(location = 0) out vec4 color;\nvoid main() {\n    color = vec4(tint, 1.0);\n}\n",
        )
        .expect("fragment compiles on its own");
        let vertex = shaders::VERTEX.compile().expect("vertex");

        let err = link(vertex, fragment).expect_err("must not link");
        match err {
            RendererError::Link { log } => assert!(log.contains("tint")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn mismatched_interface_types_fail() {
        let vertex = compile(
            ShaderStage::Vertex,
            "#version 450\nlayout(location = 0) in vec2 point;\nlayout(location = 0) out vec2 tint;\nvoid main() {\n    tint = point;\n    gl_Position = vec4(point, 0.0, 1.0);\n}\n",
        )
        .expect("vertex");
        let fragment = compile(
            ShaderStage::Fragment,
            "#version 450\nlayout(location = 0) in vec4 tint;\nlayout(location = 0) out vec4 color;\nvoid main() {\n    color = tint;\n}\n",
        )
        .expect("fragment");

        assert!(matches!(
            link(vertex, fragment),
            Err(RendererError::Link { .. })
        ));
    }

    #[test]
    fn fragment_without_colour_output_fails() {
        let fragment = compile(ShaderStage::Fragment, "#version 450\nvoid main() {\n}\n")
            .expect("fragment compiles");
        let vertex = shaders::VERTEX.compile().expect("vertex");

        let err = link(vertex, fragment).expect_err("must not link");
        assert!(err.log().is_some_and(|log| log.contains("colour")));
    }

    #[test]
    fn swapped_stages_fail() {
        let vertex = shaders::VERTEX.compile().expect("vertex");
        let fragment = shaders::FRAGMENT.compile().expect("fragment");
        assert!(matches!(
            link(fragment, vertex),
            Err(RendererError::Link { .. })
        ));
    }
}

//! Linked shader programs with name-based attribute and uniform lookup.

use std::collections::HashMap;

use crate::{
    error::GpuError,
    gpu::{Gpu, ProgramId, ShaderStage, UniformLocation, UniformValue},
};

pub struct Shader {
    name: String,
    gpu: Gpu,
    program: ProgramId,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
}

impl Shader {
    /// Compiles both stages and links them.
    ///
    /// Any compiler or linker message is fatal: no shader is returned and the
    /// intermediate stages are released.
    pub fn load(
        gpu: &Gpu,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, GpuError> {
        let compile = |stage: ShaderStage, source: &str| {
            gpu.create_shader(stage, source).map_err(|log| GpuError::Compile {
                shader: name.to_string(),
                stage,
                log,
            })
        };
        let vertex = compile(ShaderStage::Vertex, vertex_source)?;
        let fragment = match compile(ShaderStage::Fragment, fragment_source) {
            Ok(fragment) => fragment,
            Err(e) => {
                gpu.delete_shader(vertex);
                return Err(e);
            }
        };

        let linked = gpu.create_program(vertex, fragment);
        gpu.delete_shader(vertex);
        gpu.delete_shader(fragment);
        let program = linked.map_err(|log| GpuError::Link {
            shader: name.to_string(),
            log,
        })?;

        let attributes = gpu.active_attributes(program).into_iter().collect();
        let uniforms = gpu.active_uniforms(program).into_iter().collect();
        log::debug!("Linked shader {name}: {attributes:?} {uniforms:?}");

        Ok(Self {
            name: name.to_string(),
            gpu: gpu.clone(),
            program,
            attributes,
            uniforms,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn use_program(&self) {
        self.gpu.use_program(Some(self.program));
    }

    pub fn attribute_location(&self, name: &str) -> Result<u32, GpuError> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| GpuError::MissingAttribute {
                shader: self.name.clone(),
                name: name.to_string(),
            })
    }

    pub fn uniform_location(&self, name: &str) -> Result<UniformLocation, GpuError> {
        self.uniforms
            .get(name)
            .copied()
            .ok_or_else(|| GpuError::MissingUniform {
                shader: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Looks up `name` and uploads `value` to the program in use.
    pub fn set_uniform(&self, name: &str, value: UniformValue) -> Result<(), GpuError> {
        let location = self.uniform_location(name)?;
        self.gpu.uniform(location, value);
        Ok(())
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.gpu.delete_program(self.program);
    }
}

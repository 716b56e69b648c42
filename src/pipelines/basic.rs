//! The basic sprite shader.
//!
//! Vertex inputs `a_position` (vec3) and `a_tex_coord` (vec2); uniforms
//! `u_projection` and `u_model` in group 0, `u_tint`, `u_diffuse` and its
//! sampler in group 1.

use crate::{error::GpuError, gpu::Gpu, gpu::shader::Shader};

pub const BASIC_SHADER_NAME: &str = "basic";
pub const BASIC_VERTEX_SHADER: &str = include_str!("basic_vertex.wgsl");
pub const BASIC_FRAGMENT_SHADER: &str = include_str!("basic_fragment.wgsl");

pub fn mk_basic_shader(gpu: &Gpu) -> Result<Shader, GpuError> {
    Shader::load(
        gpu,
        BASIC_SHADER_NAME,
        BASIC_VERTEX_SHADER,
        BASIC_FRAGMENT_SHADER,
    )
}

//! GL-shaped GPU layer.
//!
//! The scene graph talks to the GPU through [`GraphicsDevice`], a small,
//! immediate-mode interface modelled after the WebGL calls a sprite renderer
//! needs: buffers with attribute pointers, shader programs with introspected
//! locations, 2D textures bound to units and plain array/element draws.
//!
//! # Key types
//!
//! - [`GraphicsDevice`] is the device trait, shared as [`Gpu`]
//! - [`GlBuffer`](buffer::GlBuffer) owns one vertex/index buffer and its attribute layout
//! - [`Shader`](shader::Shader) owns a linked program and its attribute/uniform maps
//! - [`HeadlessDevice`](headless::HeadlessDevice) records frames without a GPU
//! - [`WgpuDevice`](wgpu_device::WgpuDevice) replays recorded frames with `wgpu`
//!
//! Every method takes `&self`: devices are shared by many buffers, textures and
//! shaders on the single frame thread and keep their bookkeeping behind `RefCell`s.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::GpuError;

pub mod buffer;
pub mod headless;
pub mod reflect;
pub mod shader;
pub mod wgpu_device;

slotmap::new_key_type! {
    pub struct BufferId;
    pub struct ShaderId;
    pub struct ProgramId;
    pub struct TextureId;
}

/// Shared handle to the active device.
pub type Gpu = Rc<dyn GraphicsDevice>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Float,
    Int,
    UnsignedInt,
    Short,
    UnsignedShort,
    Byte,
    UnsignedByte,
}

impl DataType {
    pub fn size(self) -> u32 {
        match self {
            DataType::Float | DataType::Int | DataType::UnsignedInt => 4,
            DataType::Short | DataType::UnsignedShort => 2,
            DataType::Byte | DataType::UnsignedByte => 1,
        }
    }

    /// Packs `values` into the byte layout of this type.
    pub fn encode(self, values: &[f32]) -> Vec<u8> {
        match self {
            DataType::Float => bytemuck::cast_slice(values).to_vec(),
            DataType::Int => values.iter().flat_map(|v| (*v as i32).to_le_bytes()).collect(),
            DataType::UnsignedInt => values.iter().flat_map(|v| (*v as u32).to_le_bytes()).collect(),
            DataType::Short => values.iter().flat_map(|v| (*v as i16).to_le_bytes()).collect(),
            DataType::UnsignedShort => values.iter().flat_map(|v| (*v as u16).to_le_bytes()).collect(),
            DataType::Byte => values.iter().map(|v| (*v as i8) as u8).collect(),
            DataType::UnsignedByte => values.iter().map(|v| *v as u8).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Where a named uniform lives: a `(group, binding)` slot of the program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Vec4([f32; 4]),
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    /// Bytes as laid out in a uniform buffer, padded to 16 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = match self {
            UniformValue::Int(v) => v.to_le_bytes().to_vec(),
            UniformValue::Vec4(v) => bytemuck::cast_slice(v).to_vec(),
            UniformValue::Mat4(m) => bytemuck::cast_slice(m).to_vec(),
        };
        bytes.resize(bytes.len().next_multiple_of(16), 0);
        bytes
    }
}

impl From<cgmath::Matrix4<f32>> for UniformValue {
    fn from(m: cgmath::Matrix4<f32>) -> Self {
        UniformValue::Mat4(m.into())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    #[default]
    Repeat,
    ClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct SamplerParams {
    pub wrap: TextureWrap,
    pub min_filter: TextureFilter,
}

pub trait GraphicsDevice {
    fn create_buffer(&self) -> BufferId;
    fn delete_buffer(&self, buffer: BufferId);
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>);
    /// Replaces the contents of the buffer bound to `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8]) -> Result<(), GpuError>;
    fn vertex_attrib_pointer(
        &self,
        location: u32,
        size: u32,
        data_type: DataType,
        normalized: bool,
        stride: u32,
        offset: u32,
    );
    fn enable_vertex_attrib_array(&self, location: u32);
    fn disable_vertex_attrib_array(&self, location: u32);

    /// Compiles one stage. The error is the compiler's info log.
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String>;
    /// Links two compiled stages. The error is the linker's info log.
    fn create_program(&self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String>;
    fn delete_shader(&self, shader: ShaderId);
    fn delete_program(&self, program: ProgramId);
    fn active_attributes(&self, program: ProgramId) -> Vec<(String, u32)>;
    fn active_uniforms(&self, program: ProgramId) -> Vec<(String, UniformLocation)>;
    fn use_program(&self, program: Option<ProgramId>);
    /// Sets a uniform of the program currently in use.
    fn uniform(&self, location: UniformLocation, value: UniformValue);

    fn create_texture(&self) -> TextureId;
    fn tex_image_2d(
        &self,
        texture: TextureId,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), GpuError>;
    fn tex_parameters(&self, texture: TextureId, params: SamplerParams);
    fn bind_texture(&self, unit: u32, texture: Option<TextureId>);
    fn delete_texture(&self, texture: TextureId);

    /// Starts a new frame cleared to `color`.
    fn clear(&self, color: [f32; 4]);
    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32) -> Result<(), GpuError>;
    fn draw_elements(
        &self,
        mode: DrawMode,
        count: u32,
        index_type: DataType,
        offset: u32,
    ) -> Result<(), GpuError>;
}

//! A [`GraphicsDevice`] without a GPU.
//!
//! Keeps buffer and texture contents in memory, compiles shaders through the
//! same `naga` path as the wgpu backend and records every draw into a
//! [`Frame`]. Useful for tests and for running the engine core on machines
//! without an adapter.

use std::cell::RefCell;

use slotmap::SlotMap;

use crate::{
    error::GpuError,
    gpu::{
        BufferId, BufferTarget, DataType, DrawMode, GraphicsDevice, ProgramId, SamplerParams,
        ShaderId, ShaderStage, TextureId, UniformLocation, UniformValue,
        reflect::{self, ProgramReflection, StageReflection},
    },
    render::{DrawRange, Frame, RenderState, VertexAttribute},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessTexture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub params: SamplerParams,
}

#[derive(Default)]
pub struct HeadlessDevice {
    state: RefCell<RenderState>,
    buffers: RefCell<SlotMap<BufferId, Vec<u8>>>,
    shaders: RefCell<SlotMap<ShaderId, StageReflection>>,
    programs: RefCell<SlotMap<ProgramId, ProgramReflection>>,
    textures: RefCell<SlotMap<TextureId, HeadlessTexture>>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws issued since the last `clear`.
    pub fn frame(&self) -> Frame {
        self.state.borrow().frame().clone()
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.buffers.borrow().get(buffer).cloned()
    }

    pub fn texture(&self, texture: TextureId) -> Option<HeadlessTexture> {
        self.textures.borrow().get(texture).cloned()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.borrow().len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.borrow().len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.borrow().len()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self) -> BufferId {
        self.buffers.borrow_mut().insert(Vec::new())
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.buffers.borrow_mut().remove(buffer);
        self.state.borrow_mut().forget_buffer(buffer);
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferId>) {
        self.state.borrow_mut().bind_buffer(target, buffer);
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) -> Result<(), GpuError> {
        let bound = self
            .state
            .borrow()
            .bound(target)
            .ok_or(GpuError::UnknownHandle("buffer"))?;
        let mut buffers = self.buffers.borrow_mut();
        let contents = buffers
            .get_mut(bound)
            .ok_or(GpuError::UnknownHandle("buffer"))?;
        *contents = data.to_vec();
        Ok(())
    }

    fn vertex_attrib_pointer(
        &self,
        location: u32,
        size: u32,
        data_type: DataType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) {
        self.state.borrow_mut().attrib_pointer(VertexAttribute {
            location,
            size,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.state.borrow_mut().set_attrib_enabled(location, true);
    }

    fn disable_vertex_attrib_array(&self, location: u32) {
        self.state.borrow_mut().set_attrib_enabled(location, false);
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, String> {
        let reflection = reflect::compile(stage, source)?;
        Ok(self.shaders.borrow_mut().insert(reflection))
    }

    fn create_program(&self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, String> {
        let shaders = self.shaders.borrow();
        let (Some(vs), Some(fs)) = (shaders.get(vertex), shaders.get(fragment)) else {
            return Err("unknown shader handle".to_string());
        };
        let program = reflect::link(vs, fs)?;
        Ok(self.programs.borrow_mut().insert(program))
    }

    fn delete_shader(&self, shader: ShaderId) {
        self.shaders.borrow_mut().remove(shader);
    }

    fn delete_program(&self, program: ProgramId) {
        self.programs.borrow_mut().remove(program);
        self.state.borrow_mut().forget_program(program);
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<(String, u32)> {
        self.programs
            .borrow()
            .get(program)
            .map(|p| p.attributes().to_vec())
            .unwrap_or_default()
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<(String, UniformLocation)> {
        self.programs
            .borrow()
            .get(program)
            .map(|p| {
                p.bindings
                    .iter()
                    .map(|b| (b.name.clone(), b.location))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().use_program(program);
    }

    fn uniform(&self, location: UniformLocation, value: UniformValue) {
        self.state.borrow_mut().uniform(location, value);
    }

    fn create_texture(&self) -> TextureId {
        self.textures.borrow_mut().insert(HeadlessTexture::default())
    }

    fn tex_image_2d(
        &self,
        texture: TextureId,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), GpuError> {
        let mut textures = self.textures.borrow_mut();
        let tex = textures
            .get_mut(texture)
            .ok_or(GpuError::UnknownHandle("texture"))?;
        tex.width = width;
        tex.height = height;
        tex.data = rgba.to_vec();
        Ok(())
    }

    fn tex_parameters(&self, texture: TextureId, params: SamplerParams) {
        if let Some(tex) = self.textures.borrow_mut().get_mut(texture) {
            tex.params = params;
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<TextureId>) {
        self.state.borrow_mut().bind_texture(unit, texture);
    }

    fn delete_texture(&self, texture: TextureId) {
        self.textures.borrow_mut().remove(texture);
        self.state.borrow_mut().forget_texture(texture);
    }

    fn clear(&self, color: [f32; 4]) {
        self.state.borrow_mut().clear(color);
    }

    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32) -> Result<(), GpuError> {
        self.state
            .borrow_mut()
            .record(mode, DrawRange::Arrays { first, count })
    }

    fn draw_elements(
        &self,
        mode: DrawMode,
        count: u32,
        index_type: DataType,
        offset: u32,
    ) -> Result<(), GpuError> {
        self.state.borrow_mut().record(
            mode,
            DrawRange::Elements {
                count,
                index_type,
                offset,
            },
        )
    }
}

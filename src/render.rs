//! Frame recording shared by the GPU backends.
//!
//! The GL-shaped [`GraphicsDevice`](crate::gpu::GraphicsDevice) is stateful: a draw
//! uses whatever buffer, attribute pointers, program, uniforms and texture units are
//! bound at the time of the call. [`RenderState`] tracks that binding state and turns
//! every draw into a self-contained [`DrawCall`] appended to the current [`Frame`].
//! Backends then either inspect the frame (headless) or replay it (wgpu).
//!
//! # Key types
//!
//! - [`Frame`] holds the clear colour and the draws issued since the last clear
//! - [`DrawCall`] is a snapshot of everything a single draw needs
//! - [`VertexAttribute`] is one enabled attribute pointer

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::GpuError,
    gpu::{
        BufferId, BufferTarget, DataType, DrawMode, ProgramId, TextureId, UniformLocation,
        UniformValue,
    },
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub size: u32,
    pub data_type: DataType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawRange {
    Arrays { first: u32, count: u32 },
    Elements { count: u32, index_type: DataType, offset: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub program: ProgramId,
    pub vertex_buffer: BufferId,
    pub index_buffer: Option<BufferId>,
    /// Enabled attributes, ordered by location.
    pub attributes: Vec<VertexAttribute>,
    pub mode: DrawMode,
    pub range: DrawRange,
    pub uniforms: BTreeMap<UniformLocation, UniformValue>,
    pub textures: BTreeMap<u32, TextureId>,
}

impl DrawCall {
    pub fn uniform(&self, location: UniformLocation) -> Option<&UniformValue> {
        self.uniforms.get(&location)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub clear_color: [f32; 4],
    pub draws: Vec<DrawCall>,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            draws: Vec::new(),
        }
    }
}

#[derive(Default, Debug)]
pub struct RenderState {
    array_buffer: Option<BufferId>,
    element_buffer: Option<BufferId>,
    pointers: HashMap<u32, VertexAttribute>,
    enabled: HashMap<u32, bool>,
    program: Option<ProgramId>,
    uniforms: HashMap<ProgramId, BTreeMap<UniformLocation, UniformValue>>,
    units: BTreeMap<u32, TextureId>,
    frame: Frame,
}

impl RenderState {
    pub fn bound(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        }
    }

    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
            BufferTarget::ElementArray => self.element_buffer = buffer,
        }
    }

    pub fn attrib_pointer(&mut self, attribute: VertexAttribute) {
        self.pointers.insert(attribute.location, attribute);
    }

    pub fn set_attrib_enabled(&mut self, location: u32, enabled: bool) {
        self.enabled.insert(location, enabled);
    }

    pub fn use_program(&mut self, program: Option<ProgramId>) {
        self.program = program;
    }

    pub fn uniform(&mut self, location: UniformLocation, value: UniformValue) {
        match self.program {
            Some(program) => {
                self.uniforms
                    .entry(program)
                    .or_default()
                    .insert(location, value);
            }
            None => log::warn!("You tried to set uniform {location:?} without an active program"),
        }
    }

    pub fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        match texture {
            Some(texture) => self.units.insert(unit, texture),
            None => self.units.remove(&unit),
        };
    }

    /// Drops every reference to a deleted buffer.
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(buffer) {
            self.element_buffer = None;
        }
    }

    pub fn forget_texture(&mut self, texture: TextureId) {
        self.units.retain(|_, bound| *bound != texture);
    }

    pub fn forget_program(&mut self, program: ProgramId) {
        self.uniforms.remove(&program);
        if self.program == Some(program) {
            self.program = None;
        }
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        self.frame = Frame {
            clear_color: color,
            draws: Vec::new(),
        };
    }

    pub fn record(&mut self, mode: DrawMode, range: DrawRange) -> Result<(), GpuError> {
        let program = self.program.ok_or(GpuError::NoProgram)?;
        let vertex_buffer = self.array_buffer.ok_or(GpuError::NoVertexBuffer)?;
        let index_buffer = match range {
            DrawRange::Elements { .. } => Some(self.element_buffer.ok_or(GpuError::NoVertexBuffer)?),
            DrawRange::Arrays { .. } => None,
        };
        let mut attributes: Vec<VertexAttribute> = self
            .pointers
            .values()
            .filter(|a| self.enabled.get(&a.location).copied().unwrap_or(false))
            .copied()
            .collect();
        attributes.sort_by_key(|a| a.location);

        self.frame.draws.push(DrawCall {
            program,
            vertex_buffer,
            index_buffer,
            attributes,
            mode,
            range,
            uniforms: self.uniforms.get(&program).cloned().unwrap_or_default(),
            textures: self.units.clone(),
        });
        Ok(())
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

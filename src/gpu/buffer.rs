//! Vertex and index buffers with an attribute layout.

use crate::{
    error::GpuError,
    gpu::{BufferId, BufferTarget, DataType, DrawMode, Gpu},
};

/// One vertex attribute: `size` components read from shader input `location`.
///
/// `offset` counts components, not bytes, from the start of the vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    pub location: u32,
    pub size: u32,
    pub offset: u32,
}

/// A GPU buffer plus the CPU-side data waiting to be uploaded.
///
/// Attributes must be registered before [`upload`](Self::upload). Their sizes,
/// in registration order, make up the vertex stride and each attribute's offset.
pub struct GlBuffer {
    gpu: Gpu,
    handle: BufferId,
    element_size: u32,
    data_type: DataType,
    target: BufferTarget,
    mode: DrawMode,
    has_attribute_location: bool,
    attributes: Vec<AttributeInfo>,
    data: Vec<f32>,
    uploaded: bool,
}

impl GlBuffer {
    pub fn new(
        gpu: &Gpu,
        element_size: u32,
        data_type: DataType,
        target: BufferTarget,
        mode: DrawMode,
    ) -> Self {
        Self {
            gpu: gpu.clone(),
            handle: gpu.create_buffer(),
            element_size,
            data_type,
            target,
            mode,
            has_attribute_location: false,
            attributes: Vec::new(),
            data: Vec::new(),
            uploaded: false,
        }
    }

    /// A float vertex buffer drawn as a triangle list.
    pub fn vertices(gpu: &Gpu, element_size: u32) -> Self {
        Self::new(
            gpu,
            element_size,
            DataType::Float,
            BufferTarget::Array,
            DrawMode::Triangles,
        )
    }

    pub fn handle(&self) -> BufferId {
        self.handle
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn has_attribute_location(&self) -> bool {
        self.has_attribute_location
    }

    /// Stride in bytes.
    pub fn stride(&self) -> u32 {
        let components = if self.has_attribute_location {
            self.attributes.iter().map(|a| a.size).sum()
        } else {
            self.element_size
        };
        components * self.data_type.size()
    }

    pub fn add_attribute_location(&mut self, location: u32, size: u32) -> Result<(), GpuError> {
        if self.uploaded {
            return Err(GpuError::LayoutLocked);
        }
        let offset = self.attributes.iter().map(|a| a.size).sum();
        self.attributes.push(AttributeInfo {
            location,
            size,
            offset,
        });
        self.has_attribute_location = true;
        if offset + size > self.element_size {
            log::warn!(
                "Attribute at location {location} ends past the element size of {}",
                self.element_size
            );
        }
        Ok(())
    }

    pub fn push_back_data(&mut self, data: &[f32]) {
        self.data.extend_from_slice(data);
    }

    pub fn clear_data(&mut self) {
        self.data.clear();
    }

    pub fn upload(&mut self) -> Result<(), GpuError> {
        self.gpu.bind_buffer(self.target, Some(self.handle));
        self.gpu
            .buffer_data(self.target, &self.data_type.encode(&self.data))?;
        self.uploaded = true;
        Ok(())
    }

    pub fn bind(&self, normalized: bool) {
        self.gpu.bind_buffer(self.target, Some(self.handle));
        if !self.has_attribute_location {
            return;
        }
        let stride = self.stride();
        for a in self.attributes.iter() {
            self.gpu.vertex_attrib_pointer(
                a.location,
                a.size,
                self.data_type,
                normalized,
                stride,
                a.offset * self.data_type.size(),
            );
            self.gpu.enable_vertex_attrib_array(a.location);
        }
    }

    pub fn unbind(&self) {
        for a in self.attributes.iter() {
            self.gpu.disable_vertex_attrib_array(a.location);
        }
        self.gpu.bind_buffer(self.target, None);
    }

    pub fn draw(&self) -> Result<(), GpuError> {
        let len = self.data.len() as u32;
        match self.target {
            BufferTarget::Array => {
                let per_vertex = self.stride() / self.data_type.size();
                self.gpu.draw_arrays(self.mode, 0, len / per_vertex.max(1))
            }
            BufferTarget::ElementArray => {
                self.gpu.draw_elements(self.mode, len, self.data_type, 0)
            }
        }
    }

    /// Frees the GPU buffer.
    pub fn destroy(self) {
        self.gpu.delete_buffer(self.handle);
    }
}

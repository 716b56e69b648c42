use std::rc::Rc;

use cgmath::Matrix4;

use crate::{
    gpu::{Gpu, UniformValue, buffer::GlBuffer, shader::Shader},
    graphics::{
        Color,
        material::{Material, MaterialManager},
    },
};

pub const DEFAULT_SPRITE_SIZE: f32 = 100.0;

/// Components per vertex: x, y, z, u, v.
const VERTEX_SIZE: u32 = 5;

/// A textured quad with its top-left corner at the origin.
pub struct Sprite {
    name: String,
    width: f32,
    height: f32,
    material_name: String,
    material: Option<Rc<Material>>,
    materials: MaterialManager,
    buffer: Option<GlBuffer>,
    gpu: Gpu,
    position_location: u32,
    tex_coord_location: u32,
}

impl Sprite {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gpu: &Gpu,
        materials: &MaterialManager,
        name: &str,
        material_name: &str,
        width: f32,
        height: f32,
        position_location: u32,
        tex_coord_location: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            material_name: material_name.to_string(),
            material: None,
            materials: materials.clone(),
            buffer: None,
            gpu: gpu.clone(),
            position_location,
            tex_coord_location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn material_name(&self) -> &str {
        &self.material_name
    }

    pub fn material(&self) -> Option<&Rc<Material>> {
        self.material.as_ref()
    }

    pub fn buffer(&self) -> Option<&GlBuffer> {
        self.buffer.as_ref()
    }

    /// Acquires the material and uploads the quad as two triangles.
    pub fn load(&mut self) -> anyhow::Result<()> {
        if self.buffer.is_some() {
            return Ok(());
        }
        let mut buffer = GlBuffer::vertices(&self.gpu, VERTEX_SIZE);
        if let Err(e) = self.upload_quad(&mut buffer) {
            buffer.destroy();
            return Err(e);
        }

        self.buffer = Some(buffer);
        self.material = self.materials.get_material(&self.material_name);
        Ok(())
    }

    fn upload_quad(&self, buffer: &mut GlBuffer) -> anyhow::Result<()> {
        buffer.add_attribute_location(self.position_location, 3)?;
        buffer.add_attribute_location(self.tex_coord_location, 2)?;

        let (w, h) = (self.width, self.height);
        #[rustfmt::skip]
        let vertices = [
            0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, h,   0.0, 0.0, 1.0,
            w,   h,   0.0, 1.0, 1.0,

            w,   h,   0.0, 1.0, 1.0,
            w,   0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0,
        ];
        buffer.push_back_data(&vertices);
        buffer.upload()?;
        buffer.unbind();
        Ok(())
    }

    pub fn draw(&self, shader: &Shader, model: &Matrix4<f32>) -> anyhow::Result<()> {
        let Some(buffer) = &self.buffer else {
            return Ok(());
        };
        shader.set_uniform("u_model", (*model).into())?;

        let tint = self.material.as_ref().map_or(Color::WHITE, |m| m.tint());
        shader.set_uniform("u_tint", UniformValue::Vec4(tint.to_float_array()))?;
        if let Some(texture) = self.material.as_ref().and_then(|m| m.diffuse_texture()) {
            texture.activate_and_bind(0);
            shader.set_uniform("u_diffuse", UniformValue::Int(0))?;
        }

        buffer.bind(false);
        buffer.draw()?;
        Ok(())
    }

    /// Frees the vertex buffer and hands the material back.
    pub fn destroy(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        if self.material.take().is_some() {
            self.materials.release_material(&self.material_name);
        }
    }
}

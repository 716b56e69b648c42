use cgmath::Matrix4;
use serde_json::Value;

use crate::{
    components::{Builder, Component, optional_f32, optional_str},
    data_structures::scene_graph::NodeId,
    error::ConfigError,
    gpu::{Gpu, shader::Shader},
    graphics::{
        material::MaterialManager,
        sprite::{DEFAULT_SPRITE_SIZE, Sprite},
    },
};

pub const SPRITE_COMPONENT_TYPE: &str = "sprite";

/// Draws a [`Sprite`] at its node's world transform.
pub struct SpriteComponent {
    name: Option<String>,
    owner: Option<NodeId>,
    sprite: Sprite,
}

impl SpriteComponent {
    pub fn new(name: Option<String>, sprite: Sprite) -> Self {
        Self {
            name,
            owner: None,
            sprite,
        }
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }
}

impl Component for SpriteComponent {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }

    fn load(&mut self) -> anyhow::Result<()> {
        self.sprite.load()
    }

    fn draw(&self, shader: &Shader, world: &Matrix4<f32>) -> anyhow::Result<()> {
        self.sprite.draw(shader, world)
    }

    fn unload(&mut self) {
        self.sprite.destroy();
    }
}

pub struct SpriteComponentBuilder {
    gpu: Gpu,
    materials: MaterialManager,
    position_location: u32,
    tex_coord_location: u32,
}

impl SpriteComponentBuilder {
    pub fn new(
        gpu: Gpu,
        materials: MaterialManager,
        position_location: u32,
        tex_coord_location: u32,
    ) -> Self {
        Self {
            gpu,
            materials,
            position_location,
            tex_coord_location,
        }
    }
}

impl Builder<dyn Component> for SpriteComponentBuilder {
    fn type_tag(&self) -> &str {
        SPRITE_COMPONENT_TYPE
    }

    fn build_from_json(&self, json: &Value) -> anyhow::Result<Box<dyn Component>> {
        let name = optional_str(json, "Sprite", "name")?;
        let material_name =
            optional_str(json, "Sprite", "materialName")?.ok_or(ConfigError::MissingField {
                context: "Sprite",
                field: "materialName",
            })?;
        let width = optional_f32(json, "Sprite", "width")?.unwrap_or(DEFAULT_SPRITE_SIZE);
        let height = optional_f32(json, "Sprite", "height")?.unwrap_or(DEFAULT_SPRITE_SIZE);

        let sprite = Sprite::new(
            &self.gpu,
            &self.materials,
            name.as_deref().unwrap_or(SPRITE_COMPONENT_TYPE),
            &material_name,
            width,
            height,
            self.position_location,
            self.tex_coord_location,
        );
        Ok(Box::new(SpriteComponent::new(name, sprite)))
    }
}

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::graphics::{
    color::Color,
    texture::{Texture, TextureManager},
};

/// A tint plus an optional diffuse texture.
pub struct Material {
    name: String,
    diffuse_texture_name: Option<String>,
    tint: Color,
    diffuse_texture: Option<Rc<Texture>>,
    textures: TextureManager,
}

impl Material {
    pub fn new(
        name: &str,
        diffuse_texture_name: Option<&str>,
        tint: Color,
        textures: &TextureManager,
    ) -> Self {
        Self {
            name: name.to_string(),
            diffuse_texture_name: diffuse_texture_name.map(str::to_string),
            tint,
            diffuse_texture: diffuse_texture_name.map(|n| textures.get_texture(n)),
            textures: textures.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tint(&self) -> Color {
        self.tint
    }

    pub fn diffuse_texture_name(&self) -> Option<&str> {
        self.diffuse_texture_name.as_deref()
    }

    pub fn diffuse_texture(&self) -> Option<&Rc<Texture>> {
        self.diffuse_texture.as_ref()
    }

    /// Gives the diffuse texture back to the texture manager.
    pub fn destroy(&self) {
        if let Some(name) = &self.diffuse_texture_name {
            self.textures.release_texture(name);
        }
    }
}

/// Material settings as they appear in the engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub name: String,
    #[serde(default)]
    pub diffuse: Option<String>,
    #[serde(default)]
    pub tint: Option<Color>,
}

struct MaterialReference {
    material: Rc<Material>,
    count: usize,
}

/// Named, reference-counted materials.
///
/// Registering holds one reference, so a registered material survives until it
/// has been released once more than it was fetched.
#[derive(Clone)]
pub struct MaterialManager {
    textures: TextureManager,
    materials: Rc<RefCell<HashMap<String, MaterialReference>>>,
}

impl MaterialManager {
    pub fn new(textures: TextureManager) -> Self {
        Self {
            textures,
            materials: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// Registers `material` unless one with the same name already exists.
    pub fn register_material(&self, material: Material) {
        let mut materials = self.materials.borrow_mut();
        if materials.contains_key(material.name()) {
            log::warn!("Material {} is already registered", material.name());
            material.destroy();
            return;
        }
        materials.insert(
            material.name().to_string(),
            MaterialReference {
                material: Rc::new(material),
                count: 1,
            },
        );
    }

    pub fn register_config(&self, config: &MaterialConfig) {
        self.register_material(Material::new(
            &config.name,
            config.diffuse.as_deref(),
            config.tint.unwrap_or_default(),
            &self.textures,
        ));
    }

    pub fn get_material(&self, name: &str) -> Option<Rc<Material>> {
        let mut materials = self.materials.borrow_mut();
        match materials.get_mut(name) {
            Some(reference) => {
                reference.count += 1;
                Some(reference.material.clone())
            }
            None => {
                log::warn!("Cannot get unregistered material {name}");
                None
            }
        }
    }

    pub fn release_material(&self, name: &str) {
        let removed = {
            let mut materials = self.materials.borrow_mut();
            let Some(reference) = materials.get_mut(name) else {
                log::warn!("Cannot release unregistered material {name}");
                return;
            };
            reference.count -= 1;
            if reference.count == 0 {
                materials.remove(name)
            } else {
                None
            }
        };
        if let Some(reference) = removed {
            reference.material.destroy();
        }
    }

    pub fn reference_count(&self, name: &str) -> usize {
        self.materials.borrow().get(name).map_or(0, |r| r.count)
    }
}

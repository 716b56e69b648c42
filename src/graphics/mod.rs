//! Colours, textures, materials and sprites drawn through the basic shader.

pub mod color;
pub mod material;
pub mod sprite;
pub mod texture;

pub use color::Color;
pub use material::{Material, MaterialConfig, MaterialManager};
pub use sprite::Sprite;
pub use texture::{Texture, TextureManager};

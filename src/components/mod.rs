//! Pluggable per-node logic built from zone data.
//!
//! Zone JSON describes components and behaviors as objects with a `type` tag.
//! A [`Registry`] maps each tag to a [`Builder`] that validates the object and
//! produces the boxed trait object the scene graph stores on the node.
//!
//! # Key types
//!
//! - [`Component`] takes part in load, update and draw
//! - [`Behavior`] takes part in update and `apply` only, and may move its node
//! - [`ComponentRegistry`] / [`BehaviorRegistry`] hold the builders by tag

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use cgmath::Matrix4;
use serde_json::Value;

use crate::{
    data_structures::{scene_graph::NodeId, transform::Transform},
    error::ConfigError,
    gpu::shader::Shader,
};

pub mod rotation;
pub mod sprite;

pub use rotation::{RotationBehavior, RotationBehaviorBuilder};
pub use sprite::{SpriteComponent, SpriteComponentBuilder};

pub trait Component {
    fn name(&self) -> Option<&str>;
    /// The node this component is attached to. Lookup only, the node owns the component.
    fn owner(&self) -> Option<NodeId>;
    fn set_owner(&mut self, owner: Option<NodeId>);

    /// Creates GPU resources. Called once before the first update.
    fn load(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn update(&mut self, _time: f32) {}

    /// Draws with the node's world matrix.
    fn draw(&self, _shader: &Shader, _world: &Matrix4<f32>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Releases everything `load` acquired.
    fn unload(&mut self) {}
}

pub trait Behavior {
    fn name(&self) -> &str;
    fn owner(&self) -> Option<NodeId>;
    fn set_owner(&mut self, owner: Option<NodeId>);

    /// Runs after the node's components, with the node's transform.
    fn update(&mut self, time: f32, transform: &mut Transform);

    /// Feeds user data into the behavior on demand.
    fn apply(&mut self, user_data: &Value) -> anyhow::Result<()>;
}

/// Builds one kind of `P` from its JSON description.
pub trait Builder<P: ?Sized> {
    fn type_tag(&self) -> &str;
    fn build_from_json(&self, json: &Value) -> anyhow::Result<Box<P>>;
}

/// Tag-to-builder table.
pub struct Registry<P: ?Sized> {
    kind: &'static str,
    builders: RefCell<HashMap<String, Rc<dyn Builder<P>>>>,
}

pub type ComponentRegistry = Registry<dyn Component>;
pub type BehaviorRegistry = Registry<dyn Behavior>;

impl<P: ?Sized> Registry<P> {
    /// `kind` names what the registry builds in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            builders: RefCell::new(HashMap::new()),
        }
    }

    pub fn register_builder(&self, builder: Rc<dyn Builder<P>>) {
        let tag = builder.type_tag().to_string();
        if self.builders.borrow_mut().insert(tag.clone(), builder).is_some() {
            log::warn!("{} builder for type {tag} was replaced", self.kind);
        }
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.builders.borrow().contains_key(tag)
    }

    /// Builds the object described by `json`, dispatching on `json.type`.
    pub fn extract(&self, json: &Value) -> anyhow::Result<Box<P>> {
        let tag = json
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ConfigError::MissingType { kind: self.kind })?;
        let builder = self
            .builders
            .borrow()
            .get(tag)
            .cloned()
            .ok_or_else(|| ConfigError::UnregisteredType {
                kind: self.kind,
                tag: tag.to_string(),
            })?;
        builder.build_from_json(json)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new("Component")
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::new("Behavior")
    }
}

/// Reads an optional string field.
pub(crate) fn optional_str(
    json: &Value,
    context: &'static str,
    field: &'static str,
) -> Result<Option<String>, ConfigError> {
    match json.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(ConfigError::InvalidField {
            context,
            field,
            expected: "a string",
        }),
    }
}

/// Reads an optional numeric field.
pub(crate) fn optional_f32(
    json: &Value,
    context: &'static str,
    field: &'static str,
) -> Result<Option<f32>, ConfigError> {
    match json.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(|v| Some(v as f32))
            .ok_or(ConfigError::InvalidField {
                context,
                field,
                expected: "a number",
            }),
    }
}

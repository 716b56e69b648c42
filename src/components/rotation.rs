use cgmath::Vector3;
use serde_json::Value;

use crate::{
    components::{Behavior, Builder, optional_str},
    data_structures::{
        scene_graph::NodeId,
        transform::{Transform, vec3_from_json},
    },
    error::ConfigError,
};

pub const ROTATION_BEHAVIOR_TYPE: &str = "rotation";

/// Adds a fixed rotation to its node every update.
pub struct RotationBehavior {
    name: String,
    owner: Option<NodeId>,
    rotation: Vector3<f32>,
}

impl RotationBehavior {
    pub fn new(name: &str, rotation: Vector3<f32>) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            rotation,
        }
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }
}

impl Behavior for RotationBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    fn set_owner(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }

    fn update(&mut self, _time: f32, transform: &mut Transform) {
        transform.rotation += self.rotation;
    }

    /// Overrides the rate from the `x`, `y` and `z` fields of `user_data`, or of
    /// its `rotation` object when it carries one.
    fn apply(&mut self, user_data: &Value) -> anyhow::Result<()> {
        let rate = user_data.get("rotation").unwrap_or(user_data);
        vec3_from_json(rate, "rotation")?.apply(&mut self.rotation);
        Ok(())
    }
}

pub struct RotationBehaviorBuilder;

impl Builder<dyn Behavior> for RotationBehaviorBuilder {
    fn type_tag(&self) -> &str {
        ROTATION_BEHAVIOR_TYPE
    }

    fn build_from_json(&self, json: &Value) -> anyhow::Result<Box<dyn Behavior>> {
        let name = optional_str(json, "Behavior data", "name")?.ok_or(ConfigError::MissingField {
            context: "Behavior data",
            field: "name",
        })?;
        let mut rotation = Vector3::new(0.0, 0.0, 0.0);
        if let Some(json) = json.get("rotation") {
            vec3_from_json(json, "rotation")?.apply(&mut rotation);
        }
        Ok(Box::new(RotationBehavior::new(&name, rotation)))
    }
}

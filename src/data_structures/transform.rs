//! Position, rotation and scale of a scene node.

use cgmath::{Matrix4, Rad, Vector3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied z, then y, then x.
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// JSON shape of a vector where every component is optional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3Data {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl Vec3Data {
    /// Overwrites only the components that are present.
    pub fn apply(&self, target: &mut Vector3<f32>) {
        if let Some(x) = self.x {
            target.x = x;
        }
        if let Some(y) = self.y {
            target.y = y;
        }
        if let Some(z) = self.z {
            target.z = z;
        }
    }
}

impl From<Vector3<f32>> for Vec3Data {
    fn from(v: Vector3<f32>) -> Self {
        Self {
            x: Some(v.x),
            y: Some(v.y),
            z: Some(v.z),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3Data>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vec3Data>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec3Data>,
}

/// Parses `{x?, y?, z?}`, failing with a [`ConfigError`] naming `field`.
pub fn vec3_from_json(json: &Value, field: &'static str) -> Result<Vec3Data, ConfigError> {
    Vec3Data::deserialize(json).map_err(|_| ConfigError::InvalidField {
        context: "Vector",
        field,
        expected: "an object of numeric x, y and z",
    })
}

impl Transform {
    pub fn matrix(&self) -> Matrix4<f32> {
        let translation = Matrix4::from_translation(self.position);
        let rotation = Matrix4::from_angle_z(Rad(self.rotation.z))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_x(Rad(self.rotation.x));
        let scale = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
        translation * rotation * scale
    }

    pub fn copy_from(&mut self, other: &Transform) {
        *self = *other;
    }

    pub fn apply(&mut self, data: &TransformData) {
        if let Some(position) = data.position {
            position.apply(&mut self.position);
        }
        if let Some(rotation) = data.rotation {
            rotation.apply(&mut self.rotation);
        }
        if let Some(scale) = data.scale {
            scale.apply(&mut self.scale);
        }
    }

    /// Overrides whatever `{position?, rotation?, scale?}` components `json` carries.
    pub fn set_from_json(&mut self, json: &Value) -> Result<(), ConfigError> {
        let data = TransformData::deserialize(json).map_err(|_| ConfigError::InvalidField {
            context: "Node",
            field: "transform",
            expected: "an object of position, rotation and scale vectors",
        })?;
        self.apply(&data);
        Ok(())
    }

    pub fn to_data(&self) -> TransformData {
        TransformData {
            position: Some(self.position.into()),
            rotation: Some(self.rotation.into()),
            scale: Some(self.scale.into()),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.to_data()).unwrap_or(Value::Null)
    }
}

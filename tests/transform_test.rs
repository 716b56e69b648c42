use std::f32::consts::FRAC_PI_2;

use cgmath::{Vector3, Vector4};
use serde_json::json;
use zone_ngin::{data_structures::transform::Transform, error::ConfigError};

mod common;
use common::test_utils::assert_matrix_eq;

#[test]
fn should_round_trip_through_json() {
    let original = Transform {
        position: Vector3::new(1.5, -2.0, 3.25),
        rotation: Vector3::new(0.1, 0.2, 0.3),
        scale: Vector3::new(2.0, 0.5, 1.0),
    };

    let mut restored = Transform::default();
    restored.set_from_json(&original.to_json()).unwrap();

    assert_matrix_eq(restored.matrix(), original.matrix());
    assert_eq!(restored, original);
}

#[test]
fn should_scale_then_rotate_then_translate() {
    let transform = Transform {
        position: Vector3::new(1.0, 2.0, 3.0),
        rotation: Vector3::new(0.0, 0.0, FRAC_PI_2),
        scale: Vector3::new(2.0, 1.0, 1.0),
    };

    let moved = transform.matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);

    assert!((moved.x - 1.0).abs() < 1e-5);
    assert!((moved.y - 4.0).abs() < 1e-5);
    assert!((moved.z - 3.0).abs() < 1e-5);
}

#[test]
fn should_only_override_present_components() {
    let mut transform = Transform {
        position: Vector3::new(1.0, 2.0, 3.0),
        ..Transform::default()
    };

    transform
        .set_from_json(&json!({"position": {"x": 5}, "scale": {"y": 4}}))
        .unwrap();

    assert_eq!(transform.position, Vector3::new(5.0, 2.0, 3.0));
    assert_eq!(transform.rotation, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(transform.scale, Vector3::new(1.0, 4.0, 1.0));
}

#[test]
fn should_reject_malformed_transforms() {
    let mut transform = Transform::default();
    let err = transform
        .set_from_json(&json!({"position": 3}))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { field: "transform", .. }));
    assert_eq!(transform, Transform::default());
}

#[test]
fn should_copy_from_another_transform() {
    let source = Transform {
        rotation: Vector3::new(0.0, 1.0, 0.0),
        ..Transform::default()
    };
    let mut target = Transform::default();
    target.copy_from(&source);
    assert_eq!(target, source);
}

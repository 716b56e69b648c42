use std::rc::Rc;

use cgmath::{Matrix4, Vector3};
use serde_json::json;
use zone_ngin::{
    components::{
        BehaviorRegistry, ComponentRegistry, RotationBehaviorBuilder, SpriteComponentBuilder,
    },
    data_structures::transform::Transform,
    error::ConfigError,
    gpu::UniformValue,
    pipelines::basic::mk_basic_shader,
};

mod common;
use common::test_utils::Harness;

fn sprite_registry(harness: &Harness) -> ComponentRegistry {
    let registry = ComponentRegistry::default();
    registry.register_builder(Rc::new(SpriteComponentBuilder::new(
        harness.gpu(),
        harness.ctx.materials.clone(),
        0,
        1,
    )));
    registry
}

#[test]
fn should_build_a_sprite_that_uploads_its_model_matrix() {
    let harness = Harness::new();
    let registry = sprite_registry(&harness);
    let shader = mk_basic_shader(&harness.gpu()).unwrap();

    let mut sprite = registry
        .extract(&json!({"type": "sprite", "materialName": "x"}))
        .unwrap();
    sprite.load().unwrap();

    let model = Matrix4::from_translation(Vector3::new(10.0, 20.0, 0.0));
    harness.ctx.gpu.clear([0.0, 0.0, 0.0, 1.0]);
    shader.use_program();
    sprite.draw(&shader, &model).unwrap();

    let frame = harness.device.frame();
    assert_eq!(frame.draws.len(), 1);
    let location = shader.uniform_location("u_model").unwrap();
    assert_eq!(frame.draws[0].uniform(location), Some(&UniformValue::from(model)));
    assert_eq!(frame.draws[0].attributes.len(), 2);
}

#[test]
fn should_reject_unregistered_types() {
    let harness = Harness::new();
    let registry = sprite_registry(&harness);

    let err = registry.extract(&json!({"type": "unknown"})).err().unwrap();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::UnregisteredType {
            kind: "Component",
            tag: "unknown".to_string()
        })
    );
}

#[test]
fn should_reject_data_without_a_type() {
    let harness = Harness::new();
    let registry = sprite_registry(&harness);

    let err = registry.extract(&json!({"materialName": "x"})).err().unwrap();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::MissingType { kind: "Component" })
    );
    assert_eq!(err.to_string(), "Component type is undefined");
}

#[test]
fn should_require_a_material_name_for_sprites() {
    let harness = Harness::new();
    let registry = sprite_registry(&harness);

    let err = registry.extract(&json!({"type": "sprite"})).err().unwrap();
    assert_eq!(err.to_string(), "Sprite is missing materialName property");
}

#[test]
fn should_replace_builders_registered_twice() {
    let registry = BehaviorRegistry::default();
    assert!(!registry.is_registered("rotation"));
    registry.register_builder(Rc::new(RotationBehaviorBuilder));
    registry.register_builder(Rc::new(RotationBehaviorBuilder));
    assert!(registry.is_registered("rotation"));
}

#[test]
fn should_build_rotation_behaviors_that_turn_their_node() {
    let registry = BehaviorRegistry::default();
    registry.register_builder(Rc::new(RotationBehaviorBuilder));

    let mut behavior = registry
        .extract(&json!({"type": "rotation", "name": "spin", "rotation": {"z": 0.5}}))
        .unwrap();
    assert_eq!(behavior.name(), "spin");

    let mut transform = Transform::default();
    behavior.update(0.016, &mut transform);
    behavior.update(0.016, &mut transform);
    assert!((transform.rotation.z - 1.0).abs() < 1e-6);

    behavior.apply(&json!({"rotation": {"x": 0.25}})).unwrap();
    behavior.update(0.016, &mut transform);
    assert!((transform.rotation.x - 0.25).abs() < 1e-6);
    assert!((transform.rotation.z - 1.5).abs() < 1e-6);
}

#[test]
fn should_apply_bare_rotation_rates() {
    let registry = BehaviorRegistry::default();
    registry.register_builder(Rc::new(RotationBehaviorBuilder));
    let mut behavior = registry
        .extract(&json!({"type": "rotation", "name": "spin", "rotation": {"z": 0.5}}))
        .unwrap();

    behavior.apply(&json!({"y": 0.75, "z": 0.0})).unwrap();
    let mut transform = Transform::default();
    behavior.update(0.016, &mut transform);
    assert_eq!(transform.rotation, Vector3::new(0.0, 0.75, 0.0));

    // unrelated user data leaves the rate alone
    behavior.apply(&json!({"speed": 3})).unwrap();
    behavior.update(0.016, &mut transform);
    assert_eq!(transform.rotation, Vector3::new(0.0, 1.5, 0.0));

    assert!(behavior.apply(&json!({"x": "fast"})).is_err());
}

#[test]
fn should_require_a_name_for_behaviors() {
    let registry = BehaviorRegistry::default();
    registry.register_builder(Rc::new(RotationBehaviorBuilder));

    let err = registry.extract(&json!({"type": "rotation"})).err().unwrap();
    assert_eq!(err.to_string(), "Behavior data is missing name property");
}

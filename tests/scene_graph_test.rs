use std::{cell::RefCell, f32::consts::FRAC_PI_2, rc::Rc};

use cgmath::{Matrix4, SquareMatrix, Vector3};
use serde_json::json;
use zone_ngin::{
    components::RotationBehavior,
    data_structures::scene_graph::{ROOT_NODE_NAME, Scene},
};

mod common;
use common::test_utils::{EventLog, Recorder, assert_matrix_eq};

fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn should_compose_world_matrices_top_down() {
    let mut scene = Scene::new();
    let root = scene.root();
    let parent = scene.create_node("parent");
    let child = scene.create_node("child");
    let grandchild = scene.create_node("grandchild");
    scene.add_child(root, parent).unwrap();
    scene.add_child(parent, child).unwrap();
    scene.add_child(child, grandchild).unwrap();

    scene.node_mut(root).unwrap().transform.position = Vector3::new(5.0, 0.0, 0.0);
    scene.node_mut(parent).unwrap().transform.position = Vector3::new(10.0, 20.0, 0.0);
    scene.node_mut(child).unwrap().transform.rotation = Vector3::new(0.0, 0.0, FRAC_PI_2);
    scene.node_mut(grandchild).unwrap().transform.scale = Vector3::new(2.0, 2.0, 1.0);

    scene.update(0.016);

    let root_node = scene.node(root).unwrap();
    assert_matrix_eq(root_node.world_matrix(), root_node.local_matrix());
    for id in [parent, child, grandchild] {
        let node = scene.node(id).unwrap();
        let parent_world = scene.node(node.parent().unwrap()).unwrap().world_matrix();
        assert_matrix_eq(node.world_matrix(), parent_world * node.local_matrix());
    }
}

#[test]
fn should_find_nodes_depth_first() {
    let mut scene = Scene::new();
    let root = scene.root();
    let a = scene.create_node("a");
    let nested = scene.create_node("dup");
    let b = scene.create_node("dup");
    scene.add_child(root, a).unwrap();
    scene.add_child(root, b).unwrap();
    scene.add_child(a, nested).unwrap();

    assert_eq!(scene.get_node_by_name("dup"), Some(nested));
    assert_eq!(scene.get_node_by_name(ROOT_NODE_NAME), Some(root));
    assert_eq!(scene.get_node_by_name("missing"), None);
}

#[test]
fn should_keep_a_single_parent_when_reparenting() {
    let mut scene = Scene::new();
    let root = scene.root();
    let first = scene.create_node("first");
    let second = scene.create_node("second");
    let child = scene.create_node("child");
    scene.add_child(root, first).unwrap();
    scene.add_child(root, second).unwrap();
    scene.add_child(first, child).unwrap();

    scene.add_child(second, child).unwrap();

    assert!(scene.node(first).unwrap().children().is_empty());
    assert_eq!(scene.node(second).unwrap().children(), &[child]);
    assert_eq!(scene.node(child).unwrap().parent(), Some(second));
}

#[test]
fn should_reject_cycles() {
    let mut scene = Scene::new();
    let root = scene.root();
    let parent = scene.create_node("parent");
    let child = scene.create_node("child");
    scene.add_child(root, parent).unwrap();
    scene.add_child(parent, child).unwrap();

    assert!(scene.add_child(child, parent).is_err());
    assert!(scene.add_child(child, child).is_err());
    assert_eq!(scene.node(child).unwrap().parent(), Some(parent));
}

#[test]
fn should_destroy_subtrees_on_removal() {
    let log = event_log();
    let mut scene = Scene::new();
    let root = scene.root();
    let parent = scene.create_node("parent");
    let child = scene.create_node("child");
    scene
        .node_mut(child)
        .unwrap()
        .add_component(Box::new(Recorder::new("child", &log)));
    scene.add_child(root, parent).unwrap();
    scene.add_child(parent, child).unwrap();
    scene.load().unwrap();
    assert_eq!(scene.len(), 3);

    assert!(scene.remove_child(root, parent));

    assert_eq!(scene.len(), 1);
    assert!(scene.node(parent).is_none());
    assert!(scene.node(child).is_none());
    assert_eq!(*log.borrow(), vec!["load:child", "unload:child"]);
    assert!(!scene.remove_child(root, parent));
}

#[test]
fn should_load_nodes_attached_to_a_loaded_scene() {
    let log = event_log();
    let mut scene = Scene::new();
    let root = scene.root();
    scene.load().unwrap();

    let late = scene.create_node("late");
    scene
        .node_mut(late)
        .unwrap()
        .add_component(Box::new(Recorder::new("late", &log)));
    assert!(!scene.node(late).unwrap().is_attached());

    scene.add_child(root, late).unwrap();

    let node = scene.node(late).unwrap();
    assert!(node.is_attached());
    assert!(node.is_loaded());
    assert_eq!(*log.borrow(), vec!["load:late"]);

    // loading again is a no-op for nodes that are already loaded
    scene.load().unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn should_update_components_before_behaviors_and_parents_before_children() {
    let log = event_log();
    let mut scene = Scene::new();
    let root = scene.root();
    let parent = scene.create_node("parent");
    let child = scene.create_node("child");
    {
        let node = scene.node_mut(parent).unwrap();
        node.add_component(Box::new(Recorder::new("parent", &log)));
        node.add_behavior(Box::new(RotationBehavior::new(
            "spin",
            Vector3::new(0.0, 0.0, 1.0),
        )));
    }
    scene
        .node_mut(child)
        .unwrap()
        .add_component(Box::new(Recorder::new("child", &log)));
    scene.add_child(root, parent).unwrap();
    scene.add_child(parent, child).unwrap();

    scene.update(0.016);

    assert_eq!(*log.borrow(), vec!["update:parent", "update:child"]);
    let node = scene.node(parent).unwrap();
    // the local matrix was taken before the behavior turned the node
    assert_matrix_eq(node.local_matrix(), Matrix4::identity());
    assert!((node.transform.rotation.z - 1.0).abs() < 1e-6);
    assert_eq!(node.behaviors()[0].owner(), Some(parent));
    assert_eq!(node.components()[0].owner(), Some(parent));
}

#[test]
fn should_draw_in_tree_order() {
    let harness = common::test_utils::Harness::new();
    let shader = zone_ngin::pipelines::basic::mk_basic_shader(&harness.gpu()).unwrap();
    let log = event_log();
    let mut scene = Scene::new();
    let root = scene.root();
    let a = scene.create_node("a");
    let a1 = scene.create_node("a1");
    let b = scene.create_node("b");
    for (id, label) in [(a, "a"), (a1, "a1"), (b, "b")] {
        scene
            .node_mut(id)
            .unwrap()
            .add_component(Box::new(Recorder::new(label, &log)));
    }
    scene.add_child(root, a).unwrap();
    scene.add_child(root, b).unwrap();
    scene.add_child(a, a1).unwrap();

    scene.draw(&shader).unwrap();

    assert_eq!(*log.borrow(), vec!["draw:a", "draw:a1", "draw:b"]);
}

#[test]
fn should_apply_user_data_to_behaviors() {
    let mut scene = Scene::new();
    let root = scene.root();
    let node = scene.create_node("spinner");
    scene
        .node_mut(node)
        .unwrap()
        .add_behavior(Box::new(RotationBehavior::new("spin", Vector3::new(0.0, 0.0, 0.0))));
    scene.add_child(root, node).unwrap();

    scene
        .apply_behaviors(node, &json!({"rotation": {"y": 2.0}}))
        .unwrap();
    scene.update(0.016);

    let node = scene.node(node).unwrap();
    assert!(node.get_behavior_by_name("spin").is_some());
    assert!(node.get_behavior_by_name("other").is_none());
    assert!((node.transform.rotation.y - 2.0).abs() < 1e-6);
}

//! Engine data structures: transforms, the scene graph and zones.
//!
//! - `transform` holds position/rotation/scale and composes the local matrix
//! - `scene_graph` is the arena-backed node tree of one scene
//! - `zone` wraps a scene loaded from JSON and keeps one zone active

pub mod scene_graph;
pub mod transform;
pub mod zone;

//! zone-ngin
//!
//! The runtime core of a small data-driven 2D engine that runs natively and on
//! WASM. Zones are JSON scene bundles loaded through an asynchronous resource
//! pipeline; their node trees are built from pluggable components and
//! behaviors and drawn each frame through a thin GL-shaped GPU layer.
//!
//! High-level modules
//! - `components`: the component/behavior traits, registries and built-in types
//! - `config`: engine configuration
//! - `context`: the shared handles of one engine instance
//! - `data_structures`: transforms, scene graph and zones
//! - `flow`: the per-frame driver
//! - `gpu`: device trait, buffers, shaders and the headless/wgpu backends
//! - `graphics`: colours, textures, materials and sprites
//! - `message`: the publish/subscribe message bus
//! - `pipelines`: render pipeline helpers and the basic shader
//! - `resources`: extension-keyed loaders and the resource cache
//! - `render`: the draw-call recording shared by the backends
//!

pub mod components;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod gpu;
pub mod graphics;
pub mod message;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;

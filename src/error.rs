//! Typed errors raised by the engine core.
//!
//! Configuration problems (bad zone data, unknown type tags) and GPU problems
//! (shader compilation, unknown uniforms) are both fatal for the operation that
//! triggered them. They are returned as `anyhow::Error` at the public API and can
//! be recovered with `downcast_ref` when a caller needs to tell them apart.

use thiserror::Error;

use crate::gpu::{DataType, ShaderStage};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{kind} type is undefined")]
    MissingType { kind: &'static str },
    #[error("{kind} type {tag} is not registered")]
    UnregisteredType { kind: &'static str, tag: String },
    #[error("{context} is missing {field} property")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },
    #[error("{context} property {field} must be {expected}")]
    InvalidField {
        context: &'static str,
        field: &'static str,
        expected: &'static str,
    },
    #[error("Zone {0} not found")]
    ZoneNotFound(u32),
    #[error("Zone {0} has no nodes")]
    ZoneHasNoNodes(String),
    #[error("{0} is not a valid #RRGGBB or #RRGGBBAA colour")]
    InvalidColor(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpuError {
    #[error("Error compiling {stage:?} stage of shader {shader}: {log}")]
    Compile {
        shader: String,
        stage: ShaderStage,
        log: String,
    },
    #[error("Error linking shader {shader}: {log}")]
    Link { shader: String, log: String },
    #[error("Attribute {name} not found in shader {shader}")]
    MissingAttribute { shader: String, name: String },
    #[error("Uniform {name} not found in shader {shader}")]
    MissingUniform { shader: String, name: String },
    #[error("attribute layout can't change after the buffer was uploaded")]
    LayoutLocked,
    #[error("draw call issued without an active program")]
    NoProgram,
    #[error("draw call issued without a bound vertex buffer")]
    NoVertexBuffer,
    #[error("unknown or deleted {0} handle")]
    UnknownHandle(&'static str),
    #[error("{size} component(s) of {data_type:?} can't be used as a vertex attribute")]
    UnsupportedFormat { data_type: DataType, size: u32 },
}

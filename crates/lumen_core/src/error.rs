//! Errors raised while building a scene.
//!
//! Only construction can fail. Geometric degeneracy during rendering
//! (parallel rays, zero denominators) resolves to "no intersection".

use thiserror::Error;

use crate::shape::ShapeId;

/// Errors that can occur while assembling or loading a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Unknown shape handle: {0:?}")]
    UnknownShape(ShapeId),

    #[error("Shape {0:?} is not a group")]
    NotAGroup(ShapeId),

    #[error("Shape {0:?} already has a parent")]
    AlreadyParented(ShapeId),

    #[error("Attaching {child:?} to {parent:?} would make a shape its own ancestor")]
    WouldCreateCycle { parent: ShapeId, child: ShapeId },

    #[error("Transform is not invertible")]
    SingularTransform,

    #[error("Invalid light: {0}")]
    InvalidLight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

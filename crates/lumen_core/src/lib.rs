//! lumen core - scene model for the path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: a shape arena with primitives, groups and CSG nodes,
//!   linked through non-owning parent handles
//! - **Intersections**: pooled intersection sets with hit selection
//! - **Surfaces**: materials and the patterns that color them
//! - **Lights**: point and rectangular area lights
//! - **Scene files**: JSON scene descriptions loaded into a `World`
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::load_scene;
//!
//! let world = load_scene("scenes/glass_and_csg.json")?;
//! println!("{} objects, {} lights", world.objects().len(), world.lights().len());
//! ```

pub mod error;
pub mod intersection;
pub mod light;
pub mod material;
pub mod pattern;
pub mod primitive;
pub mod scene_file;
pub mod shape;
pub mod world;

// Re-export commonly used types
pub use error::{SceneError, SceneResult};
pub use intersection::{HitMode, Intersection, IntersectionPool, IntersectionSet};
pub use light::{AreaLight, Light, PointLight};
pub use material::{Color, Material};
pub use pattern::{Pattern, Texture};
pub use primitive::Primitive;
pub use scene_file::{load_scene, load_scene_from_str, SceneDescription};
pub use shape::{CsgOp, Shape, ShapeId, ShapeKind, Shapes};
pub use world::World;

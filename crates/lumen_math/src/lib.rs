//! Math types shared by the lumen crates.
//!
//! glam supplies vectors and matrices; this crate adds the ray-tracing
//! specific pieces on top of it.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frame;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use frame::LocalFrame;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::{shearing, Mat4Ext};

/// Tolerance used when comparing floats in geometric tests.
pub const EPSILON: f32 = 1e-5;

/// Approximate float equality with an absolute tolerance.
#[inline]
pub fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

/// Reflect `v` about the normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

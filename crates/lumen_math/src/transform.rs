// Transform utilities for Mat4
//
// Extends glam::Mat4 with the helpers shape transforms need.
// glam::Mat4 already provides transform_point3(), transform_vector3() and inverse().

use glam::{Mat4, Vec3};
use crate::Aabb;

/// Determinants smaller than this are treated as singular.
const SINGULAR_DETERMINANT: f32 = 1e-8;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transform a normal by the inverse-transpose of this matrix.
    ///
    /// `self` must already be the inverse; the translation row is dropped
    /// by treating the normal as a direction (w = 0).
    fn transform_normal(&self, normal: Vec3) -> Vec3;

    /// Returns true if the matrix can be inverted.
    fn is_invertible(&self) -> bool;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        // Corners at infinity would produce NaN (inf * 0)
        if aabb.is_unbounded() {
            return Aabb::UNIVERSE;
        }

        let min_point = aabb.min();
        let max_point = aabb.max();

        let corners = [
            Vec3::new(min_point.x, min_point.y, min_point.z),
            Vec3::new(max_point.x, min_point.y, min_point.z),
            Vec3::new(min_point.x, max_point.y, min_point.z),
            Vec3::new(max_point.x, max_point.y, min_point.z),
            Vec3::new(min_point.x, min_point.y, max_point.z),
            Vec3::new(max_point.x, min_point.y, max_point.z),
            Vec3::new(min_point.x, max_point.y, max_point.z),
            Vec3::new(max_point.x, max_point.y, max_point.z),
        ];

        let first = self.transform_point3(corners[0]);
        let (result_min, result_max) = corners[1..]
            .iter()
            .map(|&corner| self.transform_point3(corner))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

        Aabb::from_points(result_min, result_max)
    }

    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        self.transpose().transform_vector3(normal)
    }

    fn is_invertible(&self) -> bool {
        self.determinant().abs() > SINGULAR_DETERMINANT
    }
}

/// Shear matrix: each component moves in proportion to the other two.
///
/// `xy` is "x in proportion to y", and so on.
pub fn shearing(xy: f32, xz: f32, yx: f32, yz: f32, zx: f32, zy: f32) -> Mat4 {
    Mat4::from_cols_array(&[
        1.0, yx, zx, 0.0, // column 0
        xy, 1.0, zy, 0.0, // column 1
        xz, yz, 1.0, 0.0, // column 2
        0.0, 0.0, 0.0, 1.0,
    ])
}

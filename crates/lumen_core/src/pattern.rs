//! Patterns that color a surface.
//!
//! A pattern only ever sees pattern-space points. The world converts a
//! world point into the shape's object space and `Texture` applies the
//! pattern's own transform on top of that.

use std::fmt;
use std::sync::Arc;

use lumen_math::{Mat4, Mat4Ext, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::material::Color;

/// A color function over pattern space.
pub trait Pattern: Send + Sync + fmt::Debug {
    /// Color at a point already expressed in pattern space.
    fn local_color_at(&self, point: Vec3) -> Color;
}

/// A pattern together with its placement on the shape.
#[derive(Clone, Debug)]
pub struct Texture {
    pattern: Arc<dyn Pattern>,
    transform: Mat4,
    inverse: Mat4,
}

impl Texture {
    /// Wrap a pattern with an identity transform.
    pub fn new(pattern: impl Pattern + 'static) -> Self {
        Self {
            pattern: Arc::new(pattern),
            transform: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
        }
    }

    /// A single flat color.
    pub fn solid(color: Color) -> Self {
        Self::new(SolidPattern(color))
    }

    /// Place the pattern on the shape. Fails for singular matrices.
    pub fn with_transform(mut self, transform: Mat4) -> SceneResult<Self> {
        if !transform.is_invertible() {
            return Err(SceneError::SingularTransform);
        }
        self.transform = transform;
        self.inverse = transform.inverse();
        Ok(self)
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Color at a point in the owning shape's object space.
    pub fn color_at(&self, object_point: Vec3) -> Color {
        let pattern_point = self.inverse.transform_point3(object_point);
        self.pattern.local_color_at(pattern_point)
    }
}

impl Default for Texture {
    fn default() -> Self {
        Self::solid(Color::ONE)
    }
}

#[inline]
fn is_even(v: f32) -> bool {
    (v.floor() as i64).rem_euclid(2) == 0
}

/// Same color everywhere.
#[derive(Debug, Clone, Copy)]
pub struct SolidPattern(pub Color);

impl Pattern for SolidPattern {
    fn local_color_at(&self, _point: Vec3) -> Color {
        self.0
    }
}

/// Alternating bands along X.
#[derive(Debug, Clone, Copy)]
pub struct StripePattern {
    pub a: Color,
    pub b: Color,
}

impl Pattern for StripePattern {
    fn local_color_at(&self, point: Vec3) -> Color {
        if is_even(point.x) {
            self.a
        } else {
            self.b
        }
    }
}

/// Linear blend from `a` to `b` across each unit of X.
#[derive(Debug, Clone, Copy)]
pub struct GradientPattern {
    pub a: Color,
    pub b: Color,
}

impl Pattern for GradientPattern {
    fn local_color_at(&self, point: Vec3) -> Color {
        let fraction = point.x - point.x.floor();
        self.a + (self.b - self.a) * fraction
    }
}

/// Concentric rings in the XZ plane.
#[derive(Debug, Clone, Copy)]
pub struct RingPattern {
    pub a: Color,
    pub b: Color,
}

impl Pattern for RingPattern {
    fn local_color_at(&self, point: Vec3) -> Color {
        if is_even((point.x * point.x + point.z * point.z).sqrt()) {
            self.a
        } else {
            self.b
        }
    }
}

/// 3D checkerboard of unit cubes.
#[derive(Debug, Clone, Copy)]
pub struct CheckerPattern {
    pub a: Color,
    pub b: Color,
}

impl Pattern for CheckerPattern {
    fn local_color_at(&self, point: Vec3) -> Color {
        if is_even(point.x.floor() + point.y.floor() + point.z.floor()) {
            self.a
        } else {
            self.b
        }
    }
}

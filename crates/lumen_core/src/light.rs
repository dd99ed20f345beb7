//! Point and rectangular area lights.
//!
//! Lights only describe where light comes from. Visibility and shading
//! live in the renderer, which sees lights through [`Light::sample`].

use std::sync::Arc;

use lumen_math::Vec3;

use crate::error::{SceneError, SceneResult};
use crate::material::Color;

/// An infinitely small light at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: Color,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: Color) -> Self {
        Self {
            position,
            intensity,
        }
    }
}

/// A parallelogram light divided into `usteps × vsteps` cells.
///
/// The light spans `corner` to `corner + full_u + full_v`. Stratified
/// estimates take one point per cell, offset inside the cell by the
/// jitter (the cell center unless a jitter sequence is set).
#[derive(Debug, Clone)]
pub struct AreaLight {
    corner: Vec3,
    uvec: Vec3,
    usteps: usize,
    vvec: Vec3,
    vsteps: usize,
    pub intensity: Color,
    jitter: Option<Arc<[f32]>>,
}

impl AreaLight {
    /// Build a light from its corner, full edge vectors and cell counts.
    pub fn new(
        corner: Vec3,
        full_u: Vec3,
        usteps: usize,
        full_v: Vec3,
        vsteps: usize,
        intensity: Color,
    ) -> SceneResult<Self> {
        if usteps == 0 || vsteps == 0 {
            return Err(SceneError::InvalidLight(format!(
                "area light needs at least one cell per edge (got {usteps}x{vsteps})"
            )));
        }
        Ok(Self {
            corner,
            uvec: full_u / usteps as f32,
            usteps,
            vvec: full_v / vsteps as f32,
            vsteps,
            intensity,
            jitter: None,
        })
    }

    /// Offset cell points by a cyclic sequence instead of the center.
    ///
    /// Values are consumed in pairs (u then v), cell by cell, and must lie
    /// in `[0, 1]`.
    pub fn with_jitter(mut self, sequence: Vec<f32>) -> SceneResult<Self> {
        if sequence.is_empty() {
            return Err(SceneError::InvalidLight("jitter sequence is empty".into()));
        }
        if let Some(bad) = sequence.iter().find(|j| !(0.0..=1.0).contains(*j)) {
            return Err(SceneError::InvalidLight(format!(
                "jitter value {bad} is outside [0, 1]"
            )));
        }
        self.jitter = Some(sequence.into());
        Ok(self)
    }

    pub fn corner(&self) -> Vec3 {
        self.corner
    }

    /// Edge of a single cell along u.
    pub fn uvec(&self) -> Vec3 {
        self.uvec
    }

    /// Edge of a single cell along v.
    pub fn vvec(&self) -> Vec3 {
        self.vvec
    }

    pub fn usteps(&self) -> usize {
        self.usteps
    }

    pub fn vsteps(&self) -> usize {
        self.vsteps
    }

    /// Total cell count.
    pub fn samples(&self) -> usize {
        self.usteps * self.vsteps
    }

    /// Center of the light.
    pub fn position(&self) -> Vec3 {
        self.corner + (self.uvec * self.usteps as f32 + self.vvec * self.vsteps as f32) * 0.5
    }

    /// Point at normalized coordinates `(u, v)` over the whole light.
    pub fn sample(&self, u: f32, v: f32) -> Vec3 {
        self.corner + self.uvec * (u * self.usteps as f32) + self.vvec * (v * self.vsteps as f32)
    }

    /// Point inside cell `(cu, cv)` at in-cell offset `(ju, jv)`.
    pub fn cell_point(&self, cu: usize, cv: usize, ju: f32, jv: f32) -> Vec3 {
        self.corner + self.uvec * (cu as f32 + ju) + self.vvec * (cv as f32 + jv)
    }

    /// One point per cell, rows of `u` for each `v`, jittered in order.
    pub fn cell_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.vsteps).flat_map(move |cv| {
            (0..self.usteps).map(move |cu| {
                let k = 2 * (cv * self.usteps + cu);
                self.cell_point(cu, cv, self.jitter_at(k), self.jitter_at(k + 1))
            })
        })
    }

    fn jitter_at(&self, i: usize) -> f32 {
        match &self.jitter {
            Some(seq) => seq[i % seq.len()],
            None => 0.5,
        }
    }
}

/// Any light source in a scene.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Light {
    Point(PointLight),
    Area(AreaLight),
}

impl Light {
    /// Representative position (the center for area lights).
    pub fn position(&self) -> Vec3 {
        match self {
            Light::Point(light) => light.position,
            Light::Area(light) => light.position(),
        }
    }

    pub fn intensity(&self) -> Color {
        match self {
            Light::Point(light) => light.intensity,
            Light::Area(light) => light.intensity,
        }
    }

    /// A point on the light for the uniform pair `(u, v)`.
    ///
    /// Point lights ignore the coordinates.
    pub fn sample(&self, u: f32, v: f32) -> Vec3 {
        match self {
            Light::Point(light) => light.position,
            Light::Area(light) => light.sample(u, v),
        }
    }
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Light::Point(light)
    }
}

impl From<AreaLight> for Light {
    fn from(light: AreaLight) -> Self {
        Light::Area(light)
    }
}

//! The scene as seen by the renderer.

use lumen_math::{Ray, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::intersection::{IntersectionPool, IntersectionSet};
use crate::light::Light;
use crate::material::Color;
use crate::shape::{CsgOp, ShapeId, Shapes};

/// Shapes, lights and the shared intersection pool.
///
/// Only root shapes (those without a parent) are listed in `objects`;
/// everything else is reached through its group or CSG node. The world is
/// read-only while rendering and is shared across threads by reference.
#[derive(Debug, Default)]
pub struct World {
    shapes: Shapes,
    objects: Vec<ShapeId>,
    lights: Vec<Light>,
    pool: IntersectionPool,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shapes(&self) -> &Shapes {
        &self.shapes
    }

    pub fn shapes_mut(&mut self) -> &mut Shapes {
        &mut self.shapes
    }

    pub fn objects(&self) -> &[ShapeId] {
        &self.objects
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn add_light(&mut self, light: impl Into<Light>) {
        self.lights.push(light.into());
    }

    /// Register an unparented shape as a root of the scene.
    pub fn add_object(&mut self, id: ShapeId) -> SceneResult<()> {
        let shape = self.shapes.get(id).ok_or(SceneError::UnknownShape(id))?;
        if shape.parent().is_some() {
            return Err(SceneError::AlreadyParented(id));
        }
        if !self.objects.contains(&id) {
            self.objects.push(id);
        }
        Ok(())
    }

    /// Attach `child` to `group`; a child that was a root stops being one.
    pub fn add_child(&mut self, group: ShapeId, child: ShapeId) -> SceneResult<()> {
        self.shapes.add_child(group, child)?;
        self.objects.retain(|&o| o != child);
        Ok(())
    }

    /// Combine two shapes and register the result as a root.
    pub fn add_csg(&mut self, op: CsgOp, left: ShapeId, right: ShapeId) -> SceneResult<ShapeId> {
        let csg = self.shapes.add_csg(op, left, right)?;
        self.objects.retain(|&o| o != left && o != right);
        self.objects.push(csg);
        Ok(csg)
    }

    /// Build bounding hierarchies under every root.
    pub fn divide(&mut self, threshold: usize) {
        for id in self.objects.clone() {
            self.shapes.divide(id, threshold);
        }
    }

    /// All intersections along `ray`, sorted by `t`.
    ///
    /// The set borrows a buffer from the world's pool and hands it back
    /// when dropped.
    pub fn intersect(&self, ray: &Ray) -> IntersectionSet<'_> {
        let mut set = self.pool.acquire();
        let buffer = set.buffer_mut();
        for &id in &self.objects {
            // Roots re-parented through `shapes_mut` are reached via their new parent
            if self.shapes.parent(id).is_none() {
                self.shapes.intersect(id, ray, buffer);
            }
        }
        set.sort();
        set
    }

    pub fn surface_color(&self, id: ShapeId, point: Vec3) -> Color {
        self.shapes.surface_color(id, point)
    }
}

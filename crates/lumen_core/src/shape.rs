//! Shape arena: leaves, groups and CSG nodes linked by handles.
//!
//! Shapes live in a flat `Vec` owned by [`Shapes`] and refer to each other
//! through [`ShapeId`]. A child's parent link is a plain handle that is
//! only written when the parent adopts it, so the graph stays a tree and
//! space conversion can walk upward without owning anything.

use lumen_math::{Aabb, Interval, Mat4, Mat4Ext, Ray, Vec3};
use serde::Deserialize;

use crate::error::{SceneError, SceneResult};
use crate::intersection::Intersection;
use crate::material::{Color, Material};
use crate::primitive::Primitive;

/// Handle to a shape inside a [`Shapes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(usize);

impl ShapeId {
    /// Position of the shape in its arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Boolean operator of a CSG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsgOp {
    Union,
    Intersection,
    Difference,
}

impl CsgOp {
    /// Whether a hit survives the operator.
    ///
    /// `left_hit` is true when the hit belongs to the left operand;
    /// `in_left`/`in_right` track whether the ray is currently inside
    /// each operand.
    pub fn allows(self, left_hit: bool, in_left: bool, in_right: bool) -> bool {
        match self {
            CsgOp::Union => (left_hit && !in_right) || (!left_hit && !in_left),
            CsgOp::Intersection => (left_hit && in_right) || (!left_hit && in_left),
            CsgOp::Difference => (left_hit && !in_right) || (!left_hit && in_left),
        }
    }
}

/// What a shape is.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Primitive(Primitive),
    Group(Vec<ShapeId>),
    Csg {
        op: CsgOp,
        left: ShapeId,
        right: ShapeId,
    },
}

/// A node of the arena.
#[derive(Debug, Clone)]
pub struct Shape {
    kind: ShapeKind,
    transform: Mat4,
    inverse: Mat4,
    material: Material,
    parent: Option<ShapeId>,
    /// Object-space bounds, refreshed whenever a descendant changes
    local_bounds: Aabb,
}

impl Shape {
    fn new(kind: ShapeKind) -> Self {
        let local_bounds = match &kind {
            ShapeKind::Primitive(p) => p.local_bounds(),
            _ => Aabb::EMPTY,
        };
        Self {
            kind,
            transform: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
            material: Material::default(),
            parent: None,
            local_bounds,
        }
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn inverse(&self) -> Mat4 {
        self.inverse
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn parent(&self) -> Option<ShapeId> {
        self.parent
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ShapeKind::Group(_))
    }
}

/// Owner of every shape in a scene.
#[derive(Debug, Clone, Default)]
pub struct Shapes {
    shapes: Vec<Shape>,
}

impl Shapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0)
    }

    fn checked(&self, id: ShapeId) -> SceneResult<&Shape> {
        self.shapes.get(id.0).ok_or(SceneError::UnknownShape(id))
    }

    fn checked_mut(&mut self, id: ShapeId) -> SceneResult<&mut Shape> {
        self.shapes.get_mut(id.0).ok_or(SceneError::UnknownShape(id))
    }

    fn push(&mut self, shape: Shape) -> ShapeId {
        self.shapes.push(shape);
        ShapeId(self.shapes.len() - 1)
    }

    /// Add an unparented leaf with identity transform and default material.
    pub fn add_shape(&mut self, primitive: Primitive) -> ShapeId {
        self.push(Shape::new(ShapeKind::Primitive(primitive)))
    }

    /// Add an empty group.
    pub fn add_group(&mut self) -> ShapeId {
        self.push(Shape::new(ShapeKind::Group(Vec::new())))
    }

    /// Attach `child` to `group`.
    ///
    /// Fails if `group` is not a group, if `child` already has a parent, or
    /// if `child` is `group` itself or one of its ancestors.
    pub fn add_child(&mut self, group: ShapeId, child: ShapeId) -> SceneResult<()> {
        if !self.checked(group)?.is_group() {
            return Err(SceneError::NotAGroup(group));
        }
        if self.checked(child)?.parent.is_some() {
            return Err(SceneError::AlreadyParented(child));
        }
        if self.ancestors(group).any(|a| a == child) {
            return Err(SceneError::WouldCreateCycle {
                parent: group,
                child,
            });
        }

        if let ShapeKind::Group(children) = &mut self.shapes[group.0].kind {
            children.push(child);
        }
        self.shapes[child.0].parent = Some(group);
        self.refresh_bounds(group);
        Ok(())
    }

    /// Combine two unparented shapes with a boolean operator.
    pub fn add_csg(&mut self, op: CsgOp, left: ShapeId, right: ShapeId) -> SceneResult<ShapeId> {
        for id in [left, right] {
            if self.checked(id)?.parent.is_some() {
                return Err(SceneError::AlreadyParented(id));
            }
        }
        if left == right {
            return Err(SceneError::AlreadyParented(right));
        }

        let csg = self.push(Shape::new(ShapeKind::Csg { op, left, right }));
        self.shapes[left.0].parent = Some(csg);
        self.shapes[right.0].parent = Some(csg);
        self.refresh_bounds(csg);
        Ok(csg)
    }

    /// Replace a shape's transform, keeping the cached inverse in sync.
    pub fn set_transform(&mut self, id: ShapeId, transform: Mat4) -> SceneResult<()> {
        if !transform.is_invertible() {
            return Err(SceneError::SingularTransform);
        }
        let shape = self.checked_mut(id)?;
        shape.transform = transform;
        shape.inverse = transform.inverse();
        let parent = shape.parent;
        if let Some(parent) = parent {
            self.refresh_bounds(parent);
        }
        Ok(())
    }

    /// Set a shape's material. Groups and CSG nodes pass it down to every
    /// descendant.
    pub fn set_material(&mut self, id: ShapeId, material: Material) -> SceneResult<()> {
        self.checked(id)?;
        for child in self.children(id) {
            self.set_material(child, material.clone())?;
        }
        self.shapes[id.0].material = material;
        Ok(())
    }

    pub fn material(&self, id: ShapeId) -> &Material {
        &self.shapes[id.0].material
    }

    pub fn parent(&self, id: ShapeId) -> Option<ShapeId> {
        self.shapes.get(id.0).and_then(|s| s.parent)
    }

    /// Direct children: group members or the two CSG operands.
    pub fn children(&self, id: ShapeId) -> Vec<ShapeId> {
        match self.shapes.get(id.0).map(|s| &s.kind) {
            Some(ShapeKind::Group(children)) => children.clone(),
            Some(ShapeKind::Csg { left, right, .. }) => vec![*left, *right],
            _ => Vec::new(),
        }
    }

    /// `id` followed by its parent, grandparent and so on.
    pub fn ancestors(&self, id: ShapeId) -> impl Iterator<Item = ShapeId> + '_ {
        std::iter::successors(Some(id), move |&cur| self.parent(cur))
    }

    /// Convert a world-space point into `id`'s object space.
    pub fn world_to_object(&self, id: ShapeId, point: Vec3) -> Vec3 {
        let shape = &self.shapes[id.0];
        let point = match shape.parent {
            Some(parent) => self.world_to_object(parent, point),
            None => point,
        };
        shape.inverse.transform_point3(point)
    }

    /// Convert an object-space normal of `id` into world space.
    pub fn normal_to_world(&self, id: ShapeId, normal: Vec3) -> Vec3 {
        let shape = &self.shapes[id.0];
        let normal = shape.inverse.transform_normal(normal).normalize_or_zero();
        match shape.parent {
            Some(parent) => self.normal_to_world(parent, normal),
            None => normal,
        }
    }

    /// World-space surface normal of a leaf at a world-space point.
    ///
    /// Composite nodes have no surface of their own and return zero.
    pub fn normal_at(&self, id: ShapeId, world_point: Vec3) -> Vec3 {
        let local_point = self.world_to_object(id, world_point);
        let local_normal = match &self.shapes[id.0].kind {
            ShapeKind::Primitive(p) => p.local_normal_at(local_point),
            _ => return Vec3::ZERO,
        };
        self.normal_to_world(id, local_normal)
    }

    /// Surface color of `id` at a world-space point.
    pub fn surface_color(&self, id: ShapeId, world_point: Vec3) -> Color {
        let object_point = self.world_to_object(id, world_point);
        self.shapes[id.0].material.texture.color_at(object_point)
    }

    /// Intersect a ray given in the space of `id`'s parent.
    pub fn intersect(&self, id: ShapeId, ray: &Ray, out: &mut Vec<Intersection>) {
        let local_ray = ray.transform(&self.shapes[id.0].inverse);
        self.local_intersect(id, &local_ray, out);
    }

    /// Intersect a ray already in `id`'s object space.
    ///
    /// Hits are appended to `out`; negative `t` values are kept so callers
    /// can track containment.
    pub fn local_intersect(&self, id: ShapeId, ray: &Ray, out: &mut Vec<Intersection>) {
        let shape = &self.shapes[id.0];
        match &shape.kind {
            ShapeKind::Primitive(p) => p.local_intersect(ray, |t| out.push(Intersection::new(t, id))),
            ShapeKind::Group(children) => {
                if !shape.local_bounds.hit(ray, Interval::UNIVERSE) {
                    return;
                }
                for &child in children {
                    self.intersect(child, ray, out);
                }
            }
            ShapeKind::Csg { op, left, right } => {
                if !shape.local_bounds.hit(ray, Interval::UNIVERSE) {
                    return;
                }
                let start = out.len();
                self.intersect(*left, ray, out);
                self.intersect(*right, ray, out);
                out[start..].sort_by(|a, b| a.t.total_cmp(&b.t));

                let (mut in_left, mut in_right) = (false, false);
                let mut kept = start;
                for i in start..out.len() {
                    let hit = out[i];
                    let left_hit = self.includes(*left, hit.shape);
                    if op.allows(left_hit, in_left, in_right) {
                        out[kept] = hit;
                        kept += 1;
                    }
                    if left_hit {
                        in_left = !in_left;
                    } else {
                        in_right = !in_right;
                    }
                }
                out.truncate(kept);
            }
        }
    }

    /// Whether `target` is `id` or lies somewhere beneath it.
    pub fn includes(&self, id: ShapeId, target: ShapeId) -> bool {
        if id == target {
            return true;
        }
        match &self.shapes[id.0].kind {
            ShapeKind::Primitive(_) => false,
            ShapeKind::Group(children) => children.iter().any(|&c| self.includes(c, target)),
            ShapeKind::Csg { left, right, .. } => {
                self.includes(*left, target) || self.includes(*right, target)
            }
        }
    }

    /// Object-space bounds.
    pub fn local_bounds(&self, id: ShapeId) -> Aabb {
        self.shapes[id.0].local_bounds
    }

    /// Bounds in the space of the shape's parent.
    pub fn bounds(&self, id: ShapeId) -> Aabb {
        let shape = &self.shapes[id.0];
        if is_empty(&shape.local_bounds) {
            return Aabb::EMPTY;
        }
        shape.transform.transform_aabb(&shape.local_bounds)
    }

    fn compute_local_bounds(&self, id: ShapeId) -> Aabb {
        match &self.shapes[id.0].kind {
            ShapeKind::Primitive(p) => p.local_bounds(),
            ShapeKind::Group(children) => children
                .iter()
                .fold(Aabb::EMPTY, |acc, &c| Aabb::surrounding(&acc, &self.bounds(c))),
            ShapeKind::Csg { left, right, .. } => {
                Aabb::surrounding(&self.bounds(*left), &self.bounds(*right))
            }
        }
    }

    /// Recompute cached bounds of `id` and everything above it.
    fn refresh_bounds(&mut self, id: ShapeId) {
        let mut current = Some(id);
        while let Some(cur) = current {
            self.shapes[cur.0].local_bounds = self.compute_local_bounds(cur);
            current = self.shapes[cur.0].parent;
        }
    }

    /// Partition large groups under `id` into spatial sub-groups.
    ///
    /// A group with more than `threshold` children has its bounds split
    /// in half along the longest axis; children that fit entirely in one
    /// half move into a new sub-group for that half. Every child,
    /// including CSG operands, is then divided in turn.
    pub fn divide(&mut self, id: ShapeId, threshold: usize) {
        let created = self.divide_recursive(id, threshold);
        if created > 0 {
            log::debug!("Divided {:?} into {} sub-groups", id, created);
        }
    }

    fn divide_recursive(&mut self, id: ShapeId, threshold: usize) -> usize {
        let mut created = 0;
        if let ShapeKind::Group(children) = &self.shapes[id.0].kind {
            if children.len() > threshold {
                created += self.partition_children(id);
            }
        }
        for child in self.children(id) {
            created += self.divide_recursive(child, threshold);
        }
        created
    }

    /// Returns the number of sub-groups created.
    fn partition_children(&mut self, group: ShapeId) -> usize {
        let Some((left_box, right_box)) = self.shapes[group.0].local_bounds.split() else {
            return 0;
        };
        let children = self.children(group);

        let (mut left, mut right, mut rest) = (Vec::new(), Vec::new(), Vec::new());
        for child in children.iter().copied() {
            let b = self.bounds(child);
            if left_box.contains_box(&b) {
                left.push(child);
            } else if right_box.contains_box(&b) {
                right.push(child);
            } else {
                rest.push(child);
            }
        }
        // Moving everything into one sub-group would only add a level
        if left.len() == children.len() || right.len() == children.len() {
            return 0;
        }

        let mut created = 0;
        for members in [left, right] {
            if members.is_empty() {
                continue;
            }
            let sub = self.add_group();
            for &member in &members {
                self.shapes[member.0].parent = Some(sub);
            }
            self.shapes[sub.0].kind = ShapeKind::Group(members);
            self.shapes[sub.0].parent = Some(group);
            self.shapes[sub.0].material = self.shapes[group.0].material.clone();
            self.shapes[sub.0].local_bounds = self.compute_local_bounds(sub);
            rest.push(sub);
            created += 1;
        }

        self.shapes[group.0].kind = ShapeKind::Group(rest);
        self.refresh_bounds(group);
        created
    }
}

fn is_empty(aabb: &Aabb) -> bool {
    aabb.x.min > aabb.x.max || aabb.y.min > aabb.y.max || aabb.z.min > aabb.z.max
}

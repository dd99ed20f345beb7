//! Quantities derived from the selected hit of a ray.

use lumen_core::{Color, Intersection, Material, ShapeId, Shapes};
use lumen_math::{reflect, Ray, Vec3};

/// Offset applied along the normal for secondary ray origins.
pub const SURFACE_BIAS: f32 = 0.0001;

/// Refractive index outside every object.
const VACUUM_INDEX: f32 = 1.0;

/// Everything shading needs about one hit.
///
/// The normal always faces the eye; `is_inside` records whether it had to
/// be flipped. `n1` and `n2` are the refractive indices on the incoming
/// and outgoing side of the surface along the ray.
#[derive(Debug, Clone)]
pub struct IntersectionInfo<'w> {
    pub t: f32,
    pub shape: ShapeId,
    pub material: &'w Material,
    pub point: Vec3,
    pub eye: Vec3,
    pub normal: Vec3,
    pub is_inside: bool,
    /// Origin for reflected and shadow rays
    pub over_point: Vec3,
    /// Origin for transmitted rays
    pub under_point: Vec3,
    pub reflect: Vec3,
    pub n1: f32,
    pub n2: f32,
    pub surface_color: Color,
}

impl<'w> IntersectionInfo<'w> {
    /// Derive hit info for `xs[hit_index]`.
    ///
    /// `xs` must be the full sorted intersection list of `ray`; entries
    /// before the hit determine which objects the ray is inside of.
    pub fn new(shapes: &'w Shapes, xs: &[Intersection], hit_index: usize, ray: &Ray) -> Self {
        let hit = xs[hit_index];
        let (n1, n2) = refractive_indices(shapes, xs, hit_index);

        let direction = ray.direction.normalize_or_zero();
        let point = ray.at(hit.t);
        let eye = -direction;
        let mut normal = shapes.normal_at(hit.shape, point);
        let is_inside = normal.dot(eye) < 0.0;
        if is_inside {
            normal = -normal;
        }
        let over_point = point + normal * SURFACE_BIAS;

        Self {
            t: hit.t,
            shape: hit.shape,
            material: shapes.material(hit.shape),
            point,
            eye,
            normal,
            is_inside,
            over_point,
            under_point: point - normal * SURFACE_BIAS,
            reflect: reflect(direction, normal),
            n1,
            n2,
            surface_color: shapes.surface_color(hit.shape, over_point),
        }
    }

    /// Schlick's approximation of the reflected fraction at this boundary.
    pub fn schlick(&self) -> f32 {
        let mut cos = self.eye.dot(self.normal);

        // Total internal reflection only happens going into a thinner medium
        if self.n1 > self.n2 {
            let n = self.n1 / self.n2;
            let sin2_t = n * n * (1.0 - cos * cos);
            if sin2_t > 1.0 {
                return 1.0;
            }
            cos = (1.0 - sin2_t).sqrt();
        }

        let r0 = ((self.n1 - self.n2) / (self.n1 + self.n2)).powi(2);
        r0 + (1.0 - r0) * (1.0 - cos).powi(5)
    }

    /// Direction of the transmitted ray, or `None` under total internal
    /// reflection.
    pub fn refracted_direction(&self) -> Option<Vec3> {
        let ratio = self.n1 / self.n2;
        let cos_i = self.eye.dot(self.normal);
        let sin2_t = ratio * ratio * (1.0 - cos_i * cos_i);
        if sin2_t > 1.0 {
            return None;
        }
        let cos_t = (1.0 - sin2_t).sqrt();
        Some(self.normal * (ratio * cos_i - cos_t) - self.eye * ratio)
    }
}

/// Walk the sorted hits up to `hit_index`, tracking which objects contain
/// the ray.
fn refractive_indices(shapes: &Shapes, xs: &[Intersection], hit_index: usize) -> (f32, f32) {
    let top = |containers: &[ShapeId]| {
        containers
            .last()
            .map_or(VACUUM_INDEX, |&s| shapes.material(s).refractive_index)
    };

    let mut containers: Vec<ShapeId> = Vec::new();
    let mut n1 = VACUUM_INDEX;
    for (i, x) in xs.iter().enumerate().take(hit_index + 1) {
        if i == hit_index {
            n1 = top(&containers);
        }
        match containers.iter().position(|&s| s == x.shape) {
            Some(pos) => {
                containers.remove(pos);
            }
            None => containers.push(x.shape),
        }
    }
    (n1, top(&containers))
}

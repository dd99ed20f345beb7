//! Shadow rays and light visibility.

use lumen_core::{HitMode, Light, World};
use lumen_math::{Ray, Vec3};

use crate::sampler::Sampler;

/// True when a shadow-casting surface sits strictly between `point` and
/// `light_point`.
pub fn is_shadowed(world: &World, point: Vec3, light_point: Vec3) -> bool {
    let v = light_point - point;
    let distance = v.length();
    if distance <= 0.0 {
        return false;
    }
    let ray = Ray::new(point, v / distance);
    let xs = world.intersect(&ray);
    xs.hit(world.shapes(), HitMode::ShadowCasters)
        .is_some_and(|hit| hit.t < distance)
}

/// Binary visibility of one sampled point on `light`, and that point.
///
/// Area lights draw a single position from `sampler`; point lights always
/// use their own position.
pub fn intensity_at(world: &World, point: Vec3, light: &Light, sampler: &mut dyn Sampler) -> (f32, Vec3) {
    let (u, v) = match light {
        Light::Point(_) => (0.5, 0.5),
        Light::Area(_) => sampler.next_uv(),
        _ => return (0.0, Vec3::ZERO),
    };
    let light_point = light.sample(u, v);
    let visibility = if is_shadowed(world, point, light_point) { 0.0 } else { 1.0 };
    (visibility, light_point)
}

/// Fraction of the light's cells visible from `point`.
///
/// Uses the area light's jitter sequence instead of a sampler, so the
/// result is deterministic.
pub fn stratified_intensity_at(world: &World, point: Vec3, light: &Light) -> f32 {
    match light {
        Light::Point(point_light) => {
            if is_shadowed(world, point, point_light.position) {
                0.0
            } else {
                1.0
            }
        }
        Light::Area(area) => {
            let visible = area
                .cell_points()
                .filter(|&cell| !is_shadowed(world, point, cell))
                .count();
            visible as f32 / area.samples() as f32
        }
        _ => 0.0,
    }
}

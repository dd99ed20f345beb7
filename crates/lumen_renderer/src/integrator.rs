//! Iterative path integrator.
//!
//! Transparent surfaces first toss a coin on their transparency; a
//! dielectric bounce reflects or refracts without sampling lights. Other
//! bounces either end the path with a next-event estimate of direct light
//! or continue it with a BRDF-sampled ray. Russian roulette trims
//! low-throughput paths once `min_depth` bounces are done.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lumen_core::{Color, HitMode, World};
use lumen_math::{LocalFrame, Ray};

use crate::hit_info::IntersectionInfo;
use crate::lighting::intensity_at;
use crate::microfacet::{MicrofacetModel, ShadingInfo};
use crate::sampler::Sampler;

/// Draws allowed before giving up on a BRDF sample above the surface.
const MAX_SAMPLE_ATTEMPTS: usize = 32;

/// Probability of ending a bounce with direct lighting.
///
/// Perfect mirrors never sample lights directly; otherwise the weight
/// rises from 0.10 (smooth) to 0.60 (rough) with `alpha`.
pub fn direct_probability(alpha: f32) -> f32 {
    if alpha == 0.0 {
        return 0.0;
    }
    0.60 * alpha + 0.10 * (1.0 - alpha)
}

/// Estimates radiance along camera rays.
#[derive(Debug)]
pub struct PathIntegrator {
    min_depth: u32,
    max_depth: u32,
    russian_roulette: bool,
    model: MicrofacetModel,
    cancel: Option<Arc<AtomicBool>>,
}

impl PathIntegrator {
    /// Integrator with the default GGX model and roulette enabled.
    pub fn new(min_depth: u32, max_depth: u32) -> Self {
        Self {
            min_depth,
            max_depth,
            russian_roulette: true,
            model: MicrofacetModel::default(),
            cancel: None,
        }
    }

    pub fn with_model(mut self, model: MicrofacetModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_russian_roulette(mut self, enabled: bool) -> Self {
        self.russian_roulette = enabled;
        self
    }

    /// Paths stop at their next bounce once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn min_depth(&self) -> u32 {
        self.min_depth
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn model(&self) -> &MicrofacetModel {
        &self.model
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Radiance arriving along `ray`.
    pub fn color_at(&self, world: &World, ray: &Ray, sampler: &mut dyn Sampler) -> Color {
        let mut ray = *ray;
        let mut throughput = Color::ONE;
        let mut color = Color::ZERO;

        for depth in 0..self.max_depth {
            if self.is_cancelled() {
                break;
            }

            // The intersection set goes back to the pool before shading
            let info = {
                let xs = world.intersect(&ray);
                let Some(index) = xs.hit_index(world.shapes(), HitMode::Any) else {
                    break;
                };
                IntersectionInfo::new(world.shapes(), &xs, index, &ray)
            };

            let material = info.material;
            color += material.ambient * info.surface_color * throughput;
            if material.is_emissive() {
                break;
            }

            if material.transparency > 0.0 && sampler.random() < material.transparency {
                ray = dielectric_bounce(&info, sampler);
            } else {
                let p_direct = direct_probability(material.alpha());
                if sampler.random() <= p_direct && p_direct > 0.0 {
                    color += self.direct_lighting(world, &info, sampler) * throughput / p_direct;
                    break;
                }
                throughput /= 1.0 - p_direct;

                let Some((next, weight)) = self.brdf_bounce(&info, sampler) else {
                    break;
                };
                ray = next;
                throughput *= weight;
            }
            if throughput.max_element() <= 0.0 {
                break;
            }

            if depth < self.min_depth || !self.russian_roulette {
                continue;
            }

            let p_continue = throughput.max_element().clamp(0.0, 1.0);
            if p_continue <= 0.0 || sampler.random() > p_continue {
                break;
            }
            throughput /= p_continue;
        }

        color
    }

    /// Next-event estimate summed over every light.
    pub fn direct_lighting(&self, world: &World, info: &IntersectionInfo<'_>, sampler: &mut dyn Sampler) -> Color {
        let mut total = Color::ZERO;
        for light in world.lights() {
            let (visibility, light_point) = intensity_at(world, info.over_point, light, sampler);
            if visibility <= 0.0 {
                continue;
            }
            let si = ShadingInfo::new(info, light_point, light.intensity() * visibility);
            total += self.model.direct(&si);
        }
        total
    }

    /// Continue the path with a BRDF importance sample.
    ///
    /// Draws below the surface are rejected and drawn again. Returns the
    /// new ray and the factor to apply to the throughput.
    fn brdf_bounce(&self, info: &IntersectionInfo<'_>, sampler: &mut dyn Sampler) -> Option<(Ray, Color)> {
        let frame = LocalFrame::new(info.normal);
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let (e0, e1) = sampler.next_uv();
            let (wi, weight) = self.model.sample(info, &frame, e0, e1);
            if wi.z > 0.0 {
                return Some((Ray::new(info.over_point, frame.to_world(wi)), weight));
            }
        }
        log::trace!("no BRDF sample above the surface after {MAX_SAMPLE_ATTEMPTS} draws");
        None
    }
}

/// Reflect with the Schlick probability, otherwise refract. Total internal
/// reflection falls back to the mirror direction. The throughput is
/// unchanged.
fn dielectric_bounce(info: &IntersectionInfo<'_>, sampler: &mut dyn Sampler) -> Ray {
    if sampler.random() < info.schlick() {
        return Ray::new(info.over_point, info.reflect);
    }
    match info.refracted_direction() {
        Some(direction) => Ray::new(info.under_point, direction),
        None => Ray::new(info.over_point, info.reflect),
    }
}

//! Microfacet reflectance: pluggable distribution, shadowing and Fresnel
//! terms combined Cook-Torrance style.
//!
//! The specular term is `D * F * G / (4 * N.L * N.V)`; the diffuse term
//! is the surface color scaled by the material's diffuse weight. Both are
//! weighted by the Lambertian `N.L` in [`MicrofacetModel::direct`].

use std::f32::consts::PI;
use std::fmt;

use lumen_core::Color;
use lumen_math::{LocalFrame, Vec3};

use crate::hit_info::IntersectionInfo;

/// Alpha values below this are treated as this (near-mirror).
const MIN_ALPHA: f32 = 1e-3;

/// The specular term is skipped when `4 * N.L * N.V` is this small.
const MIN_SPECULAR_DENOMINATOR: f32 = 1e-3;

/// Angles between light, view, normal and half vector for one light.
#[derive(Debug, Clone, Copy)]
pub struct ShadingInfo {
    /// Light color scaled by its visibility
    pub light_intensity: Color,
    pub light_dir: Vec3,
    pub normal: Vec3,
    pub eye: Vec3,
    pub half: Vec3,
    pub n_dot_l: f32,
    pub n_dot_v: f32,
    pub n_dot_h: f32,
    pub v_dot_h: f32,
    pub alpha: f32,
    pub diffuse_color: Color,
    pub specular_color: Color,
    /// Reflectance at normal incidence
    pub f0: f32,
}

impl ShadingInfo {
    /// Shading toward a sampled point on a light.
    pub fn new(info: &IntersectionInfo<'_>, light_point: Vec3, light_intensity: Color) -> Self {
        let light_dir = (light_point - info.over_point).normalize_or_zero();
        Self::for_direction(info, light_dir, light_intensity)
    }

    /// Shading for an arbitrary incoming direction.
    pub fn for_direction(info: &IntersectionInfo<'_>, light_dir: Vec3, light_intensity: Color) -> Self {
        let material = info.material;
        let normal = info.normal;
        let eye = info.eye;
        let half = (light_dir + eye).normalize_or_zero();

        let metallic = material.metallic;
        let dielectric_f0 = if material.refractive_index > 1.0 {
            ((material.refractive_index - 1.0) / (material.refractive_index + 1.0)).powi(2)
        } else {
            0.04
        };

        Self {
            light_intensity,
            light_dir,
            normal,
            eye,
            half,
            n_dot_l: normal.dot(light_dir).clamp(0.0, 1.0),
            n_dot_v: normal.dot(eye).clamp(0.0, 1.0),
            n_dot_h: normal.dot(half).clamp(0.0, 1.0),
            v_dot_h: eye.dot(half).clamp(0.0, 1.0),
            alpha: material.alpha().max(MIN_ALPHA),
            diffuse_color: info.surface_color * material.diffuse * (1.0 - metallic),
            specular_color: info.surface_color.lerp(Color::ONE, 1.0 - metallic) * material.specular,
            f0: dielectric_f0 + (1.0 - dielectric_f0) * metallic,
        }
    }
}

/// Statistical distribution of microfacet normals (D).
pub trait NormalDistribution: Send + Sync + fmt::Debug {
    /// Density of microfacets aligned with the half vector.
    fn factor(&self, si: &ShadingInfo) -> f32;

    /// Draw a microfacet normal in the local frame (normal = +Z) with
    /// density proportional to `D(m) * cos(theta_m)`.
    fn sample_normal(&self, alpha: f32, e0: f32, e1: f32) -> Vec3;
}

/// Self-shadowing of microfacets (G).
pub trait GeometricShadow: Send + Sync + fmt::Debug {
    fn factor(&self, si: &ShadingInfo) -> f32;
}

/// Fraction of light reflected at a microfacet (F).
pub trait FresnelTerm: Send + Sync + fmt::Debug {
    fn factor(&self, si: &ShadingInfo) -> f32;
}

/// Convert `cos(theta)` and an azimuth draw into a local direction.
fn spherical_direction(cos_theta: f32, e1: f32) -> Vec3 {
    let cos_theta = cos_theta.clamp(0.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * e1;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Trowbridge-Reitz (GGX).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ggx;

impl NormalDistribution for Ggx {
    fn factor(&self, si: &ShadingInfo) -> f32 {
        let a2 = si.alpha * si.alpha;
        let denom = si.n_dot_h * si.n_dot_h * (a2 - 1.0) + 1.0;
        a2 / (PI * denom * denom)
    }

    fn sample_normal(&self, alpha: f32, e0: f32, e1: f32) -> Vec3 {
        let alpha = alpha.max(MIN_ALPHA);
        let tan2 = alpha * alpha * e0 / (1.0 - e0).max(f32::EPSILON);
        spherical_direction(1.0 / (1.0 + tan2).sqrt(), e1)
    }
}

/// Beckmann-Spizzichino.
#[derive(Debug, Clone, Copy, Default)]
pub struct Beckmann;

impl NormalDistribution for Beckmann {
    fn factor(&self, si: &ShadingInfo) -> f32 {
        let cos2 = si.n_dot_h * si.n_dot_h;
        if cos2 <= 0.0 {
            return 0.0;
        }
        let a2 = si.alpha * si.alpha;
        let tan2 = (1.0 - cos2) / cos2;
        (-tan2 / a2).exp() / (PI * a2 * cos2 * cos2)
    }

    fn sample_normal(&self, alpha: f32, e0: f32, e1: f32) -> Vec3 {
        let alpha = alpha.max(MIN_ALPHA);
        let tan2 = -alpha * alpha * (1.0 - e0).max(f32::EPSILON).ln();
        spherical_direction(1.0 / (1.0 + tan2).sqrt(), e1)
    }
}

/// Normalized Blinn-Phong, with the exponent derived from alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlinnPhong;

impl BlinnPhong {
    fn exponent(alpha: f32) -> f32 {
        let alpha = alpha.max(MIN_ALPHA);
        (2.0 / (alpha * alpha) - 2.0).max(0.0)
    }
}

impl NormalDistribution for BlinnPhong {
    fn factor(&self, si: &ShadingInfo) -> f32 {
        let exponent = Self::exponent(si.alpha);
        (exponent + 2.0) / (2.0 * PI) * si.n_dot_h.powf(exponent)
    }

    fn sample_normal(&self, alpha: f32, e0: f32, e1: f32) -> Vec3 {
        let exponent = Self::exponent(alpha);
        spherical_direction(e0.powf(1.0 / (exponent + 2.0)), e1)
    }
}

/// Separable Smith shadowing with the GGX lambda.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmithGgx;

impl GeometricShadow for SmithGgx {
    fn factor(&self, si: &ShadingInfo) -> f32 {
        let a2 = si.alpha * si.alpha;
        let g1 = |cos: f32| {
            if cos <= 0.0 {
                return 0.0;
            }
            2.0 * cos / (cos + (a2 + (1.0 - a2) * cos * cos).sqrt())
        };
        g1(si.n_dot_l) * g1(si.n_dot_v)
    }
}

/// Cook-Torrance V-cavity shadowing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookTorrance;

impl GeometricShadow for CookTorrance {
    fn factor(&self, si: &ShadingInfo) -> f32 {
        if si.v_dot_h <= 0.0 {
            return 0.0;
        }
        let k = 2.0 * si.n_dot_h / si.v_dot_h;
        (k * si.n_dot_v).min(k * si.n_dot_l).min(1.0)
    }
}

/// `N.L * N.V`, cancelling the BRDF denominator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Implicit;

impl GeometricShadow for Implicit {
    fn factor(&self, si: &ShadingInfo) -> f32 {
        si.n_dot_l * si.n_dot_v
    }
}

/// Schlick's approximation around `f0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Schlick;

impl FresnelTerm for Schlick {
    fn factor(&self, si: &ShadingInfo) -> f32 {
        si.f0 + (1.0 - si.f0) * (1.0 - si.v_dot_h).clamp(0.0, 1.0).powi(5)
    }
}

/// Constant 1 (no Fresnel falloff).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFresnel;

impl FresnelTerm for NoFresnel {
    fn factor(&self, _si: &ShadingInfo) -> f32 {
        1.0
    }
}

/// A complete reflectance model.
#[derive(Debug)]
pub struct MicrofacetModel {
    ndf: Box<dyn NormalDistribution>,
    shadow: Box<dyn GeometricShadow>,
    fresnel: Box<dyn FresnelTerm>,
}

impl Default for MicrofacetModel {
    /// GGX with Smith shadowing and Schlick Fresnel.
    fn default() -> Self {
        Self::new(Ggx, SmithGgx, Schlick)
    }
}

impl MicrofacetModel {
    pub fn new(
        ndf: impl NormalDistribution + 'static,
        shadow: impl GeometricShadow + 'static,
        fresnel: impl FresnelTerm + 'static,
    ) -> Self {
        Self {
            ndf: Box::new(ndf),
            shadow: Box::new(shadow),
            fresnel: Box::new(fresnel),
        }
    }

    /// Cook-Torrance specular intensity (without the specular color).
    pub fn specular(&self, si: &ShadingInfo) -> f32 {
        let denominator = 4.0 * si.n_dot_l * si.n_dot_v;
        if denominator <= MIN_SPECULAR_DENOMINATOR {
            return 0.0;
        }
        self.ndf.factor(si) * self.fresnel.factor(si) * self.shadow.factor(si) / denominator
    }

    /// Light reflected toward the eye from one light sample.
    pub fn direct(&self, si: &ShadingInfo) -> Color {
        let k_s = si.specular_color * self.specular(si);
        si.light_intensity * (si.diffuse_color + k_s) * si.n_dot_l
    }

    /// Importance-sample an incoming direction.
    ///
    /// Returns the direction in `frame`'s local space together with the
    /// reflectance already divided by the sampling density. The specular
    /// lobe is picked with probability proportional to its weight, using
    /// `e0` for both the lobe choice and the draw. Directions with
    /// `z <= 0` lie below the surface; callers should draw again.
    pub fn sample(&self, info: &IntersectionInfo<'_>, frame: &LocalFrame, e0: f32, e1: f32) -> (Vec3, Color) {
        let base = ShadingInfo::for_direction(info, info.normal, Color::ONE);
        let spec_weight = base.specular_color.max_element();
        let diffuse_weight = base.diffuse_color.max_element();
        let total = spec_weight + diffuse_weight;
        let p_spec = if total > 0.0 { spec_weight / total } else { 0.5 };

        let wo = frame.to_local(info.eye);
        if e0 < p_spec {
            let e0 = e0 / p_spec;
            let m = self.ndf.sample_normal(base.alpha, e0, e1);
            let wo_dot_m = wo.dot(m);
            let wi = 2.0 * wo_dot_m * m - wo;
            if wi.z <= 0.0 || wo.z <= 0.0 || wo_dot_m <= 0.0 {
                return (wi, Color::ZERO);
            }
            let si = ShadingInfo::for_direction(info, frame.to_world(wi), Color::ONE);
            let weight = self.fresnel.factor(&si) * self.shadow.factor(&si) * wo_dot_m / (wo.z * m.z);
            (wi, base.specular_color * weight / p_spec)
        } else {
            let e0 = (e0 - p_spec) / (1.0 - p_spec);
            // Cosine-weighted hemisphere
            let wi = spherical_direction((1.0 - e0).sqrt(), e1);
            (wi, base.diffuse_color / (1.0 - p_spec))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Intersection, Material, Primitive, Shapes};
    use lumen_math::{approx_eq, Ray};

    /// Shapes holding a single plane with the given material.
    fn plane(material: Material) -> (Shapes, Intersection) {
        let mut shapes = Shapes::new();
        let id = shapes.add_shape(Primitive::Plane);
        shapes.set_material(id, material).unwrap();
        (shapes, Intersection::new(1.0, id))
    }

    fn head_on() -> Ray {
        Ray::new(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y)
    }

    fn angles(n_dot_h: f32, alpha: f32) -> ShadingInfo {
        ShadingInfo {
            light_intensity: Color::ONE,
            light_dir: Vec3::Y,
            normal: Vec3::Y,
            eye: Vec3::Y,
            half: Vec3::Y,
            n_dot_l: 1.0,
            n_dot_v: 1.0,
            n_dot_h,
            v_dot_h: 1.0,
            alpha,
            diffuse_color: Color::ONE,
            specular_color: Color::ONE,
            f0: 0.04,
        }
    }

    #[test]
    fn test_ggx_peak() {
        let si = angles(1.0, 0.5);
        assert!(approx_eq(Ggx.factor(&si), 1.0 / (PI * 0.25), 1e-4));
    }

    #[test]
    fn test_distributions_fall_off_from_normal() {
        let ndfs: [&dyn NormalDistribution; 3] = [&Ggx, &Beckmann, &BlinnPhong];
        for ndf in ndfs {
            let peak = ndf.factor(&angles(1.0, 0.3));
            let off = ndf.factor(&angles(0.8, 0.3));
            assert!(peak > off, "{ndf:?} {peak} {off}");
        }
    }

    #[test]
    fn test_sampled_normals_in_upper_hemisphere() {
        let ndfs: [&dyn NormalDistribution; 3] = [&Ggx, &Beckmann, &BlinnPhong];
        for ndf in ndfs {
            for i in 0..16 {
                let e0 = (i as f32 + 0.5) / 16.0;
                let m = ndf.sample_normal(0.4, e0, 0.3);
                assert!(approx_eq(m.length(), 1.0, 1e-4));
                assert!(m.z >= 0.0);
            }
        }
    }

    #[test]
    fn test_shadowing_terms() {
        let si = angles(1.0, 0.5);
        assert!(approx_eq(SmithGgx.factor(&si), 1.0, 1e-5));
        assert!(approx_eq(CookTorrance.factor(&si), 1.0, 1e-5));
        assert!(approx_eq(Implicit.factor(&si), 1.0, 1e-5));

        let grazing = ShadingInfo { n_dot_l: 0.0, ..si };
        assert_eq!(SmithGgx.factor(&grazing), 0.0);
        assert_eq!(Implicit.factor(&grazing), 0.0);
    }

    #[test]
    fn test_fresnel_terms() {
        let si = angles(1.0, 0.5);
        assert!(approx_eq(Schlick.factor(&si), 0.04, 1e-6));
        let grazing = ShadingInfo { v_dot_h: 0.0, ..si };
        assert!(approx_eq(Schlick.factor(&grazing), 1.0, 1e-6));
        assert_eq!(NoFresnel.factor(&grazing), 1.0);
    }

    #[test]
    fn test_shading_info_colors() {
        let material = Material {
            specular: 0.5,
            ..Material::new(Color::new(0.2, 0.4, 0.6))
        }
        .with_metallic(0.0);
        let (shapes, hit) = plane(material);
        let info = IntersectionInfo::new(&shapes, &[hit], 0, &head_on());
        let si = ShadingInfo::new(&info, Vec3::new(0.0, 5.0, 0.0), Color::ONE);

        assert!((si.diffuse_color - Color::new(0.18, 0.36, 0.54)).abs().max_element() < 1e-5);
        assert!((si.specular_color - Color::splat(0.5)).abs().max_element() < 1e-5);
        assert!(approx_eq(si.f0, 0.04, 1e-6));
        assert!(approx_eq(si.n_dot_l, 1.0, 1e-5));
    }

    #[test]
    fn test_direct_diffuse_only() {
        let material = Material {
            specular: 0.0,
            ..Material::new(Color::ONE)
        };
        let (shapes, hit) = plane(material);
        let info = IntersectionInfo::new(&shapes, &[hit], 0, &head_on());
        let model = MicrofacetModel::default();

        let above = ShadingInfo::new(&info, Vec3::new(0.0, 10.0, 0.0), Color::splat(2.0));
        let color = model.direct(&above);
        assert!((color - Color::splat(1.8)).abs().max_element() < 1e-4);

        let below = ShadingInfo::new(&info, Vec3::new(0.0, -10.0, 0.0), Color::ONE);
        assert_eq!(model.direct(&below), Color::ZERO);
    }

    #[test]
    fn test_direct_adds_specular_highlight() {
        let (shapes, hit) = plane(Material::new(Color::ONE).with_roughness(0.3));
        let info = IntersectionInfo::new(&shapes, &[hit], 0, &head_on());
        let model = MicrofacetModel::default();

        let si = ShadingInfo::new(&info, Vec3::new(0.0, 10.0, 0.0), Color::ONE);
        let color = model.direct(&si);
        assert!(color.x > si.diffuse_color.x);
    }

    #[test]
    fn test_sample_diffuse_lobe() {
        let material = Material {
            specular: 0.0,
            ..Material::new(Color::splat(0.5))
        };
        let (shapes, hit) = plane(material);
        let info = IntersectionInfo::new(&shapes, &[hit], 0, &head_on());
        let frame = LocalFrame::new(info.normal);
        let model = MicrofacetModel::default();

        let (wi, weight) = model.sample(&info, &frame, 0.3, 0.7);
        assert!(wi.z > 0.0);
        assert!(approx_eq(wi.length(), 1.0, 1e-4));
        assert!((weight - Color::splat(0.45)).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_sample_mirror_reflects() {
        let material = Material {
            specular: 1.0,
            ..Material::new(Color::ONE)
        }
        .with_roughness(0.0)
        .with_metallic(1.0);
        let (shapes, hit) = plane(material);
        let info = IntersectionInfo::new(&shapes, &[hit], 0, &head_on());
        let frame = LocalFrame::new(info.normal);
        let model = MicrofacetModel::default();

        let (wi, weight) = model.sample(&info, &frame, 0.5, 0.25);
        let world = frame.to_world(wi);
        assert!((world - Vec3::Y).length() < 1e-3);
        assert!((weight - Color::ONE).abs().max_element() < 1e-2);
    }

    #[test]
    fn test_rough_specular_weight_matches_albedo() {
        let material = Material {
            specular: 1.0,
            ..Material::new(Color::ONE)
        }
        .with_roughness(0.7)
        .with_metallic(1.0);
        let (shapes, hit) = plane(material);
        // Viewed 30 degrees off the normal
        let eye = Vec3::new(0.5, 3f32.sqrt() / 2.0, 0.0);
        let ray = Ray::new(eye, -eye);
        let info = IntersectionInfo::new(&shapes, &[hit], 0, &ray);
        let frame = LocalFrame::new(info.normal);
        let model = MicrofacetModel::default();

        // Mean sampled weight over a stratified grid of draws
        let n = 128;
        let mut sampled = 0.0f64;
        for i in 0..n {
            for j in 0..n {
                let e0 = (i as f32 + 0.5) / n as f32;
                let e1 = (j as f32 + 0.5) / n as f32;
                sampled += model.sample(&info, &frame, e0, e1).1.x as f64;
            }
        }
        sampled /= (n * n) as f64;

        // Hemisphere quadrature of the reflectance times N.L
        let (rows, cols) = (256, 512);
        let d_theta = std::f64::consts::FRAC_PI_2 / rows as f64;
        let d_phi = 2.0 * std::f64::consts::PI / cols as f64;
        let mut integrated = 0.0f64;
        for i in 0..rows {
            let theta = (i as f64 + 0.5) * d_theta;
            for j in 0..cols {
                let phi = (j as f64 + 0.5) * d_phi;
                let local = Vec3::new(
                    (theta.sin() * phi.cos()) as f32,
                    (theta.sin() * phi.sin()) as f32,
                    theta.cos() as f32,
                );
                let si = ShadingInfo::for_direction(&info, frame.to_world(local), Color::ONE);
                let reflected = (si.specular_color.x * model.specular(&si) * si.n_dot_l) as f64;
                integrated += reflected * theta.sin() * d_theta * d_phi;
            }
        }

        let relative = ((sampled - integrated) / integrated).abs();
        assert!(integrated > 0.5, "albedo {integrated}");
        assert!(relative < 0.02, "sampled {sampled}, integrated {integrated}");
    }
}

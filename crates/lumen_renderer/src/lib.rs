//! lumen renderer - CPU path tracing
//!
//! A Monte Carlo path tracer over [`lumen_core`] scenes: hit-info
//! derivation, a pluggable microfacet BRDF, next-event estimation with
//! Russian roulette, and a bucketed parallel render driver.

mod bucket;
mod camera;
mod hit_info;
mod integrator;
mod lighting;
mod microfacet;
mod renderer;
mod sampler;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::{Camera, CameraSample};
pub use hit_info::{IntersectionInfo, SURFACE_BIAS};
pub use integrator::{direct_probability, PathIntegrator};
pub use lighting::{intensity_at, is_shadowed, stratified_intensity_at};
pub use microfacet::{
    Beckmann, BlinnPhong, CookTorrance, FresnelTerm, GeometricShadow, Ggx, Implicit, MicrofacetModel,
    NoFresnel, NormalDistribution, Schlick, ShadingInfo, SmithGgx,
};
pub use renderer::{
    clamp_01, color_to_rgba, linear_to_gamma, render, render_pixel, render_with_sampler, ImageBuffer,
    RenderConfig,
};
pub use sampler::{RandomSampler, Sampler, SequenceSampler, StratifiedSampler};

/// Re-export scene and math types used in the public API.
pub use lumen_core::{Color, World};
pub use lumen_math::{Ray, Vec3};

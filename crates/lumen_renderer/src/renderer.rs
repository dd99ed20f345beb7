//! Render driver: configuration, per-pixel sampling and the parallel
//! bucket loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use lumen_core::{Color, World};
use rayon::prelude::*;
use serde::Deserialize;

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::Camera;
use crate::integrator::PathIntegrator;
use crate::sampler::{RandomSampler, Sampler};

/// Render configuration.
///
/// Deserializes from partial JSON; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Bounces before Russian roulette may end a path
    pub min_depth: u32,
    /// Hard cap on bounces per path
    pub max_depth: u32,
    /// Seed for the per-sample random streams
    pub seed: u64,
    pub bucket_size: u32,
    pub russian_roulette: bool,
    /// Worker threads; 0 uses rayon's global pool
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 16,
            min_depth: 3,
            max_depth: 16,
            seed: 0,
            bucket_size: DEFAULT_BUCKET_SIZE,
            russian_roulette: true,
            threads: 0,
        }
    }
}

impl RenderConfig {
    /// Integrator with this config's depth and roulette settings.
    pub fn integrator(&self) -> PathIntegrator {
        PathIntegrator::new(self.min_depth, self.max_depth).with_russian_roulette(self.russian_roulette)
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))) as u8;
    [r, g, b, 255]
}

/// Average of `samples_per_pixel` paths through pixel `(x, y)`.
///
/// Sample `s` of pixel `p` draws from `sampler.create(p * spp + s)`, so
/// the result does not depend on bucket order or thread count.
pub fn render_pixel<S: Sampler>(
    camera: &Camera,
    world: &World,
    integrator: &PathIntegrator,
    x: u32,
    y: u32,
    config: &RenderConfig,
    sampler: &S,
) -> Color {
    let spp = config.samples_per_pixel.max(1);
    let pixel_index = y as u64 * camera.image_width as u64 + x as u64;
    let mut pixel_color = Color::ZERO;

    for s in 0..spp {
        let mut path_sampler = sampler.create(pixel_index * spp as u64 + s as u64);
        let sample = camera.sample(x, y, &mut path_sampler);
        pixel_color += integrator.color_at(world, &sample.ray, &mut path_sampler) * sample.weight;
    }

    pixel_color / spp as f32
}

/// Simple image buffer for storing render output.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let x = bucket.x + i as u32 % bucket.width;
            let y = bucket.y + i as u32 / bucket.width;
            self.set(x, y, *color);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

/// Render the scene with a [`RandomSampler`] seeded from the config.
pub fn render(camera: &Camera, world: &World, config: &RenderConfig) -> ImageBuffer {
    render_with_sampler(camera, world, config, &RandomSampler::new(config.seed), None)
}

/// Render the scene bucket by bucket on rayon.
///
/// `camera` must be initialized. When `cancel` is set, remaining buckets
/// are skipped and in-flight paths stop at their next bounce; skipped
/// pixels stay black.
pub fn render_with_sampler<S: Sampler + Sync>(
    camera: &Camera,
    world: &World,
    config: &RenderConfig,
    sampler: &S,
    cancel: Option<Arc<AtomicBool>>,
) -> ImageBuffer {
    let start = Instant::now();
    let mut image = ImageBuffer::new(camera.image_width, camera.image_height);
    let buckets = generate_buckets(camera.image_width, camera.image_height, config.bucket_size);
    let total = buckets.len();
    log::info!(
        "rendering {}x{} at {} spp ({} buckets)",
        camera.image_width,
        camera.image_height,
        config.samples_per_pixel,
        total
    );

    let mut integrator = config.integrator();
    if let Some(flag) = &cancel {
        integrator = integrator.with_cancel_flag(Arc::clone(flag));
    }
    let is_cancelled = || cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed));

    let run = || -> Vec<BucketResult> {
        buckets
            .into_par_iter()
            .filter_map(|bucket| {
                if is_cancelled() {
                    return None;
                }
                let pixels = render_bucket(&bucket, camera, world, &integrator, config, sampler);
                Some(BucketResult::new(bucket, pixels))
            })
            .collect()
    };

    let results = if config.threads > 0 {
        match rayon::ThreadPoolBuilder::new().num_threads(config.threads).build() {
            Ok(pool) => pool.install(run),
            Err(err) => {
                log::warn!("could not build a {}-thread pool ({err}); using the global pool", config.threads);
                run()
            }
        }
    } else {
        run()
    };

    for result in &results {
        image.write_bucket(result);
    }

    if is_cancelled() {
        log::warn!("render cancelled after {} of {} buckets", results.len(), total);
    } else {
        log::info!("render finished in {:.2?}", start.elapsed());
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Material, PointLight, Primitive};
    use lumen_math::Vec3;

    fn lit_sphere() -> World {
        let mut world = World::new();
        world.add_light(PointLight::new(Vec3::new(-10.0, 10.0, -10.0), Color::ONE));
        let id = world.shapes_mut().add_shape(Primitive::Sphere);
        world
            .shapes_mut()
            .set_material(id, Material::new(Color::new(0.5, 0.5, 0.5)))
            .unwrap();
        world.add_object(id).unwrap();
        world
    }

    fn small_camera() -> Camera {
        let mut camera = Camera::new()
            .with_resolution(12, 10)
            .with_position(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y)
            .with_fov(45.0);
        camera.initialize();
        camera
    }

    fn small_config() -> RenderConfig {
        RenderConfig {
            samples_per_pixel: 2,
            max_depth: 4,
            bucket_size: 4,
            seed: 9,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::new(0.0, 0.25, 4.0)), [0, 127, 255, 255]);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: RenderConfig = serde_json::from_str(r#"{ "samples_per_pixel": 64, "threads": 2 }"#).unwrap();
        assert_eq!(config.samples_per_pixel, 64);
        assert_eq!(config.threads, 2);
        assert_eq!(config.max_depth, RenderConfig::default().max_depth);
        assert!(config.russian_roulette);
    }

    #[test]
    fn test_render_pixel() {
        let world = lit_sphere();
        let camera = small_camera();
        let config = small_config();
        let integrator = config.integrator();
        let sampler = RandomSampler::new(42);

        let color = render_pixel(&camera, &world, &integrator, 6, 5, &config, &sampler);
        assert!(color.length() > 0.0);

        let corner = render_pixel(&camera, &world, &integrator, 0, 0, &config, &sampler);
        assert_eq!(corner, Color::ZERO);
    }

    #[test]
    fn test_render_is_independent_of_threads() {
        let world = lit_sphere();
        let camera = small_camera();
        let single = RenderConfig {
            threads: 1,
            ..small_config()
        };
        let many = RenderConfig {
            threads: 3,
            bucket_size: 5,
            ..small_config()
        };

        let a = render(&camera, &world, &single);
        let b = render(&camera, &world, &many);
        assert_eq!(a.pixels, b.pixels);
        assert!(a.pixels.iter().any(|c| c.length() > 0.0));
    }

    #[test]
    fn test_cancelled_render_is_black() {
        let world = lit_sphere();
        let camera = small_camera();
        let flag = Arc::new(AtomicBool::new(true));
        let image = render_with_sampler(&camera, &world, &small_config(), &RandomSampler::new(1), Some(flag));
        assert!(image.pixels.iter().all(|&c| c == Color::ZERO));
    }

    #[test]
    fn test_write_bucket() {
        let mut image = ImageBuffer::new(4, 4);
        let bucket = crate::bucket::Bucket::new(2, 1, 2, 2, 0);
        let pixels = vec![Color::X, Color::Y, Color::Z, Color::ONE];
        image.write_bucket(&BucketResult::new(bucket, pixels));
        assert_eq!(image.get(2, 1), Color::X);
        assert_eq!(image.get(3, 1), Color::Y);
        assert_eq!(image.get(2, 2), Color::Z);
        assert_eq!(image.get(3, 2), Color::ONE);
        assert_eq!(image.to_rgba().len(), 64);
    }
}

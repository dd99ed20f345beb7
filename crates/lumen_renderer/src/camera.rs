//! Pinhole camera for primary ray generation.

use lumen_math::{Ray, Vec3};

use crate::sampler::Sampler;

/// A primary ray and its importance weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSample {
    pub ray: Ray,
    pub weight: f32,
}

/// Pinhole camera looking from `look_from` toward `look_at`.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,

    // Cached computed values (set by initialize())
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            image_width: 400,
            image_height: 225,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            center: Vec3::ZERO,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        self.center = self.look_from;

        // Viewport one unit in front of the eye
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height as f32);

        self.w = (self.look_from - self.look_at).normalize_or_zero();
        self.u = self.vup.cross(self.w).normalize_or_zero();
        self.v = self.w.cross(self.u);

        let viewport_u = viewport_width * self.u;
        let viewport_v = -viewport_height * self.v;

        self.pixel_delta_u = viewport_u / self.image_width as f32;
        self.pixel_delta_v = viewport_v / self.image_height as f32;

        let viewport_upper_left = self.center - self.w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
    }

    /// Primary ray through pixel `(x, y)`, offset inside the pixel by the
    /// sampler's next UV pair (0.5 hits the pixel center).
    pub fn sample(&self, x: u32, y: u32, sampler: &mut dyn Sampler) -> CameraSample {
        let (du, dv) = sampler.next_uv();
        let pixel_sample = self.pixel00_loc
            + (x as f32 + du - 0.5) * self.pixel_delta_u
            + (y as f32 + dv - 0.5) * self.pixel_delta_v;

        CameraSample {
            ray: Ray::new(self.center, (pixel_sample - self.center).normalize_or_zero()),
            weight: 1.0,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SequenceSampler;

    fn assert_vec_near(actual: Vec3, expected: Vec3) {
        assert!((actual - expected).length() < 1e-4, "expected {expected}, got {actual}");
    }

    fn canvas_camera() -> Camera {
        let mut camera = Camera::new()
            .with_resolution(201, 101)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_fov(90.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_camera_initialize() {
        let camera = canvas_camera();
        assert_eq!(camera.center, Vec3::ZERO);
        assert!((camera.w - Vec3::Z).length() < 0.001);
    }

    #[test]
    fn test_ray_through_center_of_canvas() {
        let camera = canvas_camera();
        let mut sampler = SequenceSampler::constant(0.5, 0.5, 0.5);
        let sample = camera.sample(100, 50, &mut sampler);
        assert_eq!(sample.ray.origin, Vec3::ZERO);
        assert_vec_near(sample.ray.direction, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(sample.weight, 1.0);
    }

    #[test]
    fn test_ray_through_corner_of_canvas() {
        let camera = canvas_camera();
        let mut sampler = SequenceSampler::constant(0.5, 0.5, 0.5);
        let sample = camera.sample(0, 0, &mut sampler);
        assert_vec_near(sample.ray.direction, Vec3::new(-0.81513, 0.40757, -0.41164));
    }

    #[test]
    fn test_ray_after_moving_camera() {
        let mut camera = Camera::new()
            .with_resolution(201, 101)
            .with_position(Vec3::new(0.0, 2.0, -5.0), Vec3::new(1.0, 2.0, -6.0), Vec3::Y)
            .with_fov(90.0);
        camera.initialize();

        let mut sampler = SequenceSampler::constant(0.5, 0.5, 0.5);
        let sample = camera.sample(100, 50, &mut sampler);
        assert_eq!(sample.ray.origin, Vec3::new(0.0, 2.0, -5.0));
        let half = 2f32.sqrt() / 2.0;
        assert_vec_near(sample.ray.direction, Vec3::new(half, 0.0, -half));
    }

    #[test]
    fn test_pixel_offsets_follow_sampler() {
        let camera = canvas_camera();
        let mut left = SequenceSampler::constant(0.0, 0.5, 0.5);
        let mut right = SequenceSampler::constant(0.99, 0.5, 0.5);
        let a = camera.sample(100, 50, &mut left).ray.direction;
        let b = camera.sample(100, 50, &mut right).ray.direction;
        assert!(a.x < 0.0 && b.x > 0.0);
    }
}

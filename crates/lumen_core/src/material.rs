//! Surface material parameters.

use lumen_math::Vec3;

use crate::pattern::Texture;

/// Color type alias (linear RGB, typically 0-1)
pub type Color = Vec3;

/// Surface description owned by a single shape.
///
/// The shading terms (`ambient`, `diffuse`, `specular`) scale the
/// pattern color; `roughness` drives the microfacet lobe and
/// `transparency`/`refractive_index` the dielectric branch.
#[derive(Clone, Debug)]
pub struct Material {
    /// Surface color source
    pub texture: Texture,

    /// Self-illumination; 1.0 or more turns the surface into an emitter
    pub ambient: f32,

    /// Diffuse reflectance scale
    pub diffuse: f32,

    /// Specular reflectance scale
    pub specular: f32,

    /// Phong exponent as written in scene files. Shading does not read it;
    /// the Blinn-Phong distribution derives its exponent from `roughness`.
    pub shininess: f32,

    /// Mirror reflectance (0 = none)
    pub reflective: f32,

    /// Fraction of light taking the dielectric branch (0 = opaque)
    pub transparency: f32,

    /// Index of refraction (1.0 = vacuum, 1.5 = glass)
    pub refractive_index: f32,

    /// Microfacet roughness: 0 = perfect mirror, 1 = very rough
    pub roughness: f32,

    /// Metallic: 0 = dielectric, 1 = metal (tints the specular lobe)
    pub metallic: f32,

    /// Whether the surface blocks shadow rays
    pub casts_shadow: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            texture: Texture::default(),
            ambient: 0.1,
            diffuse: 0.9,
            specular: 0.9,
            shininess: 200.0,
            reflective: 0.0,
            transparency: 0.0,
            refractive_index: 1.0,
            roughness: 0.5,
            metallic: 0.0,
            casts_shadow: true,
        }
    }
}

impl Material {
    /// Create a material with a solid color and default parameters.
    pub fn new(color: Color) -> Self {
        Self {
            texture: Texture::solid(color),
            ..Default::default()
        }
    }

    /// Clear glass: fully transparent with index 1.5.
    pub fn glass() -> Self {
        Self {
            transparency: 1.0,
            refractive_index: 1.5,
            ..Default::default()
        }
    }

    /// A surface that emits `color` and does not scatter.
    pub fn emissive(color: Color) -> Self {
        Self {
            texture: Texture::solid(color),
            ambient: 1.0,
            diffuse: 0.0,
            specular: 0.0,
            ..Default::default()
        }
    }

    /// Builder method to set the texture.
    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = texture;
        self
    }

    /// Builder method to set roughness.
    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set metallic.
    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    /// Microfacet alpha (roughness squared).
    #[inline]
    pub fn alpha(&self) -> f32 {
        self.roughness * self.roughness
    }

    /// Check if this material is treated as a light source.
    pub fn is_emissive(&self) -> bool {
        self.ambient >= 1.0
    }
}

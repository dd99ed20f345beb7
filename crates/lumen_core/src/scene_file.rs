//! JSON scene descriptions.
//!
//! A scene file lists root shapes (possibly nested groups and CSG nodes)
//! and lights:
//!
//! ```json
//! {
//!   "shapes": [
//!     { "type": "plane", "material": { "pattern": { "type": "checker", "a": [1, 1, 1], "b": [0, 0, 0] } } },
//!     { "type": "sphere",
//!       "transform": [ { "op": "scale", "x": 0.5, "y": 0.5, "z": 0.5 }, { "op": "translate", "x": 0, "y": 1, "z": 0 } ],
//!       "material": { "color": [1, 0.2, 0.2], "roughness": 0.2 } }
//!   ],
//!   "lights": [ { "type": "point", "position": [-10, 10, -10], "intensity": [1, 1, 1] } ]
//! }
//! ```
//!
//! Transform steps are applied in the order listed.

use std::path::Path;

use lumen_math::{shearing, Mat4, Vec3};
use serde::Deserialize;

use crate::error::SceneResult;
use crate::light::{AreaLight, Light, PointLight};
use crate::material::{Color, Material};
use crate::pattern::{CheckerPattern, GradientPattern, RingPattern, SolidPattern, StripePattern, Texture};
use crate::primitive::Primitive;
use crate::shape::{CsgOp, ShapeId};
use crate::world::World;

/// Top level of a scene file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub shapes: Vec<ShapeDescription>,
    pub lights: Vec<LightDescription>,
    /// Groups with more children than this are split into sub-groups
    pub divide_threshold: Option<usize>,
}

/// One elementary transform.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformStep {
    Translate { x: f32, y: f32, z: f32 },
    Scale { x: f32, y: f32, z: f32 },
    RotateX { radians: f32 },
    RotateY { radians: f32 },
    RotateZ { radians: f32 },
    Shear { xy: f32, xz: f32, yx: f32, yz: f32, zx: f32, zy: f32 },
}

impl TransformStep {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            TransformStep::Translate { x, y, z } => Mat4::from_translation(Vec3::new(x, y, z)),
            TransformStep::Scale { x, y, z } => Mat4::from_scale(Vec3::new(x, y, z)),
            TransformStep::RotateX { radians } => Mat4::from_rotation_x(radians),
            TransformStep::RotateY { radians } => Mat4::from_rotation_y(radians),
            TransformStep::RotateZ { radians } => Mat4::from_rotation_z(radians),
            TransformStep::Shear { xy, xz, yx, yz, zx, zy } => shearing(xy, xz, yx, yz, zx, zy),
        }
    }
}

/// Compose steps so the first listed is applied first.
pub fn compose(steps: &[TransformStep]) -> Mat4 {
    steps.iter().fold(Mat4::IDENTITY, |m, step| step.matrix() * m)
}

/// Placement and look shared by every shape kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Surface {
    pub transform: Vec<TransformStep>,
    pub material: Option<MaterialDescription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDescription {
    Sphere(Surface),
    Plane(Surface),
    Cube(Surface),
    Cylinder {
        #[serde(default)]
        minimum: Option<f32>,
        #[serde(default)]
        maximum: Option<f32>,
        #[serde(default)]
        closed: bool,
        #[serde(flatten)]
        surface: Surface,
    },
    Group {
        #[serde(default)]
        children: Vec<ShapeDescription>,
        #[serde(flatten)]
        surface: Surface,
    },
    Csg {
        operation: CsgOp,
        left: Box<ShapeDescription>,
        right: Box<ShapeDescription>,
        #[serde(flatten)]
        surface: Surface,
    },
}

impl ShapeDescription {
    fn surface(&self) -> &Surface {
        match self {
            ShapeDescription::Sphere(surface)
            | ShapeDescription::Plane(surface)
            | ShapeDescription::Cube(surface) => surface,
            ShapeDescription::Cylinder { surface, .. }
            | ShapeDescription::Group { surface, .. }
            | ShapeDescription::Csg { surface, .. } => surface,
        }
    }
}

/// Material overrides; anything left out keeps the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MaterialDescription {
    pub color: Option<[f32; 3]>,
    pub pattern: Option<PatternDescription>,
    pub ambient: Option<f32>,
    pub diffuse: Option<f32>,
    pub specular: Option<f32>,
    pub shininess: Option<f32>,
    pub reflective: Option<f32>,
    pub transparency: Option<f32>,
    pub refractive_index: Option<f32>,
    pub roughness: Option<f32>,
    pub metallic: Option<f32>,
    pub casts_shadow: Option<bool>,
}

impl MaterialDescription {
    pub fn to_material(&self) -> SceneResult<Material> {
        let mut material = Material::default();
        if let Some(color) = self.color {
            material.texture = Texture::solid(Color::from_array(color));
        }
        if let Some(pattern) = &self.pattern {
            material.texture = pattern.to_texture()?;
        }
        let scalars = [
            (self.ambient, &mut material.ambient),
            (self.diffuse, &mut material.diffuse),
            (self.specular, &mut material.specular),
            (self.shininess, &mut material.shininess),
            (self.reflective, &mut material.reflective),
            (self.transparency, &mut material.transparency),
            (self.refractive_index, &mut material.refractive_index),
        ];
        for (value, field) in scalars {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(roughness) = self.roughness {
            material = material.with_roughness(roughness);
        }
        if let Some(metallic) = self.metallic {
            material = material.with_metallic(metallic);
        }
        if let Some(casts_shadow) = self.casts_shadow {
            material.casts_shadow = casts_shadow;
        }
        Ok(material)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternDescription {
    Solid {
        color: [f32; 3],
    },
    Stripe {
        a: [f32; 3],
        b: [f32; 3],
        #[serde(default)]
        transform: Vec<TransformStep>,
    },
    Gradient {
        a: [f32; 3],
        b: [f32; 3],
        #[serde(default)]
        transform: Vec<TransformStep>,
    },
    Ring {
        a: [f32; 3],
        b: [f32; 3],
        #[serde(default)]
        transform: Vec<TransformStep>,
    },
    Checker {
        a: [f32; 3],
        b: [f32; 3],
        #[serde(default)]
        transform: Vec<TransformStep>,
    },
}

impl PatternDescription {
    pub fn to_texture(&self) -> SceneResult<Texture> {
        let (texture, steps) = match self {
            PatternDescription::Solid { color } => {
                return Ok(Texture::new(SolidPattern(Color::from_array(*color))))
            }
            PatternDescription::Stripe { a, b, transform } => (
                Texture::new(StripePattern {
                    a: Color::from_array(*a),
                    b: Color::from_array(*b),
                }),
                transform,
            ),
            PatternDescription::Gradient { a, b, transform } => (
                Texture::new(GradientPattern {
                    a: Color::from_array(*a),
                    b: Color::from_array(*b),
                }),
                transform,
            ),
            PatternDescription::Ring { a, b, transform } => (
                Texture::new(RingPattern {
                    a: Color::from_array(*a),
                    b: Color::from_array(*b),
                }),
                transform,
            ),
            PatternDescription::Checker { a, b, transform } => (
                Texture::new(CheckerPattern {
                    a: Color::from_array(*a),
                    b: Color::from_array(*b),
                }),
                transform,
            ),
        };
        texture.with_transform(compose(steps))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightDescription {
    Point {
        position: [f32; 3],
        intensity: [f32; 3],
    },
    Area {
        corner: [f32; 3],
        full_u: [f32; 3],
        usteps: usize,
        full_v: [f32; 3],
        vsteps: usize,
        intensity: [f32; 3],
        #[serde(default)]
        jitter: Option<Vec<f32>>,
    },
}

impl LightDescription {
    pub fn to_light(&self) -> SceneResult<Light> {
        match self {
            LightDescription::Point {
                position,
                intensity,
            } => Ok(PointLight::new(Vec3::from_array(*position), Color::from_array(*intensity)).into()),
            LightDescription::Area {
                corner,
                full_u,
                usteps,
                full_v,
                vsteps,
                intensity,
                jitter,
            } => {
                let mut light = AreaLight::new(
                    Vec3::from_array(*corner),
                    Vec3::from_array(*full_u),
                    *usteps,
                    Vec3::from_array(*full_v),
                    *vsteps,
                    Color::from_array(*intensity),
                )?;
                if let Some(sequence) = jitter {
                    light = light.with_jitter(sequence.clone())?;
                }
                Ok(light.into())
            }
        }
    }
}

impl SceneDescription {
    /// Instantiate the description as a world.
    pub fn build(&self) -> SceneResult<World> {
        let mut world = World::new();
        for shape in &self.shapes {
            let id = build_shape(&mut world, shape, None)?;
            world.add_object(id)?;
        }

        for light in &self.lights {
            let light = light.to_light()?;
            if light.intensity() == Color::ZERO {
                log::warn!("Light at {:?} has zero intensity", light.position());
            }
            world.add_light(light);
        }

        if let Some(threshold) = self.divide_threshold {
            world.divide(threshold);
        }
        Ok(world)
    }
}

/// Shapes without their own material inherit the nearest enclosing one.
fn build_shape(
    world: &mut World,
    desc: &ShapeDescription,
    inherited: Option<&Material>,
) -> SceneResult<ShapeId> {
    let surface = desc.surface();
    let material = match &surface.material {
        Some(m) => Some(m.to_material()?),
        None => inherited.cloned(),
    };

    let id = match desc {
        ShapeDescription::Sphere(_) => add_leaf(world, Primitive::Sphere, material)?,
        ShapeDescription::Plane(_) => add_leaf(world, Primitive::Plane, material)?,
        ShapeDescription::Cube(_) => add_leaf(world, Primitive::Cube, material)?,
        ShapeDescription::Cylinder {
            minimum,
            maximum,
            closed,
            ..
        } => {
            let cylinder = Primitive::Cylinder {
                minimum: minimum.unwrap_or(f32::NEG_INFINITY),
                maximum: maximum.unwrap_or(f32::INFINITY),
                closed: *closed,
            };
            add_leaf(world, cylinder, material)?
        }
        // Composites hand their material down while building children
        ShapeDescription::Group { children, .. } => {
            let group = world.shapes_mut().add_group();
            for child in children {
                let child = build_shape(world, child, material.as_ref())?;
                world.add_child(group, child)?;
            }
            group
        }
        ShapeDescription::Csg {
            operation,
            left,
            right,
            ..
        } => {
            let left = build_shape(world, left, material.as_ref())?;
            let right = build_shape(world, right, material.as_ref())?;
            world.shapes_mut().add_csg(*operation, left, right)?
        }
    };

    world.shapes_mut().set_transform(id, compose(&surface.transform))?;
    Ok(id)
}

fn add_leaf(world: &mut World, primitive: Primitive, material: Option<Material>) -> SceneResult<ShapeId> {
    let id = world.shapes_mut().add_shape(primitive);
    if let Some(material) = material {
        world.shapes_mut().set_material(id, material)?;
    }
    Ok(id)
}

/// Parse a scene description from JSON text.
pub fn load_scene_from_str(text: &str) -> SceneResult<World> {
    let description: SceneDescription = serde_json::from_str(text)?;
    let world = description.build()?;
    log::info!(
        "Loaded scene: {} root objects, {} shapes, {} lights",
        world.objects().len(),
        world.shapes().len(),
        world.lights().len()
    );
    Ok(world)
}

/// Load a JSON scene file.
///
/// # Example
///
/// ```ignore
/// let world = lumen_core::load_scene("scenes/cornell.json")?;
/// ```
pub fn load_scene<P: AsRef<Path>>(path: P) -> SceneResult<World> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    log::info!("Reading scene {}", path.display());
    load_scene_from_str(&text)
}

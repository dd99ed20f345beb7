//! Simple path tracer example.
//!
//! Renders a scene file (or a built-in scene) and saves it as PPM.
//!
//! ```text
//! cargo run --release -p lumen_renderer --example simple_render -- [scene.json] [render.json]
//! ```

use std::f32::consts::FRAC_PI_2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use lumen_core::pattern::CheckerPattern;
use lumen_core::{load_scene, AreaLight, CsgOp, Material, Primitive, Texture, World};
use lumen_math::Mat4;
use lumen_renderer::{color_to_rgba, render, Camera, Color, ImageBuffer, RenderConfig, Vec3};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);

    let start = Instant::now();
    let world = match args.next() {
        Some(path) => load_scene(&path).with_context(|| format!("loading scene {path}"))?,
        None => build_scene()?,
    };
    log::info!("scene ready in {:?}", start.elapsed());

    let config = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing render config {path}"))?
        }
        None => RenderConfig {
            samples_per_pixel: 64,
            ..RenderConfig::default()
        },
    };

    let mut camera = Camera::new()
        .with_resolution(640, 360)
        .with_position(Vec3::new(0.0, 1.5, -6.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_fov(45.0);
    camera.initialize();

    let image = render(&camera, &world, &config);

    let filename = "output.ppm";
    save_ppm(&image, filename).with_context(|| format!("writing {filename}"))?;
    log::info!("saved to {filename}");
    Ok(())
}

fn build_scene() -> Result<World> {
    let mut world = World::new();

    let floor = world.shapes_mut().add_shape(Primitive::Plane);
    let checker = Texture::new(CheckerPattern {
        a: Color::splat(0.8),
        b: Color::splat(0.2),
    });
    world
        .shapes_mut()
        .set_material(floor, Material::default().with_texture(checker).with_roughness(0.9))?;
    world.add_object(floor)?;

    let glass = world.shapes_mut().add_shape(Primitive::Sphere);
    world
        .shapes_mut()
        .set_transform(glass, Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)))?;
    world.shapes_mut().set_material(glass, Material::glass())?;
    world.add_object(glass)?;

    let gold = world.shapes_mut().add_shape(Primitive::Sphere);
    world
        .shapes_mut()
        .set_transform(gold, Mat4::from_translation(Vec3::new(-2.2, 1.0, 0.5)))?;
    let metal = Material {
        specular: 1.0,
        ..Material::new(Color::new(1.0, 0.78, 0.34))
    }
    .with_roughness(0.25)
    .with_metallic(1.0);
    world.shapes_mut().set_material(gold, metal)?;
    world.add_object(gold)?;

    // A cube with a cylinder bored through it
    let cube = world.shapes_mut().add_shape(Primitive::Cube);
    let bore = world.shapes_mut().add_shape(Primitive::Cylinder {
        minimum: -2.0,
        maximum: 2.0,
        closed: true,
    });
    world
        .shapes_mut()
        .set_transform(bore, Mat4::from_rotation_x(FRAC_PI_2) * Mat4::from_scale(Vec3::new(0.5, 1.0, 0.5)))?;
    let block = world.shapes_mut().add_csg(CsgOp::Difference, cube, bore)?;
    world.shapes_mut().set_transform(
        block,
        Mat4::from_translation(Vec3::new(2.2, 0.75, 0.5)) * Mat4::from_scale(Vec3::splat(0.75)),
    )?;
    world
        .shapes_mut()
        .set_material(block, Material::new(Color::new(0.3, 0.5, 0.8)).with_roughness(0.6))?;
    world.add_object(block)?;

    let light = AreaLight::new(
        Vec3::new(-2.0, 6.0, -2.0),
        Vec3::new(4.0, 0.0, 0.0),
        4,
        Vec3::new(0.0, 0.0, 4.0),
        4,
        Color::splat(1.5),
    )?;
    world.add_light(light);

    Ok(world)
}

fn save_ppm(image: &ImageBuffer, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for y in 0..image.height {
        for x in 0..image.width {
            let rgba = color_to_rgba(image.get(x, y));
            writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
        }
    }

    writer.flush()
}

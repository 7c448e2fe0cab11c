use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::{UVec3, Vec3};
use voxray_engine::device::{ContextConfig, EmbeddedSource, GpuContext, KernelProgram};
use voxray_engine::logging::{init_logging, LoggingConfig};
use voxray_engine::render::{ImageFileWriter, Renderer};
use voxray_engine::scene::{Camera, Cell, Material, SceneStore};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const ROOM: u32 = 16;
const DEFAULT_SAMPLES: u32 = 64;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut args = std::env::args().skip(1);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "voxray.png".to_owned()));
    let samples = match args.next() {
        Some(s) => s
            .parse::<u32>()
            .with_context(|| format!("sample count must be a positive integer, got '{s}'"))?,
        None => DEFAULT_SAMPLES,
    };

    let context = GpuContext::new_blocking(
        &KernelProgram::builtin(),
        &EmbeddedSource,
        ContextConfig::default(),
    )
    .context("failed to set up the compute device")?;
    log::info!("device: {}", context.device_info().name);

    let mut renderer = Renderer::new(context);
    renderer
        .configure_image(WIDTH, HEIGHT)
        .context("failed to allocate the accumulation buffer")?;
    build_room(&mut renderer)?;

    let half = ROOM as f32 / 2.0;
    renderer.configure_camera(Camera {
        position: Vec3::new(half, half, -1.6 * ROOM as f32),
        focal_length: 1.6 * ROOM as f32 + half,
        sensor_width: 0.9 * (1.6 * ROOM as f32 + half),
        aperture: 0.2,
        ..Camera::default()
    });

    renderer
        .render_to_file(samples, &output, &ImageFileWriter, true)
        .with_context(|| format!("failed to render {}", output.display()))?;

    renderer.teardown();
    log::info!("{samples} sample(s) written to {}", output.display());
    Ok(())
}

/// Closed box, open towards the camera, lit by a ceiling panel, with one block
/// of each surface kind on the floor.
fn build_room(renderer: &mut Renderer<GpuContext>) -> Result<()> {
    let white = renderer.add_material(Material::lambertian(Vec3::splat(0.75)));
    let red = renderer.add_material(Material::lambertian(Vec3::new(0.75, 0.15, 0.12)));
    let green = renderer.add_material(Material::lambertian(Vec3::new(0.15, 0.65, 0.2)));
    let light = renderer.add_material(Material::light_source(Vec3::splat(12.0)));
    let mirror = renderer.add_material(Material::metal(Vec3::splat(0.9), 0.9, 0.05));
    let glass = renderer.add_material(Material::dielectric(Vec3::splat(0.98), 0.0, 0.0, 1.5));
    let clay = renderer.add_material(Material::lambertian(Vec3::new(0.8, 0.6, 0.3)));

    let last = ROOM - 1;
    let mut scene = SceneStore::new(UVec3::splat(ROOM), Vec3::splat(0.02))?;

    scene.fill_box(UVec3::ZERO, UVec3::new(last, 0, last), Cell::Material(white))?;
    scene.fill_box(UVec3::new(0, last, 0), UVec3::new(last, last, last), Cell::Material(white))?;
    scene.fill_box(UVec3::new(0, 0, last), UVec3::new(last, last, last), Cell::Material(white))?;
    scene.fill_box(UVec3::ZERO, UVec3::new(0, last, last), Cell::Material(red))?;
    scene.fill_box(UVec3::new(last, 0, 0), UVec3::new(last, last, last), Cell::Material(green))?;
    scene.fill_box(UVec3::new(5, last, 5), UVec3::new(10, last, 10), Cell::Material(light))?;

    scene.fill_box(UVec3::new(2, 1, 8), UVec3::new(5, 6, 11), Cell::Material(mirror))?;
    scene.fill_box(UVec3::new(7, 1, 4), UVec3::new(9, 3, 6), Cell::Material(clay))?;
    scene.fill_box(UVec3::new(10, 1, 7), UVec3::new(13, 4, 10), Cell::Material(glass))?;

    log::info!("scene: {} filled cell(s)", scene.filled_count());
    renderer.configure_scene(scene);
    Ok(())
}

use std::{f32::consts::TAU, path::PathBuf};

use clap::Parser;
use glam::{Quat, Vec2, Vec3, Vec4};
use renderer::Renderer;
use tracing::{debug, error, info};

use game::{
    camera::Camera,
    config::{Config, ConfigError, GraphicsQuality},
    render::{
        frame_renderer::{FrameRenderer, FrameReport, RenderError},
        materials::MissingMaterial,
        variables::FloatVariable,
    },
    resources::SharedResources,
    scene::{
        QueryResponse, Scene, SceneQuery,
        lights::Light,
        particles::{EmitterSettings, ParticleEmitter},
        props::Prop,
        sky::Sky,
        water::Water,
    },
    terrain::{Lod, Terrain, TerrainError},
};

mod engine;
mod game;

#[derive(clap::Parser)]
struct Opts {
    /// Path to the height map image (.pcx, .png, .bmp or .jpg).
    height_map: PathBuf,

    /// Path to a configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Amount of frames to render.
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Terrain detail used for normal passes (High, Med, Low or Minimum).
    #[arg(long)]
    detail: Option<Lod>,

    /// Graphics quality (Low, Medium or High).
    #[arg(long)]
    quality: Option<GraphicsQuality>,

    /// Draw boxes around visible terrain patches.
    #[arg(long)]
    bounding_boxes: bool,

    /// Lower the terrain detail whenever a frame draws more primitives than this.
    #[arg(long)]
    primitive_budget: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("Could not load config: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not create terrain: {0}")]
    Terrain(#[from] TerrainError),

    #[error("Could not render: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    MissingMaterial(#[from] MissingMaterial),
}

/// The demo scene and the camera orbiting over it.
struct Demo {
    scene: Scene,
    /// Center of the terrain, on the surface.
    center: Vec3,
    orbit_radius: f32,
    orbit_height: f32,
}

impl Demo {
    fn new(
        terrain: Terrain,
        resources: SharedResources,
        config: &Config,
    ) -> Result<Self, AppError> {
        let height_field = terrain.height_field();
        let extent = (height_field.size() - 1).as_vec2() * height_field.scale();
        let elevation_strength = config.terrain.elevation_strength;

        let mut scene = Scene::new(resources);
        scene.add(terrain);

        let surface_at = |scene: &Scene, x: f32, z: f32| match scene
            .query(SceneQuery::TerrainHeight { x, z })
        {
            QueryResponse::Height(Some(height)) => height,
            _ => 0.0,
        };

        let center = {
            let c = extent * 0.5;
            Vec3::new(c.x, surface_at(&scene, c.x, c.y), c.y)
        };

        let water_elevation = config
            .water_elevation
            .unwrap_or(elevation_strength * 0.25);
        let water = Water::new(water_elevation, Vec2::ZERO, extent, scene.resources())?;
        scene.add(water);

        scene.add(Light::directional(
            Vec3::new(0.4, -1.0, 0.3),
            Vec3::new(1.0, 0.95, 0.85),
        ));
        scene.add(Light::point(
            center + Vec3::Y * 10.0,
            Vec3::new(1.0, 0.5, 0.2),
            50.0,
        ));

        const PROP_COUNT: usize = 6;
        let ring = extent.min_element() * 0.2;
        for i in 0..PROP_COUNT {
            let angle = i as f32 / PROP_COUNT as f32 * TAU;
            let x = center.x + angle.cos() * ring;
            let z = center.z + angle.sin() * ring;
            let prop = Prop::new(
                Vec3::new(x, surface_at(&scene, x, z), z),
                Vec3::new(4.0, 8.0, 4.0),
                Quat::from_rotation_y(angle),
                scene.resources(),
            )?
            .transparent(i % 3 == 2);
            scene.add(prop);
        }

        let sky = Sky::new(scene.resources())?;
        scene.add(sky);

        let emitter = ParticleEmitter::new(center, EmitterSettings::default(), scene.resources())?;
        scene.add(emitter);

        scene.add(Camera {
            aspect_ratio: config.graphics.surface_width as f32
                / config.graphics.surface_height.max(1) as f32,
            ..Camera::default()
        });

        Ok(Self {
            scene,
            center,
            orbit_radius: extent.max_element() * 0.6,
            orbit_height: elevation_strength * 1.5,
        })
    }

    /// Move the camera to `t` (0..1) around its orbit.
    fn orbit(&mut self, t: f32) {
        let (sin, cos) = (t * TAU).sin_cos();
        let position = self.center
            + Vec3::new(cos * self.orbit_radius, self.orbit_height, sin * self.orbit_radius);

        if let Some(camera) = self.scene.camera_mut() {
            camera.position = position;
            camera.look_at(self.center);
        }
    }
}

fn run(opts: Opts) -> Result<(), AppError> {
    let mut config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(detail) = opts.detail {
        config.terrain.detail = detail;
    }
    if let Some(quality) = opts.quality {
        config.graphics.quality = quality;
    }
    config.graphics.render_bounding_boxes |= opts.bounding_boxes;

    let mut renderer = Renderer::default();
    let mut resources = SharedResources::new(&mut renderer);

    info!("Loading height map {}", opts.height_map.display());
    let terrain = Terrain::load(
        &opts.height_map,
        &config.terrain,
        config.graphics.quality,
        &mut resources,
        &mut renderer,
    )?;

    let mut frame_renderer = FrameRenderer::new(
        &config.graphics,
        config.terrain.detail,
        &resources.materials,
        resources.quad,
        &mut renderer,
    )?;

    let mut demo = Demo::new(terrain, resources, &config)?;

    const DELTA_TIME: f32 = 1.0 / 60.0;
    let mut chunks = 0;
    let mut frame = 0;

    loop {
        if frame == opts.frames {
            demo.scene.request_exit();
        }

        demo.orbit(frame as f32 / opts.frames.max(1) as f32);
        demo.scene.update(DELTA_TIME);

        let center = demo.center;
        if let QueryResponse::Normal(Some(normal)) = demo.scene.query(SceneQuery::TerrainNormal {
            x: center.x,
            z: center.z,
        }) {
            frame_renderer.queue_debug_line(
                center,
                center + normal * 10.0,
                Vec4::new(0.0, 1.0, 0.0, 1.0),
            );
        }

        match frame_renderer.render_frame(&demo.scene, &mut renderer)? {
            FrameReport::Skipped => break,
            FrameReport::Rendered(summary) => {
                debug!(
                    "Frame {frame}: {} passes, {} draws, {} primitives, {} chunks, {} point lights",
                    summary.stats.passes,
                    summary.stats.draw_calls,
                    summary.stats.primitives,
                    summary.chunks,
                    frame_renderer
                        .variables()
                        .float(FloatVariable::PointLightCount),
                );
                chunks += summary.chunks;

                let detail = frame_renderer.detail();
                if let Some(budget) = opts.primitive_budget {
                    if summary.stats.primitives > budget && detail != Lod::Minimum {
                        frame_renderer.set_detail(detail.coarser());
                    }
                }
            }
        }

        frame += 1;
    }

    renderer.log_summary();
    info!(
        "Gathered {} chunks, pools hold {} items.",
        chunks,
        frame_renderer.chunk_pools().capacity(),
    );

    Ok(())
}

fn main() {
    tracing_subscriber::fmt().init();

    let opts = Opts::parse();

    if let Err(err) = run(opts) {
        error!("{err}");
        std::process::exit(1);
    }
}

//! Ember - render an OBJ scene to a PNG.
//!
//! Settings come from an optional JSON file, then a camera preset, then
//! individual flags, each overriding the last.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use ember_core::{load_obj, ObjOptions, SceneDescription, Shader};
use ember_math::Vec3;
use ember_renderer::{
    render, Background, CameraSettings, Integrator, MeshScene, RenderConfig, RenderContext, Scene,
};

#[derive(Parser, Debug)]
#[command(name = "ember")]
#[command(about = "Render an OBJ scene with the Ember ray tracer", long_about = None)]
struct Args {
    /// OBJ file to render
    scene: PathBuf,

    /// Render settings as JSON
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Equirectangular environment image
    #[arg(long, value_name = "PATH")]
    background: Option<PathBuf>,

    /// Where to write the PNG
    #[arg(long, short = 'o', value_name = "PATH", default_value = "render.png")]
    output: PathBuf,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Samples per pixel
    #[arg(long)]
    spp: Option<u32>,

    /// Maximum recursion depth
    #[arg(long)]
    depth: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    /// Shade every surface with this shader, ignoring the MTL file
    #[arg(long, value_name = "NAME")]
    shader: Option<Shader>,

    /// Camera placement of a known scene
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Trace with Intel Embree (needs the `embree` feature)
    #[arg(long)]
    embree: bool,
}

/// Camera placements for the bundled test scenes.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Preset {
    Ship,
    PathTracer,
    Geosphere,
}

impl Preset {
    fn camera(self) -> CameraSettings {
        let (fov_y, view_from, view_at) = match self {
            Preset::Ship => (50.0, Vec3::new(175.0, -140.0, 130.0), Vec3::new(0.0, 0.0, 35.0)),
            Preset::PathTracer => (40.0, Vec3::new(40.0, -940.0, 250.0), Vec3::new(0.0, 0.0, 250.0)),
            Preset::Geosphere => (45.0, Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO),
        };

        CameraSettings {
            fov_y,
            view_from,
            view_at,
            up: Vec3::Z,
        }
    }
}

impl Args {
    /// Settings file, preset and flags merged into one configuration.
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.settings {
            Some(path) => load_settings(path)?,
            None => RenderConfig::default(),
        };

        if let Some(preset) = self.preset {
            config.camera = preset.camera();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(spp) = self.spp {
            config.samples_per_pixel = spp;
        }
        if let Some(depth) = self.depth {
            config.max_depth = depth;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        if config.width == 0 || config.height == 0 {
            bail!("Image size must be non-zero, got {}x{}", config.width, config.height);
        }
        Ok(config)
    }
}

fn load_settings(path: &Path) -> Result<RenderConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings {}", path.display()))?;

    log::info!("Loaded settings from {}", path.display());
    Ok(config)
}

fn build_scene(description: SceneDescription, embree: bool) -> Result<Box<dyn Scene>> {
    if embree {
        #[cfg(feature = "embree")]
        {
            let scene = ember_renderer::EmbreeScene::new(description)
                .context("Failed to build Embree scene")?;
            return Ok(Box::new(scene));
        }
        #[cfg(not(feature = "embree"))]
        bail!("ember was built without Embree support, rebuild with `--features embree`");
    }

    Ok(Box::new(MeshScene::new(description)))
}

fn run(args: &Args) -> Result<()> {
    let config = args.render_config()?;

    let options = ObjOptions {
        shader_override: args.shader,
        ..Default::default()
    };
    let description = load_obj(&args.scene, &options)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;
    log::info!(
        "Loaded {}: {} surfaces, {} materials, {} triangles",
        args.scene.display(),
        description.surface_count(),
        description.material_count(),
        description.triangle_count()
    );

    let background = match &args.background {
        Some(path) => Background::load(path)
            .with_context(|| format!("Failed to load background {}", path.display()))?,
        None => Background::default(),
    };

    let scene = build_scene(description, args.embree)?;
    let camera = config.build_camera();
    let integrator = Integrator::new(scene.as_ref(), &background, config.light_position);
    let ctx = RenderContext {
        camera: &camera,
        integrator: &integrator,
        config: &config,
    };

    let image = render(&ctx);
    image
        .save_png(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    log::info!("Saved {}", args.output.display());
    Ok(())
}

fn main() -> Result<()> {
    // Default to info, RUST_LOG still takes precedence
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Ember");
    let args = Args::parse();
    run(&args)
}

//! `ember` - render a built-in scene to an image file.

mod scenes;

use anyhow::{Context, Result};
use clap::Parser;
use ember_renderer::{prepare_scene, render, IntegratorKind, RenderConfig, SplitMethod};
use scenes::DemoScene;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ember", version, about = "Ember CPU path tracer")]
struct Cli {
    /// Worker threads (defaults to all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Output image; the format follows the extension
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// Samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Maximum bounces per path
    #[arg(short, long)]
    bounces: Option<u32>,

    /// Preview quality: a quarter of the samples, at most 4 bounces
    #[arg(short, long)]
    quick: bool,

    /// Only log errors
    #[arg(long)]
    quiet: bool,

    #[arg(long, value_enum, default_value_t = DemoScene::Spheres)]
    scene: DemoScene,

    /// JSON render settings; replaces the scene's defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// BVH split method: sah or equal-counts
    #[arg(long)]
    split_method: Option<SplitMethod>,

    /// Light transport: path or whitted
    #[arg(long)]
    integrator: Option<IntegratorKind>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,
}

impl Cli {
    /// Scene defaults, then the config file, then command line flags.
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => self.scene.default_config(),
        };

        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(samples) = self.samples {
            config.samples_per_pixel = samples;
        }
        if let Some(bounces) = self.bounces {
            config.max_depth = bounces;
        }
        if let Some(split_method) = self.split_method {
            config.split_method = split_method;
        }
        if let Some(integrator) = self.integrator {
            config.integrator = integrator;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if self.quick {
            config = config.quick();
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config = cli.render_config()?;
    log::info!("Building scene '{:?}' (seed {})", cli.scene, config.seed);

    let (mut scene, camera) = cli.scene.build(config.seed);
    prepare_scene(&mut scene, &config).context("failed to prepare scene")?;

    let output = render(&scene, &camera, &config)?;
    if output.stats.error_pixels > 0 {
        log::warn!(
            "{} pixels produced invalid samples and are marked in the output",
            output.stats.error_pixels
        );
    }

    output
        .save(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    Ok(())
}

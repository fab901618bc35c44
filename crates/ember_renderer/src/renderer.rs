//! Render driver: configuration, thread pool and bucket dispatch.

use crate::bucket::{generate_buckets, render_bucket, BucketStats, DEFAULT_BUCKET_SIZE};
use crate::bvh::SplitMethod;
use crate::camera::Camera;
use crate::error::RenderError;
use crate::film::Film;
use crate::integrator::{Integrator, IntegratorKind, PathIntegrator, WhittedIntegrator};
use crate::scene::{Background, Scene};
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Render configuration.
///
/// Every field has a default, so partial JSON files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Maximum number of bounces per path
    pub max_depth: u32,
    /// Russian roulette starts after this many bounces
    pub rr_start_bounce: u32,
    pub background: Background,
    pub integrator: IntegratorKind,
    pub split_method: SplitMethod,
    pub bucket_size: u32,
    /// Worker threads; must be at least 1
    pub threads: usize,
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            samples_per_pixel: 64,
            max_depth: 16,
            rr_start_bounce: 3,
            background: Background::Black,
            integrator: IntegratorKind::Path,
            split_method: SplitMethod::Sah,
            bucket_size: DEFAULT_BUCKET_SIZE,
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Preview settings: a quarter of the samples and at most 4 bounces.
    pub fn quick(mut self) -> Self {
        self.samples_per_pixel = (self.samples_per_pixel / 4).max(1);
        self.max_depth = self.max_depth.min(4);
        self
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.threads == 0 {
            return Err(RenderError::InvalidArgument("thread count must be at least 1".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidArgument(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidArgument("samples_per_pixel must be at least 1".into()));
        }
        if self.bucket_size == 0 {
            return Err(RenderError::InvalidArgument("bucket_size must be at least 1".into()));
        }
        Ok(())
    }

    fn integrator(&self) -> Box<dyn Integrator> {
        match self.integrator {
            IntegratorKind::Path => Box::new(PathIntegrator::new(self.max_depth, self.rr_start_bounce)),
            IntegratorKind::Whitted => Box::new(WhittedIntegrator::new(self.max_depth)),
        }
    }
}

/// Apply the scene-related parts of `config` and build the accelerator.
pub fn prepare_scene(scene: &mut Scene, config: &RenderConfig) -> Result<(), RenderError> {
    scene.set_split_method(config.split_method);
    scene.set_bvh_seed(config.seed);
    scene.set_background(config.background);
    scene.ensure_accelerator()
}

/// Summary of a finished (or cancelled) render.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub samples: u64,
    pub non_finite_samples: u64,
    pub error_pixels: usize,
    pub buckets_rendered: usize,
    pub buckets_skipped: usize,
    pub elapsed: Duration,
}

impl RenderStats {
    pub fn cancelled(&self) -> bool {
        self.buckets_skipped > 0
    }
}

/// Film plus statistics returned by [`render`].
#[derive(Debug)]
pub struct RenderOutput {
    pub film: Film,
    pub stats: RenderStats,
    samples_per_pixel: u32,
}

impl RenderOutput {
    /// Averaged, gamma corrected 8-bit image.
    pub fn image(&self) -> RgbImage {
        self.film.finalize(1.0 / self.samples_per_pixel as f32)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        self.film.save(path, 1.0 / self.samples_per_pixel as f32)
    }
}

/// Render `scene` as seen by `camera`.
///
/// The scene must be ready (see [`Scene::ensure_accelerator`]). The camera is
/// re-initialized at the configured resolution.
pub fn render(scene: &Scene, camera: &Camera, config: &RenderConfig) -> Result<RenderOutput, RenderError> {
    render_with_cancel(scene, camera, config, &AtomicBool::new(false))
}

/// Like [`render`], but buckets not yet started when `cancel` becomes true are skipped.
pub fn render_with_cancel(
    scene: &Scene,
    camera: &Camera,
    config: &RenderConfig,
    cancel: &AtomicBool,
) -> Result<RenderOutput, RenderError> {
    config.validate()?;
    if !scene.is_ready() {
        return Err(RenderError::AcceleratorNotBuilt);
    }

    let mut camera = camera.clone().with_resolution(config.width, config.height);
    camera.initialize();

    let integrator = config.integrator();
    let film = Film::new(config.width, config.height);
    let buckets = generate_buckets(config.width, config.height, config.bucket_size);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;

    log::info!(
        "Rendering {}x{} at {} spp, {} buckets on {} threads ({:?} integrator)",
        config.width,
        config.height,
        config.samples_per_pixel,
        buckets.len(),
        config.threads,
        config.integrator,
    );

    let start = Instant::now();
    // Workers pull buckets in spiral order, so the centre is always dispatched first.
    let (totals, rendered, skipped) = pool.install(|| {
        buckets
            .iter()
            .par_bridge()
            .map(|bucket| {
                if cancel.load(Ordering::Relaxed) {
                    return (BucketStats::default(), 0usize, 1usize);
                }
                let stats = render_bucket(
                    bucket,
                    &camera,
                    scene,
                    integrator.as_ref(),
                    &film,
                    config.samples_per_pixel,
                    config.seed,
                );
                (stats, 1, 0)
            })
            .reduce(
                || (BucketStats::default(), 0, 0),
                |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2),
            )
    });

    let stats = RenderStats {
        samples: totals.samples,
        non_finite_samples: totals.non_finite_samples,
        error_pixels: film.error_count(),
        buckets_rendered: rendered,
        buckets_skipped: skipped,
        elapsed: start.elapsed(),
    };

    if stats.cancelled() {
        log::warn!(
            "Render cancelled: {} of {} buckets skipped",
            stats.buckets_skipped,
            buckets.len()
        );
    }
    log::info!(
        "Rendered {} samples in {:.2?} ({} non-finite, {} error pixels)",
        stats.samples,
        stats.elapsed,
        stats.non_finite_samples,
        stats.error_pixels,
    );

    Ok(RenderOutput {
        film,
        stats,
        samples_per_pixel: config.samples_per_pixel,
    })
}

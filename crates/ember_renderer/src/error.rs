//! Error type for scene setup and rendering.

use thiserror::Error;

/// Errors that abort a build or render before any pixel is produced.
///
/// Problems inside a single sample (NaN radiance, missing BSDF) are handled
/// in the integrator and never surface here.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Scene has no primitives")]
    EmptyScene,

    #[error("Accelerator is missing or stale; call Scene::ensure_accelerator before rendering")]
    AcceleratorNotBuilt,

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

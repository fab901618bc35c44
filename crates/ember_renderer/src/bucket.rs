//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that are rendered independently and
//! in parallel. Each bucket owns its random stream, so results do not depend
//! on which thread picks it up.

use crate::camera::Camera;
use crate::film::Film;
use crate::integrator::Integrator;
use crate::scene::Scene;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self { x, y, width, height, index }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Default bucket size in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 16;

/// Generate buckets for an image, sorted in spiral order from center.
///
/// Buckets closer to the center come first so the most important part of the
/// image finishes early.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, buckets.len()));
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);

    // Update indices after sorting
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from image center. Ties keep row-major order.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let distance = |b: &Bucket| {
        let bx = b.x as f32 + b.width as f32 / 2.0;
        let by = b.y as f32 + b.height as f32 / 2.0;
        (bx - center_x).powi(2) + (by - center_y).powi(2)
    };

    buckets.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// Seed for a bucket's private random stream.
pub fn bucket_seed(seed: u64, bucket_index: usize) -> u64 {
    seed ^ (bucket_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Sample counts produced by one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub samples: u64,
    /// Samples that came back NaN or infinite and were discarded
    pub non_finite_samples: u64,
}

impl std::ops::Add for BucketStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            samples: self.samples + other.samples,
            non_finite_samples: self.non_finite_samples + other.non_finite_samples,
        }
    }
}

/// Render every pixel of `bucket` into `film`.
pub fn render_bucket(
    bucket: &Bucket,
    camera: &Camera,
    scene: &Scene,
    integrator: &dyn Integrator,
    film: &Film,
    samples_per_pixel: u32,
    seed: u64,
) -> BucketStats {
    let mut rng = StdRng::seed_from_u64(bucket_seed(seed, bucket.index));
    let mut stats = BucketStats::default();

    for y in bucket.y..bucket.y + bucket.height {
        for x in bucket.x..bucket.x + bucket.width {
            for _ in 0..samples_per_pixel {
                let ray = camera.get_ray(x, y, &mut rng);
                let radiance = integrator.li(&ray, scene, &mut rng);
                stats.samples += 1;

                if radiance.is_finite() {
                    film.accumulate(x, y, radiance);
                } else {
                    stats.non_finite_samples += 1;
                    film.mark_error(x, y);
                }
            }
        }
    }

    if stats.non_finite_samples > 0 {
        log::warn!(
            "Bucket {} at ({}, {}) discarded {} non-finite samples",
            bucket.index,
            bucket.x,
            bucket.y,
            stats.non_finite_samples
        );
    }
    log::debug!("Finished bucket {} ({} samples)", bucket.index, stats.samples);

    stats
}

//! Ember renderer - CPU path tracing
//!
//! A Monte Carlo path tracer built around a flat BVH. Scenes are assembled
//! from [`Primitive`]s and [`Light`]s, then rendered bucket by bucket on a
//! rayon thread pool.

mod bsdf;
mod bucket;
mod bvh;
mod camera;
mod error;
mod film;
mod hittable;
mod integrator;
mod interaction;
mod light;
mod material;
mod primitive;
mod quad;
mod renderer;
pub mod sampling;
mod scene;
mod sphere;
mod triangle;

pub use bsdf::{Bsdf, BsdfSample, Bxdf, MAX_LOBES};
pub use bucket::{bucket_seed, generate_buckets, render_bucket, Bucket, BucketStats, DEFAULT_BUCKET_SIZE};
pub use bvh::{
    bound_primitives, sah_cost, Bvh, BvhHit, BvhNode, BvhOptions, BvhStats, SplitMethod, TraversalStats,
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_LEAF_SIZE, DEFAULT_SAH_SPLITS,
};
pub use camera::Camera;
pub use error::RenderError;
pub use film::{color_to_rgb, linear_to_gamma, Film, ERROR_COLOR};
pub use hittable::{Hit, Hittable, Shape};
pub use integrator::{
    estimate_direct, russian_roulette, uniform_sample_one_light, Integrator, IntegratorKind, PathIntegrator,
    WhittedIntegrator, MAX_PASS_THROUGH, RR_MIN_TERMINATION,
};
pub use interaction::{Frame, SurfaceInteraction};
pub use light::{AreaLight, DirectionalLight, Light, LightSample, PointLight, VisibilityTester};
pub use material::{luminance, Color, Dielectric, DiffuseLight, Glossy, Lambertian, Material, Mirror, OrenNayar};
pub use primitive::Primitive;
pub use quad::Quad;
pub use renderer::{prepare_scene, render, render_with_cancel, RenderConfig, RenderOutput, RenderStats};
pub use scene::{Background, Scene};
pub use sphere::Sphere;
pub use triangle::Triangle;

/// Re-export the math types used throughout the public API
pub use ember_math::{Aabb, Interval, Mat4, Ray, Vec2, Vec3, RAY_EPSILON};

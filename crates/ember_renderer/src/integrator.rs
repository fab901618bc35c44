//! Light transport: turn a camera ray into a radiance estimate.

use crate::bsdf::Bsdf;
use crate::interaction::SurfaceInteraction;
use crate::light::Light;
use crate::material::{luminance, Color};
use crate::sampling::{gen_f32, gen_vec2};
use crate::scene::Scene;
use ember_math::{Interval, Ray, Vec2, RAY_EPSILON};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Consecutive material-less surfaces a path may cross before it is dropped.
pub const MAX_PASS_THROUGH: u32 = 16;

/// Lower bound on the Russian-roulette termination probability.
pub const RR_MIN_TERMINATION: f32 = 0.05;

/// Which estimator [`crate::render`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegratorKind {
    #[default]
    Path,
    Whitted,
}

impl std::str::FromStr for IntegratorKind {
    type Err = crate::RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(IntegratorKind::Path),
            "whitted" => Ok(IntegratorKind::Whitted),
            other => Err(crate::RenderError::InvalidArgument(format!(
                "unknown integrator '{other}' (expected 'path' or 'whitted')"
            ))),
        }
    }
}

/// Estimates incident radiance along a camera ray.
pub trait Integrator: Send + Sync {
    fn li(&self, ray: &Ray, scene: &Scene, rng: &mut dyn RngCore) -> Color;
}

/// Russian-roulette decision for a path with throughput `beta`.
///
/// Terminates (returns `None`) when `u <= q` with
/// `q = max(0.05, 1 - luminance(beta))`; survivors are reweighted by `1 / (1 - q)`.
pub fn russian_roulette(beta: Color, u: f32) -> Option<Color> {
    let q = (1.0 - luminance(beta)).max(RR_MIN_TERMINATION);
    if u <= q {
        None
    } else {
        Some(beta / (1.0 - q))
    }
}

/// Direct lighting from one specific light, using sample `u`.
pub fn estimate_direct(
    si: &SurfaceInteraction<'_>,
    bsdf: &Bsdf,
    light: &Light,
    u: Vec2,
    scene: &Scene,
) -> Color {
    let Some(sample) = light.sample_incident(si, u) else {
        return Color::ZERO;
    };
    if sample.pdf <= 0.0 || sample.radiance == Color::ZERO {
        return Color::ZERO;
    }

    let f = bsdf.evaluate(si.wo, sample.wi) * sample.wi.dot(si.frame.normal).abs();
    if f == Color::ZERO || !sample.visibility.unoccluded(scene) {
        return Color::ZERO;
    }

    f * sample.radiance / sample.pdf
}

/// Direct lighting from a single uniformly chosen light, divided by its
/// selection probability.
pub fn uniform_sample_one_light(
    si: &SurfaceInteraction<'_>,
    bsdf: &Bsdf,
    scene: &Scene,
    rng: &mut dyn RngCore,
) -> Color {
    let Some((light, pdf_select)) = scene.sample_light(gen_f32(rng)) else {
        return Color::ZERO;
    };
    let u = gen_vec2(rng);
    estimate_direct(si, bsdf, light, u, scene) / pdf_select
}

/// Logs the first shading gap of a render at `warn`, the rest at `debug`.
#[derive(Debug, Default)]
struct ShadingGapReporter {
    warned: AtomicBool,
}

impl ShadingGapReporter {
    fn report(&self, si: &SurfaceInteraction<'_>) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            log::warn!(
                "Ray hit a surface without a BSDF at {:?}; passing through (further occurrences logged at debug)",
                si.p
            );
        } else {
            log::debug!("Passing through surface without a BSDF at {:?}", si.p);
        }
    }
}

/// Unidirectional path tracer with next-event estimation and Russian roulette.
#[derive(Debug)]
pub struct PathIntegrator {
    max_depth: u32,
    rr_start_bounce: u32,
    gaps: ShadingGapReporter,
}

impl PathIntegrator {
    pub fn new(max_depth: u32, rr_start_bounce: u32) -> Self {
        Self {
            max_depth,
            rr_start_bounce,
            gaps: ShadingGapReporter::default(),
        }
    }
}

impl Integrator for PathIntegrator {
    fn li(&self, camera_ray: &Ray, scene: &Scene, rng: &mut dyn RngCore) -> Color {
        let mut l = Color::ZERO;
        let mut beta = Color::ONE;
        let mut ray = *camera_ray;
        let mut ray_t = Interval::new(RAY_EPSILON, f32::INFINITY);
        let mut bounces = 0;
        let mut specular_bounce = false;
        let mut pass_through = 0;

        while bounces < self.max_depth {
            let Some(si) = scene.intersect(&ray, ray_t) else {
                l += beta * scene.background().radiance(&ray);
                break;
            };

            // Emitters reached by a diffuse bounce are already counted by light sampling.
            if bounces == 0 || specular_bounce {
                l += beta * si.emitted();
            }

            let Some(bsdf) = si.compute_scattering() else {
                pass_through += 1;
                if pass_through > MAX_PASS_THROUGH {
                    log::debug!("Dropping path after {MAX_PASS_THROUGH} surfaces without a BSDF");
                    break;
                }
                self.gaps.report(&si);
                (ray, ray_t) = si.spawn_ray(ray.direction);
                continue;
            };
            pass_through = 0;

            if !bsdf.is_specular() {
                l += beta * uniform_sample_one_light(&si, &bsdf, scene, rng);
            }

            let Some(sample) = bsdf.sample(si.wo, gen_vec2(rng)) else {
                break;
            };
            if sample.pdf == 0.0 || sample.f == Color::ZERO {
                break;
            }

            beta *= sample.f * sample.wi.dot(si.normal).abs() / sample.pdf;
            specular_bounce = sample.specular;
            (ray, ray_t) = si.spawn_ray(sample.wi);

            if bounces > self.rr_start_bounce {
                match russian_roulette(beta, gen_f32(rng)) {
                    Some(survivor) => beta = survivor,
                    None => break,
                }
            }

            bounces += 1;
        }

        l
    }
}

/// Direct lighting from every light plus recursion along every mirror lobe.
///
/// Diffuse interreflection is ignored, so it converges quickly but is biased.
#[derive(Debug)]
pub struct WhittedIntegrator {
    max_depth: u32,
    gaps: ShadingGapReporter,
}

impl WhittedIntegrator {
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            gaps: ShadingGapReporter::default(),
        }
    }

    fn trace(
        &self,
        ray: &Ray,
        ray_t: Interval,
        scene: &Scene,
        rng: &mut dyn RngCore,
        depth: u32,
        pass_through: u32,
    ) -> Color {
        let Some(si) = scene.intersect(ray, ray_t) else {
            return scene.background().radiance(ray);
        };

        let mut l = si.emitted();

        let Some(bsdf) = si.compute_scattering() else {
            if pass_through >= MAX_PASS_THROUGH {
                return l;
            }
            self.gaps.report(&si);
            let (next, next_t) = si.spawn_ray(ray.direction);
            return l + self.trace(&next, next_t, scene, rng, depth, pass_through + 1);
        };

        if !bsdf.is_specular() {
            for light in scene.lights() {
                l += estimate_direct(&si, &bsdf, light, gen_vec2(rng), scene);
            }
        }

        if depth + 1 < self.max_depth {
            for (index, lobe) in bsdf.lobes().iter().enumerate() {
                if !lobe.is_specular() {
                    continue;
                }
                let Some(sample) = bsdf.sample_lobe(index, si.wo, gen_vec2(rng)) else {
                    continue;
                };
                if sample.pdf > 0.0 {
                    let weight = sample.f * sample.wi.dot(si.normal).abs() / sample.pdf;
                    let (next, next_t) = si.spawn_ray(sample.wi);
                    l += weight * self.trace(&next, next_t, scene, rng, depth + 1, 0);
                }
            }
        }

        l
    }
}

impl Integrator for WhittedIntegrator {
    fn li(&self, ray: &Ray, scene: &Scene, rng: &mut dyn RngCore) -> Color {
        if self.max_depth == 0 {
            return Color::ZERO;
        }
        self.trace(ray, Interval::new(RAY_EPSILON, f32::INFINITY), scene, rng, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_russian_roulette_threshold() {
        let beta = Color::splat(0.3);
        // q = 0.7
        assert!(russian_roulette(beta, 0.69).is_none());
        assert!(russian_roulette(beta, 0.1).is_none());

        let survivor = russian_roulette(beta, 0.71).unwrap();
        assert!((survivor - Color::splat(1.0)).length() < 1e-4);
    }

    #[test]
    fn test_russian_roulette_bright_paths_rarely_die() {
        // Luminance above one clamps q to the minimum.
        let beta = Color::splat(2.0);
        assert!(russian_roulette(beta, 0.05).is_none());
        let survivor = russian_roulette(beta, 0.06).unwrap();
        assert!((survivor - beta / 0.95).length() < 1e-5);
    }

    #[test]
    fn test_russian_roulette_is_unbiased() {
        let mut rng = StdRng::seed_from_u64(1234);
        let beta = Color::new(0.2, 0.5, 0.1);
        let n = 200_000;

        let mut sum = Color::ZERO;
        for _ in 0..n {
            if let Some(survivor) = russian_roulette(beta, rng.gen::<f32>()) {
                sum += survivor;
            }
        }
        let mean = sum / n as f32;
        assert!((mean - beta).abs().max_element() < 0.01, "mean {mean:?} vs {beta:?}");
    }

    #[test]
    fn test_integrator_kind_from_str() {
        assert_eq!("path".parse::<IntegratorKind>().unwrap(), IntegratorKind::Path);
        assert_eq!("Whitted".parse::<IntegratorKind>().unwrap(), IntegratorKind::Whitted);
        assert!("bdpt".parse::<IntegratorKind>().is_err());
    }
}

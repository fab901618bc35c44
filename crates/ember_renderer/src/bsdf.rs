//! Reflection models evaluated in a local shading frame.
//!
//! All local directions have the shading normal on +z and point away from the
//! surface.

use crate::interaction::Frame;
use crate::material::Color;
use crate::sampling::cosine_sample_hemisphere;
use arrayvec::ArrayVec;
use ember_math::{Vec2, Vec3};
use std::f32::consts::FRAC_1_PI;

const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

#[inline]
fn cos_theta(w: Vec3) -> f32 {
    w.z
}

#[inline]
fn sin_theta(w: Vec3) -> f32 {
    (1.0 - w.z * w.z).max(0.0).sqrt()
}

#[inline]
fn same_hemisphere(a: Vec3, b: Vec3) -> bool {
    a.z * b.z > 0.0
}

#[inline]
fn cos_sin_phi(w: Vec3) -> (f32, f32) {
    let s = sin_theta(w);
    if s == 0.0 {
        (1.0, 0.0)
    } else {
        ((w.x / s).clamp(-1.0, 1.0), (w.y / s).clamp(-1.0, 1.0))
    }
}

/// One reflection lobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bxdf {
    /// Ideal diffuse reflection.
    Lambertian { reflectance: Color },
    /// Rough diffuse reflection with precomputed `a` and `b` terms.
    OrenNayar { reflectance: Color, a: f32, b: f32 },
    /// Perfect mirror. A delta distribution: only reachable by sampling.
    SpecularReflection { reflectance: Color },
}

impl Bxdf {
    /// Oren-Nayar lobe for roughness `sigma` given in degrees.
    pub fn oren_nayar(reflectance: Color, sigma_degrees: f32) -> Self {
        let sigma = sigma_degrees.to_radians();
        let sigma2 = sigma * sigma;
        Bxdf::OrenNayar {
            reflectance,
            a: 1.0 - sigma2 / (2.0 * (sigma2 + 0.33)),
            b: 0.45 * sigma2 / (sigma2 + 0.09),
        }
    }

    pub fn is_specular(&self) -> bool {
        matches!(self, Bxdf::SpecularReflection { .. })
    }

    fn f(&self, wo: Vec3, wi: Vec3) -> Color {
        match *self {
            Bxdf::Lambertian { reflectance } => {
                if same_hemisphere(wo, wi) {
                    reflectance * FRAC_1_PI
                } else {
                    Color::ZERO
                }
            }
            Bxdf::OrenNayar { reflectance, a, b } => {
                if !same_hemisphere(wo, wi) {
                    return Color::ZERO;
                }
                let (sin_i, sin_o) = (sin_theta(wi), sin_theta(wo));

                let mut max_cos = 0.0;
                if sin_i > 1e-4 && sin_o > 1e-4 {
                    let (cos_phi_i, sin_phi_i) = cos_sin_phi(wi);
                    let (cos_phi_o, sin_phi_o) = cos_sin_phi(wo);
                    max_cos = (cos_phi_i * cos_phi_o + sin_phi_i * sin_phi_o).max(0.0);
                }

                let (sin_alpha, tan_beta) = if cos_theta(wi).abs() > cos_theta(wo).abs() {
                    (sin_o, sin_i / cos_theta(wi).abs())
                } else {
                    (sin_i, sin_o / cos_theta(wo).abs())
                };

                reflectance * FRAC_1_PI * (a + b * max_cos * sin_alpha * tan_beta)
            }
            Bxdf::SpecularReflection { .. } => Color::ZERO,
        }
    }

    fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        match self {
            Bxdf::Lambertian { .. } | Bxdf::OrenNayar { .. } => {
                if same_hemisphere(wo, wi) {
                    cos_theta(wi).abs() * FRAC_1_PI
                } else {
                    0.0
                }
            }
            Bxdf::SpecularReflection { .. } => 0.0,
        }
    }

    fn sample_f(&self, wo: Vec3, u: Vec2) -> Option<(Vec3, Color, f32)> {
        match *self {
            Bxdf::Lambertian { .. } | Bxdf::OrenNayar { .. } => {
                let mut wi = cosine_sample_hemisphere(u);
                if wo.z < 0.0 {
                    wi.z = -wi.z;
                }
                let pdf = self.pdf(wo, wi);
                (pdf > 0.0).then(|| (wi, self.f(wo, wi), pdf))
            }
            Bxdf::SpecularReflection { reflectance } => {
                let wi = Vec3::new(-wo.x, -wo.y, wo.z);
                let cos = cos_theta(wi).abs();
                (cos > 0.0).then(|| (wi, reflectance / cos, 1.0))
            }
        }
    }
}

/// Result of sampling a BSDF.
#[derive(Debug, Clone, Copy)]
pub struct BsdfSample {
    /// Sampled incident direction, world space
    pub wi: Vec3,
    pub pdf: f32,
    pub f: Color,
    /// True when drawn from a delta lobe
    pub specular: bool,
}

/// Most lobes a single [`Bsdf`] can combine.
pub const MAX_LOBES: usize = 4;

/// One or more BxDFs placed in the shading frame of a surface point.
///
/// Plain data: produced per hit, lives on the stack for one bounce.
#[derive(Debug, Clone)]
pub struct Bsdf {
    frame: Frame,
    lobes: ArrayVec<Bxdf, MAX_LOBES>,
}

impl Bsdf {
    pub fn new(frame: Frame, bxdf: Bxdf) -> Self {
        let mut lobes = ArrayVec::new();
        lobes.push(bxdf);
        Self { frame, lobes }
    }

    /// Add another lobe. Lobes beyond [`MAX_LOBES`] are dropped with a warning.
    pub fn with_lobe(mut self, bxdf: Bxdf) -> Self {
        if self.lobes.try_push(bxdf).is_err() {
            log::warn!("BSDF already has {MAX_LOBES} lobes; ignoring {bxdf:?}");
        }
        self
    }

    pub fn lobes(&self) -> &[Bxdf] {
        &self.lobes
    }

    /// True when every lobe is a delta distribution, so light sampling is useless.
    pub fn is_specular(&self) -> bool {
        self.lobes.iter().all(Bxdf::is_specular)
    }

    /// Value of the BSDF for a pair of world-space directions.
    ///
    /// Delta lobes contribute nothing here.
    pub fn evaluate(&self, wo: Vec3, wi: Vec3) -> Color {
        let (wo, wi) = (self.frame.to_local(wo), self.frame.to_local(wi));
        self.lobes.iter().map(|bxdf| bxdf.f(wo, wi)).sum()
    }

    /// Solid-angle density with which [`Bsdf::sample`] picks `wi`.
    pub fn pdf(&self, wo: Vec3, wi: Vec3) -> f32 {
        let (wo, wi) = (self.frame.to_local(wo), self.frame.to_local(wi));
        let total: f32 = self.lobes.iter().map(|bxdf| bxdf.pdf(wo, wi)).sum();
        total / self.lobes.len() as f32
    }

    /// Pick a lobe uniformly with `u.x`, then sample it.
    ///
    /// For a non-delta pick, `f` is summed and `pdf` averaged over all lobes.
    /// A delta pick returns that lobe alone with its selection probability.
    pub fn sample(&self, wo: Vec3, u: Vec2) -> Option<BsdfSample> {
        let n = self.lobes.len();
        let index = ((u.x * n as f32) as usize).min(n - 1);
        let remapped = Vec2::new((u.x * n as f32 - index as f32).min(ONE_MINUS_EPSILON), u.y);

        let bxdf = &self.lobes[index];
        let wo_local = self.frame.to_local(wo);
        let (wi_local, f, pdf) = bxdf.sample_f(wo_local, remapped)?;

        let (f, pdf) = if bxdf.is_specular() || n == 1 {
            (f, pdf / n as f32)
        } else {
            let f: Color = self.lobes.iter().map(|b| b.f(wo_local, wi_local)).sum();
            let pdf: f32 = self.lobes.iter().map(|b| b.pdf(wo_local, wi_local)).sum();
            (f, pdf / n as f32)
        };

        Some(BsdfSample {
            wi: self.frame.to_world(wi_local),
            pdf,
            f,
            specular: bxdf.is_specular(),
        })
    }

    /// Sample lobe `index` on its own, ignoring the others.
    pub fn sample_lobe(&self, index: usize, wo: Vec3, u: Vec2) -> Option<BsdfSample> {
        let bxdf = self.lobes.get(index)?;
        let (wi, f, pdf) = bxdf.sample_f(self.frame.to_local(wo), u)?;
        Some(BsdfSample {
            wi: self.frame.to_world(wi),
            pdf,
            f,
            specular: bxdf.is_specular(),
        })
    }

    /// Hemispherical-directional reflectance estimated with `n` stratified
    /// samples. Used to check energy conservation.
    pub fn albedo(&self, wo: Vec3, n: u32) -> Color {
        let mut sum = Color::ZERO;
        for i in 0..n {
            for j in 0..n {
                let u = Vec2::new((i as f32 + 0.5) / n as f32, (j as f32 + 0.5) / n as f32);
                if let Some(s) = self.sample(wo, u) {
                    if s.pdf > 0.0 {
                        sum += s.f * s.wi.dot(self.frame.normal).abs() / s.pdf;
                    }
                }
            }
        }
        sum / (n * n) as f32
    }
}

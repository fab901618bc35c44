//! Material trait for surface scattering.

use crate::bsdf::{Bsdf, Bxdf};
use crate::error::RenderError;
use crate::interaction::SurfaceInteraction;
use ember_math::Vec3;

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Rec. 709 luminance of a linear RGB color.
#[inline]
pub fn luminance(c: Color) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Build the BSDF at a surface point.
    ///
    /// Returning `None` marks the surface as non-scattering; rays pass through.
    fn compute_scattering(&self, si: &SurfaceInteraction<'_>) -> Option<Bsdf>;

    /// Radiance emitted from the front face. Most materials return black.
    fn emitted(&self) -> Color {
        Color::ZERO
    }

    fn is_emissive(&self) -> bool {
        self.emitted().max_element() > 0.0
    }

    /// Checked once when the scene is prepared. Materials whose scattering is
    /// not available report it here instead of shading incorrectly.
    fn check_supported(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn compute_scattering(&self, si: &SurfaceInteraction<'_>) -> Option<Bsdf> {
        Some(Bsdf::new(si.frame, Bxdf::Lambertian { reflectance: self.albedo }))
    }
}

/// Rough diffuse material (Oren-Nayar). `sigma` is the facet slope
/// standard deviation in degrees; zero degenerates to Lambertian.
#[derive(Debug, Clone)]
pub struct OrenNayar {
    albedo: Color,
    sigma: f32,
}

impl OrenNayar {
    pub fn new(albedo: Color, sigma: f32) -> Self {
        Self {
            albedo,
            sigma: sigma.clamp(0.0, 90.0),
        }
    }
}

impl Material for OrenNayar {
    fn compute_scattering(&self, si: &SurfaceInteraction<'_>) -> Option<Bsdf> {
        let bxdf = if self.sigma == 0.0 {
            Bxdf::Lambertian { reflectance: self.albedo }
        } else {
            Bxdf::oren_nayar(self.albedo, self.sigma)
        };
        Some(Bsdf::new(si.frame, bxdf))
    }
}

/// Perfect mirror.
#[derive(Debug, Clone)]
pub struct Mirror {
    reflectance: Color,
}

impl Mirror {
    pub fn new(reflectance: Color) -> Self {
        Self { reflectance }
    }
}

impl Material for Mirror {
    fn compute_scattering(&self, si: &SurfaceInteraction<'_>) -> Option<Bsdf> {
        Some(Bsdf::new(
            si.frame,
            Bxdf::SpecularReflection { reflectance: self.reflectance },
        ))
    }
}

/// Diffuse base coat under a perfect mirror coat.
///
/// Energy conservation is up to the caller: keep `albedo + specular` at or below one.
#[derive(Debug, Clone)]
pub struct Glossy {
    albedo: Color,
    specular: Color,
}

impl Glossy {
    pub fn new(albedo: Color, specular: Color) -> Self {
        Self { albedo, specular }
    }
}

impl Material for Glossy {
    fn compute_scattering(&self, si: &SurfaceInteraction<'_>) -> Option<Bsdf> {
        Some(
            Bsdf::new(si.frame, Bxdf::Lambertian { reflectance: self.albedo })
                .with_lobe(Bxdf::SpecularReflection { reflectance: self.specular }),
        )
    }
}

/// Glass-like material. Refraction is not supported yet, so scenes using it
/// are rejected by [`crate::Scene::ensure_accelerator`].
#[derive(Debug, Clone)]
pub struct Dielectric {
    pub albedo: Color,
    pub ior: f32,
}

impl Dielectric {
    pub fn new(albedo: Color, ior: f32) -> Self {
        Self { albedo, ior }
    }
}

impl Material for Dielectric {
    fn compute_scattering(&self, _si: &SurfaceInteraction<'_>) -> Option<Bsdf> {
        None
    }

    fn check_supported(&self) -> Result<(), RenderError> {
        Err(RenderError::NotImplemented("dielectric refraction"))
    }
}

/// Diffuse emitter. Primitives using it become area lights.
///
/// The surface itself reflects like a Lambertian with `albedo`, black by default.
#[derive(Debug, Clone)]
pub struct DiffuseLight {
    emit: Color,
    albedo: Color,
}

impl DiffuseLight {
    pub fn new(emit: Color) -> Self {
        Self {
            emit,
            albedo: Color::ZERO,
        }
    }

    pub fn with_albedo(mut self, albedo: Color) -> Self {
        self.albedo = albedo;
        self
    }
}

impl Material for DiffuseLight {
    fn compute_scattering(&self, si: &SurfaceInteraction<'_>) -> Option<Bsdf> {
        Some(Bsdf::new(si.frame, Bxdf::Lambertian { reflectance: self.albedo }))
    }

    fn emitted(&self) -> Color {
        self.emit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(Color::ONE) - 1.0).abs() < 1e-6);
        assert!((luminance(Color::new(0.0, 1.0, 0.0)) - 0.7152).abs() < 1e-6);
        assert_eq!(luminance(Color::ZERO), 0.0);
    }

    #[test]
    fn test_only_dielectric_is_unsupported() {
        assert!(Lambertian::new(Color::ONE).check_supported().is_ok());
        assert!(Glossy::new(Color::splat(0.5), Color::splat(0.3)).check_supported().is_ok());
        assert!(matches!(
            Dielectric::new(Color::ONE, 1.5).check_supported(),
            Err(RenderError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_emissive_defaults() {
        assert!(!Lambertian::new(Color::ONE).is_emissive());
        assert!(!Mirror::new(Color::ONE).is_emissive());
        assert!(DiffuseLight::new(Color::new(0.0, 0.0, 4.0)).is_emissive());
        assert!(!DiffuseLight::new(Color::ZERO).is_emissive());
    }
}

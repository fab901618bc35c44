//! Scene container: primitives, lights, background and the accelerator.

use crate::bvh::{Bvh, BvhOptions, SplitMethod};
use crate::error::RenderError;
use crate::interaction::SurfaceInteraction;
use crate::light::{AreaLight, Light};
use crate::material::Color;
use crate::primitive::Primitive;
use ember_math::{Aabb, Interval, Ray};
use serde::{Deserialize, Serialize};

const SUNSET_RED: Color = Color::new(0.725, 0.268, 0.152);
const SUNSET_BLUE: Color = Color::new(0.18, 0.296, 0.952);

/// Radiance returned for rays that leave the scene.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Background {
    #[default]
    Black,
    Solid { color: Color },
    /// Vertical gradient from a warm horizon to a blue zenith.
    Sky,
}

impl Background {
    pub fn radiance(&self, ray: &Ray) -> Color {
        match *self {
            Background::Black => Color::ZERO,
            Background::Solid { color } => color,
            Background::Sky => {
                let dir = ray.direction.normalize_or_zero();
                let t = ((dir.y + 0.5) / 1.2).clamp(0.0, 1.0);
                SUNSET_RED * (1.0 - t) + SUNSET_BLUE * t
            }
        }
    }
}

/// Everything a render needs to trace rays.
///
/// Mutating the scene marks it dirty; [`Scene::ensure_accelerator`] must run
/// before queries see the new content.
#[derive(Default)]
pub struct Scene {
    primitives: Vec<Primitive>,
    lights: Vec<Light>,
    accelerator: Option<Bvh>,
    dirty: bool,
    bvh_options: BvhOptions,
    background: Background,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bvh_options(mut self, options: BvhOptions) -> Self {
        self.bvh_options = options;
        self.dirty = true;
        self
    }

    pub fn set_split_method(&mut self, split_method: SplitMethod) {
        if self.bvh_options.split_method != split_method {
            self.bvh_options.split_method = split_method;
            self.dirty = true;
        }
    }

    pub fn split_method(&self) -> SplitMethod {
        self.bvh_options.split_method
    }

    /// Seed for the equal-counts axis choice.
    pub fn set_bvh_seed(&mut self, seed: u64) {
        if self.bvh_options.seed != seed {
            self.bvh_options.seed = seed;
            self.dirty = true;
        }
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Append a primitive. Emissive primitives are also registered as area lights.
    pub fn add_primitive(&mut self, primitive: Primitive) {
        if let Some(light) = AreaLight::from_primitive(&primitive) {
            self.lights.push(Light::Area(light));
        }
        self.primitives.push(primitive);
        self.dirty = true;
    }

    pub fn add_light(&mut self, light: impl Into<Light>) {
        self.lights.push(light.into());
        self.dirty = true;
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn accelerator(&self) -> Option<&Bvh> {
        self.accelerator.as_ref()
    }

    /// True when the accelerator matches the current primitives.
    pub fn is_ready(&self) -> bool {
        !self.dirty && self.accelerator.is_some()
    }

    /// Bounds of all primitives. Degenerate box at the origin when empty.
    pub fn bounds(&self) -> Aabb {
        crate::bvh::bound_primitives(&self.primitives)
    }

    /// Rebuild the accelerator if anything changed since the last build.
    pub fn ensure_accelerator(&mut self) -> Result<(), RenderError> {
        if self.is_ready() {
            return Ok(());
        }
        if self.primitives.is_empty() {
            return Err(RenderError::EmptyScene);
        }
        for material in self.primitives.iter().filter_map(Primitive::material) {
            material.check_supported()?;
        }

        let bvh = Bvh::build(&self.primitives, self.bvh_options)?;
        let bounds = bvh.bounds();
        for light in &mut self.lights {
            light.preprocess(&bounds);
        }

        log::info!(
            "Scene ready: {} primitives, {} lights",
            self.primitives.len(),
            self.lights.len()
        );

        self.accelerator = Some(bvh);
        self.dirty = false;
        Ok(())
    }

    /// Nearest surface hit inside `ray_t`. A stale scene reports a miss.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceInteraction<'_>> {
        if self.dirty {
            return None;
        }
        let bvh = self.accelerator.as_ref()?;
        let found = bvh.intersect(&self.primitives, ray, ray_t)?;
        Some(SurfaceInteraction::new(ray, found.hit, &self.primitives[found.primitive]))
    }

    /// Whether anything blocks the ray inside `ray_t`. A stale scene reports a miss.
    pub fn has_intersect(&self, ray: &Ray, ray_t: Interval) -> bool {
        if self.dirty {
            return false;
        }
        self.accelerator
            .as_ref()
            .is_some_and(|bvh| bvh.intersect_any(&self.primitives, ray, ray_t))
    }

    /// Pick a light uniformly. Returns the light and its selection probability.
    pub fn sample_light(&self, u: f32) -> Option<(&Light, f32)> {
        let n = self.lights.len();
        if n == 0 {
            return None;
        }
        let index = ((u * n as f32) as usize).min(n - 1);
        Some((&self.lights[index], 1.0 / n as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::PointLight;
    use crate::material::{Dielectric, DiffuseLight, Lambertian};
    use crate::Sphere;
    use ember_math::{Vec3, RAY_EPSILON};
    use std::sync::Arc;

    fn matte_sphere(center: Vec3) -> Primitive {
        Primitive::new(Sphere::new(center, 1.0), Arc::new(Lambertian::new(Color::splat(0.5))))
    }

    fn down_ray() -> (Ray, Interval) {
        (
            Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
            Interval::new(RAY_EPSILON, f32::INFINITY),
        )
    }

    #[test]
    fn test_empty_scene_fails_fast() {
        let mut scene = Scene::new();
        assert!(matches!(scene.ensure_accelerator(), Err(RenderError::EmptyScene)));
        assert!(!scene.is_ready());
    }

    #[test]
    fn test_dielectric_scene_is_rejected() {
        let mut scene = Scene::new();
        scene.add_primitive(matte_sphere(Vec3::ZERO));
        scene.add_primitive(Primitive::new(
            Sphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0),
            Arc::new(Dielectric::new(Color::ONE, 1.5)),
        ));
        assert!(matches!(scene.ensure_accelerator(), Err(RenderError::NotImplemented(_))));
        assert!(!scene.is_ready());
    }

    #[test]
    fn test_dirty_scene_reports_miss() {
        let mut scene = Scene::new();
        scene.add_primitive(matte_sphere(Vec3::ZERO));
        let (ray, t) = down_ray();

        assert!(!scene.is_ready());
        assert!(scene.intersect(&ray, t).is_none());
        assert!(!scene.has_intersect(&ray, t));

        scene.ensure_accelerator().unwrap();
        assert!(scene.is_ready());
        let si = scene.intersect(&ray, t).unwrap();
        assert!((si.t - 4.0).abs() < 1e-4);
        assert!(scene.has_intersect(&ray, t));

        // New content makes it stale again until rebuilt.
        scene.add_primitive(matte_sphere(Vec3::new(0.0, 2.5, 0.0)));
        assert!(scene.intersect(&ray, t).is_none());
        scene.ensure_accelerator().unwrap();
        assert!((scene.intersect(&ray, t).unwrap().t - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_emissive_primitive_registers_area_light() {
        let mut scene = Scene::new();
        scene.add_primitive(matte_sphere(Vec3::ZERO));
        assert!(scene.lights().is_empty());

        scene.add_primitive(Primitive::new(
            Sphere::new(Vec3::new(0.0, 4.0, 0.0), 0.5),
            Arc::new(DiffuseLight::new(Color::splat(3.0))),
        ));
        assert_eq!(scene.lights().len(), 1);
        assert!(matches!(scene.lights()[0], Light::Area(_)));
    }

    #[test]
    fn test_sample_light_uniform() {
        let mut scene = Scene::new();
        assert!(scene.sample_light(0.5).is_none());

        scene.add_light(PointLight::new(Vec3::ZERO, Color::ONE));
        scene.add_light(PointLight::new(Vec3::ONE, Color::ONE));

        let (_, pdf) = scene.sample_light(0.0).unwrap();
        assert_eq!(pdf, 0.5);
        let (last, _) = scene.sample_light(0.999_999).unwrap();
        assert!(matches!(last, Light::Point(p) if p.position == Vec3::ONE));
        // u == 1.0 still maps to a valid light
        assert!(scene.sample_light(1.0).is_some());
    }

    #[test]
    fn test_sky_background_gradient() {
        let up = Ray::new(Vec3::ZERO, Vec3::Y);
        let down = Ray::new(Vec3::ZERO, -Vec3::Y);

        assert_eq!(Background::Sky.radiance(&up), SUNSET_BLUE);
        assert_eq!(Background::Sky.radiance(&down), SUNSET_RED);
        assert_eq!(Background::Black.radiance(&up), Color::ZERO);
        let solid = Background::Solid { color: Color::splat(0.25) };
        assert_eq!(solid.radiance(&down), Color::splat(0.25));
    }

    #[test]
    fn test_split_method_change_marks_dirty() {
        let mut scene = Scene::new();
        scene.add_primitive(matte_sphere(Vec3::ZERO));
        scene.ensure_accelerator().unwrap();

        scene.set_split_method(SplitMethod::Sah);
        assert!(scene.is_ready());
        scene.set_split_method(SplitMethod::EqualCounts);
        assert!(!scene.is_ready());
    }
}

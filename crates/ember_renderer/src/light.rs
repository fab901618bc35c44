//! Light sources.
//!
//! Lights are a closed set, so they are an enum rather than trait objects.
//! Emissive primitives become [`Light::Area`] when added to a scene.

use crate::interaction::SurfaceInteraction;
use crate::material::Color;
use crate::primitive::Primitive;
use crate::scene::Scene;
use ember_math::{Aabb, Interval, Ray, Vec2, Vec3};
use std::f32::consts::PI;

/// Shadow ray that must be unobstructed for a light sample to count.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityTester {
    pub ray: Ray,
    pub ray_t: Interval,
}

impl VisibilityTester {
    pub fn unoccluded(&self, scene: &Scene) -> bool {
        !scene.has_intersect(&self.ray, self.ray_t)
    }
}

/// Incident radiance sampled from a light towards a surface point.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// Unit direction from the surface towards the light
    pub wi: Vec3,
    /// Solid-angle density, 1 for delta lights
    pub pdf: f32,
    pub radiance: Color,
    pub visibility: VisibilityTester,
}

/// Isotropic point light. Radiance falls off as `1/d^2`.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: Color,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: Color) -> Self {
        Self { position, intensity }
    }
}

/// Light arriving from a single direction, like the sun.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    /// Direction the light travels in (unit)
    pub direction: Vec3,
    pub radiance: Color,
    world_radius: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, radiance: Color) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            radiance,
            world_radius: 0.0,
        }
    }
}

/// One-sided diffuse emitter attached to a primitive.
#[derive(Clone)]
pub struct AreaLight {
    primitive: Primitive,
    emit: Color,
}

impl AreaLight {
    /// `None` when the primitive does not emit.
    pub fn from_primitive(primitive: &Primitive) -> Option<Self> {
        primitive.is_emissive().then(|| Self {
            primitive: primitive.clone(),
            emit: primitive.emitted(),
        })
    }
}

#[derive(Clone)]
pub enum Light {
    Point(PointLight),
    Directional(DirectionalLight),
    Area(AreaLight),
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Light::Point(light)
    }
}

impl From<DirectionalLight> for Light {
    fn from(light: DirectionalLight) -> Self {
        Light::Directional(light)
    }
}

impl Light {
    /// True for lights that can only be reached by explicit sampling.
    pub fn is_delta(&self) -> bool {
        matches!(self, Light::Point(_) | Light::Directional(_))
    }

    /// Let the light see the scene extent before rendering.
    pub fn preprocess(&mut self, scene_bounds: &Aabb) {
        if let Light::Directional(light) = self {
            light.world_radius = 0.5 * scene_bounds.extents().length();
        }
    }

    /// Sample a direction towards the light from `si`.
    ///
    /// Returns `None` when the sample carries no energy (degenerate geometry,
    /// back side of an emitter).
    pub fn sample_incident(&self, si: &SurfaceInteraction<'_>, u: Vec2) -> Option<LightSample> {
        match self {
            Light::Point(light) => {
                let to_light = light.position - si.p;
                let d2 = to_light.length_squared();
                if d2 == 0.0 {
                    return None;
                }
                let (ray, ray_t) = si.spawn_ray_to(light.position);
                Some(LightSample {
                    wi: to_light / d2.sqrt(),
                    pdf: 1.0,
                    radiance: light.intensity / d2,
                    visibility: VisibilityTester { ray, ray_t },
                })
            }
            Light::Directional(light) => {
                let wi = -light.direction;
                let (ray, ray_t) = si.spawn_ray(wi);
                Some(LightSample {
                    wi,
                    pdf: 1.0,
                    radiance: light.radiance,
                    visibility: VisibilityTester { ray, ray_t },
                })
            }
            Light::Area(light) => {
                let area = light.primitive.area();
                if area <= 0.0 {
                    return None;
                }
                let (p, n) = light.primitive.sample(u);
                let to_light = p - si.p;
                let d2 = to_light.length_squared();
                if d2 == 0.0 {
                    return None;
                }
                let wi = to_light / d2.sqrt();
                let cos_light = n.dot(-wi);
                if cos_light <= 0.0 {
                    return None;
                }
                let (ray, ray_t) = si.spawn_ray_to(p);
                Some(LightSample {
                    wi,
                    pdf: d2 / (cos_light * area),
                    radiance: light.emit,
                    visibility: VisibilityTester { ray, ray_t },
                })
            }
        }
    }

    /// Total emitted power.
    pub fn power(&self) -> Color {
        match self {
            Light::Point(light) => 4.0 * PI * light.intensity,
            Light::Directional(light) => {
                PI * light.world_radius * light.world_radius * light.radiance
            }
            Light::Area(light) => PI * light.primitive.area() * light.emit,
        }
    }
}

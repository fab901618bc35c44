//! Surface interactions: everything the integrator needs at a hit point.

use crate::bsdf::Bsdf;
use crate::hittable::Hit;
use crate::material::Color;
use crate::primitive::Primitive;
use ember_math::{Interval, Ray, Vec3, RAY_EPSILON};

/// Orthonormal shading basis with `normal` as local +z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Build a frame around a unit normal.
    pub fn from_normal(normal: Vec3) -> Self {
        let (tangent, bitangent) = normal.any_orthonormal_pair();
        Self {
            tangent,
            bitangent,
            normal,
        }
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }
}

/// A ray-surface hit resolved against the primitive that was hit.
#[derive(Clone)]
pub struct SurfaceInteraction<'a> {
    pub p: Vec3,
    /// Geometric normal, facing the incoming ray
    pub normal: Vec3,
    pub front_face: bool,
    /// Direction towards where the ray came from
    pub wo: Vec3,
    pub frame: Frame,
    pub u: f32,
    pub v: f32,
    pub t: f32,
    pub time: f32,
    pub primitive: &'a Primitive,
}

impl<'a> SurfaceInteraction<'a> {
    pub fn new(ray: &Ray, hit: Hit, primitive: &'a Primitive) -> Self {
        let normal = hit.normal.normalize_or_zero();
        Self {
            p: hit.p,
            normal,
            front_face: hit.front_face,
            wo: -ray.direction.normalize_or_zero(),
            frame: Frame::from_normal(normal),
            u: hit.u,
            v: hit.v,
            t: hit.t,
            time: ray.time,
            primitive,
        }
    }

    /// The BSDF at this point, or `None` when the primitive has no material
    /// (or the material declines to scatter).
    pub fn compute_scattering(&self) -> Option<Bsdf> {
        self.primitive.material()?.compute_scattering(self)
    }

    /// Emitted radiance towards `wo`. Emitters are one-sided.
    pub fn emitted(&self) -> Color {
        if self.front_face {
            self.primitive.emitted()
        } else {
            Color::ZERO
        }
    }

    /// Origin nudged off the surface onto the side `w` points to.
    fn offset_origin(&self, w: Vec3) -> Vec3 {
        let offset = self.normal * RAY_EPSILON;
        if w.dot(self.normal) >= 0.0 {
            self.p + offset
        } else {
            self.p - offset
        }
    }

    /// Secondary ray leaving the surface in direction `wi`.
    pub fn spawn_ray(&self, wi: Vec3) -> (Ray, Interval) {
        let ray = Ray::normalized(self.offset_origin(wi), wi).with_time(self.time);
        (ray, Interval::new(RAY_EPSILON, f32::INFINITY))
    }

    /// Shadow ray towards `target`, stopping just short of it.
    pub fn spawn_ray_to(&self, target: Vec3) -> (Ray, Interval) {
        let origin = self.offset_origin(target - self.p);
        let to_target = target - origin;
        let distance = to_target.length();
        let ray = Ray::normalized(origin, to_target).with_time(self.time);
        (ray, Interval::new(RAY_EPSILON, distance - RAY_EPSILON))
    }
}

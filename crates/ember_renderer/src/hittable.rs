//! Hittable and Shape traits plus the geometric hit record.

use ember_math::{Aabb, Interval, Ray, Vec2, Vec3};
use std::sync::Arc;

/// Geometric record of a ray-surface intersection.
///
/// Carries no material; the primitive that owns the shape attaches one when
/// the hit is turned into a [`crate::SurfaceInteraction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    pub u: f32,
    pub v: f32,
}

impl Hit {
    /// Build a hit, orienting `outward_normal` against the ray.
    pub fn new(ray: &Ray, t: f32, outward_normal: Vec3, u: f32, v: f32) -> Self {
        let mut hit = Self {
            t,
            p: ray.at(t),
            normal: outward_normal,
            front_face: true,
            u,
            v,
        };
        hit.set_face_normal(ray, outward_normal);
        hit
    }

    /// Set the face normal based on ray direction and outward normal.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        // If the ray and normal point in the same direction, we're inside
        self.front_face = ray.direction.dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Nearest intersection with `t` inside `ray_t`, if any.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit>;

    /// Whether any intersection exists inside `ray_t`.
    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.hit(ray, ray_t).is_some()
    }

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;
}

impl<T: Hittable + ?Sized> Hittable for Arc<T> {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit> {
        (**self).hit(ray, ray_t)
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        (**self).hit_any(ray, ray_t)
    }

    fn bounding_box(&self) -> Aabb {
        (**self).bounding_box()
    }
}

/// A hittable surface that can also be sampled by area, so it can emit light.
pub trait Shape: Hittable {
    /// Surface area in object space.
    fn area(&self) -> f32;

    /// Uniformly sample a point on the surface from `u` in `[0,1)^2`.
    ///
    /// Returns the point and its outward unit normal.
    fn sample(&self, u: Vec2) -> (Vec3, Vec3);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_front_face() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = Hit::new(&ray, 4.0, Vec3::Z, 0.0, 0.0);

        assert!(hit.front_face);
        assert_eq!(hit.normal, Vec3::Z);
        assert_eq!(hit.p, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_hit_back_face_flips_normal() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        let hit = Hit::new(&ray, 1.0, Vec3::Z, 0.0, 0.0);

        assert!(!hit.front_face);
        assert_eq!(hit.normal, -Vec3::Z);
    }
}

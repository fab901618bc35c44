//! Parallelogram shape, used for walls and rectangular lights.

use crate::hittable::{Hit, Hittable, Shape};
use ember_math::{Aabb, Interval, Ray, Vec2, Vec3};

/// Parallelogram with corner `q` and edge vectors `u` and `v`.
///
/// The front face is on the side of `u x v`.
#[derive(Debug, Clone)]
pub struct Quad {
    q: Vec3,
    u: Vec3,
    v: Vec3,
    /// `n / dot(n, n)` with `n = u x v`, for planar coordinates
    w: Vec3,
    normal: Vec3,
    d: f32,
    area: f32,
    bbox: Aabb,
}

impl Quad {
    pub fn new(q: Vec3, u: Vec3, v: Vec3) -> Self {
        let n = u.cross(v);
        let normal = n.normalize_or_zero();
        let w = if n.length_squared() > 0.0 {
            n / n.length_squared()
        } else {
            Vec3::ZERO
        };

        let diagonal0 = Aabb::from_points(q, q + u + v);
        let diagonal1 = Aabb::from_points(q + u, q + v);

        Self {
            q,
            u,
            v,
            w,
            normal,
            d: normal.dot(q),
            area: n.length(),
            bbox: Aabb::surrounding(&diagonal0, &diagonal1),
        }
    }
}

impl Hittable for Quad {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit> {
        let denom = self.normal.dot(ray.direction);

        // Ray is parallel to the plane
        if denom.abs() < 1e-8 {
            return None;
        }

        let t = (self.d - self.normal.dot(ray.origin)) / denom;
        if !ray_t.surrounds(t) {
            return None;
        }

        let planar = ray.at(t) - self.q;
        let alpha = self.w.dot(planar.cross(self.v));
        let beta = self.w.dot(self.u.cross(planar));
        if !(0.0..=1.0).contains(&alpha) || !(0.0..=1.0).contains(&beta) {
            return None;
        }

        Some(Hit::new(ray, t, self.normal, alpha, beta))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Shape for Quad {
    fn area(&self) -> f32 {
        self.area
    }

    fn sample(&self, u: Vec2) -> (Vec3, Vec3) {
        (self.q + u.x * self.u + u.y * self.v, self.normal)
    }
}

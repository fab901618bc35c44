//! Triangle shape.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::hittable::{Hit, Hittable, Shape};
use crate::sampling::uniform_sample_triangle;
use ember_math::{Aabb, Interval, Ray, Vec2, Vec3};

/// A single triangle with a flat face normal.
#[derive(Debug, Clone)]
pub struct Triangle {
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Unit face normal, zero for degenerate triangles
    normal: Vec3,
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices (counter-clockwise front face).
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        let bbox = Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2));

        Self {
            v0,
            v1,
            v2,
            normal,
            bbox,
        }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(Hit::new(ray, t, self.normal, u, v))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Shape for Triangle {
    fn area(&self) -> f32 {
        0.5 * (self.v1 - self.v0).cross(self.v2 - self.v0).length()
    }

    fn sample(&self, u: Vec2) -> (Vec3, Vec3) {
        let b = uniform_sample_triangle(u);
        let p = b.x * self.v0 + b.y * self.v1 + (1.0 - b.x - b.y) * self.v2;
        (p, self.normal)
    }
}

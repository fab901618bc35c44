// Transform helpers for Mat4
//
// glam already provides transform_point3, transform_vector3 and inverse; these
// cover the pieces a ray tracer needs on top of that.

use glam::{Mat4, Vec3};
use crate::{Aabb, Ray};

/// Extension trait for object-to-world matrices.
pub trait Mat4Ext {
    /// Transform a surface normal. `self` must be the *inverse* of the
    /// object-to-world matrix; the result is normalized.
    fn transform_normal_by_inverse(&self, normal: Vec3) -> Vec3;

    /// Bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transform origin as a point and direction as a vector.
    ///
    /// The direction is not renormalized, so `t` values stay valid across spaces.
    fn transform_ray(&self, ray: &Ray) -> Ray;
}

impl Mat4Ext for Mat4 {
    fn transform_normal_by_inverse(&self, normal: Vec3) -> Vec3 {
        self.transpose().transform_vector3(normal).normalize_or_zero()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return *aabb;
        }

        let (lo, hi) = (aabb.min(), aabb.max());
        let mut result_min = Vec3::splat(f32::INFINITY);
        let mut result_max = Vec3::splat(f32::NEG_INFINITY);

        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            let p = self.transform_point3(corner);
            result_min = result_min.min(p);
            result_max = result_max.max(p);
        }

        Aabb::from_points(result_min, result_max)
    }

    fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform_point3(ray.origin),
            self.transform_vector3(ray.direction),
        )
        .with_time(ray.time)
    }
}

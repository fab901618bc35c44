//! Primitives couple a shape with its material and placement.

use crate::hittable::{Hit, Hittable, Shape};
use crate::material::{Color, Material};
use ember_math::{Aabb, Interval, Mat4, Mat4Ext, Ray, Vec2, Vec3};
use std::sync::Arc;

#[derive(Clone)]
struct Placement {
    object_to_world: Mat4,
    world_to_object: Mat4,
    /// Area scale for similarity transforms (uniform scale, rotation, translation)
    area_scale: f32,
}

/// A shape placed in the scene together with its material.
///
/// Cheap to clone: shape and material are shared.
#[derive(Clone)]
pub struct Primitive {
    shape: Arc<dyn Shape>,
    material: Option<Arc<dyn Material>>,
    placement: Option<Placement>,
    bbox: Aabb,
}

impl Primitive {
    pub fn new(shape: impl Shape + 'static, material: Arc<dyn Material>) -> Self {
        Self::from_shared(Arc::new(shape), Some(material))
    }

    /// A primitive with no material. Rays that reach it pass straight through.
    pub fn without_material(shape: impl Shape + 'static) -> Self {
        Self::from_shared(Arc::new(shape), None)
    }

    pub fn from_shared(shape: Arc<dyn Shape>, material: Option<Arc<dyn Material>>) -> Self {
        let bbox = shape.bounding_box();
        Self {
            shape,
            material,
            placement: None,
            bbox,
        }
    }

    /// Place the shape with an object-to-world matrix.
    pub fn with_transform(mut self, object_to_world: Mat4) -> Self {
        let linear_det = object_to_world.determinant().abs();
        self.bbox = object_to_world.transform_aabb(&self.shape.bounding_box());
        self.placement = Some(Placement {
            object_to_world,
            world_to_object: object_to_world.inverse(),
            area_scale: linear_det.powf(2.0 / 3.0),
        });
        self
    }

    pub fn material(&self) -> Option<&dyn Material> {
        self.material.as_deref()
    }

    pub fn is_emissive(&self) -> bool {
        self.material.as_ref().is_some_and(|m| m.is_emissive())
    }

    /// Radiance leaving the front face.
    pub fn emitted(&self) -> Color {
        self.material
            .as_ref()
            .map_or(Color::ZERO, |m| m.emitted())
    }

    /// World-space surface area.
    pub fn area(&self) -> f32 {
        let area = self.shape.area();
        match &self.placement {
            Some(placement) => area * placement.area_scale,
            None => area,
        }
    }

    /// Uniformly sample a world-space point and outward normal on the surface.
    pub fn sample(&self, u: Vec2) -> (Vec3, Vec3) {
        let (p, n) = self.shape.sample(u);
        match &self.placement {
            Some(placement) => (
                placement.object_to_world.transform_point3(p),
                placement.world_to_object.transform_normal_by_inverse(n),
            ),
            None => (p, n),
        }
    }
}

impl Hittable for Primitive {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit> {
        let Some(placement) = &self.placement else {
            return self.shape.hit(ray, ray_t);
        };

        // Direction is not renormalized, so t is shared between spaces.
        let object_ray = placement.world_to_object.transform_ray(ray);
        let mut hit = self.shape.hit(&object_ray, ray_t)?;
        hit.p = placement.object_to_world.transform_point3(hit.p);
        hit.normal = placement.world_to_object.transform_normal_by_inverse(hit.normal);
        Some(hit)
    }

    fn hit_any(&self, ray: &Ray, ray_t: Interval) -> bool {
        match &self.placement {
            Some(placement) => self
                .shape
                .hit_any(&placement.world_to_object.transform_ray(ray), ray_t),
            None => self.shape.hit_any(ray, ray_t),
        }
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

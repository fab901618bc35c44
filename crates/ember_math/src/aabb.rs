use crate::{Interval, Ray, Vec3};

/// Minimum width of an axis built by [`Aabb::from_points`].
const MIN_AXIS_WIDTH: f32 = 0.0001;

/// Axis-aligned bounding box used by the BVH.
///
/// An AABB is defined by three intervals (one per axis). [`Aabb::EMPTY`] has
/// inverted intervals so that folding [`Aabb::surrounding`] from it is an
/// identity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an AABB from two corner points.
    ///
    /// Zero-width axes are padded so flat shapes still pass the slab test.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let x = Interval::new(a.x.min(b.x), a.x.max(b.x));
        let y = Interval::new(a.y.min(b.y), a.y.max(b.y));
        let z = Interval::new(a.z.min(b.z), a.z.max(b.z));

        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Tightest box containing both boxes. Never pads.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Union of a sequence of boxes.
    ///
    /// An empty sequence yields a degenerate box at the origin rather than
    /// [`Aabb::EMPTY`].
    pub fn enclosing<I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = Aabb>,
    {
        let mut boxes = boxes.into_iter().peekable();
        if boxes.peek().is_none() {
            return Aabb::from_points(Vec3::ZERO, Vec3::ZERO);
        }
        boxes.fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, &b))
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Size of the box along each axis.
    pub fn extents(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Sum of the six face areas. Zero for an empty box.
    ///
    /// Only meaningful as a relative traversal-cost proxy.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extents();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains_box(&self, other: &Aabb) -> bool {
        other.is_empty()
            || (0..3).all(|axis| {
                let outer = self.axis_interval(axis);
                let inner = other.axis_interval(axis);
                outer.min <= inner.min && inner.max <= outer.max
            })
    }

    /// Slab test: does the ray pass through this box anywhere inside `ray_t`?
    pub fn hit(&self, r: &Ray, mut ray_t: Interval) -> bool {
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let adinv = 1.0 / r.direction[axis];
            let origin = r.origin[axis];

            let mut t0 = (slab.min - origin) * adinv;
            let mut t1 = (slab.max - origin) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            // NaN (0 * inf) when the origin lies on a slab plane of a parallel ray;
            // max/min then keep the running bound.
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max < ray_t.min {
                return false;
            }
        }

        true
    }

    fn pad_to_minimums(&mut self) {
        if self.x.size() < MIN_AXIS_WIDTH {
            self.x = self.x.expand(MIN_AXIS_WIDTH);
        }
        if self.y.size() < MIN_AXIS_WIDTH {
            self.y = self.y.expand(MIN_AXIS_WIDTH);
        }
        if self.z.size() < MIN_AXIS_WIDTH {
            self.z = self.z.expand(MIN_AXIS_WIDTH);
        }
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points_orders_corners() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min(), Vec3::ZERO);
        assert_eq!(aabb.max(), Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_from_points_pads_flat_axis() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0));
        assert!(aabb.y.size() > 0.0);
        assert!(aabb.y.contains(0.0));
    }

    #[test]
    fn test_aabb_surrounding_contains_both() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0));
        let box2 = Aabb::from_points(Vec3::new(3.0, -2.0, 3.0), Vec3::new(10.0, 1.0, 10.0));
        let surrounding = Aabb::surrounding(&box1, &box2);

        assert!(surrounding.contains_box(&box1));
        assert!(surrounding.contains_box(&box2));
        assert_eq!(surrounding.min(), Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(surrounding.max(), Vec3::new(10.0, 5.0, 10.0));
    }

    #[test]
    fn test_aabb_empty_is_union_identity() {
        let a = Aabb::from_points(Vec3::new(-1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));

        assert_eq!(Aabb::surrounding(&a, &Aabb::EMPTY), a);
        assert_eq!(Aabb::surrounding(&Aabb::EMPTY, &a), a);
        assert_eq!(Aabb::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn test_aabb_zero_box_is_not_union_identity() {
        // A zero-initialized box drags the union towards the origin.
        let a = Aabb::from_points(Vec3::splat(2.0), Vec3::splat(3.0));
        let zero = Aabb::new(Interval::new(0.0, 0.0), Interval::new(0.0, 0.0), Interval::new(0.0, 0.0));

        assert_ne!(Aabb::surrounding(&a, &zero), a);
    }

    #[test]
    fn test_aabb_enclosing_empty_is_degenerate_origin_box() {
        let aabb = Aabb::enclosing(std::iter::empty());
        assert!(!aabb.is_empty());
        assert!(aabb.centroid().length() < 1e-6);
    }

    #[test]
    fn test_aabb_surface_area() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        // 2 * (1*2 + 2*3 + 3*1)
        assert!((aabb.surface_area() - 22.0).abs() < 1e-5);
        assert_eq!(aabb.extents(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.hit(&ray, Interval::new(0.0, 100.0)));

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));

        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));
    }

    #[test]
    fn test_aabb_hit_respects_t_max() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));

        // Box starts at t=4.
        assert!(!aabb.hit(&ray, Interval::new(0.0, 3.5)));
        assert!(aabb.hit(&ray, Interval::new(0.0, 4.5)));
    }

    #[test]
    fn test_aabb_longest_axis() {
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }
}

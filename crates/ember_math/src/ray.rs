use crate::Vec3;

/// Offset used as the minimum `t` of every ray query and as the normal offset
/// when spawning secondary rays off a surface.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray in 3D space with origin, direction, and time.
///
/// The valid parametric range is not stored on the ray. Queries take it as a
/// separate [`crate::Interval`] so that narrowing `t_max` during traversal
/// never mutates shared state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub time: f32,
}

impl Ray {
    /// Create a ray at time zero. The direction is stored as given.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            time: 0.0,
        }
    }

    /// Create a ray with a unit-length direction.
    ///
    /// A zero direction stays zero instead of turning into NaN.
    pub fn normalized(origin: Vec3, direction: Vec3) -> Self {
        Self::new(origin, direction.normalize_or_zero())
    }

    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    /// Get the point along the ray at parameter t.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

//! Thin-lens perspective camera.

use crate::sampling::{concentric_sample_disk, gen_f32, gen_vec2};
use ember_math::{Ray, Vec3};
use rand::RngCore;

/// Camera for generating rays into the scene.
#[derive(Debug, Clone)]
pub struct Camera {
    image_width: u32,
    image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    // Lens settings
    vfov: f32,       // Vertical field of view in degrees
    aperture: f32,   // Lens diameter, 0 for a pinhole
    focus_dist: f32, // Distance from camera to plane of perfect focus

    // Cached computed values (set by initialize())
    center: Vec3,
    pixel00_corner: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f32,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::new(0.0, 0.0, 0.0),
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::new(0.0, 1.0, 0.0),
            vfov: 90.0,
            aperture: 0.0,
            focus_dist: 1.0,
            center: Vec3::ZERO,
            pixel00_corner: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            lens_radius: 0.0,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set lens settings. An `aperture` of zero gives a pinhole camera.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.aperture = aperture.max(0.0);
        self.focus_dist = focus_dist;
        self
    }

    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        self.center = self.look_from;

        // Calculate viewport dimensions
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * self.focus_dist;
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height as f32);

        // Calculate camera basis vectors
        self.w = (self.look_from - self.look_at).normalize_or_zero();
        if self.w == Vec3::ZERO {
            log::warn!("Camera look_from equals look_at ({:?}); looking down -Z", self.look_at);
            self.w = Vec3::Z;
        }
        self.u = self.vup.cross(self.w).normalize_or_zero();
        if self.u == Vec3::ZERO {
            log::warn!("Camera up vector {:?} is parallel to the view direction", self.vup);
            self.u = self.w.any_orthonormal_vector();
        }
        self.v = self.w.cross(self.u);

        // Image rows run top to bottom
        let viewport_u = viewport_width * self.u;
        let viewport_v = -viewport_height * self.v;

        self.pixel_delta_u = viewport_u / self.image_width as f32;
        self.pixel_delta_v = viewport_v / self.image_height as f32;
        self.pixel00_corner =
            self.center - self.focus_dist * self.w - viewport_u / 2.0 - viewport_v / 2.0;

        self.lens_radius = self.aperture / 2.0;
    }

    /// Generate a ray through a uniformly jittered point of pixel (i, j).
    pub fn get_ray(&self, i: u32, j: u32, rng: &mut dyn RngCore) -> Ray {
        let (dx, dy) = (gen_f32(rng), gen_f32(rng));

        let pixel_sample = self.pixel00_corner
            + (i as f32 + dx) * self.pixel_delta_u
            + (j as f32 + dy) * self.pixel_delta_v;

        let ray_origin = if self.lens_radius <= 0.0 {
            self.center
        } else {
            let d = self.lens_radius * concentric_sample_disk(gen_vec2(rng));
            self.center + d.x * self.u + d.y * self.v
        };

        Ray::normalized(ray_origin, pixel_sample - ray_origin)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

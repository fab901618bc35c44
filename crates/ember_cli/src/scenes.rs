//! Built-in demo scenes.

use clap::ValueEnum;
use ember_math::{Mat4, Quat, Vec3};
use ember_renderer::{
    Background, Camera, Color, DiffuseLight, Lambertian, Material, Mirror, OrenNayar, PointLight, Primitive, Quad,
    RenderConfig, Scene, Sphere,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoScene {
    /// Ground plane with a field of small spheres under a sunset sky
    Spheres,
    /// Cornell box lit by a ceiling quad
    Cornell,
}

impl DemoScene {
    /// Settings the scene was composed for.
    pub fn default_config(self) -> RenderConfig {
        match self {
            DemoScene::Spheres => RenderConfig {
                width: 800,
                height: 450,
                background: Background::Sky,
                ..Default::default()
            },
            DemoScene::Cornell => RenderConfig {
                width: 600,
                height: 600,
                samples_per_pixel: 128,
                background: Background::Black,
                ..Default::default()
            },
        }
    }

    pub fn build(self, seed: u64) -> (Scene, Camera) {
        match self {
            DemoScene::Spheres => spheres(seed),
            DemoScene::Cornell => cornell(),
        }
    }
}

fn spheres(seed: u64) -> (Scene, Camera) {
    let mut scene = Scene::new();
    let mut rng = StdRng::seed_from_u64(seed);

    let ground: Arc<dyn Material> = Arc::new(Lambertian::new(Color::new(0.5, 0.5, 0.5)));
    scene.add_primitive(Primitive::new(Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0), ground));

    for a in -8..8 {
        for b in -8..8 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let choose: f32 = rng.gen();
            let material: Arc<dyn Material> = if choose < 0.6 {
                let albedo = Color::new(rng.gen(), rng.gen(), rng.gen()) * Color::new(rng.gen(), rng.gen(), rng.gen());
                Arc::new(Lambertian::new(albedo))
            } else if choose < 0.85 {
                let albedo = Color::new(rng.gen_range(0.3..0.9), rng.gen_range(0.3..0.9), rng.gen_range(0.3..0.9));
                Arc::new(OrenNayar::new(albedo, rng.gen_range(10.0..40.0)))
            } else if choose < 0.95 {
                Arc::new(Mirror::new(Color::splat(rng.gen_range(0.6..0.95))))
            } else {
                Arc::new(DiffuseLight::new(Color::new(4.0, 3.2, 2.0)))
            };

            scene.add_primitive(Primitive::new(Sphere::new(center, 0.2), material));
        }
    }

    scene.add_primitive(Primitive::new(
        Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0),
        Arc::new(Mirror::new(Color::splat(0.9))),
    ));
    scene.add_primitive(Primitive::new(
        Sphere::new(Vec3::new(-4.0, 1.0, 0.0), 1.0),
        Arc::new(OrenNayar::new(Color::new(0.4, 0.2, 0.1), 20.0)),
    ));
    scene.add_primitive(Primitive::new(
        Sphere::new(Vec3::new(4.0, 1.0, 0.0), 1.0),
        Arc::new(Lambertian::new(Color::new(0.7, 0.6, 0.5))),
    ));

    scene.add_light(PointLight::new(Vec3::new(0.0, 12.0, 6.0), Color::new(120.0, 110.0, 95.0)));

    let camera = Camera::new()
        .with_position(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y)
        .with_lens(20.0, 0.1, 10.0);

    (scene, camera)
}

/// Six quads enclosing the box spanned by `a` and `b`.
fn box_quads(a: Vec3, b: Vec3) -> [Quad; 6] {
    let min = a.min(b);
    let max = a.max(b);
    let dx = Vec3::new(max.x - min.x, 0.0, 0.0);
    let dy = Vec3::new(0.0, max.y - min.y, 0.0);
    let dz = Vec3::new(0.0, 0.0, max.z - min.z);

    [
        Quad::new(Vec3::new(min.x, min.y, max.z), dx, dy),  // front
        Quad::new(Vec3::new(max.x, min.y, max.z), -dz, dy), // right
        Quad::new(Vec3::new(max.x, min.y, min.z), -dx, dy), // back
        Quad::new(Vec3::new(min.x, min.y, min.z), dz, dy),  // left
        Quad::new(Vec3::new(min.x, max.y, max.z), dx, -dz), // top
        Quad::new(Vec3::new(min.x, min.y, min.z), dx, dz),  // bottom
    ]
}

fn cornell() -> (Scene, Camera) {
    let mut scene = Scene::new();

    let red: Arc<dyn Material> = Arc::new(Lambertian::new(Color::new(0.65, 0.05, 0.05)));
    let white: Arc<dyn Material> = Arc::new(Lambertian::new(Color::splat(0.73)));
    let green: Arc<dyn Material> = Arc::new(Lambertian::new(Color::new(0.12, 0.45, 0.15)));
    let light: Arc<dyn Material> = Arc::new(DiffuseLight::new(Color::splat(15.0)));

    let walls = [
        (Quad::new(Vec3::new(555.0, 0.0, 0.0), Vec3::new(0.0, 555.0, 0.0), Vec3::new(0.0, 0.0, 555.0)), &green),
        (Quad::new(Vec3::ZERO, Vec3::new(0.0, 555.0, 0.0), Vec3::new(0.0, 0.0, 555.0)), &red),
        (
            Quad::new(Vec3::new(343.0, 554.0, 332.0), Vec3::new(-130.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -105.0)),
            &light,
        ),
        (Quad::new(Vec3::ZERO, Vec3::new(555.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 555.0)), &white),
        (
            Quad::new(Vec3::splat(555.0), Vec3::new(-555.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -555.0)),
            &white,
        ),
        (Quad::new(Vec3::new(0.0, 0.0, 555.0), Vec3::new(555.0, 0.0, 0.0), Vec3::new(0.0, 555.0, 0.0)), &white),
    ];
    for (quad, material) in walls {
        scene.add_primitive(Primitive::new(quad, Arc::clone(material)));
    }

    let boxes = [
        (Vec3::new(165.0, 330.0, 165.0), 15.0_f32, Vec3::new(265.0, 0.0, 295.0)),
        (Vec3::splat(165.0), -18.0_f32, Vec3::new(130.0, 0.0, 65.0)),
    ];
    for (size, angle, offset) in boxes {
        let placement = Mat4::from_rotation_translation(Quat::from_rotation_y(angle.to_radians()), offset);
        for side in box_quads(Vec3::ZERO, size) {
            scene.add_primitive(Primitive::new(side, Arc::clone(&white)).with_transform(placement));
        }
    }

    let camera = Camera::new()
        .with_position(Vec3::new(278.0, 278.0, -800.0), Vec3::new(278.0, 278.0, 0.0), Vec3::Y)
        .with_lens(40.0, 0.0, 10.0);

    (scene, camera)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scenes_build() {
        for demo in [DemoScene::Spheres, DemoScene::Cornell] {
            let (mut scene, _) = demo.build(1);
            assert!(!scene.primitives().is_empty());
            assert!(!scene.lights().is_empty());
            scene.ensure_accelerator().unwrap();
            assert!(scene.is_ready());
        }
    }

    #[test]
    fn test_cornell_has_single_light() {
        let (scene, _) = DemoScene::Cornell.build(0);
        // Only the ceiling quad emits.
        assert_eq!(scene.lights().len(), 1);
    }

    #[test]
    fn test_box_quads_enclose_box() {
        let quads = box_quads(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        let total: f32 = quads.iter().map(|q| ember_renderer::Shape::area(q)).sum();
        assert!((total - 2.0 * (2.0 + 3.0 + 6.0)).abs() < 1e-4);
    }
}

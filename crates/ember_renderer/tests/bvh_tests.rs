use ember_renderer::{
    sah_cost, Aabb, Bvh, BvhNode, BvhOptions, Hit, Hittable, Interval, Primitive, Quad, Ray, SplitMethod, Sphere,
    TraversalStats, Triangle, Vec3, RAY_EPSILON,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

const SPLIT_METHODS: [SplitMethod; 2] = [SplitMethod::Sah, SplitMethod::EqualCounts];

fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

fn random_ray(rng: &mut StdRng) -> Ray {
    let origin = random_point(rng, 12.0);
    let target = random_point(rng, 4.0);
    Ray::normalized(origin, target - origin)
}

/// Mixed spheres and triangles scattered in a cube.
fn random_primitives(count: usize, seed: u64) -> Vec<Primitive> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let center = random_point(&mut rng, 8.0);
            if i % 3 == 0 {
                let a = center + random_point(&mut rng, 0.8);
                let b = center + random_point(&mut rng, 0.8);
                Primitive::without_material(Triangle::new(center, a, b))
            } else {
                Primitive::without_material(Sphere::new(center, rng.gen_range(0.1..0.7)))
            }
        })
        .collect()
}

fn brute_force(primitives: &[Primitive], ray: &Ray, ray_t: Interval) -> Option<(usize, Hit)> {
    let mut t = ray_t;
    let mut closest = None;
    for (index, primitive) in primitives.iter().enumerate() {
        if let Some(hit) = primitive.hit(ray, t) {
            t = t.with_max(hit.t);
            closest = Some((index, hit));
        }
    }
    closest
}

fn full_range() -> Interval {
    Interval::new(RAY_EPSILON, f32::INFINITY)
}

/// Primitive indices below `node`.
fn subtree_primitives(bvh: &Bvh, node: usize) -> Vec<usize> {
    match bvh.nodes()[node] {
        BvhNode::Leaf { .. } => bvh.leaf_primitives(node).to_vec(),
        BvhNode::Interior { left, right, .. } => {
            let mut all = subtree_primitives(bvh, left as usize);
            all.extend(subtree_primitives(bvh, right as usize));
            all
        }
    }
}

#[test]
fn bvh_nearest_hit_matches_brute_force() {
    let primitives = random_primitives(300, 1);

    for method in SPLIT_METHODS {
        let bvh = Bvh::build(&primitives, BvhOptions::default().with_split_method(method)).unwrap();
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..2000 {
            let ray = random_ray(&mut rng);
            let expected = brute_force(&primitives, &ray, full_range());
            let found = bvh.intersect(&primitives, &ray, full_range());

            assert_eq!(expected.is_some(), found.is_some(), "{method}: {ray:?}");
            if let (Some((index, a)), Some(b)) = (expected, found) {
                assert_eq!(index, b.primitive, "{method}: {ray:?}");
                assert!((a.t - b.hit.t).abs() < 1e-4, "{method}: {} vs {}", a.t, b.hit.t);
                assert!((a.p - b.hit.p).length() < 1e-3, "{method}: {:?} vs {:?}", a.p, b.hit.p);
            }
        }
    }
}

#[test]
fn hits_at_range_ends_are_excluded() {
    let shapes: [(&str, Box<dyn Hittable>); 3] = [
        ("sphere", Box::new(Sphere::new(Vec3::ZERO, 1.0))),
        (
            "triangle",
            Box::new(Triangle::new(
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(0.0, 0.0, 1.0),
            )),
        ),
        (
            "quad",
            Box::new(Quad::new(
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 2.0),
            )),
        ),
    ];
    let ray = Ray::new(Vec3::new(0.1, 3.0, 0.1), Vec3::new(0.0, -1.0, 0.0));

    for (name, shape) in &shapes {
        let t = shape.hit(&ray, full_range()).unwrap().t;
        assert!(shape.hit(&ray, Interval::new(RAY_EPSILON, t)).is_none(), "{name}");
        let beyond = shape.hit(&ray, Interval::new(t, f32::INFINITY));
        assert!(beyond.map_or(true, |hit| hit.t > t), "{name}");
        assert!(shape.hit(&ray, Interval::new(RAY_EPSILON, t + 1e-3)).is_some(), "{name}");
    }
}

#[test]
fn bvh_respects_finite_range() {
    let primitives = random_primitives(200, 3);
    let bvh = Bvh::build(&primitives, BvhOptions::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(4);

    for _ in 0..1000 {
        let ray = random_ray(&mut rng);
        let range = Interval::new(RAY_EPSILON, rng.gen_range(1.0..20.0));
        let expected = brute_force(&primitives, &ray, range);
        let found = bvh.intersect(&primitives, &ray, range);

        assert_eq!(expected.is_some(), found.is_some());
        if let Some(hit) = found {
            assert!(range.contains(hit.hit.t));
        }
    }
}

#[test]
fn bvh_any_hit_agrees_with_nearest_hit() {
    let primitives = random_primitives(250, 5);

    for method in SPLIT_METHODS {
        let bvh = Bvh::build(&primitives, BvhOptions::default().with_split_method(method)).unwrap();
        let mut rng = StdRng::seed_from_u64(6);

        for _ in 0..2000 {
            let ray = random_ray(&mut rng);
            let range = Interval::new(RAY_EPSILON, rng.gen_range(1.0..30.0));
            assert_eq!(
                bvh.intersect_any(&primitives, &ray, range),
                bvh.intersect(&primitives, &ray, range).is_some(),
                "{method}: {ray:?}"
            );
        }
    }
}

/// Wraps a shape and records the upper bound of every range it is queried with.
struct Recording {
    inner: Sphere,
    log: Arc<Mutex<Vec<f32>>>,
}

impl Hittable for Recording {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Hit> {
        if let Ok(mut log) = self.log.lock() {
            log.push(ray_t.max);
        }
        self.inner.hit(ray, ray_t)
    }

    fn bounding_box(&self) -> Aabb {
        self.inner.bounding_box()
    }
}

#[test]
fn bvh_query_range_never_grows() {
    let log = Arc::new(Mutex::new(Vec::new()));
    // A dense line of spheres along -z so a ray down the axis passes many boxes.
    let primitives: Vec<Recording> = (0..64)
        .map(|i| Recording {
            inner: Sphere::new(Vec3::new((i % 4) as f32 * 0.3, 0.0, -(i as f32) * 0.5), 0.4),
            log: Arc::clone(&log),
        })
        .collect();

    for method in SPLIT_METHODS {
        let bvh = Bvh::build(&primitives, BvhOptions::default().with_split_method(method)).unwrap();

        for direction in [Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0)] {
            let origin = if direction.z < 0.0 {
                Vec3::new(0.2, 0.0, 5.0)
            } else {
                Vec3::new(0.2, 0.0, -40.0)
            };
            let ray = Ray::new(origin, direction);
            log.lock().unwrap().clear();

            let hit = bvh.intersect(&primitives, &ray, full_range()).unwrap();
            let bounds = log.lock().unwrap().clone();

            assert!(!bounds.is_empty());
            assert!(
                bounds.windows(2).all(|w| w[1] <= w[0]),
                "{method}: range grew during traversal: {bounds:?}"
            );
            assert!(bounds.iter().all(|&max| max >= hit.hit.t));
        }
    }
}

#[test]
fn bvh_nodes_contain_their_primitives() {
    let primitives = random_primitives(400, 7);

    for method in SPLIT_METHODS {
        let bvh = Bvh::build(&primitives, BvhOptions::default().with_split_method(method)).unwrap();

        for (index, node) in bvh.nodes().iter().enumerate() {
            let members = subtree_primitives(&bvh, index);
            assert!(!members.is_empty());

            let tight = Aabb::enclosing(members.iter().map(|&p| primitives[p].bounding_box()));
            assert_eq!(*node.bbox(), tight, "{method}: node {index} is not tight");

            for &p in &members {
                assert!(node.bbox().contains_box(&primitives[p].bounding_box()));
            }

            if let BvhNode::Interior { left, right, .. } = *node {
                assert!(node.bbox().contains_box(bvh.nodes()[left as usize].bbox()));
                assert!(node.bbox().contains_box(bvh.nodes()[right as usize].bbox()));
            }
        }

        // Every primitive appears in exactly one leaf.
        let mut all = subtree_primitives(&bvh, bvh.root());
        all.sort_unstable();
        assert_eq!(all, (0..primitives.len()).collect::<Vec<_>>());
    }
}

#[test]
fn sah_splits_never_cost_more_than_a_leaf() {
    let primitives = random_primitives(500, 8);
    let bvh = Bvh::build(&primitives, BvhOptions::default()).unwrap();

    for (index, node) in bvh.nodes().iter().enumerate() {
        if let BvhNode::Interior { left, right, .. } = *node {
            let n_left = subtree_primitives(&bvh, left as usize).len();
            let n_right = subtree_primitives(&bvh, right as usize).len();
            let cost = sah_cost(
                node.bbox(),
                bvh.nodes()[left as usize].bbox(),
                n_left,
                bvh.nodes()[right as usize].bbox(),
                n_right,
            );
            assert!(
                cost < (n_left + n_right) as f32,
                "node {index}: split cost {cost} exceeds leaf cost {}",
                n_left + n_right
            );
        }
    }
}

#[test]
fn ray_outside_root_visits_one_node() {
    let primitives = random_primitives(100, 9);

    for method in SPLIT_METHODS {
        let bvh = Bvh::build(&primitives, BvhOptions::default().with_split_method(method)).unwrap();
        // Parallel to the root box, well above it.
        let ray = Ray::new(Vec3::new(-100.0, 100.0, 0.0), Vec3::X);

        let mut stats = TraversalStats::default();
        assert!(bvh.intersect_with_stats(&primitives, &ray, full_range(), &mut stats).is_none());
        assert_eq!(stats, TraversalStats { nodes_visited: 1, primitives_tested: 0 });

        let mut stats = TraversalStats::default();
        assert!(!bvh.intersect_any_with_stats(&primitives, &ray, full_range(), &mut stats));
        assert_eq!(stats.nodes_visited, 1);
        assert_eq!(stats.primitives_tested, 0);
    }
}

#[test]
fn bvh_prunes_most_primitives() {
    let primitives = random_primitives(1000, 10);
    let bvh = Bvh::build(&primitives, BvhOptions::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(11);

    let mut tested = 0;
    let rays = 500;
    for _ in 0..rays {
        let mut stats = TraversalStats::default();
        bvh.intersect_with_stats(&primitives, &random_ray(&mut rng), full_range(), &mut stats);
        tested += stats.primitives_tested;
    }
    assert!(tested / rays < primitives.len() / 3, "average {} tests per ray", tested / rays);
}

use std::sync::Arc;

use approx::assert_relative_eq;
use rs_sbvh::accelerators::bvh::{BVHAccel, OptimizerSettings, SplitMethod};
use rs_sbvh::core::geometry::{Bounds3f, Point3f, Ray, Vector3f};
use rs_sbvh::core::interaction::SurfaceInteraction;
use rs_sbvh::core::pbrt::Float;
use rs_sbvh::core::rng::Rng;
use rs_sbvh::shapes::boxes::{create_box_grid, create_box_mesh};
use rs_sbvh::shapes::triangle::TriangleMesh;

const METHODS: [SplitMethod; 3] = [SplitMethod::Binned, SplitMethod::Sah, SplitMethod::Sbvh];

fn p(x: Float, y: Float, z: Float) -> Point3f {
    Point3f { x, y, z }
}

fn v(x: Float, y: Float, z: Float) -> Vector3f {
    Vector3f { x, y, z }
}

fn unit_cube() -> Arc<TriangleMesh> {
    Arc::new(create_box_mesh(&Bounds3f::new(
        p(-1.0, -1.0, -1.0),
        p(1.0, 1.0, 1.0),
    )))
}

/// Triangles of random size and orientation, some of them long
/// slivers crossing the whole scene.
fn random_soup(n: usize, seed: u64) -> Arc<TriangleMesh> {
    let mut rng = Rng::new(seed);
    let mut points = Vec::with_capacity(3 * n);
    for i in 0..n {
        let c = p(
            rng.uniform_range(-10.0, 10.0),
            rng.uniform_range(-10.0, 10.0),
            rng.uniform_range(-10.0, 10.0),
        );
        let size: Float = if i % 10 == 0 { 8.0 } else { 1.0 };
        for _ in 0..3 {
            points.push(p(
                c.x + size * rng.uniform_range(-1.0, 1.0),
                c.y + size * rng.uniform_range(-1.0, 1.0),
                c.z + size * rng.uniform_range(-1.0, 1.0),
            ));
        }
    }
    Arc::new(TriangleMesh::new(
        (0..3 * n).collect(),
        points,
        Vec::new(),
        Vec::new(),
    ))
}

fn random_ray(rng: &mut Rng) -> Ray {
    let o = p(
        rng.uniform_range(-15.0, 15.0),
        rng.uniform_range(-15.0, 15.0),
        rng.uniform_range(-15.0, 15.0),
    );
    let target = p(
        rng.uniform_range(-10.0, 10.0),
        rng.uniform_range(-10.0, 10.0),
        rng.uniform_range(-10.0, 10.0),
    );
    Ray::new(o, (target - o).normalize(), 0.0, std::f32::INFINITY)
}

fn agrees_with_linear_scan(bvh: &BVHAccel, n_rays: usize, seed: u64) {
    let mut rng = Rng::new(seed);
    for i in 0..n_rays {
        let ray = random_ray(&mut rng);
        let linear = bvh.intersect_linear(&ray);
        let any_hit = bvh.hit(&ray);
        let mut isect = SurfaceInteraction::default();
        let found = bvh.intersect(&ray, &mut isect);
        assert_eq!(found, linear.is_some(), "ray {}", i);
        assert_eq!(any_hit, found, "ray {}", i);
        if let Some((_, t)) = linear {
            assert_relative_eq!(isect.t_hit, t, max_relative = 1e-5);
            assert_relative_eq!(ray.t_max.get(), t, max_relative = 1e-5);
        }
    }
}

#[test]
fn unit_cube_front_face() {
    for &method in &METHODS {
        let bvh = BVHAccel::new(unit_cube(), 4, method);
        let ray = Ray::new(p(0.0, 0.0, -5.0), v(0.0, 0.0, 1.0), 0.0, std::f32::INFINITY);
        let mut isect = SurfaceInteraction::default();
        assert!(bvh.intersect(&ray, &mut isect), "{:?}", method);
        assert_relative_eq!(isect.t_hit, 4.0, epsilon = 1e-5);
        assert_relative_eq!(isect.n.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(isect.n.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(isect.n.z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(isect.p.z, -1.0, epsilon = 1e-5);
    }
}

#[test]
fn unit_cube_miss() {
    for &method in &METHODS {
        let bvh = BVHAccel::new(unit_cube(), 4, method);
        let ray = Ray::new(p(0.0, 0.0, -5.0), v(1.0, 0.0, 0.0), 0.0, std::f32::INFINITY);
        let mut isect = SurfaceInteraction::default();
        assert!(!bvh.intersect(&ray, &mut isect));
        assert!(!bvh.hit(&ray));
    }
}

#[test]
fn box_grid_diagonal_in_order() {
    // 10 x 10 x 10 unit boxes with a gap of one unit between them
    let mesh = Arc::new(create_box_grid(10, 1.0, 2.0));
    for &method in &METHODS {
        let bvh = BVHAccel::new(mesh.clone(), 4, method);
        // through the centers (4i, 2i, 0) of five boxes, entering and
        // leaving each of them through the middle of its x faces
        let o = p(-4.0, -2.0, 0.0);
        let d = v(2.0, 1.0, 0.0).normalize();
        let mut t_min: Float = 0.0;
        let mut hits: Vec<Float> = Vec::new();
        loop {
            let ray = Ray::new(o, d, t_min, std::f32::INFINITY);
            let mut isect = SurfaceInteraction::default();
            if !bvh.intersect(&ray, &mut isect) {
                break;
            }
            hits.push(isect.t_hit);
            t_min = isect.t_hit + 1e-3;
        }
        assert_eq!(hits.len(), 10, "{:?}", method);
        for w in hits.windows(2) {
            assert!(w[0] < w[1]);
        }
        // first box entered at x = -0.5
        assert_relative_eq!(hits[0], 3.5 * (5.0 as Float).sqrt() / 2.0, epsilon = 1e-4);
    }
}

#[test]
fn random_soup_matches_linear_scan() {
    let mesh = random_soup(400, 1);
    for &method in &METHODS {
        for &max_prims in &[1_usize, 4, 64] {
            let bvh = BVHAccel::new(mesh.clone(), max_prims, method);
            assert_eq!(bvh.validate(), Ok(()));
            agrees_with_linear_scan(&bvh, 300, 7);
        }
    }
}

#[test]
fn optimized_trees_match_linear_scan() {
    let mesh = random_soup(400, 2);
    for &method in &METHODS {
        let mut bvh = BVHAccel::new(mesh.clone(), 2, method);
        let before = bvh.tree_cost();
        bvh.optimize(&OptimizerSettings {
            max_passes: 30,
            seed: 9,
            batch_fraction: 0.05,
            ..Default::default()
        });
        assert_eq!(bvh.validate(), Ok(()), "{:?}", method);
        assert!(bvh.tree_cost() <= before);
        agrees_with_linear_scan(&bvh, 300, 8);
    }
}

#[test]
fn spatial_splits_reference_every_triangle() {
    let mesh = random_soup(300, 3);
    let bvh = BVHAccel::new(mesh.clone(), 1, SplitMethod::Sbvh);
    let mut seen = vec![false; mesh.n_triangles];
    for node in &bvh.nodes {
        for tri in node.triangles() {
            seen[tri.id] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
    let stats = bvh.stats();
    assert!(stats.n_references >= mesh.n_triangles);
}

#[test]
fn degenerate_triangles_never_hit() {
    // a proper triangle, a line, a point, and one with a NaN vertex
    let nan = std::f32::NAN;
    let points = vec![
        p(-1.0, -1.0, 0.0),
        p(1.0, -1.0, 0.0),
        p(0.0, 1.0, 0.0),
        p(0.0, 0.0, 1.0),
        p(1.0, 1.0, 1.0),
        p(2.0, 2.0, 1.0),
        p(0.0, 0.0, 2.0),
        p(0.0, 0.0, 2.0),
        p(0.0, 0.0, 2.0),
        p(nan, 0.0, 3.0),
        p(1.0, 0.0, 3.0),
        p(0.0, 1.0, 3.0),
    ];
    let mesh = Arc::new(TriangleMesh::new(
        (0..12).collect(),
        points,
        Vec::new(),
        Vec::new(),
    ));
    for &method in &METHODS {
        let bvh = BVHAccel::new(mesh.clone(), 1, method);
        assert_eq!(bvh.validate(), Ok(()));
        let ray = Ray::new(p(0.1, 0.0, 10.0), v(0.0, 0.0, -1.0), 0.0, std::f32::INFINITY);
        let mut isect = SurfaceInteraction::default();
        assert!(bvh.intersect(&ray, &mut isect));
        assert_eq!(isect.triangle_id, 0);
        assert_relative_eq!(isect.t_hit, 10.0, epsilon = 1e-5);
    }
}

#[test]
fn concurrent_queries() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BVHAccel>();
    let mesh = random_soup(300, 4);
    let bvh = Arc::new(BVHAccel::new(mesh, 4, SplitMethod::Sbvh));
    let handles: Vec<_> = (0..4)
        .map(|k| {
            let bvh = bvh.clone();
            std::thread::spawn(move || {
                let mut rng = Rng::new(100 + k);
                for _ in 0..200 {
                    let ray = random_ray(&mut rng);
                    let linear = bvh.intersect_linear(&ray).map(|(_, t)| t);
                    let (closest, _) = bvh.intersect_counted(&ray);
                    assert_eq!(closest.is_some(), linear.is_some());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

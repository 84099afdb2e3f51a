use collision_shared::{
    intersect_triangle_ray, overlap_bv_ray, trace_any_hit, FixedStack, NodeKind, PackedBuffers,
    SegmentQuery, TraceStatus, TracerConfig,
};
use collision_tracer::probe::{fibonacci_directions, probe_queries};
use collision_tracer::{CollisionBvhBuilder, CollisionScene, IndexedMesh};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_point(rng: &mut ChaCha8Rng, range: f32) -> Vec3 {
    Vec3::new(
        rng.random_range(-range..range),
        rng.random_range(-range..range),
        rng.random_range(-range..range),
    )
}

/// Scattered small triangles in a 10 unit cube
fn random_mesh(seed: u64, count: usize) -> IndexedMesh {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut mesh = IndexedMesh::default();
    for _ in 0..count {
        let anchor = random_point(&mut rng, 5.0);
        let b = anchor + random_point(&mut rng, 0.75);
        let c = anchor + random_point(&mut rng, 0.75);
        mesh.push_triangle(anchor.to_array(), b.to_array(), c.to_array());
    }
    mesh
}

/// Every triangle tested against the same segment the traversal uses
fn brute_force(mesh: &IndexedMesh, origin: Vec3, tmin: f32, direction: Vec3, tmax: f32) -> bool {
    let Some(query) = SegmentQuery::new(origin, tmin, direction, tmax) else {
        return false;
    };
    (0..mesh.triangle_count()).any(|i| {
        intersect_triangle_ray(&query.ray, mesh.triangle(i))
            .map_or(false, |hit| query.accepts(hit.t))
    })
}

struct Ray {
    origin: Vec3,
    tmin: f32,
    direction: Vec3,
    tmax: f32,
}

fn random_rays(seed: u64, count: usize) -> Vec<Ray> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let origin = random_point(&mut rng, 7.0);
            let target = random_point(&mut rng, 5.0);
            let direction = (target - origin).normalize_or(Vec3::X);
            Ray {
                origin,
                tmin: rng.random_range(0.0..1.0),
                direction,
                tmax: rng.random_range(1.0..15.0),
            }
        })
        .collect()
}

fn build(mesh: &IndexedMesh) -> CollisionScene {
    CollisionBvhBuilder::build(mesh).expect("random mesh should build")
}

#[test]
fn test_bvh_agrees_with_brute_force() {
    let mut hits = 0;
    let mut total = 0;

    for seed in 0..8 {
        let mesh = random_mesh(seed, 400);
        let scene = build(&mesh);
        let mut scratch = scene.scratch();

        for (i, ray) in random_rays(seed + 100, 1000).iter().enumerate() {
            let bvh = scene.trace_any_hit_with(&mut scratch, ray.origin, ray.tmin, ray.direction, ray.tmax);
            let brute = brute_force(&mesh, ray.origin, ray.tmin, ray.direction, ray.tmax);

            assert!(bvh || !brute, "mesh {seed} ray {i}: traversal missed a triangle hit");
            assert!(!bvh || brute, "mesh {seed} ray {i}: traversal hit no triangle");

            hits += bvh as usize;
            total += 1;
        }
    }

    assert!(hits > 0 && hits < total);
}

#[test]
fn test_sphere_directions_agree_with_brute_force() {
    let mesh = IndexedMesh::default_scene();
    let scene = build(&mesh);
    let origin = Vec3::new(0.3, 1.1, 2.0);

    let queries = probe_queries(origin, &fibonacci_directions(512), 0.0, 20.0);
    let mut scratch = scene.scratch();
    for (i, query) in queries.iter().enumerate() {
        let bvh = scene.trace_query_with(&mut scratch, query);
        let brute = brute_force(&mesh, query.origin(), query.tmin, query.direction(), query.tmax);
        assert_eq!(bvh, brute, "direction {i}");
    }
}

/// Collects `node` and every node below it
fn subtree(scene: &CollisionScene, node: u32, out: &mut Vec<u32>) {
    out.push(node);
    if let NodeKind::Interior { left, right } = scene.nodes()[node as usize].kind() {
        subtree(scene, left, out);
        subtree(scene, right, out);
    }
}

#[test]
fn test_rejected_node_rejects_whole_subtree() {
    let mesh = random_mesh(13, 300);
    let scene = build(&mesh);
    let nodes = scene.nodes();
    let mut rejections = 0;

    for ray in random_rays(17, 200) {
        let Some(query) = SegmentQuery::new(ray.origin, ray.tmin, ray.direction, ray.tmax) else {
            continue;
        };
        let overlaps = |node: u32| {
            let node = &nodes[node as usize];
            overlap_bv_ray(&query.ray, node.center(), node.extents())
        };

        for node in 0..nodes.len() as u32 {
            if overlaps(node) {
                continue;
            }
            rejections += 1;

            let mut below = Vec::new();
            subtree(&scene, node, &mut below);
            for descendant in below {
                assert!(!overlaps(descendant), "node {node} rejected but descendant {descendant} overlaps");
            }
        }
    }

    assert!(rejections > 0);
}

#[test]
fn test_fixed_stack_matches_growable_stack() {
    let mesh = random_mesh(3, 300);
    let scene = build(&mesh);
    assert!(scene.depth() + 1 <= TracerConfig::GPU_STACK_CAPACITY);

    let words = scene.node_buffer_words();
    let packed = PackedBuffers {
        node_words: &words,
        vertices: scene.vertices(),
        elements: scene.elements(),
    };

    let mut stack = FixedStack::<{ TracerConfig::GPU_STACK_CAPACITY }>::new();
    for ray in random_rays(5, 500) {
        let fixed = trace_any_hit(&packed, &mut stack, ray.origin, ray.tmin, ray.direction, ray.tmax);
        let growable = scene.trace_any_hit(ray.origin, ray.tmin, ray.direction, ray.tmax);

        assert_ne!(fixed, TraceStatus::StackOverflow);
        assert_eq!(fixed.is_hit(), growable);
    }
}

#[test]
fn test_random_rays_are_deterministic() {
    let mesh = random_mesh(21, 100);
    let scene = build(&mesh);

    let first: Vec<bool> = random_rays(4, 200)
        .iter()
        .map(|ray| scene.trace_any_hit(ray.origin, ray.tmin, ray.direction, ray.tmax))
        .collect();
    let second: Vec<bool> = random_rays(4, 200)
        .iter()
        .map(|ray| scene.trace_any_hit(ray.origin, ray.tmin, ray.direction, ray.tmax))
        .collect();

    assert_eq!(first, second);
}

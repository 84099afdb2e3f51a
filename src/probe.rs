//! Probe ray sets cast from a single point.

use std::f32::consts::{PI, TAU};
use collision_shared::RayQuery;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Evenly spread unit directions on the Fibonacci sphere
pub fn fibonacci_directions(count: usize) -> Vec<Vec3> {
    let golden_angle = PI * (3.0 - 5.0f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let radius = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            Vec3::new(theta.cos() * radius, y, theta.sin() * radius)
        })
        .collect()
}

/// Uniform random unit directions, reproducible for a given seed
pub fn random_directions(count: usize, seed: u64) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let y: f32 = rng.random_range(-1.0..1.0);
            let phi: f32 = rng.random_range(0.0..TAU);
            let radius = (1.0 - y * y).max(0.0).sqrt();
            Vec3::new(phi.cos() * radius, y, phi.sin() * radius)
        })
        .collect()
}

/// One query per direction, all sharing `origin` and the `[tmin, tmax)` range
pub fn probe_queries(origin: Vec3, directions: &[Vec3], tmin: f32, tmax: f32) -> Vec<RayQuery> {
    directions
        .iter()
        .map(|&direction| RayQuery::new(origin, tmin, direction, tmax))
        .collect()
}

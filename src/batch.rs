use std::time::{Duration, Instant};
use collision_shared::{RayQuery, TraceStatus};
use log::info;
use rayon::prelude::*;
use crate::error::TraceError;
use crate::scene::CollisionScene;

/// Hit flags of a batch plus timing
#[derive(Clone, Debug)]
pub struct BatchResult {
    pub hits: Vec<bool>,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn hit_count(&self) -> usize {
        self.hits.iter().filter(|&&hit| hit).count()
    }

    pub fn rays_per_second(&self) -> f64 {
        self.hits.len() as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }
}

/// Trace every query in parallel; each worker reuses one scratch stack
pub fn trace_batch(scene: &CollisionScene, queries: &[RayQuery]) -> Vec<bool> {
    queries
        .par_iter()
        .map_init(|| scene.scratch(), |scratch, query| scene.trace_query_with(scratch, query))
        .collect()
}

/// Trace on the calling thread only
pub fn trace_batch_serial(scene: &CollisionScene, queries: &[RayQuery]) -> Vec<bool> {
    let mut scratch = scene.scratch();
    queries
        .iter()
        .map(|query| scene.trace_query_with(&mut scratch, query))
        .collect()
}

/// [`trace_batch`] with timing and a summary log line
pub fn trace_batch_timed(scene: &CollisionScene, queries: &[RayQuery]) -> BatchResult {
    let start = Instant::now();
    let hits = trace_batch(scene, queries);
    let result = BatchResult { hits, elapsed: start.elapsed() };

    info!(
        "CPU batch: {} rays, {} hits in {:.2}ms ({:.0} rays/s)",
        result.hits.len(),
        result.hit_count(),
        result.elapsed.as_secs_f32() * 1000.0,
        result.rays_per_second()
    );
    result
}

/// Status codes as written to the GPU result buffer
pub fn decode_statuses(codes: &[u32]) -> Result<Vec<TraceStatus>, TraceError> {
    codes
        .iter()
        .map(|&code| TraceStatus::from_code(code).ok_or(TraceError::InvalidStatus(code)))
        .collect()
}

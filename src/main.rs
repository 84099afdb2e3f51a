use clap::Parser;
use glam::Vec3;
use log::{info, warn};

use collision_tracer::batch::trace_batch_timed;
use collision_tracer::cli::{Args, Backend, Pattern};
use collision_tracer::gltf_loader::MeshLoader;
use collision_tracer::logger::init_logger;
use collision_tracer::probe::{fibonacci_directions, probe_queries, random_directions};
use collision_tracer::{CollisionBvhBuilder, IndexedMesh};

fn load_mesh(path: Option<&str>) -> Result<IndexedMesh, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            info!("Loading glTF scene from {}", path);
            let mesh = MeshLoader::load_from_path(path)?.extract_mesh(None)?;
            Ok(mesh)
        }
        None => {
            info!("No scene given, using the built-in scene");
            Ok(IndexedMesh::default_scene())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logger(args.debug_level.clone().into());

    let origin = match args.origin.as_slice() {
        &[x, y, z] => Vec3::new(x, y, z),
        other => return Err(format!("--origin needs three values, got {}", other.len()).into()),
    };

    let mesh = load_mesh(args.scene.as_deref())?;
    let scene = CollisionBvhBuilder::build(&mesh)?;

    let directions = match args.pattern {
        Pattern::Fibonacci => fibonacci_directions(args.rays),
        Pattern::Random => random_directions(args.rays, args.seed),
    };
    let queries = probe_queries(origin, &directions, args.tmin, args.length);
    info!(
        "Casting {} {:?} probe rays from {} over [{}, {})",
        queries.len(),
        args.pattern,
        origin,
        args.tmin,
        args.length
    );

    let hits = match args.backend {
        Backend::Cpu => trace_batch_timed(&scene, &queries).hits,
        Backend::Gpu => trace_on_gpu(&scene, &queries)?,
    };

    let hit_count = hits.iter().filter(|&&hit| hit).count();
    if hits.is_empty() {
        warn!("No rays were cast");
    } else {
        info!(
            "Occluded: {} of {} rays ({:.1}%)",
            hit_count,
            hits.len(),
            hit_count as f64 * 100.0 / hits.len() as f64
        );
    }

    Ok(())
}

#[cfg(feature = "gpu")]
fn trace_on_gpu(
    scene: &collision_tracer::CollisionScene,
    queries: &[collision_shared::RayQuery],
) -> Result<Vec<bool>, Box<dyn std::error::Error>> {
    let mut tracer = collision_tracer::compute::GpuTracer::new()?;
    Ok(tracer.trace_batch(scene, queries)?)
}

#[cfg(not(feature = "gpu"))]
fn trace_on_gpu(
    _scene: &collision_tracer::CollisionScene,
    _queries: &[collision_shared::RayQuery],
) -> Result<Vec<bool>, Box<dyn std::error::Error>> {
    Err("this binary was built without the `gpu` feature".into())
}

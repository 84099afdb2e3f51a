//! Any-hit ray queries against a triangle mesh BVH stored in flat buffers.
//!
//! The traversal kernel lives in `collision-shared` and runs unchanged on the
//! CPU (see [`batch`]) and, with the `gpu` feature, in a compute shader (see
//! `compute`).

pub mod batch;
pub mod bvh;
pub mod cli;
pub mod error;
pub mod gltf_loader;
pub mod logger;
pub mod mesh;
pub mod probe;
pub mod scene;

#[cfg(feature = "gpu")]
pub mod buffers;
#[cfg(feature = "gpu")]
pub mod compute;

pub use bvh::CollisionBvhBuilder;
pub use error::{BuildError, LoadError, SceneError, TraceError};
pub use mesh::IndexedMesh;
pub use scene::{CollisionScene, TraceScratch};

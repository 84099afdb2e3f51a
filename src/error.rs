//! Error types for scene validation, BVH building, mesh loading and GPU tracing.

use thiserror::Error;

/// The flat collision buffers violate a structural invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("node buffer is empty")]
    EmptyTree,

    #[error("root index {root} is outside the node buffer ({node_count} nodes)")]
    RootOutOfRange { root: i32, node_count: usize },

    #[error("node {node} references child {child} outside the node buffer ({node_count} nodes)")]
    ChildOutOfRange { node: usize, child: i32, node_count: usize },

    /// Leaf with child links, or a negative element index other than the interior sentinel.
    #[error("node {node} is neither a proper leaf nor a proper interior node")]
    MalformedNode { node: usize },

    #[error("leaf {node} element index {element_index} needs three entries, element buffer has {element_count}")]
    ElementOutOfRange { node: usize, element_index: i32, element_count: usize },

    #[error("element {element} references vertex {vertex} outside the vertex buffer ({vertex_count} vertices)")]
    VertexOutOfRange { element: usize, vertex: i32, vertex_count: usize },

    /// A node is reachable twice from the root.
    #[error("node {node} is reachable along more than one path")]
    Cycle { node: usize },

    #[error("box of node {node} does not enclose its child {child}")]
    NotEnclosed { node: usize, child: usize },
}

/// Building a collision scene from a triangle mesh failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("mesh has no triangles")]
    NoTriangles,

    #[error("index count {0} is not a multiple of three")]
    IndexCount(usize),

    #[error("index {index} references vertex outside the mesh ({vertex_count} vertices)")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("built scene failed validation: {0}")]
    Scene(#[from] SceneError),
}

/// Loading a mesh from glTF failed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read glTF file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("invalid glTF content: {0}")]
    Validation(String),
}

/// Tracing on the GPU failed.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    RequestDevice(String),

    /// The fixed shader stack cannot hold a traversal of this tree.
    #[error("tree depth {depth} does not fit the shader stack of {capacity} entries")]
    TreeTooDeep { depth: usize, capacity: usize },

    #[error("failed to map result buffer: {0}")]
    BufferMap(String),

    #[error("shader traversal stack overflowed on ray {ray}")]
    StackOverflow { ray: usize },

    #[error("shader wrote unknown status code {0}")]
    InvalidStatus(u32),

    /// A scene buffer is larger than a single storage binding may be.
    #[error("{buffer} needs {size} bytes, over the {limit} byte binding limit")]
    SceneTooLarge { buffer: &'static str, size: u64, limit: u64 },
}

use glam::Vec3;
use collision_shared::{
    trace_any_hit, trace_ray_query, CollisionNode, NodeBufferHeader, RayQuery, SliceBuffers,
    TracerConfig,
};
use log::debug;
use crate::error::SceneError;

/// Validated collision buffers: node tree, vertex positions and triangle corner indices.
///
/// Construction checks every invariant the traversal kernel relies on, so
/// tracing a `CollisionScene` never indexes out of bounds or loops.
#[derive(Clone, Debug)]
pub struct CollisionScene {
    root: u32,
    nodes: Vec<CollisionNode>,
    vertices: Vec<[f32; 4]>,
    elements: Vec<i32>,
    depth: usize,
    leaf_count: usize,
}

/// Reusable traversal stack for host-side queries
#[derive(Clone, Debug, Default)]
pub struct TraceScratch {
    stack: Vec<u32>,
}

impl TraceScratch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { stack: Vec::with_capacity(capacity) }
    }
}

impl CollisionScene {
    pub fn from_buffers(
        root: i32,
        nodes: Vec<CollisionNode>,
        vertices: Vec<[f32; 4]>,
        elements: Vec<i32>,
    ) -> Result<Self, SceneError> {
        let (depth, leaf_count) = validate(root, &nodes, &vertices, &elements)?;

        debug!(
            "Validated collision scene: {} nodes ({} leaves), depth {}, {} vertices, {} elements",
            nodes.len(),
            leaf_count,
            depth,
            vertices.len(),
            elements.len()
        );

        Ok(Self {
            root: root as u32,
            nodes,
            vertices,
            elements,
            depth,
            leaf_count,
        })
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    pub fn nodes(&self) -> &[CollisionNode] {
        &self.nodes
    }

    pub fn vertices(&self) -> &[[f32; 4]] {
        &self.vertices
    }

    pub fn elements(&self) -> &[i32] {
        &self.elements
    }

    /// Longest root-to-leaf path in edges; a lone leaf has depth 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Leaves reachable from the root, one triangle each
    pub fn triangle_count(&self) -> usize {
        self.leaf_count
    }

    pub fn buffers(&self) -> SliceBuffers<'_> {
        SliceBuffers {
            root: self.root,
            nodes: &self.nodes,
            vertices: &self.vertices,
            elements: &self.elements,
        }
    }

    /// Node buffer as uploaded to the GPU: header followed by the node records
    pub fn node_buffer_words(&self) -> Vec<u32> {
        let header = NodeBufferHeader::new(self.root);
        let mut words = Vec::with_capacity(NodeBufferHeader::WORDS + self.nodes.len() * 12);
        words.extend_from_slice(bytemuck::cast_slice(&[header]));
        words.extend_from_slice(bytemuck::cast_slice(&self.nodes));
        words
    }

    /// A scratch stack large enough that traversal never reallocates
    pub fn scratch(&self) -> TraceScratch {
        TraceScratch::with_capacity(self.depth + 1)
    }

    /// Any-hit query over `origin + direction * t`, `t` in `[tmin, tmax)`
    pub fn trace_any_hit(&self, origin: Vec3, tmin: f32, direction: Vec3, tmax: f32) -> bool {
        self.trace_any_hit_with(&mut self.scratch(), origin, tmin, direction, tmax)
    }

    pub fn trace_any_hit_with(
        &self,
        scratch: &mut TraceScratch,
        origin: Vec3,
        tmin: f32,
        direction: Vec3,
        tmax: f32,
    ) -> bool {
        // A growable stack never overflows, so only Hit and Miss come back
        trace_any_hit(&self.buffers(), &mut scratch.stack, origin, tmin, direction, tmax).is_hit()
    }

    pub fn trace_query_with(&self, scratch: &mut TraceScratch, query: &RayQuery) -> bool {
        trace_ray_query(&self.buffers(), &mut scratch.stack, query).is_hit()
    }
}

/// Allowed slack when checking that a box encloses its contents
fn enclosure_tolerance(node: &CollisionNode) -> Vec3 {
    (node.center().abs() + node.extents()) * (8.0 * TracerConfig::FLT_EPSILON)
}

fn encloses(node: &CollisionNode, min: Vec3, max: Vec3) -> bool {
    let tolerance = enclosure_tolerance(node);
    min.cmpge(node.min() - tolerance).all() && max.cmple(node.max() + tolerance).all()
}

/// Returns `(depth, leaf_count)` of the tree reachable from `root`
fn validate(
    root: i32,
    nodes: &[CollisionNode],
    vertices: &[[f32; 4]],
    elements: &[i32],
) -> Result<(usize, usize), SceneError> {
    let node_count = nodes.len();
    if node_count == 0 {
        return Err(SceneError::EmptyTree);
    }
    if root < 0 || root as usize >= node_count {
        return Err(SceneError::RootOutOfRange { root, node_count });
    }

    let mut visited = vec![false; node_count];
    let mut pending = vec![(root as usize, 0usize)];
    let mut max_depth = 0;
    let mut leaf_count = 0;

    while let Some((index, depth)) = pending.pop() {
        if visited[index] {
            return Err(SceneError::Cycle { node: index });
        }
        visited[index] = true;
        max_depth = max_depth.max(depth);

        let node = &nodes[index];
        match node.element_index {
            TracerConfig::INTERIOR_SENTINEL => {
                for child in [node.left, node.right] {
                    if child < 0 || child as usize >= node_count {
                        return Err(SceneError::ChildOutOfRange { node: index, child, node_count });
                    }
                    let child_node = &nodes[child as usize];
                    if !encloses(node, child_node.min(), child_node.max()) {
                        return Err(SceneError::NotEnclosed { node: index, child: child as usize });
                    }
                }
                pending.push((node.right as usize, depth + 1));
                pending.push((node.left as usize, depth + 1));
            }
            element_index if element_index >= 0 => {
                if node.left != TracerConfig::INTERIOR_SENTINEL
                    || node.right != TracerConfig::INTERIOR_SENTINEL
                {
                    return Err(SceneError::MalformedNode { node: index });
                }

                let first = element_index as usize;
                if first + 3 > elements.len() {
                    return Err(SceneError::ElementOutOfRange {
                        node: index,
                        element_index,
                        element_count: elements.len(),
                    });
                }

                let mut min = Vec3::splat(f32::INFINITY);
                let mut max = Vec3::splat(f32::NEG_INFINITY);
                for element in first..first + 3 {
                    let vertex = elements[element];
                    if vertex < 0 || vertex as usize >= vertices.len() {
                        return Err(SceneError::VertexOutOfRange {
                            element,
                            vertex,
                            vertex_count: vertices.len(),
                        });
                    }
                    let [x, y, z, _] = vertices[vertex as usize];
                    let corner = Vec3::new(x, y, z);
                    min = min.min(corner);
                    max = max.max(corner);
                }

                // A leaf's only child is its triangle
                if !encloses(node, min, max) {
                    return Err(SceneError::NotEnclosed { node: index, child: index });
                }
                leaf_count += 1;
            }
            _ => return Err(SceneError::MalformedNode { node: index }),
        }
    }

    Ok((max_depth, leaf_count))
}

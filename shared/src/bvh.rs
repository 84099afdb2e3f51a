use glam::Vec3;
use crate::access::CollisionBuffers;
use crate::intersection::{intersect_triangle_ray, overlap_bv_ray};
use crate::ray::SegmentQuery;
use crate::{NodeKind, RayQuery, TraceStatus};

/// LIFO of pending node indices for the depth-first traversal
pub trait TraversalStack {
    fn clear(&mut self);
    /// Returns `false` when the stack is full and `node` was dropped
    fn push(&mut self, node: u32) -> bool;
    fn pop(&mut self) -> Option<u32>;
}

/// Fixed-capacity stack living in registers / private memory on the GPU
pub struct FixedStack<const N: usize> {
    entries: [u32; N],
    len: usize,
}

impl<const N: usize> FixedStack<N> {
    pub fn new() -> Self {
        Self { entries: [0; N], len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for FixedStack<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TraversalStack for FixedStack<N> {
    fn clear(&mut self) {
        self.len = 0;
    }

    fn push(&mut self, node: u32) -> bool {
        if self.len >= N {
            return false;
        }
        self.entries[self.len] = node;
        self.len += 1;
        true
    }

    fn pop(&mut self) -> Option<u32> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.entries[self.len])
    }
}

#[cfg(not(target_arch = "spirv"))]
impl TraversalStack for alloc::vec::Vec<u32> {
    fn clear(&mut self) {
        alloc::vec::Vec::clear(self);
    }

    fn push(&mut self, node: u32) -> bool {
        alloc::vec::Vec::push(self, node);
        true
    }

    fn pop(&mut self) -> Option<u32> {
        alloc::vec::Vec::pop(self)
    }
}

/// Any-hit query: does any triangle intersect `origin + direction * t` for
/// `t` in `[tmin, tmax)`?
///
/// Stops at the first accepted hit. Children are visited left first. The
/// stack never holds more than `depth + 1` entries.
pub fn trace_any_hit<B, S>(
    buffers: &B,
    stack: &mut S,
    origin: Vec3,
    tmin: f32,
    direction: Vec3,
    tmax: f32,
) -> TraceStatus
where
    B: CollisionBuffers + ?Sized,
    S: TraversalStack,
{
    let query = match SegmentQuery::new(origin, tmin, direction, tmax) {
        Some(query) => query,
        None => return TraceStatus::Miss,
    };

    stack.clear();
    if !stack.push(buffers.root()) {
        return TraceStatus::StackOverflow;
    }

    while let Some(node) = stack.pop() {
        if !overlap_bv_ray(&query.ray, buffers.node_center(node), buffers.node_extents(node)) {
            continue;
        }

        match buffers.node_kind(node) {
            NodeKind::Leaf { element } => {
                let corners = buffers.triangle(element);
                if let Some(hit) = intersect_triangle_ray(&query.ray, corners) {
                    if query.accepts(hit.t) {
                        return TraceStatus::Hit;
                    }
                }
            }
            NodeKind::Interior { left, right } => {
                // Right first so the left subtree is popped next
                if !stack.push(right) || !stack.push(left) {
                    return TraceStatus::StackOverflow;
                }
            }
        }
    }

    TraceStatus::Miss
}

/// [`trace_any_hit`] for a query record read from the ray buffer
pub fn trace_ray_query<B, S>(buffers: &B, stack: &mut S, query: &RayQuery) -> TraceStatus
where
    B: CollisionBuffers + ?Sized,
    S: TraversalStack,
{
    trace_any_hit(buffers, stack, query.origin(), query.tmin, query.direction(), query.tmax)
}

#![no_std]

//! Flat collision buffers and the any-hit tracing kernel.
//!
//! Everything in this crate is shared verbatim between the host and the
//! compute shader: the `#[repr(C)]` records describe the exact bytes that are
//! uploaded, and the kernel functions are pure over read-only buffers.

#[cfg(not(target_arch = "spirv"))]
extern crate alloc;

pub mod access;
pub mod bvh;
pub mod intersection;
pub mod ray;

pub use access::{CollisionBuffers, PackedBuffers, SliceBuffers};
pub use bvh::{trace_any_hit, trace_ray_query, FixedStack, TraversalStack};
pub use intersection::{overlap_bv_ray, intersect_triangle_ray, TriangleHit};
pub use ray::{RayBBox, SegmentQuery};

pub use glam;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Configuration constants for the tracer
pub struct TracerConfig;

impl TracerConfig {
    /// Smallest value such that `1.0 + FLT_EPSILON != 1.0` (1.192092896e-07).
    pub const FLT_EPSILON: f32 = f32::EPSILON;
    /// Parametric distance that stands for "no intersection" on the segment.
    pub const MISS_T: f32 = 1.0;
    /// `element_index` value marking an interior node.
    pub const INTERIOR_SENTINEL: i32 = -1;
    /// Traversal stack entries available to one shader invocation.
    pub const GPU_STACK_CAPACITY: usize = 64;
    /// Must match `threads(..)` on the compute entry point.
    pub const THREAD_GROUP_SIZE: u32 = 64;
    pub const MAX_WORKGROUPS_PER_DISPATCH: u32 = 65_535;
    pub const MAX_PUSH_CONSTANT_SIZE: u32 = 128;
    pub const MAX_BUFFER_SIZE: u64 = 128 * 1024 * 1024;
}

/// One node of the implicit binary tree.
/// Layout: 48 bytes, std430 compatible
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CollisionNode {
    pub center: [f32; 3],   // Box center
    pub _padding1: f32,
    pub extents: [f32; 3],  // Box half-extents
    pub _padding2: f32,
    pub left: i32,          // Left child (interior only)
    pub right: i32,         // Right child (interior only)
    pub element_index: i32, // First corner in the element buffer, -1 for interior nodes
    pub _padding3: i32,
}

/// Header in front of the node array in the GPU node buffer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct NodeBufferHeader {
    pub nodes_root: i32,
    pub _padding: [i32; 3],
}

/// One any-hit query as uploaded to the ray buffer
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RayQuery {
    pub origin: [f32; 3],
    pub tmin: f32,
    pub direction: [f32; 3],
    pub tmax: f32,
}

/// Push constants for the trace compute shader
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TracePushConstants {
    pub ray_count: u32,
    pub _padding: [u32; 3],
}

/// Type-safe view of a node's role in the tree
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Interior { left: u32, right: u32 },
    Leaf { element: u32 },
}

/// Outcome of a single any-hit query, also the code written by the shader
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum TraceStatus {
    Miss = 0,
    Hit = 1,
    /// The traversal needed more stack entries than the stack could hold.
    StackOverflow = 2,
}

impl CollisionNode {
    /// Create a leaf referencing the triangle whose corners start at `element_index`
    pub fn leaf(center: [f32; 3], extents: [f32; 3], element_index: u32) -> Self {
        Self {
            center,
            _padding1: 0.0,
            extents,
            _padding2: 0.0,
            left: TracerConfig::INTERIOR_SENTINEL,
            right: TracerConfig::INTERIOR_SENTINEL,
            element_index: element_index as i32,
            _padding3: 0,
        }
    }

    /// Create an interior node with two children
    pub fn interior(center: [f32; 3], extents: [f32; 3], left: u32, right: u32) -> Self {
        Self {
            center,
            _padding1: 0.0,
            extents,
            _padding2: 0.0,
            left: left as i32,
            right: right as i32,
            element_index: TracerConfig::INTERIOR_SENTINEL,
            _padding3: 0,
        }
    }

    /// Convert min/max bounds into center/half-extent form
    pub fn bounds_to_center_extents(min: Vec3, max: Vec3) -> ([f32; 3], [f32; 3]) {
        let center = (min + max) * 0.5;
        let extents = (max - min) * 0.5;
        (center.to_array(), extents.to_array())
    }

    pub fn is_leaf(&self) -> bool {
        self.element_index != TracerConfig::INTERIOR_SENTINEL
    }

    pub fn kind(&self) -> NodeKind {
        if self.is_leaf() {
            NodeKind::Leaf { element: self.element_index as u32 }
        } else {
            NodeKind::Interior { left: self.left as u32, right: self.right as u32 }
        }
    }

    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    pub fn extents(&self) -> Vec3 {
        Vec3::from_array(self.extents)
    }

    pub fn min(&self) -> Vec3 {
        self.center() - self.extents()
    }

    pub fn max(&self) -> Vec3 {
        self.center() + self.extents()
    }
}

impl NodeBufferHeader {
    /// Size of the header in 32-bit words
    pub const WORDS: usize = core::mem::size_of::<Self>() / 4;

    pub fn new(nodes_root: u32) -> Self {
        Self {
            nodes_root: nodes_root as i32,
            _padding: [0; 3],
        }
    }
}

impl RayQuery {
    pub fn new(origin: Vec3, tmin: f32, direction: Vec3, tmax: f32) -> Self {
        Self {
            origin: origin.to_array(),
            tmin,
            direction: direction.to_array(),
            tmax,
        }
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }

    pub fn direction(&self) -> Vec3 {
        Vec3::from_array(self.direction)
    }
}

impl TracePushConstants {
    pub fn new(ray_count: u32) -> Self {
        Self {
            ray_count,
            _padding: [0; 3],
        }
    }
}

impl TraceStatus {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Miss),
            1 => Some(Self::Hit),
            2 => Some(Self::StackOverflow),
            _ => None,
        }
    }

    pub fn is_hit(self) -> bool {
        self == Self::Hit
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn test_record_sizes_match_gpu_layout() {
        assert_eq!(size_of::<CollisionNode>(), 48);
        assert_eq!(size_of::<NodeBufferHeader>(), 16);
        assert_eq!(size_of::<RayQuery>(), 32);
        assert_eq!(size_of::<TracePushConstants>(), 16);
        assert!(size_of::<TracePushConstants>() as u32 <= TracerConfig::MAX_PUSH_CONSTANT_SIZE);
        assert_eq!(NodeBufferHeader::WORDS, 4);
    }

    #[test]
    fn test_node_field_offsets() {
        let node = CollisionNode::interior([1.0, 2.0, 3.0], [4.0, 5.0, 6.0], 7, 8);
        let words: &[u32] = bytemuck::cast_slice(core::slice::from_ref(&node));

        assert_eq!(f32::from_bits(words[0]), 1.0);
        assert_eq!(f32::from_bits(words[4]), 4.0);
        assert_eq!(words[8] as i32, 7);
        assert_eq!(words[9] as i32, 8);
        assert_eq!(words[10] as i32, -1);
    }

    #[test]
    fn test_leaf_classification() {
        let leaf = CollisionNode::leaf([0.0; 3], [1.0; 3], 0);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.kind(), NodeKind::Leaf { element: 0 });
        assert_eq!(leaf.left, -1);
        assert_eq!(leaf.right, -1);

        let interior = CollisionNode::interior([0.0; 3], [1.0; 3], 1, 2);
        assert!(!interior.is_leaf());
        assert_eq!(interior.kind(), NodeKind::Interior { left: 1, right: 2 });
    }

    #[test]
    fn test_center_extents_round_trip_bounds() {
        let (center, extents) = CollisionNode::bounds_to_center_extents(
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, 4.0, 2.0),
        );
        assert_eq!(center, [1.0, 2.0, 2.0]);
        assert_eq!(extents, [2.0, 2.0, 0.0]);

        let node = CollisionNode::leaf(center, extents, 3);
        assert_eq!(node.min(), Vec3::new(-1.0, 0.0, 2.0));
        assert_eq!(node.max(), Vec3::new(3.0, 4.0, 2.0));
    }

    #[test]
    fn test_trace_status_codes() {
        for status in [TraceStatus::Miss, TraceStatus::Hit, TraceStatus::StackOverflow] {
            assert_eq!(TraceStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(TraceStatus::from_code(17), None);
        assert!(TraceStatus::Hit.is_hit());
        assert!(!TraceStatus::StackOverflow.is_hit());
    }

    #[test]
    fn test_push_constants_words() {
        let constants = TracePushConstants::new(1000);
        let words: &[u32] = bytemuck::cast_slice(core::slice::from_ref(&constants));
        assert_eq!(words, &[1000, 0, 0, 0]);
    }
}

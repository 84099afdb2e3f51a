use glam::Vec3;
use crate::{CollisionNode, NodeBufferHeader, NodeKind, TracerConfig};

/// Read-only view over the three collision buffers.
///
/// Implementations assume a validated scene: indices are in range and the
/// tree is acyclic. The kernel never checks them again.
pub trait CollisionBuffers {
    fn root(&self) -> u32;
    fn node_center(&self, node: u32) -> Vec3;
    fn node_extents(&self, node: u32) -> Vec3;
    fn node_kind(&self, node: u32) -> NodeKind;
    fn element(&self, index: u32) -> u32;
    fn vertex(&self, index: u32) -> Vec3;

    /// Corner positions of the triangle whose indices start at `first_element`
    fn triangle(&self, first_element: u32) -> [Vec3; 3] {
        [
            self.vertex(self.element(first_element)),
            self.vertex(self.element(first_element + 1)),
            self.vertex(self.element(first_element + 2)),
        ]
    }
}

/// Typed slices, used on the host
#[derive(Copy, Clone, Debug)]
pub struct SliceBuffers<'a> {
    pub root: u32,
    pub nodes: &'a [CollisionNode],
    pub vertices: &'a [[f32; 4]],
    pub elements: &'a [i32],
}

impl CollisionBuffers for SliceBuffers<'_> {
    fn root(&self) -> u32 {
        self.root
    }

    fn node_center(&self, node: u32) -> Vec3 {
        self.nodes[node as usize].center()
    }

    fn node_extents(&self, node: u32) -> Vec3 {
        self.nodes[node as usize].extents()
    }

    fn node_kind(&self, node: u32) -> NodeKind {
        self.nodes[node as usize].kind()
    }

    fn element(&self, index: u32) -> u32 {
        self.elements[index as usize] as u32
    }

    fn vertex(&self, index: u32) -> Vec3 {
        let v = self.vertices[index as usize];
        Vec3::new(v[0], v[1], v[2])
    }
}

/// Raw node words as bound in the compute shader.
///
/// `node_words` starts with a [`NodeBufferHeader`] followed by
/// [`CollisionNode`] records of `NODE_WORDS` words each.
#[derive(Copy, Clone, Debug)]
pub struct PackedBuffers<'a> {
    pub node_words: &'a [u32],
    pub vertices: &'a [[f32; 4]],
    pub elements: &'a [i32],
}

impl PackedBuffers<'_> {
    pub const NODE_WORDS: usize = core::mem::size_of::<CollisionNode>() / 4;

    const CENTER: usize = 0;
    const EXTENTS: usize = 4;
    const LEFT: usize = 8;
    const RIGHT: usize = 9;
    const ELEMENT: usize = 10;

    fn word(&self, node: u32, field: usize) -> u32 {
        self.node_words[NodeBufferHeader::WORDS + node as usize * Self::NODE_WORDS + field]
    }

    fn vec3_at(&self, node: u32, field: usize) -> Vec3 {
        Vec3::new(
            f32::from_bits(self.word(node, field)),
            f32::from_bits(self.word(node, field + 1)),
            f32::from_bits(self.word(node, field + 2)),
        )
    }
}

impl CollisionBuffers for PackedBuffers<'_> {
    fn root(&self) -> u32 {
        self.node_words[0]
    }

    fn node_center(&self, node: u32) -> Vec3 {
        self.vec3_at(node, Self::CENTER)
    }

    fn node_extents(&self, node: u32) -> Vec3 {
        self.vec3_at(node, Self::EXTENTS)
    }

    fn node_kind(&self, node: u32) -> NodeKind {
        let element = self.word(node, Self::ELEMENT) as i32;
        if element == TracerConfig::INTERIOR_SENTINEL {
            NodeKind::Interior {
                left: self.word(node, Self::LEFT),
                right: self.word(node, Self::RIGHT),
            }
        } else {
            NodeKind::Leaf { element: element as u32 }
        }
    }

    fn element(&self, index: u32) -> u32 {
        self.elements[index as usize] as u32
    }

    fn vertex(&self, index: u32) -> Vec3 {
        let v = self.vertices[index as usize];
        Vec3::new(v[0], v[1], v[2])
    }
}

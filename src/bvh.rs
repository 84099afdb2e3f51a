use bvh::{
    aabb::{Aabb as BvhAabb, Bounded},
    bounding_hierarchy::BHShape,
    bvh::Bvh as BVH,
};
use collision_shared::{CollisionNode, TracerConfig};
use glam::Vec3;
use log::info;
use crate::error::BuildError;
use crate::mesh::IndexedMesh;
use crate::scene::CollisionScene;

// Type aliases for specific f32 3D types
type Point3f = nalgebra::Point3<f32>;
type BvhAabbf = BvhAabb<f32, 3>;
type BVHf = BVH<f32, 3>;

/// Wrapper for one mesh triangle to implement BHShape trait for BVH construction
#[derive(Clone, Copy, Debug)]
pub struct BvhTriangle {
    pub corners: [Point3f; 3],
    /// Index of the triangle in the mesh
    pub triangle_index: usize,
    pub node_index: usize,
}

impl BvhTriangle {
    pub fn new(corners: [[f32; 3]; 3], triangle_index: usize) -> Self {
        Self {
            corners: corners.map(Point3f::from),
            triangle_index,
            node_index: 0,
        }
    }
}

impl Bounded<f32, 3> for BvhTriangle {
    fn aabb(&self) -> BvhAabbf {
        let [v0, v1, v2] = self.corners;

        let min = Point3f::new(
            v0.x.min(v1.x).min(v2.x),
            v0.y.min(v1.y).min(v2.y),
            v0.z.min(v1.z).min(v2.z),
        );

        let max = Point3f::new(
            v0.x.max(v1.x).max(v2.x),
            v0.y.max(v1.y).max(v2.y),
            v0.z.max(v1.z).max(v2.z),
        );

        BvhAabbf::with_bounds(min, max)
    }
}

impl BHShape<f32, 3> for BvhTriangle {
    fn set_bh_node_index(&mut self, index: usize) {
        self.node_index = index;
    }

    fn bh_node_index(&self) -> usize {
        self.node_index
    }
}

/// Builds flat collision buffers from an indexed triangle mesh
pub struct CollisionBvhBuilder;

impl CollisionBvhBuilder {
    /// Build a SAH BVH with one triangle per leaf and validate the result
    pub fn build(mesh: &IndexedMesh) -> Result<CollisionScene, BuildError> {
        Self::check_mesh(mesh)?;
        let build_start = std::time::Instant::now();

        let mut bvh_triangles: Vec<BvhTriangle> = (0..mesh.triangle_count())
            .map(|i| {
                let corners = mesh.triangle(i).map(|v| v.to_array());
                BvhTriangle::new(corners, i)
            })
            .collect();

        // Build BVH using the bvh crate
        let bvh = BVHf::build(&mut bvh_triangles);

        let mut nodes = Vec::with_capacity(bvh.nodes.len());
        Self::flatten_node(&bvh.nodes, 0, &bvh_triangles, &mut nodes);

        let vertices = mesh.positions.iter().map(|&[x, y, z]| [x, y, z, 1.0]).collect();
        // Leaf for triangle k points at element 3k, so the mesh indices are the element buffer
        let elements = mesh.indices.iter().map(|&i| i as i32).collect();

        let node_count = nodes.len();
        let scene = CollisionScene::from_buffers(0, nodes, vertices, elements)?;

        info!(
            "Built collision BVH: {} triangles, {} nodes, depth {} in {:.2}ms",
            mesh.triangle_count(),
            node_count,
            scene.depth(),
            build_start.elapsed().as_secs_f32() * 1000.0
        );

        Ok(scene)
    }

    fn check_mesh(mesh: &IndexedMesh) -> Result<(), BuildError> {
        if mesh.indices.len() % 3 != 0 {
            return Err(BuildError::IndexCount(mesh.indices.len()));
        }
        if mesh.is_empty() {
            return Err(BuildError::NoTriangles);
        }
        let vertex_count = mesh.positions.len();
        if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(BuildError::IndexOutOfRange { index, vertex_count });
        }
        Ok(())
    }

    /// Convert a bounding box into a node box, padded so that rounding in
    /// center/extent form never shrinks it below its contents
    fn node_box(aabb: &BvhAabbf) -> ([f32; 3], [f32; 3]) {
        let min = Vec3::from_array(aabb.min.coords.into());
        let max = Vec3::from_array(aabb.max.coords.into());
        let (center, extents) = CollisionNode::bounds_to_center_extents(min, max);

        let magnitude = Vec3::from_array(center).abs() + Vec3::from_array(extents);
        let padded = Vec3::from_array(extents) + magnitude * (4.0 * TracerConfig::FLT_EPSILON);
        (center, padded.to_array())
    }

    /// Recursively convert BVH nodes, returns the index of the converted node
    fn flatten_node(
        bvh_nodes: &[bvh::bvh::BvhNode<f32, 3>],
        node_index: usize,
        bvh_triangles: &[BvhTriangle],
        result_nodes: &mut Vec<CollisionNode>,
    ) -> u32 {
        let current_result_index = result_nodes.len() as u32;
        let bvh_node = &bvh_nodes[node_index];
        let (center, extents) = Self::node_box(&bvh_node.get_node_aabb(bvh_triangles));

        match bvh_node {
            bvh::bvh::BvhNode::Node {
                child_l_index,
                child_r_index,
                ..
            } => {
                // Placeholder until the children have indices
                result_nodes.push(CollisionNode::interior(center, extents, 0, 0));

                let left_index = Self::flatten_node(bvh_nodes, *child_l_index, bvh_triangles, result_nodes);
                let right_index = Self::flatten_node(bvh_nodes, *child_r_index, bvh_triangles, result_nodes);

                result_nodes[current_result_index as usize] =
                    CollisionNode::interior(center, extents, left_index, right_index);
            }
            bvh::bvh::BvhNode::Leaf { shape_index, .. } => {
                let triangle_index = bvh_triangles[*shape_index].triangle_index;
                result_nodes.push(CollisionNode::leaf(center, extents, (triangle_index * 3) as u32));
            }
        }

        current_result_index
    }
}

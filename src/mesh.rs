use glam::Vec3;

/// Indexed triangle soup, three indices per triangle
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexedMesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl IndexedMesh {
    pub fn new(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Build a mesh from unshared triangle corners
    pub fn from_triangles(triangles: &[[[f32; 3]; 3]]) -> Self {
        let mut mesh = Self::default();
        for triangle in triangles {
            mesh.push_triangle(triangle[0], triangle[1], triangle[2]);
        }
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn push_triangle(&mut self, a: [f32; 3], b: [f32; 3], c: [f32; 3]) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&[a, b, c]);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Append another mesh, offsetting its indices
    pub fn append(&mut self, other: &IndexedMesh) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Corners of triangle `index`
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let i = &self.indices[index * 3..index * 3 + 3];
        [
            Vec3::from_array(self.positions[i[0] as usize]),
            Vec3::from_array(self.positions[i[1] as usize]),
            Vec3::from_array(self.positions[i[2] as usize]),
        ]
    }

    /// Axis-aligned cube given by center and half size
    pub fn cube(center: [f32; 3], half: f32) -> Self {
        let c = Vec3::from_array(center);
        let positions = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ]
        .iter()
        .map(|p| (c + Vec3::from_array(*p) * half).to_array())
        .collect();

        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  0, 3, 2, // -z
            4, 5, 6,  4, 6, 7, // +z
            0, 1, 5,  0, 5, 4, // -y
            3, 7, 6,  3, 6, 2, // +y
            0, 4, 7,  0, 7, 3, // -x
            1, 2, 6,  1, 6, 5, // +x
        ];

        Self { positions, indices }
    }

    /// Ground quad, a cube and two free-standing triangles
    pub fn default_scene() -> Self {
        let mut mesh = Self::new(
            vec![
                [-10.0, -0.5, -10.0],
                [10.0, -0.5, -10.0],
                [10.0, -0.5, 10.0],
                [-10.0, -0.5, 10.0],
            ],
            vec![0, 2, 1, 0, 3, 2],
        );

        mesh.append(&Self::cube([0.0, 0.0, -1.0], 0.5));
        mesh.push_triangle([0.0, 1.0, -2.0], [-0.5, 0.0, -2.0], [0.5, 0.0, -2.0]);
        mesh.push_triangle([1.5, 0.5, -3.0], [1.0, -0.5, -3.0], [2.0, -0.5, -3.0]);
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_triangles_unshares_corners() {
        let mesh = IndexedMesh::from_triangles(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.positions.len(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.triangle(1)[1], Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut mesh = IndexedMesh::cube([0.0; 3], 1.0);
        mesh.append(&IndexedMesh::cube([3.0, 0.0, 0.0], 1.0));

        assert_eq!(mesh.triangle_count(), 24);
        assert_eq!(mesh.positions.len(), 16);
        assert!(mesh.indices[36..].iter().all(|&i| (8..16).contains(&i)));
    }

    #[test]
    fn test_default_scene() {
        let mesh = IndexedMesh::default_scene();

        assert_eq!(mesh.triangle_count(), 2 + 12 + 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
    }
}

use std::collections::HashMap;
use std::path::Path;
use gltf::{mesh::Mode, Document, Node, Primitive};
use log::{info, warn};
use crate::error::LoadError;
use crate::mesh::IndexedMesh;

/// Loads triangle geometry from glTF / GLB files as one indexed mesh
pub struct MeshLoader {
    document: Document,
    buffers: Vec<gltf::buffer::Data>,
}

/// Accumulates world-space triangles, sharing bit-identical positions
#[derive(Default)]
struct MeshAccumulator {
    mesh: IndexedMesh,
    vertex_map: HashMap<[u32; 3], u32>,
}

impl MeshAccumulator {
    fn vertex_index(&mut self, position: [f32; 3]) -> u32 {
        let pos_bits = position.map(f32::to_bits);
        let positions = &mut self.mesh.positions;
        *self.vertex_map.entry(pos_bits).or_insert_with(|| {
            positions.push(position);
            (positions.len() - 1) as u32
        })
    }

    fn push_triangle(&mut self, a: [f32; 3], b: [f32; 3], c: [f32; 3]) {
        let indices = [self.vertex_index(a), self.vertex_index(b), self.vertex_index(c)];
        self.mesh.indices.extend_from_slice(&indices);
    }
}

impl MeshLoader {
    /// Load a glTF or GLB file from path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let (document, buffers, _images) = gltf::import(path)?;
        Ok(Self { document, buffers })
    }

    /// Load GLB (or self-contained glTF) from binary data
    pub fn load_from_glb(data: &[u8]) -> Result<Self, LoadError> {
        let (document, buffers, _images) = gltf::import_slice(data)?;
        Ok(Self { document, buffers })
    }

    /// Collect every triangle primitive of a scene in world space.
    ///
    /// `None` picks the default scene, or the first one if no default is set.
    pub fn extract_mesh(&self, scene_index: Option<usize>) -> Result<IndexedMesh, LoadError> {
        let scene = if let Some(index) = scene_index {
            self.document.scenes().nth(index)
                .ok_or_else(|| LoadError::Validation(format!("Scene {} not found", index)))?
        } else {
            self.document.default_scene()
                .or_else(|| self.document.scenes().next())
                .ok_or_else(|| LoadError::Validation("No scenes found in glTF file".to_string()))?
        };

        let mut accumulator = MeshAccumulator::default();
        for node in scene.nodes() {
            self.process_node(&node, &glam::Mat4::IDENTITY, &mut accumulator)?;
        }

        let mesh = accumulator.mesh;
        info!(
            "Loaded glTF mesh: {} triangles, {} vertices",
            mesh.triangle_count(),
            mesh.positions.len()
        );
        Ok(mesh)
    }

    /// Process a node and its children recursively
    fn process_node(
        &self,
        node: &Node,
        parent_transform: &glam::Mat4,
        accumulator: &mut MeshAccumulator,
    ) -> Result<(), LoadError> {
        let local_transform = glam::Mat4::from_cols_array_2d(&node.transform().matrix());
        let transform = *parent_transform * local_transform;

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                self.process_primitive(&primitive, &transform, accumulator)?;
            }
        }

        for child in node.children() {
            self.process_node(&child, &transform, accumulator)?;
        }

        Ok(())
    }

    fn process_primitive(
        &self,
        primitive: &Primitive,
        transform: &glam::Mat4,
        accumulator: &mut MeshAccumulator,
    ) -> Result<(), LoadError> {
        let mode = primitive.mode();
        if !matches!(mode, Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan) {
            warn!("Skipping primitive with unsupported mode {:?}", mode);
            return Ok(());
        }

        let reader = primitive.reader(|buffer| self.buffers.get(buffer.index()).map(|data| &data[..]));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| LoadError::Validation("Primitive missing position data".to_string()))?
            .map(|p| transform.transform_point3(glam::Vec3::from_array(p)).to_array())
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let corner = |i: u32| -> Result<[f32; 3], LoadError> {
            positions.get(i as usize).copied().ok_or_else(|| {
                LoadError::Validation(format!(
                    "Index {} out of range for {} positions",
                    i,
                    positions.len()
                ))
            })
        };

        match mode {
            Mode::Triangles => {
                for chunk in indices.chunks_exact(3) {
                    accumulator.push_triangle(corner(chunk[0])?, corner(chunk[1])?, corner(chunk[2])?);
                }
            }
            Mode::TriangleStrip => {
                for (i, window) in indices.windows(3).enumerate() {
                    // Alternate winding order for strips
                    if i % 2 == 0 {
                        accumulator.push_triangle(corner(window[0])?, corner(window[1])?, corner(window[2])?);
                    } else {
                        accumulator.push_triangle(corner(window[1])?, corner(window[0])?, corner(window[2])?);
                    }
                }
            }
            Mode::TriangleFan => {
                if let Some((&center, rest)) = indices.split_first() {
                    for pair in rest.windows(2) {
                        accumulator.push_triangle(corner(center)?, corner(pair[0])?, corner(pair[1])?);
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Get scene count
    pub fn scene_count(&self) -> usize {
        self.document.scenes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];

    /// Assemble a GLB container from a JSON document and a binary chunk
    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    /// Square in the z = 0 plane under a node translated by `translation`
    fn square_glb(mode: u32, indices: Option<&[u16]>, translation: [f32; 3]) -> Vec<u8> {
        let mut bin: Vec<u8> = bytemuck::cast_slice(&SQUARE).to_vec();
        let position_bytes = bin.len();

        let (index_view, index_accessor, index_ref) = match indices {
            Some(indices) => {
                bin.extend_from_slice(bytemuck::cast_slice(indices));
                (
                    format!(
                        r#",{{"buffer":0,"byteOffset":{},"byteLength":{}}}"#,
                        position_bytes,
                        indices.len() * 2
                    ),
                    format!(
                        r#",{{"bufferView":1,"componentType":5123,"count":{},"type":"SCALAR"}}"#,
                        indices.len()
                    ),
                    r#","indices":1"#.to_string(),
                )
            }
            None => (String::new(), String::new(), String::new()),
        };

        let json = format!(
            r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],"nodes":[{{"mesh":0,"translation":[{},{},{}]}}],"meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"mode":{}{}}}]}}],"buffers":[{{"byteLength":{}}}],"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":{}}}{}],"accessors":[{{"bufferView":0,"componentType":5126,"count":4,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}}{}]}}"#,
            translation[0],
            translation[1],
            translation[2],
            mode,
            index_ref,
            bin.len(),
            position_bytes,
            index_view,
            index_accessor,
        );

        glb(&json, &bin)
    }

    #[test]
    fn test_indexed_triangles_with_translation() {
        let data = square_glb(4, Some(&[0, 1, 2, 0, 2, 3]), [0.0, 0.0, 5.0]);
        let loader = MeshLoader::load_from_glb(&data).unwrap();
        let mesh = loader.extract_mesh(None).unwrap();

        assert_eq!(loader.scene_count(), 1);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.positions.len(), 4);
        assert!(mesh.positions.iter().all(|p| p[2] == 5.0));
        assert_eq!(mesh.positions[2], [1.0, 1.0, 5.0]);
    }

    #[test]
    fn test_triangle_strip_without_indices() {
        let data = square_glb(5, None, [0.0; 3]);
        let mesh = MeshLoader::load_from_glb(&data).unwrap().extract_mesh(None).unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        // Second strip triangle has its first two corners swapped
        assert_eq!(&mesh.indices[3..], &[2, 1, 3]);
    }

    #[test]
    fn test_triangle_fan_without_indices() {
        let data = square_glb(6, None, [0.0; 3]);
        let mesh = MeshLoader::load_from_glb(&data).unwrap().extract_mesh(None).unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_lines_are_skipped() {
        let data = square_glb(1, None, [0.0; 3]);
        let mesh = MeshLoader::load_from_glb(&data).unwrap().extract_mesh(None).unwrap();

        assert!(mesh.is_empty());
    }

    #[test]
    fn test_missing_scene_index() {
        let data = square_glb(4, None, [0.0; 3]);
        let loader = MeshLoader::load_from_glb(&data).unwrap();

        assert!(matches!(loader.extract_mesh(Some(3)), Err(LoadError::Validation(_))));
    }

    #[test]
    fn test_invalid_data() {
        assert!(matches!(MeshLoader::load_from_glb(b"not a gltf file"), Err(LoadError::Gltf(_))));
    }
}

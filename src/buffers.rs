use collision_shared::{RayQuery, TracerConfig};
use log::{debug, info};
use crate::error::TraceError;
use crate::scene::CollisionScene;

/// Storage buffers for one traced scene and a batch of rays, grown on demand
pub struct TraceBuffers {
    pub node_buffer: wgpu::Buffer,
    pub vertex_buffer: wgpu::Buffer,
    pub element_buffer: wgpu::Buffer,
    pub ray_buffer: wgpu::Buffer,
    pub result_buffer: wgpu::Buffer,
    /// Mappable copy target for reading results back
    pub staging_buffer: wgpu::Buffer,

    // Capacities in elements of each buffer's type
    pub node_words_capacity: usize,
    pub vertex_capacity: usize,
    pub element_capacity: usize,
    pub ray_capacity: usize,

    /// Set when any buffer was recreated and bind groups must be rebuilt
    resized: bool,
}

impl TraceBuffers {
    const DEFAULT_NODE_WORDS: usize = 4096;
    const DEFAULT_VERTICES: usize = 1024;
    const DEFAULT_ELEMENTS: usize = 3072;
    const DEFAULT_RAYS: usize = 65_536;

    /// Largest number of rays that fits one ray buffer binding
    pub fn max_rays_per_batch() -> usize {
        let by_size = TracerConfig::MAX_BUFFER_SIZE as usize / std::mem::size_of::<RayQuery>();
        let by_dispatch =
            (TracerConfig::MAX_WORKGROUPS_PER_DISPATCH * TracerConfig::THREAD_GROUP_SIZE) as usize;
        by_size.min(by_dispatch)
    }

    pub fn new(device: &wgpu::Device) -> Self {
        let storage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;

        Self {
            node_buffer: create_buffer(device, "Node Buffer", Self::DEFAULT_NODE_WORDS * 4, storage),
            vertex_buffer: create_buffer(device, "Vertex Buffer", Self::DEFAULT_VERTICES * 16, storage),
            element_buffer: create_buffer(device, "Element Buffer", Self::DEFAULT_ELEMENTS * 4, storage),
            ray_buffer: create_buffer(
                device,
                "Ray Buffer",
                Self::DEFAULT_RAYS * std::mem::size_of::<RayQuery>(),
                storage,
            ),
            result_buffer: create_buffer(
                device,
                "Result Buffer",
                Self::DEFAULT_RAYS * 4,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            ),
            staging_buffer: create_buffer(
                device,
                "Result Staging Buffer",
                Self::DEFAULT_RAYS * 4,
                wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            ),
            node_words_capacity: Self::DEFAULT_NODE_WORDS,
            vertex_capacity: Self::DEFAULT_VERTICES,
            element_capacity: Self::DEFAULT_ELEMENTS,
            ray_capacity: Self::DEFAULT_RAYS,
            resized: true,
        }
    }

    /// Returns true once after any buffer was recreated
    pub fn take_resized(&mut self) -> bool {
        std::mem::replace(&mut self.resized, false)
    }

    /// Upload node words, vertices and elements, resizing if necessary.
    ///
    /// Fails without touching the GPU when any of them exceeds a single storage binding.
    pub fn upload_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &CollisionScene,
    ) -> Result<(), TraceError> {
        let node_words = scene.node_buffer_words();
        let storage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;

        let node_words_capacity = grow_capacity("node buffer", self.node_words_capacity, node_words.len(), 4)?;
        let vertex_capacity = grow_capacity("vertex buffer", self.vertex_capacity, scene.vertices().len(), 16)?;
        let element_capacity = grow_capacity("element buffer", self.element_capacity, scene.elements().len(), 4)?;

        if node_words_capacity != self.node_words_capacity {
            self.node_words_capacity = node_words_capacity;
            self.node_buffer = create_buffer(device, "Node Buffer", self.node_words_capacity * 4, storage);
            self.resized = true;
            info!("Resized node buffer to {} words", self.node_words_capacity);
        }
        if vertex_capacity != self.vertex_capacity {
            self.vertex_capacity = vertex_capacity;
            self.vertex_buffer = create_buffer(device, "Vertex Buffer", self.vertex_capacity * 16, storage);
            self.resized = true;
            info!("Resized vertex buffer to {} vertices", self.vertex_capacity);
        }
        if element_capacity != self.element_capacity {
            self.element_capacity = element_capacity;
            self.element_buffer = create_buffer(device, "Element Buffer", self.element_capacity * 4, storage);
            self.resized = true;
            info!("Resized element buffer to {} elements", self.element_capacity);
        }

        queue.write_buffer(&self.node_buffer, 0, bytemuck::cast_slice(&node_words));
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(scene.vertices()));
        queue.write_buffer(&self.element_buffer, 0, bytemuck::cast_slice(scene.elements()));

        debug!(
            "Uploaded scene: {} node words, {} vertices, {} elements",
            node_words.len(),
            scene.vertices().len(),
            scene.elements().len()
        );
        Ok(())
    }

    /// Upload one chunk of rays; resizes the ray, result and staging buffers together
    pub fn upload_rays(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, rays: &[RayQuery]) {
        if rays.len() > self.ray_capacity {
            self.ray_capacity = (rays.len() * 2).min(Self::max_rays_per_batch()).max(rays.len());

            self.ray_buffer = create_buffer(
                device,
                "Ray Buffer",
                self.ray_capacity * std::mem::size_of::<RayQuery>(),
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            );
            self.result_buffer = create_buffer(
                device,
                "Result Buffer",
                self.ray_capacity * 4,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            );
            self.staging_buffer = create_buffer(
                device,
                "Result Staging Buffer",
                self.ray_capacity * 4,
                wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            );
            self.resized = true;

            info!(
                "Resized ray buffers to {} rays ({:.2} MB)",
                self.ray_capacity,
                (self.ray_capacity * std::mem::size_of::<RayQuery>()) as f64 / (1024.0 * 1024.0)
            );
        }

        queue.write_buffer(&self.ray_buffer, 0, bytemuck::cast_slice(rays));
    }

    /// Copy `count` status codes into the staging buffer and read them back
    pub fn read_results(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        count: usize,
    ) -> Result<Vec<u32>, TraceError> {
        let bytes = (count * 4) as wgpu::BufferAddress;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Result Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.result_buffer, 0, &self.staging_buffer, 0, bytes);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging_buffer.slice(..bytes);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only goes away if read_results already returned
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| TraceError::BufferMap(e.to_string()))?
            .map_err(|e| TraceError::BufferMap(e.to_string()))?;

        let codes = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, u32>(&data).to_vec()
        };
        self.staging_buffer.unmap();

        Ok(codes)
    }
}

/// New capacity (in elements of `element_size` bytes) for holding `required` elements.
///
/// Keeps `current` when it suffices, otherwise doubles `required` but never
/// past `MAX_BUFFER_SIZE`, the largest storage binding the device is asked for.
fn grow_capacity(
    buffer: &'static str,
    current: usize,
    required: usize,
    element_size: usize,
) -> Result<usize, TraceError> {
    let limit = TracerConfig::MAX_BUFFER_SIZE as usize / element_size;
    if required > limit {
        return Err(TraceError::SceneTooLarge {
            buffer,
            size: (required * element_size) as u64,
            limit: TracerConfig::MAX_BUFFER_SIZE,
        });
    }
    if required <= current {
        return Ok(current);
    }
    Ok((required * 2).min(limit))
}

fn create_buffer(
    device: &wgpu::Device,
    label: &str,
    size: usize,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as wgpu::BufferAddress,
        usage,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use collision_shared::{CollisionNode, NodeBufferHeader};

    const NODE_HEADER_WORDS: usize = NodeBufferHeader::WORDS;
    const NODE_WORDS: usize = std::mem::size_of::<CollisionNode>() / 4;

    #[test]
    fn test_batch_limit_fits_dispatch_and_binding() {
        let max = TraceBuffers::max_rays_per_batch();

        assert_eq!(max, 65_535 * 64);
        assert!((max * std::mem::size_of::<RayQuery>()) as u64 <= TracerConfig::MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_grow_capacity_keeps_or_doubles() {
        assert_eq!(grow_capacity("node buffer", 4096, 100, 4).unwrap(), 4096);
        assert_eq!(grow_capacity("node buffer", 4096, 4096, 4).unwrap(), 4096);
        assert_eq!(grow_capacity("node buffer", 4096, 5000, 4).unwrap(), 10_000);
    }

    #[test]
    fn test_grow_capacity_clamps_to_binding_limit() {
        // ~1.4M nodes: fits one binding, but doubling would not
        let words = NODE_HEADER_WORDS + 1_400_000 * NODE_WORDS;
        let capacity = grow_capacity("node buffer", 4096, words, 4).unwrap();

        assert!(capacity >= words);
        assert_eq!((capacity * 4) as u64, TracerConfig::MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_grow_capacity_rejects_oversized_scene() {
        let vertices = TracerConfig::MAX_BUFFER_SIZE as usize / 16 + 1;
        let err = grow_capacity("vertex buffer", 1024, vertices, 16).unwrap_err();

        match err {
            TraceError::SceneTooLarge { buffer, size, limit } => {
                assert_eq!(buffer, "vertex buffer");
                assert_eq!(size, vertices as u64 * 16);
                assert_eq!(limit, TracerConfig::MAX_BUFFER_SIZE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

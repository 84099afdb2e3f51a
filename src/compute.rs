use std::time::Instant;
use collision_shared::{RayQuery, TracePushConstants, TraceStatus, TracerConfig};
use log::{debug, info};
use wgpu::util::make_spirv;
use crate::batch::decode_statuses;
use crate::buffers::TraceBuffers;
use crate::error::TraceError;
use crate::scene::CollisionScene;

/// Any-hit tracing on the GPU through the `trace_any_hit_cs` compute shader
pub struct GpuTracer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
    buffers: TraceBuffers,
}

impl GpuTracer {
    pub fn new() -> Result<Self, TraceError> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self, TraceError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(TraceError::NoAdapter)?;

        info!("Using GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Collision Tracer Device"),
                    features: wgpu::Features::PUSH_CONSTANTS,
                    limits: wgpu::Limits {
                        max_push_constant_size: TracerConfig::MAX_PUSH_CONSTANT_SIZE,
                        max_storage_buffer_binding_size: TracerConfig::MAX_BUFFER_SIZE as u32,
                        ..Default::default()
                    },
                },
                None,
            )
            .await
            .map_err(|e| TraceError::RequestDevice(e.to_string()))?;

        let shader_binary = include_bytes!(env!("shader.spv"));
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trace Shader Module"),
            source: make_spirv(shader_binary),
        });

        // Bindings 0-3 are read-only inputs, 4 receives the status codes
        let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..5)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: binding < 4 },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Trace Bind Group Layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Trace Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..std::mem::size_of::<TracePushConstants>() as u32,
            }],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Trace Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: "trace_any_hit_cs",
        });

        let buffers = TraceBuffers::new(&device);

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            bind_group: None,
            buffers,
        })
    }

    /// Hit flag per ray; fails if the shader stack could overflow or did
    pub fn trace_batch(&mut self, scene: &CollisionScene, rays: &[RayQuery]) -> Result<Vec<bool>, TraceError> {
        let statuses = self.trace_statuses(scene, rays)?;

        statuses
            .into_iter()
            .enumerate()
            .map(|(ray, status)| match status {
                TraceStatus::StackOverflow => Err(TraceError::StackOverflow { ray }),
                status => Ok(status.is_hit()),
            })
            .collect()
    }

    /// Raw shader status per ray
    pub fn trace_statuses(
        &mut self,
        scene: &CollisionScene,
        rays: &[RayQuery],
    ) -> Result<Vec<TraceStatus>, TraceError> {
        // Traversal never holds more than depth + 1 entries
        if scene.depth() + 1 > TracerConfig::GPU_STACK_CAPACITY {
            return Err(TraceError::TreeTooDeep {
                depth: scene.depth(),
                capacity: TracerConfig::GPU_STACK_CAPACITY,
            });
        }

        let start = Instant::now();
        self.buffers.upload_scene(&self.device, &self.queue, scene)?;

        let mut statuses = Vec::with_capacity(rays.len());
        for chunk in rays.chunks(TraceBuffers::max_rays_per_batch()) {
            let codes = self.dispatch_chunk(chunk)?;
            statuses.extend(decode_statuses(&codes)?);
        }

        let hits = statuses.iter().filter(|status| status.is_hit()).count();
        info!(
            "GPU batch: {} rays, {} hits in {:.2}ms",
            rays.len(),
            hits,
            start.elapsed().as_secs_f32() * 1000.0
        );

        Ok(statuses)
    }

    fn dispatch_chunk(&mut self, rays: &[RayQuery]) -> Result<Vec<u32>, TraceError> {
        if rays.is_empty() {
            return Ok(Vec::new());
        }

        self.buffers.upload_rays(&self.device, &self.queue, rays);
        let resized = self.buffers.take_resized();
        let bind_group = match self.bind_group.take() {
            Some(bind_group) if !resized => bind_group,
            _ => self.create_bind_group(),
        };

        let push_constants = TracePushConstants::new(rays.len() as u32);
        let workgroups = (rays.len() as u32 + TracerConfig::THREAD_GROUP_SIZE - 1) / TracerConfig::THREAD_GROUP_SIZE;
        debug!("Dispatching {} workgroups for {} rays", workgroups, rays.len());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Trace Compute Encoder"),
        });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Trace Compute Pass"),
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.set_push_constants(0, bytemuck::cast_slice(&[push_constants]));
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        self.bind_group = Some(bind_group);

        self.buffers.read_results(&self.device, &self.queue, rays.len())
    }

    fn create_bind_group(&self) -> wgpu::BindGroup {
        let buffers = [
            &self.buffers.node_buffer,
            &self.buffers.vertex_buffer,
            &self.buffers.element_buffer,
            &self.buffers.ray_buffer,
            &self.buffers.result_buffer,
        ];
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Trace Bind Group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }
}

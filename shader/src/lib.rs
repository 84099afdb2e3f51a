#![no_std]

use spirv_std::spirv;
use spirv_std::glam::UVec3;
use collision_shared::{
    trace_ray_query, FixedStack, PackedBuffers, RayQuery, TracePushConstants, TracerConfig,
};

/// One invocation answers one any-hit query and writes its `TraceStatus` code.
#[spirv(compute(threads(64)))]
pub fn trace_any_hit_cs(
    #[spirv(global_invocation_id)] id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, storage_buffer)] node_words: &[u32],
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] vertices: &[[f32; 4]],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)] elements: &[i32],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)] rays: &[RayQuery],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)] results: &mut [u32],
    #[spirv(push_constant)] push_constants: &TracePushConstants,
) {
    let index = id.x;
    if index >= push_constants.ray_count || index as usize >= rays.len() {
        return;
    }

    let buffers = PackedBuffers { node_words, vertices, elements };
    let mut stack = FixedStack::<{ TracerConfig::GPU_STACK_CAPACITY }>::new();

    let status = trace_ray_query(&buffers, &mut stack, &rays[index as usize]);
    results[index as usize] = status.code();
}

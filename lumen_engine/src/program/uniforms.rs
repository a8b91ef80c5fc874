/// Built-in uniform blocks shared by every program
///
/// Slot numbers are relative to the descriptor set the block lives in
/// (see `DescriptorSetIndices`).

use crate::graphics_device::{Uniform, UniformBlock, UniformType};

/// Binding of the frame globals block in the GLOBAL set
pub const UBO_GLOBAL_BINDING: u32 = 0;

/// Binding of the per-draw locals block in the LOCAL set
pub const UBO_LOCAL_BINDING: u32 = 0;

/// Binding reserved for the per-light block in the LOCAL set
pub const UBO_FORWARD_LIGHT_BINDING: u32 = 1;

/// Binding of the batched world matrices in the LOCAL set of batched draws
pub const UBO_LOCAL_BATCHED_BINDING: u32 = 0;

/// Instances merged into one batched draw at most (size of the batched block)
pub const BATCHING_COUNT: usize = 10;

/// Engine-frame globals: time, screen, camera and main light
pub fn ubo_global() -> UniformBlock {
    UniformBlock {
        name: "LumenGlobal".to_string(),
        binding: UBO_GLOBAL_BINDING,
        members: vec![
            Uniform::new("l_time", UniformType::Vec4, 1),
            Uniform::new("l_screenSize", UniformType::Vec4, 1),
            Uniform::new("l_screenScale", UniformType::Vec4, 1),
            Uniform::new("l_matView", UniformType::Mat4, 1),
            Uniform::new("l_matViewInv", UniformType::Mat4, 1),
            Uniform::new("l_matProj", UniformType::Mat4, 1),
            Uniform::new("l_matProjInv", UniformType::Mat4, 1),
            Uniform::new("l_matViewProj", UniformType::Mat4, 1),
            Uniform::new("l_matViewProjInv", UniformType::Mat4, 1),
            Uniform::new("l_cameraPos", UniformType::Vec4, 1),
            Uniform::new("l_exposure", UniformType::Vec4, 1),
            Uniform::new("l_mainLitDir", UniformType::Vec4, 1),
            Uniform::new("l_mainLitColor", UniformType::Vec4, 1),
            Uniform::new("l_ambientSky", UniformType::Vec4, 1),
            Uniform::new("l_ambientGround", UniformType::Vec4, 1),
        ],
    }
}

/// Per-draw locals: world matrix and its inverse transpose
pub fn ubo_local() -> UniformBlock {
    UniformBlock {
        name: "LumenLocal".to_string(),
        binding: UBO_LOCAL_BINDING,
        members: vec![
            Uniform::new("l_matWorld", UniformType::Mat4, 1),
            Uniform::new("l_matWorldIT", UniformType::Mat4, 1),
        ],
    }
}

/// One additive light (layout of `ForwardLightUniform`)
pub fn ubo_forward_light() -> UniformBlock {
    UniformBlock {
        name: "LumenForwardLight".to_string(),
        binding: UBO_FORWARD_LIGHT_BINDING,
        members: vec![
            Uniform::new("l_lightPos", UniformType::Vec4, 1),
            Uniform::new("l_lightColor", UniformType::Vec4, 1),
            Uniform::new("l_lightSizeRangeAngle", UniformType::Vec4, 1),
            Uniform::new("l_lightDir", UniformType::Vec4, 1),
        ],
    }
}

/// World matrices of a merged batch
pub fn ubo_local_batched() -> UniformBlock {
    UniformBlock {
        name: "LumenLocalBatched".to_string(),
        binding: UBO_LOCAL_BATCHED_BINDING,
        members: vec![Uniform::new("l_matWorlds", UniformType::Mat4, BATCHING_COUNT as u32)],
    }
}

#[cfg(test)]
#[path = "uniforms_tests.rs"]
mod tests;

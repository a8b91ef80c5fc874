/// Texture and sampler traits
///
/// Textures and samplers are created by collaborators outside this core;
/// descriptor sets only need their backend handles.

use crate::graphics_device::GpuHandle;

/// Texture resource
pub trait Texture: Send + Sync {
    /// Backend handle
    fn gpu_handle(&self) -> GpuHandle;
}

/// Sampler resource
pub trait Sampler: Send + Sync {
    /// Backend handle
    fn gpu_handle(&self) -> GpuHandle;
}

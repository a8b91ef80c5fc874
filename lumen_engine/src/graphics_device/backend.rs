/// Buffer strategies for the two backend generations
///
/// One Buffer type serves both generations; the differences live here and
/// are selected once, when the Device is constructed.

use crate::graphics_device::{GraphicsApi, BufferUsage, Capabilities};

/// Backend-generation specific buffer behavior
pub trait BufferBackend: Send + Sync {
    /// Generation this strategy implements
    fn api(&self) -> GraphicsApi;

    /// Whether a native buffer with this usage gets a device allocation
    ///
    /// Buffers without one are served entirely from their CPU mirror.
    fn allocates_natively(&self, usage: BufferUsage) -> bool;

    /// Whether the device accepts partial uploads at a non-zero offset
    fn supports_offset_update(&self) -> bool;

    /// Validate where a view starts inside its parent
    ///
    /// Returns false (after logging) when the placement is unusable for binding.
    fn check_view_offset(&self, usage: BufferUsage, offset: u64, caps: &Capabilities) -> bool;
}

/// Strategy for APIs without uniform buffer objects
pub struct LegacyBackend;

impl BufferBackend for LegacyBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Legacy
    }

    fn allocates_natively(&self, usage: BufferUsage) -> bool {
        !usage.contains(BufferUsage::UNIFORM)
    }

    fn supports_offset_update(&self) -> bool {
        false
    }

    fn check_view_offset(&self, _usage: BufferUsage, _offset: u64, _caps: &Capabilities) -> bool {
        // uniforms are uploaded from the mirror, any byte offset works
        true
    }
}

/// Strategy for APIs with native uniform buffers and ranged bindings
pub struct ModernBackend;

impl BufferBackend for ModernBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Modern
    }

    fn allocates_natively(&self, _usage: BufferUsage) -> bool {
        true
    }

    fn supports_offset_update(&self) -> bool {
        true
    }

    fn check_view_offset(&self, usage: BufferUsage, offset: u64, caps: &Capabilities) -> bool {
        let alignment = caps.uniform_buffer_offset_alignment.max(1);
        if usage.contains(BufferUsage::UNIFORM) && offset % alignment != 0 {
            crate::engine_warn!("lumen::Buffer",
                "Uniform buffer view offset {} is not aligned to {}", offset, alignment);
            return false;
        }
        true
    }
}

/// Strategy object for a backend generation
pub fn backend_for(api: GraphicsApi) -> Box<dyn BufferBackend> {
    match api {
        GraphicsApi::Legacy => Box::new(LegacyBackend),
        GraphicsApi::Modern => Box::new(ModernBackend),
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;

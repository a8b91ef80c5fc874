/// DescriptorSetLayout - ordered schema of binding slots
///
/// The array index of a binding is its slot number, so slots are always
/// consecutive and start at 0.

use std::sync::{Arc, RwLock, RwLockReadGuard, PoisonError};
use bitflags::bitflags;
use crate::graphics_device::Sampler;

bitflags! {
    /// Descriptor type of a binding slot
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DescriptorType: u32 {
        const UNIFORM_BUFFER = 1 << 0;
        const DYNAMIC_UNIFORM_BUFFER = 1 << 1;
        const STORAGE_BUFFER = 1 << 2;
        const DYNAMIC_STORAGE_BUFFER = 1 << 3;
        const SAMPLER = 1 << 4;
    }
}

/// Types served by `bind_buffer`
pub const DESCRIPTOR_BUFFER_TYPE: DescriptorType = DescriptorType::UNIFORM_BUFFER
    .union(DescriptorType::DYNAMIC_UNIFORM_BUFFER)
    .union(DescriptorType::STORAGE_BUFFER)
    .union(DescriptorType::DYNAMIC_STORAGE_BUFFER);

/// Types served by `bind_texture` + `bind_sampler`
pub const DESCRIPTOR_SAMPLER_TYPE: DescriptorType = DescriptorType::SAMPLER;

/// Types taking a per-draw dynamic offset
pub const DESCRIPTOR_DYNAMIC_TYPE: DescriptorType = DescriptorType::DYNAMIC_UNIFORM_BUFFER
    .union(DescriptorType::DYNAMIC_STORAGE_BUFFER);

impl DescriptorType {
    pub fn is_buffer(&self) -> bool {
        self.intersects(DESCRIPTOR_BUFFER_TYPE)
    }

    pub fn is_sampler(&self) -> bool {
        self.intersects(DESCRIPTOR_SAMPLER_TYPE)
    }

    pub fn is_dynamic(&self) -> bool {
        self.intersects(DESCRIPTOR_DYNAMIC_TYPE)
    }
}

bitflags! {
    /// Shader stages a binding is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const ALL = Self::VERTEX.bits() | Self::FRAGMENT.bits() | Self::COMPUTE.bits();
    }
}

/// One binding slot
#[derive(Clone)]
pub struct DescriptorSetLayoutBinding {
    pub descriptor_type: DescriptorType,
    pub count: u32,
    pub stage_flags: ShaderStageFlags,
    pub immutable_samplers: Vec<Arc<dyn Sampler>>,
}

impl DescriptorSetLayoutBinding {
    pub fn new(descriptor_type: DescriptorType, count: u32, stage_flags: ShaderStageFlags) -> Self {
        Self {
            descriptor_type,
            count,
            stage_flags,
            immutable_samplers: Vec::new(),
        }
    }
}

impl std::fmt::Debug for DescriptorSetLayoutBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorSetLayoutBinding")
            .field("descriptor_type", &self.descriptor_type)
            .field("count", &self.count)
            .field("stage_flags", &self.stage_flags)
            .field("immutable_samplers", &self.immutable_samplers.len())
            .finish()
    }
}

/// Descriptor for creating a layout
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutInfo {
    pub bindings: Vec<DescriptorSetLayoutBinding>,
}

#[derive(Default)]
struct LayoutState {
    bindings: Vec<DescriptorSetLayoutBinding>,
    dynamic_bindings: Vec<u32>,
}

/// Descriptor set layout
pub struct DescriptorSetLayout {
    state: RwLock<LayoutState>,
}

impl DescriptorSetLayout {
    /// Append the bindings in order and derive the dynamic binding list
    ///
    /// Each dynamic binding's slot index appears `count` times, once per
    /// dynamic offset a backend has to supply at bind time.
    pub fn new(info: DescriptorSetLayoutInfo) -> Arc<Self> {
        let mut state = LayoutState::default();
        for (slot, binding) in info.bindings.into_iter().enumerate() {
            if binding.descriptor_type.is_dynamic() {
                for _ in 0..binding.count {
                    state.dynamic_bindings.push(slot as u32);
                }
            }
            state.bindings.push(binding);
        }
        crate::engine_trace!("lumen::DescriptorSetLayout",
            "Created layout with {} bindings ({} dynamic offsets)",
            state.bindings.len(), state.dynamic_bindings.len());
        Arc::new(Self { state: RwLock::new(state) })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LayoutState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the binding list
    pub fn bindings(&self) -> Vec<DescriptorSetLayoutBinding> {
        self.read_state().bindings.clone()
    }

    /// Slot index per dynamic offset, in binding order
    pub fn dynamic_bindings(&self) -> Vec<u32> {
        self.read_state().dynamic_bindings.clone()
    }

    pub fn len(&self) -> usize {
        self.read_state().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the schema (idempotent)
    pub fn destroy(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.bindings.clear();
        state.dynamic_bindings.clear();
    }
}

#[cfg(test)]
#[path = "descriptor_set_layout_tests.rs"]
mod tests;

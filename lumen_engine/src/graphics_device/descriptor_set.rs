/// DescriptorSet - lazily synchronized table of bound resources
///
/// Binds only record references and mark the set dirty. `update()` pushes
/// the bound handles into the backend descriptor records in one pass, right
/// before the set is consumed by a draw.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::error::Result;
use crate::graphics_device::{
    Buffer, Texture, Sampler, GpuBufferBinding, GpuHandle, DescriptorType,
    DescriptorSetLayout, DescriptorSetLayoutBinding, SharedDevice, lock_device,
};
use crate::{engine_bail, engine_warn};

/// Backend record of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuDescriptor {
    pub descriptor_type: DescriptorType,
    pub buffer: Option<GpuBufferBinding>,
    pub texture: Option<GpuHandle>,
    pub sampler: Option<GpuHandle>,
}

/// Descriptor for creating a descriptor set
#[derive(Clone)]
pub struct DescriptorSetInfo {
    pub layout: Arc<DescriptorSetLayout>,
}

struct SetState {
    bindings: Vec<DescriptorSetLayoutBinding>,
    buffers: Vec<Option<Arc<Buffer>>>,
    textures: Vec<Option<Arc<dyn Texture>>>,
    samplers: Vec<Option<Arc<dyn Sampler>>>,
    descriptors: Vec<GpuDescriptor>,
    dirty: bool,
}

/// Descriptor set
pub struct DescriptorSet {
    id: u64,
    layout: Arc<DescriptorSetLayout>,
    validation: bool,
    state: Mutex<SetState>,
}

impl DescriptorSet {
    /// Create an empty set conforming to `info.layout`
    pub fn new(device: &SharedDevice, info: DescriptorSetInfo) -> Self {
        let (id, validation) = {
            let mut dev = lock_device(device);
            (dev.gen_object_id(), dev.config().validation)
        };

        let bindings = info.layout.bindings();
        let slot_count = bindings.len();
        let descriptors = bindings
            .iter()
            .map(|binding| GpuDescriptor {
                descriptor_type: binding.descriptor_type,
                buffer: None,
                texture: None,
                sampler: None,
            })
            .collect();

        Self {
            id,
            layout: info.layout,
            validation,
            state: Mutex::new(SetState {
                bindings,
                buffers: vec![None; slot_count],
                textures: vec![None; slot_count],
                samplers: vec![None; slot_count],
                descriptors,
                dirty: false,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.layout
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.lock_state().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.lock_state().dirty
    }

    /// Declared type of a slot
    pub fn descriptor_type(&self, binding: u32) -> Option<DescriptorType> {
        self.lock_state()
            .bindings
            .get(binding as usize)
            .map(|b| b.descriptor_type)
    }

    // ===== BINDS =====

    pub fn bind_buffer(&self, binding: u32, buffer: Arc<Buffer>) -> Result<()> {
        let mut state = self.lock_state();
        let slot = self.check_slot(&state, binding, "buffer", DescriptorType::is_buffer)?;
        state.buffers[slot] = Some(buffer);
        state.dirty = true;
        Ok(())
    }

    pub fn bind_texture(&self, binding: u32, texture: Arc<dyn Texture>) -> Result<()> {
        let mut state = self.lock_state();
        let slot = self.check_slot(&state, binding, "texture", DescriptorType::is_sampler)?;
        state.textures[slot] = Some(texture);
        state.dirty = true;
        Ok(())
    }

    pub fn bind_sampler(&self, binding: u32, sampler: Arc<dyn Sampler>) -> Result<()> {
        let mut state = self.lock_state();
        let slot = self.check_slot(&state, binding, "sampler", DescriptorType::is_sampler)?;
        state.samplers[slot] = Some(sampler);
        state.dirty = true;
        Ok(())
    }

    fn check_slot(
        &self,
        state: &SetState,
        binding: u32,
        kind: &str,
        accepts: fn(&DescriptorType) -> bool,
    ) -> Result<usize> {
        let slot = binding as usize;
        let Some(layout_binding) = state.bindings.get(slot) else {
            engine_bail!("lumen::DescriptorSet",
                "Descriptor set {}: {} binding {} out of range ({} slots)",
                self.id, kind, binding, state.bindings.len());
        };
        if self.validation && !accepts(&layout_binding.descriptor_type) {
            engine_warn!("lumen::DescriptorSet",
                "Descriptor set {}: binding a {} into slot {} declared as {:?}",
                self.id, kind, binding, layout_binding.descriptor_type);
        }
        Ok(slot)
    }

    // ===== SYNC =====

    /// Propagate bound handles into the backend records
    ///
    /// No-op unless a bind happened since the last update. Buffer slots take
    /// the bound buffer's placement, sampler slots take both the texture and
    /// sampler handles. Unbound slots keep their previous record.
    pub fn update(&self) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if !state.dirty {
            return;
        }

        for (slot, binding) in state.bindings.iter().enumerate() {
            let descriptor = &mut state.descriptors[slot];
            if binding.descriptor_type.is_buffer() {
                if let Some(buffer) = &state.buffers[slot] {
                    descriptor.buffer = Some(buffer.gpu_binding());
                }
            } else if binding.descriptor_type.is_sampler() {
                if let Some(texture) = &state.textures[slot] {
                    descriptor.texture = Some(texture.gpu_handle());
                }
                if let Some(sampler) = &state.samplers[slot] {
                    descriptor.sampler = Some(sampler.gpu_handle());
                }
            }
        }

        state.dirty = false;
    }

    // ===== ACCESSORS =====

    pub fn get_buffer(&self, binding: u32) -> Option<Arc<Buffer>> {
        self.lock_state().buffers.get(binding as usize).cloned().flatten()
    }

    pub fn get_texture(&self, binding: u32) -> Option<Arc<dyn Texture>> {
        self.lock_state().textures.get(binding as usize).cloned().flatten()
    }

    pub fn get_sampler(&self, binding: u32) -> Option<Arc<dyn Sampler>> {
        self.lock_state().samplers.get(binding as usize).cloned().flatten()
    }

    /// Snapshot of a slot's backend record
    pub fn descriptor(&self, binding: u32) -> Option<GpuDescriptor> {
        self.lock_state().descriptors.get(binding as usize).copied()
    }

    /// Snapshot of all backend records
    pub fn descriptors(&self) -> Vec<GpuDescriptor> {
        self.lock_state().descriptors.clone()
    }

    /// Drop every reference and record (idempotent)
    pub fn destroy(&self) {
        let mut state = self.lock_state();
        state.bindings.clear();
        state.buffers.clear();
        state.textures.clear();
        state.samplers.clear();
        state.descriptors.clear();
        state.dirty = false;
    }
}

#[cfg(test)]
#[path = "descriptor_set_tests.rs"]
mod tests;

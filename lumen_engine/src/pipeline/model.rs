/// Renderable geometry handed to the render queues

use std::sync::Arc;
use crate::graphics_device::{DescriptorSet, InputAssembler};
use crate::program::MacroPatch;

/// One drawable part of a model
pub struct SubModel {
    pub input_assembler: Arc<InputAssembler>,
    /// Base per-draw descriptor set (LOCAL slot)
    pub descriptor_set: Arc<DescriptorSet>,
}

impl SubModel {
    pub fn new(input_assembler: InputAssembler, descriptor_set: DescriptorSet) -> Arc<Self> {
        Arc::new(Self {
            input_assembler: Arc::new(input_assembler),
            descriptor_set: Arc::new(descriptor_set),
        })
    }
}

/// Model: sub-models plus optional macro patches per sub-model
#[derive(Default)]
pub struct Model {
    pub sub_models: Vec<Arc<SubModel>>,
    macro_patches: Vec<Vec<MacroPatch>>,
}

impl Model {
    pub fn new(sub_models: Vec<Arc<SubModel>>) -> Self {
        let macro_patches = vec![Vec::new(); sub_models.len()];
        Self { sub_models, macro_patches }
    }

    /// Replace the patches of one sub-model (ignored for an out of range index)
    pub fn set_macro_patches(&mut self, sub_model_index: usize, patches: Vec<MacroPatch>) {
        if let Some(slot) = self.macro_patches.get_mut(sub_model_index) {
            *slot = patches;
        }
    }

    /// Model-specific patches of a sub-model, None when it has none
    pub fn macro_patches(&self, sub_model_index: usize) -> Option<&[MacroPatch]> {
        self.macro_patches
            .get(sub_model_index)
            .filter(|patches| !patches.is_empty())
            .map(Vec::as_slice)
    }
}

/// Visible model with its sort depth
#[derive(Clone)]
pub struct RenderObject {
    pub model: Arc<Model>,
    pub depth: f32,
}

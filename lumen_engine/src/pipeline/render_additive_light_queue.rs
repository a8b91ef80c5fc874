/// RenderAdditiveLightQueue - per-light draw lists of the additive forward pass
///
/// Per frame: `clear` with the culled lights, `add` every visible sub-model
/// pass, then `record_command_buffer`. Draws are emitted light by light, in
/// the order the sub-models were attached to each light.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, CommandBuffer, DescriptorSet, DescriptorSetInfo, RenderPass, Shader, SharedDevice,
    lock_device,
};
use crate::pipeline::{
    DescriptorSetIndices, LightType, Light, Pass, RenderContext, RenderObject, SubModel,
    MACRO_FORWARD_ADD, MACRO_SPOTLIGHT, PHASE_FORWARD_ADD,
};
use crate::program::{MacroPatch, UBO_FORWARD_LIGHT_BINDING};
use crate::{engine_bail, engine_err, engine_warn};

/// What a draw of one sub-model under one light needs besides its geometry
struct LightAttachment {
    pass: Arc<Pass>,
    shader: Arc<dyn Shader>,
    descriptor_set: DescriptorSet,
}

pub struct RenderAdditiveLightQueue {
    phase_id: u32,
    point_patches: Vec<MacroPatch>,
    spot_patches: Vec<MacroPatch>,
    // parallel per-light lists
    sub_models: Vec<Vec<Arc<SubModel>>>,
    attachments: Vec<Vec<LightAttachment>>,
    // upstream culling results of the current frame
    valid_lights: Vec<Light>,
    light_buffers: Vec<Arc<Buffer>>,
    light_indices: Vec<usize>,
}

impl RenderAdditiveLightQueue {
    pub fn new(ctx: &mut RenderContext) -> Result<Self> {
        Ok(Self {
            phase_id: ctx.phases.get_phase_id(PHASE_FORWARD_ADD)?,
            point_patches: vec![MacroPatch::new(MACRO_FORWARD_ADD, true)],
            spot_patches: vec![
                MacroPatch::new(MACRO_FORWARD_ADD, true),
                MacroPatch::new(MACRO_SPOTLIGHT, true),
            ],
            sub_models: Vec::new(),
            attachments: Vec::new(),
            valid_lights: Vec::new(),
            light_buffers: Vec::new(),
            light_indices: Vec::new(),
        })
    }

    /// Start a frame with the culled lights
    ///
    /// `light_buffers[i]` is the forward light block of `valid_lights[i]`;
    /// `light_indices` is the order in which `add` ranges visit the lights.
    /// The per-light lists are resized to the light count and emptied in place.
    ///
    /// # Errors
    ///
    /// `InvalidResource` when `light_buffers` does not match `valid_lights`.
    pub fn clear(&mut self, valid_lights: &[Light], light_buffers: &[Arc<Buffer>], light_indices: &[usize]) -> Result<()> {
        if valid_lights.len() != light_buffers.len() {
            engine_bail!("lumen::RenderAdditiveLightQueue",
                "{} lights but {} light buffers", valid_lights.len(), light_buffers.len());
        }

        self.valid_lights.clear();
        self.valid_lights.extend_from_slice(valid_lights);
        self.light_buffers.clear();
        self.light_buffers.extend_from_slice(light_buffers);
        self.light_indices.clear();
        self.light_indices.extend_from_slice(light_indices);

        let count = valid_lights.len();
        self.sub_models.resize_with(count, Vec::new);
        self.attachments.resize_with(count, Vec::new);
        for list in &mut self.sub_models {
            list.clear();
        }
        for list in &mut self.attachments {
            list.clear();
        }
        Ok(())
    }

    /// Attach a sub-model pass to the lights `light_indices[begin..end]`
    ///
    /// Passes outside the forward-add phase are ignored, as are directional
    /// lights (shaded by the base pass).
    pub fn add(
        &mut self,
        ctx: &mut RenderContext,
        render_object: &RenderObject,
        sub_model_index: usize,
        pass: &Arc<Pass>,
        begin: usize,
        end: usize,
    ) -> Result<()> {
        if pass.phase() != self.phase_id {
            return Ok(());
        }
        if begin > end || end > self.light_indices.len() {
            engine_bail!("lumen::RenderAdditiveLightQueue",
                "Light range [{}, {}) outside {} light indices", begin, end, self.light_indices.len());
        }

        for i in begin..end {
            let light_index = self.light_indices[i];
            let Some(light) = self.valid_lights.get(light_index) else {
                engine_warn!("lumen::RenderAdditiveLightQueue",
                    "Light index {} out of range ({} lights), skipped", light_index, self.valid_lights.len());
                continue;
            };
            let patches = match light.light_type {
                LightType::Point => self.point_patches.clone(),
                LightType::Spot => self.spot_patches.clone(),
                LightType::Directional => continue,
            };
            let light_buffer = self.light_buffers[light_index].clone();
            self.attach(ctx, render_object, sub_model_index, &light_buffer, light_index, pass, &patches)?;
        }
        Ok(())
    }

    /// Queue one sub-model pass under one light
    ///
    /// Resolves the shader variant for `patches` plus the model's own patches
    /// and clones the sub-model's descriptor set with the light's block bound
    /// at the forward light slot. The clone is updated right away.
    #[allow(clippy::too_many_arguments)]
    pub fn attach(
        &mut self,
        ctx: &mut RenderContext,
        render_object: &RenderObject,
        sub_model_index: usize,
        light_buffer: &Arc<Buffer>,
        light_index: usize,
        pass: &Arc<Pass>,
        patches: &[MacroPatch],
    ) -> Result<()> {
        let model = &render_object.model;
        let sub_model = model.sub_models.get(sub_model_index).cloned().ok_or_else(|| {
            engine_err!("lumen::RenderAdditiveLightQueue",
                "Sub-model {} out of range ({} sub-models)", sub_model_index, model.sub_models.len())
        })?;
        if light_index >= self.attachments.len() {
            engine_bail!("lumen::RenderAdditiveLightQueue",
                "Light {} out of range ({} lights)", light_index, self.attachments.len());
        }

        let mut full_patches = patches.to_vec();
        if let Some(model_patches) = model.macro_patches(sub_model_index) {
            full_patches.extend_from_slice(model_patches);
        }
        let shader = pass.shader_variant(ctx, &full_patches)?;

        let descriptor_set = clone_descriptor_set(&ctx.device, &sub_model.descriptor_set)?;
        descriptor_set.bind_buffer(UBO_FORWARD_LIGHT_BINDING, light_buffer.clone())?;
        descriptor_set.update();

        self.sub_models[light_index].push(sub_model);
        self.attachments[light_index].push(LightAttachment {
            pass: pass.clone(),
            shader,
            descriptor_set,
        });
        Ok(())
    }

    /// Number of queued draws
    pub fn len(&self) -> usize {
        self.sub_models.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Emit the queued draws, light-major then attach order
    pub fn record_command_buffer(
        &self,
        ctx: &mut RenderContext,
        render_pass: &Arc<dyn RenderPass>,
        cmd: &mut dyn CommandBuffer,
    ) -> Result<()> {
        for (sub_models, attachments) in self.sub_models.iter().zip(&self.attachments) {
            for (sub_model, attachment) in sub_models.iter().zip(attachments) {
                let input_assembler = &sub_model.input_assembler;
                let pipeline_state = {
                    let mut device = lock_device(&ctx.device);
                    ctx.pipeline_states.get_or_create_pipeline_state(
                        &mut device, &attachment.pass, &attachment.shader, render_pass, input_assembler,
                    )?
                };

                let material = attachment.pass.descriptor_set();
                material.update();

                cmd.bind_pipeline_state(&pipeline_state)?;
                cmd.bind_descriptor_set(DescriptorSetIndices::MATERIAL, material)?;
                cmd.bind_descriptor_set(DescriptorSetIndices::LOCAL, &attachment.descriptor_set)?;
                cmd.bind_input_assembler(input_assembler)?;
                cmd.draw(input_assembler)?;
            }
        }
        Ok(())
    }
}

/// New set over the same layout holding the same resources as `source`
///
/// Buffer slots are copied with `bind_buffer`, sampler slots with
/// `bind_sampler` and `bind_texture`. Empty slots stay empty.
pub fn clone_descriptor_set(device: &SharedDevice, source: &DescriptorSet) -> Result<DescriptorSet> {
    let layout = source.layout().clone();
    let bindings = layout.bindings();
    let clone = DescriptorSet::new(device, DescriptorSetInfo { layout });

    for (slot, binding) in bindings.iter().enumerate() {
        let slot = slot as u32;
        if binding.descriptor_type.is_buffer() {
            if let Some(buffer) = source.get_buffer(slot) {
                clone.bind_buffer(slot, buffer)?;
            }
        } else if binding.descriptor_type.is_sampler() {
            if let Some(sampler) = source.get_sampler(slot) {
                clone.bind_sampler(slot, sampler)?;
            }
            if let Some(texture) = source.get_texture(slot) {
                clone.bind_texture(slot, texture)?;
            }
        }
    }
    Ok(clone)
}

#[cfg(test)]
#[path = "render_additive_light_queue_tests.rs"]
mod tests;

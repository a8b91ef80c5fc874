/// RenderBatchedQueue - batched buffers touched during the current frame
///
/// Batched buffers are owned by the queue and kept across frames; the active
/// list only names those merged into since the last `clear`, in first-merge
/// order.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use glam::Mat4;
use rustc_hash::{FxHashMap, FxHasher};
use crate::engine_warn;
use crate::error::Result;
use crate::graphics_device::{CommandBuffer, RenderPass, lock_device};
use crate::pipeline::{
    BatchedBuffer, BatchingConfig, DescriptorSetIndices, Pass, RenderContext, SubModel,
    MACRO_USE_BATCHING,
};
use crate::program::{MacroPatch, BATCHING_COUNT};

/// Batched buffer identity: pass and vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub pass_id: u64,
    pub attributes_hash: u64,
    /// Hash of the vertex stream strides
    pub strides_hash: u64,
}

impl BatchKey {
    pub fn new(pass: &Pass, sub_model: &SubModel) -> Self {
        let input_assembler = &sub_model.input_assembler;
        let mut hasher = FxHasher::default();
        for buffer in input_assembler.vertex_buffers() {
            buffer.stride().hash(&mut hasher);
        }
        Self {
            pass_id: pass.id(),
            attributes_hash: input_assembler.attributes_hash(),
            strides_hash: hasher.finish(),
        }
    }
}

#[derive(Default)]
pub struct RenderBatchedQueue {
    config: BatchingConfig,
    buffers: FxHashMap<BatchKey, BatchedBuffer>,
    queue: Vec<BatchKey>,
}

impl RenderBatchedQueue {
    /// Queue merging up to `config.max_instances_per_batch` instances per batch
    ///
    /// Values outside `1..=BATCHING_COUNT` are clamped with a warning.
    pub fn new(mut config: BatchingConfig) -> Self {
        let max_instances = config.max_instances_per_batch.clamp(1, BATCHING_COUNT);
        if max_instances != config.max_instances_per_batch {
            engine_warn!("lumen::RenderBatchedQueue",
                "max_instances_per_batch {} clamped to {}", config.max_instances_per_batch, max_instances);
            config.max_instances_per_batch = max_instances;
        }
        Self {
            config,
            buffers: FxHashMap::default(),
            queue: Vec::new(),
        }
    }

    /// Merge one sub-model instance into the batched buffer of its key
    ///
    /// The batched buffer, with its batching shader variant, is created on
    /// first use of a key. Sub-models that cannot be batched are skipped.
    pub fn merge(&mut self, ctx: &mut RenderContext, pass: &Arc<Pass>, sub_model: &SubModel, world: &Mat4) -> Result<()> {
        let input_assembler = &sub_model.input_assembler;
        let key = BatchKey::new(pass, sub_model);

        if !self.buffers.contains_key(&key) {
            let shader = pass.shader_variant(ctx, &[MacroPatch::new(MACRO_USE_BATCHING, true)])?;
            let buffer = BatchedBuffer::new(
                &ctx.device, pass.clone(), shader, input_assembler, self.config.max_instances_per_batch,
            );
            self.buffers.insert(key, buffer);
        }

        let merged = match self.buffers.get_mut(&key) {
            Some(buffer) => buffer.merge(sub_model, world)?,
            None => false,
        };
        if merged && !self.queue.contains(&key) {
            self.queue.push(key);
        }
        Ok(())
    }

    pub fn config(&self) -> &BatchingConfig {
        &self.config
    }

    /// Active batched buffers, in first-merge order
    pub fn active(&self) -> impl Iterator<Item = &BatchedBuffer> {
        self.queue.iter().filter_map(|key| self.buffers.get(key))
    }

    /// Batched buffers held for reuse (active or not)
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Empty every active batched buffer and the active list
    pub fn clear(&mut self) {
        for key in &self.queue {
            if let Some(buffer) = self.buffers.get_mut(key) {
                buffer.clear();
            }
        }
        self.queue.clear();
    }

    /// One pipeline bind per batched buffer, one upload and draw per non-empty batch
    pub fn record_command_buffer(
        &self,
        ctx: &mut RenderContext,
        render_pass: &Arc<dyn RenderPass>,
        cmd: &mut dyn CommandBuffer,
    ) -> Result<()> {
        for buffer in self.active() {
            let Some(first) = buffer.batches().iter().find(|batch| batch.merge_count() > 0) else {
                continue;
            };
            let pipeline_state = {
                let mut device = lock_device(&ctx.device);
                ctx.pipeline_states.get_or_create_pipeline_state(
                    &mut device, buffer.pass(), buffer.shader(), render_pass, first.input_assembler(),
                )?
            };

            let material = buffer.pass().descriptor_set();
            material.update();

            cmd.bind_pipeline_state(&pipeline_state)?;
            cmd.bind_descriptor_set(DescriptorSetIndices::MATERIAL, material)?;
            for batch in buffer.batches() {
                if batch.merge_count() == 0 {
                    continue;
                }
                batch.record(cmd)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "render_batched_queue_tests.rs"]
mod tests;

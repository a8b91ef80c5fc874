/// PipelineStateManager - cache of compiled pipeline states
///
/// A pipeline state depends on the pass (fixed-function state), the shader
/// variant, the target render pass and the vertex layout. The cache lives for
/// the lifetime of the owning `RenderContext`.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::graphics_device::{Device, InputAssembler, PipelineState, PipelineStateDesc, RenderPass, Shader};
use crate::pipeline::Pass;
use crate::engine_trace;

/// Identity of a cached pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineStateKey {
    pub pass_id: u64,
    pub shader_id: u32,
    pub render_pass_id: u64,
    pub attributes_hash: u64,
}

#[derive(Default)]
pub struct PipelineStateManager {
    cache: FxHashMap<PipelineStateKey, Arc<dyn PipelineState>>,
}

impl PipelineStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached pipeline state for the combination, created on first use
    pub fn get_or_create_pipeline_state(
        &mut self,
        device: &mut Device,
        pass: &Pass,
        shader: &Arc<dyn Shader>,
        render_pass: &Arc<dyn RenderPass>,
        input_assembler: &InputAssembler,
    ) -> Result<Arc<dyn PipelineState>> {
        let key = PipelineStateKey {
            pass_id: pass.id(),
            shader_id: shader.id(),
            render_pass_id: render_pass.id(),
            attributes_hash: input_assembler.attributes_hash(),
        };
        if let Some(pipeline_state) = self.cache.get(&key) {
            return Ok(pipeline_state.clone());
        }

        let pipeline_state = device.create_pipeline_state(&PipelineStateDesc {
            shader: shader.clone(),
            render_pass: render_pass.clone(),
            primitive: pass.primitive(),
            rasterizer: *pass.rasterizer(),
            depth_stencil: *pass.depth_stencil(),
            blend: pass.blend().clone(),
            attributes: input_assembler.attributes().to_vec(),
        })?;

        engine_trace!("lumen::PipelineStateManager",
            "Created pipeline state for pass {} / shader '{}' / render pass {}",
            key.pass_id, shader.name(), key.render_pass_id);

        self.cache.insert(key, pipeline_state.clone());
        Ok(pipeline_state)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached pipeline state
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
#[path = "pipeline_state_manager_tests.rs"]
mod tests;

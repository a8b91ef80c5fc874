/// CommandBuffer trait - ordered recording of binds, uploads and draws

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    RenderPass, PipelineState, DescriptorSet, InputAssembler, Buffer,
};

/// Command buffer
///
/// Commands are recorded in call order and executed on `Device::submit`.
pub trait CommandBuffer: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass
    fn begin_render_pass(&mut self, render_pass: &Arc<dyn RenderPass>) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Bind a pipeline state object
    fn bind_pipeline_state(&mut self, pipeline_state: &Arc<dyn PipelineState>) -> Result<()>;

    /// Bind a descriptor set at a set index (see `DescriptorSetIndices`)
    ///
    /// The set must have been `update()`d after its last bind.
    fn bind_descriptor_set(&mut self, set_index: u32, descriptor_set: &DescriptorSet) -> Result<()>;

    /// Bind vertex/index buffers of an input assembler
    fn bind_input_assembler(&mut self, input_assembler: &InputAssembler) -> Result<()>;

    /// Record an in-stream buffer upload
    fn update_buffer(&mut self, buffer: &Buffer, data: &[u8]) -> Result<()>;

    /// Draw with the counts of an input assembler
    fn draw(&mut self, input_assembler: &InputAssembler) -> Result<()>;
}

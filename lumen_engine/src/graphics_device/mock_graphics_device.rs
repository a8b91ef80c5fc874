/// Mock graphics device for unit tests (no GPU required)
///
/// Every primitive call is recorded as a string into a shared call list so
/// tests can assert on what the engine asked the backend to do after the
/// device has been moved into a `Device`.

use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, GraphicsApi, Capabilities, GpuBufferDesc, GpuHandle, Device, DeviceConfig,
    SharedDevice, Shader, ShaderDesc, PipelineState, PipelineStateDesc, RenderPass,
    CommandBuffer, DescriptorSet, InputAssembler, Buffer, Texture, Sampler,
};

/// Shared call list
pub type MockCalls = Arc<Mutex<Vec<String>>>;

// ============================================================================
// Mock Shader
// ============================================================================

#[derive(Debug)]
pub struct MockShader {
    pub id: u32,
    pub name: String,
    pub desc: ShaderDesc,
}

impl Shader for MockShader {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Mock Pipeline State / Render Pass
// ============================================================================

#[derive(Debug)]
pub struct MockPipelineState {
    pub shader_id: u32,
}

impl PipelineState for MockPipelineState {
    fn shader_id(&self) -> u32 {
        self.shader_id
    }
}

#[derive(Debug)]
pub struct MockRenderPass {
    pub id: u64,
}

impl RenderPass for MockRenderPass {
    fn id(&self) -> u64 {
        self.id
    }
}

// ============================================================================
// Mock Texture / Sampler
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub handle: GpuHandle,
}

impl Texture for MockTexture {
    fn gpu_handle(&self) -> GpuHandle {
        self.handle
    }
}

#[derive(Debug)]
pub struct MockSampler {
    pub handle: GpuHandle,
}

impl Sampler for MockSampler {
    fn gpu_handle(&self) -> GpuHandle {
        self.handle
    }
}

// ============================================================================
// Mock Command Buffer
// ============================================================================

#[derive(Debug, Default)]
pub struct MockCommandBuffer {
    pub commands: Vec<String>,
}

impl MockCommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded commands starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl CommandBuffer for MockCommandBuffer {
    fn begin(&mut self) -> Result<()> {
        self.commands.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.commands.push("end".to_string());
        Ok(())
    }

    fn begin_render_pass(&mut self, render_pass: &Arc<dyn RenderPass>) -> Result<()> {
        self.commands.push(format!("begin_render_pass:{}", render_pass.id()));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn bind_pipeline_state(&mut self, pipeline_state: &Arc<dyn PipelineState>) -> Result<()> {
        self.commands.push(format!("bind_pipeline_state:{}", pipeline_state.shader_id()));
        Ok(())
    }

    fn bind_descriptor_set(&mut self, set_index: u32, descriptor_set: &DescriptorSet) -> Result<()> {
        self.commands.push(format!("bind_descriptor_set:{}:{}", set_index, descriptor_set.id()));
        Ok(())
    }

    fn bind_input_assembler(&mut self, input_assembler: &InputAssembler) -> Result<()> {
        self.commands.push(format!("bind_input_assembler:{}", input_assembler.vertex_buffers().len()));
        Ok(())
    }

    fn update_buffer(&mut self, buffer: &Buffer, data: &[u8]) -> Result<()> {
        self.commands.push(format!("update_buffer:{}:{}", buffer.id(), data.len()));
        Ok(())
    }

    fn draw(&mut self, input_assembler: &InputAssembler) -> Result<()> {
        self.commands.push(format!("draw:{}", input_assembler.draw_info().vertex_count));
        Ok(())
    }
}

// ============================================================================
// Mock Graphics Device
// ============================================================================

pub struct MockGraphicsDevice {
    pub api: GraphicsApi,
    pub capabilities: Capabilities,
    pub calls: MockCalls,
    /// Descriptors of every compiled shader
    pub shader_descs: Arc<Mutex<Vec<ShaderDesc>>>,
    /// Fail the next buffer allocation with OutOfMemory
    pub fail_allocations: bool,
    next_handle: u64,
}

impl MockGraphicsDevice {
    pub fn new(api: GraphicsApi) -> Self {
        Self {
            api,
            capabilities: Capabilities::default(),
            calls: Arc::new(Mutex::new(Vec::new())),
            shader_descs: Arc::new(Mutex::new(Vec::new())),
            fail_allocations: false,
            next_handle: 0,
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn api(&self) -> GraphicsApi {
        self.api
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_gpu_buffer(&mut self, desc: &GpuBufferDesc) -> Result<GpuHandle> {
        if self.fail_allocations {
            return Err(Error::OutOfMemory);
        }
        self.next_handle += 1;
        self.record(format!("create_buffer:{}:{}", self.next_handle, desc.size));
        Ok(GpuHandle(self.next_handle))
    }

    fn destroy_gpu_buffer(&mut self, handle: GpuHandle) {
        self.record(format!("destroy_buffer:{}", handle.0));
    }

    fn resize_gpu_buffer(&mut self, handle: GpuHandle, size: u64) -> Result<()> {
        self.record(format!("resize_buffer:{}:{}", handle.0, size));
        Ok(())
    }

    fn update_gpu_buffer(&mut self, handle: GpuHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.record(format!("update_buffer:{}:{}:{}", handle.0, offset, data.len()));
        Ok(())
    }

    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Arc<dyn Shader>> {
        self.record(format!("create_shader:{}", desc.name));
        self.shader_descs.lock().unwrap().push(desc.clone());
        Ok(Arc::new(MockShader {
            id: desc.id,
            name: desc.name.clone(),
            desc: desc.clone(),
        }))
    }

    fn create_pipeline_state(&mut self, desc: &PipelineStateDesc) -> Result<Arc<dyn PipelineState>> {
        self.record(format!("create_pipeline_state:{}", desc.shader.id()));
        Ok(Arc::new(MockPipelineState { shader_id: desc.shader.id() }))
    }

    fn create_command_buffer(&mut self) -> Result<Box<dyn CommandBuffer>> {
        self.record("create_command_buffer".to_string());
        Ok(Box::new(MockCommandBuffer::new()))
    }

    fn submit(&mut self, command_buffers: Vec<Box<dyn CommandBuffer>>) -> Result<()> {
        self.record(format!("submit:{}", command_buffers.len()));
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Shared device over a fresh mock, plus the mock's call list
pub fn mock_device(api: GraphicsApi) -> (SharedDevice, MockCalls) {
    mock_device_with(MockGraphicsDevice::new(api))
}

/// Shared device over a configured mock, plus the mock's call list
pub fn mock_device_with(mock: MockGraphicsDevice) -> (SharedDevice, MockCalls) {
    let calls = mock.calls.clone();
    let config = DeviceConfig { name: "mock".to_string(), validation: true };
    (Device::new_shared(Box::new(mock), config), calls)
}

/// Recorded calls starting with `prefix`
pub fn calls_with(calls: &MockCalls, prefix: &str) -> Vec<String> {
    calls.lock().unwrap().iter().filter(|c| c.starts_with(prefix)).cloned().collect()
}

pub fn mock_texture(handle: u64) -> Arc<dyn Texture> {
    Arc::new(MockTexture { handle: GpuHandle(handle) })
}

pub fn mock_sampler(handle: u64) -> Arc<dyn Sampler> {
    Arc::new(MockSampler { handle: GpuHandle(handle) })
}

pub fn mock_render_pass(id: u64) -> Arc<dyn RenderPass> {
    Arc::new(MockRenderPass { id })
}

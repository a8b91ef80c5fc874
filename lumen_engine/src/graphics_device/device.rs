/// Device context
///
/// `Device` bundles the backend primitive surface with the state the engine
/// keeps per device: the buffer strategy chosen from the backend generation,
/// the byte-usage counter and the object/shader id generators.
///
/// Access contract: a device is owned by one render thread at a time. The
/// `SharedDevice` mutex makes that contract checkable, it is never contended
/// on the frame path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, GraphicsApi, Capabilities, DeviceConfig, GpuBufferDesc, GpuHandle,
    BufferBackend, backend_for, ShaderDesc, Shader, PipelineStateDesc, PipelineState,
    CommandBuffer,
};

/// Device handle shared by every resource created on it
pub type SharedDevice = Arc<Mutex<Device>>;

/// Lock a shared device, recovering the guard if a previous holder panicked
pub fn lock_device(device: &SharedDevice) -> MutexGuard<'_, Device> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Device-wide memory accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStatus {
    /// Bytes held by buffers (CPU mirrors and native allocations)
    pub buffer_size: u64,
}

impl MemoryStatus {
    pub(crate) fn add(&mut self, bytes: u64) {
        self.buffer_size += bytes;
    }

    pub(crate) fn sub(&mut self, bytes: u64) {
        self.buffer_size = self.buffer_size.saturating_sub(bytes);
    }
}

/// Device context
pub struct Device {
    gpu: Box<dyn GraphicsDevice>,
    backend: Box<dyn BufferBackend>,
    config: DeviceConfig,
    memory_status: MemoryStatus,
    next_object_id: u64,
    next_shader_id: u32,
}

impl Device {
    /// Wrap a backend device, selecting the buffer strategy from its API generation
    pub fn new(gpu: Box<dyn GraphicsDevice>, config: DeviceConfig) -> Self {
        let backend = backend_for(gpu.api());
        crate::engine_info!("lumen::Device",
            "Device '{}' created ({:?} backend)", config.name, backend.api());
        Self {
            gpu,
            backend,
            config,
            memory_status: MemoryStatus::default(),
            next_object_id: 0,
            next_shader_id: 0,
        }
    }

    /// Same as `new`, wrapped for sharing with resources
    pub fn new_shared(gpu: Box<dyn GraphicsDevice>, config: DeviceConfig) -> SharedDevice {
        Arc::new(Mutex::new(Self::new(gpu, config)))
    }

    pub fn api(&self) -> GraphicsApi {
        self.backend.api()
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.gpu.capabilities()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Snapshot of the byte-usage counter
    pub fn memory_status(&self) -> MemoryStatus {
        self.memory_status
    }

    pub(crate) fn memory_status_mut(&mut self) -> &mut MemoryStatus {
        &mut self.memory_status
    }

    pub(crate) fn backend(&self) -> &dyn BufferBackend {
        self.backend.as_ref()
    }

    /// Next engine object id (buffers, descriptor sets, passes)
    pub fn gen_object_id(&mut self) -> u64 {
        self.next_object_id += 1;
        self.next_object_id
    }

    /// Next shader id, used to key pipeline states
    pub fn gen_shader_id(&mut self) -> u32 {
        self.next_shader_id += 1;
        self.next_shader_id
    }

    // ===== BUFFER PRIMITIVES =====

    pub(crate) fn create_gpu_buffer(&mut self, desc: &GpuBufferDesc) -> Result<GpuHandle> {
        self.gpu.create_gpu_buffer(desc)
    }

    pub(crate) fn destroy_gpu_buffer(&mut self, handle: GpuHandle) {
        self.gpu.destroy_gpu_buffer(handle)
    }

    pub(crate) fn resize_gpu_buffer(&mut self, handle: GpuHandle, size: u64) -> Result<()> {
        self.gpu.resize_gpu_buffer(handle, size)
    }

    pub(crate) fn update_gpu_buffer(&mut self, handle: GpuHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.gpu.update_gpu_buffer(handle, offset, data)
    }

    // ===== FACTORIES =====

    /// Compile a shader program on the backend
    pub fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Arc<dyn Shader>> {
        crate::engine_debug!("lumen::Device", "Compiling shader '{}' (id {})", desc.name, desc.id);
        self.gpu.create_shader(desc)
    }

    pub fn create_pipeline_state(&mut self, desc: &PipelineStateDesc) -> Result<Arc<dyn PipelineState>> {
        self.gpu.create_pipeline_state(desc)
    }

    pub fn create_command_buffer(&mut self) -> Result<Box<dyn CommandBuffer>> {
        self.gpu.create_command_buffer()
    }

    /// Submit recorded command buffers to the backend queue
    pub fn submit(&mut self, command_buffers: Vec<Box<dyn CommandBuffer>>) -> Result<()> {
        self.gpu.submit(command_buffers)
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;

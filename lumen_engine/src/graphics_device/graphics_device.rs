/// GraphicsDevice trait - primitive surface implemented by each GPU backend
///
/// The engine core never talks to a GPU API directly. A backend implements
/// this trait with opaque create/destroy/resize/update primitives and the
/// engine builds Buffers, DescriptorSets and shader variants on top of it.

use std::sync::Arc;
use rustc_hash::FxHashSet;
use crate::error::Result;
use crate::graphics_device::{
    BufferUsage, MemoryUsage, ShaderDesc, Shader, PipelineStateDesc, PipelineState,
    CommandBuffer,
};

/// Backend generation
///
/// Selects the buffer/descriptor strategy at device construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsApi {
    /// Older APIs without uniform buffer objects (uniforms emulated on the CPU)
    Legacy,
    /// APIs with native uniform buffers and offset-addressable buffer ranges
    Modern,
}

/// Opaque backend object handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(pub u64);

/// Descriptor passed to `GraphicsDevice::create_gpu_buffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBufferDesc {
    /// Buffer usage flags
    pub usage: BufferUsage,
    /// Memory usage flags
    pub memory_usage: MemoryUsage,
    /// Size in bytes
    pub size: u64,
    /// Element stride in bytes
    pub stride: u64,
}

/// Device capability set
///
/// `features` holds the extension names shader defines can depend on
/// (e.g. "OES_standard_derivatives").
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Supported optional features / extensions
    pub features: FxHashSet<String>,
    /// Required alignment of uniform buffer binding offsets
    pub uniform_buffer_offset_alignment: u64,
}

impl Capabilities {
    /// Check whether a feature is supported
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains(name)
    }

    /// Builder helper adding a feature
    pub fn with_feature(mut self, name: &str) -> Self {
        self.features.insert(name.to_string());
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            features: FxHashSet::default(),
            uniform_buffer_offset_alignment: 256,
        }
    }
}

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Debug name of the device
    pub name: String,
    /// Enable extra diagnostics (descriptor type checks, view alignment)
    pub validation: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "lumen".to_string(),
            validation: cfg!(debug_assertions),
        }
    }
}

/// Primitive device surface
///
/// All operations are synchronous from the caller's point of view. A failed
/// allocation is reported as `Err` and propagated unchanged by the engine.
pub trait GraphicsDevice: Send + Sync {
    /// Backend generation of this device
    fn api(&self) -> GraphicsApi;

    /// Queryable capability set
    fn capabilities(&self) -> &Capabilities;

    /// Allocate a native buffer
    fn create_gpu_buffer(&mut self, desc: &GpuBufferDesc) -> Result<GpuHandle>;

    /// Release a native buffer
    fn destroy_gpu_buffer(&mut self, handle: GpuHandle);

    /// Reallocate a native buffer to `size` bytes (contents undefined)
    fn resize_gpu_buffer(&mut self, handle: GpuHandle, size: u64) -> Result<()>;

    /// Upload `data` at `offset` bytes into a native buffer
    fn update_gpu_buffer(&mut self, handle: GpuHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Compile a shader program
    fn create_shader(&mut self, desc: &ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a pipeline state object
    fn create_pipeline_state(&mut self, desc: &PipelineStateDesc) -> Result<Arc<dyn PipelineState>>;

    /// Create a command buffer
    fn create_command_buffer(&mut self) -> Result<Box<dyn CommandBuffer>>;

    /// Submit recorded command buffers to the queue
    fn submit(&mut self, command_buffers: Vec<Box<dyn CommandBuffer>>) -> Result<()>;
}

/// Buffer - GPU-visible memory region shared by both backend generations
///
/// A buffer is either *native* (owns a device allocation and/or a CPU
/// mirror) or a *view* (a window over a native parent, sharing its handle).
/// All methods take `&self`; buffers are shared as `Arc<Buffer>` between
/// descriptor sets, input assemblers and render queues.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use bitflags::bitflags;
use crate::error::Result;
use crate::graphics_device::{Device, SharedDevice, GpuBufferDesc, GpuHandle, lock_device};
use crate::{engine_bail, engine_debug, engine_trace, engine_warn};

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const INDEX = 1 << 2;
        const VERTEX = 1 << 3;
        const UNIFORM = 1 << 4;
        const STORAGE = 1 << 5;
        const INDIRECT = 1 << 6;
    }
}

bitflags! {
    /// Memory placement flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryUsage: u32 {
        const DEVICE = 1 << 0;
        const HOST = 1 << 1;
    }
}

bitflags! {
    /// Buffer creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferFlags: u32 {
        /// Keep a CPU-side copy of the contents
        const BACKUP = 1 << 0;
    }
}

/// Arguments of one draw call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawInfo {
    pub vertex_count: u32,
    pub first_vertex: u32,
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub instance_count: u32,
    pub first_instance: u32,
}

/// Draw list held by INDIRECT buffers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndirectBuffer {
    pub draw_infos: Vec<DrawInfo>,
}

/// Descriptor for a native buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Buffer usage
    pub usage: BufferUsage,
    /// Memory usage
    pub memory_usage: MemoryUsage,
    /// Size in bytes
    pub size: u64,
    /// Element stride in bytes (0 = same as size)
    pub stride: u64,
    /// Creation flags
    pub flags: BufferFlags,
}

impl BufferDesc {
    pub fn new(usage: BufferUsage, memory_usage: MemoryUsage, size: u64) -> Self {
        Self {
            usage,
            memory_usage,
            size,
            stride: 0,
            flags: BufferFlags::empty(),
        }
    }

    pub fn with_stride(mut self, stride: u64) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_flags(mut self, flags: BufferFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Descriptor for a buffer view
#[derive(Clone)]
pub struct BufferViewDesc {
    /// Native parent buffer
    pub buffer: Arc<Buffer>,
    /// Byte offset inside the parent
    pub offset: u64,
    /// Byte length of the window
    pub range: u64,
}

/// The two mutually exclusive buffer shapes
pub enum BufferInfo {
    Native(BufferDesc),
    View(BufferViewDesc),
}

impl From<BufferDesc> for BufferInfo {
    fn from(desc: BufferDesc) -> Self {
        BufferInfo::Native(desc)
    }
}

impl From<BufferViewDesc> for BufferInfo {
    fn from(desc: BufferViewDesc) -> Self {
        BufferInfo::View(desc)
    }
}

/// Where a buffer's contents live on the device
///
/// `handle` is None when the backend serves the buffer from its CPU mirror
/// (uniform buffers on legacy devices) or after destruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuBufferBinding {
    pub handle: Option<GpuHandle>,
    pub offset: u64,
    pub range: u64,
}

enum Storage {
    Native { handle: Option<GpuHandle> },
    View { parent: Arc<Buffer>, offset: u64 },
}

struct BufferState {
    usage: BufferUsage,
    memory_usage: MemoryUsage,
    flags: BufferFlags,
    size: u64,
    stride: u64,
    count: u64,
    storage: Storage,
    mirror: Option<Vec<u8>>,
    indirect: Option<IndirectBuffer>,
    // bytes this buffer added to the device counter
    mirror_bytes: u64,
    gpu_bytes: u64,
    destroyed: bool,
}

impl BufferState {
    fn handle(&self) -> Option<GpuHandle> {
        match self.storage {
            Storage::Native { handle } => handle,
            Storage::View { .. } => None,
        }
    }

    fn is_view(&self) -> bool {
        matches!(self.storage, Storage::View { .. })
    }
}

/// GPU buffer
pub struct Buffer {
    id: u64,
    device: SharedDevice,
    state: Mutex<BufferState>,
}

impl Buffer {
    /// Create a native buffer or a view
    ///
    /// Native: stride defaults to size (minimum 1) and `count = size / stride`.
    /// BACKUP-flagged and UNIFORM buffers get a CPU mirror. The device
    /// allocation follows the backend strategy.
    ///
    /// View: inherits usage/memory/flags from the parent, `size = stride = range`,
    /// `count = 1`, no allocation of its own.
    pub fn new(device: &SharedDevice, info: impl Into<BufferInfo>) -> Result<Arc<Buffer>> {
        match info.into() {
            BufferInfo::Native(desc) => Self::new_native(device, desc),
            BufferInfo::View(desc) => Self::new_view(device, desc),
        }
    }

    fn new_native(device: &SharedDevice, desc: BufferDesc) -> Result<Arc<Buffer>> {
        let stride = if desc.stride == 0 { desc.size } else { desc.stride }.max(1);
        let mut dev = lock_device(device);
        let id = dev.gen_object_id();

        let mut gpu_bytes = 0;
        let handle = if dev.backend().allocates_natively(desc.usage) {
            let handle = dev.create_gpu_buffer(&GpuBufferDesc {
                usage: desc.usage,
                memory_usage: desc.memory_usage,
                size: desc.size,
                stride,
            })?;
            dev.memory_status_mut().add(desc.size);
            gpu_bytes = desc.size;
            Some(handle)
        } else {
            engine_trace!("lumen::Buffer", "Buffer {} served from its CPU mirror", id);
            None
        };

        let mut mirror_bytes = 0;
        let mirror = if desc.flags.contains(BufferFlags::BACKUP) || desc.usage.contains(BufferUsage::UNIFORM) {
            dev.memory_status_mut().add(desc.size);
            mirror_bytes = desc.size;
            Some(vec![0u8; desc.size as usize])
        } else {
            None
        };

        let indirect = desc.usage.contains(BufferUsage::INDIRECT).then(IndirectBuffer::default);

        engine_debug!("lumen::Buffer", "Created buffer {} ({} bytes, {:?})", id, desc.size, desc.usage);

        Ok(Arc::new(Buffer {
            id,
            device: device.clone(),
            state: Mutex::new(BufferState {
                usage: desc.usage,
                memory_usage: desc.memory_usage,
                flags: desc.flags,
                size: desc.size,
                stride,
                count: desc.size / stride,
                storage: Storage::Native { handle },
                mirror,
                indirect,
                mirror_bytes,
                gpu_bytes,
                destroyed: false,
            }),
        }))
    }

    fn new_view(device: &SharedDevice, desc: BufferViewDesc) -> Result<Arc<Buffer>> {
        let (usage, memory_usage, flags, parent_size, parent_is_view) = {
            let parent = desc.buffer.lock_state();
            (parent.usage, parent.memory_usage, parent.flags, parent.size, parent.is_view())
        };
        if parent_is_view {
            engine_bail!("lumen::Buffer", "Cannot create a view of buffer view {}", desc.buffer.id);
        }
        if desc.offset + desc.range > parent_size {
            engine_bail!("lumen::Buffer",
                "View [{}, {}) exceeds buffer {} of {} bytes",
                desc.offset, desc.offset + desc.range, desc.buffer.id, parent_size);
        }

        let mut dev = lock_device(device);
        if dev.config().validation {
            dev.backend().check_view_offset(usage, desc.offset, dev.capabilities());
        }
        let id = dev.gen_object_id();
        drop(dev);

        engine_trace!("lumen::Buffer",
            "Created view {} over buffer {} at offset {}", id, desc.buffer.id, desc.offset);

        Ok(Arc::new(Buffer {
            id,
            device: device.clone(),
            state: Mutex::new(BufferState {
                usage,
                memory_usage,
                flags,
                size: desc.range,
                stride: desc.range,
                count: 1,
                storage: Storage::View { parent: desc.buffer, offset: desc.offset },
                mirror: None,
                indirect: None,
                mirror_bytes: 0,
                gpu_bytes: 0,
                destroyed: false,
            }),
        }))
    }

    fn lock_state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== ACCESSORS =====

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn usage(&self) -> BufferUsage {
        self.lock_state().usage
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        self.lock_state().memory_usage
    }

    pub fn flags(&self) -> BufferFlags {
        self.lock_state().flags
    }

    pub fn size(&self) -> u64 {
        self.lock_state().size
    }

    pub fn stride(&self) -> u64 {
        self.lock_state().stride
    }

    pub fn count(&self) -> u64 {
        self.lock_state().count
    }

    pub fn is_view(&self) -> bool {
        self.lock_state().is_view()
    }

    pub fn has_mirror(&self) -> bool {
        self.lock_state().mirror.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock_state().destroyed
    }

    /// Device placement used when the buffer is bound to a descriptor
    pub fn gpu_binding(&self) -> GpuBufferBinding {
        let (parent, offset, size) = {
            let state = self.lock_state();
            match &state.storage {
                Storage::Native { handle } => {
                    return GpuBufferBinding { handle: *handle, offset: 0, range: state.size };
                }
                Storage::View { parent, offset } => (parent.clone(), *offset, state.size),
            }
        };
        let base = parent.gpu_binding();
        GpuBufferBinding {
            handle: base.handle,
            offset: base.offset + offset,
            range: size,
        }
    }

    /// Read access to the CPU mirror
    pub fn with_mirror<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let state = self.lock_state();
        state.mirror.as_deref().map(f)
    }

    /// Write access to the CPU mirror; follow with `flush_mirror` to upload
    pub fn with_mirror_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        let mut state = self.lock_state();
        state.mirror.as_deref_mut().map(f)
    }

    /// Draw list of an INDIRECT buffer
    pub fn indirect_draws(&self) -> Vec<DrawInfo> {
        self.lock_state()
            .indirect
            .as_ref()
            .map(|indirect| indirect.draw_infos.clone())
            .unwrap_or_default()
    }

    // ===== OPERATIONS =====

    /// Change the size of a native buffer
    ///
    /// No-op when the size is unchanged. On a view this warns and does nothing.
    pub fn resize(&self, size: u64) -> Result<()> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if state.is_view() {
            engine_warn!("lumen::Buffer", "Cannot resize buffer view {}", self.id);
            return Ok(());
        }
        if state.destroyed {
            engine_warn!("lumen::Buffer", "Cannot resize destroyed buffer {}", self.id);
            return Ok(());
        }
        if state.size == size {
            return Ok(());
        }

        let old_size = state.size;
        let mut dev = lock_device(&self.device);

        if let Some(mirror) = state.mirror.as_mut() {
            // Vec::resize keeps the overlapping prefix
            mirror.resize(size as usize, 0);
            dev.memory_status_mut().sub(state.mirror_bytes);
            dev.memory_status_mut().add(size);
            state.mirror_bytes = size;
        }

        if size > 0 {
            if let Some(handle) = state.handle() {
                dev.resize_gpu_buffer(handle, size)?;
                dev.memory_status_mut().sub(state.gpu_bytes);
                dev.memory_status_mut().add(size);
                state.gpu_bytes = size;
            }
        }

        state.size = size;
        state.count = size / state.stride;

        engine_debug!("lumen::Buffer", "Resized buffer {} from {} to {} bytes", self.id, old_size, size);
        Ok(())
    }

    /// Upload `data` from the start of the buffer
    ///
    /// Effective length is `size` when given, 0 for INDIRECT buffers, the
    /// length of `data` otherwise. The CPU mirror, if any, receives a copy
    /// first. On a view this warns and does nothing.
    pub fn update(&self, data: &[u8], size: Option<u64>) -> Result<()> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if state.is_view() {
            engine_warn!("lumen::Buffer", "Cannot update buffer view {}", self.id);
            return Ok(());
        }

        let requested = match size {
            Some(size) => size,
            None if state.usage.contains(BufferUsage::INDIRECT) => 0,
            None => data.len() as u64,
        };
        let length = Self::clamp_length(self.id, requested, data.len() as u64, state.size);

        // the mirror receives exactly what the device receives
        if let Some(mirror) = state.mirror.as_mut() {
            let copied = (length as usize).min(mirror.len());
            mirror[..copied].copy_from_slice(&data[..copied]);
        }

        let mut dev = lock_device(&self.device);
        Self::upload(&mut dev, state, 0, &data[..length as usize])
    }

    /// Upload `data` at a byte offset
    ///
    /// Legacy devices cannot upload partial ranges; there the mirror prefix
    /// up to the end of the written range is uploaded instead.
    pub fn update_with_offset(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if state.is_view() {
            engine_warn!("lumen::Buffer", "Cannot update buffer view {}", self.id);
            return Ok(());
        }
        let end = offset + data.len() as u64;
        if end > state.size {
            engine_bail!("lumen::Buffer",
                "Update range [{}, {}) exceeds buffer {} of {} bytes", offset, end, self.id, state.size);
        }

        if let Some(mirror) = state.mirror.as_mut() {
            mirror[offset as usize..end as usize].copy_from_slice(data);
        }

        let mut dev = lock_device(&self.device);
        if dev.backend().supports_offset_update() || offset == 0 {
            return Self::upload(&mut dev, state, offset, data);
        }
        match state.mirror.as_deref() {
            Some(mirror) => Self::upload(&mut dev, state, 0, &mirror[..end as usize]),
            None => {
                engine_warn!("lumen::Buffer",
                    "Buffer {} has no mirror, partial update at offset {} skipped", self.id, offset);
                Ok(())
            }
        }
    }

    /// Upload the CPU mirror itself (the "source is the mirror" path of `update`)
    pub fn flush_mirror(&self, size: Option<u64>) -> Result<()> {
        let state = self.lock_state();
        if state.is_view() {
            engine_warn!("lumen::Buffer", "Cannot update buffer view {}", self.id);
            return Ok(());
        }
        let Some(mirror) = state.mirror.as_deref() else {
            engine_warn!("lumen::Buffer", "Buffer {} has no CPU mirror to flush", self.id);
            return Ok(());
        };
        let requested = match size {
            Some(size) => size,
            None if state.usage.contains(BufferUsage::INDIRECT) => 0,
            None => mirror.len() as u64,
        };
        let length = Self::clamp_length(self.id, requested, mirror.len() as u64, state.size);

        let mut dev = lock_device(&self.device);
        Self::upload(&mut dev, &state, 0, &mirror[..length as usize])
    }

    /// Replace the draw list of an INDIRECT buffer
    pub fn update_indirect(&self, draws: &[DrawInfo]) -> Result<()> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if state.is_view() {
            engine_warn!("lumen::Buffer", "Cannot update buffer view {}", self.id);
            return Ok(());
        }
        let Some(indirect) = state.indirect.as_mut() else {
            engine_bail!("lumen::Buffer", "Buffer {} is not an INDIRECT buffer", self.id);
        };
        indirect.draw_infos.clear();
        indirect.draw_infos.extend_from_slice(draws);

        let mut dev = lock_device(&self.device);
        Self::upload(&mut dev, state, 0, &[])
    }

    /// Release the device allocation and the CPU mirror (idempotent)
    ///
    /// Subtracts from the device counter exactly what this buffer added.
    /// Views release nothing; destroying a parent while views reference it
    /// is the caller's responsibility.
    pub fn destroy(&self) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        if state.destroyed {
            return;
        }
        state.destroyed = true;

        let mut dev = lock_device(&self.device);
        if let Storage::Native { handle } = &mut state.storage {
            if let Some(handle) = handle.take() {
                dev.destroy_gpu_buffer(handle);
            }
        }
        let accounted = state.mirror_bytes + state.gpu_bytes;
        dev.memory_status_mut().sub(accounted);
        state.mirror_bytes = 0;
        state.gpu_bytes = 0;
        state.mirror = None;
        state.indirect = None;

        engine_trace!("lumen::Buffer", "Destroyed buffer {}", self.id);
    }

    // ===== HELPERS =====

    fn clamp_length(id: u64, requested: u64, available: u64, size: u64) -> u64 {
        let length = requested.min(available);
        if length > size {
            engine_warn!("lumen::Buffer",
                "Update of {} bytes truncated to buffer {} size {}", length, id, size);
            return size;
        }
        length
    }

    fn upload(dev: &mut Device, state: &BufferState, offset: u64, data: &[u8]) -> Result<()> {
        match state.handle() {
            Some(handle) => dev.update_gpu_buffer(handle, offset, data),
            // mirror-served buffer: the copy above is the upload
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("usage", &state.usage)
            .field("size", &state.size)
            .field("view", &state.is_view())
            .finish()
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;

/// BatchedBuffer - merged geometry of one batch key
///
/// Sub-models sharing a pass and a vertex layout are merged on the CPU into
/// batches of up to `max_instances` instances. Each batch owns its merged
/// vertex streams, a per-vertex instance index stream and the instances'
/// world matrices, and is drawn with a single draw call.
///
/// Only non-indexed sub-models whose vertex buffers keep a BACKUP mirror can
/// be merged; others are reported and left out.

use std::sync::Arc;
use glam::Mat4;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandBuffer, DescriptorSet, DescriptorSetInfo,
    DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutInfo, DescriptorType,
    InputAssembler, InputAssemblerDesc, MemoryUsage, Shader, ShaderStageFlags, SharedDevice,
    VertexAttribute, VertexFormat,
};
use crate::pipeline::{DescriptorSetIndices, Pass, SubModel, ATTR_BATCH_ID};
use crate::program::{ubo_local_batched, BATCHING_COUNT, UBO_LOCAL_BATCHED_BINDING};
use crate::{engine_debug, engine_warn};

// ===== BATCH =====

/// One merged draw
pub struct Batch {
    vertex_buffers: Vec<Arc<Buffer>>,
    vertex_data: Vec<Vec<u8>>,
    instance_buffer: Arc<Buffer>,
    instance_ids: Vec<f32>,
    uniform_buffer: Arc<Buffer>,
    worlds: Vec<Mat4>,
    descriptor_set: DescriptorSet,
    input_assembler: InputAssembler,
    merge_count: usize,
    vertex_count: u32,
}

impl Batch {
    fn new(
        device: &SharedDevice,
        attributes: &[VertexAttribute],
        strides: &[u64],
        streams: &[&[u8]],
        max_instances: usize,
        layout: &Arc<DescriptorSetLayout>,
    ) -> Result<Self> {
        let mut vertex_buffers = Vec::with_capacity(strides.len());
        for (stride, data) in strides.iter().zip(streams) {
            vertex_buffers.push(Buffer::new(device, BufferDesc::new(
                BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
                MemoryUsage::DEVICE,
                (data.len() as u64).max(*stride),
            ).with_stride(*stride))?);
        }

        let vertex_count = streams.first().zip(strides.first()).map_or(1, |(data, stride)| data.len() as u64 / stride);
        let instance_buffer = Buffer::new(device, BufferDesc::new(
            BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
            MemoryUsage::DEVICE,
            vertex_count.max(1) * 4,
        ).with_stride(4))?;

        let uniform_buffer = Buffer::new(device, BufferDesc::new(
            BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST,
            MemoryUsage::HOST | MemoryUsage::DEVICE,
            ubo_local_batched().size() as u64,
        ))?;

        let descriptor_set = DescriptorSet::new(device, DescriptorSetInfo { layout: layout.clone() });
        descriptor_set.bind_buffer(UBO_LOCAL_BATCHED_BINDING, uniform_buffer.clone())?;
        descriptor_set.update();

        let mut batch_attributes = attributes.to_vec();
        batch_attributes.push(VertexAttribute::new(ATTR_BATCH_ID, VertexFormat::R32_SFLOAT, strides.len() as u32, 0));
        let mut all_buffers = vertex_buffers.clone();
        all_buffers.push(instance_buffer.clone());
        let mut input_assembler = InputAssembler::new(InputAssemblerDesc {
            attributes: batch_attributes,
            vertex_buffers: all_buffers,
            ..InputAssemblerDesc::default()
        });
        input_assembler.set_vertex_count(0);

        Ok(Self {
            vertex_data: vec![Vec::new(); vertex_buffers.len()],
            vertex_buffers,
            instance_buffer,
            instance_ids: Vec::new(),
            uniform_buffer,
            worlds: Vec::with_capacity(max_instances),
            descriptor_set,
            input_assembler,
            merge_count: 0,
            vertex_count: 0,
        })
    }

    fn append(&mut self, streams: &[&[u8]], vertex_count: u32, world: &Mat4) -> Result<()> {
        let instance = self.merge_count as f32;
        for (i, data) in streams.iter().enumerate() {
            self.vertex_data[i].extend_from_slice(data);
            grow(&self.vertex_buffers[i], self.vertex_data[i].len() as u64)?;
        }
        self.instance_ids.extend(std::iter::repeat(instance).take(vertex_count as usize));
        grow(&self.instance_buffer, (self.instance_ids.len() * 4) as u64)?;
        self.worlds.push(*world);

        self.merge_count += 1;
        self.vertex_count += vertex_count;
        self.input_assembler.set_vertex_count(self.vertex_count);
        Ok(())
    }

    fn clear(&mut self) {
        for data in &mut self.vertex_data {
            data.clear();
        }
        self.instance_ids.clear();
        self.worlds.clear();
        self.merge_count = 0;
        self.vertex_count = 0;
        self.input_assembler.set_vertex_count(0);
    }

    /// Upload the merged contents and draw them
    pub fn record(&self, cmd: &mut dyn CommandBuffer) -> Result<()> {
        for (buffer, data) in self.vertex_buffers.iter().zip(&self.vertex_data) {
            cmd.update_buffer(buffer, data)?;
        }
        cmd.update_buffer(&self.instance_buffer, bytemuck::cast_slice(&self.instance_ids))?;
        cmd.update_buffer(&self.uniform_buffer, bytemuck::cast_slice(&self.worlds))?;
        cmd.bind_descriptor_set(DescriptorSetIndices::LOCAL, &self.descriptor_set)?;
        cmd.bind_input_assembler(&self.input_assembler)?;
        cmd.draw(&self.input_assembler)
    }

    /// Instances merged so far
    pub fn merge_count(&self) -> usize {
        self.merge_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn input_assembler(&self) -> &InputAssembler {
        &self.input_assembler
    }

    pub fn descriptor_set(&self) -> &DescriptorSet {
        &self.descriptor_set
    }

    pub fn vertex_buffers(&self) -> &[Arc<Buffer>] {
        &self.vertex_buffers
    }

    /// Merged bytes of one vertex stream
    pub fn vertex_data(&self, stream: usize) -> Option<&[u8]> {
        self.vertex_data.get(stream).map(Vec::as_slice)
    }

    pub fn instance_ids(&self) -> &[f32] {
        &self.instance_ids
    }

    pub fn worlds(&self) -> &[Mat4] {
        &self.worlds
    }
}

/// Resize a merged buffer so it holds `needed` bytes (doubling)
fn grow(buffer: &Buffer, needed: u64) -> Result<()> {
    if needed > buffer.size() {
        buffer.resize(needed.max(buffer.size() * 2))?;
    }
    Ok(())
}

// ===== BATCHED BUFFER =====

pub struct BatchedBuffer {
    device: SharedDevice,
    pass: Arc<Pass>,
    shader: Arc<dyn Shader>,
    attributes: Vec<VertexAttribute>,
    strides: Vec<u64>,
    max_instances: usize,
    layout: Arc<DescriptorSetLayout>,
    batches: Vec<Batch>,
}

impl BatchedBuffer {
    /// Batched buffer for sub-models laid out like `input_assembler`
    ///
    /// `max_instances` is kept within `1..=BATCHING_COUNT`, the length of the
    /// shader's world matrix array.
    pub fn new(
        device: &SharedDevice,
        pass: Arc<Pass>,
        shader: Arc<dyn Shader>,
        input_assembler: &InputAssembler,
        max_instances: usize,
    ) -> Self {
        let layout = DescriptorSetLayout::new(DescriptorSetLayoutInfo {
            bindings: vec![DescriptorSetLayoutBinding::new(DescriptorType::UNIFORM_BUFFER, 1, ShaderStageFlags::VERTEX)],
        });
        Self {
            device: device.clone(),
            pass,
            shader,
            attributes: input_assembler.attributes().to_vec(),
            strides: input_assembler.vertex_buffers().iter().map(|vb| vb.stride()).collect(),
            max_instances: max_instances.clamp(1, BATCHING_COUNT),
            layout,
            batches: Vec::new(),
        }
    }

    pub fn pass(&self) -> &Arc<Pass> {
        &self.pass
    }

    pub fn shader(&self) -> &Arc<dyn Shader> {
        &self.shader
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// At least one batch holds an instance
    pub fn has_instances(&self) -> bool {
        self.batches.iter().any(|batch| batch.merge_count > 0)
    }

    /// Merge one sub-model instance
    ///
    /// Returns `Ok(false)` when the sub-model cannot be batched: indexed,
    /// laid out with other streams or strides, or missing vertex data in a
    /// BACKUP mirror.
    pub fn merge(&mut self, sub_model: &SubModel, world: &Mat4) -> Result<bool> {
        let input_assembler = &sub_model.input_assembler;
        if input_assembler.index_buffer().is_some() {
            engine_warn!("lumen::BatchedBuffer", "Indexed sub-models cannot be batched");
            return Ok(false);
        }
        let vertex_buffers = input_assembler.vertex_buffers();
        if vertex_buffers.len() != self.strides.len() {
            engine_warn!("lumen::BatchedBuffer",
                "Sub-model has {} vertex streams, batch expects {}", vertex_buffers.len(), self.strides.len());
            return Ok(false);
        }

        let vertex_count = input_assembler.draw_info().vertex_count;
        let mut mirrors = Vec::with_capacity(vertex_buffers.len());
        for (buffer, stride) in vertex_buffers.iter().zip(&self.strides) {
            if buffer.stride() != *stride {
                engine_warn!("lumen::BatchedBuffer",
                    "Vertex buffer {} has stride {}, batch expects {}", buffer.id(), buffer.stride(), stride);
                return Ok(false);
            }
            let length = (vertex_count as u64 * stride) as usize;
            let Some(data) = buffer.with_mirror(|bytes| bytes.get(..length).map(<[u8]>::to_vec)) else {
                engine_warn!("lumen::BatchedBuffer",
                    "Vertex buffer {} has no BACKUP mirror, sub-model not batched", buffer.id());
                return Ok(false);
            };
            let Some(data) = data else {
                engine_warn!("lumen::BatchedBuffer",
                    "Vertex buffer {} holds fewer than {} vertices, sub-model not batched", buffer.id(), vertex_count);
                return Ok(false);
            };
            mirrors.push(data);
        }
        let streams: Vec<&[u8]> = mirrors.iter().map(Vec::as_slice).collect();

        let index = match self.batches.iter().position(|batch| batch.merge_count < self.max_instances) {
            Some(index) => index,
            None => {
                self.batches.push(Batch::new(
                    &self.device, &self.attributes, &self.strides, &streams, self.max_instances, &self.layout,
                )?);
                engine_debug!("lumen::BatchedBuffer",
                    "Pass {}: started batch {}", self.pass.id(), self.batches.len());
                self.batches.len() - 1
            }
        };
        self.batches[index].append(&streams, vertex_count, world)?;
        Ok(true)
    }

    /// Empty every batch, keeping its buffers for the next frame
    pub fn clear(&mut self) {
        for batch in &mut self.batches {
            batch.clear();
        }
    }
}

#[cfg(test)]
#[path = "batched_buffer_tests.rs"]
mod tests;

/// Input assembler - vertex layout plus the buffers a draw reads

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use rustc_hash::FxHasher;
use crate::graphics_device::{Buffer, DrawInfo};

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum VertexFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R8G8B8A8_UNORM,
    R16G16_SINT,
    R32_UINT,
}

impl VertexFormat {
    /// Size in bytes of one element
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::R32_SFLOAT | VertexFormat::R32_UINT => 4,
            VertexFormat::R8G8B8A8_UNORM | VertexFormat::R16G16_SINT => 4,
            VertexFormat::R32G32_SFLOAT => 8,
            VertexFormat::R32G32B32_SFLOAT => 12,
            VertexFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic name (e.g. "a_position")
    pub name: String,
    pub format: VertexFormat,
    /// Vertex buffer stream index
    pub stream: u32,
    /// Offset in bytes inside one vertex of the stream
    pub offset: u32,
    pub normalized: bool,
    pub instanced: bool,
}

impl VertexAttribute {
    pub fn new(name: &str, format: VertexFormat, stream: u32, offset: u32) -> Self {
        Self {
            name: name.to_string(),
            format,
            stream,
            offset,
            normalized: false,
            instanced: false,
        }
    }
}

/// Hash of a vertex layout, used in pipeline state keys
pub fn attributes_hash(attributes: &[VertexAttribute]) -> u64 {
    let mut hasher = FxHasher::default();
    attributes.hash(&mut hasher);
    hasher.finish()
}

/// Descriptor for creating an input assembler
#[derive(Clone, Default)]
pub struct InputAssemblerDesc {
    pub attributes: Vec<VertexAttribute>,
    pub vertex_buffers: Vec<Arc<Buffer>>,
    pub index_buffer: Option<Arc<Buffer>>,
    pub indirect_buffer: Option<Arc<Buffer>>,
}

/// Geometry binding of a draw
pub struct InputAssembler {
    attributes: Vec<VertexAttribute>,
    attributes_hash: u64,
    vertex_buffers: Vec<Arc<Buffer>>,
    index_buffer: Option<Arc<Buffer>>,
    indirect_buffer: Option<Arc<Buffer>>,
    draw_info: DrawInfo,
}

impl InputAssembler {
    /// Vertex count comes from the first vertex stream, index count from the index buffer
    pub fn new(desc: InputAssemblerDesc) -> Self {
        let vertex_count = desc.vertex_buffers.first().map_or(0, |vb| vb.count() as u32);
        let index_count = desc.index_buffer.as_ref().map_or(0, |ib| ib.count() as u32);
        Self {
            attributes_hash: attributes_hash(&desc.attributes),
            attributes: desc.attributes,
            vertex_buffers: desc.vertex_buffers,
            index_buffer: desc.index_buffer,
            indirect_buffer: desc.indirect_buffer,
            draw_info: DrawInfo {
                vertex_count,
                index_count,
                instance_count: 1,
                ..DrawInfo::default()
            },
        }
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn attributes_hash(&self) -> u64 {
        self.attributes_hash
    }

    pub fn vertex_buffers(&self) -> &[Arc<Buffer>] {
        &self.vertex_buffers
    }

    pub fn index_buffer(&self) -> Option<&Arc<Buffer>> {
        self.index_buffer.as_ref()
    }

    pub fn indirect_buffer(&self) -> Option<&Arc<Buffer>> {
        self.indirect_buffer.as_ref()
    }

    pub fn draw_info(&self) -> DrawInfo {
        self.draw_info
    }

    pub fn set_vertex_count(&mut self, count: u32) {
        self.draw_info.vertex_count = count;
    }

    pub fn set_index_count(&mut self, count: u32) {
        self.draw_info.index_count = count;
    }

    pub fn set_instance_count(&mut self, count: u32) {
        self.draw_info.instance_count = count;
    }
}

#[cfg(test)]
#[path = "input_assembler_tests.rs"]
mod tests;

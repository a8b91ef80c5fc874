/// Scene fixtures for unit tests of the render queues

use std::sync::Arc;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    Buffer, BufferDesc, BufferFlags, BufferUsage, DescriptorSet, DescriptorSetInfo,
    DescriptorSetLayout, DescriptorSetLayoutBinding, DescriptorSetLayoutInfo, DescriptorType,
    GraphicsApi, InputAssembler, InputAssemblerDesc, MemoryUsage, SharedDevice, ShaderStageFlags,
    VertexAttribute, VertexFormat,
};
use crate::pipeline::*;
use crate::program::*;

pub const TEST_PROGRAM: &str = "lit";

/// Context over a fresh mock device with the test program registered
pub fn test_context(api: GraphicsApi) -> (RenderContext, MockCalls) {
    let (device, calls) = mock_device(api);
    let mut ctx = RenderContext::new(device, ProgramLibConfig::default()).unwrap();
    ctx.program_lib.define(ProgramInfo {
        name: TEST_PROGRAM.to_string(),
        vert: "void main() {}\n".to_string(),
        frag: "void main() {}\n".to_string(),
        defines: vec![
            DefineInfo::boolean(MACRO_FORWARD_ADD),
            DefineInfo::boolean(MACRO_SPOTLIGHT),
            DefineInfo::boolean(MACRO_USE_BATCHING),
            DefineInfo::boolean("USE_FOG"),
        ],
        blocks: vec![ubo_forward_light()],
        ..ProgramInfo::default()
    }).unwrap();
    (ctx, calls)
}

/// LOCAL set layout: locals block, forward light block, one sampler
pub fn local_layout() -> Arc<DescriptorSetLayout> {
    DescriptorSetLayout::new(DescriptorSetLayoutInfo {
        bindings: vec![
            DescriptorSetLayoutBinding::new(DescriptorType::UNIFORM_BUFFER, 1, ShaderStageFlags::ALL),
            DescriptorSetLayoutBinding::new(DescriptorType::UNIFORM_BUFFER, 1, ShaderStageFlags::FRAGMENT),
            DescriptorSetLayoutBinding::new(DescriptorType::SAMPLER, 1, ShaderStageFlags::FRAGMENT),
        ],
    })
}

/// MATERIAL set layout: one block
pub fn material_layout() -> Arc<DescriptorSetLayout> {
    DescriptorSetLayout::new(DescriptorSetLayoutInfo {
        bindings: vec![DescriptorSetLayoutBinding::new(DescriptorType::UNIFORM_BUFFER, 1, ShaderStageFlags::ALL)],
    })
}

pub fn test_pass(ctx: &mut RenderContext, phase: &str) -> Arc<Pass> {
    Pass::new(ctx, PassInfo::new(TEST_PROGRAM, phase, material_layout())).unwrap()
}

pub fn position_attributes() -> Vec<VertexAttribute> {
    vec![VertexAttribute::new("a_position", VertexFormat::R32G32B32_SFLOAT, 0, 0)]
}

/// Non-indexed sub-model with one position stream of `vertex_count` vertices
///
/// The vertex buffer keeps a BACKUP mirror filled with `fill` when `backup` is set.
pub fn sub_model(device: &SharedDevice, vertex_count: u64, fill: f32, backup: bool) -> Arc<SubModel> {
    let flags = if backup { BufferFlags::BACKUP } else { BufferFlags::empty() };
    let vertices = Buffer::new(device, BufferDesc::new(
        BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
        MemoryUsage::DEVICE,
        vertex_count * 12,
    ).with_stride(12).with_flags(flags)).unwrap();
    let data = vec![fill; (vertex_count * 3) as usize];
    vertices.update(bytemuck::cast_slice(&data), None).unwrap();

    let locals = Buffer::new(device, BufferDesc::new(
        BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST,
        MemoryUsage::HOST | MemoryUsage::DEVICE,
        ubo_local().size() as u64,
    )).unwrap();

    let descriptor_set = DescriptorSet::new(device, DescriptorSetInfo { layout: local_layout() });
    descriptor_set.bind_buffer(UBO_LOCAL_BINDING, locals).unwrap();
    descriptor_set.bind_texture(2, mock_texture(900)).unwrap();
    descriptor_set.bind_sampler(2, mock_sampler(901)).unwrap();
    descriptor_set.update();

    let input_assembler = InputAssembler::new(InputAssemblerDesc {
        attributes: position_attributes(),
        vertex_buffers: vec![vertices],
        ..InputAssemblerDesc::default()
    });
    SubModel::new(input_assembler, descriptor_set)
}

pub fn render_object(sub_models: Vec<Arc<SubModel>>) -> RenderObject {
    RenderObject { model: Arc::new(Model::new(sub_models)), depth: 0.0 }
}

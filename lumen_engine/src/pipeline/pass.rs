/// Pass - one draw configuration of a material
///
/// A pass names its program and base defines, the phase it renders in, the
/// material descriptor set bound at `DescriptorSetIndices::MATERIAL` and the
/// fixed-function state baked into its pipeline states.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    BlendState, DepthStencilState, DescriptorSet, DescriptorSetInfo, DescriptorSetLayout,
    PrimitiveTopology, RasterizerState, Shader, lock_device,
};
use crate::pipeline::RenderContext;
use crate::program::{DefineMap, MacroPatch, MacroValue};
use crate::{engine_bail, engine_debug};

// ===== DESCRIPTOR =====

/// Descriptor for creating a pass
#[derive(Clone)]
pub struct PassInfo {
    /// Registered program (template) name
    pub program: String,
    /// Phase name, "default" unless the pass is drawn by a dedicated queue
    pub phase: String,
    pub defines: DefineMap,
    /// Layout of the material descriptor set
    pub layout: Arc<DescriptorSetLayout>,
    pub primitive: PrimitiveTopology,
    pub rasterizer: RasterizerState,
    pub depth_stencil: DepthStencilState,
    pub blend: BlendState,
}

impl PassInfo {
    pub fn new(program: &str, phase: &str, layout: Arc<DescriptorSetLayout>) -> Self {
        Self {
            program: program.to_string(),
            phase: phase.to_string(),
            defines: DefineMap::new(),
            layout,
            primitive: PrimitiveTopology::TriangleList,
            rasterizer: RasterizerState::default(),
            depth_stencil: DepthStencilState::default(),
            blend: BlendState::default(),
        }
    }

    pub fn with_define(mut self, name: &str, value: impl Into<MacroValue>) -> Self {
        self.defines.insert(name.to_string(), value.into());
        self
    }
}

// ===== PASS =====

pub struct Pass {
    id: u64,
    phase: u32,
    program: String,
    defines: DefineMap,
    descriptor_set: DescriptorSet,
    primitive: PrimitiveTopology,
    rasterizer: RasterizerState,
    depth_stencil: DepthStencilState,
    blend: BlendState,
}

impl Pass {
    /// Create a pass on the context's device
    ///
    /// # Errors
    ///
    /// `InvalidResource` if the program is not registered in the context's
    /// ProgramLib, `LimitExceeded` if the phase cannot be registered.
    pub fn new(ctx: &mut RenderContext, info: PassInfo) -> Result<Arc<Pass>> {
        if !ctx.program_lib.has_program(&info.program) {
            engine_bail!("lumen::Pass", "Program '{}' is not registered", info.program);
        }
        let phase = ctx.phases.get_phase_id(&info.phase)?;
        let id = lock_device(&ctx.device).gen_object_id();
        let descriptor_set = DescriptorSet::new(&ctx.device, DescriptorSetInfo { layout: info.layout });

        engine_debug!("lumen::Pass", "Created pass {} ('{}', phase '{}')", id, info.program, info.phase);

        Ok(Arc::new(Pass {
            id,
            phase,
            program: info.program,
            defines: info.defines,
            descriptor_set,
            primitive: info.primitive,
            rasterizer: info.rasterizer,
            depth_stencil: info.depth_stencil,
            blend: info.blend,
        }))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Phase bit (see `PhaseRegistry`)
    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn defines(&self) -> &DefineMap {
        &self.defines
    }

    /// Material descriptor set
    pub fn descriptor_set(&self) -> &DescriptorSet {
        &self.descriptor_set
    }

    pub fn primitive(&self) -> PrimitiveTopology {
        self.primitive
    }

    pub fn rasterizer(&self) -> &RasterizerState {
        &self.rasterizer
    }

    pub fn depth_stencil(&self) -> &DepthStencilState {
        &self.depth_stencil
    }

    pub fn blend(&self) -> &BlendState {
        &self.blend
    }

    /// Shader variant for the base defines with `patches` applied on top
    ///
    /// Later patches override earlier ones with the same name.
    pub fn shader_variant(&self, ctx: &mut RenderContext, patches: &[MacroPatch]) -> Result<Arc<dyn Shader>> {
        let mut defines = self.defines.clone();
        for patch in patches {
            defines.insert(patch.name.clone(), patch.value);
        }
        let mut device = lock_device(&ctx.device);
        ctx.program_lib.get_gfx_shader(&mut device, &self.program, &defines)
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;

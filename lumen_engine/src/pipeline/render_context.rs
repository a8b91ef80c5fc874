/// RenderContext - the state shared by the render queues of one device
///
/// Holds the device handle, the shader variant cache, the pipeline state
/// cache and the phase registry. Queue operations receive it explicitly;
/// like the device it belongs to, it is driven by one render thread.

use crate::error::Result;
use crate::graphics_device::SharedDevice;
use crate::pipeline::{PhaseRegistry, PipelineStateManager};
use crate::program::{ProgramLib, ProgramLibConfig};

pub struct RenderContext {
    pub device: SharedDevice,
    pub program_lib: ProgramLib,
    pub pipeline_states: PipelineStateManager,
    pub phases: PhaseRegistry,
}

impl RenderContext {
    pub fn new(device: SharedDevice, config: ProgramLibConfig) -> Result<Self> {
        Ok(Self {
            device,
            program_lib: ProgramLib::new(config)?,
            pipeline_states: PipelineStateManager::new(),
            phases: PhaseRegistry::new(),
        })
    }
}

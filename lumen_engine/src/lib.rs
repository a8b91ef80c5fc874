/*!
# Lumen Engine

Hardware abstraction and draw batching core of the Lumen real-time renderer.

Two backend generations (legacy and modern buffer/descriptor semantics) are
driven through one set of resource types; the backend strategy is selected
when a `Device` is created. On top of it sit a shader variant cache and the
per-frame render queues of the forward renderer.

## Architecture

- **GraphicsDevice**: primitive surface implemented by a backend
- **Device**: per-device context (backend strategy, byte counter, id generators)
- **Buffer / DescriptorSetLayout / DescriptorSet**: GPU resources with lazy descriptor sync
- **ProgramLib**: shader templates and the compiled variant cache
- **PipelineStateManager**: pipeline state cache
- **RenderAdditiveLightQueue**: per-light draws of the additive forward pass
- **RenderBatchedQueue**: CPU-merged draws of small sub-models
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod program;
pub mod pipeline;

// Main lumen namespace module
pub mod lumen {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine facade (logger slot)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Graphics device sub-module
    pub mod gfx {
        pub use crate::graphics_device::*;
    }

    // Shader program sub-module
    pub mod program {
        pub use crate::program::*;
    }

    // Render pipeline sub-module
    pub mod pipeline {
        pub use crate::pipeline::*;
    }
}

// Re-export math library at crate root
pub use glam;

/// Graphics device module - hardware abstraction types and traits

// Module declarations
pub mod graphics_device;
pub mod device;
pub mod backend;
pub mod buffer;
pub mod descriptor_set_layout;
pub mod descriptor_set;
pub mod shader;
pub mod texture;
pub mod pipeline_state;
pub mod input_assembler;
pub mod command_buffer;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use device::*;
pub use backend::*;
pub use buffer::*;
pub use descriptor_set_layout::*;
pub use descriptor_set::*;
pub use shader::*;
pub use texture::*;
pub use pipeline_state::*;
pub use input_assembler::*;
pub use command_buffer::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;

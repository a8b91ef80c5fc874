/// Pipeline module - passes, lights, models and the per-frame render queues

pub mod define;
pub mod pass_phase;
pub mod pass;
pub mod light;
pub mod model;
pub mod pipeline_state_manager;
pub mod render_context;
pub mod render_additive_light_queue;
pub mod batched_buffer;
pub mod render_batched_queue;

pub use define::*;
pub use pass_phase::*;
pub use pass::*;
pub use light::*;
pub use model::*;
pub use pipeline_state_manager::*;
pub use render_context::*;
pub use render_additive_light_queue::*;
pub use batched_buffer::*;
pub use render_batched_queue::*;

// Scene fixtures for tests (mock device, registered program, sub-models)
#[cfg(test)]
pub mod mock_scene;

/// Program module - shader templates, variant cache and built-in uniform blocks

pub mod uniforms;
pub mod program_lib;

pub use uniforms::*;
pub use program_lib::*;

/// Pipeline-wide constants and configuration

use crate::program::BATCHING_COUNT;

/// Descriptor set slots bound by the render queues
pub struct DescriptorSetIndices;

impl DescriptorSetIndices {
    /// Frame globals
    pub const GLOBAL: u32 = 0;
    /// Pass (material) resources
    pub const MATERIAL: u32 = 1;
    /// Per-draw resources (locals, forward light, batched worlds)
    pub const LOCAL: u32 = 2;
}

/// Phase of passes drawn once per additive light
pub const PHASE_FORWARD_ADD: &str = "forward-add";

/// Macro enabled on every additive light variant
pub const MACRO_FORWARD_ADD: &str = "CC_FORWARD_ADD";

/// Macro enabled on spot light variants
pub const MACRO_SPOTLIGHT: &str = "CC_SPOTLIGHT";

/// Macro enabled on batched variants
pub const MACRO_USE_BATCHING: &str = "CC_USE_BATCHING";

/// Per-vertex instance index stream appended to batched geometry
pub const ATTR_BATCH_ID: &str = "a_dyn_batch_id";

/// Batching configuration
#[derive(Debug, Clone)]
pub struct BatchingConfig {
    /// Instances merged into one batch before a new batch is started
    pub max_instances_per_batch: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self { max_instances_per_batch: BATCHING_COUNT }
    }
}

/// Pass phases
///
/// A phase names the stage a pass belongs to ("default", "forward-add", ...).
/// Each distinct name gets one bit so queues can test membership with a mask.

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::engine_error;

/// Phase name -> phase bit
#[derive(Debug, Default)]
pub struct PhaseRegistry {
    phases: FxHashMap<String, u32>,
}

impl PhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bit of a phase, assigned on first lookup
    ///
    /// # Errors
    ///
    /// `LimitExceeded` once 32 phases are registered.
    pub fn get_phase_id(&mut self, name: &str) -> Result<u32> {
        if let Some(&id) = self.phases.get(name) {
            return Ok(id);
        }
        let index = self.phases.len() as u32;
        if index >= u32::BITS {
            let message = format!("cannot register phase '{}': {} phases in use", name, index);
            engine_error!("lumen::PhaseRegistry", "{}", message);
            return Err(Error::LimitExceeded(message));
        }
        let id = 1 << index;
        self.phases.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[cfg(test)]
#[path = "pass_phase_tests.rs"]
mod tests;

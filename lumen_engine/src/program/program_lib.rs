/// ProgramLib - shader templates and the compiled variant cache
///
/// A template is registered once with its macro defines. Each define gets a
/// bit range inside a per-template bitmask; an active define assignment
/// encodes to a `VariantKey` (template id + bitmask) that keys the cache.
/// Variants are compiled on first request and kept for the lifetime of the
/// library: their number is bounded by authored content.

use std::collections::BTreeMap;
use std::sync::Arc;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::graphics_device::{
    Capabilities, Device, Shader, ShaderDesc, ShaderStage, ShaderStageDesc, UniformBlock,
    UniformSampler,
};
use crate::program::{ubo_global, ubo_local};
use crate::{engine_debug, engine_err, engine_error, engine_warn};

// ===== MACRO VALUES =====

/// Value of a macro define
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroValue {
    Bool(bool),
    Int(i32),
}

impl MacroValue {
    /// Numeric value written into the `#define` line
    pub fn as_int(&self) -> i32 {
        match *self {
            MacroValue::Bool(value) => value as i32,
            MacroValue::Int(value) => value,
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.as_int() != 0
    }
}

impl From<bool> for MacroValue {
    fn from(value: bool) -> Self {
        MacroValue::Bool(value)
    }
}

impl From<i32> for MacroValue {
    fn from(value: i32) -> Self {
        MacroValue::Int(value)
    }
}

/// Active define assignment (sorted, so variant names are deterministic)
pub type DefineMap = BTreeMap<String, MacroValue>;

/// One define override applied on top of a pass's defines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroPatch {
    pub name: String,
    pub value: MacroValue,
}

impl MacroPatch {
    pub fn new(name: &str, value: impl Into<MacroValue>) -> Self {
        Self { name: name.to_string(), value: value.into() }
    }
}

// ===== TEMPLATES =====

/// Kind of a macro define
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineKind {
    Boolean,
    /// Integer in the inclusive range `[min, max]`
    Number { min: i32, max: i32 },
}

/// Macro define declared by a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineInfo {
    pub name: String,
    pub kind: DefineKind,
}

impl DefineInfo {
    pub fn boolean(name: &str) -> Self {
        Self { name: name.to_string(), kind: DefineKind::Boolean }
    }

    /// Integer define; range defaults to `[0, 4]`
    pub fn number(name: &str, range: Option<(i32, i32)>) -> Self {
        let (min, max) = range.unwrap_or((0, 4));
        Self { name: name.to_string(), kind: DefineKind::Number { min, max } }
    }
}

/// Program as authored (input of `ProgramLib::define`)
#[derive(Debug, Clone, Default)]
pub struct ProgramInfo {
    pub name: String,
    pub vert: String,
    pub frag: String,
    pub defines: Vec<DefineInfo>,
    pub blocks: Vec<UniformBlock>,
    pub samplers: Vec<UniformSampler>,
    /// Define name -> device feature it requires
    pub dependencies: FxHashMap<String, String>,
}

/// Define with its place in the variant bitmask
#[derive(Debug, Clone)]
pub struct DefineRecord {
    pub info: DefineInfo,
    pub offset: u32,
    pub width: u32,
}

impl DefineRecord {
    /// Value inside the define's domain
    fn clamp(&self, value: MacroValue) -> i32 {
        match self.info.kind {
            DefineKind::Boolean => value.is_truthy() as i32,
            DefineKind::Number { min, max } => value.as_int().clamp(min, max),
        }
    }

    /// Clamp a value into the define's domain, warning when it was outside
    fn normalize(&self, value: MacroValue, template: &str) -> i32 {
        let clamped = self.clamp(value);
        if let DefineKind::Number { min, max } = self.info.kind {
            let raw = value.as_int();
            if clamped != raw {
                engine_warn!("lumen::ProgramLib",
                    "'{}': {} = {} outside [{}, {}], clamped to {}",
                    template, self.info.name, raw, min, max, clamped);
            }
        }
        clamped
    }

    /// Contribution of a value to the variant bitmask
    fn encode(&self, value: MacroValue, template: &str) -> u64 {
        let normalized = self.normalize(value, template);
        let base = match self.info.kind {
            DefineKind::Boolean => 0,
            DefineKind::Number { min, .. } => min,
        };
        ((normalized as i64 - base as i64) as u64) << self.offset
    }
}

/// Registered template
#[derive(Debug, Clone)]
pub struct ProgramTemplate {
    pub id: u32,
    pub name: String,
    /// Vertex source with precision preamble
    pub vert: String,
    /// Fragment source with precision preamble
    pub frag: String,
    pub defines: Vec<DefineRecord>,
    /// Program blocks followed by the engine globals and locals blocks
    pub blocks: Vec<UniformBlock>,
    pub samplers: Vec<UniformSampler>,
    pub dependencies: FxHashMap<String, String>,
    /// Total bits used by the defines
    pub macro_bits: u32,
}

// ===== KEYS =====

/// Cache key of a shader variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub template_id: u32,
    pub bits: u64,
}

impl VariantKey {
    /// Single-integer form: `(bits << template_id_bits) | template_id`
    pub fn packed(&self, template_id_bits: u32) -> u64 {
        let id_mask = (1u64 << template_id_bits) - 1;
        (self.bits << template_id_bits) | (self.template_id as u64 & id_mask)
    }
}

/// Bit-budget configuration of the variant keys
#[derive(Debug, Clone)]
pub struct ProgramLibConfig {
    /// Preamble prepended to both stages of every template
    pub precision: String,
    /// Bits reserved for the template id in packed keys
    pub template_id_bits: u32,
    /// Bits available to one template's defines
    pub macro_bit_budget: u32,
}

impl Default for ProgramLibConfig {
    fn default() -> Self {
        Self {
            precision: "precision highp float;\n".to_string(),
            template_id_bits: 8,
            macro_bit_budget: 24,
        }
    }
}

// ===== LIBRARY =====

/// Shader variant cache
pub struct ProgramLib {
    config: ProgramLibConfig,
    templates: FxHashMap<String, ProgramTemplate>,
    cache: FxHashMap<VariantKey, Arc<dyn Shader>>,
    next_template_id: u32,
    // (template id, define) pairs already reported as unsupported
    warned: FxHashSet<(u32, String)>,
}

impl ProgramLib {
    /// Create an empty library
    ///
    /// # Errors
    ///
    /// `InitializationFailed` when the id bits are outside `1..=32` or the
    /// id bits plus the macro budget exceed 64.
    pub fn new(config: ProgramLibConfig) -> Result<Self> {
        if !(1..=32).contains(&config.template_id_bits)
            || config.template_id_bits + config.macro_bit_budget > 64
        {
            let message = format!(
                "invalid variant key layout ({} id bits + {} macro bits)",
                config.template_id_bits, config.macro_bit_budget
            );
            engine_error!("lumen::ProgramLib", "{}", message);
            return Err(Error::InitializationFailed(message));
        }
        Ok(Self {
            config,
            templates: FxHashMap::default(),
            cache: FxHashMap::default(),
            next_template_id: 0,
            warned: FxHashSet::default(),
        })
    }

    pub fn config(&self) -> &ProgramLibConfig {
        &self.config
    }

    /// Register a template (a second registration under the same name is ignored)
    ///
    /// Defines receive consecutive bit ranges in declaration order: one bit
    /// for a boolean, `ceil(log2(max - min + 1))` bits (at least one) for an
    /// integer range.
    ///
    /// # Errors
    ///
    /// `LimitExceeded` when the template ids or the macro bit budget run out,
    /// `InvalidResource` for an integer define with `max < min`.
    pub fn define(&mut self, info: ProgramInfo) -> Result<()> {
        if self.templates.contains_key(&info.name) {
            return Ok(());
        }

        let id = self.next_template_id + 1;
        let max_id = (1u64 << self.config.template_id_bits) - 1;
        if id as u64 > max_id {
            return Err(Self::limit_exceeded(format!(
                "cannot register '{}': {} template ids available", info.name, max_id
            )));
        }

        let mut offset = 0;
        let mut defines = Vec::with_capacity(info.defines.len());
        for define in info.defines {
            let width = match define.kind {
                DefineKind::Boolean => 1,
                DefineKind::Number { min, max } => {
                    if max < min {
                        return Err(engine_err!("lumen::ProgramLib",
                            "'{}': define {} has empty range [{}, {}]", info.name, define.name, min, max));
                    }
                    let span = (max as i64 - min as i64) as u64 + 1;
                    (64 - (span - 1).leading_zeros()).max(1)
                }
            };
            defines.push(DefineRecord { info: define, offset, width });
            offset += width;
        }
        if offset > self.config.macro_bit_budget {
            return Err(Self::limit_exceeded(format!(
                "'{}' needs {} macro bits, budget is {}", info.name, offset, self.config.macro_bit_budget
            )));
        }

        let mut blocks = info.blocks;
        blocks.push(ubo_global());
        blocks.push(ubo_local());

        let template = ProgramTemplate {
            id,
            name: info.name.clone(),
            vert: format!("{}{}", self.config.precision, info.vert),
            frag: format!("{}{}", self.config.precision, info.frag),
            defines,
            blocks,
            samplers: info.samplers,
            dependencies: info.dependencies,
            macro_bits: offset,
        };

        engine_debug!("lumen::ProgramLib",
            "Registered template '{}' (id {}, {} macro bits)", template.name, id, offset);
        self.next_template_id = id;
        self.templates.insert(info.name, template);
        Ok(())
    }

    pub fn has_program(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn get_template(&self, name: &str) -> Option<&ProgramTemplate> {
        self.templates.get(name)
    }

    /// Number of compiled variants held by the cache
    pub fn variant_count(&self) -> usize {
        self.cache.len()
    }

    /// Encode a define assignment as a composite key
    ///
    /// Defines the template does not declare are ignored.
    pub fn get_variant_key(&self, name: &str, defines: &DefineMap) -> Result<VariantKey> {
        let template = self.templates.get(name)
            .ok_or_else(|| engine_err!("lumen::ProgramLib", "Unknown program '{}'", name))?;

        let mut bits = 0u64;
        for define in &template.defines {
            if let Some(value) = defines.get(&define.info.name) {
                bits |= define.encode(*value, name);
            }
        }
        Ok(VariantKey { template_id: template.id, bits })
    }

    /// Encode a define assignment as a single integer
    pub fn get_key(&self, name: &str, defines: &DefineMap) -> Result<u64> {
        let key = self.get_variant_key(name, defines)?;
        Ok(key.packed(self.config.template_id_bits))
    }

    /// Return the variant for a define assignment, compiling it on first use
    ///
    /// Defines whose required device feature is missing are forced to 0 in
    /// the generated source (reported once per template and define).
    pub fn get_gfx_shader(&mut self, device: &mut Device, name: &str, defines: &DefineMap) -> Result<Arc<dyn Shader>> {
        let key = self.get_variant_key(name, defines)?;
        if let Some(shader) = self.cache.get(&key) {
            return Ok(shader.clone());
        }

        let template = self.templates.get(name)
            .ok_or_else(|| engine_err!("lumen::ProgramLib", "Unknown program '{}'", name))?;
        let prelude = generate_defines(device.capabilities(), template, defines, &mut self.warned);

        let desc = ShaderDesc {
            id: device.gen_shader_id(),
            name: instance_name(name, defines),
            blocks: template.blocks.clone(),
            samplers: template.samplers.clone(),
            stages: vec![
                ShaderStageDesc { stage: ShaderStage::Vertex, source: format!("{}{}", prelude, template.vert) },
                ShaderStageDesc { stage: ShaderStage::Fragment, source: format!("{}{}", prelude, template.frag) },
            ],
        };
        let shader = device.create_shader(&desc)?;

        self.cache.insert(key, shader.clone());
        Ok(shader)
    }

    fn limit_exceeded(message: String) -> Error {
        engine_error!("lumen::ProgramLib", "{}", message);
        Error::LimitExceeded(message)
    }
}

/// `#define NAME value` lines for every template define, newline terminated
fn generate_defines(
    capabilities: &Capabilities,
    template: &ProgramTemplate,
    defines: &DefineMap,
    warned: &mut FxHashSet<(u32, String)>,
) -> String {
    let mut source = String::new();
    for define in &template.defines {
        let mut value = defines
            .get(&define.info.name)
            .map_or(0, |v| define.clamp(*v));

        if value != 0 {
            if let Some(feature) = template.dependencies.get(&define.info.name) {
                if !capabilities.has_feature(feature) {
                    if warned.insert((template.id, define.info.name.clone())) {
                        engine_warn!("lumen::ProgramLib",
                            "{} not supported on this device, disabled {} in '{}'",
                            feature, define.info.name, template.name);
                    }
                    value = 0;
                }
            }
        }

        source.push_str(&format!("#define {} {}\n", define.info.name, value));
    }
    source
}

/// Template name followed by `|NAME` for each truthy define
fn instance_name(name: &str, defines: &DefineMap) -> String {
    defines
        .iter()
        .filter(|(_, value)| value.is_truthy())
        .fold(name.to_string(), |acc, (define, _)| format!("{}|{}", acc, define))
}

#[cfg(test)]
#[path = "program_lib_tests.rs"]
mod tests;

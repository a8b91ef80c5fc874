//! Unit tests for ProgramLib

use crate::engine::Engine;
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{Capabilities, GraphicsApi, ShaderDesc, ShaderStage, lock_device};
use crate::log::{CaptureLogger, LogSeverity};
use crate::program::*;
use serial_test::serial;
use std::sync::Arc;

fn defines(pairs: &[(&str, MacroValue)]) -> DefineMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn program(name: &str, defines: Vec<DefineInfo>) -> ProgramInfo {
    ProgramInfo {
        name: name.to_string(),
        vert: "void main() { gl_Position = vec4(0.0); }\n".to_string(),
        frag: "void main() { gl_FragColor = vec4(1.0); }\n".to_string(),
        defines,
        ..ProgramInfo::default()
    }
}

fn lib_with(info: ProgramInfo) -> ProgramLib {
    let mut lib = ProgramLib::new(ProgramLibConfig::default()).unwrap();
    lib.define(info).unwrap();
    lib
}

// ============================================================================
// CONFIGURATION TESTS
// ============================================================================

#[test]
fn test_default_config() {
    let config = ProgramLibConfig::default();
    assert_eq!(config.template_id_bits, 8);
    assert_eq!(config.macro_bit_budget, 24);
    assert_eq!(config.precision, "precision highp float;\n");
}

#[test]
fn test_new_rejects_oversized_key_layout() {
    let config = ProgramLibConfig { template_id_bits: 16, macro_bit_budget: 50, ..ProgramLibConfig::default() };
    assert!(matches!(ProgramLib::new(config), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_new_rejects_zero_template_bits() {
    let config = ProgramLibConfig { template_id_bits: 0, ..ProgramLibConfig::default() };
    assert!(matches!(ProgramLib::new(config), Err(Error::InitializationFailed(_))));
}

// ============================================================================
// DEFINE TESTS
// ============================================================================

#[test]
fn test_define_assigns_sequential_ids() {
    let mut lib = ProgramLib::new(ProgramLibConfig::default()).unwrap();
    lib.define(program("a", vec![])).unwrap();
    lib.define(program("b", vec![])).unwrap();
    assert_eq!(lib.get_template("a").unwrap().id, 1);
    assert_eq!(lib.get_template("b").unwrap().id, 2);
}

#[test]
fn test_define_is_idempotent() {
    let mut lib = lib_with(program("a", vec![DefineInfo::boolean("X")]));
    lib.define(program("a", vec![])).unwrap();
    let template = lib.get_template("a").unwrap();
    assert_eq!(template.id, 1);
    assert_eq!(template.defines.len(), 1);
    lib.define(program("b", vec![])).unwrap();
    assert_eq!(lib.get_template("b").unwrap().id, 2);
}

#[test]
fn test_define_prepends_precision() {
    let lib = lib_with(program("a", vec![]));
    let template = lib.get_template("a").unwrap();
    assert!(template.vert.starts_with("precision highp float;\n"));
    assert!(template.frag.starts_with("precision highp float;\n"));
}

#[test]
fn test_define_appends_global_and_local_blocks() {
    let mut info = program("a", vec![]);
    info.blocks.push(ubo_forward_light());
    let lib = lib_with(info);
    let names: Vec<_> = lib.get_template("a").unwrap().blocks.iter().map(|b| b.name.clone()).collect();
    assert_eq!(names, vec![ubo_forward_light().name, ubo_global().name, ubo_local().name]);
}

#[test]
fn test_define_bit_layout() {
    let lib = lib_with(program("t", vec![
        DefineInfo::boolean("FOO"),
        DefineInfo::number("BAR", None),
        DefineInfo::number("BAZ", Some((2, 3))),
        DefineInfo::number("QUX", Some((7, 7))),
    ]));
    let layout: Vec<_> = lib.get_template("t").unwrap().defines.iter().map(|d| (d.offset, d.width)).collect();
    // FOO 1 bit, BAR [0,4] 3 bits, BAZ 2 values 1 bit, QUX single value 1 bit
    assert_eq!(layout, vec![(0, 1), (1, 3), (4, 1), (5, 1)]);
    assert_eq!(lib.get_template("t").unwrap().macro_bits, 6);
}

#[test]
fn test_define_rejects_empty_range() {
    let mut lib = ProgramLib::new(ProgramLibConfig::default()).unwrap();
    let result = lib.define(program("t", vec![DefineInfo::number("N", Some((3, 1)))]));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(!lib.has_program("t"));
}

#[test]
fn test_define_over_macro_budget_fails() {
    let config = ProgramLibConfig { macro_bit_budget: 2, ..ProgramLibConfig::default() };
    let mut lib = ProgramLib::new(config).unwrap();
    let result = lib.define(program("t", vec![
        DefineInfo::boolean("A"),
        DefineInfo::boolean("B"),
        DefineInfo::boolean("C"),
    ]));
    assert!(matches!(result, Err(Error::LimitExceeded(_))));
    assert!(!lib.has_program("t"));
}

#[test]
fn test_define_over_template_ids_fails() {
    let config = ProgramLibConfig { template_id_bits: 1, ..ProgramLibConfig::default() };
    let mut lib = ProgramLib::new(config).unwrap();
    lib.define(program("a", vec![])).unwrap();
    assert!(matches!(lib.define(program("b", vec![])), Err(Error::LimitExceeded(_))));
}

// ============================================================================
// KEY TESTS
// ============================================================================

#[test]
fn test_key_is_deterministic_and_distinguishes_booleans() {
    let lib = lib_with(program("t", vec![DefineInfo::boolean("FOO"), DefineInfo::number("BAR", Some((0, 4)))]));
    let on = defines(&[("FOO", true.into()), ("BAR", 2.into())]);
    let off = defines(&[("FOO", false.into()), ("BAR", 2.into())]);

    let first = lib.get_key("t", &on).unwrap();
    let second = lib.get_key("t", &on).unwrap();
    assert_eq!(first, second);
    assert_ne!(first, lib.get_key("t", &off).unwrap());
}

#[test]
fn test_key_packs_template_id_and_bits() {
    let lib = lib_with(program("t", vec![DefineInfo::boolean("FOO"), DefineInfo::number("BAR", None)]));
    let key = lib.get_key("t", &defines(&[("FOO", true.into()), ("BAR", 2.into())])).unwrap();
    // bits = 1 | (2 << 1) = 0b101
    assert_eq!(key, (0b101 << 8) | 1);
}

#[test]
fn test_single_boolean_keys_differ_in_two_bits() {
    let lib = lib_with(program("t", vec![DefineInfo::boolean("A"), DefineInfo::boolean("B")]));
    let a = lib.get_key("t", &defines(&[("A", true.into()), ("B", false.into())])).unwrap();
    let b = lib.get_key("t", &defines(&[("A", false.into()), ("B", true.into())])).unwrap();
    assert_eq!(a & b & !0xff, 0);
    assert_eq!((a ^ b).count_ones(), 2);
    assert_eq!(a ^ b, (1 << 8) | (1 << 9));
}

#[test]
fn test_key_ignores_undeclared_defines() {
    let lib = lib_with(program("t", vec![DefineInfo::boolean("A")]));
    let plain = lib.get_key("t", &DefineMap::new()).unwrap();
    let extra = lib.get_key("t", &defines(&[("OTHER", true.into())])).unwrap();
    assert_eq!(plain, extra);
    assert_eq!(plain, 1);
}

#[test]
fn test_key_offsets_by_range_minimum() {
    let lib = lib_with(program("t", vec![DefineInfo::number("N", Some((2, 5)))]));
    let key = lib.get_variant_key("t", &defines(&[("N", 4.into())])).unwrap();
    assert_eq!(key.bits, 2);
}

#[test]
fn test_key_encodes_full_i32_range() {
    let config = ProgramLibConfig { template_id_bits: 8, macro_bit_budget: 56, ..ProgramLibConfig::default() };
    let mut lib = ProgramLib::new(config).unwrap();
    lib.define(program("w", vec![DefineInfo::number("N", Some((i32::MIN, i32::MAX)))])).unwrap();
    assert_eq!(lib.get_template("w").unwrap().defines[0].width, 32);

    let five = lib.get_variant_key("w", &defines(&[("N", 5.into())])).unwrap();
    assert_eq!(five.bits, (5i64 - i32::MIN as i64) as u64);
    let top = lib.get_variant_key("w", &defines(&[("N", i32::MAX.into())])).unwrap();
    assert_eq!(top.bits, u32::MAX as u64);
    assert_eq!(lib.get_key("w", &defines(&[("N", i32::MIN.into())])).unwrap(), 1);
}

#[test]
#[serial]
fn test_key_clamps_out_of_range_values() {
    let entries = CaptureLogger::install();
    let lib = lib_with(program("clamped", vec![DefineInfo::number("N", Some((0, 3)))]));

    let high = lib.get_variant_key("clamped", &defines(&[("N", 9.into())])).unwrap();
    let max = lib.get_variant_key("clamped", &defines(&[("N", 3.into())])).unwrap();
    assert_eq!(high, max);
    assert_eq!(CaptureLogger::count(&entries, LogSeverity::Warn, "'clamped': N = 9"), 1);

    Engine::reset_logger();
}

#[test]
fn test_unknown_template_fails() {
    let lib = ProgramLib::new(ProgramLibConfig::default()).unwrap();
    assert!(matches!(lib.get_key("missing", &DefineMap::new()), Err(Error::InvalidResource(_))));
}

// ============================================================================
// SHADER VARIANT TESTS
// ============================================================================

#[test]
fn test_same_key_returns_cached_shader() {
    let (device, calls) = mock_device(GraphicsApi::Modern);
    let mut lib = lib_with(program("t", vec![DefineInfo::boolean("FOO"), DefineInfo::number("BAR", None)]));
    let mut dev = lock_device(&device);

    let a = lib.get_gfx_shader(&mut dev, "t", &defines(&[("FOO", true.into())])).unwrap();
    let b = lib.get_gfx_shader(&mut dev, "t", &defines(&[("FOO", 1.into()), ("BAR", 0.into())])).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(lib.variant_count(), 1);
    assert_eq!(calls_with(&calls, "create_shader").len(), 1);
}

#[test]
fn test_distinct_keys_compile_distinct_shaders() {
    let (device, calls) = mock_device(GraphicsApi::Modern);
    let mut lib = lib_with(program("t", vec![DefineInfo::boolean("FOO")]));
    let mut dev = lock_device(&device);

    let a = lib.get_gfx_shader(&mut dev, "t", &defines(&[("FOO", true.into())])).unwrap();
    let b = lib.get_gfx_shader(&mut dev, "t", &DefineMap::new()).unwrap();

    assert_ne!(a.id(), b.id());
    assert_eq!(lib.variant_count(), 2);
    assert_eq!(calls_with(&calls, "create_shader").len(), 2);
}

#[test]
fn test_variant_name_lists_truthy_defines() {
    let (device, _) = mock_device(GraphicsApi::Modern);
    let mut lib = lib_with(program("std", vec![
        DefineInfo::boolean("USE_NORMAL"),
        DefineInfo::boolean("USE_ALPHA"),
        DefineInfo::number("LIGHTS", None),
    ]));
    let mut dev = lock_device(&device);

    let shader = lib.get_gfx_shader(&mut dev, "std", &defines(&[
        ("USE_NORMAL", true.into()),
        ("USE_ALPHA", false.into()),
        ("LIGHTS", 2.into()),
    ])).unwrap();

    assert_eq!(shader.name(), "std|LIGHTS|USE_NORMAL");
}

/// Mock device plus the descriptors of every shader it compiles
fn recording_device(mock: MockGraphicsDevice) -> (crate::graphics_device::SharedDevice, Arc<std::sync::Mutex<Vec<ShaderDesc>>>) {
    let descs = mock.shader_descs.clone();
    let (device, _) = mock_device_with(mock);
    (device, descs)
}

#[test]
fn test_variant_source_has_define_preamble() {
    let (device, descs) = recording_device(MockGraphicsDevice::new(GraphicsApi::Modern));
    let mut lib = lib_with(program("t", vec![DefineInfo::boolean("FOO"), DefineInfo::number("BAR", None)]));
    let mut dev = lock_device(&device);

    let shader = lib.get_gfx_shader(&mut dev, "t", &defines(&[("BAR", 3.into())])).unwrap();
    assert_eq!(shader.name(), "t|BAR");

    let template = lib.get_template("t").unwrap();
    let desc = descs.lock().unwrap()[0].clone();
    assert_eq!(desc.id, shader.id());
    assert_eq!(desc.stages[0].stage, ShaderStage::Vertex);
    assert_eq!(desc.stages[0].source, format!("#define FOO 0\n#define BAR 3\n{}", template.vert));
    assert_eq!(desc.stages[1].stage, ShaderStage::Fragment);
    assert_eq!(desc.stages[1].source, format!("#define FOO 0\n#define BAR 3\n{}", template.frag));
}

#[test]
fn test_variant_source_uses_clamped_value() {
    let (device, descs) = recording_device(MockGraphicsDevice::new(GraphicsApi::Modern));
    let mut lib = lib_with(program("t", vec![DefineInfo::number("N", Some((0, 2)))]));
    let mut dev = lock_device(&device);

    lib.get_gfx_shader(&mut dev, "t", &defines(&[("N", 7.into())])).unwrap();
    assert!(descs.lock().unwrap()[0].stages[0].source.starts_with("#define N 2\n"));
}

#[test]
#[serial]
fn test_unsupported_feature_forces_define_off_and_warns_once() {
    let entries = CaptureLogger::install();
    let (device, descs) = recording_device(MockGraphicsDevice::new(GraphicsApi::Legacy));
    let mut info = program("deps", vec![DefineInfo::boolean("USE_DERIV"), DefineInfo::boolean("USE_FOG")]);
    info.dependencies.insert("USE_DERIV".to_string(), "OES_standard_derivatives".to_string());
    let mut lib = lib_with(info);
    let mut dev = lock_device(&device);

    lib.get_gfx_shader(&mut dev, "deps", &defines(&[("USE_DERIV", true.into())])).unwrap();
    let source = descs.lock().unwrap()[0].stages[1].source.clone();
    assert!(source.starts_with("#define USE_DERIV 0\n#define USE_FOG 0\n"));

    lib.get_gfx_shader(&mut dev, "deps", &defines(&[("USE_DERIV", true.into()), ("USE_FOG", true.into())])).unwrap();
    assert_eq!(CaptureLogger::count(&entries, LogSeverity::Warn, "disabled USE_DERIV in 'deps'"), 1);

    Engine::reset_logger();
}

#[test]
fn test_supported_feature_keeps_define() {
    let mut mock = MockGraphicsDevice::new(GraphicsApi::Modern);
    mock.capabilities = Capabilities::default().with_feature("OES_standard_derivatives");
    let (device, descs) = recording_device(mock);
    let mut info = program("deps", vec![DefineInfo::boolean("USE_DERIV")]);
    info.dependencies.insert("USE_DERIV".to_string(), "OES_standard_derivatives".to_string());
    let mut lib = lib_with(info);
    let mut dev = lock_device(&device);

    let shader = lib.get_gfx_shader(&mut dev, "deps", &defines(&[("USE_DERIV", true.into())])).unwrap();
    assert_eq!(shader.name(), "deps|USE_DERIV");
    assert!(descs.lock().unwrap()[0].stages[0].source.starts_with("#define USE_DERIV 1\n"));
}

#[test]
fn test_variant_appends_engine_blocks() {
    let (device, descs) = recording_device(MockGraphicsDevice::new(GraphicsApi::Modern));
    let mut lib = lib_with(program("t", vec![]));
    let mut dev = lock_device(&device);
    lib.get_gfx_shader(&mut dev, "t", &DefineMap::new()).unwrap();
    let desc = descs.lock().unwrap()[0].clone();
    assert_eq!(desc.blocks.len(), 2);
    assert_eq!(desc.stages.len(), 2);
}

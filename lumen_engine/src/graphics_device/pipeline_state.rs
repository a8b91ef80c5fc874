/// Pipeline state and render pass traits, fixed-function state descriptors

use std::sync::Arc;
use crate::graphics_device::{Shader, VertexAttribute};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

// ===== RASTERIZER =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Polygon rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Rasterizer fixed-function state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
        }
    }
}

// ===== DEPTH / STENCIL =====

/// Comparison operator for depth and stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementAndClamp,
    DecrementAndClamp,
    Invert,
    IncrementAndWrap,
    DecrementAndWrap,
}

/// Stencil state of one face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilFaceState {
    pub compare_op: CompareOp,
    pub reference: u32,
    pub read_mask: u32,
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub write_mask: u32,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            compare_op: CompareOp::Always,
            reference: 0,
            read_mask: 0xff,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            write_mask: 0xff,
        }
    }
}

/// Depth and stencil testing state
///
/// Depth test and write start disabled; passes opt in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareOp,
    pub stencil_test: bool,
    pub front: StencilFaceState,
    pub back: StencilFaceState,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            depth_func: CompareOp::Less,
            stencil_test: false,
            front: StencilFaceState::default(),
            back: StencilFaceState::default(),
        }
    }
}

// ===== BLEND =====

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturate,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Blend equation of one color target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendTarget {
    pub blend: bool,
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub blend_eq: BlendOp,
    pub blend_src_alpha: BlendFactor,
    pub blend_dst_alpha: BlendFactor,
    pub blend_alpha_eq: BlendOp,
}

impl BlendTarget {
    /// ONE/ONE accumulation used by additive lighting passes
    pub fn additive() -> Self {
        Self {
            blend: true,
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::One,
            ..Self::default()
        }
    }
}

impl Default for BlendTarget {
    fn default() -> Self {
        Self {
            blend: false,
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
            blend_eq: BlendOp::Add,
            blend_src_alpha: BlendFactor::One,
            blend_dst_alpha: BlendFactor::Zero,
            blend_alpha_eq: BlendOp::Add,
        }
    }
}

/// Color blending state
#[derive(Debug, Clone, PartialEq)]
pub struct BlendState {
    pub targets: Vec<BlendTarget>,
    /// Constant blend color, RGBA8 packed
    pub blend_color: u32,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            targets: vec![BlendTarget::default()],
            blend_color: 0xffff_ffff,
        }
    }
}

// ===== OBJECTS =====

/// Render pass (attachment formats, load/store ops) owned by the frame graph
pub trait RenderPass: Send + Sync {
    /// Stable identity used in pipeline state keys
    fn id(&self) -> u64;
}

/// Compiled pipeline state object
pub trait PipelineState: Send + Sync {
    /// Id of the shader this pipeline was built from
    fn shader_id(&self) -> u32;
}

/// Descriptor for creating a pipeline state
#[derive(Clone)]
pub struct PipelineStateDesc {
    pub shader: Arc<dyn Shader>,
    pub render_pass: Arc<dyn RenderPass>,
    pub primitive: PrimitiveTopology,
    pub rasterizer: RasterizerState,
    pub depth_stencil: DepthStencilState,
    pub blend: BlendState,
    /// Vertex layout of the geometry drawn with this pipeline
    pub attributes: Vec<VertexAttribute>,
}

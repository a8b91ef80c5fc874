/// Shader trait and shader descriptors

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Source of one shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDesc {
    pub stage: ShaderStage,
    pub source: String,
}

/// Uniform member type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec4,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Size in bytes of one element
    pub fn size_bytes(&self) -> u32 {
        match self {
            UniformType::Float | UniformType::Int => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 | UniformType::IVec4 => 16,
            UniformType::Mat3 => 36,
            UniformType::Mat4 => 64,
        }
    }
}

/// Member of a uniform block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uniform {
    pub name: String,
    pub ty: UniformType,
    pub count: u32,
}

impl Uniform {
    pub fn new(name: &str, ty: UniformType, count: u32) -> Self {
        Self { name: name.to_string(), ty, count }
    }

    /// Size in bytes (element size * count)
    pub fn size(&self) -> u32 {
        self.ty.size_bytes() * self.count
    }
}

/// Uniform block declared by a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: String,
    /// Binding slot inside its descriptor set
    pub binding: u32,
    pub members: Vec<Uniform>,
}

impl UniformBlock {
    /// Size in bytes (sum of member sizes)
    pub fn size(&self) -> u32 {
        self.members.iter().map(Uniform::size).sum()
    }
}

/// Sampler declared by a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSampler {
    pub name: String,
    pub binding: u32,
    pub count: u32,
}

/// Descriptor for creating a shader program
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// Engine shader id (from `Device::gen_shader_id`)
    pub id: u32,
    /// Instance name, e.g. "standard|USE_NORMAL_MAP"
    pub name: String,
    pub blocks: Vec<UniformBlock>,
    pub samplers: Vec<UniformSampler>,
    pub stages: Vec<ShaderStageDesc>,
}

/// Compiled shader program
pub trait Shader: Send + Sync {
    /// Engine shader id
    fn id(&self) -> u32;

    /// Instance name
    fn name(&self) -> &str;
}

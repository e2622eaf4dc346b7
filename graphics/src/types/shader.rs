//! Shader types and descriptors.

/// Semantic of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexUsage {
    Position,
    Color,
    Normal,
    Tangent,
    Binormal,
    TexCoord0,
    TexCoord1,
}

/// Storage format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    Float,
    Float2,
    Float3,
    Float4,
    UnsignedByte4Norm,
}

impl AttributeFormat {
    /// Size in bytes.
    pub fn size(self) -> u32 {
        match self {
            Self::Float => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::UnsignedByte4Norm => 4,
        }
    }
}

/// One attribute of an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub usage: VertexUsage,
    pub format: AttributeFormat,
}

impl VertexAttribute {
    pub fn new(usage: VertexUsage, format: AttributeFormat) -> Self {
        Self { usage, format }
    }
}

/// Total size of one interleaved vertex.
pub fn vertex_stride(attributes: &[VertexAttribute]) -> u32 {
    attributes.iter().map(|a| a.format.size()).sum()
}

/// Type of a shader constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Float2,
    Float3,
    Float4,
    Float3x3,
    Float4x4,
}

impl UniformKind {
    /// Number of `f32` components.
    pub fn components(self) -> u32 {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
            Self::Float3x3 => 9,
            Self::Float4x4 => 16,
        }
    }

    /// Size in bytes.
    pub fn size(self) -> u32 {
        self.components() * 4
    }
}

/// A named shader constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderUniform {
    pub name: String,
    pub kind: UniformKind,
}

impl ShaderUniform {
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Descriptor for creating a shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDescriptor {
    /// Debug label for the shader.
    pub label: Option<String>,
    pub pixel_bytecode: Vec<u8>,
    pub vertex_bytecode: Vec<u8>,
    pub pixel_entry: String,
    pub vertex_entry: String,
    pub vertex_attributes: Vec<VertexAttribute>,
    pub pixel_uniforms: Vec<ShaderUniform>,
    pub vertex_uniforms: Vec<ShaderUniform>,
}

impl ShaderDescriptor {
    /// Create a descriptor from compiled pixel and vertex byte code.
    pub fn new(pixel_bytecode: impl Into<Vec<u8>>, vertex_bytecode: impl Into<Vec<u8>>) -> Self {
        Self {
            label: None,
            pixel_bytecode: pixel_bytecode.into(),
            vertex_bytecode: vertex_bytecode.into(),
            pixel_entry: "main".to_string(),
            vertex_entry: "main".to_string(),
            vertex_attributes: Vec::new(),
            pixel_uniforms: Vec::new(),
            vertex_uniforms: Vec::new(),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_entry_points(mut self, pixel: impl Into<String>, vertex: impl Into<String>) -> Self {
        self.pixel_entry = pixel.into();
        self.vertex_entry = vertex.into();
        self
    }

    pub fn with_vertex_attributes(mut self, attributes: Vec<VertexAttribute>) -> Self {
        self.vertex_attributes = attributes;
        self
    }

    pub fn with_pixel_uniforms(mut self, uniforms: Vec<ShaderUniform>) -> Self {
        self.pixel_uniforms = uniforms;
        self
    }

    pub fn with_vertex_uniforms(mut self, uniforms: Vec<ShaderUniform>) -> Self {
        self.vertex_uniforms = uniforms;
        self
    }
}

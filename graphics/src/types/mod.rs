//! Common types and descriptors for graphics resources.
//!
//! This module contains usage enums, flags, and descriptor structs
//! used throughout the graphics system.

mod blend;
mod buffer;
mod draw;
mod mesh;
mod sampler;
mod shader;
mod texture;

pub use blend::{BlendDescriptor, BlendFactor, BlendOperation, ColorMask};
pub use buffer::{BufferDescriptor, BufferUsage};
pub use draw::{CullMode, DrawMode, FillMode, Rect};
pub use mesh::MeshBufferDescriptor;
pub use sampler::{AddressMode, MAX_ANISOTROPY, SamplerStateDescriptor, TextureFilter};
pub use shader::{
    AttributeFormat, ShaderDescriptor, ShaderUniform, UniformKind, VertexAttribute, VertexUsage,
    vertex_stride,
};
pub use texture::{MipLevel, TextureData, TextureDescriptor, TextureFlags};

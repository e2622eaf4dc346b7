//! Type conversions between Tessera types and OpenGL enums.

use tessera_core::sampler::{AddressMode, TextureFilter};
use tessera_core::texture::PixelFormat;

use crate::types::{
    AttributeFormat, BlendFactor, BlendOperation, ColorMask, CullMode, DrawMode, FillMode,
};

pub const GL_ZERO: u32 = 0;
pub const GL_ONE: u32 = 1;

pub const GL_POINTS: u32 = 0x0000;
pub const GL_LINES: u32 = 0x0001;
pub const GL_LINE_STRIP: u32 = 0x0003;
pub const GL_TRIANGLES: u32 = 0x0004;
pub const GL_TRIANGLE_STRIP: u32 = 0x0005;

pub const GL_SRC_COLOR: u32 = 0x0300;
pub const GL_ONE_MINUS_SRC_COLOR: u32 = 0x0301;
pub const GL_SRC_ALPHA: u32 = 0x0302;
pub const GL_ONE_MINUS_SRC_ALPHA: u32 = 0x0303;
pub const GL_DST_ALPHA: u32 = 0x0304;
pub const GL_ONE_MINUS_DST_ALPHA: u32 = 0x0305;
pub const GL_DST_COLOR: u32 = 0x0306;
pub const GL_ONE_MINUS_DST_COLOR: u32 = 0x0307;
pub const GL_SRC_ALPHA_SATURATE: u32 = 0x0308;
pub const GL_CONSTANT_COLOR: u32 = 0x8001;
pub const GL_ONE_MINUS_CONSTANT_COLOR: u32 = 0x8002;

pub const GL_FUNC_ADD: u32 = 0x8006;
pub const GL_MIN: u32 = 0x8007;
pub const GL_MAX: u32 = 0x8008;
pub const GL_FUNC_SUBTRACT: u32 = 0x800A;
pub const GL_FUNC_REVERSE_SUBTRACT: u32 = 0x800B;

pub const GL_FRONT: u32 = 0x0404;
pub const GL_BACK: u32 = 0x0405;
pub const GL_LINE: u32 = 0x1B01;
pub const GL_FILL: u32 = 0x1B02;

pub const GL_UNSIGNED_BYTE: u32 = 0x1401;
pub const GL_UNSIGNED_SHORT: u32 = 0x1403;
pub const GL_UNSIGNED_INT: u32 = 0x1405;
pub const GL_FLOAT: u32 = 0x1406;

pub const GL_NEAREST: u32 = 0x2600;
pub const GL_LINEAR: u32 = 0x2601;
pub const GL_NEAREST_MIPMAP_NEAREST: u32 = 0x2700;
pub const GL_LINEAR_MIPMAP_NEAREST: u32 = 0x2701;
pub const GL_LINEAR_MIPMAP_LINEAR: u32 = 0x2703;

pub const GL_REPEAT: u32 = 0x2901;
pub const GL_CLAMP_TO_EDGE: u32 = 0x812F;
pub const GL_MIRRORED_REPEAT: u32 = 0x8370;

pub const GL_ARRAY_BUFFER: u32 = 0x8892;
pub const GL_ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
pub const GL_STATIC_DRAW: u32 = 0x88E4;
pub const GL_DYNAMIC_DRAW: u32 = 0x88E8;

pub const GL_ALPHA8: u32 = 0x803C;
pub const GL_RGBA8: u32 = 0x8058;
pub const GL_RGBA16: u32 = 0x805B;
pub const GL_RGBA32F: u32 = 0x8814;
pub const GL_RGBA16F: u32 = 0x881A;
pub const GL_R8: u32 = 0x8229;
pub const GL_R16: u32 = 0x822A;
pub const GL_RG8: u32 = 0x822B;
pub const GL_R16F: u32 = 0x822D;
pub const GL_R32F: u32 = 0x822E;
pub const GL_R8I: u32 = 0x8231;
pub const GL_R8UI: u32 = 0x8232;
pub const GL_R16I: u32 = 0x8233;
pub const GL_R16UI: u32 = 0x8234;
pub const GL_R32I: u32 = 0x8235;
pub const GL_R32UI: u32 = 0x8236;
pub const GL_RG8I: u32 = 0x8237;
pub const GL_RG8UI: u32 = 0x8238;
pub const GL_DEPTH_COMPONENT32F: u32 = 0x8CAC;
pub const GL_RGBA32UI: u32 = 0x8D70;
pub const GL_RGBA16UI: u32 = 0x8D76;
pub const GL_RGBA8UI: u32 = 0x8D7C;
pub const GL_RGBA32I: u32 = 0x8D82;
pub const GL_RGBA16I: u32 = 0x8D88;
pub const GL_RGBA8I: u32 = 0x8D8E;
pub const GL_R8_SNORM: u32 = 0x8F94;
pub const GL_RG8_SNORM: u32 = 0x8F95;
pub const GL_RGBA8_SNORM: u32 = 0x8F97;
pub const GL_R16_SNORM: u32 = 0x8F98;
pub const GL_RGBA16_SNORM: u32 = 0x8F9B;

/// Bytes per texel of a sized internal format, 0 for unknown formats.
pub fn internal_format_size(internal_format: u32) -> u32 {
    match internal_format {
        GL_RGBA32F | GL_RGBA32UI | GL_RGBA32I => 16,
        GL_RGBA16 | GL_RGBA16_SNORM | GL_RGBA16UI | GL_RGBA16I | GL_RGBA16F => 8,
        GL_RGBA8 | GL_RGBA8_SNORM | GL_RGBA8UI | GL_RGBA8I | GL_R32F | GL_R32UI | GL_R32I
        | GL_DEPTH_COMPONENT32F => 4,
        GL_RG8 | GL_RG8_SNORM | GL_RG8UI | GL_RG8I | GL_R16 | GL_R16_SNORM | GL_R16UI
        | GL_R16I | GL_R16F => 2,
        GL_R8 | GL_R8_SNORM | GL_R8UI | GL_R8I | GL_ALPHA8 => 1,
        _ => 0,
    }
}

/// Convert PixelFormat to a sized internal format. `None` when there is no equivalent.
pub fn convert_pixel_format(format: PixelFormat) -> Option<u32> {
    let internal = match format {
        PixelFormat::Default => return None,
        PixelFormat::A8Unorm => GL_ALPHA8,
        PixelFormat::R8Unorm => GL_R8,
        PixelFormat::R8Snorm => GL_R8_SNORM,
        PixelFormat::R8Uint => GL_R8UI,
        PixelFormat::R8Sint => GL_R8I,
        PixelFormat::R16Unorm => GL_R16,
        PixelFormat::R16Snorm => GL_R16_SNORM,
        PixelFormat::R16Uint => GL_R16UI,
        PixelFormat::R16Sint => GL_R16I,
        PixelFormat::R16Float => GL_R16F,
        PixelFormat::R32Uint => GL_R32UI,
        PixelFormat::R32Sint => GL_R32I,
        PixelFormat::R32Float => GL_R32F,
        PixelFormat::Rg8Unorm => GL_RG8,
        PixelFormat::Rg8Snorm => GL_RG8_SNORM,
        PixelFormat::Rg8Uint => GL_RG8UI,
        PixelFormat::Rg8Sint => GL_RG8I,
        PixelFormat::Rgba8Unorm => GL_RGBA8,
        PixelFormat::Rgba8Snorm => GL_RGBA8_SNORM,
        PixelFormat::Rgba8Uint => GL_RGBA8UI,
        PixelFormat::Rgba8Sint => GL_RGBA8I,
        PixelFormat::Rgba16Unorm => GL_RGBA16,
        PixelFormat::Rgba16Snorm => GL_RGBA16_SNORM,
        PixelFormat::Rgba16Uint => GL_RGBA16UI,
        PixelFormat::Rgba16Sint => GL_RGBA16I,
        PixelFormat::Rgba16Float => GL_RGBA16F,
        PixelFormat::Rgba32Uint => GL_RGBA32UI,
        PixelFormat::Rgba32Sint => GL_RGBA32I,
        PixelFormat::Rgba32Float => GL_RGBA32F,
    };
    Some(internal)
}

/// Element type for an index size in bytes.
pub fn convert_index_type(index_size: u32) -> Option<u32> {
    match index_size {
        2 => Some(GL_UNSIGNED_SHORT),
        4 => Some(GL_UNSIGNED_INT),
        _ => None,
    }
}

/// Component count, component type and normalization of a vertex attribute.
pub fn convert_attribute_format(format: AttributeFormat) -> (u32, u32, bool) {
    match format {
        AttributeFormat::Float => (1, GL_FLOAT, false),
        AttributeFormat::Float2 => (2, GL_FLOAT, false),
        AttributeFormat::Float3 => (3, GL_FLOAT, false),
        AttributeFormat::Float4 => (4, GL_FLOAT, false),
        AttributeFormat::UnsignedByte4Norm => (4, GL_UNSIGNED_BYTE, true),
    }
}

/// Minification and magnification filters for a resolved filter.
pub fn convert_filter(filter: TextureFilter) -> (u32, u32) {
    match filter {
        TextureFilter::Default | TextureFilter::Nearest => (GL_NEAREST_MIPMAP_NEAREST, GL_NEAREST),
        TextureFilter::Linear => (GL_LINEAR, GL_NEAREST),
        TextureFilter::Bilinear => (GL_LINEAR_MIPMAP_NEAREST, GL_LINEAR),
        TextureFilter::Trilinear => (GL_LINEAR_MIPMAP_LINEAR, GL_LINEAR),
    }
}

pub fn convert_address_mode(mode: AddressMode) -> u32 {
    match mode {
        AddressMode::Clamp => GL_CLAMP_TO_EDGE,
        AddressMode::Repeat => GL_REPEAT,
        AddressMode::Mirror => GL_MIRRORED_REPEAT,
    }
}

pub fn convert_blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => GL_ZERO,
        BlendFactor::One => GL_ONE,
        BlendFactor::SrcColor => GL_SRC_COLOR,
        BlendFactor::InvSrcColor => GL_ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => GL_SRC_ALPHA,
        BlendFactor::InvSrcAlpha => GL_ONE_MINUS_SRC_ALPHA,
        BlendFactor::DestAlpha => GL_DST_ALPHA,
        BlendFactor::InvDestAlpha => GL_ONE_MINUS_DST_ALPHA,
        BlendFactor::DestColor => GL_DST_COLOR,
        BlendFactor::InvDestColor => GL_ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlphaSat => GL_SRC_ALPHA_SATURATE,
        BlendFactor::BlendFactor => GL_CONSTANT_COLOR,
        BlendFactor::InvBlendFactor => GL_ONE_MINUS_CONSTANT_COLOR,
    }
}

pub fn convert_blend_operation(operation: BlendOperation) -> u32 {
    match operation {
        BlendOperation::Add => GL_FUNC_ADD,
        BlendOperation::Subtract => GL_FUNC_SUBTRACT,
        BlendOperation::RevSubtract => GL_FUNC_REVERSE_SUBTRACT,
        BlendOperation::Min => GL_MIN,
        BlendOperation::Max => GL_MAX,
    }
}

/// `glColorMask` arguments.
pub fn convert_color_mask(mask: ColorMask) -> [bool; 4] {
    [
        mask.contains(ColorMask::RED),
        mask.contains(ColorMask::GREEN),
        mask.contains(ColorMask::BLUE),
        mask.contains(ColorMask::ALPHA),
    ]
}

pub fn convert_draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::PointList => GL_POINTS,
        DrawMode::LineList => GL_LINES,
        DrawMode::LineStrip => GL_LINE_STRIP,
        DrawMode::TriangleList => GL_TRIANGLES,
        DrawMode::TriangleStrip => GL_TRIANGLE_STRIP,
    }
}

/// Face passed to `glCullFace`, `None` when culling is disabled.
pub fn convert_cull_mode(mode: CullMode) -> Option<u32> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(GL_FRONT),
        CullMode::Back => Some(GL_BACK),
    }
}

pub fn convert_fill_mode(mode: FillMode) -> u32 {
    match mode {
        FillMode::Solid => GL_FILL,
        FillMode::Wireframe => GL_LINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_maps() {
        for format in PixelFormat::ALL {
            let internal = convert_pixel_format(format).unwrap();
            assert_eq!(internal_format_size(internal), format.pixel_size(), "{format:?}");
        }
        assert_eq!(convert_pixel_format(PixelFormat::Default), None);
    }

    #[test]
    fn test_filters() {
        assert_eq!(convert_filter(TextureFilter::Nearest), (GL_NEAREST_MIPMAP_NEAREST, GL_NEAREST));
        assert_eq!(convert_filter(TextureFilter::Trilinear), (GL_LINEAR_MIPMAP_LINEAR, GL_LINEAR));
    }

    #[test]
    fn test_cull_mode() {
        assert_eq!(convert_cull_mode(CullMode::None), None);
        assert_eq!(convert_cull_mode(CullMode::Back), Some(GL_BACK));
    }

    #[test]
    fn test_color_mask() {
        assert_eq!(
            convert_color_mask(ColorMask::RED | ColorMask::ALPHA),
            [true, false, false, true]
        );
    }
}

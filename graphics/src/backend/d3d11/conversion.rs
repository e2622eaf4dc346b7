//! Type conversions between Tessera types and Direct3D 11 types.

use tessera_core::sampler::{AddressMode, TextureFilter};
use tessera_core::texture::PixelFormat;

use crate::types::{
    AttributeFormat, BlendFactor, BlendOperation, ColorMask, CullMode, DrawMode, FillMode,
    VertexUsage,
};

/// `DXGI_FORMAT` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DxgiFormat(pub u32);

impl DxgiFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R32G32B32A32_FLOAT: Self = Self(2);
    pub const R32G32B32A32_UINT: Self = Self(3);
    pub const R32G32B32A32_SINT: Self = Self(4);
    pub const R32G32B32_FLOAT: Self = Self(6);
    pub const R16G16B16A16_FLOAT: Self = Self(10);
    pub const R16G16B16A16_UNORM: Self = Self(11);
    pub const R16G16B16A16_UINT: Self = Self(12);
    pub const R16G16B16A16_SNORM: Self = Self(13);
    pub const R16G16B16A16_SINT: Self = Self(14);
    pub const R32G32_FLOAT: Self = Self(16);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const R8G8B8A8_UINT: Self = Self(30);
    pub const R8G8B8A8_SNORM: Self = Self(31);
    pub const R8G8B8A8_SINT: Self = Self(32);
    pub const D32_FLOAT: Self = Self(40);
    pub const R32_FLOAT: Self = Self(41);
    pub const R32_UINT: Self = Self(42);
    pub const R32_SINT: Self = Self(43);
    pub const R8G8_UNORM: Self = Self(49);
    pub const R8G8_UINT: Self = Self(50);
    pub const R8G8_SNORM: Self = Self(51);
    pub const R8G8_SINT: Self = Self(52);
    pub const R16_FLOAT: Self = Self(54);
    pub const R16_UNORM: Self = Self(56);
    pub const R16_UINT: Self = Self(57);
    pub const R16_SNORM: Self = Self(58);
    pub const R16_SINT: Self = Self(59);
    pub const R8_UNORM: Self = Self(61);
    pub const R8_UINT: Self = Self(62);
    pub const R8_SNORM: Self = Self(63);
    pub const R8_SINT: Self = Self(64);
    pub const A8_UNORM: Self = Self(65);
    pub const B8G8R8A8_UNORM: Self = Self(87);

    /// Bytes per texel, 0 for formats the device does not store.
    pub fn pixel_size(self) -> u32 {
        match self {
            Self::R32G32B32A32_FLOAT | Self::R32G32B32A32_UINT | Self::R32G32B32A32_SINT => 16,
            Self::R32G32B32_FLOAT => 12,
            Self::R16G16B16A16_FLOAT
            | Self::R16G16B16A16_UNORM
            | Self::R16G16B16A16_UINT
            | Self::R16G16B16A16_SNORM
            | Self::R16G16B16A16_SINT
            | Self::R32G32_FLOAT => 8,
            Self::R8G8B8A8_UNORM
            | Self::R8G8B8A8_UINT
            | Self::R8G8B8A8_SNORM
            | Self::R8G8B8A8_SINT
            | Self::B8G8R8A8_UNORM
            | Self::D32_FLOAT
            | Self::R32_FLOAT
            | Self::R32_UINT
            | Self::R32_SINT => 4,
            Self::R8G8_UNORM
            | Self::R8G8_UINT
            | Self::R8G8_SNORM
            | Self::R8G8_SINT
            | Self::R16_FLOAT
            | Self::R16_UNORM
            | Self::R16_UINT
            | Self::R16_SNORM
            | Self::R16_SINT => 2,
            Self::R8_UNORM | Self::R8_UINT | Self::R8_SNORM | Self::R8_SINT | Self::A8_UNORM => 1,
            _ => 0,
        }
    }
}

/// Convert PixelFormat to DXGI format. `None` when there is no equivalent.
pub fn convert_pixel_format(format: PixelFormat) -> Option<DxgiFormat> {
    let dxgi = match format {
        PixelFormat::Default => return None,
        PixelFormat::A8Unorm => DxgiFormat::A8_UNORM,
        PixelFormat::R8Unorm => DxgiFormat::R8_UNORM,
        PixelFormat::R8Snorm => DxgiFormat::R8_SNORM,
        PixelFormat::R8Uint => DxgiFormat::R8_UINT,
        PixelFormat::R8Sint => DxgiFormat::R8_SINT,
        PixelFormat::R16Unorm => DxgiFormat::R16_UNORM,
        PixelFormat::R16Snorm => DxgiFormat::R16_SNORM,
        PixelFormat::R16Uint => DxgiFormat::R16_UINT,
        PixelFormat::R16Sint => DxgiFormat::R16_SINT,
        PixelFormat::R16Float => DxgiFormat::R16_FLOAT,
        PixelFormat::R32Uint => DxgiFormat::R32_UINT,
        PixelFormat::R32Sint => DxgiFormat::R32_SINT,
        PixelFormat::R32Float => DxgiFormat::R32_FLOAT,
        PixelFormat::Rg8Unorm => DxgiFormat::R8G8_UNORM,
        PixelFormat::Rg8Snorm => DxgiFormat::R8G8_SNORM,
        PixelFormat::Rg8Uint => DxgiFormat::R8G8_UINT,
        PixelFormat::Rg8Sint => DxgiFormat::R8G8_SINT,
        PixelFormat::Rgba8Unorm => DxgiFormat::R8G8B8A8_UNORM,
        PixelFormat::Rgba8Snorm => DxgiFormat::R8G8B8A8_SNORM,
        PixelFormat::Rgba8Uint => DxgiFormat::R8G8B8A8_UINT,
        PixelFormat::Rgba8Sint => DxgiFormat::R8G8B8A8_SINT,
        PixelFormat::Rgba16Unorm => DxgiFormat::R16G16B16A16_UNORM,
        PixelFormat::Rgba16Snorm => DxgiFormat::R16G16B16A16_SNORM,
        PixelFormat::Rgba16Uint => DxgiFormat::R16G16B16A16_UINT,
        PixelFormat::Rgba16Sint => DxgiFormat::R16G16B16A16_SINT,
        PixelFormat::Rgba16Float => DxgiFormat::R16G16B16A16_FLOAT,
        PixelFormat::Rgba32Uint => DxgiFormat::R32G32B32A32_UINT,
        PixelFormat::Rgba32Sint => DxgiFormat::R32G32B32A32_SINT,
        PixelFormat::Rgba32Float => DxgiFormat::R32G32B32A32_FLOAT,
    };
    Some(dxgi)
}

/// Index buffer format for an index size in bytes.
pub fn convert_index_format(index_size: u32) -> Option<DxgiFormat> {
    match index_size {
        2 => Some(DxgiFormat::R16_UINT),
        4 => Some(DxgiFormat::R32_UINT),
        _ => None,
    }
}

pub fn convert_attribute_format(format: AttributeFormat) -> DxgiFormat {
    match format {
        AttributeFormat::Float => DxgiFormat::R32_FLOAT,
        AttributeFormat::Float2 => DxgiFormat::R32G32_FLOAT,
        AttributeFormat::Float3 => DxgiFormat::R32G32B32_FLOAT,
        AttributeFormat::Float4 => DxgiFormat::R32G32B32A32_FLOAT,
        AttributeFormat::UnsignedByte4Norm => DxgiFormat::R8G8B8A8_UNORM,
    }
}

/// HLSL semantic name and index for a vertex attribute.
pub fn convert_vertex_usage(usage: VertexUsage) -> (&'static str, u32) {
    match usage {
        VertexUsage::Position => ("POSITION", 0),
        VertexUsage::Color => ("COLOR", 0),
        VertexUsage::Normal => ("NORMAL", 0),
        VertexUsage::Tangent => ("TANGENT", 0),
        VertexUsage::Binormal => ("BINORMAL", 0),
        VertexUsage::TexCoord0 => ("TEXCOORD", 0),
        VertexUsage::TexCoord1 => ("TEXCOORD", 1),
    }
}

pub const FILTER_MIN_MAG_MIP_POINT: u32 = 0x00;
pub const FILTER_MIN_LINEAR_MAG_MIP_POINT: u32 = 0x10;
pub const FILTER_MIN_MAG_LINEAR_MIP_POINT: u32 = 0x14;
pub const FILTER_MIN_MAG_MIP_LINEAR: u32 = 0x15;
pub const FILTER_ANISOTROPIC: u32 = 0x55;

/// Convert a resolved filter to `D3D11_FILTER`.
///
/// Anisotropy above 1 selects anisotropic filtering regardless of filter.
pub fn convert_filter(filter: TextureFilter, max_anisotropy: u32) -> u32 {
    if max_anisotropy > 1 {
        return FILTER_ANISOTROPIC;
    }
    match filter {
        TextureFilter::Default | TextureFilter::Nearest => FILTER_MIN_MAG_MIP_POINT,
        TextureFilter::Linear => FILTER_MIN_LINEAR_MAG_MIP_POINT,
        TextureFilter::Bilinear => FILTER_MIN_MAG_LINEAR_MIP_POINT,
        TextureFilter::Trilinear => FILTER_MIN_MAG_MIP_LINEAR,
    }
}

/// Convert AddressMode to `D3D11_TEXTURE_ADDRESS_MODE`.
pub fn convert_address_mode(mode: AddressMode) -> u32 {
    match mode {
        AddressMode::Repeat => 1,
        AddressMode::Mirror => 2,
        AddressMode::Clamp => 3,
    }
}

/// Convert BlendFactor to `D3D11_BLEND`.
pub fn convert_blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => 1,
        BlendFactor::One => 2,
        BlendFactor::SrcColor => 3,
        BlendFactor::InvSrcColor => 4,
        BlendFactor::SrcAlpha => 5,
        BlendFactor::InvSrcAlpha => 6,
        BlendFactor::DestAlpha => 7,
        BlendFactor::InvDestAlpha => 8,
        BlendFactor::DestColor => 9,
        BlendFactor::InvDestColor => 10,
        BlendFactor::SrcAlphaSat => 11,
        BlendFactor::BlendFactor => 14,
        BlendFactor::InvBlendFactor => 15,
    }
}

/// Convert BlendOperation to `D3D11_BLEND_OP`.
pub fn convert_blend_operation(operation: BlendOperation) -> u32 {
    match operation {
        BlendOperation::Add => 1,
        BlendOperation::Subtract => 2,
        BlendOperation::RevSubtract => 3,
        BlendOperation::Min => 4,
        BlendOperation::Max => 5,
    }
}

/// Convert ColorMask to `D3D11_COLOR_WRITE_ENABLE` bits.
pub fn convert_color_mask(mask: ColorMask) -> u8 {
    let mut result = 0;
    if mask.contains(ColorMask::RED) {
        result |= 0x1;
    }
    if mask.contains(ColorMask::GREEN) {
        result |= 0x2;
    }
    if mask.contains(ColorMask::BLUE) {
        result |= 0x4;
    }
    if mask.contains(ColorMask::ALPHA) {
        result |= 0x8;
    }
    result
}

/// Convert DrawMode to `D3D11_PRIMITIVE_TOPOLOGY`.
pub fn convert_draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::PointList => 1,
        DrawMode::LineList => 2,
        DrawMode::LineStrip => 3,
        DrawMode::TriangleList => 4,
        DrawMode::TriangleStrip => 5,
    }
}

/// Convert CullMode to `D3D11_CULL_MODE`.
pub fn convert_cull_mode(mode: CullMode) -> u32 {
    match mode {
        CullMode::None => 1,
        CullMode::Front => 2,
        CullMode::Back => 3,
    }
}

/// Convert FillMode to `D3D11_FILL_MODE`.
pub fn convert_fill_mode(mode: FillMode) -> u32 {
    match mode {
        FillMode::Wireframe => 2,
        FillMode::Solid => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_maps() {
        for format in PixelFormat::ALL {
            let dxgi = convert_pixel_format(format).unwrap();
            assert_eq!(dxgi.pixel_size(), format.pixel_size(), "{format:?}");
        }
        assert_eq!(convert_pixel_format(PixelFormat::Default), None);
    }

    #[test]
    fn test_filters() {
        assert_eq!(convert_filter(TextureFilter::Nearest, 1), FILTER_MIN_MAG_MIP_POINT);
        assert_eq!(convert_filter(TextureFilter::Trilinear, 1), FILTER_MIN_MAG_MIP_LINEAR);
        assert_eq!(convert_filter(TextureFilter::Nearest, 4), FILTER_ANISOTROPIC);
    }

    #[test]
    fn test_color_mask() {
        assert_eq!(convert_color_mask(ColorMask::ALL), 0xF);
        assert_eq!(convert_color_mask(ColorMask::RED | ColorMask::ALPHA), 0x9);
    }

    #[test]
    fn test_index_format() {
        assert_eq!(convert_index_format(2), Some(DxgiFormat::R16_UINT));
        assert_eq!(convert_index_format(4), Some(DxgiFormat::R32_UINT));
        assert_eq!(convert_index_format(3), None);
    }
}

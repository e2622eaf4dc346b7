//! Texture types and descriptors.

use bitflags::bitflags;
use tessera_core::color::Color;
use tessera_core::math::Size2;
use tessera_core::sampler::{AddressMode, TextureFilter};
use tessera_core::texture::PixelFormat;

bitflags! {
    /// Creation flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureFlags: u32 {
        /// Texture can be rendered into.
        const RENDER_TARGET = 1 << 0;
        /// Contents are updated after creation.
        const DYNAMIC = 1 << 1;
        /// Generate a mip chain from the top level.
        const MIPMAPS = 1 << 2;
        /// Render target carries a depth attachment.
        const DEPTH_BUFFER = 1 << 3;
    }
}

/// One mip level of texel data as delivered by an asset loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub pitch: u32,
    pub data: Vec<u8>,
}

impl MipLevel {
    pub fn new(width: u32, height: u32, pitch: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pitch,
            data,
        }
    }

    /// A zero-filled, tightly packed level.
    pub fn zeroed(width: u32, height: u32, pixel_size: u32) -> Self {
        let pitch = width * pixel_size;
        Self::new(width, height, pitch, vec![0; pitch as usize * height as usize])
    }

    /// A level with dimensions but no CPU copy, used for render targets.
    pub fn empty(width: u32, height: u32, pixel_size: u32) -> Self {
        Self::new(width, height, width * pixel_size, Vec::new())
    }

    /// Minimum byte length needed for these dimensions and pitch.
    pub fn required_len(width: u32, height: u32, pitch: u32, pixel_size: u32) -> usize {
        if height == 0 || width == 0 {
            return 0;
        }
        pitch as usize * (height as usize - 1) + width as usize * pixel_size as usize
    }

    /// Bytes of one tightly packed row.
    pub fn row_bytes(&self, pixel_size: u32) -> u32 {
        self.width * pixel_size
    }
}

/// Where a texture's initial contents come from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TextureData {
    /// Zero-filled levels, or no CPU copy for render targets.
    #[default]
    None,
    /// Tightly packed top level.
    Bytes(Vec<u8>),
    /// Explicit levels with their own pitch.
    Levels(Vec<MipLevel>),
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Size of the top level.
    pub size: Size2,
    pub format: PixelFormat,
    pub flags: TextureFlags,
    /// Mip levels to keep when generating a chain. 0 means down to 1x1.
    pub mip_levels: u32,
    pub sample_count: u32,
    pub data: TextureData,
    pub filter: TextureFilter,
    pub address_x: AddressMode,
    pub address_y: AddressMode,
    /// 0 uses the device default.
    pub max_anisotropy: u32,
    pub clear_color: Color,
    pub clear_color_buffer: bool,
    pub clear_depth_buffer: bool,
}

impl TextureDescriptor {
    /// Create a 2D texture descriptor without initial data.
    pub fn new(size: Size2, format: PixelFormat) -> Self {
        Self {
            label: None,
            size,
            format,
            flags: TextureFlags::empty(),
            mip_levels: 0,
            sample_count: 1,
            data: TextureData::None,
            filter: TextureFilter::Default,
            address_x: AddressMode::Clamp,
            address_y: AddressMode::Clamp,
            max_anisotropy: 0,
            clear_color: Color::BLACK,
            clear_color_buffer: true,
            clear_depth_buffer: false,
        }
    }

    /// Create a render target descriptor.
    pub fn render_target(size: Size2, format: PixelFormat) -> Self {
        Self::new(size, format).with_flags(TextureFlags::RENDER_TARGET)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_flags(mut self, flags: TextureFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Set tightly packed contents for the top level.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = TextureData::Bytes(data.into());
        self
    }

    /// Set explicit mip levels.
    pub fn with_levels(mut self, levels: Vec<MipLevel>) -> Self {
        self.data = TextureData::Levels(levels);
        self
    }

    pub fn with_filter(mut self, filter: TextureFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the address mode for both axes.
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_x = mode;
        self.address_y = mode;
        self
    }

    pub fn with_max_anisotropy(mut self, max_anisotropy: u32) -> Self {
        self.max_anisotropy = max_anisotropy;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_len() {
        assert_eq!(MipLevel::required_len(2, 2, 8, 4), 16);
        assert_eq!(MipLevel::required_len(2, 2, 12, 4), 20);
        assert_eq!(MipLevel::required_len(0, 2, 12, 4), 0);
    }

    #[test]
    fn test_zeroed_level() {
        let level = MipLevel::zeroed(4, 2, 4);
        assert_eq!(level.pitch, 16);
        assert_eq!(level.data.len(), 32);
        assert!(level.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_render_target_descriptor() {
        let desc = TextureDescriptor::render_target(Size2::new(64.0, 64.0), PixelFormat::Rgba8Unorm)
            .with_label("offscreen");
        assert!(desc.flags.contains(TextureFlags::RENDER_TARGET));
        assert_eq!(desc.sample_count, 1);
        assert_eq!(desc.data, TextureData::None);
    }
}

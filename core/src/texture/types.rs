//! Pixel format definitions.

/// Storage type of a single texel channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    Unorm8,
    Snorm8,
    Uint8,
    Sint8,
    Unorm16,
    Snorm16,
    Uint16,
    Sint16,
    Float16,
    Uint32,
    Sint32,
    Float32,
}

impl ChannelType {
    /// Size of one channel in bytes.
    pub fn size(self) -> u32 {
        match self {
            Self::Unorm8 | Self::Snorm8 | Self::Uint8 | Self::Sint8 => 1,
            Self::Unorm16 | Self::Snorm16 | Self::Uint16 | Self::Sint16 | Self::Float16 => 2,
            Self::Uint32 | Self::Sint32 | Self::Float32 => 4,
        }
    }
}

/// Texel layout of a texture.
///
/// `Default` is a placeholder for "not specified yet"; it has no size and no
/// backend maps it to a native format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    #[default]
    Default,
    A8Unorm,
    R8Unorm,
    R8Snorm,
    R8Uint,
    R8Sint,
    R16Unorm,
    R16Snorm,
    R16Uint,
    R16Sint,
    R16Float,
    R32Uint,
    R32Sint,
    R32Float,
    Rg8Unorm,
    Rg8Snorm,
    Rg8Uint,
    Rg8Sint,
    Rgba8Unorm,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Rgba16Unorm,
    Rgba16Snorm,
    Rgba16Uint,
    Rgba16Sint,
    Rgba16Float,
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Float,
}

impl PixelFormat {
    /// Every format except `Default`.
    pub const ALL: [PixelFormat; 29] = [
        Self::A8Unorm,
        Self::R8Unorm,
        Self::R8Snorm,
        Self::R8Uint,
        Self::R8Sint,
        Self::R16Unorm,
        Self::R16Snorm,
        Self::R16Uint,
        Self::R16Sint,
        Self::R16Float,
        Self::R32Uint,
        Self::R32Sint,
        Self::R32Float,
        Self::Rg8Unorm,
        Self::Rg8Snorm,
        Self::Rg8Uint,
        Self::Rg8Sint,
        Self::Rgba8Unorm,
        Self::Rgba8Snorm,
        Self::Rgba8Uint,
        Self::Rgba8Sint,
        Self::Rgba16Unorm,
        Self::Rgba16Snorm,
        Self::Rgba16Uint,
        Self::Rgba16Sint,
        Self::Rgba16Float,
        Self::Rgba32Uint,
        Self::Rgba32Sint,
        Self::Rgba32Float,
    ];

    /// Channel storage type, `None` for `Default`.
    pub fn channel_type(self) -> Option<ChannelType> {
        use ChannelType as C;
        let ty = match self {
            Self::Default => return None,
            Self::A8Unorm | Self::R8Unorm | Self::Rg8Unorm | Self::Rgba8Unorm => C::Unorm8,
            Self::R8Snorm | Self::Rg8Snorm | Self::Rgba8Snorm => C::Snorm8,
            Self::R8Uint | Self::Rg8Uint | Self::Rgba8Uint => C::Uint8,
            Self::R8Sint | Self::Rg8Sint | Self::Rgba8Sint => C::Sint8,
            Self::R16Unorm | Self::Rgba16Unorm => C::Unorm16,
            Self::R16Snorm | Self::Rgba16Snorm => C::Snorm16,
            Self::R16Uint | Self::Rgba16Uint => C::Uint16,
            Self::R16Sint | Self::Rgba16Sint => C::Sint16,
            Self::R16Float | Self::Rgba16Float => C::Float16,
            Self::R32Uint | Self::Rgba32Uint => C::Uint32,
            Self::R32Sint | Self::Rgba32Sint => C::Sint32,
            Self::R32Float | Self::Rgba32Float => C::Float32,
        };
        Some(ty)
    }

    /// Number of channels per texel.
    pub fn channel_count(self) -> u32 {
        match self {
            Self::Default => 0,
            Self::A8Unorm
            | Self::R8Unorm
            | Self::R8Snorm
            | Self::R8Uint
            | Self::R8Sint
            | Self::R16Unorm
            | Self::R16Snorm
            | Self::R16Uint
            | Self::R16Sint
            | Self::R16Float
            | Self::R32Uint
            | Self::R32Sint
            | Self::R32Float => 1,
            Self::Rg8Unorm | Self::Rg8Snorm | Self::Rg8Uint | Self::Rg8Sint => 2,
            _ => 4,
        }
    }

    /// Size of one texel in bytes. Zero for `Default`.
    pub fn pixel_size(self) -> u32 {
        self.channel_type()
            .map_or(0, |ty| ty.size() * self.channel_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_sizes() {
        assert_eq!(PixelFormat::Default.pixel_size(), 0);
        assert_eq!(PixelFormat::A8Unorm.pixel_size(), 1);
        assert_eq!(PixelFormat::Rg8Sint.pixel_size(), 2);
        assert_eq!(PixelFormat::R16Float.pixel_size(), 2);
        assert_eq!(PixelFormat::Rgba8Unorm.pixel_size(), 4);
        assert_eq!(PixelFormat::R32Float.pixel_size(), 4);
        assert_eq!(PixelFormat::Rgba16Uint.pixel_size(), 8);
        assert_eq!(PixelFormat::Rgba32Float.pixel_size(), 16);
    }

    #[test]
    fn test_all_formats_have_channels() {
        for format in PixelFormat::ALL {
            assert!(format.channel_type().is_some(), "{format:?}");
            assert!(format.pixel_size() > 0, "{format:?}");
        }
    }
}

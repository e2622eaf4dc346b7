//! Filter and address mode definitions.

/// Texture filtering mode.
///
/// `Default` defers to the device-wide filter configured at device creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TextureFilter {
    /// Use the device default.
    #[default]
    Default,
    /// Nearest neighbor filtering.
    Nearest,
    /// Linear filtering.
    Linear,
    /// Linear within a level, nearest between mip levels.
    Bilinear,
    /// Linear within and between mip levels.
    Trilinear,
}

/// Texture address mode (wrapping behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AddressMode {
    /// Clamp to edge.
    #[default]
    Clamp,
    /// Repeat.
    Repeat,
    /// Mirrored repeat.
    Mirror,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(TextureFilter::default(), TextureFilter::Default);
        assert_eq!(AddressMode::default(), AddressMode::Clamp);
    }

    #[test]
    fn test_ordering() {
        assert!(TextureFilter::Default < TextureFilter::Nearest);
        assert!(AddressMode::Clamp < AddressMode::Mirror);
    }
}

//! Sampler state descriptor.

// Re-export CPU-side types from core.
pub use tessera_core::sampler::{AddressMode, TextureFilter};

/// Highest anisotropy either backend supports.
pub const MAX_ANISOTROPY: u32 = 16;

/// Key of the device sampler cache.
///
/// Ordered field by field, so equal descriptors always resolve to the same
/// native sampler object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SamplerStateDescriptor {
    pub filter: TextureFilter,
    pub address_x: AddressMode,
    pub address_y: AddressMode,
    pub max_anisotropy: u32,
}

impl SamplerStateDescriptor {
    pub fn new(
        filter: TextureFilter,
        address_x: AddressMode,
        address_y: AddressMode,
        max_anisotropy: u32,
    ) -> Self {
        Self {
            filter,
            address_x,
            address_y,
            max_anisotropy,
        }
    }

    /// Replace unresolved fields with device defaults and clamp anisotropy
    /// to `1..=MAX_ANISOTROPY`.
    pub fn resolve(self, default_filter: TextureFilter, default_max_anisotropy: u32) -> Self {
        Self {
            filter: match self.filter {
                TextureFilter::Default => default_filter,
                filter => filter,
            },
            max_anisotropy: match self.max_anisotropy {
                0 => default_max_anisotropy,
                anisotropy => anisotropy,
            }
            .clamp(1, MAX_ANISOTROPY),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let desc = SamplerStateDescriptor::default().resolve(TextureFilter::Linear, 4);
        assert_eq!(desc.filter, TextureFilter::Linear);
        assert_eq!(desc.max_anisotropy, 4);

        let explicit = SamplerStateDescriptor::new(
            TextureFilter::Nearest,
            AddressMode::Repeat,
            AddressMode::Mirror,
            2,
        );
        assert_eq!(explicit.resolve(TextureFilter::Linear, 4), explicit);
    }

    #[test]
    fn test_resolve_clamps_anisotropy() {
        let high = SamplerStateDescriptor {
            max_anisotropy: 64,
            ..SamplerStateDescriptor::default()
        };
        let max = SamplerStateDescriptor {
            max_anisotropy: MAX_ANISOTROPY,
            ..SamplerStateDescriptor::default()
        };
        assert_eq!(
            high.resolve(TextureFilter::Linear, 1),
            max.resolve(TextureFilter::Linear, 1)
        );
        assert_eq!(
            SamplerStateDescriptor::default()
                .resolve(TextureFilter::Linear, 32)
                .max_anisotropy,
            MAX_ANISOTROPY
        );
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = SamplerStateDescriptor::new(TextureFilter::Nearest, AddressMode::Repeat, AddressMode::Clamp, 16);
        let b = SamplerStateDescriptor::new(TextureFilter::Linear, AddressMode::Clamp, AddressMode::Clamp, 1);
        assert!(a < b);
    }
}

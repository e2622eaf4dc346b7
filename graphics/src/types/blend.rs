//! Blend state types and descriptors.

use bitflags::bitflags;

/// Source or destination factor of the blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
    BlendFactor,
    InvBlendFactor,
}

/// How source and destination terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

bitflags! {
    /// Color channels written by a draw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Descriptor for creating a blend state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlendDescriptor {
    /// Debug label for the blend state.
    pub label: Option<String>,
    pub enabled: bool,
    pub color_src: BlendFactor,
    pub color_dst: BlendFactor,
    pub color_op: BlendOperation,
    pub alpha_src: BlendFactor,
    pub alpha_dst: BlendFactor,
    pub alpha_op: BlendOperation,
    pub color_mask: ColorMask,
}

impl Default for BlendDescriptor {
    fn default() -> Self {
        Self::opaque()
    }
}

impl BlendDescriptor {
    /// Blending disabled, all channels written.
    pub fn opaque() -> Self {
        Self {
            label: None,
            enabled: false,
            color_src: BlendFactor::One,
            color_dst: BlendFactor::Zero,
            color_op: BlendOperation::Add,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::Zero,
            alpha_op: BlendOperation::Add,
            color_mask: ColorMask::ALL,
        }
    }

    /// Classic `src * a + dst * (1 - a)` blending.
    pub fn alpha_blend() -> Self {
        Self {
            enabled: true,
            color_src: BlendFactor::SrcAlpha,
            color_dst: BlendFactor::InvSrcAlpha,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::One,
            ..Self::opaque()
        }
    }

    /// `src + dst` blending.
    pub fn additive() -> Self {
        Self {
            enabled: true,
            color_src: BlendFactor::One,
            color_dst: BlendFactor::One,
            alpha_src: BlendFactor::One,
            alpha_dst: BlendFactor::One,
            ..Self::opaque()
        }
    }

    /// Writes no color channels.
    pub fn no_color() -> Self {
        Self {
            color_mask: ColorMask::empty(),
            ..Self::opaque()
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_color_mask(mut self, mask: ColorMask) -> Self {
        self.color_mask = mask;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(!BlendDescriptor::opaque().enabled);
        let alpha = BlendDescriptor::alpha_blend();
        assert!(alpha.enabled);
        assert_eq!(alpha.color_dst, BlendFactor::InvSrcAlpha);
        assert_eq!(alpha.color_mask, ColorMask::ALL);
        assert!(BlendDescriptor::no_color().color_mask.is_empty());
    }
}

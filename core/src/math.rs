//! Size types used for surfaces and textures.

/// A two dimensional size in pixels.
///
/// Stored as `f32` because surface sizes arrive from the platform layer in
/// floating point; [`Size2::to_extent`] converts to integer texel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size2 {
    pub width: f32,
    pub height: f32,
}

impl Size2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether both components are finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }

    /// Whether either component is zero.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Integer dimensions, truncating fractional parts.
    ///
    /// Returns `None` when the size is not [valid](Size2::is_valid) or does
    /// not fit in `u32`.
    pub fn to_extent(&self) -> Option<(u32, u32)> {
        if !self.is_valid() || self.width > u32::MAX as f32 || self.height > u32::MAX as f32 {
            return None;
        }
        Some((self.width as u32, self.height as u32))
    }
}

impl From<(u32, u32)> for Size2 {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f32, height as f32)
    }
}

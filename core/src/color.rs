//! 8-bit RGBA color.

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const RED: Self = Self::new(255, 0, 0, 255);
    pub const GREEN: Self = Self::new(0, 255, 0, 255);
    pub const BLUE: Self = Self::new(0, 0, 255, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Create a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from a packed `0xRRGGBBAA` value.
    pub const fn from_rgba(value: u32) -> Self {
        Self {
            r: (value >> 24) as u8,
            g: (value >> 16) as u8,
            b: (value >> 8) as u8,
            a: value as u8,
        }
    }

    pub fn norm_r(&self) -> f32 {
        f32::from(self.r) / 255.0
    }

    pub fn norm_g(&self) -> f32 {
        f32::from(self.g) / 255.0
    }

    pub fn norm_b(&self) -> f32 {
        f32::from(self.b) / 255.0
    }

    pub fn norm_a(&self) -> f32 {
        f32::from(self.a) / 255.0
    }

    /// Channels normalized to `[0, 1]`, in RGBA order.
    pub fn normalized(&self) -> [f32; 4] {
        [self.norm_r(), self.norm_g(), self.norm_b(), self.norm_a()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba() {
        let c = Color::from_rgba(0x11223344);
        assert_eq!(c, Color::new(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn test_normalized() {
        assert_eq!(Color::WHITE.normalized(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Color::TRANSPARENT.normalized(), [0.0; 4]);
        let n = Color::new(51, 0, 0, 255).normalized();
        assert!((n[0] - 0.2).abs() < 1e-6);
    }
}

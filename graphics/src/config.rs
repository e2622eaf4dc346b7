//! Device configuration.

use tessera_core::color::Color;
use tessera_core::math::Size2;
use tessera_core::sampler::TextureFilter;

use crate::error::GraphicsError;

/// Graphics backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// First backend compiled into the crate.
    #[default]
    Default,
    /// Direct3D 11 style immediate device.
    Direct3D11,
    /// OpenGL style context.
    OpenGl,
}

impl BackendType {
    /// Check if this backend was compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            BackendType::Default => cfg!(any(feature = "d3d11-backend", feature = "opengl-backend")),
            BackendType::Direct3D11 => cfg!(feature = "d3d11-backend"),
            BackendType::OpenGl => cfg!(feature = "opengl-backend"),
        }
    }

    /// Get the backend name for display.
    pub fn name(&self) -> &'static str {
        match self {
            BackendType::Default => "default",
            BackendType::Direct3D11 => "Direct3D 11",
            BackendType::OpenGl => "OpenGL",
        }
    }
}

/// Configuration for creating a [`RenderDevice`](crate::RenderDevice).
///
/// # Example
///
/// ```ignore
/// let config = DeviceConfig::new()
///     .with_backend(BackendType::OpenGl)
///     .with_texture_filter(TextureFilter::Trilinear)
///     .with_max_anisotropy(4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Backend to create.
    pub backend: BackendType,
    /// Initial back buffer size. An empty size takes the size from the platform host.
    pub size: Size2,
    /// Back buffer sample count.
    pub sample_count: u32,
    /// Filter used by textures whose filter is [`TextureFilter::Default`].
    pub texture_filter: TextureFilter,
    /// Anisotropy used by textures whose max anisotropy is 0.
    pub max_anisotropy: u32,
    /// Wait for vertical sync on present.
    pub vsync: bool,
    /// Create a depth buffer for the back buffer.
    pub depth: bool,
    /// Enable backend debug validation.
    pub debug: bool,
    /// Back buffer clear color.
    pub clear_color: Color,
    /// Clear the back buffer color each frame.
    pub clear_color_buffer: bool,
    /// Clear the back buffer depth each frame.
    pub clear_depth_buffer: bool,
    /// Largest buffer payload accepted by resource setters.
    pub max_buffer_size: u64,
    /// Largest texture width or height.
    pub max_texture_dimension: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Default,
            size: Size2::ZERO,
            sample_count: 1,
            texture_filter: TextureFilter::Nearest,
            max_anisotropy: 1,
            vsync: true,
            depth: false,
            debug: false,
            clear_color: Color::BLACK,
            clear_color_buffer: true,
            clear_depth_buffer: false,
            max_buffer_size: 1 << 30, // 1 GB
            max_texture_dimension: 16384,
        }
    }
}

impl DeviceConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_size(mut self, size: Size2) -> Self {
        self.size = size;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_texture_filter(mut self, filter: TextureFilter) -> Self {
        self.texture_filter = filter;
        self
    }

    pub fn with_max_anisotropy(mut self, max_anisotropy: u32) -> Self {
        self.max_anisotropy = max_anisotropy;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_depth(mut self, depth: bool) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the back buffer clear color and enable color clears.
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self.clear_color_buffer = true;
        self
    }

    pub fn with_clear_depth_buffer(mut self, clear: bool) -> Self {
        self.clear_depth_buffer = clear;
        self
    }

    /// Check the configuration for values no backend can honor.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] describing the first bad field.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if !self.size.is_valid() {
            return Err(GraphicsError::InvalidParameter(format!(
                "invalid back buffer size {:?}",
                self.size
            )));
        }
        if self.sample_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "sample count must be at least 1".to_string(),
            ));
        }
        if self.texture_filter == TextureFilter::Default {
            return Err(GraphicsError::InvalidParameter(
                "device texture filter cannot be Default".to_string(),
            ));
        }
        if self.max_anisotropy == 0 {
            return Err(GraphicsError::InvalidParameter(
                "device max anisotropy must be at least 1".to_string(),
            ));
        }
        if self.max_texture_dimension == 0 || self.max_buffer_size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "device limits must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DeviceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = DeviceConfig::new()
            .with_backend(BackendType::OpenGl)
            .with_sample_count(4)
            .with_texture_filter(TextureFilter::Trilinear)
            .with_max_anisotropy(8)
            .with_clear_color(Color::RED);
        assert_eq!(config.backend, BackendType::OpenGl);
        assert_eq!(config.sample_count, 4);
        assert_eq!(config.texture_filter, TextureFilter::Trilinear);
        assert_eq!(config.max_anisotropy, 8);
        assert_eq!(config.clear_color, Color::RED);
        assert!(config.clear_color_buffer);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(DeviceConfig::new().with_sample_count(0).validate().is_err());
        assert!(DeviceConfig::new().with_max_anisotropy(0).validate().is_err());
        assert!(
            DeviceConfig::new()
                .with_texture_filter(TextureFilter::Default)
                .validate()
                .is_err()
        );
        assert!(
            DeviceConfig::new()
                .with_size(Size2::new(-1.0, 10.0))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_backend_availability() {
        assert_eq!(
            BackendType::Direct3D11.is_available(),
            cfg!(feature = "d3d11-backend")
        );
        assert_eq!(BackendType::OpenGl.is_available(), cfg!(feature = "opengl-backend"));
    }
}

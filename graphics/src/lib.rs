//! # Tessera Graphics
//!
//! GPU resource synchronization and upload pipeline.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`RenderDevice`] - Creates resources, queues draws and renders frames
//! - [`resources`] - Texture, buffer, blend state, shader and mesh buffer front-ends
//! - [`DrawCommand`] - One indexed draw, executed in submission order
//! - [`backend`] - Direct3D 11 and OpenGL style backends behind [`GpuBackend`]
//!
//! Application threads change resources through setters that only update
//! logical state and mark it dirty. Once per frame the render thread uploads
//! every dirty resource, reusing native objects when the new contents fit and
//! recreating them otherwise, then executes the queued draws.
//!
//! ## Example
//!
//! ```ignore
//! use tessera_graphics::{DeviceConfig, HeadlessHost, RenderDevice, TextureDescriptor};
//!
//! let host = Arc::new(HeadlessHost::new(Size2::new(1280.0, 720.0)));
//! let device = RenderDevice::new(DeviceConfig::new(), host)?;
//! let texture = device.create_texture(
//!     &TextureDescriptor::new(Size2::new(256.0, 256.0), PixelFormat::Rgba8Unorm)
//!         .with_data(pixels),
//! )?;
//!
//! // Any thread:
//! texture.set_data(&new_pixels, Size2::new(512.0, 512.0))?;
//!
//! // Render thread:
//! device.render_frame()?;
//! ```

pub mod backend;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod platform;
pub mod resources;
pub mod sampler_cache;
pub mod types;

// Re-export main types for convenience
pub use backend::{
    BackendStats, BufferBinding, DrawRecord, FaultKind, GpuBackend, NativeHandle,
    NativeTextureInfo, StorageClass, TextureBinding,
};
pub use command::DrawCommand;
pub use config::{BackendType, DeviceConfig};
pub use device::{FrameStats, RenderDevice};
pub use error::GraphicsError;
pub use platform::{HeadlessHost, PlatformHost, WorkQueue};
pub use resources::{
    BlendState, Buffer, DirtyFlags, GpuResource, MeshBuffer, ResourceKind, Shader, Texture,
};
pub use sampler_cache::SamplerState;
pub use types::*;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// Logs the library version; call once after installing a logger.
pub fn init() {
    tessera_core::init();
    log::info!("Tessera Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_backend_available() {
        assert!(BackendType::Default.is_available());
    }
}

//! Graphics error types.

use tessera_core::texture::PixelFormat;

/// Errors that can occur in the graphics system.
///
/// Validation errors are returned synchronously by resource setters and leave
/// the resource unchanged. Backend errors come out of `upload()` and draw
/// execution; they carry the native error code of the failing call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A resource was bound somewhere its usage does not allow.
    #[error("incompatible usage: {0}")]
    IncompatibleUsage(String),
    /// The backend has no native equivalent for a pixel format.
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedPixelFormat(PixelFormat),
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// A native API call failed.
    #[error("{backend} {operation} failed with code 0x{code:08X}")]
    Backend {
        backend: &'static str,
        operation: &'static str,
        code: u32,
    },
    /// A resource has no native object to bind yet.
    #[error("resource not ready: {0}")]
    ResourceNotReady(String),
    /// Recreating the back buffer failed.
    #[error("back buffer resize to {width}x{height} failed with code 0x{code:08X}")]
    BackBufferResizeFailed { width: u32, height: u32, code: u32 },
    /// Presenting the frame failed.
    #[error("present failed with code 0x{code:08X}")]
    PresentFailed { code: u32 },
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
}

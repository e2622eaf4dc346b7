//! GPU backend abstraction layer.
//!
//! Each backend implements [`GpuBackend`] and a resource trait per resource
//! kind ([`TextureBackend`], [`BufferBackend`], ...). A backend resource owns
//! the native objects for one front-end resource and reconciles them against
//! the front-end's logical state in `upload()`.
//!
//! # Available Backends
//!
//! - `d3d11-backend` (default): Direct3D 11 style immediate device
//! - `opengl-backend` (default): OpenGL style context
//!
//! Both are software devices that enforce the creation and update rules of
//! the API they model, so the pipeline runs and is testable without a GPU.

#[cfg(feature = "d3d11-backend")]
pub mod d3d11;

#[cfg(feature = "opengl-backend")]
pub mod opengl;

pub(crate) mod pitch;
pub mod software;

use std::sync::Arc;

use tessera_core::math::Size2;
use tessera_core::sampler::TextureFilter;

use crate::config::{BackendType, DeviceConfig};
use crate::error::GraphicsError;
use crate::resources::{
    BlendStateState, BufferState, DirtyFlags, MeshBufferState, ShaderState, TextureState,
};
use crate::sampler_cache::{SamplerCache, SamplerState};
use crate::types::{CullMode, DrawMode, FillMode, Rect, SamplerStateDescriptor};

pub use software::{BackendStats, FaultInjector, FaultKind};

/// Maximum number of textures bound by one draw.
pub const MAX_TEXTURES: usize = 4;

/// Opaque handle to a native object owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeHandle(pub(crate) u64);

impl NativeHandle {
    /// Raw handle value, for logging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// How a native object may be written after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Initialized at creation only.
    Immutable,
    /// CPU-writable.
    Dynamic,
    /// GPU-writable render target.
    RenderTarget,
}

/// Native buffer as seen by draws and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    pub handle: NativeHandle,
    /// Allocated byte capacity.
    pub capacity: u64,
    /// Byte length of the last uploaded payload.
    pub len: u64,
    pub storage: StorageClass,
}

/// Native texture as bound for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub texture: NativeHandle,
    /// Shader resource view, or the texture itself where views do not exist.
    pub view: NativeHandle,
    pub sampler: NativeHandle,
}

/// Native render target as bound for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTargetBinding {
    pub target: NativeHandle,
    pub depth: Option<NativeHandle>,
    pub width: u32,
    pub height: u32,
    /// Clear color normalized to `[0, 1]`.
    pub clear_color: [f32; 4],
    pub clear_color_buffer: bool,
    pub clear_depth_buffer: bool,
}

/// Native texture layout, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTextureInfo {
    pub handle: NativeHandle,
    pub width: u32,
    pub height: u32,
    /// Native row pitch of every level.
    pub row_pitches: Vec<u32>,
    pub storage: StorageClass,
    /// Native pixel format code.
    pub native_format: u32,
}

/// Compiled shader as bound for drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBinding {
    /// Native programs or shader stages.
    pub handles: Vec<NativeHandle>,
    /// Byte size of each pixel shader constant, in declaration order.
    pub pixel_uniforms: Vec<u32>,
    /// Byte size of each vertex shader constant, in declaration order.
    pub vertex_uniforms: Vec<u32>,
    pub pixel_constant_buffer: Option<NativeHandle>,
    pub vertex_constant_buffer: Option<NativeHandle>,
}

/// Vertex and index layout of a mesh buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshLayout {
    /// Native layout object, where the API has one.
    pub handle: Option<NativeHandle>,
    pub index_size: u32,
    /// Native index format code.
    pub index_format: u32,
    pub vertex_stride: u32,
}

/// A mesh buffer with the current native handles of its buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBinding {
    pub layout: MeshLayout,
    pub index_buffer: BufferBinding,
    pub vertex_buffer: BufferBinding,
}

/// Everything a backend needs to issue one draw.
#[derive(Debug)]
pub struct NativeDrawCall<'a> {
    pub blend_state: NativeHandle,
    pub shader: &'a ShaderBinding,
    pub mesh: MeshBinding,
    pub textures: [Option<TextureBinding>; MAX_TEXTURES],
    pub render_target: Option<RenderTargetBinding>,
    pub pixel_constants: &'a [Vec<f32>],
    pub vertex_constants: &'a [Vec<f32>],
    pub index_count: u32,
    pub start_index: u32,
    pub mode: DrawMode,
    pub viewport: Rect,
    pub depth_test: bool,
    pub depth_write: bool,
    pub scissor: Option<Rect>,
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,
}

impl NativeDrawCall<'_> {
    /// Whether the index range lies inside the uploaded index data.
    pub(crate) fn index_range_valid(&self) -> bool {
        let end = u64::from(self.start_index) + u64::from(self.index_count);
        end * u64::from(self.mesh.layout.index_size) <= self.mesh.index_buffer.len
    }

    /// Whether the supplied constants match the shader's declarations.
    pub(crate) fn constants_valid(&self) -> bool {
        constants_match(&self.shader.pixel_uniforms, self.pixel_constants)
            && constants_match(&self.shader.vertex_uniforms, self.vertex_constants)
    }

    pub(crate) fn record(&self) -> DrawRecord {
        DrawRecord {
            sequence: 0,
            index_count: self.index_count,
            start_index: self.start_index,
            mode: self.mode,
            vertex_buffer: self.mesh.vertex_buffer.handle,
            index_buffer: self.mesh.index_buffer.handle,
            textures: self.textures.iter().flatten().map(|t| t.texture).collect(),
            render_target: self.render_target.map(|rt| rt.target),
        }
    }
}

/// Constants are accepted when none are given or when every declared uniform
/// receives exactly its size.
fn constants_match(sizes: &[u32], constants: &[Vec<f32>]) -> bool {
    constants.is_empty()
        || (sizes.len() == constants.len()
            && sizes
                .iter()
                .zip(constants)
                .all(|(&size, values)| values.len() * 4 == size as usize))
}

/// A draw as executed by a software device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    /// Position in the device's draw log.
    pub sequence: u64,
    pub index_count: u32,
    pub start_index: u32,
    pub mode: DrawMode,
    pub vertex_buffer: NativeHandle,
    pub index_buffer: NativeHandle,
    pub textures: Vec<NativeHandle>,
    pub render_target: Option<NativeHandle>,
}

/// Per-frame inputs to `upload()`.
pub struct UploadContext<'a> {
    samplers: &'a SamplerCache,
    /// Filter used when a texture's filter is `Default`.
    pub default_filter: TextureFilter,
    /// Anisotropy used when a texture's max anisotropy is 0.
    pub default_max_anisotropy: u32,
}

impl<'a> UploadContext<'a> {
    pub(crate) fn new(
        samplers: &'a SamplerCache,
        default_filter: TextureFilter,
        default_max_anisotropy: u32,
    ) -> Self {
        Self {
            samplers,
            default_filter,
            default_max_anisotropy,
        }
    }

    /// Resolve device defaults in `descriptor` and fetch the cached sampler.
    pub fn sampler_state(
        &self,
        descriptor: SamplerStateDescriptor,
    ) -> Result<Arc<SamplerState>, GraphicsError> {
        self.samplers.get_or_create(
            descriptor.resolve(self.default_filter, self.default_max_anisotropy),
        )
    }
}

/// Whether a native object must be recreated rather than updated in place.
///
/// `current_capacity` is `None` when nothing is allocated yet.
pub(crate) fn needs_reallocation(
    current_capacity: Option<u64>,
    requested: u64,
    dirty: DirtyFlags,
    immutable: bool,
) -> bool {
    match current_capacity {
        None => true,
        Some(capacity) => {
            dirty.contains(DirtyFlags::SIZE)
                || requested > capacity
                || (immutable && dirty.contains(DirtyFlags::DATA))
        }
    }
}

/// Native side of a [`Texture`](crate::Texture).
pub trait TextureBackend: Send + Sync {
    /// Reconcile native objects with `state`.
    fn upload(&mut self, state: &TextureState, ctx: &UploadContext<'_>) -> Result<(), GraphicsError>;

    /// Binding for sampling, `None` before the first successful upload.
    fn binding(&self) -> Option<TextureBinding>;

    /// Binding for rendering into, `None` unless this is a render target.
    fn render_target(&self) -> Option<RenderTargetBinding>;

    fn info(&self) -> Option<NativeTextureInfo>;

    /// Copy of one native level at native row pitch.
    fn read_level(&self, level: u32) -> Option<Vec<u8>>;
}

/// Native side of a [`Buffer`](crate::Buffer).
pub trait BufferBackend: Send + Sync {
    fn upload(&mut self, state: &BufferState, ctx: &UploadContext<'_>) -> Result<(), GraphicsError>;

    fn binding(&self) -> Option<BufferBinding>;

    /// Copy of the native contents.
    fn read_back(&self) -> Option<Vec<u8>>;
}

/// Native side of a [`BlendState`](crate::BlendState).
pub trait BlendStateBackend: Send + Sync {
    fn upload(
        &mut self,
        state: &BlendStateState,
        ctx: &UploadContext<'_>,
    ) -> Result<(), GraphicsError>;

    fn binding(&self) -> Option<NativeHandle>;
}

/// Native side of a [`Shader`](crate::Shader).
pub trait ShaderBackend: Send + Sync {
    fn upload(&mut self, state: &ShaderState, ctx: &UploadContext<'_>) -> Result<(), GraphicsError>;

    fn binding(&self) -> Option<ShaderBinding>;
}

/// Native side of a [`MeshBuffer`](crate::MeshBuffer).
pub trait MeshBufferBackend: Send + Sync {
    fn upload(
        &mut self,
        state: &MeshBufferState,
        ctx: &UploadContext<'_>,
    ) -> Result<(), GraphicsError>;

    fn layout(&self) -> Option<MeshLayout>;
}

/// Trait for GPU backend implementations.
///
/// A backend is selected once at device creation and shared behind an `Arc`.
/// Resource backends it creates keep the native device alive.
pub trait GpuBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    fn backend_type(&self) -> BackendType;

    fn create_texture(&self) -> Box<dyn TextureBackend>;

    fn create_buffer(&self) -> Box<dyn BufferBackend>;

    fn create_blend_state(&self) -> Box<dyn BlendStateBackend>;

    fn create_shader(&self) -> Box<dyn ShaderBackend>;

    fn create_mesh_buffer(&self) -> Box<dyn MeshBufferBackend>;

    /// Create a native sampler object.
    fn create_sampler(
        &self,
        descriptor: &SamplerStateDescriptor,
    ) -> Result<NativeHandle, GraphicsError>;

    /// Recreate the back buffer at a new size.
    fn resize_back_buffer(&self, width: u32, height: u32) -> Result<(), GraphicsError>;

    fn draw(&self, call: &NativeDrawCall<'_>) -> Result<(), GraphicsError>;

    /// Present the back buffer, waiting for `sync_interval` vertical blanks.
    fn present(&self, sync_interval: u32) -> Result<(), GraphicsError>;

    fn supported_resolutions(&self) -> Vec<Size2>;

    /// Destroy native objects released since the last flush.
    fn flush_releases(&self) -> usize;

    fn stats(&self) -> BackendStats;

    fn faults(&self) -> &FaultInjector;

    /// Every draw executed so far, oldest first.
    fn draw_log(&self) -> Vec<DrawRecord>;
}

/// Create the backend named by `config`.
///
/// # Errors
///
/// Returns [`GraphicsError::FeatureNotSupported`] when the requested backend
/// was not compiled in, or the backend's own initialization error.
pub fn create_backend(
    config: &DeviceConfig,
    width: u32,
    height: u32,
) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    let requested = config.backend;
    let backend = match requested {
        BackendType::Default if cfg!(feature = "d3d11-backend") => BackendType::Direct3D11,
        BackendType::Default if cfg!(feature = "opengl-backend") => BackendType::OpenGl,
        other => other,
    };

    match backend {
        #[cfg(feature = "d3d11-backend")]
        BackendType::Direct3D11 => {
            let backend = d3d11::D3d11Backend::new(config, width, height)?;
            log::info!("Using {} backend", backend.name());
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "opengl-backend")]
        BackendType::OpenGl => {
            let backend = opengl::GlBackend::new(config, width, height)?;
            log::info!("Using {} backend", backend.name());
            Ok(Arc::new(backend))
        }
        _ => Err(GraphicsError::FeatureNotSupported(format!(
            "{} backend is not compiled in",
            requested.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reallocation_rules() {
        let data = DirtyFlags::DATA;
        assert!(needs_reallocation(None, 0, data, false));
        assert!(!needs_reallocation(Some(64), 32, data, false));
        assert!(!needs_reallocation(Some(64), 64, data, false));
        assert!(needs_reallocation(Some(64), 128, data, false));
        assert!(needs_reallocation(Some(64), 32, data, true));
        assert!(needs_reallocation(Some(64), 32, DirtyFlags::SIZE | data, false));
    }

    #[test]
    fn test_constants_match() {
        assert!(constants_match(&[16], &[]));
        assert!(constants_match(&[16, 4], &[vec![0.0; 4], vec![1.0]]));
        assert!(!constants_match(&[16], &[vec![0.0; 3]]));
        assert!(!constants_match(&[16], &[vec![0.0; 4], vec![0.0]]));
    }

    #[test]
    fn test_backend_availability() {
        let config = DeviceConfig::new();
        let result = create_backend(&config, 64, 64);
        assert_eq!(result.is_ok(), BackendType::Default.is_available());
    }
}

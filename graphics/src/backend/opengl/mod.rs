//! OpenGL backend.
//!
//! GL objects stay writable after creation: static buffers and textures are
//! updated in place like dynamic ones, and dynamic buffers are orphaned
//! before each update. Storage is respecified only when the layout changes.

mod blend_state;
mod buffer;
pub mod context;
pub mod conversion;
mod mesh_buffer;
mod shader;
mod texture;

use std::sync::Arc;

use tessera_core::math::Size2;

use crate::backend::software::DISPLAY_MODES;
use crate::backend::{
    BackendStats, BlendStateBackend, BufferBackend, DrawRecord, FaultInjector, GpuBackend,
    MeshBufferBackend, NativeDrawCall, NativeHandle, ShaderBackend, TextureBackend,
};
use crate::config::{BackendType, DeviceConfig};
use crate::error::GraphicsError;
use crate::types::{MAX_ANISOTROPY, SamplerStateDescriptor};

use context::{GlContext, GlError, SamplerParams};
use conversion::{
    convert_address_mode, convert_cull_mode, convert_draw_mode, convert_fill_mode, convert_filter,
};

pub use blend_state::GlBlendState;
pub use buffer::GlBuffer;
pub use mesh_buffer::GlMeshBuffer;
pub use shader::GlShader;
pub use texture::GlTexture;

pub(crate) const BACKEND_NAME: &str = "OpenGL";

/// OpenGL backend.
pub struct GlBackend {
    context: Arc<GlContext>,
}

impl GlBackend {
    /// Create a context whose default framebuffer is `width` x `height`.
    pub fn new(config: &DeviceConfig, width: u32, height: u32) -> Result<Self, GraphicsError> {
        if config.sample_count > 16 {
            return Err(GraphicsError::InitializationFailed(format!(
                "no pixel format with {} samples",
                config.sample_count
            )));
        }
        let context = GlContext::new(width, height, config.depth);
        log::debug!(
            "{} context created with a {}x{} default framebuffer (depth: {}, samples: {})",
            BACKEND_NAME,
            width,
            height,
            context.has_depth(),
            config.sample_count
        );
        Ok(Self {
            context: Arc::new(context),
        })
    }

    /// The underlying context.
    pub fn context(&self) -> &Arc<GlContext> {
        &self.context
    }
}

impl GpuBackend for GlBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn backend_type(&self) -> BackendType {
        BackendType::OpenGl
    }

    fn create_texture(&self) -> Box<dyn TextureBackend> {
        Box::new(GlTexture::new(Arc::clone(&self.context)))
    }

    fn create_buffer(&self) -> Box<dyn BufferBackend> {
        Box::new(GlBuffer::new(Arc::clone(&self.context)))
    }

    fn create_blend_state(&self) -> Box<dyn BlendStateBackend> {
        Box::new(GlBlendState::new(Arc::clone(&self.context)))
    }

    fn create_shader(&self) -> Box<dyn ShaderBackend> {
        Box::new(GlShader::new(Arc::clone(&self.context)))
    }

    fn create_mesh_buffer(&self) -> Box<dyn MeshBufferBackend> {
        Box::new(GlMeshBuffer::new(Arc::clone(&self.context)))
    }

    fn create_sampler(
        &self,
        descriptor: &SamplerStateDescriptor,
    ) -> Result<NativeHandle, GraphicsError> {
        let (min_filter, mag_filter) = convert_filter(descriptor.filter);
        let params = SamplerParams {
            min_filter,
            mag_filter,
            wrap_s: convert_address_mode(descriptor.address_x),
            wrap_t: convert_address_mode(descriptor.address_y),
            max_anisotropy: descriptor.max_anisotropy.clamp(1, MAX_ANISOTROPY),
        };
        self.context
            .create_sampler(&params)
            .map_err(|err| err.into_error("glSamplerParameteri"))
    }

    fn resize_back_buffer(&self, width: u32, height: u32) -> Result<(), GraphicsError> {
        self.context
            .resize_default_framebuffer(width, height)
            .map_err(|err| GraphicsError::BackBufferResizeFailed {
                width,
                height,
                code: err.0,
            })
    }

    fn draw(&self, call: &NativeDrawCall<'_>) -> Result<(), GraphicsError> {
        if !call.index_range_valid() {
            return Err(GlError::INVALID_VALUE.into_error("glDrawElements"));
        }
        if !call.constants_valid() {
            return Err(GlError::INVALID_OPERATION.into_error("glUniform"));
        }

        let mesh = &call.mesh;
        let mut handles = vec![
            call.blend_state,
            mesh.index_buffer.handle,
            mesh.vertex_buffer.handle,
        ];
        handles.extend(mesh.layout.handle);
        handles.extend(call.shader.handles.iter().copied());
        for texture in call.textures.iter().flatten() {
            handles.push(texture.texture);
            handles.push(texture.sampler);
        }
        if let Some(target) = call.render_target {
            handles.push(target.target);
            handles.extend(target.depth);
        }

        if let Some(&program) = call.shader.handles.first() {
            let uniforms: Vec<Vec<f32>> = call
                .vertex_constants
                .iter()
                .chain(call.pixel_constants)
                .cloned()
                .collect();
            if !uniforms.is_empty() {
                self.context
                    .set_uniforms(program, &uniforms)
                    .map_err(|err| err.into_error("glUniform"))?;
            }
        }

        log::trace!(
            "glDrawElements({}, {}) mode={:#06x} cull={:?} fill={:#06x} depth_test={} depth_write={} scissor={:?} viewport={:?}",
            call.index_count,
            call.start_index,
            convert_draw_mode(call.mode),
            convert_cull_mode(call.cull_mode),
            convert_fill_mode(call.fill_mode),
            call.depth_test,
            call.depth_write,
            call.scissor,
            call.viewport
        );
        self.context
            .draw_elements(&handles, call.record())
            .map_err(|err| err.into_error("glDrawElements"))
    }

    fn present(&self, sync_interval: u32) -> Result<(), GraphicsError> {
        self.context
            .swap_buffers(sync_interval)
            .map_err(|err| GraphicsError::PresentFailed { code: err.0 })
    }

    fn supported_resolutions(&self) -> Vec<Size2> {
        DISPLAY_MODES
            .iter()
            .map(|&(width, height)| Size2::from((width, height)))
            .collect()
    }

    fn flush_releases(&self) -> usize {
        self.context.flush_releases()
    }

    fn stats(&self) -> BackendStats {
        self.context.stats()
    }

    fn faults(&self) -> &FaultInjector {
        self.context.faults()
    }

    fn draw_log(&self) -> Vec<DrawRecord> {
        self.context.draw_log()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FaultKind;

    fn backend() -> GlBackend {
        GlBackend::new(&DeviceConfig::new(), 64, 64).unwrap()
    }

    #[test]
    fn test_present_error_mapping() {
        let backend = backend();
        backend.faults().fail_next(FaultKind::Present, 1);
        assert_eq!(
            backend.present(1),
            Err(GraphicsError::PresentFailed {
                code: GlError::INVALID_FRAMEBUFFER_OPERATION.0
            })
        );
        assert_eq!(backend.present(1), Ok(()));
    }

    #[test]
    fn test_resize_error_mapping() {
        let backend = backend();
        backend.faults().fail_next(FaultKind::BackBuffer, 1);
        assert_eq!(
            backend.resize_back_buffer(32, 32),
            Err(GraphicsError::BackBufferResizeFailed {
                width: 32,
                height: 32,
                code: GlError::OUT_OF_MEMORY.0,
            })
        );
        assert_eq!(backend.context().default_framebuffer_size(), (64, 64));
    }

    #[test]
    fn test_sampler_creation() {
        let backend = backend();
        let descriptor = SamplerStateDescriptor::default().resolve(Default::default(), 1);
        assert!(backend.create_sampler(&descriptor).is_ok());
        assert_eq!(backend.stats().samplers, 1);
    }
}

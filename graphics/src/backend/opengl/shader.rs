//! OpenGL shader implementation.

use std::sync::Arc;

use crate::backend::{NativeHandle, ShaderBackend, ShaderBinding, UploadContext};
use crate::error::GraphicsError;
use crate::resources::ShaderState;

use super::context::GlContext;

/// Native side of a shader: one linked program. Constants are set as plain
/// uniforms at draw time, so there are no constant buffers.
pub struct GlShader {
    context: Arc<GlContext>,
    program: Option<NativeHandle>,
    pixel_uniforms: Vec<u32>,
    vertex_uniforms: Vec<u32>,
}

impl GlShader {
    pub(crate) fn new(context: Arc<GlContext>) -> Self {
        Self {
            context,
            program: None,
            pixel_uniforms: Vec::new(),
            vertex_uniforms: Vec::new(),
        }
    }
}

impl ShaderBackend for GlShader {
    fn upload(&mut self, state: &ShaderState, _ctx: &UploadContext<'_>) -> Result<(), GraphicsError> {
        let program = self
            .context
            .create_program(state.vertex_bytecode(), state.pixel_bytecode())
            .map_err(|err| err.into_error("glLinkProgram"))?;
        if let Some(old) = self.program.replace(program) {
            self.context.defer_delete(old);
        }
        self.pixel_uniforms = state.pixel_uniforms().iter().map(|u| u.kind.size()).collect();
        self.vertex_uniforms = state.vertex_uniforms().iter().map(|u| u.kind.size()).collect();
        log::debug!(
            "GL: linked program {:?} ({} / {})",
            program,
            state.vertex_entry(),
            state.pixel_entry()
        );
        Ok(())
    }

    fn binding(&self) -> Option<ShaderBinding> {
        Some(ShaderBinding {
            handles: vec![self.program?],
            pixel_uniforms: self.pixel_uniforms.clone(),
            vertex_uniforms: self.vertex_uniforms.clone(),
            pixel_constant_buffer: None,
            vertex_constant_buffer: None,
        })
    }
}

impl Drop for GlShader {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.context.defer_delete(program);
        }
    }
}

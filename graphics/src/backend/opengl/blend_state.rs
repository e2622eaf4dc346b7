//! OpenGL blend state implementation.

use std::sync::Arc;

use crate::backend::{BlendStateBackend, NativeHandle, UploadContext};
use crate::error::GraphicsError;
use crate::resources::BlendStateState;

use super::context::{BlendParams, GlContext};
use super::conversion::{convert_blend_factor, convert_blend_operation, convert_color_mask};

/// Native side of a blend state: a cached parameter block applied with
/// `glBlendFuncSeparate` and friends when a draw binds it.
pub struct GlBlendState {
    context: Arc<GlContext>,
    handle: Option<NativeHandle>,
    params: Option<BlendParams>,
}

impl GlBlendState {
    pub(crate) fn new(context: Arc<GlContext>) -> Self {
        Self {
            context,
            handle: None,
            params: None,
        }
    }
}

impl BlendStateBackend for GlBlendState {
    fn upload(
        &mut self,
        state: &BlendStateState,
        _ctx: &UploadContext<'_>,
    ) -> Result<(), GraphicsError> {
        let descriptor = state.descriptor();
        let params = BlendParams {
            enabled: descriptor.enabled,
            src_rgb: convert_blend_factor(descriptor.color_src),
            dst_rgb: convert_blend_factor(descriptor.color_dst),
            equation_rgb: convert_blend_operation(descriptor.color_op),
            src_alpha: convert_blend_factor(descriptor.alpha_src),
            dst_alpha: convert_blend_factor(descriptor.alpha_dst),
            equation_alpha: convert_blend_operation(descriptor.alpha_op),
            color_mask: convert_color_mask(descriptor.color_mask),
        };
        if self.handle.is_some() && self.params == Some(params) {
            return Ok(());
        }
        let handle = self
            .context
            .create_blend_state(&params)
            .map_err(|err| err.into_error("glBlendFuncSeparate"))?;
        if let Some(old) = self.handle.replace(handle) {
            self.context.defer_delete(old);
        }
        self.params = Some(params);
        Ok(())
    }

    fn binding(&self) -> Option<NativeHandle> {
        self.handle
    }
}

impl Drop for GlBlendState {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.context.defer_delete(handle);
        }
    }
}

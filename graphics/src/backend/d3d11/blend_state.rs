//! Direct3D 11 blend state implementation.

use std::sync::Arc;

use crate::backend::{BlendStateBackend, NativeHandle, UploadContext};
use crate::error::GraphicsError;
use crate::resources::BlendStateState;

use super::conversion::{convert_blend_factor, convert_blend_operation, convert_color_mask};
use super::device::{BlendDesc, D3d11Device};

/// Native side of a blend state. D3D11 blend states are immutable, so every
/// change creates a new object.
pub struct D3d11BlendState {
    device: Arc<D3d11Device>,
    handle: Option<NativeHandle>,
}

impl D3d11BlendState {
    pub(crate) fn new(device: Arc<D3d11Device>) -> Self {
        Self {
            device,
            handle: None,
        }
    }
}

impl BlendStateBackend for D3d11BlendState {
    fn upload(
        &mut self,
        state: &BlendStateState,
        _ctx: &UploadContext<'_>,
    ) -> Result<(), GraphicsError> {
        let descriptor = state.descriptor();
        let desc = BlendDesc {
            enable: descriptor.enabled,
            src_blend: convert_blend_factor(descriptor.color_src),
            dest_blend: convert_blend_factor(descriptor.color_dst),
            blend_op: convert_blend_operation(descriptor.color_op),
            src_blend_alpha: convert_blend_factor(descriptor.alpha_src),
            dest_blend_alpha: convert_blend_factor(descriptor.alpha_dst),
            blend_op_alpha: convert_blend_operation(descriptor.alpha_op),
            write_mask: convert_color_mask(descriptor.color_mask),
        };
        let handle = self
            .device
            .create_blend_state(&desc)
            .map_err(|hr| hr.into_error("CreateBlendState"))?;
        if let Some(old) = self.handle.replace(handle) {
            self.device.defer_release(old);
        }
        Ok(())
    }

    fn binding(&self) -> Option<NativeHandle> {
        self.handle
    }
}

impl Drop for D3d11BlendState {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.device.defer_release(handle);
        }
    }
}

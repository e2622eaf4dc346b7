//! Blend state resource.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{BlendStateBackend, NativeHandle, UploadContext};
use crate::device::RenderDevice;
use crate::error::GraphicsError;
use crate::types::{BlendDescriptor, BlendFactor, BlendOperation, ColorMask};

use super::{DirtyFlags, GpuResource, ResourceKind, ResourceState, upload_locked};

/// Logical state of a [`BlendState`].
#[derive(Debug, Clone)]
pub struct BlendStateState {
    descriptor: BlendDescriptor,
    dirty: DirtyFlags,
}

impl BlendStateState {
    pub fn descriptor(&self) -> &BlendDescriptor {
        &self.descriptor
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }
}

impl ResourceState for BlendStateState {
    fn dirty_mut(&mut self) -> &mut DirtyFlags {
        &mut self.dirty
    }
}

/// Output merger blend configuration.
pub struct BlendState {
    device: Weak<RenderDevice>,
    label: Option<String>,
    state: Mutex<BlendStateState>,
    native: Mutex<Box<dyn BlendStateBackend>>,
}

impl BlendState {
    /// Create a new blend state (called by RenderDevice).
    pub(crate) fn new(
        device: Weak<RenderDevice>,
        descriptor: &BlendDescriptor,
        native: Box<dyn BlendStateBackend>,
    ) -> Self {
        Self {
            device,
            label: descriptor.label.clone(),
            state: Mutex::new(BlendStateState {
                descriptor: descriptor.clone(),
                dirty: DirtyFlags::PARAMETERS,
            }),
            native: Mutex::new(native),
        }
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<RenderDevice>> {
        self.device.upgrade()
    }

    pub(crate) fn device_ptr(&self) -> *const RenderDevice {
        self.device.as_ptr()
    }

    /// Get the blend state label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Copy of the current configuration.
    pub fn descriptor(&self) -> BlendDescriptor {
        self.state.lock().descriptor.clone()
    }

    /// Replace the blend equation.
    #[allow(clippy::too_many_arguments)]
    pub fn set_blending(
        &self,
        enabled: bool,
        color_src: BlendFactor,
        color_dst: BlendFactor,
        color_op: BlendOperation,
        alpha_src: BlendFactor,
        alpha_dst: BlendFactor,
        alpha_op: BlendOperation,
    ) {
        let mut state = self.state.lock();
        let desc = &mut state.descriptor;
        desc.enabled = enabled;
        desc.color_src = color_src;
        desc.color_dst = color_dst;
        desc.color_op = color_op;
        desc.alpha_src = alpha_src;
        desc.alpha_dst = alpha_dst;
        desc.alpha_op = alpha_op;
        state.dirty |= DirtyFlags::PARAMETERS;
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.descriptor.enabled = enabled;
        state.dirty |= DirtyFlags::PARAMETERS;
    }

    pub fn set_color_mask(&self, mask: ColorMask) {
        let mut state = self.state.lock();
        state.descriptor.color_mask = mask;
        state.dirty |= DirtyFlags::PARAMETERS;
    }

    pub(crate) fn native_binding(&self) -> Option<NativeHandle> {
        self.native.lock().binding()
    }
}

impl GpuResource for BlendState {
    fn kind(&self) -> ResourceKind {
        ResourceKind::BlendState
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn dirty_flags(&self) -> DirtyFlags {
        self.state.lock().dirty
    }

    fn upload(&self, ctx: &UploadContext<'_>) -> Result<(), GraphicsError> {
        upload_locked(&self.state, &self.native, |native, state| {
            native.upload(state, ctx)
        })
    }
}

impl std::fmt::Debug for BlendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlendState")
            .field("enabled", &state.descriptor.enabled)
            .field("color_mask", &state.descriptor.color_mask)
            .field("dirty", &state.dirty)
            .field("label", &self.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(BlendState: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBlend;

    impl BlendStateBackend for NullBlend {
        fn upload(&mut self, _: &BlendStateState, _: &UploadContext<'_>) -> Result<(), GraphicsError> {
            Ok(())
        }

        fn binding(&self) -> Option<NativeHandle> {
            None
        }
    }

    #[test]
    fn test_set_blending_marks_parameters() {
        let blend = BlendState::new(Weak::new(), &BlendDescriptor::opaque(), Box::new(NullBlend));
        blend.state.lock().dirty = DirtyFlags::empty();

        blend.set_blending(
            true,
            BlendFactor::SrcAlpha,
            BlendFactor::InvSrcAlpha,
            BlendOperation::Add,
            BlendFactor::One,
            BlendFactor::One,
            BlendOperation::Max,
        );
        assert_eq!(blend.dirty_flags(), DirtyFlags::PARAMETERS);
        let desc = blend.descriptor();
        assert!(desc.enabled);
        assert_eq!(desc.alpha_op, BlendOperation::Max);
    }

    #[test]
    fn test_color_mask() {
        let blend = BlendState::new(Weak::new(), &BlendDescriptor::opaque(), Box::new(NullBlend));
        blend.set_color_mask(ColorMask::RED | ColorMask::ALPHA);
        assert_eq!(blend.descriptor().color_mask, ColorMask::RED | ColorMask::ALPHA);
    }
}

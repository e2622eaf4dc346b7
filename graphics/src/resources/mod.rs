//! GPU resources.
//!
//! This module contains the resource front-ends created by [`RenderDevice`]:
//! - [`Texture`] - 2D texture or render target
//! - [`Buffer`] - Index or vertex buffer
//! - [`BlendState`] - Output merger blend configuration
//! - [`Shader`] - Pixel and vertex shader pair
//! - [`MeshBuffer`] - Index and vertex buffer pairing with a vertex layout
//!
//! Front-ends hold the logical state behind a per-resource lock and never
//! touch native objects. Setters validate, merge and mark [`DirtyFlags`];
//! the device reconciles dirty resources with their backend once per frame.
//!
//! Resources are reference-counted with [`Arc`] and can be shared across threads.
//! Each resource holds a weak reference back to its parent device.
//!
//! [`RenderDevice`]: crate::RenderDevice
//! [`Arc`]: std::sync::Arc

mod blend_state;
mod buffer;
mod mesh_buffer;
pub(crate) mod mipmaps;
mod shader;
mod texture;

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::backend::UploadContext;
use crate::error::GraphicsError;

pub use blend_state::{BlendState, BlendStateState};
pub use buffer::{Buffer, BufferState};
pub use mesh_buffer::{MeshBuffer, MeshBufferState};
pub use shader::{Shader, ShaderState};
pub use texture::{Texture, TextureState};

bitflags! {
    /// Parts of a resource's logical state not yet reflected natively.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u32 {
        /// Contents changed.
        const DATA = 1 << 0;
        /// Dimensions or capacity changed.
        const SIZE = 1 << 1;
        /// Sampling, clear, blend or layout parameters changed.
        const PARAMETERS = 1 << 2;
    }
}

/// Resource categories, in the order the device uploads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Shader,
    BlendState,
    MeshBuffer,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::Shader => "shader",
            ResourceKind::BlendState => "blend state",
            ResourceKind::MeshBuffer => "mesh buffer",
        };
        f.write_str(name)
    }
}

/// A front-end resource the device can reconcile.
pub trait GpuResource: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn label(&self) -> Option<&str>;

    /// Current dirty mask.
    fn dirty_flags(&self) -> DirtyFlags;

    fn is_dirty(&self) -> bool {
        !self.dirty_flags().is_empty()
    }

    /// Reconcile the native object with the logical state.
    ///
    /// Takes the state lock, then the native lock, for the whole
    /// reconciliation. The dirty mask is cleared only on success.
    fn upload(&self, ctx: &UploadContext<'_>) -> Result<(), GraphicsError>;
}

/// Logical state carrying a dirty mask.
pub(crate) trait ResourceState {
    fn dirty_mut(&mut self) -> &mut DirtyFlags;
}

/// Shared body of every `GpuResource::upload`.
pub(crate) fn upload_locked<S, N>(
    state: &Mutex<S>,
    native: &Mutex<Box<N>>,
    upload: impl FnOnce(&mut N, &S) -> Result<(), GraphicsError>,
) -> Result<(), GraphicsError>
where
    S: ResourceState,
    N: ?Sized,
{
    let mut state = state.lock();
    if state.dirty_mut().is_empty() {
        return Ok(());
    }
    let mut native = native.lock();
    upload(&mut **native, &state)?;
    *state.dirty_mut() = DirtyFlags::empty();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        dirty: DirtyFlags,
    }

    impl ResourceState for Counter {
        fn dirty_mut(&mut self) -> &mut DirtyFlags {
            &mut self.dirty
        }
    }

    #[test]
    fn test_upload_locked_clears_on_success() {
        let state = Mutex::new(Counter {
            dirty: DirtyFlags::DATA,
        });
        let native: Mutex<Box<u32>> = Mutex::new(Box::new(0));
        upload_locked(&state, &native, |n, _| {
            *n += 1;
            Ok(())
        })
        .unwrap();
        assert!(state.lock().dirty.is_empty());
        assert_eq!(**native.lock(), 1);

        // Clean state does no work.
        upload_locked(&state, &native, |n, _| {
            *n += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(**native.lock(), 1);
    }

    #[test]
    fn test_upload_locked_keeps_bits_on_failure() {
        let state = Mutex::new(Counter {
            dirty: DirtyFlags::DATA | DirtyFlags::SIZE,
        });
        let native: Mutex<Box<u32>> = Mutex::new(Box::new(0));
        let result = upload_locked(&state, &native, |_, _| Err(GraphicsError::DeviceLost));
        assert_eq!(result, Err(GraphicsError::DeviceLost));
        assert_eq!(state.lock().dirty, DirtyFlags::DATA | DirtyFlags::SIZE);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ResourceKind::MeshBuffer.to_string(), "mesh buffer");
    }
}

//! Index and vertex buffer resource.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{BufferBackend, BufferBinding, UploadContext};
use crate::device::RenderDevice;
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, BufferUsage};

use super::{DirtyFlags, GpuResource, ResourceKind, ResourceState, upload_locked};

/// Logical state of a [`Buffer`].
#[derive(Debug, Clone)]
pub struct BufferState {
    usage: BufferUsage,
    dynamic: bool,
    data: Vec<u8>,
    dirty: DirtyFlags,
}

impl BufferState {
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }
}

impl ResourceState for BufferState {
    fn dirty_mut(&mut self) -> &mut DirtyFlags {
        &mut self.dirty
    }
}

/// An index or vertex buffer.
///
/// Buffers are created by [`RenderDevice::create_buffer`] and are reference-counted.
/// They hold a weak reference back to their parent device.
///
/// # Example
///
/// ```ignore
/// let buffer = device.create_buffer(
///     &BufferDescriptor::vertex().with_dynamic(true).with_typed_data(&vertices),
/// )?;
/// buffer.set_typed_data(&moved_vertices)?;
/// ```
pub struct Buffer {
    device: Weak<RenderDevice>,
    label: Option<String>,
    max_size: u64,
    state: Mutex<BufferState>,
    native: Mutex<Box<dyn BufferBackend>>,
}

impl Buffer {
    /// Create a new buffer (called by RenderDevice).
    pub(crate) fn new(
        device: Weak<RenderDevice>,
        descriptor: &BufferDescriptor,
        native: Box<dyn BufferBackend>,
        max_size: u64,
    ) -> Result<Self, GraphicsError> {
        check_size(descriptor.data.len(), max_size)?;
        Ok(Self {
            device,
            label: descriptor.label.clone(),
            max_size,
            state: Mutex::new(BufferState {
                usage: descriptor.usage,
                dynamic: descriptor.dynamic,
                data: descriptor.data.clone(),
                dirty: DirtyFlags::DATA | DirtyFlags::SIZE,
            }),
            native: Mutex::new(native),
        })
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<RenderDevice>> {
        self.device.upgrade()
    }

    pub(crate) fn device_ptr(&self) -> *const RenderDevice {
        self.device.as_ptr()
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn usage(&self) -> BufferUsage {
        self.state.lock().usage
    }

    pub fn is_dynamic(&self) -> bool {
        self.state.lock().dynamic
    }

    /// Get the logical size in bytes.
    pub fn size(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Copy of the logical contents.
    pub fn data(&self) -> Vec<u8> {
        self.state.lock().data.clone()
    }

    /// Replace the contents.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if `data` exceeds the
    /// device's maximum buffer size.
    pub fn set_data(&self, data: &[u8]) -> Result<(), GraphicsError> {
        check_size(data.len(), self.max_size)?;
        let mut state = self.state.lock();
        state.data.clear();
        state.data.extend_from_slice(data);
        state.dirty |= DirtyFlags::DATA;
        Ok(())
    }

    /// Replace the contents with typed elements.
    pub fn set_typed_data<T: bytemuck::Pod>(&self, data: &[T]) -> Result<(), GraphicsError> {
        self.set_data(bytemuck::cast_slice(data))
    }

    /// Change the logical size, zero-extending or truncating the contents.
    ///
    /// The next upload recreates the native buffer at the new size, even when
    /// shrinking.
    pub fn resize(&self, size: usize) -> Result<(), GraphicsError> {
        check_size(size, self.max_size)?;
        let mut state = self.state.lock();
        state.data.resize(size, 0);
        state.dirty |= DirtyFlags::SIZE | DirtyFlags::DATA;
        Ok(())
    }

    /// Current native binding, `None` before the first successful upload.
    pub fn native_binding(&self) -> Option<BufferBinding> {
        self.native.lock().binding()
    }

    /// Copy of the native contents.
    pub fn read_native(&self) -> Option<Vec<u8>> {
        self.native.lock().read_back()
    }
}

fn check_size(len: usize, max_size: u64) -> Result<(), GraphicsError> {
    if len as u64 > max_size {
        return Err(GraphicsError::InvalidParameter(format!(
            "buffer size {len} exceeds maximum {max_size}"
        )));
    }
    Ok(())
}

impl GpuResource for Buffer {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Buffer
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

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Buffer")
            .field("size", &state.data.len())
            .field("usage", &state.usage)
            .field("dynamic", &state.dynamic)
            .field("dirty", &state.dirty)
            .field("label", &self.label)
            .finish()
    }
}

// Ensure Buffer is Send + Sync
static_assertions::assert_impl_all!(Buffer: Send, Sync);

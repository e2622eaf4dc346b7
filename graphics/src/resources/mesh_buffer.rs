//! Mesh buffer resource.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{MeshBufferBackend, MeshLayout, UploadContext};
use crate::device::RenderDevice;
use crate::error::GraphicsError;
use crate::types::{BufferUsage, MeshBufferDescriptor, VertexAttribute, vertex_stride};

use super::{Buffer, DirtyFlags, GpuResource, ResourceKind, ResourceState, upload_locked};

/// Logical state of a [`MeshBuffer`].
#[derive(Debug, Clone)]
pub struct MeshBufferState {
    index_size: u32,
    index_buffer: Arc<Buffer>,
    vertex_buffer: Arc<Buffer>,
    vertex_attributes: Vec<VertexAttribute>,
    dirty: DirtyFlags,
}

impl MeshBufferState {
    pub fn index_size(&self) -> u32 {
        self.index_size
    }

    pub fn index_buffer(&self) -> &Arc<Buffer> {
        &self.index_buffer
    }

    pub fn vertex_buffer(&self) -> &Arc<Buffer> {
        &self.vertex_buffer
    }

    pub fn vertex_attributes(&self) -> &[VertexAttribute] {
        &self.vertex_attributes
    }

    /// Bytes per interleaved vertex.
    pub fn vertex_stride(&self) -> u32 {
        vertex_stride(&self.vertex_attributes)
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }
}

impl ResourceState for MeshBufferState {
    fn dirty_mut(&mut self) -> &mut DirtyFlags {
        &mut self.dirty
    }
}

/// Pairs an index buffer and a vertex buffer with a vertex layout.
pub struct MeshBuffer {
    device: Weak<RenderDevice>,
    label: Option<String>,
    state: Mutex<MeshBufferState>,
    native: Mutex<Box<dyn MeshBufferBackend>>,
    // Index and vertex buffers as of the last successful upload. Written
    // only by `upload`, after the native layout.
    uploaded: Mutex<Option<(Arc<Buffer>, Arc<Buffer>)>>,
}

impl MeshBuffer {
    /// Create a new mesh buffer (called by RenderDevice).
    pub(crate) fn new(
        device: Weak<RenderDevice>,
        descriptor: &MeshBufferDescriptor,
        native: Box<dyn MeshBufferBackend>,
    ) -> Result<Self, GraphicsError> {
        check_index_size(descriptor.index_size)?;
        check_usage(&descriptor.index_buffer, BufferUsage::Index)?;
        check_usage(&descriptor.vertex_buffer, BufferUsage::Vertex)?;
        Ok(Self {
            device,
            label: descriptor.label.clone(),
            state: Mutex::new(MeshBufferState {
                index_size: descriptor.index_size,
                index_buffer: Arc::clone(&descriptor.index_buffer),
                vertex_buffer: Arc::clone(&descriptor.vertex_buffer),
                vertex_attributes: descriptor.vertex_attributes.clone(),
                dirty: DirtyFlags::PARAMETERS,
            }),
            native: Mutex::new(native),
            uploaded: Mutex::new(None),
        })
    }

    /// Get the parent device, if it still exists.
    pub fn device(&self) -> Option<Arc<RenderDevice>> {
        self.device.upgrade()
    }

    pub(crate) fn device_ptr(&self) -> *const RenderDevice {
        self.device.as_ptr()
    }

    /// Get the mesh buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn index_size(&self) -> u32 {
        self.state.lock().index_size
    }

    pub fn index_buffer(&self) -> Arc<Buffer> {
        Arc::clone(&self.state.lock().index_buffer)
    }

    pub fn vertex_buffer(&self) -> Arc<Buffer> {
        Arc::clone(&self.state.lock().vertex_buffer)
    }

    /// Set bytes per index.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] unless `size` is 2 or 4.
    pub fn set_index_size(&self, size: u32) -> Result<(), GraphicsError> {
        check_index_size(size)?;
        let mut state = self.state.lock();
        state.index_size = size;
        state.dirty |= DirtyFlags::PARAMETERS;
        Ok(())
    }

    /// Replace the index buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::IncompatibleUsage`] for a vertex buffer or a
    /// buffer created by another device.
    pub fn set_index_buffer(&self, buffer: Arc<Buffer>) -> Result<(), GraphicsError> {
        check_usage(&buffer, BufferUsage::Index)?;
        self.check_owner(&buffer)?;
        let mut state = self.state.lock();
        state.index_buffer = buffer;
        state.dirty |= DirtyFlags::PARAMETERS;
        Ok(())
    }

    /// Replace the vertex buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::IncompatibleUsage`] for an index buffer or a
    /// buffer created by another device.
    pub fn set_vertex_buffer(&self, buffer: Arc<Buffer>) -> Result<(), GraphicsError> {
        check_usage(&buffer, BufferUsage::Vertex)?;
        self.check_owner(&buffer)?;
        let mut state = self.state.lock();
        state.vertex_buffer = buffer;
        state.dirty |= DirtyFlags::PARAMETERS;
        Ok(())
    }

    pub fn set_vertex_attributes(&self, attributes: Vec<VertexAttribute>) {
        let mut state = self.state.lock();
        state.vertex_attributes = attributes;
        state.dirty |= DirtyFlags::PARAMETERS;
    }

    /// Index and vertex buffers the native layout was last built for.
    ///
    /// Setters called after that upload are not observed until the next one.
    pub(crate) fn uploaded_buffers(&self) -> Option<(Arc<Buffer>, Arc<Buffer>)> {
        self.uploaded.lock().clone()
    }

    pub(crate) fn native_layout(&self) -> Option<MeshLayout> {
        self.native.lock().layout()
    }

    fn check_owner(&self, buffer: &Buffer) -> Result<(), GraphicsError> {
        if !std::ptr::eq(buffer.device_ptr(), self.device_ptr()) {
            return Err(GraphicsError::IncompatibleUsage(format!(
                "buffer {:?} belongs to another device",
                buffer.label()
            )));
        }
        Ok(())
    }
}

fn check_index_size(size: u32) -> Result<(), GraphicsError> {
    if size != 2 && size != 4 {
        return Err(GraphicsError::InvalidParameter(format!(
            "index size must be 2 or 4, got {size}"
        )));
    }
    Ok(())
}

fn check_usage(buffer: &Buffer, expected: BufferUsage) -> Result<(), GraphicsError> {
    let usage = buffer.usage();
    if usage != expected {
        return Err(GraphicsError::IncompatibleUsage(format!(
            "{usage:?} buffer {:?} bound as {expected:?} buffer",
            buffer.label()
        )));
    }
    Ok(())
}

impl GpuResource for MeshBuffer {
    fn kind(&self) -> ResourceKind {
        ResourceKind::MeshBuffer
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn dirty_flags(&self) -> DirtyFlags {
        self.state.lock().dirty
    }

    fn upload(&self, ctx: &UploadContext<'_>) -> Result<(), GraphicsError> {
        upload_locked(&self.state, &self.native, |native, state| {
            native.upload(state, ctx)?;
            *self.uploaded.lock() = Some((
                Arc::clone(&state.index_buffer),
                Arc::clone(&state.vertex_buffer),
            ));
            Ok(())
        })
    }
}

impl std::fmt::Debug for MeshBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MeshBuffer")
            .field("index_size", &state.index_size)
            .field("attributes", &state.vertex_attributes.len())
            .field("dirty", &state.dirty)
            .field("label", &self.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(MeshBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferBackend, BufferBinding};
    use crate::resources::BufferState;
    use crate::types::BufferDescriptor;

    struct NullBuffer;

    impl BufferBackend for NullBuffer {
        fn upload(&mut self, _: &BufferState, _: &UploadContext<'_>) -> Result<(), GraphicsError> {
            Ok(())
        }

        fn binding(&self) -> Option<BufferBinding> {
            None
        }

        fn read_back(&self) -> Option<Vec<u8>> {
            None
        }
    }

    struct NullMesh;

    impl MeshBufferBackend for NullMesh {
        fn upload(&mut self, _: &MeshBufferState, _: &UploadContext<'_>) -> Result<(), GraphicsError> {
            Ok(())
        }

        fn layout(&self) -> Option<MeshLayout> {
            None
        }
    }

    fn buffer(descriptor: BufferDescriptor) -> Arc<Buffer> {
        Arc::new(Buffer::new(Weak::new(), &descriptor, Box::new(NullBuffer), 1 << 20).unwrap())
    }

    fn mesh() -> MeshBuffer {
        let desc = MeshBufferDescriptor::new(
            2,
            buffer(BufferDescriptor::index()),
            buffer(BufferDescriptor::vertex()),
            Vec::new(),
        );
        MeshBuffer::new(Weak::new(), &desc, Box::new(NullMesh)).unwrap()
    }

    #[test]
    fn test_index_size_validation() {
        let mesh = mesh();
        assert!(mesh.set_index_size(3).is_err());
        assert_eq!(mesh.index_size(), 2);
        mesh.set_index_size(4).unwrap();
        assert_eq!(mesh.index_size(), 4);
    }

    #[test]
    fn test_buffer_usage_must_match() {
        let mesh = mesh();
        mesh.state.lock().dirty = DirtyFlags::empty();

        let vertices = buffer(BufferDescriptor::vertex());
        assert!(matches!(
            mesh.set_index_buffer(Arc::clone(&vertices)),
            Err(GraphicsError::IncompatibleUsage(_))
        ));
        assert!(matches!(
            mesh.set_vertex_buffer(buffer(BufferDescriptor::index())),
            Err(GraphicsError::IncompatibleUsage(_))
        ));
        assert!(!mesh.is_dirty());

        mesh.set_vertex_buffer(Arc::clone(&vertices)).unwrap();
        assert!(Arc::ptr_eq(&mesh.vertex_buffer(), &vertices));
        assert_eq!(mesh.dirty_flags(), DirtyFlags::PARAMETERS);
    }

    #[test]
    fn test_descriptor_usage_checked() {
        let desc = MeshBufferDescriptor::new(
            2,
            buffer(BufferDescriptor::vertex()),
            buffer(BufferDescriptor::vertex()),
            Vec::new(),
        );
        assert!(MeshBuffer::new(Weak::new(), &desc, Box::new(NullMesh)).is_err());
    }
}

//! OpenGL buffer implementation.

use std::sync::Arc;

use crate::backend::{
    BufferBackend, BufferBinding, StorageClass, UploadContext, needs_reallocation,
};
use crate::error::GraphicsError;
use crate::resources::BufferState;
use crate::types::BufferUsage;

use super::context::GlContext;
use super::conversion::{GL_ARRAY_BUFFER, GL_DYNAMIC_DRAW, GL_ELEMENT_ARRAY_BUFFER, GL_STATIC_DRAW};

/// Native side of a buffer.
///
/// Storage is respecified only when the payload outgrows it or the size is
/// marked dirty. Otherwise the old storage is orphaned and the contents are
/// replaced with `glBufferSubData`, so no byte of an earlier payload survives
/// past the new one.
pub struct GlBuffer {
    context: Arc<GlContext>,
    allocation: Option<BufferBinding>,
    usage: u32,
}

impl GlBuffer {
    pub(crate) fn new(context: Arc<GlContext>) -> Self {
        Self {
            context,
            allocation: None,
            usage: 0,
        }
    }

    fn release(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.context.defer_delete(allocation.handle);
        }
    }
}

impl BufferBackend for GlBuffer {
    fn upload(&mut self, state: &BufferState, _ctx: &UploadContext<'_>) -> Result<(), GraphicsError> {
        let data = state.data();
        if data.is_empty() {
            self.release();
            return Ok(());
        }

        let usage = if state.is_dynamic() {
            GL_DYNAMIC_DRAW
        } else {
            GL_STATIC_DRAW
        };
        let current = self
            .allocation
            .filter(|_| self.usage == usage)
            .map(|a| a.capacity);
        let requested = data.len() as u64;

        if needs_reallocation(current, requested, state.dirty(), false) {
            let target = match state.usage() {
                BufferUsage::Index => GL_ELEMENT_ARRAY_BUFFER,
                BufferUsage::Vertex => GL_ARRAY_BUFFER,
            };
            let handle = self.context.gen_buffer();
            if let Err(err) = self
                .context
                .buffer_data(handle, target, data.len(), Some(data), usage)
            {
                self.context.delete(handle);
                return Err(err.into_error("glBufferData"));
            }
            self.release();
            log::trace!(
                "GL: created {:?} buffer {:?} of {} bytes",
                state.usage(),
                handle,
                requested
            );
            self.usage = usage;
            self.allocation = Some(BufferBinding {
                handle,
                capacity: requested,
                len: requested,
                storage: StorageClass::Dynamic,
            });
        } else if let Some(allocation) = self.allocation.as_mut() {
            self.context
                .invalidate_buffer_data(allocation.handle)
                .map_err(|err| err.into_error("glInvalidateBufferData"))?;
            self.context
                .buffer_sub_data(allocation.handle, 0, data)
                .map_err(|err| err.into_error("glBufferSubData"))?;
            allocation.len = requested;
        }
        Ok(())
    }

    fn binding(&self) -> Option<BufferBinding> {
        self.allocation
    }

    fn read_back(&self) -> Option<Vec<u8>> {
        self.context.read_buffer(self.allocation?.handle)
    }
}

impl Drop for GlBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

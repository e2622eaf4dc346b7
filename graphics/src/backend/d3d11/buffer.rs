//! Direct3D 11 buffer implementation.

use std::sync::Arc;

use crate::backend::{
    BufferBackend, BufferBinding, StorageClass, UploadContext, needs_reallocation,
};
use crate::error::GraphicsError;
use crate::resources::BufferState;
use crate::types::BufferUsage;

use super::device::{BindFlags, BufferDesc, D3d11Device, MapType, Usage};

/// Native side of a buffer.
///
/// Static buffers are immutable and recreated on every data change; dynamic
/// buffers are updated in place with discard maps while the payload fits.
pub struct D3d11Buffer {
    device: Arc<D3d11Device>,
    allocation: Option<BufferBinding>,
}

impl D3d11Buffer {
    pub(crate) fn new(device: Arc<D3d11Device>) -> Self {
        Self {
            device,
            allocation: None,
        }
    }

    fn release(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.device.defer_release(allocation.handle);
        }
    }
}

impl BufferBackend for D3d11Buffer {
    fn upload(&mut self, state: &BufferState, _ctx: &UploadContext<'_>) -> Result<(), GraphicsError> {
        let data = state.data();
        if data.is_empty() {
            self.release();
            return Ok(());
        }

        let storage = if state.is_dynamic() {
            StorageClass::Dynamic
        } else {
            StorageClass::Immutable
        };
        let current = self
            .allocation
            .filter(|a| a.storage == storage)
            .map(|a| a.capacity);
        let requested = data.len() as u64;

        if needs_reallocation(
            current,
            requested,
            state.dirty(),
            storage == StorageClass::Immutable,
        ) {
            let desc = BufferDesc {
                byte_width: data.len() as u32,
                usage: match storage {
                    StorageClass::Dynamic => Usage::Dynamic,
                    _ => Usage::Immutable,
                },
                bind_flags: match state.usage() {
                    BufferUsage::Index => BindFlags::INDEX_BUFFER,
                    BufferUsage::Vertex => BindFlags::VERTEX_BUFFER,
                },
                cpu_write: storage == StorageClass::Dynamic,
            };
            let handle = self
                .device
                .create_buffer(&desc, Some(data))
                .map_err(|hr| hr.into_error("CreateBuffer"))?;
            self.release();
            log::trace!(
                "D3D11: created {:?} buffer {:?} of {} bytes",
                state.usage(),
                handle,
                requested
            );
            self.allocation = Some(BufferBinding {
                handle,
                capacity: requested,
                len: requested,
                storage,
            });
        } else if let Some(allocation) = self.allocation.as_mut() {
            self.device
                .map_write(allocation.handle, 0, MapType::WriteDiscard, |dst, _| {
                    dst[..data.len()].copy_from_slice(data);
                })
                .map_err(|hr| hr.into_error("Map"))?;
            allocation.len = requested;
        }
        Ok(())
    }

    fn binding(&self) -> Option<BufferBinding> {
        self.allocation
    }

    fn read_back(&self) -> Option<Vec<u8>> {
        self.device.read_buffer(self.allocation?.handle)
    }
}

impl Drop for D3d11Buffer {
    fn drop(&mut self) {
        self.release();
    }
}

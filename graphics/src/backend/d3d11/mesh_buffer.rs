//! Direct3D 11 mesh buffer implementation.
//!
//! D3D11 has no object tying index and vertex buffers together; the layout
//! resolves to an index format and a vertex stride bound at draw time.

use crate::backend::{MeshBufferBackend, MeshLayout, UploadContext};
use crate::error::GraphicsError;
use crate::resources::MeshBufferState;

use super::conversion::convert_index_format;

#[derive(Default)]
pub struct D3d11MeshBuffer {
    layout: Option<MeshLayout>,
}

impl D3d11MeshBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl MeshBufferBackend for D3d11MeshBuffer {
    fn upload(
        &mut self,
        state: &MeshBufferState,
        _ctx: &UploadContext<'_>,
    ) -> Result<(), GraphicsError> {
        let index_format = convert_index_format(state.index_size()).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("index size {}", state.index_size()))
        })?;
        self.layout = Some(MeshLayout {
            handle: None,
            index_size: state.index_size(),
            index_format: index_format.0,
            vertex_stride: state.vertex_stride(),
        });
        Ok(())
    }

    fn layout(&self) -> Option<MeshLayout> {
        self.layout
    }
}

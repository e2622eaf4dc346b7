//! OpenGL mesh buffer implementation.

use std::sync::Arc;

use crate::backend::{MeshBufferBackend, MeshLayout, UploadContext};
use crate::error::GraphicsError;
use crate::resources::MeshBufferState;

use super::context::{GlContext, VertexAttribPointer};
use super::conversion::{convert_attribute_format, convert_index_type};

/// Native side of a mesh buffer: a vertex array object describing the
/// interleaved layout. Buffer names are bound at draw time, so reallocated
/// buffers need no new vertex array.
pub struct GlMeshBuffer {
    context: Arc<GlContext>,
    layout: Option<MeshLayout>,
}

impl GlMeshBuffer {
    pub(crate) fn new(context: Arc<GlContext>) -> Self {
        Self {
            context,
            layout: None,
        }
    }
}

impl MeshBufferBackend for GlMeshBuffer {
    fn upload(
        &mut self,
        state: &MeshBufferState,
        _ctx: &UploadContext<'_>,
    ) -> Result<(), GraphicsError> {
        let index_type = convert_index_type(state.index_size()).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("index size {}", state.index_size()))
        })?;

        let mut offset = 0;
        let attributes: Vec<VertexAttribPointer> = state
            .vertex_attributes()
            .iter()
            .enumerate()
            .map(|(index, attribute)| {
                let (components, component_type, normalized) =
                    convert_attribute_format(attribute.format);
                let pointer = VertexAttribPointer {
                    index: index as u32,
                    components,
                    component_type,
                    normalized,
                    offset,
                };
                offset += attribute.format.size();
                pointer
            })
            .collect();

        let stride = state.vertex_stride();
        let vertex_array = self
            .context
            .create_vertex_array(&attributes, stride)
            .map_err(|err| err.into_error("glVertexAttribPointer"))?;
        let previous = self.layout.replace(MeshLayout {
            handle: Some(vertex_array),
            index_size: state.index_size(),
            index_format: index_type,
            vertex_stride: stride,
        });
        if let Some(handle) = previous.and_then(|layout| layout.handle) {
            self.context.defer_delete(handle);
        }
        Ok(())
    }

    fn layout(&self) -> Option<MeshLayout> {
        self.layout
    }
}

impl Drop for GlMeshBuffer {
    fn drop(&mut self) {
        if let Some(handle) = self.layout.take().and_then(|layout| layout.handle) {
            self.context.defer_delete(handle);
        }
    }
}

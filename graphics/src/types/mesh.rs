//! Mesh buffer descriptor.

use std::sync::Arc;

use crate::resources::Buffer;

use super::VertexAttribute;

/// Descriptor for creating a mesh buffer.
#[derive(Debug, Clone)]
pub struct MeshBufferDescriptor {
    /// Debug label for the mesh buffer.
    pub label: Option<String>,
    /// Bytes per index, 2 or 4.
    pub index_size: u32,
    pub index_buffer: Arc<Buffer>,
    pub vertex_buffer: Arc<Buffer>,
    pub vertex_attributes: Vec<VertexAttribute>,
}

impl MeshBufferDescriptor {
    pub fn new(
        index_size: u32,
        index_buffer: Arc<Buffer>,
        vertex_buffer: Arc<Buffer>,
        vertex_attributes: Vec<VertexAttribute>,
    ) -> Self {
        Self {
            label: None,
            index_size,
            index_buffer,
            vertex_buffer,
            vertex_attributes,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

//! Buffer types and descriptors.

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Index data for indexed draws.
    Index,
    /// Vertex data.
    Vertex,
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Binding kind.
    pub usage: BufferUsage,
    /// Whether the contents change after creation.
    ///
    /// Dynamic buffers are updated in place; static buffers are recreated on
    /// every data change.
    pub dynamic: bool,
    /// Initial contents.
    pub data: Vec<u8>,
}

impl BufferDescriptor {
    /// Create an empty, static buffer descriptor.
    pub fn new(usage: BufferUsage) -> Self {
        Self {
            label: None,
            usage,
            dynamic: false,
            data: Vec::new(),
        }
    }

    /// Create a descriptor for a vertex buffer.
    pub fn vertex() -> Self {
        Self::new(BufferUsage::Vertex)
    }

    /// Create a descriptor for an index buffer.
    pub fn index() -> Self {
        Self::new(BufferUsage::Index)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Mark the buffer as dynamic.
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Set the initial contents.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Set the initial contents from typed elements.
    pub fn with_typed_data<T: bytemuck::Pod>(self, data: &[T]) -> Self {
        self.with_data(bytemuck::cast_slice::<T, u8>(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_descriptor() {
        let desc = BufferDescriptor::vertex()
            .with_label("quad")
            .with_dynamic(true)
            .with_data(vec![1, 2, 3]);
        assert_eq!(desc.usage, BufferUsage::Vertex);
        assert!(desc.dynamic);
        assert_eq!(desc.data, vec![1, 2, 3]);
        assert_eq!(desc.label.as_deref(), Some("quad"));
    }

    #[test]
    fn test_typed_data() {
        let desc = BufferDescriptor::index().with_typed_data(&[1u16, 2, 3]);
        assert_eq!(desc.data, vec![1, 0, 2, 0, 3, 0]);
    }
}

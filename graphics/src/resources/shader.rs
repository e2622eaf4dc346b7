//! Shader resource.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::backend::{ShaderBackend, ShaderBinding, UploadContext};
use crate::device::RenderDevice;
use crate::error::GraphicsError;
use crate::types::{ShaderDescriptor, ShaderUniform, VertexAttribute};

use super::{DirtyFlags, GpuResource, ResourceKind, ResourceState, upload_locked};

/// Logical state of a [`Shader`].
#[derive(Debug, Clone)]
pub struct ShaderState {
    pixel_bytecode: Vec<u8>,
    vertex_bytecode: Vec<u8>,
    pixel_entry: String,
    vertex_entry: String,
    vertex_attributes: Vec<VertexAttribute>,
    pixel_uniforms: Vec<ShaderUniform>,
    vertex_uniforms: Vec<ShaderUniform>,
    dirty: DirtyFlags,
}

impl ShaderState {
    pub fn pixel_bytecode(&self) -> &[u8] {
        &self.pixel_bytecode
    }

    pub fn vertex_bytecode(&self) -> &[u8] {
        &self.vertex_bytecode
    }

    pub fn pixel_entry(&self) -> &str {
        &self.pixel_entry
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    pub fn vertex_attributes(&self) -> &[VertexAttribute] {
        &self.vertex_attributes
    }

    pub fn pixel_uniforms(&self) -> &[ShaderUniform] {
        &self.pixel_uniforms
    }

    pub fn vertex_uniforms(&self) -> &[ShaderUniform] {
        &self.vertex_uniforms
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }
}

impl ResourceState for ShaderState {
    fn dirty_mut(&mut self) -> &mut DirtyFlags {
        &mut self.dirty
    }
}

/// A pixel and vertex shader pair with their constant declarations.
pub struct Shader {
    device: Weak<RenderDevice>,
    label: Option<String>,
    state: Mutex<ShaderState>,
    native: Mutex<Box<dyn ShaderBackend>>,
}

impl Shader {
    /// Create a new shader (called by RenderDevice).
    pub(crate) fn new(
        device: Weak<RenderDevice>,
        descriptor: &ShaderDescriptor,
        native: Box<dyn ShaderBackend>,
    ) -> Result<Self, GraphicsError> {
        validate_sources(descriptor)?;
        Ok(Self {
            device,
            label: descriptor.label.clone(),
            state: Mutex::new(ShaderState {
                pixel_bytecode: descriptor.pixel_bytecode.clone(),
                vertex_bytecode: descriptor.vertex_bytecode.clone(),
                pixel_entry: descriptor.pixel_entry.clone(),
                vertex_entry: descriptor.vertex_entry.clone(),
                vertex_attributes: descriptor.vertex_attributes.clone(),
                pixel_uniforms: descriptor.pixel_uniforms.clone(),
                vertex_uniforms: descriptor.vertex_uniforms.clone(),
                dirty: DirtyFlags::DATA | DirtyFlags::PARAMETERS,
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

    /// Get the shader label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn vertex_attributes(&self) -> Vec<VertexAttribute> {
        self.state.lock().vertex_attributes.clone()
    }

    pub fn pixel_uniforms(&self) -> Vec<ShaderUniform> {
        self.state.lock().pixel_uniforms.clone()
    }

    pub fn vertex_uniforms(&self) -> Vec<ShaderUniform> {
        self.state.lock().vertex_uniforms.clone()
    }

    /// Replace byte code, entry points, attributes and constant declarations.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] for empty byte code or entry
    /// points; the shader is left unchanged.
    pub fn set_sources(&self, descriptor: &ShaderDescriptor) -> Result<(), GraphicsError> {
        validate_sources(descriptor)?;
        let mut state = self.state.lock();
        state.pixel_bytecode = descriptor.pixel_bytecode.clone();
        state.vertex_bytecode = descriptor.vertex_bytecode.clone();
        state.pixel_entry = descriptor.pixel_entry.clone();
        state.vertex_entry = descriptor.vertex_entry.clone();
        state.vertex_attributes = descriptor.vertex_attributes.clone();
        state.pixel_uniforms = descriptor.pixel_uniforms.clone();
        state.vertex_uniforms = descriptor.vertex_uniforms.clone();
        state.dirty |= DirtyFlags::DATA | DirtyFlags::PARAMETERS;
        Ok(())
    }

    pub(crate) fn native_binding(&self) -> Option<ShaderBinding> {
        self.native.lock().binding()
    }
}

fn validate_sources(descriptor: &ShaderDescriptor) -> Result<(), GraphicsError> {
    if descriptor.pixel_bytecode.is_empty() || descriptor.vertex_bytecode.is_empty() {
        return Err(GraphicsError::InvalidParameter(
            "shader byte code must not be empty".to_string(),
        ));
    }
    if descriptor.pixel_entry.is_empty() || descriptor.vertex_entry.is_empty() {
        return Err(GraphicsError::InvalidParameter(
            "shader entry point must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl GpuResource for Shader {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Shader
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

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Shader")
            .field("pixel_entry", &state.pixel_entry)
            .field("vertex_entry", &state.vertex_entry)
            .field("dirty", &state.dirty)
            .field("label", &self.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Shader: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UniformKind;

    struct NullShader;

    impl ShaderBackend for NullShader {
        fn upload(&mut self, _: &ShaderState, _: &UploadContext<'_>) -> Result<(), GraphicsError> {
            Ok(())
        }

        fn binding(&self) -> Option<ShaderBinding> {
            None
        }
    }

    #[test]
    fn test_empty_bytecode_rejected() {
        let result = Shader::new(
            Weak::new(),
            &ShaderDescriptor::new(Vec::new(), vec![1]),
            Box::new(NullShader),
        );
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_set_sources() {
        let shader = Shader::new(
            Weak::new(),
            &ShaderDescriptor::new(vec![1], vec![2]),
            Box::new(NullShader),
        )
        .unwrap();
        shader.state.lock().dirty = DirtyFlags::empty();

        let desc = ShaderDescriptor::new(vec![3, 4], vec![5])
            .with_pixel_uniforms(vec![ShaderUniform::new("color", UniformKind::Float4)]);
        shader.set_sources(&desc).unwrap();
        assert_eq!(shader.dirty_flags(), DirtyFlags::DATA | DirtyFlags::PARAMETERS);
        assert_eq!(shader.pixel_uniforms().len(), 1);

        assert!(shader.set_sources(&ShaderDescriptor::new(vec![1], Vec::new())).is_err());
        assert_eq!(shader.pixel_uniforms().len(), 1);
    }
}

//! Common utilities for pipeline integration tests.
//!
//! This module provides shared test infrastructure that can be reused
//! across different backend implementations.

use std::sync::Arc;

use tessera_graphics::{
    AttributeFormat, BackendType, BlendDescriptor, BlendState, Buffer, BufferDescriptor,
    DeviceConfig, HeadlessHost, MeshBuffer, MeshBufferDescriptor, RenderDevice, Shader,
    ShaderDescriptor, ShaderUniform, UniformKind, VertexAttribute, VertexUsage,
};
use tessera_core::math::Size2;

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Direct3D 11 style device.
    D3d11,
    /// OpenGL style context.
    OpenGl,
}

impl Backend {
    /// Check if this backend was compiled in.
    pub fn is_available(&self) -> bool {
        self.backend_type().is_available()
    }

    pub fn backend_type(&self) -> BackendType {
        match self {
            Backend::D3d11 => BackendType::Direct3D11,
            Backend::OpenGl => BackendType::OpenGl,
        }
    }

    /// Native row pitch of a tightly packed source row of `row_bytes`.
    pub fn native_pitch(&self, row_bytes: u32) -> u32 {
        let alignment = match self {
            Backend::D3d11 => 16,
            Backend::OpenGl => 4,
        };
        row_bytes.div_ceil(alignment) * alignment
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Surface size every test device starts with.
pub const SURFACE: Size2 = Size2::new(64.0, 64.0);

/// Test context owning a device on a headless host.
pub struct TestContext {
    #[allow(dead_code)]
    pub backend: Backend,
    #[allow(dead_code)]
    pub host: Arc<HeadlessHost>,
    pub device: Arc<RenderDevice>,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not available.
    pub fn new(backend: Backend) -> Option<Self> {
        Self::with_config(backend, DeviceConfig::new())
    }

    pub fn with_config(backend: Backend, config: DeviceConfig) -> Option<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        if !backend.is_available() {
            return None;
        }

        let host = Arc::new(HeadlessHost::new(SURFACE));
        let device = RenderDevice::new(config.with_backend(backend.backend_type()), host.clone()).ok()?;
        Some(Self {
            backend,
            host,
            device,
        })
    }

    /// Create a dynamic vertex buffer holding `data`.
    #[allow(dead_code)]
    pub fn dynamic_vertex_buffer(&self, data: &[u8]) -> Arc<Buffer> {
        self.device
            .create_buffer(
                &BufferDescriptor::vertex()
                    .with_dynamic(true)
                    .with_data(data.to_vec()),
            )
            .unwrap()
    }

    /// Resources for drawing a two-triangle mesh with a tint constant.
    #[allow(dead_code)]
    pub fn create_scene(&self) -> Scene {
        let attributes = vec![
            VertexAttribute::new(VertexUsage::Position, AttributeFormat::Float3),
            VertexAttribute::new(VertexUsage::TexCoord0, AttributeFormat::Float2),
        ];
        let indices = self
            .device
            .create_buffer(
                &BufferDescriptor::index()
                    .with_label("quad indices")
                    .with_typed_data(&QUAD_INDICES),
            )
            .unwrap();
        let vertices = self
            .device
            .create_buffer(
                &BufferDescriptor::vertex()
                    .with_label("quad vertices")
                    .with_typed_data(&QUAD_VERTICES),
            )
            .unwrap();
        let mesh = self
            .device
            .create_mesh_buffer(
                &MeshBufferDescriptor::new(2, indices, vertices, attributes.clone())
                    .with_label("quad"),
            )
            .unwrap();
        let shader = self
            .device
            .create_shader(
                &ShaderDescriptor::new(b"tinted_ps".to_vec(), b"textured_vs".to_vec())
                    .with_label("tinted")
                    .with_vertex_attributes(attributes)
                    .with_pixel_uniforms(vec![ShaderUniform::new("tint", UniformKind::Float4)]),
            )
            .unwrap();
        let blend = self
            .device
            .create_blend_state(&BlendDescriptor::alpha_blend().with_label("alpha"));
        Scene {
            blend,
            shader,
            mesh,
        }
    }
}

/// Pipeline state for one draw.
#[allow(dead_code)]
pub struct Scene {
    pub blend: Arc<BlendState>,
    pub shader: Arc<Shader>,
    pub mesh: Arc<MeshBuffer>,
}

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Position and texture coordinate of each quad corner.
pub const QUAD_VERTICES: [f32; 20] = [
    -1.0, -1.0, 0.0, 0.0, 1.0, //
    1.0, -1.0, 0.0, 1.0, 1.0, //
    -1.0, 1.0, 0.0, 0.0, 0.0, //
    1.0, 1.0, 0.0, 1.0, 0.0,
];

// ============================================================================
// Data Helpers
// ============================================================================

/// Generate a byte pattern where every byte is distinct modulo 251.
#[allow(dead_code)]
pub fn generate_test_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Extract the first `row_bytes` of every row of an image stored at `pitch`.
#[allow(dead_code)]
pub fn unpitch(data: &[u8], pitch: u32, row_bytes: u32, height: u32) -> Vec<u8> {
    (0..height as usize)
        .flat_map(|row| {
            let start = row * pitch as usize;
            data[start..start + row_bytes as usize].iter().copied()
        })
        .collect()
}

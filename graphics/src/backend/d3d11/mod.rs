//! Direct3D 11 backend.
//!
//! Resources follow the D3D11 usage model: static data lives in immutable
//! resources that are recreated whenever their contents change, dynamic data
//! lives in CPU-writable resources updated through discard maps, and render
//! targets are GPU-only.

mod blend_state;
mod buffer;
pub mod conversion;
pub mod device;
mod mesh_buffer;
mod shader;
mod texture;

use std::sync::Arc;

use tessera_core::math::Size2;

use crate::backend::software::DISPLAY_MODES;
use crate::backend::{
    BackendStats, BlendStateBackend, BufferBackend, DrawRecord, FaultInjector, GpuBackend,
    MeshBufferBackend, NativeDrawCall, NativeHandle, ShaderBackend, TextureBackend,
};
use crate::config::{BackendType, DeviceConfig};
use crate::error::GraphicsError;
use crate::types::{MAX_ANISOTROPY, SamplerStateDescriptor};

use conversion::{
    convert_address_mode, convert_cull_mode, convert_draw_mode, convert_fill_mode, convert_filter,
};
use device::{D3d11Device, HResult, SamplerDesc};

pub use blend_state::D3d11BlendState;
pub use buffer::D3d11Buffer;
pub use mesh_buffer::D3d11MeshBuffer;
pub use shader::D3d11Shader;
pub use texture::D3d11Texture;

pub(crate) const BACKEND_NAME: &str = "Direct3D 11";

/// Direct3D 11 backend.
pub struct D3d11Backend {
    device: Arc<D3d11Device>,
}

impl D3d11Backend {
    /// Create the device and a swap chain of `width` x `height`.
    pub fn new(config: &DeviceConfig, width: u32, height: u32) -> Result<Self, GraphicsError> {
        let device = D3d11Device::new(width, height, config.depth, config.debug).map_err(|hr| {
            GraphicsError::InitializationFailed(format!(
                "D3D11CreateDeviceAndSwapChain failed with code 0x{:08X}",
                hr.0
            ))
        })?;
        log::debug!(
            "{} device created with a {}x{} swap chain (debug: {})",
            BACKEND_NAME,
            width,
            height,
            config.debug
        );
        Ok(Self {
            device: Arc::new(device),
        })
    }

    /// The underlying device.
    pub fn device(&self) -> &Arc<D3d11Device> {
        &self.device
    }
}

impl GpuBackend for D3d11Backend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Direct3D11
    }

    fn create_texture(&self) -> Box<dyn TextureBackend> {
        Box::new(D3d11Texture::new(Arc::clone(&self.device)))
    }

    fn create_buffer(&self) -> Box<dyn BufferBackend> {
        Box::new(D3d11Buffer::new(Arc::clone(&self.device)))
    }

    fn create_blend_state(&self) -> Box<dyn BlendStateBackend> {
        Box::new(D3d11BlendState::new(Arc::clone(&self.device)))
    }

    fn create_shader(&self) -> Box<dyn ShaderBackend> {
        Box::new(D3d11Shader::new(Arc::clone(&self.device)))
    }

    fn create_mesh_buffer(&self) -> Box<dyn MeshBufferBackend> {
        Box::new(D3d11MeshBuffer::new())
    }

    fn create_sampler(
        &self,
        descriptor: &SamplerStateDescriptor,
    ) -> Result<NativeHandle, GraphicsError> {
        let max_anisotropy = descriptor.max_anisotropy.clamp(1, MAX_ANISOTROPY);
        let desc = SamplerDesc {
            filter: convert_filter(descriptor.filter, max_anisotropy),
            address_u: convert_address_mode(descriptor.address_x),
            address_v: convert_address_mode(descriptor.address_y),
            max_anisotropy,
        };
        self.device
            .create_sampler_state(&desc)
            .map_err(|hr| hr.into_error("CreateSamplerState"))
    }

    fn resize_back_buffer(&self, width: u32, height: u32) -> Result<(), GraphicsError> {
        self.device.resize_buffers(width, height).map_err(|hr| {
            GraphicsError::BackBufferResizeFailed {
                width,
                height,
                code: hr.0,
            }
        })
    }

    fn draw(&self, call: &NativeDrawCall<'_>) -> Result<(), GraphicsError> {
        if !call.index_range_valid() || !call.constants_valid() {
            return Err(HResult::E_INVALIDARG.into_error("DrawIndexed"));
        }

        let mesh = &call.mesh;
        let mut handles = vec![
            call.blend_state,
            mesh.index_buffer.handle,
            mesh.vertex_buffer.handle,
        ];
        handles.extend(mesh.layout.handle);
        handles.extend(call.shader.handles.iter().copied());
        for texture in call.textures.iter().flatten() {
            handles.push(texture.view);
            handles.push(texture.sampler);
        }
        if let Some(target) = call.render_target {
            handles.push(target.target);
            handles.extend(target.depth);
        }

        let stages = [
            (call.pixel_constants, call.shader.pixel_constant_buffer),
            (call.vertex_constants, call.shader.vertex_constant_buffer),
        ];
        for (constants, buffer) in stages {
            if let (false, Some(buffer)) = (constants.is_empty(), buffer) {
                self.device
                    .update_constants(buffer, constants)
                    .map_err(|hr| hr.into_error("Map"))?;
            }
        }

        log::trace!(
            "DrawIndexed({}, {}) topology={} cull={} fill={} depth_test={} depth_write={} scissor={:?} viewport={:?}",
            call.index_count,
            call.start_index,
            convert_draw_mode(call.mode),
            convert_cull_mode(call.cull_mode),
            convert_fill_mode(call.fill_mode),
            call.depth_test,
            call.depth_write,
            call.scissor,
            call.viewport
        );
        self.device
            .draw_indexed(&handles, call.record())
            .map_err(|hr| hr.into_error("DrawIndexed"))
    }

    fn present(&self, sync_interval: u32) -> Result<(), GraphicsError> {
        self.device.present(sync_interval).map_err(|hr| match hr {
            HResult::DXGI_ERROR_DEVICE_REMOVED => GraphicsError::DeviceLost,
            HResult(code) => GraphicsError::PresentFailed { code },
        })
    }

    fn supported_resolutions(&self) -> Vec<Size2> {
        DISPLAY_MODES
            .iter()
            .map(|&(width, height)| Size2::from((width, height)))
            .collect()
    }

    fn flush_releases(&self) -> usize {
        self.device.flush_releases()
    }

    fn stats(&self) -> BackendStats {
        self.device.stats()
    }

    fn faults(&self) -> &FaultInjector {
        self.device.faults()
    }

    fn draw_log(&self) -> Vec<DrawRecord> {
        self.device.draw_log()
    }
}

//! Direct3D 11 shader implementation.

use std::sync::Arc;

use crate::backend::pitch::align_up;
use crate::backend::{NativeHandle, ShaderBackend, ShaderBinding, UploadContext};
use crate::error::GraphicsError;
use crate::resources::ShaderState;
use crate::types::ShaderUniform;

use super::conversion::{convert_attribute_format, convert_vertex_usage};
use super::device::{BindFlags, BufferDesc, D3d11Device, InputElementDesc, Usage};

/// Constant buffers are sized in 16 byte registers.
const CONSTANT_REGISTER_SIZE: u32 = 16;

#[derive(Debug, Clone)]
struct Program {
    vertex_shader: NativeHandle,
    pixel_shader: NativeHandle,
    input_layout: NativeHandle,
    pixel_constants: Option<NativeHandle>,
    vertex_constants: Option<NativeHandle>,
    pixel_uniforms: Vec<u32>,
    vertex_uniforms: Vec<u32>,
}

impl Program {
    fn handles(&self) -> impl Iterator<Item = NativeHandle> + '_ {
        [
            Some(self.vertex_shader),
            Some(self.pixel_shader),
            Some(self.input_layout),
            self.pixel_constants,
            self.vertex_constants,
        ]
        .into_iter()
        .flatten()
    }
}

/// Native side of a shader: both stages, the input layout and one dynamic
/// constant buffer per stage that declares constants.
pub struct D3d11Shader {
    device: Arc<D3d11Device>,
    program: Option<Program>,
}

impl D3d11Shader {
    pub(crate) fn new(device: Arc<D3d11Device>) -> Self {
        Self {
            device,
            program: None,
        }
    }

    fn create_program(
        &self,
        state: &ShaderState,
        created: &mut Vec<NativeHandle>,
    ) -> Result<Program, GraphicsError> {
        let vertex_shader = self
            .device
            .create_vertex_shader(state.vertex_bytecode())
            .map_err(|hr| hr.into_error("CreateVertexShader"))?;
        created.push(vertex_shader);
        let pixel_shader = self
            .device
            .create_pixel_shader(state.pixel_bytecode())
            .map_err(|hr| hr.into_error("CreatePixelShader"))?;
        created.push(pixel_shader);

        let mut offset = 0;
        let elements: Vec<InputElementDesc> = state
            .vertex_attributes()
            .iter()
            .map(|attribute| {
                let (semantic, semantic_index) = convert_vertex_usage(attribute.usage);
                let element = InputElementDesc {
                    semantic,
                    semantic_index,
                    format: convert_attribute_format(attribute.format),
                    offset,
                };
                offset += attribute.format.size();
                element
            })
            .collect();
        let input_layout = self
            .device
            .create_input_layout(&elements, state.vertex_bytecode())
            .map_err(|hr| hr.into_error("CreateInputLayout"))?;
        created.push(input_layout);

        let pixel_constants = self.create_constant_buffer(state.pixel_uniforms(), created)?;
        let vertex_constants = self.create_constant_buffer(state.vertex_uniforms(), created)?;

        Ok(Program {
            vertex_shader,
            pixel_shader,
            input_layout,
            pixel_constants,
            vertex_constants,
            pixel_uniforms: uniform_sizes(state.pixel_uniforms()),
            vertex_uniforms: uniform_sizes(state.vertex_uniforms()),
        })
    }

    fn create_constant_buffer(
        &self,
        uniforms: &[ShaderUniform],
        created: &mut Vec<NativeHandle>,
    ) -> Result<Option<NativeHandle>, GraphicsError> {
        let size: u32 = uniforms.iter().map(|u| u.kind.size()).sum();
        if size == 0 {
            return Ok(None);
        }
        let desc = BufferDesc {
            byte_width: align_up(size, CONSTANT_REGISTER_SIZE),
            usage: Usage::Dynamic,
            bind_flags: BindFlags::CONSTANT_BUFFER,
            cpu_write: true,
        };
        let handle = self
            .device
            .create_buffer(&desc, None)
            .map_err(|hr| hr.into_error("CreateBuffer"))?;
        created.push(handle);
        Ok(Some(handle))
    }

    fn release(&mut self) {
        if let Some(program) = self.program.take() {
            for handle in program.handles() {
                self.device.defer_release(handle);
            }
        }
    }
}

fn uniform_sizes(uniforms: &[ShaderUniform]) -> Vec<u32> {
    uniforms.iter().map(|u| u.kind.size()).collect()
}

impl ShaderBackend for D3d11Shader {
    fn upload(&mut self, state: &ShaderState, _ctx: &UploadContext<'_>) -> Result<(), GraphicsError> {
        let mut created = Vec::new();
        match self.create_program(state, &mut created) {
            Ok(program) => {
                self.release();
                log::debug!(
                    "D3D11: created shader program ({} / {})",
                    state.vertex_entry(),
                    state.pixel_entry()
                );
                self.program = Some(program);
                Ok(())
            }
            Err(err) => {
                for handle in created.into_iter().rev() {
                    self.device.release(handle);
                }
                Err(err)
            }
        }
    }

    fn binding(&self) -> Option<ShaderBinding> {
        let program = self.program.as_ref()?;
        Some(ShaderBinding {
            handles: vec![
                program.vertex_shader,
                program.pixel_shader,
                program.input_layout,
            ],
            pixel_uniforms: program.pixel_uniforms.clone(),
            vertex_uniforms: program.vertex_uniforms.clone(),
            pixel_constant_buffer: program.pixel_constants,
            vertex_constant_buffer: program.vertex_constants,
        })
    }
}

impl Drop for D3d11Shader {
    fn drop(&mut self) {
        self.release();
    }
}

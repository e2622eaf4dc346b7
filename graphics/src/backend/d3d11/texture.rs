//! Direct3D 11 texture implementation.

use std::sync::Arc;

use crate::backend::pitch::copy_rows;
use crate::backend::{
    NativeHandle, NativeTextureInfo, RenderTargetBinding, StorageClass, TextureBackend,
    TextureBinding, UploadContext, needs_reallocation,
};
use crate::error::GraphicsError;
use crate::resources::{DirtyFlags, TextureState};
use crate::sampler_cache::SamplerState;

use super::conversion::{DxgiFormat, convert_pixel_format};
use super::device::{BindFlags, D3d11Device, MapType, SubresourceData, Texture2dDesc, Usage};

#[derive(Debug, Clone, Copy)]
struct Allocation {
    texture: NativeHandle,
    view: NativeHandle,
    render_target: Option<NativeHandle>,
    depth: Option<(NativeHandle, NativeHandle)>,
    width: u32,
    height: u32,
    level_count: u32,
    byte_size: u64,
    format: DxgiFormat,
    storage: StorageClass,
}

impl Allocation {
    fn handles(&self) -> impl Iterator<Item = NativeHandle> {
        let depth = self.depth.map(|(texture, view)| [view, texture]);
        [Some(self.view), self.render_target, Some(self.texture)]
            .into_iter()
            .flatten()
            .chain(depth.into_iter().flatten())
    }
}

/// Native side of a texture: the texture resource, its views and its sampler.
pub struct D3d11Texture {
    device: Arc<D3d11Device>,
    allocation: Option<Allocation>,
    sampler: Option<Arc<SamplerState>>,
    clear_color: [f32; 4],
    clear_color_buffer: bool,
    clear_depth_buffer: bool,
}

impl D3d11Texture {
    pub(crate) fn new(device: Arc<D3d11Device>) -> Self {
        Self {
            device,
            allocation: None,
            sampler: None,
            clear_color: [0.0; 4],
            clear_color_buffer: false,
            clear_depth_buffer: false,
        }
    }

    fn reconcile_contents(&mut self, state: &TextureState) -> Result<(), GraphicsError> {
        let format =
            convert_pixel_format(state.format()).ok_or(GraphicsError::UnsupportedPixelFormat(state.format()))?;

        if state.levels().is_empty() {
            self.release();
            return Ok(());
        }

        let storage = storage_class(state);
        let level_count = state.levels().len() as u32;
        let current = self
            .allocation
            .as_ref()
            .filter(|a| {
                a.width == state.width()
                    && a.height == state.height()
                    && a.level_count == level_count
                    && a.storage == storage
            })
            .map(|a| a.byte_size);

        if needs_reallocation(
            current,
            state.byte_size(),
            state.dirty(),
            storage == StorageClass::Immutable,
        ) {
            let allocation = self.allocate(state, format, storage)?;
            self.release();
            log::trace!(
                "D3D11: created {}x{} texture {:?} ({} levels, {:?})",
                allocation.width,
                allocation.height,
                allocation.texture,
                allocation.level_count,
                storage
            );
            self.allocation = Some(allocation);
        } else if storage == StorageClass::Dynamic {
            self.write_levels(state)?;
        }
        Ok(())
    }

    fn allocate(
        &self,
        state: &TextureState,
        format: DxgiFormat,
        storage: StorageClass,
    ) -> Result<Allocation, GraphicsError> {
        let mut created = Vec::new();
        let result = self.create_objects(state, format, storage, &mut created);
        if result.is_err() {
            for handle in created.into_iter().rev() {
                self.device.release(handle);
            }
        }
        result
    }

    fn create_objects(
        &self,
        state: &TextureState,
        format: DxgiFormat,
        storage: StorageClass,
        created: &mut Vec<NativeHandle>,
    ) -> Result<Allocation, GraphicsError> {
        let levels = state.levels();
        let (usage, bind_flags) = match storage {
            StorageClass::RenderTarget => (
                Usage::Default,
                BindFlags::SHADER_RESOURCE | BindFlags::RENDER_TARGET,
            ),
            StorageClass::Dynamic => (Usage::Dynamic, BindFlags::SHADER_RESOURCE),
            StorageClass::Immutable => (Usage::Immutable, BindFlags::SHADER_RESOURCE),
        };
        let mut desc = Texture2dDesc {
            width: state.width(),
            height: state.height(),
            mip_levels: levels.len() as u32,
            format,
            sample_count: state.sample_count(),
            usage,
            bind_flags,
            cpu_write: storage == StorageClass::Dynamic,
        };

        let initial: Vec<SubresourceData<'_>> = levels
            .iter()
            .map(|level| SubresourceData {
                data: &level.data,
                pitch: level.pitch,
            })
            .collect();
        let initial = (storage != StorageClass::RenderTarget).then_some(initial.as_slice());

        let texture = self
            .device
            .create_texture_2d(&desc, initial)
            .map_err(|hr| hr.into_error("CreateTexture2D"))?;
        created.push(texture);
        let view = self
            .device
            .create_shader_resource_view(texture)
            .map_err(|hr| hr.into_error("CreateShaderResourceView"))?;
        created.push(view);

        let mut render_target = None;
        let mut depth = None;
        if storage == StorageClass::RenderTarget {
            let rtv = self
                .device
                .create_render_target_view(texture)
                .map_err(|hr| hr.into_error("CreateRenderTargetView"))?;
            created.push(rtv);
            render_target = Some(rtv);

            if state.has_depth_buffer() {
                desc.format = DxgiFormat::D32_FLOAT;
                desc.bind_flags = BindFlags::DEPTH_STENCIL;
                let depth_texture = self
                    .device
                    .create_texture_2d(&desc, None)
                    .map_err(|hr| hr.into_error("CreateTexture2D"))?;
                created.push(depth_texture);
                let dsv = self
                    .device
                    .create_depth_stencil_view(depth_texture)
                    .map_err(|hr| hr.into_error("CreateDepthStencilView"))?;
                created.push(dsv);
                depth = Some((depth_texture, dsv));
            }
        }

        Ok(Allocation {
            texture,
            view,
            render_target,
            depth,
            width: state.width(),
            height: state.height(),
            level_count: levels.len() as u32,
            byte_size: state.byte_size(),
            format,
            storage,
        })
    }

    fn write_levels(&self, state: &TextureState) -> Result<(), GraphicsError> {
        let Some(allocation) = self.allocation else {
            return Ok(());
        };
        for (index, level) in state.levels().iter().enumerate() {
            let map_type = if index == 0 {
                MapType::WriteDiscard
            } else {
                MapType::Write
            };
            self.device
                .map_write(allocation.texture, index as u32, map_type, |dst, row_pitch| {
                    copy_rows(dst, row_pitch, &level.data, level.pitch, level.height);
                })
                .map_err(|hr| hr.into_error("Map"))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            for handle in allocation.handles() {
                self.device.defer_release(handle);
            }
        }
    }
}

fn storage_class(state: &TextureState) -> StorageClass {
    if state.is_render_target() {
        StorageClass::RenderTarget
    } else if state.is_dynamic() {
        StorageClass::Dynamic
    } else {
        StorageClass::Immutable
    }
}

impl TextureBackend for D3d11Texture {
    fn upload(&mut self, state: &TextureState, ctx: &UploadContext<'_>) -> Result<(), GraphicsError> {
        let dirty = state.dirty();
        if dirty.intersects(DirtyFlags::DATA | DirtyFlags::SIZE) || self.allocation.is_none() {
            self.reconcile_contents(state)?;
        }
        if dirty.contains(DirtyFlags::PARAMETERS) || self.sampler.is_none() {
            self.sampler = Some(ctx.sampler_state(state.sampler_descriptor())?);
            self.clear_color = state.clear_color().normalized();
            self.clear_color_buffer = state.clear_color_buffer();
            self.clear_depth_buffer = state.clear_depth_buffer();
        }
        Ok(())
    }

    fn binding(&self) -> Option<TextureBinding> {
        let allocation = self.allocation.as_ref()?;
        let sampler = self.sampler.as_ref()?;
        Some(TextureBinding {
            texture: allocation.texture,
            view: allocation.view,
            sampler: sampler.handle(),
        })
    }

    fn render_target(&self) -> Option<RenderTargetBinding> {
        let allocation = self.allocation.as_ref()?;
        Some(RenderTargetBinding {
            target: allocation.render_target?,
            depth: allocation.depth.map(|(_, view)| view),
            width: allocation.width,
            height: allocation.height,
            clear_color: self.clear_color,
            clear_color_buffer: self.clear_color_buffer,
            clear_depth_buffer: self.clear_depth_buffer,
        })
    }

    fn info(&self) -> Option<NativeTextureInfo> {
        let allocation = self.allocation.as_ref()?;
        Some(NativeTextureInfo {
            handle: allocation.texture,
            width: allocation.width,
            height: allocation.height,
            row_pitches: self.device.row_pitches(allocation.texture),
            storage: allocation.storage,
            native_format: allocation.format.0,
        })
    }

    fn read_level(&self, level: u32) -> Option<Vec<u8>> {
        let allocation = self.allocation.as_ref()?;
        self.device.read_subresource(allocation.texture, level)
    }
}

impl Drop for D3d11Texture {
    fn drop(&mut self) {
        self.release();
    }
}

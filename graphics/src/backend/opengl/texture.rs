//! OpenGL texture implementation.

use std::borrow::Cow;
use std::sync::Arc;

use crate::backend::pitch::copy_rows;
use crate::backend::{
    NativeHandle, NativeTextureInfo, RenderTargetBinding, StorageClass, TextureBackend,
    TextureBinding, UploadContext, needs_reallocation,
};
use crate::error::GraphicsError;
use crate::resources::{DirtyFlags, TextureState};
use crate::sampler_cache::SamplerState;
use crate::types::MipLevel;

use super::context::{GlContext, unpack_pitch};
use super::conversion::{GL_DEPTH_COMPONENT32F, convert_pixel_format};

#[derive(Debug, Clone, Copy)]
struct Allocation {
    texture: NativeHandle,
    framebuffer: Option<NativeHandle>,
    depth: Option<NativeHandle>,
    width: u32,
    height: u32,
    level_count: u32,
    byte_size: u64,
    internal_format: u32,
    storage: StorageClass,
}

impl Allocation {
    fn handles(&self) -> impl Iterator<Item = NativeHandle> {
        [self.framebuffer, self.depth, Some(self.texture)]
            .into_iter()
            .flatten()
    }
}

/// Native side of a texture.
///
/// GL textures stay writable after creation, so static and dynamic textures
/// are both updated in place while their layout is unchanged.
pub struct GlTexture {
    context: Arc<GlContext>,
    allocation: Option<Allocation>,
    sampler: Option<Arc<SamplerState>>,
    clear_color: [f32; 4],
    clear_color_buffer: bool,
    clear_depth_buffer: bool,
}

impl GlTexture {
    pub(crate) fn new(context: Arc<GlContext>) -> Self {
        Self {
            context,
            allocation: None,
            sampler: None,
            clear_color: [0.0; 4],
            clear_color_buffer: false,
            clear_depth_buffer: false,
        }
    }

    fn reconcile_contents(&mut self, state: &TextureState) -> Result<(), GraphicsError> {
        let internal_format = convert_pixel_format(state.format())
            .ok_or(GraphicsError::UnsupportedPixelFormat(state.format()))?;

        if state.levels().is_empty() {
            self.release();
            return Ok(());
        }

        let storage = if state.is_render_target() {
            StorageClass::RenderTarget
        } else {
            StorageClass::Dynamic
        };
        let level_count = state.levels().len() as u32;
        let current = self
            .allocation
            .as_ref()
            .filter(|a| {
                a.width == state.width()
                    && a.height == state.height()
                    && a.level_count == level_count
                    && a.storage == storage
                    && a.internal_format == internal_format
            })
            .map(|a| a.byte_size);

        if needs_reallocation(current, state.byte_size(), state.dirty(), false) {
            let mut created = Vec::new();
            match self.create_objects(state, internal_format, storage, &mut created) {
                Ok(allocation) => {
                    self.release();
                    log::trace!(
                        "GL: created {}x{} texture {:?} ({} levels, {:?})",
                        allocation.width,
                        allocation.height,
                        allocation.texture,
                        allocation.level_count,
                        storage
                    );
                    self.allocation = Some(allocation);
                }
                Err(err) => {
                    for handle in created.into_iter().rev() {
                        self.context.delete(handle);
                    }
                    return Err(err);
                }
            }
        } else if storage != StorageClass::RenderTarget {
            self.write_levels(state)?;
        }
        Ok(())
    }

    fn create_objects(
        &self,
        state: &TextureState,
        internal_format: u32,
        storage: StorageClass,
        created: &mut Vec<NativeHandle>,
    ) -> Result<Allocation, GraphicsError> {
        let pixel_size = state.format().pixel_size();
        let texture = self.context.gen_texture();
        created.push(texture);

        for (index, level) in state.levels().iter().enumerate() {
            let data = match storage {
                StorageClass::RenderTarget => None,
                _ => Some(unpacked(level, pixel_size)),
            };
            self.context
                .tex_image_2d(
                    texture,
                    index as u32,
                    internal_format,
                    level.width,
                    level.height,
                    data.as_deref(),
                )
                .map_err(|err| err.into_error("glTexImage2D"))?;
        }

        let mut framebuffer = None;
        let mut depth = None;
        if storage == StorageClass::RenderTarget {
            if state.has_depth_buffer() {
                let renderbuffer = self
                    .context
                    .create_renderbuffer(
                        GL_DEPTH_COMPONENT32F,
                        state.width(),
                        state.height(),
                        state.sample_count(),
                    )
                    .map_err(|err| err.into_error("glRenderbufferStorageMultisample"))?;
                created.push(renderbuffer);
                depth = Some(renderbuffer);
            }
            let fbo = self
                .context
                .create_framebuffer(texture, depth)
                .map_err(|err| err.into_error("glCheckFramebufferStatus"))?;
            created.push(fbo);
            framebuffer = Some(fbo);
        }

        Ok(Allocation {
            texture,
            framebuffer,
            depth,
            width: state.width(),
            height: state.height(),
            level_count: state.levels().len() as u32,
            byte_size: state.byte_size(),
            internal_format,
            storage,
        })
    }

    fn write_levels(&self, state: &TextureState) -> Result<(), GraphicsError> {
        let Some(allocation) = self.allocation else {
            return Ok(());
        };
        let pixel_size = state.format().pixel_size();
        for (index, level) in state.levels().iter().enumerate() {
            self.context
                .tex_sub_image_2d(allocation.texture, index as u32, &unpacked(level, pixel_size))
                .map_err(|err| err.into_error("glTexSubImage2D"))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            for handle in allocation.handles() {
                self.context.defer_delete(handle);
            }
        }
    }
}

/// Level data laid out with the context's unpack alignment.
fn unpacked(level: &MipLevel, pixel_size: u32) -> Cow<'_, [u8]> {
    let pitch = unpack_pitch(level.width, pixel_size);
    let len = pitch as usize * level.height as usize;
    if level.pitch == pitch && level.data.len() >= len {
        return Cow::Borrowed(&level.data[..len]);
    }
    let mut data = vec![0; len];
    copy_rows(&mut data, pitch, &level.data, level.pitch, level.height);
    Cow::Owned(data)
}

impl TextureBackend for GlTexture {
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
            view: allocation.texture,
            sampler: sampler.handle(),
        })
    }

    fn render_target(&self) -> Option<RenderTargetBinding> {
        let allocation = self.allocation.as_ref()?;
        Some(RenderTargetBinding {
            target: allocation.framebuffer?,
            depth: allocation.depth,
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
            row_pitches: self.context.row_pitches(allocation.texture),
            storage: allocation.storage,
            native_format: allocation.internal_format,
        })
    }

    fn read_level(&self, level: u32) -> Option<Vec<u8>> {
        let allocation = self.allocation.as_ref()?;
        self.context.read_texture_level(allocation.texture, level)
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpacked_borrows_aligned_rows() {
        let level = MipLevel::new(2, 2, 8, vec![1; 16]);
        assert!(matches!(unpacked(&level, 4), Cow::Borrowed(_)));
    }

    #[test]
    fn test_unpacked_repacks_odd_rows() {
        let level = MipLevel::new(3, 2, 3, vec![1, 2, 3, 4, 5, 6]);
        let data = unpacked(&level, 1);
        assert_eq!(&*data, &[1, 2, 3, 0, 4, 5, 6, 0]);
    }
}

//! Software OpenGL context.
//!
//! Models the object model of a GL 3.3 core context: names are generated
//! first and given storage by a separate call, texture rows are read with
//! [`UNPACK_ALIGNMENT`], and failing calls record a GL error code instead of
//! returning one. The software context returns the code directly, which is
//! what `glGetError` after each call would report.

use parking_lot::Mutex;

use crate::backend::pitch::align_up;
use crate::backend::software::{
    BackendStats, DrawLog, FaultInjector, FaultKind, ObjectStore, StatsCounters,
};
use crate::backend::{DrawRecord, NativeHandle};
use crate::error::GraphicsError;

use super::BACKEND_NAME;
use super::conversion::{
    GL_ARRAY_BUFFER, GL_DYNAMIC_DRAW, GL_ELEMENT_ARRAY_BUFFER, GL_STATIC_DRAW,
    internal_format_size,
};

/// `GL_UNPACK_ALIGNMENT` used for every texture transfer.
pub const UNPACK_ALIGNMENT: u32 = 4;

/// A GL error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlError(pub u32);

impl GlError {
    pub const INVALID_ENUM: Self = Self(0x0500);
    pub const INVALID_VALUE: Self = Self(0x0501);
    pub const INVALID_OPERATION: Self = Self(0x0502);
    pub const OUT_OF_MEMORY: Self = Self(0x0505);
    pub const INVALID_FRAMEBUFFER_OPERATION: Self = Self(0x0506);

    /// Wrap into a graphics error naming the failed call.
    pub fn into_error(self, operation: &'static str) -> GraphicsError {
        GraphicsError::Backend {
            backend: BACKEND_NAME,
            operation,
            code: self.0,
        }
    }
}

pub type GlResult<T> = Result<T, GlError>;

/// Row pitch of a texture level as stored by the context.
pub fn unpack_pitch(width: u32, pixel_size: u32) -> u32 {
    align_up(width * pixel_size, UNPACK_ALIGNMENT)
}

/// `glSamplerParameter` values of a sampler object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerParams {
    pub min_filter: u32,
    pub mag_filter: u32,
    pub wrap_s: u32,
    pub wrap_t: u32,
    pub max_anisotropy: u32,
}

/// `glBlendFuncSeparate`/`glBlendEquationSeparate`/`glColorMask` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendParams {
    pub enabled: bool,
    pub src_rgb: u32,
    pub dst_rgb: u32,
    pub equation_rgb: u32,
    pub src_alpha: u32,
    pub dst_alpha: u32,
    pub equation_alpha: u32,
    pub color_mask: [bool; 4],
}

/// One `glVertexAttribPointer` call of a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribPointer {
    pub index: u32,
    pub components: u32,
    pub component_type: u32,
    pub normalized: bool,
    pub offset: u32,
}

#[derive(Debug)]
struct TexLevel {
    row_pitch: u32,
    data: Vec<u8>,
}

#[derive(Debug)]
enum GlObject {
    Buffer {
        target: u32,
        usage: u32,
        data: Vec<u8>,
    },
    Texture {
        internal_format: u32,
        levels: Vec<(u32, u32, TexLevel)>,
    },
    Renderbuffer,
    Framebuffer,
    Sampler,
    Program {
        uniforms: Vec<Vec<f32>>,
    },
    VertexArray,
    BlendState,
}

#[derive(Debug)]
struct DefaultFramebuffer {
    width: u32,
    height: u32,
}

/// The software context.
#[derive(Debug)]
pub struct GlContext {
    objects: ObjectStore<GlObject>,
    stats: StatsCounters,
    faults: FaultInjector,
    draws: DrawLog,
    framebuffer: Mutex<DefaultFramebuffer>,
    depth: bool,
}

impl GlContext {
    /// Create a context whose default framebuffer is `width` x `height`.
    pub fn new(width: u32, height: u32, depth: bool) -> Self {
        Self {
            objects: ObjectStore::default(),
            stats: StatsCounters::default(),
            faults: FaultInjector::default(),
            draws: DrawLog::default(),
            framebuffer: Mutex::new(DefaultFramebuffer { width, height }),
            depth,
        }
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
            .snapshot(self.objects.len(), self.objects.pending_len())
    }

    pub fn draw_log(&self) -> Vec<DrawRecord> {
        self.draws.snapshot()
    }

    /// Whether the default framebuffer carries a depth attachment.
    pub fn has_depth(&self) -> bool {
        self.depth
    }

    fn generate(&self, object: GlObject) -> NativeHandle {
        StatsCounters::bump(&self.stats.allocations);
        self.objects.insert(object)
    }

    fn allocate(&self, object: GlObject) -> GlResult<NativeHandle> {
        if self.faults.trip(FaultKind::Allocation) {
            return Err(GlError::OUT_OF_MEMORY);
        }
        Ok(self.generate(object))
    }

    /// `glGenBuffers`. The name has no storage until [`buffer_data`](Self::buffer_data).
    pub fn gen_buffer(&self) -> NativeHandle {
        self.generate(GlObject::Buffer {
            target: 0,
            usage: 0,
            data: Vec::new(),
        })
    }

    /// `glBufferData`: (re)specify the storage of a buffer.
    pub fn buffer_data(
        &self,
        buffer: NativeHandle,
        target: u32,
        size: usize,
        data: Option<&[u8]>,
        usage: u32,
    ) -> GlResult<()> {
        if target != GL_ARRAY_BUFFER && target != GL_ELEMENT_ARRAY_BUFFER {
            return Err(GlError::INVALID_ENUM);
        }
        if usage != GL_STATIC_DRAW && usage != GL_DYNAMIC_DRAW {
            return Err(GlError::INVALID_ENUM);
        }
        if data.is_some_and(|data| data.len() < size) {
            return Err(GlError::INVALID_VALUE);
        }
        if self.faults.trip(FaultKind::Allocation) {
            return Err(GlError::OUT_OF_MEMORY);
        }
        let result = self.objects.with_mut(buffer, |object| match object {
            GlObject::Buffer {
                target: bound_target,
                usage: bound_usage,
                data: storage,
            } => {
                *bound_target = target;
                *bound_usage = usage;
                *storage = match data {
                    Some(data) => data[..size].to_vec(),
                    None => vec![0; size],
                };
                Ok(())
            }
            _ => Err(GlError::INVALID_OPERATION),
        });
        result.unwrap_or(Err(GlError::INVALID_OPERATION))
    }

    /// `glBufferSubData`.
    pub fn buffer_sub_data(&self, buffer: NativeHandle, offset: usize, data: &[u8]) -> GlResult<()> {
        if self.faults.trip(FaultKind::Map) {
            return Err(GlError::INVALID_OPERATION);
        }
        let result = self.objects.with_mut(buffer, |object| match object {
            GlObject::Buffer { data: storage, .. } => {
                let end = offset + data.len();
                if end > storage.len() {
                    return Err(GlError::INVALID_VALUE);
                }
                storage[offset..end].copy_from_slice(data);
                Ok(())
            }
            _ => Err(GlError::INVALID_OPERATION),
        });
        result.unwrap_or(Err(GlError::INVALID_OPERATION))?;
        StatsCounters::bump(&self.stats.writes);
        Ok(())
    }

    /// `glInvalidateBufferData`: orphan the current storage.
    pub fn invalidate_buffer_data(&self, buffer: NativeHandle) -> GlResult<()> {
        let result = self.objects.with_mut(buffer, |object| match object {
            GlObject::Buffer { data, .. } => {
                data.fill(0);
                Ok(())
            }
            _ => Err(GlError::INVALID_OPERATION),
        });
        result.unwrap_or(Err(GlError::INVALID_OPERATION))
    }

    /// `glGenTextures`. The name has no storage until [`tex_image_2d`](Self::tex_image_2d).
    pub fn gen_texture(&self) -> NativeHandle {
        self.generate(GlObject::Texture {
            internal_format: 0,
            levels: Vec::new(),
        })
    }

    /// `glTexImage2D`: specify one level. `data` rows are [`unpack_pitch`] apart.
    ///
    /// Levels must be specified in order; respecifying an existing level
    /// replaces it.
    pub fn tex_image_2d(
        &self,
        texture: NativeHandle,
        level: u32,
        internal_format: u32,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> GlResult<()> {
        let pixel_size = internal_format_size(internal_format);
        if pixel_size == 0 {
            return Err(GlError::INVALID_ENUM);
        }
        if width == 0 || height == 0 {
            return Err(GlError::INVALID_VALUE);
        }
        let row_pitch = unpack_pitch(width, pixel_size);
        let len = row_pitch as usize * height as usize;
        if data.is_some_and(|data| data.len() < len) {
            return Err(GlError::INVALID_VALUE);
        }
        if self.faults.trip(FaultKind::Allocation) {
            return Err(GlError::OUT_OF_MEMORY);
        }
        let result = self.objects.with_mut(texture, |object| match object {
            GlObject::Texture {
                internal_format: format,
                levels,
            } => {
                if level as usize > levels.len() {
                    return Err(GlError::INVALID_VALUE);
                }
                if level > 0 && *format != internal_format {
                    return Err(GlError::INVALID_OPERATION);
                }
                *format = internal_format;
                let storage = TexLevel {
                    row_pitch,
                    data: data.map_or_else(|| vec![0; len], |data| data[..len].to_vec()),
                };
                if level as usize == levels.len() {
                    levels.push((width, height, storage));
                } else {
                    levels[level as usize] = (width, height, storage);
                }
                Ok(())
            }
            _ => Err(GlError::INVALID_OPERATION),
        });
        result.unwrap_or(Err(GlError::INVALID_OPERATION))
    }

    /// `glTexSubImage2D` covering a whole level.
    pub fn tex_sub_image_2d(&self, texture: NativeHandle, level: u32, data: &[u8]) -> GlResult<()> {
        if self.faults.trip(FaultKind::Map) {
            return Err(GlError::INVALID_OPERATION);
        }
        let result = self.objects.with_mut(texture, |object| match object {
            GlObject::Texture { levels, .. } => {
                let Some((_, _, storage)) = levels.get_mut(level as usize) else {
                    return Err(GlError::INVALID_VALUE);
                };
                if data.len() < storage.data.len() {
                    return Err(GlError::INVALID_VALUE);
                }
                let len = storage.data.len();
                storage.data.copy_from_slice(&data[..len]);
                Ok(())
            }
            _ => Err(GlError::INVALID_OPERATION),
        });
        result.unwrap_or(Err(GlError::INVALID_OPERATION))?;
        StatsCounters::bump(&self.stats.writes);
        Ok(())
    }

    /// `glRenderbufferStorageMultisample`.
    pub fn create_renderbuffer(
        &self,
        internal_format: u32,
        width: u32,
        height: u32,
        samples: u32,
    ) -> GlResult<NativeHandle> {
        if internal_format_size(internal_format) == 0 {
            return Err(GlError::INVALID_ENUM);
        }
        if width == 0 || height == 0 || samples == 0 {
            return Err(GlError::INVALID_VALUE);
        }
        self.allocate(GlObject::Renderbuffer)
    }

    /// `glGenFramebuffers` + attachments + `glCheckFramebufferStatus`.
    pub fn create_framebuffer(
        &self,
        color: NativeHandle,
        depth: Option<NativeHandle>,
    ) -> GlResult<NativeHandle> {
        let color_complete = self
            .objects
            .with(color, |object| {
                matches!(object, GlObject::Texture { levels, .. } if !levels.is_empty())
            })
            .unwrap_or(false);
        let depth_complete = depth.is_none_or(|depth| {
            self.objects
                .with(depth, |object| matches!(object, GlObject::Renderbuffer))
                .unwrap_or(false)
        });
        if !color_complete || !depth_complete {
            return Err(GlError::INVALID_FRAMEBUFFER_OPERATION);
        }
        self.allocate(GlObject::Framebuffer)
    }

    /// `glGenSamplers` + `glSamplerParameteri`.
    pub fn create_sampler(&self, params: &SamplerParams) -> GlResult<NativeHandle> {
        if params.max_anisotropy == 0 || params.max_anisotropy > 16 {
            return Err(GlError::INVALID_VALUE);
        }
        let handle = self.allocate(GlObject::Sampler)?;
        StatsCounters::bump(&self.stats.samplers);
        Ok(handle)
    }

    /// Compile both stages and link a program.
    pub fn create_program(&self, vertex_source: &[u8], fragment_source: &[u8]) -> GlResult<NativeHandle> {
        if vertex_source.is_empty() || fragment_source.is_empty() {
            return Err(GlError::INVALID_VALUE);
        }
        self.allocate(GlObject::Program {
            uniforms: Vec::new(),
        })
    }

    /// `glUniform*` for every declared uniform of a program, in order.
    pub fn set_uniforms(&self, program: NativeHandle, values: &[Vec<f32>]) -> GlResult<()> {
        let result = self.objects.with_mut(program, |object| match object {
            GlObject::Program { uniforms } => {
                uniforms.clear();
                uniforms.extend(values.iter().cloned());
                Ok(())
            }
            _ => Err(GlError::INVALID_OPERATION),
        });
        result.unwrap_or(Err(GlError::INVALID_OPERATION))
    }

    /// Values last set with [`set_uniforms`](Self::set_uniforms).
    pub fn uniforms(&self, program: NativeHandle) -> Option<Vec<Vec<f32>>> {
        self.objects.with(program, |object| match object {
            GlObject::Program { uniforms } => Some(uniforms.clone()),
            _ => None,
        })?
    }

    /// `glGenVertexArrays` + `glVertexAttribPointer` for each attribute.
    pub fn create_vertex_array(
        &self,
        attributes: &[VertexAttribPointer],
        stride: u32,
    ) -> GlResult<NativeHandle> {
        if attributes.iter().any(|a| a.components == 0 || a.components > 4 || a.offset >= stride.max(1)) {
            return Err(GlError::INVALID_VALUE);
        }
        self.allocate(GlObject::VertexArray)
    }

    /// Cache a blend configuration applied at draw time.
    pub fn create_blend_state(&self, params: &BlendParams) -> GlResult<NativeHandle> {
        if params.equation_rgb == 0 || params.equation_alpha == 0 {
            return Err(GlError::INVALID_ENUM);
        }
        self.allocate(GlObject::BlendState)
    }

    /// Delete an object now.
    pub fn delete(&self, handle: NativeHandle) {
        if self.objects.remove(handle) {
            StatsCounters::bump(&self.stats.releases);
        }
    }

    /// Queue an object for deletion at the next [`flush_releases`](Self::flush_releases).
    pub fn defer_delete(&self, handle: NativeHandle) {
        self.objects.defer_remove(handle);
    }

    pub fn flush_releases(&self) -> usize {
        let released = self.objects.flush_deferred();
        self.stats
            .releases
            .fetch_add(released as u64, std::sync::atomic::Ordering::Relaxed);
        released
    }

    pub fn is_live(&self, handle: NativeHandle) -> bool {
        self.objects.contains(handle)
    }

    /// Copy of a buffer's storage.
    pub fn read_buffer(&self, buffer: NativeHandle) -> Option<Vec<u8>> {
        self.objects.with(buffer, |object| match object {
            GlObject::Buffer { data, .. } => Some(data.clone()),
            _ => None,
        })?
    }

    /// Target and usage a buffer's storage was specified with.
    pub fn buffer_info(&self, buffer: NativeHandle) -> Option<(u32, u32)> {
        self.objects.with(buffer, |object| match object {
            GlObject::Buffer { target, usage, .. } => Some((*target, *usage)),
            _ => None,
        })?
    }

    /// Copy of one texture level at [`unpack_pitch`].
    pub fn read_texture_level(&self, texture: NativeHandle, level: u32) -> Option<Vec<u8>> {
        self.objects.with(texture, |object| match object {
            GlObject::Texture { levels, .. } => levels
                .get(level as usize)
                .map(|(_, _, storage)| storage.data.clone()),
            _ => None,
        })?
    }

    /// Row pitch of every level of a texture.
    pub fn row_pitches(&self, texture: NativeHandle) -> Vec<u32> {
        self.objects
            .with(texture, |object| match object {
                GlObject::Texture { levels, .. } => levels
                    .iter()
                    .map(|(_, _, storage)| storage.row_pitch)
                    .collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default()
    }

    /// Resize the default framebuffer.
    pub fn resize_default_framebuffer(&self, width: u32, height: u32) -> GlResult<()> {
        if self.faults.trip(FaultKind::BackBuffer) {
            return Err(GlError::OUT_OF_MEMORY);
        }
        if width == 0 || height == 0 {
            return Err(GlError::INVALID_VALUE);
        }
        let mut framebuffer = self.framebuffer.lock();
        framebuffer.width = width;
        framebuffer.height = height;
        StatsCounters::bump(&self.stats.back_buffer_resizes);
        Ok(())
    }

    pub fn default_framebuffer_size(&self) -> (u32, u32) {
        let framebuffer = self.framebuffer.lock();
        (framebuffer.width, framebuffer.height)
    }

    /// Validate bound names and record a `glDrawElements`.
    pub fn draw_elements(&self, handles: &[NativeHandle], record: DrawRecord) -> GlResult<()> {
        if self.faults.trip(FaultKind::Draw) {
            return Err(GlError::INVALID_OPERATION);
        }
        if handles.iter().any(|handle| !self.objects.contains(*handle)) {
            return Err(GlError::INVALID_OPERATION);
        }
        let (width, height) = self.default_framebuffer_size();
        if record.render_target.is_none() && (width == 0 || height == 0) {
            return Err(GlError::INVALID_FRAMEBUFFER_OPERATION);
        }
        StatsCounters::bump(&self.stats.draws);
        self.draws.push(record);
        Ok(())
    }

    /// `SwapBuffers` with `interval` set through the swap control extension.
    pub fn swap_buffers(&self, interval: u32) -> GlResult<()> {
        if self.faults.trip(FaultKind::Present) {
            return Err(GlError::INVALID_FRAMEBUFFER_OPERATION);
        }
        if interval > 4 {
            return Err(GlError::INVALID_VALUE);
        }
        StatsCounters::bump(&self.stats.presents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::opengl::conversion::{GL_R8, GL_RGBA8};

    #[test]
    fn test_unpack_pitch() {
        assert_eq!(unpack_pitch(3, 1), 4);
        assert_eq!(unpack_pitch(2, 4), 8);
        assert_eq!(unpack_pitch(5, 2), 12);
    }

    #[test]
    fn test_buffer_storage_and_sub_data() {
        let context = GlContext::new(64, 64, false);
        let buffer = context.gen_buffer();
        context
            .buffer_data(buffer, GL_ARRAY_BUFFER, 8, Some(&[1; 8]), GL_STATIC_DRAW)
            .unwrap();
        context.buffer_sub_data(buffer, 4, &[7, 7]).unwrap();
        assert_eq!(context.read_buffer(buffer).unwrap(), vec![1, 1, 1, 1, 7, 7, 1, 1]);
        assert_eq!(
            context.buffer_sub_data(buffer, 6, &[0; 4]),
            Err(GlError::INVALID_VALUE)
        );
        assert_eq!(context.buffer_info(buffer), Some((GL_ARRAY_BUFFER, GL_STATIC_DRAW)));
    }

    #[test]
    fn test_orphaning_zeroes_storage() {
        let context = GlContext::new(64, 64, false);
        let buffer = context.gen_buffer();
        context
            .buffer_data(buffer, GL_ELEMENT_ARRAY_BUFFER, 4, Some(&[3; 4]), GL_DYNAMIC_DRAW)
            .unwrap();
        context.invalidate_buffer_data(buffer).unwrap();
        assert_eq!(context.read_buffer(buffer).unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_texture_levels_in_order() {
        let context = GlContext::new(64, 64, false);
        let texture = context.gen_texture();
        assert_eq!(
            context.tex_image_2d(texture, 1, GL_R8, 1, 1, None),
            Err(GlError::INVALID_VALUE)
        );
        context.tex_image_2d(texture, 0, GL_R8, 3, 2, None).unwrap();
        context.tex_image_2d(texture, 1, GL_R8, 1, 1, None).unwrap();
        assert_eq!(context.row_pitches(texture), vec![4, 4]);
        assert_eq!(
            context.tex_image_2d(texture, 0, 0x1234, 3, 2, None),
            Err(GlError::INVALID_ENUM)
        );
    }

    #[test]
    fn test_incomplete_framebuffer() {
        let context = GlContext::new(64, 64, false);
        let texture = context.gen_texture();
        assert_eq!(
            context.create_framebuffer(texture, None),
            Err(GlError::INVALID_FRAMEBUFFER_OPERATION)
        );
        context.tex_image_2d(texture, 0, GL_RGBA8, 4, 4, None).unwrap();
        assert!(context.create_framebuffer(texture, None).is_ok());
    }

    #[test]
    fn test_allocation_fault_on_storage() {
        let context = GlContext::new(64, 64, false);
        let buffer = context.gen_buffer();
        context.faults().fail_next(FaultKind::Allocation, 1);
        assert_eq!(
            context.buffer_data(buffer, GL_ARRAY_BUFFER, 4, None, GL_STATIC_DRAW),
            Err(GlError::OUT_OF_MEMORY)
        );
        assert!(context.buffer_data(buffer, GL_ARRAY_BUFFER, 4, None, GL_STATIC_DRAW).is_ok());
    }

    #[test]
    fn test_swap_fault() {
        let context = GlContext::new(64, 64, false);
        context.faults().fail_next(FaultKind::Present, 1);
        assert_eq!(
            context.swap_buffers(1),
            Err(GlError::INVALID_FRAMEBUFFER_OPERATION)
        );
        assert!(context.swap_buffers(0).is_ok());
    }
}

//! Render device.
//!
//! The [`RenderDevice`] creates every GPU resource, collects draw commands
//! and turns each frame into native work with [`RenderDevice::render_frame`].
//! Resource setters may be called from any thread; `render_frame` runs on the
//! render thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tessera_core::math::Size2;

use crate::backend::{
    BackendStats, DrawRecord, FaultInjector, GpuBackend, MAX_TEXTURES, MeshBinding,
    NativeDrawCall, TextureBinding, UploadContext, create_backend,
};
use crate::command::DrawCommand;
use crate::config::{BackendType, DeviceConfig};
use crate::error::GraphicsError;
use crate::platform::{PlatformHost, WorkQueue};
use crate::resources::{BlendState, Buffer, GpuResource, MeshBuffer, Shader, Texture};
use crate::sampler_cache::{SamplerCache, SamplerState};
use crate::types::{
    BlendDescriptor, BufferDescriptor, MeshBufferDescriptor, Rect, SamplerStateDescriptor,
    ShaderDescriptor, TextureDescriptor,
};

/// What one call to [`RenderDevice::render_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Render-thread tasks run before the frame.
    pub tasks_executed: usize,
    /// Dirty resources reconciled successfully.
    pub uploads: usize,
    /// Dirty resources whose upload failed; they stay dirty.
    pub upload_failures: usize,
    pub draws_executed: usize,
    pub draws_skipped: usize,
    /// Native objects destroyed at the end of the frame.
    pub releases_flushed: usize,
    /// Whether a pending back buffer resize was applied.
    pub resized: bool,
}

/// The device owning a backend and every resource created through it.
///
/// # Thread Safety
///
/// `RenderDevice` is `Send + Sync`. Resources and draw commands can be
/// created from any thread; all native calls happen inside
/// [`render_frame`](Self::render_frame).
///
/// # Example
///
/// ```ignore
/// let host = Arc::new(HeadlessHost::new(Size2::new(1280.0, 720.0)));
/// let device = RenderDevice::new(DeviceConfig::new(), host)?;
///
/// let vertices = device.create_buffer(&BufferDescriptor::vertex().with_typed_data(&quad))?;
/// let indices = device.create_buffer(&BufferDescriptor::index().with_typed_data(&[0u16, 1, 2]))?;
/// let mesh = device.create_mesh_buffer(&MeshBufferDescriptor::new(2, indices, vertices, layout))?;
///
/// device.add_draw_command(DrawCommand::new(blend, shader, mesh, 3))?;
/// device.render_frame()?;
/// ```
pub struct RenderDevice {
    config: DeviceConfig,
    host: Arc<dyn PlatformHost>,
    backend: Arc<dyn GpuBackend>,
    samplers: SamplerCache,
    size: Mutex<Size2>,
    pending_size: Mutex<Option<Size2>>,
    commands: Mutex<Vec<DrawCommand>>,
    work_queue: WorkQueue,
    frame: AtomicU64,
    // Weak registries; uploads walk these once per frame.
    buffers: RwLock<Vec<Weak<Buffer>>>,
    textures: RwLock<Vec<Weak<Texture>>>,
    shaders: RwLock<Vec<Weak<Shader>>>,
    blend_states: RwLock<Vec<Weak<BlendState>>>,
    mesh_buffers: RwLock<Vec<Weak<MeshBuffer>>>,
}

impl RenderDevice {
    /// Create a device and its backend.
    ///
    /// The back buffer takes `config.size`, or the host's surface size when
    /// that is empty.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] for a bad configuration or
    /// surface size, and backend initialization errors as they occur.
    pub fn new(
        config: DeviceConfig,
        host: Arc<dyn PlatformHost>,
    ) -> Result<Arc<Self>, GraphicsError> {
        config.validate()?;
        let size = if config.size.is_empty() {
            host.surface_size()
        } else {
            config.size
        };
        let (width, height) = size.to_extent().ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("invalid surface size {size:?}"))
        })?;

        let backend = create_backend(&config, width, height)?;
        log::info!(
            "RenderDevice: {} backend, {}x{} back buffer, vsync {}",
            backend.name(),
            width,
            height,
            config.vsync
        );

        Ok(Arc::new(Self {
            samplers: SamplerCache::new(Arc::clone(&backend)),
            config,
            host,
            backend,
            size: Mutex::new(Size2::from((width, height))),
            pending_size: Mutex::new(None),
            commands: Mutex::new(Vec::new()),
            work_queue: WorkQueue::new(),
            frame: AtomicU64::new(0),
            buffers: RwLock::new(Vec::new()),
            textures: RwLock::new(Vec::new()),
            shaders: RwLock::new(Vec::new()),
            blend_states: RwLock::new(Vec::new()),
            mesh_buffers: RwLock::new(Vec::new()),
        }))
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Get the backend name.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current back buffer size.
    pub fn size(&self) -> Size2 {
        *self.size.lock()
    }

    /// Size the back buffer will take at the next frame, if it differs.
    pub fn pending_size(&self) -> Option<Size2> {
        *self.pending_size.lock()
    }

    /// Number of frames rendered or attempted.
    pub fn frame_count(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    /// Create a texture or render target.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if the dimensions exceed
    /// device limits or the initial data does not fit them.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let texture = Arc::new(Texture::new(
            Arc::downgrade(self),
            descriptor,
            self.backend.create_texture(),
            self.config.max_texture_dimension,
        )?);
        self.textures.write().push(Arc::downgrade(&texture));

        log::trace!(
            "RenderDevice: created texture {:?}, size={}x{}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height
        );

        Ok(texture)
    }

    /// Create an index or vertex buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if the initial data exceeds
    /// the device's maximum buffer size.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        let buffer = Arc::new(Buffer::new(
            Arc::downgrade(self),
            descriptor,
            self.backend.create_buffer(),
            self.config.max_buffer_size,
        )?);
        self.buffers.write().push(Arc::downgrade(&buffer));

        log::trace!(
            "RenderDevice: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.data.len()
        );

        Ok(buffer)
    }

    pub fn create_blend_state(self: &Arc<Self>, descriptor: &BlendDescriptor) -> Arc<BlendState> {
        let blend_state = Arc::new(BlendState::new(
            Arc::downgrade(self),
            descriptor,
            self.backend.create_blend_state(),
        ));
        self.blend_states.write().push(Arc::downgrade(&blend_state));

        log::trace!("RenderDevice: created blend state {:?}", descriptor.label);

        blend_state
    }

    /// Create a shader from pixel and vertex bytecode.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] for empty bytecode or
    /// entry points.
    pub fn create_shader(
        self: &Arc<Self>,
        descriptor: &ShaderDescriptor,
    ) -> Result<Arc<Shader>, GraphicsError> {
        let shader = Arc::new(Shader::new(
            Arc::downgrade(self),
            descriptor,
            self.backend.create_shader(),
        )?);
        self.shaders.write().push(Arc::downgrade(&shader));

        log::trace!("RenderDevice: created shader {:?}", descriptor.label);

        Ok(shader)
    }

    /// Create a mesh buffer over two buffers created by this device.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::IncompatibleUsage`] if a buffer has the wrong
    /// usage or belongs to another device.
    pub fn create_mesh_buffer(
        self: &Arc<Self>,
        descriptor: &MeshBufferDescriptor,
    ) -> Result<Arc<MeshBuffer>, GraphicsError> {
        for buffer in [&descriptor.index_buffer, &descriptor.vertex_buffer] {
            self.check_owner(buffer.device_ptr(), "buffer", buffer.label())?;
        }
        let mesh_buffer = Arc::new(MeshBuffer::new(
            Arc::downgrade(self),
            descriptor,
            self.backend.create_mesh_buffer(),
        )?);
        self.mesh_buffers.write().push(Arc::downgrade(&mesh_buffer));

        log::trace!(
            "RenderDevice: created mesh buffer {:?}, index_size={}",
            descriptor.label,
            descriptor.index_size
        );

        Ok(mesh_buffer)
    }

    /// Get the shared sampler for `descriptor`, creating it on first use.
    ///
    /// `Default` filter and zero anisotropy resolve to the device settings.
    pub fn sampler_state(
        &self,
        descriptor: SamplerStateDescriptor,
    ) -> Result<Arc<SamplerState>, GraphicsError> {
        self.samplers.get_or_create(
            descriptor.resolve(self.config.texture_filter, self.config.max_anisotropy),
        )
    }

    /// Number of distinct samplers created so far.
    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    /// Notify the device that the surface changed size.
    ///
    /// The back buffer is recreated at the start of the next frame. Invalid or
    /// empty sizes, such as a minimized window, are ignored.
    pub fn on_size_change(&self, size: Size2) {
        if !size.is_valid() || size.is_empty() {
            log::debug!("RenderDevice: ignoring surface size {:?}", size);
            return;
        }
        let Some(extent) = size.to_extent() else {
            return;
        };
        let size = Size2::from(extent);
        let mut pending = self.pending_size.lock();
        *pending = if size == *self.size.lock() {
            None
        } else {
            Some(size)
        };
    }

    /// Display modes the backend can present at.
    pub fn supported_resolutions(&self) -> Vec<Size2> {
        self.backend.supported_resolutions()
    }

    /// Run `task` on the render thread at the start of the next frame.
    pub fn execute_on_render_thread(&self, task: impl FnOnce() + Send + 'static) {
        self.work_queue.submit(task);
    }

    /// Queue a draw for the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] for an empty draw or too
    /// many textures, and [`GraphicsError::IncompatibleUsage`] when a resource
    /// belongs to another device or the render target is not one.
    pub fn add_draw_command(&self, command: DrawCommand) -> Result<(), GraphicsError> {
        if command.index_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "draw command has no indices".to_string(),
            ));
        }
        if command.textures.len() > MAX_TEXTURES {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} textures bound, at most {MAX_TEXTURES} allowed",
                command.textures.len()
            )));
        }

        self.check_owner(
            command.blend_state.device_ptr(),
            "blend state",
            command.blend_state.label(),
        )?;
        self.check_owner(command.shader.device_ptr(), "shader", command.shader.label())?;
        self.check_owner(
            command.mesh_buffer.device_ptr(),
            "mesh buffer",
            command.mesh_buffer.label(),
        )?;
        for texture in &command.textures {
            self.check_owner(texture.device_ptr(), "texture", texture.label())?;
        }
        if let Some(target) = &command.render_target {
            self.check_owner(target.device_ptr(), "render target", target.label())?;
            if !target.is_render_target() {
                return Err(GraphicsError::IncompatibleUsage(format!(
                    "texture {:?} is not a render target",
                    target.label()
                )));
            }
        }

        self.commands.lock().push(command);
        Ok(())
    }

    /// Number of draw commands waiting for the next frame.
    pub fn pending_draw_count(&self) -> usize {
        self.commands.lock().len()
    }

    /// Render one frame.
    ///
    /// In order: runs queued render-thread tasks, applies a pending back
    /// buffer resize, uploads every dirty resource, executes the queued draws
    /// in submission order, presents, and destroys released native objects.
    ///
    /// A resource whose upload fails stays dirty and is retried next frame; a
    /// draw that cannot execute is skipped. Both are logged.
    ///
    /// # Errors
    ///
    /// A failed back buffer resize skips the frame: its draw commands are
    /// discarded and the resize is retried next frame. Present failures are
    /// returned after the frame's releases are flushed.
    pub fn render_frame(&self) -> Result<FrameStats, GraphicsError> {
        let frame = self.frame.fetch_add(1, Ordering::Relaxed) + 1;
        let mut stats = FrameStats {
            frame,
            ..FrameStats::default()
        };

        stats.tasks_executed = self.work_queue.execute_all();
        let commands = std::mem::take(&mut *self.commands.lock());

        let pending = *self.pending_size.lock();
        if let Some(size) = pending {
            self.resize_back_buffer(size).inspect_err(|err| {
                log::error!(
                    "RenderDevice: frame {} skipped, {} draw(s) discarded: {}",
                    frame,
                    commands.len(),
                    err
                );
            })?;
            stats.resized = true;
        }

        let ctx = UploadContext::new(
            &self.samplers,
            self.config.texture_filter,
            self.config.max_anisotropy,
        );
        for resource in self.dirty_resources() {
            match resource.upload(&ctx) {
                Ok(()) => stats.uploads += 1,
                Err(err) => {
                    stats.upload_failures += 1;
                    log::error!(
                        "RenderDevice: {} {:?} upload failed: {}",
                        resource.kind(),
                        resource.label(),
                        err
                    );
                }
            }
        }

        for (index, command) in commands.iter().enumerate() {
            match self.execute(command) {
                Ok(()) => stats.draws_executed += 1,
                Err(err) => {
                    stats.draws_skipped += 1;
                    log::warn!("RenderDevice: frame {} draw {} skipped: {}", frame, index, err);
                }
            }
        }
        drop(commands);

        let interval = if self.config.vsync {
            self.host.vsync_interval()
        } else {
            0
        };
        let presented = self.backend.present(interval);

        stats.releases_flushed = self.backend.flush_releases();
        self.cleanup_dead_resources();

        if let Err(err) = presented {
            log::error!("RenderDevice: frame {} present failed: {}", frame, err);
            return Err(err);
        }

        log::trace!("RenderDevice: {:?}", stats);
        Ok(stats)
    }

    fn resize_back_buffer(&self, size: Size2) -> Result<(), GraphicsError> {
        let (width, height) = size.to_extent().ok_or_else(|| {
            GraphicsError::InvalidParameter(format!("invalid back buffer size {size:?}"))
        })?;
        self.backend.resize_back_buffer(width, height)?;

        *self.size.lock() = size;
        let mut pending = self.pending_size.lock();
        if *pending == Some(size) {
            *pending = None;
        }
        log::debug!("RenderDevice: back buffer resized to {}x{}", width, height);
        Ok(())
    }

    /// Dirty resources in upload order: buffers, textures, shaders, blend
    /// states, then mesh buffers.
    fn dirty_resources(&self) -> Vec<Arc<dyn GpuResource>> {
        let mut dirty = Vec::new();
        collect_dirty(&self.buffers, &mut dirty);
        collect_dirty(&self.textures, &mut dirty);
        collect_dirty(&self.shaders, &mut dirty);
        collect_dirty(&self.blend_states, &mut dirty);
        collect_dirty(&self.mesh_buffers, &mut dirty);
        dirty
    }

    fn execute(&self, command: &DrawCommand) -> Result<(), GraphicsError> {
        let blend_state = command
            .blend_state
            .native_binding()
            .ok_or_else(|| not_ready("blend state", command.blend_state.label()))?;
        let shader = command
            .shader
            .native_binding()
            .ok_or_else(|| not_ready("shader", command.shader.label()))?;
        let layout = command
            .mesh_buffer
            .native_layout()
            .ok_or_else(|| not_ready("mesh buffer", command.mesh_buffer.label()))?;

        let (index_buffer, vertex_buffer) = command
            .mesh_buffer
            .uploaded_buffers()
            .ok_or_else(|| not_ready("mesh buffer", command.mesh_buffer.label()))?;
        let mesh = MeshBinding {
            layout,
            index_buffer: index_buffer
                .native_binding()
                .ok_or_else(|| not_ready("index buffer", index_buffer.label()))?,
            vertex_buffer: vertex_buffer
                .native_binding()
                .ok_or_else(|| not_ready("vertex buffer", vertex_buffer.label()))?,
        };

        let mut textures: [Option<TextureBinding>; MAX_TEXTURES] = [None; MAX_TEXTURES];
        for (slot, texture) in command.textures.iter().enumerate() {
            textures[slot] = Some(
                texture
                    .native_binding()
                    .ok_or_else(|| not_ready("texture", texture.label()))?,
            );
        }

        let render_target = match &command.render_target {
            Some(target) => Some(
                target
                    .with_native(|native| native.render_target())
                    .ok_or_else(|| not_ready("render target", target.label()))?,
            ),
            None => None,
        };

        let viewport = command.viewport.unwrap_or_else(|| match &render_target {
            Some(target) => Rect::new(0.0, 0.0, target.width as f32, target.height as f32),
            None => {
                let size = self.size();
                Rect::new(0.0, 0.0, size.width, size.height)
            }
        });

        self.backend.draw(&NativeDrawCall {
            blend_state,
            shader: &shader,
            mesh,
            textures,
            render_target,
            pixel_constants: &command.pixel_constants,
            vertex_constants: &command.vertex_constants,
            index_count: command.index_count,
            start_index: command.start_index,
            mode: command.mode,
            viewport,
            depth_test: command.depth_test,
            depth_write: command.depth_write,
            scissor: command.scissor,
            cull_mode: command.cull_mode,
            fill_mode: command.fill_mode,
        })
    }

    fn check_owner(
        &self,
        owner: *const RenderDevice,
        kind: &str,
        label: Option<&str>,
    ) -> Result<(), GraphicsError> {
        if !std::ptr::eq(owner, self) {
            return Err(GraphicsError::IncompatibleUsage(format!(
                "{kind} {label:?} belongs to another device"
            )));
        }
        Ok(())
    }

    /// Counters of the backend's native device.
    pub fn backend_stats(&self) -> BackendStats {
        self.backend.stats()
    }

    /// Fault injection for the backend's native device.
    pub fn faults(&self) -> &FaultInjector {
        self.backend.faults()
    }

    /// Every draw the backend executed, oldest first.
    pub fn draw_log(&self) -> Vec<DrawRecord> {
        self.backend.draw_log()
    }

    /// Get the number of live textures created by this device.
    pub fn texture_count(&self) -> usize {
        live_count(&self.textures)
    }

    /// Get the number of live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        live_count(&self.buffers)
    }

    pub fn shader_count(&self) -> usize {
        live_count(&self.shaders)
    }

    pub fn blend_state_count(&self) -> usize {
        live_count(&self.blend_states)
    }

    pub fn mesh_buffer_count(&self) -> usize {
        live_count(&self.mesh_buffers)
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        self.buffers.write().retain(|w| w.strong_count() > 0);
        self.textures.write().retain(|w| w.strong_count() > 0);
        self.shaders.write().retain(|w| w.strong_count() > 0);
        self.blend_states.write().retain(|w| w.strong_count() > 0);
        self.mesh_buffers.write().retain(|w| w.strong_count() > 0);
    }
}

fn live_count<T>(registry: &RwLock<Vec<Weak<T>>>) -> usize {
    registry.read().iter().filter(|w| w.strong_count() > 0).count()
}

fn collect_dirty<T: GpuResource + 'static>(
    registry: &RwLock<Vec<Weak<T>>>,
    out: &mut Vec<Arc<dyn GpuResource>>,
) {
    out.extend(
        registry
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|resource| resource.is_dirty())
            .map(|resource| resource as Arc<dyn GpuResource>),
    );
}

fn not_ready(kind: &str, label: Option<&str>) -> GraphicsError {
    GraphicsError::ResourceNotReady(format!("{kind} {label:?} has no native object"))
}

impl std::fmt::Debug for RenderDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDevice")
            .field("backend", &self.backend.name())
            .field("size", &self.size())
            .field("frame", &self.frame_count())
            .field("pending_draws", &self.pending_draw_count())
            .finish()
    }
}

// Ensure RenderDevice is Send + Sync
static_assertions::assert_impl_all!(RenderDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FaultKind;
    use crate::platform::HeadlessHost;
    use crate::types::{
        AttributeFormat, ShaderUniform, TextureFlags, UniformKind, VertexAttribute, VertexUsage,
    };
    use tessera_core::texture::PixelFormat;

    fn create_test_device() -> Arc<RenderDevice> {
        let host = Arc::new(HeadlessHost::new(Size2::new(64.0, 64.0)));
        RenderDevice::new(DeviceConfig::new(), host).unwrap()
    }

    struct Scene {
        blend: Arc<BlendState>,
        shader: Arc<Shader>,
        mesh: Arc<MeshBuffer>,
    }

    fn scene(device: &Arc<RenderDevice>) -> Scene {
        let indices = device
            .create_buffer(&BufferDescriptor::index().with_typed_data(&[0u16, 1, 2]))
            .unwrap();
        let vertices = device
            .create_buffer(&BufferDescriptor::vertex().with_typed_data(&[0.0f32; 9]))
            .unwrap();
        let attributes = vec![VertexAttribute::new(
            VertexUsage::Position,
            AttributeFormat::Float3,
        )];
        let mesh = device
            .create_mesh_buffer(&MeshBufferDescriptor::new(
                2,
                indices,
                vertices,
                attributes.clone(),
            ))
            .unwrap();
        let shader = device
            .create_shader(
                &ShaderDescriptor::new(b"ps".to_vec(), b"vs".to_vec())
                    .with_vertex_attributes(attributes)
                    .with_pixel_uniforms(vec![ShaderUniform::new("tint", UniformKind::Float4)]),
            )
            .unwrap();
        let blend = device.create_blend_state(&BlendDescriptor::opaque());
        Scene {
            blend,
            shader,
            mesh,
        }
    }

    #[test]
    fn test_device_takes_host_size() {
        let device = create_test_device();
        assert_eq!(device.size(), Size2::new(64.0, 64.0));
        assert_eq!(device.frame_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let host = Arc::new(HeadlessHost::new(Size2::new(64.0, 64.0)));
        let result = RenderDevice::new(DeviceConfig::new().with_max_anisotropy(0), host);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_resource_registries() {
        let device = create_test_device();
        {
            let scene = scene(&device);
            assert_eq!(device.buffer_count(), 2);
            assert_eq!(device.mesh_buffer_count(), 1);
            assert_eq!(device.shader_count(), 1);
            assert_eq!(device.blend_state_count(), 1);
            drop(scene);
        }
        device.cleanup_dead_resources();
        assert_eq!(device.buffer_count(), 0);
        assert_eq!(device.mesh_buffer_count(), 0);
    }

    #[test]
    fn test_render_frame_uploads_and_draws() {
        let device = create_test_device();
        let scene = scene(&device);
        device
            .add_draw_command(
                DrawCommand::new(scene.blend, scene.shader, scene.mesh, 3)
                    .with_pixel_constant(&[1.0, 0.0, 0.0, 1.0]),
            )
            .unwrap();

        let stats = device.render_frame().unwrap();
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.uploads, 5);
        assert_eq!(stats.upload_failures, 0);
        assert_eq!(stats.draws_executed, 1);
        assert_eq!(device.pending_draw_count(), 0);
        assert_eq!(device.draw_log().len(), 1);

        // Nothing dirty the second time around.
        let stats = device.render_frame().unwrap();
        assert_eq!(stats.uploads, 0);
        assert_eq!(stats.draws_executed, 0);
    }

    #[test]
    fn test_empty_draw_rejected() {
        let device = create_test_device();
        let scene = scene(&device);
        let result = device.add_draw_command(DrawCommand::new(scene.blend, scene.shader, scene.mesh, 0));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_foreign_resources_rejected() {
        let device = create_test_device();
        let other = create_test_device();
        let scene = scene(&device);
        let foreign = scene_blend(&other);
        let result =
            device.add_draw_command(DrawCommand::new(foreign, scene.shader, scene.mesh, 3));
        assert!(matches!(result, Err(GraphicsError::IncompatibleUsage(_))));

        let vertices = other.create_buffer(&BufferDescriptor::vertex()).unwrap();
        let indices = device.create_buffer(&BufferDescriptor::index()).unwrap();
        let result = device.create_mesh_buffer(&MeshBufferDescriptor::new(
            2,
            indices,
            vertices,
            Vec::new(),
        ));
        assert!(matches!(result, Err(GraphicsError::IncompatibleUsage(_))));
    }

    fn scene_blend(device: &Arc<RenderDevice>) -> Arc<BlendState> {
        device.create_blend_state(&BlendDescriptor::alpha_blend())
    }

    #[test]
    fn test_render_target_flag_required() {
        let device = create_test_device();
        let scene = scene(&device);
        let texture = device
            .create_texture(&TextureDescriptor::new(
                Size2::new(4.0, 4.0),
                PixelFormat::Rgba8Unorm,
            ))
            .unwrap();
        let result = device.add_draw_command(
            DrawCommand::new(scene.blend, scene.shader, scene.mesh, 3).with_render_target(texture),
        );
        assert!(matches!(result, Err(GraphicsError::IncompatibleUsage(_))));
    }

    #[test]
    fn test_render_target_draw() {
        let device = create_test_device();
        let scene = scene(&device);
        let target = device
            .create_texture(
                &TextureDescriptor::render_target(Size2::new(32.0, 16.0), PixelFormat::Rgba8Unorm)
                    .with_flags(TextureFlags::RENDER_TARGET | TextureFlags::DEPTH_BUFFER),
            )
            .unwrap();
        device
            .add_draw_command(
                DrawCommand::new(scene.blend, scene.shader, scene.mesh, 3)
                    .with_render_target(Arc::clone(&target)),
            )
            .unwrap();
        let stats = device.render_frame().unwrap();
        assert_eq!(stats.draws_executed, 1);

        let record = &device.draw_log()[0];
        assert_eq!(
            record.render_target,
            target.with_native(|native| native.render_target().map(|rt| rt.target))
        );
    }

    #[test]
    fn test_size_change_applied_next_frame() {
        let device = create_test_device();
        device.on_size_change(Size2::new(128.0, 96.0));
        assert_eq!(device.pending_size(), Some(Size2::new(128.0, 96.0)));
        assert_eq!(device.size(), Size2::new(64.0, 64.0));

        let stats = device.render_frame().unwrap();
        assert!(stats.resized);
        assert_eq!(device.size(), Size2::new(128.0, 96.0));
        assert_eq!(device.pending_size(), None);
    }

    #[test]
    fn test_degenerate_sizes_ignored() {
        let device = create_test_device();
        device.on_size_change(Size2::ZERO);
        device.on_size_change(Size2::new(-4.0, 10.0));
        device.on_size_change(Size2::new(f32::NAN, 10.0));
        assert_eq!(device.pending_size(), None);

        device.on_size_change(Size2::new(100.0, 100.0));
        device.on_size_change(Size2::new(64.0, 64.0));
        assert_eq!(device.pending_size(), None);
    }

    #[test]
    fn test_render_thread_tasks_run_first() {
        let device = create_test_device();
        let texture = device
            .create_texture(&TextureDescriptor::new(
                Size2::new(2.0, 2.0),
                PixelFormat::Rgba8Unorm,
            ))
            .unwrap();
        let queued = Arc::clone(&texture);
        device.execute_on_render_thread(move || {
            queued.set_data(&[255; 16], Size2::new(2.0, 2.0)).unwrap();
        });

        let stats = device.render_frame().unwrap();
        assert_eq!(stats.tasks_executed, 1);
        assert!(!texture.is_dirty());
    }

    #[test]
    fn test_present_failure_still_flushes() {
        let device = create_test_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::vertex().with_data(vec![1u8; 16]))
            .unwrap();
        device.render_frame().unwrap();
        buffer.set_data(&[2u8; 16]).unwrap();

        device.faults().fail_next(FaultKind::Present, 1);
        assert!(device.render_frame().is_err());
        assert_eq!(device.backend_stats().pending_releases, 0);
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_draw_uses_uploaded_mesh_buffers() {
        let device = create_test_device();
        let scene = scene(&device);
        let command = DrawCommand::new(scene.blend, scene.shader, Arc::clone(&scene.mesh), 3);
        assert!(matches!(
            device.execute(&command),
            Err(GraphicsError::ResourceNotReady(_))
        ));
        device.render_frame().unwrap();

        let uploaded = scene.mesh.index_buffer();
        let fresh = device
            .create_buffer(&BufferDescriptor::index().with_typed_data(&[0u16, 1, 2, 3]))
            .unwrap();
        scene.mesh.set_index_buffer(Arc::clone(&fresh)).unwrap();

        // Until the next upload, draws bind what the layout was built for.
        device.execute(&command).unwrap();
        let record = device.draw_log().pop().unwrap();
        assert_eq!(
            Some(record.index_buffer),
            uploaded.native_binding().map(|binding| binding.handle)
        );

        device.render_frame().unwrap();
        let (index_buffer, _) = scene.mesh.uploaded_buffers().unwrap();
        assert!(Arc::ptr_eq(&index_buffer, &fresh));
    }

    #[test]
    fn test_sampler_anisotropy_clamped_before_lookup() {
        let device = create_test_device();
        let sampler = |max_anisotropy| {
            device
                .sampler_state(SamplerStateDescriptor {
                    max_anisotropy,
                    ..SamplerStateDescriptor::default()
                })
                .unwrap()
        };
        let a = sampler(16);
        let b = sampler(64);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.descriptor().max_anisotropy, 16);
        assert_eq!(device.sampler_count(), 1);
    }

    #[test]
    fn test_sampler_state_resolves_defaults() {
        let device = create_test_device();
        let a = device.sampler_state(SamplerStateDescriptor::default()).unwrap();
        let b = device.sampler_state(SamplerStateDescriptor::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.descriptor().filter, device.config().texture_filter);
        assert_eq!(device.sampler_count(), 1);
    }
}

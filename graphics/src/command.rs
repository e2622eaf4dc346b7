//! Draw commands.
//!
//! A [`DrawCommand`] is an immutable snapshot of everything one indexed draw
//! needs. Commands are recorded with [`RenderDevice::add_draw_command`] and
//! executed in submission order by the next
//! [`RenderDevice::render_frame`], after every resource has been uploaded.
//!
//! [`RenderDevice::add_draw_command`]: crate::RenderDevice::add_draw_command
//! [`RenderDevice::render_frame`]: crate::RenderDevice::render_frame

use std::sync::Arc;

use crate::resources::{BlendState, MeshBuffer, Shader, Texture};
use crate::types::{CullMode, DrawMode, FillMode, Rect};

/// One indexed draw.
///
/// Holds strong references to every resource it uses, so resources dropped
/// by the application stay alive until the command has executed.
///
/// # Example
///
/// ```ignore
/// device.add_draw_command(
///     DrawCommand::new(blend, shader, mesh, 6)
///         .with_texture(albedo)
///         .with_pixel_constant(&[1.0, 0.5, 0.5, 1.0])
///         .with_cull_mode(CullMode::Back),
/// )?;
/// ```
#[derive(Clone)]
pub struct DrawCommand {
    pub(crate) blend_state: Arc<BlendState>,
    pub(crate) shader: Arc<Shader>,
    pub(crate) mesh_buffer: Arc<MeshBuffer>,
    pub(crate) textures: Vec<Arc<Texture>>,
    pub(crate) render_target: Option<Arc<Texture>>,
    pub(crate) pixel_constants: Vec<Vec<f32>>,
    pub(crate) vertex_constants: Vec<Vec<f32>>,
    pub(crate) index_count: u32,
    pub(crate) start_index: u32,
    pub(crate) mode: DrawMode,
    pub(crate) viewport: Option<Rect>,
    pub(crate) depth_test: bool,
    pub(crate) depth_write: bool,
    pub(crate) scissor: Option<Rect>,
    pub(crate) cull_mode: CullMode,
    pub(crate) fill_mode: FillMode,
}

impl DrawCommand {
    /// Draw `index_count` indices of `mesh_buffer` as a triangle list.
    pub fn new(
        blend_state: Arc<BlendState>,
        shader: Arc<Shader>,
        mesh_buffer: Arc<MeshBuffer>,
        index_count: u32,
    ) -> Self {
        Self {
            blend_state,
            shader,
            mesh_buffer,
            textures: Vec::new(),
            render_target: None,
            pixel_constants: Vec::new(),
            vertex_constants: Vec::new(),
            index_count,
            start_index: 0,
            mode: DrawMode::default(),
            viewport: None,
            depth_test: false,
            depth_write: false,
            scissor: None,
            cull_mode: CullMode::default(),
            fill_mode: FillMode::default(),
        }
    }

    /// Bind a texture to the next free slot.
    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.textures.push(texture);
        self
    }

    /// Render into `target` instead of the back buffer.
    pub fn with_render_target(mut self, target: Arc<Texture>) -> Self {
        self.render_target = Some(target);
        self
    }

    /// Append the value of the next declared pixel shader constant.
    pub fn with_pixel_constant(mut self, values: &[f32]) -> Self {
        self.pixel_constants.push(values.to_vec());
        self
    }

    /// Append the value of the next declared vertex shader constant.
    pub fn with_vertex_constant(mut self, values: &[f32]) -> Self {
        self.vertex_constants.push(values.to_vec());
        self
    }

    pub fn with_start_index(mut self, start_index: u32) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn with_mode(mut self, mode: DrawMode) -> Self {
        self.mode = mode;
        self
    }

    /// Viewport in pixels. Defaults to the whole render target.
    pub fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    pub fn with_scissor(mut self, scissor: Rect) -> Self {
        self.scissor = Some(scissor);
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn textures(&self) -> &[Arc<Texture>] {
        &self.textures
    }

    pub fn render_target(&self) -> Option<&Arc<Texture>> {
        self.render_target.as_ref()
    }
}

impl std::fmt::Debug for DrawCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawCommand")
            .field("shader", &self.shader.label())
            .field("mesh_buffer", &self.mesh_buffer.label())
            .field("textures", &self.textures.len())
            .field("render_target", &self.render_target.as_ref().map(|t| t.label()))
            .field("index_count", &self.index_count)
            .field("start_index", &self.start_index)
            .field("mode", &self.mode)
            .finish()
    }
}

static_assertions::assert_impl_all!(DrawCommand: Send, Sync);

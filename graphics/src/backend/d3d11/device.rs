//! Software Direct3D 11 device.
//!
//! Models the subset of `ID3D11Device`/`ID3D11DeviceContext`/`IDXGISwapChain`
//! the pipeline uses, enforcing the usage rules a real driver enforces:
//! immutable resources need initial data and cannot be mapped, only dynamic
//! resources with CPU write access can be mapped, and mapped texture rows are
//! aligned to [`ROW_PITCH_ALIGNMENT`].

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::backend::pitch::{align_up, copy_rows};
use crate::backend::software::{
    BackendStats, DrawLog, FaultInjector, FaultKind, ObjectStore, StatsCounters,
};
use crate::backend::{DrawRecord, NativeHandle};
use crate::error::GraphicsError;

use super::BACKEND_NAME;
use super::conversion::DxgiFormat;

/// Alignment of mapped texture row pitches.
pub const ROW_PITCH_ALIGNMENT: u32 = 16;

/// An `HRESULT` returned by a failing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HResult(pub u32);

impl HResult {
    pub const E_INVALIDARG: Self = Self(0x8007_0057);
    pub const E_OUTOFMEMORY: Self = Self(0x8007_000E);
    pub const DXGI_ERROR_INVALID_CALL: Self = Self(0x887A_0001);
    pub const DXGI_ERROR_DEVICE_REMOVED: Self = Self(0x887A_0005);
    pub const DXGI_ERROR_WAS_STILL_DRAWING: Self = Self(0x887A_000A);

    /// Wrap into a graphics error naming the failed call.
    pub fn into_error(self, operation: &'static str) -> GraphicsError {
        GraphicsError::Backend {
            backend: BACKEND_NAME,
            operation,
            code: self.0,
        }
    }
}

pub type D3dResult<T> = Result<T, HResult>;

/// `D3D11_USAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    Default,
    Immutable,
    Dynamic,
}

bitflags! {
    /// `D3D11_BIND_FLAG`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BindFlags: u32 {
        const VERTEX_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        const CONSTANT_BUFFER = 0x4;
        const SHADER_RESOURCE = 0x8;
        const RENDER_TARGET = 0x20;
        const DEPTH_STENCIL = 0x40;
    }
}

/// `D3D11_MAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapType {
    /// Contents are discarded; the mapped memory starts zeroed.
    WriteDiscard,
    /// Contents are preserved.
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub byte_width: u32,
    pub usage: Usage,
    pub bind_flags: BindFlags,
    pub cpu_write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture2dDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: DxgiFormat,
    pub sample_count: u32,
    pub usage: Usage,
    pub bind_flags: BindFlags,
    pub cpu_write: bool,
}

/// `D3D11_SUBRESOURCE_DATA`.
#[derive(Debug, Clone, Copy)]
pub struct SubresourceData<'a> {
    pub data: &'a [u8],
    pub pitch: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc {
    pub filter: u32,
    pub address_u: u32,
    pub address_v: u32,
    pub max_anisotropy: u32,
}

/// `D3D11_RENDER_TARGET_BLEND_DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendDesc {
    pub enable: bool,
    pub src_blend: u32,
    pub dest_blend: u32,
    pub blend_op: u32,
    pub src_blend_alpha: u32,
    pub dest_blend_alpha: u32,
    pub blend_op_alpha: u32,
    pub write_mask: u8,
}

/// `D3D11_INPUT_ELEMENT_DESC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElementDesc {
    pub semantic: &'static str,
    pub semantic_index: u32,
    pub format: DxgiFormat,
    pub offset: u32,
}

#[derive(Debug)]
struct Subresource {
    row_pitch: u32,
    data: Vec<u8>,
}

#[derive(Debug)]
enum Object {
    Buffer {
        desc: BufferDesc,
        data: Vec<u8>,
    },
    Texture2d {
        desc: Texture2dDesc,
        subresources: Vec<Subresource>,
    },
    ShaderResourceView,
    RenderTargetView,
    DepthStencilView,
    SamplerState,
    BlendState,
    VertexShader,
    PixelShader,
    InputLayout,
}

#[derive(Debug, Clone, Copy)]
struct BackBuffer {
    texture: NativeHandle,
    view: NativeHandle,
    depth: Option<(NativeHandle, NativeHandle)>,
}

impl BackBuffer {
    fn handles(&self) -> impl Iterator<Item = NativeHandle> {
        let depth = self.depth.map(|(texture, view)| [view, texture]);
        [self.view, self.texture]
            .into_iter()
            .chain(depth.into_iter().flatten())
    }
}

#[derive(Debug)]
struct SwapChain {
    width: u32,
    height: u32,
    depth: bool,
    back_buffer: Option<BackBuffer>,
}

/// The software device.
#[derive(Debug)]
pub struct D3d11Device {
    objects: ObjectStore<Object>,
    stats: StatsCounters,
    faults: FaultInjector,
    draws: DrawLog,
    swap_chain: Mutex<SwapChain>,
    debug: bool,
}

impl D3d11Device {
    /// Create the device and a swap chain of `width` x `height`.
    ///
    /// A zero dimension defers back buffer creation to the first
    /// [`resize_buffers`](Self::resize_buffers).
    pub fn new(width: u32, height: u32, depth: bool, debug: bool) -> D3dResult<Self> {
        let device = Self {
            objects: ObjectStore::default(),
            stats: StatsCounters::default(),
            faults: FaultInjector::default(),
            draws: DrawLog::default(),
            swap_chain: Mutex::new(SwapChain {
                width: 0,
                height: 0,
                depth,
                back_buffer: None,
            }),
            debug,
        };
        if width > 0 && height > 0 {
            let back_buffer = device.create_back_buffer(width, height, depth)?;
            let mut swap_chain = device.swap_chain.lock();
            swap_chain.width = width;
            swap_chain.height = height;
            swap_chain.back_buffer = Some(back_buffer);
        }
        Ok(device)
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

    fn allocate(&self, object: Object) -> D3dResult<NativeHandle> {
        if self.faults.trip(FaultKind::Allocation) {
            return Err(HResult::E_OUTOFMEMORY);
        }
        StatsCounters::bump(&self.stats.allocations);
        Ok(self.objects.insert(object))
    }

    /// `ID3D11Device::CreateBuffer`.
    pub fn create_buffer(
        &self,
        desc: &BufferDesc,
        initial: Option<&[u8]>,
    ) -> D3dResult<NativeHandle> {
        if desc.byte_width == 0 {
            return Err(HResult::E_INVALIDARG);
        }
        if desc.usage == Usage::Dynamic && !desc.cpu_write {
            return Err(HResult::E_INVALIDARG);
        }
        if desc.usage != Usage::Dynamic && desc.cpu_write {
            return Err(HResult::E_INVALIDARG);
        }
        let len = desc.byte_width as usize;
        let data = match initial {
            Some(initial) if initial.len() < len => return Err(HResult::E_INVALIDARG),
            Some(initial) => initial[..len].to_vec(),
            None if desc.usage == Usage::Immutable => return Err(HResult::E_INVALIDARG),
            None => vec![0; len],
        };
        self.allocate(Object::Buffer { desc: *desc, data })
    }

    /// `ID3D11Device::CreateTexture2D`.
    ///
    /// `initial` holds one entry per mip level.
    pub fn create_texture_2d(
        &self,
        desc: &Texture2dDesc,
        initial: Option<&[SubresourceData<'_>]>,
    ) -> D3dResult<NativeHandle> {
        let pixel_size = desc.format.pixel_size();
        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 || pixel_size == 0 {
            return Err(HResult::E_INVALIDARG);
        }
        if desc.sample_count == 0 || (desc.sample_count > 1 && desc.mip_levels > 1) {
            return Err(HResult::E_INVALIDARG);
        }
        if desc.usage == Usage::Dynamic
            && (!desc.cpu_write || desc.bind_flags.contains(BindFlags::RENDER_TARGET))
        {
            return Err(HResult::E_INVALIDARG);
        }
        if desc.usage != Usage::Dynamic && desc.cpu_write {
            return Err(HResult::E_INVALIDARG);
        }
        match initial {
            Some(levels) if levels.len() != desc.mip_levels as usize => {
                return Err(HResult::E_INVALIDARG);
            }
            None if desc.usage == Usage::Immutable => return Err(HResult::E_INVALIDARG),
            _ => {}
        }

        let mut subresources = Vec::with_capacity(desc.mip_levels as usize);
        let (mut width, mut height) = (desc.width, desc.height);
        for level in 0..desc.mip_levels as usize {
            let row_pitch = align_up(width * pixel_size, ROW_PITCH_ALIGNMENT);
            let mut data = vec![0; row_pitch as usize * height as usize];
            if let Some(source) = initial.map(|levels| levels[level]) {
                if source.pitch < width * pixel_size {
                    return Err(HResult::E_INVALIDARG);
                }
                copy_rows(&mut data, row_pitch, source.data, source.pitch, height);
            }
            subresources.push(Subresource { row_pitch, data });
            width = (width / 2).max(1);
            height = (height / 2).max(1);
        }

        self.allocate(Object::Texture2d {
            desc: *desc,
            subresources,
        })
    }

    fn texture_bind_flags(&self, resource: NativeHandle) -> Option<BindFlags> {
        self.objects.with(resource, |object| match object {
            Object::Texture2d { desc, .. } => Some(desc.bind_flags),
            _ => None,
        })?
    }

    /// `ID3D11Device::CreateShaderResourceView`.
    pub fn create_shader_resource_view(&self, resource: NativeHandle) -> D3dResult<NativeHandle> {
        match self.texture_bind_flags(resource) {
            Some(flags) if flags.contains(BindFlags::SHADER_RESOURCE) => {
                self.allocate(Object::ShaderResourceView)
            }
            _ => Err(HResult::E_INVALIDARG),
        }
    }

    /// `ID3D11Device::CreateRenderTargetView`.
    pub fn create_render_target_view(&self, resource: NativeHandle) -> D3dResult<NativeHandle> {
        match self.texture_bind_flags(resource) {
            Some(flags) if flags.contains(BindFlags::RENDER_TARGET) => {
                self.allocate(Object::RenderTargetView)
            }
            _ => Err(HResult::E_INVALIDARG),
        }
    }

    /// `ID3D11Device::CreateDepthStencilView`.
    pub fn create_depth_stencil_view(&self, resource: NativeHandle) -> D3dResult<NativeHandle> {
        match self.texture_bind_flags(resource) {
            Some(flags) if flags.contains(BindFlags::DEPTH_STENCIL) => {
                self.allocate(Object::DepthStencilView)
            }
            _ => Err(HResult::E_INVALIDARG),
        }
    }

    /// `ID3D11Device::CreateSamplerState`.
    pub fn create_sampler_state(&self, desc: &SamplerDesc) -> D3dResult<NativeHandle> {
        if desc.max_anisotropy == 0 || desc.max_anisotropy > 16 {
            return Err(HResult::E_INVALIDARG);
        }
        if !(1..=3).contains(&desc.address_u) || !(1..=3).contains(&desc.address_v) {
            return Err(HResult::E_INVALIDARG);
        }
        let handle = self.allocate(Object::SamplerState)?;
        StatsCounters::bump(&self.stats.samplers);
        Ok(handle)
    }

    /// `ID3D11Device::CreateBlendState`.
    pub fn create_blend_state(&self, desc: &BlendDesc) -> D3dResult<NativeHandle> {
        let factors = [
            desc.src_blend,
            desc.dest_blend,
            desc.src_blend_alpha,
            desc.dest_blend_alpha,
        ];
        if factors.iter().any(|f| !(1..=17).contains(f))
            || !(1..=5).contains(&desc.blend_op)
            || !(1..=5).contains(&desc.blend_op_alpha)
            || desc.write_mask > 0xF
        {
            return Err(HResult::E_INVALIDARG);
        }
        self.allocate(Object::BlendState)
    }

    /// `ID3D11Device::CreateVertexShader`.
    pub fn create_vertex_shader(&self, bytecode: &[u8]) -> D3dResult<NativeHandle> {
        if bytecode.is_empty() {
            return Err(HResult::E_INVALIDARG);
        }
        self.allocate(Object::VertexShader)
    }

    /// `ID3D11Device::CreatePixelShader`.
    pub fn create_pixel_shader(&self, bytecode: &[u8]) -> D3dResult<NativeHandle> {
        if bytecode.is_empty() {
            return Err(HResult::E_INVALIDARG);
        }
        self.allocate(Object::PixelShader)
    }

    /// `ID3D11Device::CreateInputLayout`.
    pub fn create_input_layout(
        &self,
        elements: &[InputElementDesc],
        vertex_bytecode: &[u8],
    ) -> D3dResult<NativeHandle> {
        if vertex_bytecode.is_empty() || elements.iter().any(|e| e.format.pixel_size() == 0) {
            return Err(HResult::E_INVALIDARG);
        }
        self.allocate(Object::InputLayout)
    }

    /// `ID3D11DeviceContext::Map` + `Unmap` around a write.
    ///
    /// `write` receives the mapped subresource and its row pitch.
    pub fn map_write<F>(
        &self,
        resource: NativeHandle,
        subresource: u32,
        map_type: MapType,
        write: F,
    ) -> D3dResult<()>
    where
        F: FnOnce(&mut [u8], u32),
    {
        if self.faults.trip(FaultKind::Map) {
            return Err(HResult::DXGI_ERROR_WAS_STILL_DRAWING);
        }
        let result = self.objects.with_mut(resource, |object| match object {
            Object::Buffer { desc, data } => {
                if !desc.cpu_write || subresource != 0 || map_type != MapType::WriteDiscard {
                    return Err(HResult::E_INVALIDARG);
                }
                data.fill(0);
                let pitch = desc.byte_width;
                write(data, pitch);
                Ok(())
            }
            Object::Texture2d { desc, subresources } => {
                if !desc.cpu_write {
                    return Err(HResult::E_INVALIDARG);
                }
                let Some(sub) = subresources.get_mut(subresource as usize) else {
                    return Err(HResult::E_INVALIDARG);
                };
                if map_type == MapType::WriteDiscard {
                    sub.data.fill(0);
                }
                write(&mut sub.data, sub.row_pitch);
                Ok(())
            }
            _ => Err(HResult::E_INVALIDARG),
        });
        result.unwrap_or(Err(HResult::E_INVALIDARG))?;
        StatsCounters::bump(&self.stats.writes);
        Ok(())
    }

    /// Release an object now.
    pub fn release(&self, handle: NativeHandle) {
        if self.objects.remove(handle) {
            StatsCounters::bump(&self.stats.releases);
        }
    }

    /// Queue an object for release at the next [`flush_releases`](Self::flush_releases).
    pub fn defer_release(&self, handle: NativeHandle) {
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

    /// Copy of a buffer's contents.
    pub fn read_buffer(&self, handle: NativeHandle) -> Option<Vec<u8>> {
        self.objects.with(handle, |object| match object {
            Object::Buffer { data, .. } => Some(data.clone()),
            _ => None,
        })?
    }

    /// Copy of a texture subresource at native row pitch.
    pub fn read_subresource(&self, handle: NativeHandle, subresource: u32) -> Option<Vec<u8>> {
        self.objects.with(handle, |object| match object {
            Object::Texture2d { subresources, .. } => subresources
                .get(subresource as usize)
                .map(|sub| sub.data.clone()),
            _ => None,
        })?
    }

    /// Native row pitch of every level of a texture.
    pub fn row_pitches(&self, handle: NativeHandle) -> Vec<u32> {
        self.objects
            .with(handle, |object| match object {
                Object::Texture2d { subresources, .. } => {
                    subresources.iter().map(|sub| sub.row_pitch).collect()
                }
                _ => Vec::new(),
            })
            .unwrap_or_default()
    }

    /// Write a constant buffer with discard semantics.
    pub fn update_constants(&self, buffer: NativeHandle, constants: &[Vec<f32>]) -> D3dResult<()> {
        let bytes: Vec<u8> = constants
            .iter()
            .flat_map(|values| bytemuck::cast_slice::<f32, u8>(values).iter().copied())
            .collect();
        self.map_write(buffer, 0, MapType::WriteDiscard, |data, _| {
            let len = bytes.len().min(data.len());
            data[..len].copy_from_slice(&bytes[..len]);
        })
    }

    fn create_back_buffer(&self, width: u32, height: u32, depth: bool) -> D3dResult<BackBuffer> {
        let mut created = Vec::new();
        let result = self.create_back_buffer_objects(width, height, depth, &mut created);
        if result.is_err() {
            for handle in created.into_iter().rev() {
                self.release(handle);
            }
        }
        result
    }

    fn create_back_buffer_objects(
        &self,
        width: u32,
        height: u32,
        depth: bool,
        created: &mut Vec<NativeHandle>,
    ) -> D3dResult<BackBuffer> {
        let mut desc = Texture2dDesc {
            width,
            height,
            mip_levels: 1,
            format: DxgiFormat::B8G8R8A8_UNORM,
            sample_count: 1,
            usage: Usage::Default,
            bind_flags: BindFlags::RENDER_TARGET,
            cpu_write: false,
        };
        let texture = self.create_texture_2d(&desc, None)?;
        created.push(texture);
        let view = self.create_render_target_view(texture)?;
        created.push(view);

        let depth = if depth {
            desc.format = DxgiFormat::D32_FLOAT;
            desc.bind_flags = BindFlags::DEPTH_STENCIL;
            let depth_texture = self.create_texture_2d(&desc, None)?;
            created.push(depth_texture);
            let depth_view = self.create_depth_stencil_view(depth_texture)?;
            created.push(depth_view);
            Some((depth_texture, depth_view))
        } else {
            None
        };

        Ok(BackBuffer {
            texture,
            view,
            depth,
        })
    }

    /// `IDXGISwapChain::ResizeBuffers`.
    pub fn resize_buffers(&self, width: u32, height: u32) -> D3dResult<()> {
        if self.faults.trip(FaultKind::BackBuffer) {
            return Err(HResult::DXGI_ERROR_INVALID_CALL);
        }
        if width == 0 || height == 0 {
            return Err(HResult::E_INVALIDARG);
        }
        let mut swap_chain = self.swap_chain.lock();
        let back_buffer = self.create_back_buffer(width, height, swap_chain.depth)?;
        if let Some(old) = swap_chain.back_buffer.replace(back_buffer) {
            for handle in old.handles() {
                self.release(handle);
            }
        }
        swap_chain.width = width;
        swap_chain.height = height;
        StatsCounters::bump(&self.stats.back_buffer_resizes);
        Ok(())
    }

    pub fn back_buffer_size(&self) -> (u32, u32) {
        let swap_chain = self.swap_chain.lock();
        (swap_chain.width, swap_chain.height)
    }

    /// Validate bound handles and record an indexed draw.
    pub fn draw_indexed(&self, handles: &[NativeHandle], record: DrawRecord) -> D3dResult<()> {
        if self.faults.trip(FaultKind::Draw) {
            return Err(HResult::DXGI_ERROR_INVALID_CALL);
        }
        if let Some(missing) = handles.iter().find(|h| !self.objects.contains(**h)) {
            if self.debug {
                log::debug!("{}: draw references released object {:?}", BACKEND_NAME, missing);
            }
            return Err(HResult::E_INVALIDARG);
        }
        if self.swap_chain.lock().back_buffer.is_none() && record.render_target.is_none() {
            return Err(HResult::DXGI_ERROR_INVALID_CALL);
        }
        StatsCounters::bump(&self.stats.draws);
        self.draws.push(record);
        Ok(())
    }

    /// `IDXGISwapChain::Present`.
    pub fn present(&self, sync_interval: u32) -> D3dResult<()> {
        if self.faults.trip(FaultKind::Present) {
            return Err(HResult::DXGI_ERROR_DEVICE_REMOVED);
        }
        if sync_interval > 4 {
            return Err(HResult::E_INVALIDARG);
        }
        StatsCounters::bump(&self.stats.presents);
        Ok(())
    }
}

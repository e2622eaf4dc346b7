//! Texture and render target resource.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tessera_core::color::Color;
use tessera_core::math::Size2;
use tessera_core::sampler::{AddressMode, TextureFilter};
use tessera_core::texture::PixelFormat;

use crate::backend::{NativeTextureInfo, TextureBackend, TextureBinding, UploadContext};
use crate::device::RenderDevice;
use crate::error::GraphicsError;
use crate::types::{MipLevel, SamplerStateDescriptor, TextureData, TextureDescriptor, TextureFlags};

use super::{DirtyFlags, GpuResource, ResourceKind, ResourceState, mipmaps, upload_locked};

/// Logical state of a [`Texture`].
#[derive(Debug, Clone)]
pub struct TextureState {
    width: u32,
    height: u32,
    format: PixelFormat,
    flags: TextureFlags,
    mip_levels: u32,
    sample_count: u32,
    levels: Vec<MipLevel>,
    filter: TextureFilter,
    address_x: AddressMode,
    address_y: AddressMode,
    max_anisotropy: u32,
    clear_color: Color,
    clear_color_buffer: bool,
    clear_depth_buffer: bool,
    dirty: DirtyFlags,
}

impl TextureState {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn flags(&self) -> TextureFlags {
        self.flags
    }

    pub fn is_render_target(&self) -> bool {
        self.flags.contains(TextureFlags::RENDER_TARGET)
    }

    pub fn is_dynamic(&self) -> bool {
        self.flags.contains(TextureFlags::DYNAMIC)
    }

    pub fn has_depth_buffer(&self) -> bool {
        self.flags.contains(TextureFlags::DEPTH_BUFFER)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Mip levels, top level first. Empty for zero-sized textures.
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    /// Sampler key before device defaults are applied.
    pub fn sampler_descriptor(&self) -> SamplerStateDescriptor {
        SamplerStateDescriptor::new(
            self.filter,
            self.address_x,
            self.address_y,
            self.max_anisotropy,
        )
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn clear_color_buffer(&self) -> bool {
        self.clear_color_buffer
    }

    pub fn clear_depth_buffer(&self) -> bool {
        self.clear_depth_buffer
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    /// Tightly packed byte size of all levels.
    pub fn byte_size(&self) -> u64 {
        let pixel_size = u64::from(self.format.pixel_size());
        self.levels
            .iter()
            .map(|level| u64::from(level.width) * u64::from(level.height) * pixel_size)
            .sum()
    }
}

impl ResourceState for TextureState {
    fn dirty_mut(&mut self) -> &mut DirtyFlags {
        &mut self.dirty
    }
}

/// A 2D texture or render target.
///
/// Textures are created by [`RenderDevice::create_texture`] and are reference-counted.
/// They hold a weak reference back to their parent device.
///
/// # Example
///
/// ```ignore
/// let texture = device.create_texture(
///     &TextureDescriptor::new(Size2::new(256.0, 256.0), PixelFormat::Rgba8Unorm)
///         .with_flags(TextureFlags::DYNAMIC | TextureFlags::MIPMAPS)
///         .with_data(pixels),
/// )?;
/// texture.set_filter(TextureFilter::Trilinear);
/// ```
pub struct Texture {
    device: Weak<RenderDevice>,
    label: Option<String>,
    max_dimension: u32,
    state: Mutex<TextureState>,
    native: Mutex<Box<dyn TextureBackend>>,
}

impl Texture {
    /// Create a new texture (called by RenderDevice).
    pub(crate) fn new(
        device: Weak<RenderDevice>,
        descriptor: &TextureDescriptor,
        native: Box<dyn TextureBackend>,
        max_dimension: u32,
    ) -> Result<Self, GraphicsError> {
        if descriptor.sample_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "sample count must be at least 1".to_string(),
            ));
        }
        let flags = descriptor.flags;
        if descriptor.sample_count > 1 && !flags.contains(TextureFlags::RENDER_TARGET) {
            return Err(GraphicsError::InvalidParameter(
                "multisampled textures must be render targets".to_string(),
            ));
        }
        if flags.contains(TextureFlags::DEPTH_BUFFER) && !flags.contains(TextureFlags::RENDER_TARGET)
        {
            return Err(GraphicsError::InvalidParameter(
                "depth buffers require a render target".to_string(),
            ));
        }

        let (width, height) = extent(descriptor.size, max_dimension)?;
        let levels = build_levels(
            width,
            height,
            descriptor.format,
            flags,
            descriptor.mip_levels,
            descriptor.data.clone(),
        )?;

        log::trace!(
            "Texture {:?}: {}x{} {:?}, {} level(s)",
            descriptor.label,
            width,
            height,
            descriptor.format,
            levels.len()
        );

        Ok(Self {
            device,
            label: descriptor.label.clone(),
            max_dimension,
            state: Mutex::new(TextureState {
                width,
                height,
                format: descriptor.format,
                flags,
                mip_levels: descriptor.mip_levels,
                sample_count: descriptor.sample_count,
                levels,
                filter: descriptor.filter,
                address_x: descriptor.address_x,
                address_y: descriptor.address_y,
                max_anisotropy: descriptor.max_anisotropy,
                clear_color: descriptor.clear_color,
                clear_color_buffer: descriptor.clear_color_buffer,
                clear_depth_buffer: descriptor.clear_depth_buffer,
                dirty: DirtyFlags::all(),
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

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the texture size.
    pub fn size(&self) -> Size2 {
        let state = self.state.lock();
        Size2::from((state.width, state.height))
    }

    pub fn format(&self) -> PixelFormat {
        self.state.lock().format
    }

    pub fn flags(&self) -> TextureFlags {
        self.state.lock().flags
    }

    pub fn is_render_target(&self) -> bool {
        self.state.lock().is_render_target()
    }

    pub fn sample_count(&self) -> u32 {
        self.state.lock().sample_count
    }

    /// Get the mip level count.
    pub fn level_count(&self) -> usize {
        self.state.lock().levels.len()
    }

    /// Copy of one logical mip level.
    pub fn level(&self, index: usize) -> Option<MipLevel> {
        self.state.lock().levels.get(index).cloned()
    }

    pub fn filter(&self) -> TextureFilter {
        self.state.lock().filter
    }

    pub fn address_x(&self) -> AddressMode {
        self.state.lock().address_x
    }

    pub fn address_y(&self) -> AddressMode {
        self.state.lock().address_y
    }

    pub fn max_anisotropy(&self) -> u32 {
        self.state.lock().max_anisotropy
    }

    pub fn clear_color(&self) -> Color {
        self.state.lock().clear_color
    }

    /// Replace the contents with a tightly packed top level of `size`.
    ///
    /// With [`TextureFlags::MIPMAPS`] the rest of the chain is regenerated.
    ///
    /// # Errors
    ///
    /// Fails for render targets, invalid sizes, and payloads shorter than the
    /// declared dimensions. The texture is left unchanged on failure.
    pub fn set_data(&self, data: &[u8], size: Size2) -> Result<(), GraphicsError> {
        let (width, height) = extent(size, self.max_dimension)?;
        let mut state = self.state.lock();
        if state.is_render_target() {
            return Err(GraphicsError::InvalidParameter(
                "render targets cannot receive CPU data".to_string(),
            ));
        }
        let levels = build_levels(
            width,
            height,
            state.format,
            state.flags,
            state.mip_levels,
            TextureData::Bytes(data.to_vec()),
        )?;
        replace_levels(&mut state, width, height, levels);
        Ok(())
    }

    /// Replace the contents with loader-supplied levels.
    ///
    /// Each level keeps its own pitch; dimensions must halve from one level to
    /// the next.
    pub fn set_levels(&self, levels: Vec<MipLevel>) -> Result<(), GraphicsError> {
        let (width, height) = levels
            .first()
            .map(|top| (top.width, top.height))
            .ok_or_else(|| GraphicsError::InvalidParameter("no mip levels given".to_string()))?;
        if width > self.max_dimension || height > self.max_dimension {
            return Err(dimension_error(width, height, self.max_dimension));
        }
        let mut state = self.state.lock();
        if state.is_render_target() {
            return Err(GraphicsError::InvalidParameter(
                "render targets cannot receive CPU data".to_string(),
            ));
        }
        let levels = build_levels(
            width,
            height,
            state.format,
            state.flags,
            state.mip_levels,
            TextureData::Levels(levels),
        )?;
        replace_levels(&mut state, width, height, levels);
        Ok(())
    }

    /// Change the size, discarding the contents.
    ///
    /// Resizing to the current size is a no-op.
    pub fn resize(&self, size: Size2) -> Result<(), GraphicsError> {
        let (width, height) = extent(size, self.max_dimension)?;
        let mut state = self.state.lock();
        if state.width == width && state.height == height {
            return Ok(());
        }
        let levels = build_levels(
            width,
            height,
            state.format,
            state.flags,
            state.mip_levels,
            TextureData::None,
        )?;
        state.width = width;
        state.height = height;
        state.levels = levels;
        state.dirty |= DirtyFlags::SIZE | DirtyFlags::DATA;
        Ok(())
    }

    pub fn set_filter(&self, filter: TextureFilter) {
        self.set_parameter(|state| state.filter = filter);
    }

    pub fn set_address_x(&self, mode: AddressMode) {
        self.set_parameter(|state| state.address_x = mode);
    }

    pub fn set_address_y(&self, mode: AddressMode) {
        self.set_parameter(|state| state.address_y = mode);
    }

    /// Set the maximum anisotropy. 0 uses the device default.
    pub fn set_max_anisotropy(&self, max_anisotropy: u32) {
        self.set_parameter(|state| state.max_anisotropy = max_anisotropy);
    }

    pub fn set_clear_color(&self, color: Color) {
        self.set_parameter(|state| state.clear_color = color);
    }

    pub fn set_clear_color_buffer(&self, clear: bool) {
        self.set_parameter(|state| state.clear_color_buffer = clear);
    }

    pub fn set_clear_depth_buffer(&self, clear: bool) {
        self.set_parameter(|state| state.clear_depth_buffer = clear);
    }

    fn set_parameter(&self, update: impl FnOnce(&mut TextureState)) {
        let mut state = self.state.lock();
        update(&mut state);
        state.dirty |= DirtyFlags::PARAMETERS;
    }

    /// Current sampling binding, `None` before the first successful upload.
    pub fn native_binding(&self) -> Option<TextureBinding> {
        self.native.lock().binding()
    }

    /// Native layout, `None` before the first successful upload.
    pub fn native_info(&self) -> Option<NativeTextureInfo> {
        self.native.lock().info()
    }

    /// Copy of one native level at native row pitch.
    pub fn read_native_level(&self, level: u32) -> Option<Vec<u8>> {
        self.native.lock().read_level(level)
    }

    pub(crate) fn with_native<R>(&self, f: impl FnOnce(&dyn TextureBackend) -> R) -> R {
        f(self.native.lock().as_ref())
    }
}

fn extent(size: Size2, max_dimension: u32) -> Result<(u32, u32), GraphicsError> {
    let (width, height) = size
        .to_extent()
        .ok_or_else(|| GraphicsError::InvalidParameter(format!("invalid texture size {size:?}")))?;
    if width > max_dimension || height > max_dimension {
        return Err(dimension_error(width, height, max_dimension));
    }
    Ok((width, height))
}

fn dimension_error(width: u32, height: u32, max_dimension: u32) -> GraphicsError {
    GraphicsError::InvalidParameter(format!(
        "texture size {width}x{height} exceeds maximum dimension {max_dimension}"
    ))
}

fn replace_levels(state: &mut TextureState, width: u32, height: u32, levels: Vec<MipLevel>) {
    if state.width != width || state.height != height || state.levels.len() != levels.len() {
        state.dirty |= DirtyFlags::SIZE;
    }
    state.width = width;
    state.height = height;
    state.levels = levels;
    state.dirty |= DirtyFlags::DATA;
}

fn level_count(width: u32, height: u32, flags: TextureFlags, mip_levels: u32) -> u32 {
    if !flags.contains(TextureFlags::MIPMAPS) || flags.contains(TextureFlags::RENDER_TARGET) {
        return 1;
    }
    let full = mipmaps::full_chain_len(width, height);
    if mip_levels == 0 { full } else { mip_levels.min(full) }
}

fn validate_level(level: &MipLevel, pixel_size: u32) -> Result<(), GraphicsError> {
    let row = level.row_bytes(pixel_size);
    if level.pitch < row {
        return Err(GraphicsError::InvalidParameter(format!(
            "pitch {} is smaller than row size {row}",
            level.pitch
        )));
    }
    let required = MipLevel::required_len(level.width, level.height, level.pitch, pixel_size);
    if level.data.len() < required {
        return Err(GraphicsError::InvalidParameter(format!(
            "{} bytes supplied for a {}x{} level that needs {required}",
            level.data.len(),
            level.width,
            level.height
        )));
    }
    Ok(())
}

/// Turn the requested contents into a validated level chain.
fn build_levels(
    width: u32,
    height: u32,
    format: PixelFormat,
    flags: TextureFlags,
    mip_levels: u32,
    data: TextureData,
) -> Result<Vec<MipLevel>, GraphicsError> {
    let pixel_size = format.pixel_size();
    let render_target = flags.contains(TextureFlags::RENDER_TARGET);

    if render_target && data != TextureData::None {
        return Err(GraphicsError::InvalidParameter(
            "render targets cannot receive CPU data".to_string(),
        ));
    }

    if width == 0 || height == 0 {
        return match data {
            TextureData::None => Ok(Vec::new()),
            TextureData::Bytes(bytes) if bytes.is_empty() => Ok(Vec::new()),
            _ => Err(GraphicsError::InvalidParameter(
                "data supplied for an empty texture".to_string(),
            )),
        };
    }

    let count = level_count(width, height, flags, mip_levels);
    let generate = flags.contains(TextureFlags::MIPMAPS) && count > 1;

    match data {
        TextureData::None if render_target => Ok(vec![MipLevel::empty(width, height, pixel_size)]),
        TextureData::None => {
            let mut levels = Vec::with_capacity(count as usize);
            let (mut w, mut h) = (width, height);
            for _ in 0..count {
                levels.push(MipLevel::zeroed(w, h, pixel_size));
                w = (w / 2).max(1);
                h = (h / 2).max(1);
            }
            Ok(levels)
        }
        TextureData::Bytes(bytes) => {
            let top = MipLevel::new(width, height, width * pixel_size, bytes);
            validate_level(&top, pixel_size)?;
            if generate {
                mipmaps::generate(top, format, count)
            } else {
                Ok(vec![top])
            }
        }
        TextureData::Levels(levels) => {
            let Some(top) = levels.first() else {
                return Err(GraphicsError::InvalidParameter("no mip levels given".to_string()));
            };
            if top.width != width || top.height != height {
                return Err(GraphicsError::InvalidParameter(format!(
                    "top level is {}x{}, texture is {width}x{height}",
                    top.width, top.height
                )));
            }
            for pair in levels.windows(2) {
                let expected = ((pair[0].width / 2).max(1), (pair[0].height / 2).max(1));
                if (pair[1].width, pair[1].height) != expected {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "mip level {}x{} does not halve {}x{}",
                        pair[1].width, pair[1].height, pair[0].width, pair[0].height
                    )));
                }
            }
            for level in &levels {
                validate_level(level, pixel_size)?;
            }
            if generate && levels.len() == 1 {
                let mut levels = levels;
                let top = levels.remove(0);
                mipmaps::generate(top, format, count)
            } else {
                Ok(levels)
            }
        }
    }
}

impl GpuResource for Texture {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
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

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Texture")
            .field("width", &state.width)
            .field("height", &state.height)
            .field("format", &state.format)
            .field("flags", &state.flags)
            .field("levels", &state.levels.len())
            .field("dirty", &state.dirty)
            .field("label", &self.label)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RenderTargetBinding;

    struct NullTexture;

    impl TextureBackend for NullTexture {
        fn upload(&mut self, _: &TextureState, _: &UploadContext<'_>) -> Result<(), GraphicsError> {
            Ok(())
        }

        fn binding(&self) -> Option<TextureBinding> {
            None
        }

        fn render_target(&self) -> Option<RenderTargetBinding> {
            None
        }

        fn info(&self) -> Option<NativeTextureInfo> {
            None
        }

        fn read_level(&self, _: u32) -> Option<Vec<u8>> {
            None
        }
    }

    fn texture(descriptor: TextureDescriptor) -> Result<Texture, GraphicsError> {
        Texture::new(Weak::new(), &descriptor, Box::new(NullTexture), 4096)
    }

    fn clean(texture: &Texture) {
        texture.state.lock().dirty = DirtyFlags::empty();
    }

    fn rgba8(size: f32) -> TextureDescriptor {
        TextureDescriptor::new(Size2::new(size, size), PixelFormat::Rgba8Unorm)
    }

    #[test]
    fn test_new_texture_is_fully_dirty() {
        let texture = texture(rgba8(4.0)).unwrap();
        assert_eq!(texture.dirty_flags(), DirtyFlags::all());
        assert_eq!(texture.level_count(), 1);
        assert_eq!(texture.level(0).unwrap().data, vec![0; 64]);
    }

    #[test]
    fn test_mipmaps_generated_from_data() {
        let texture = texture(
            rgba8(4.0)
                .with_flags(TextureFlags::MIPMAPS)
                .with_data(vec![200; 64]),
        )
        .unwrap();
        assert_eq!(texture.level_count(), 3);
        assert_eq!(texture.level(2).unwrap().data, vec![200; 4]);
    }

    #[test]
    fn test_set_data_same_size_marks_data() {
        let texture = texture(rgba8(2.0).with_flags(TextureFlags::DYNAMIC)).unwrap();
        clean(&texture);
        texture.set_data(&[1; 16], Size2::new(2.0, 2.0)).unwrap();
        assert_eq!(texture.dirty_flags(), DirtyFlags::DATA);
    }

    #[test]
    fn test_set_data_new_size_marks_size() {
        let texture = texture(rgba8(2.0)).unwrap();
        clean(&texture);
        texture.set_data(&[1; 64], Size2::new(4.0, 4.0)).unwrap();
        assert_eq!(texture.dirty_flags(), DirtyFlags::DATA | DirtyFlags::SIZE);
        assert_eq!(texture.size(), Size2::new(4.0, 4.0));
    }

    #[test]
    fn test_short_payload_rejected_without_change() {
        let texture = texture(rgba8(2.0).with_data(vec![7; 16])).unwrap();
        clean(&texture);
        let result = texture.set_data(&[1; 15], Size2::new(2.0, 2.0));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(texture.level(0).unwrap().data, vec![7; 16]);
        assert!(!texture.is_dirty());
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let texture = texture(rgba8(2.0)).unwrap();
        assert!(texture.set_data(&[], Size2::new(-1.0, 2.0)).is_err());
        assert!(texture.resize(Size2::new(f32::NAN, 2.0)).is_err());
        assert!(texture.resize(Size2::new(8192.0, 2.0)).is_err());
    }

    #[test]
    fn test_render_target_rejects_data() {
        let desc = TextureDescriptor::render_target(Size2::new(8.0, 8.0), PixelFormat::Rgba8Unorm);
        let texture = texture(desc).unwrap();
        assert!(texture.set_data(&[0; 256], Size2::new(8.0, 8.0)).is_err());
        assert!(texture.level(0).unwrap().data.is_empty());
    }

    #[test]
    fn test_set_levels_checks_chain() {
        let texture = texture(rgba8(4.0)).unwrap();
        let good = vec![MipLevel::zeroed(4, 4, 4), MipLevel::zeroed(2, 2, 4)];
        texture.set_levels(good).unwrap();
        assert_eq!(texture.level_count(), 2);

        let bad = vec![MipLevel::zeroed(4, 4, 4), MipLevel::zeroed(3, 2, 4)];
        assert!(texture.set_levels(bad).is_err());
        assert_eq!(texture.level_count(), 2);
    }

    #[test]
    fn test_set_levels_keeps_pitch() {
        let texture = texture(rgba8(2.0)).unwrap();
        let level = MipLevel::new(2, 2, 12, vec![3; 20]);
        texture.set_levels(vec![level.clone()]).unwrap();
        assert_eq!(texture.level(0), Some(level));
    }

    #[test]
    fn test_resize_drops_data() {
        let texture = texture(rgba8(2.0).with_data(vec![9; 16])).unwrap();
        clean(&texture);
        texture.resize(Size2::new(2.0, 2.0)).unwrap();
        assert!(!texture.is_dirty());

        texture.resize(Size2::new(4.0, 2.0)).unwrap();
        assert_eq!(texture.dirty_flags(), DirtyFlags::SIZE | DirtyFlags::DATA);
        assert_eq!(texture.level(0).unwrap().data, vec![0; 32]);
    }

    #[test]
    fn test_parameter_setters_mark_parameters() {
        let texture = texture(rgba8(2.0)).unwrap();
        clean(&texture);
        texture.set_filter(TextureFilter::Linear);
        texture.set_address_x(AddressMode::Repeat);
        texture.set_max_anisotropy(8);
        assert_eq!(texture.dirty_flags(), DirtyFlags::PARAMETERS);
        let state = texture.state.lock();
        assert_eq!(
            state.sampler_descriptor(),
            SamplerStateDescriptor::new(TextureFilter::Linear, AddressMode::Repeat, AddressMode::Clamp, 8)
        );
    }

    #[test]
    fn test_invalid_flag_combinations() {
        assert!(texture(rgba8(4.0).with_sample_count(4)).is_err());
        assert!(texture(rgba8(4.0).with_sample_count(0)).is_err());
        assert!(texture(rgba8(4.0).with_flags(TextureFlags::DEPTH_BUFFER)).is_err());
    }

    #[test]
    fn test_half_float_mipmaps_unsupported() {
        let desc = TextureDescriptor::new(Size2::new(4.0, 4.0), PixelFormat::Rgba16Float)
            .with_flags(TextureFlags::MIPMAPS)
            .with_data(vec![0; 128]);
        assert!(matches!(
            texture(desc),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
    }

    #[test]
    fn test_empty_texture_has_no_levels() {
        let texture = texture(rgba8(0.0)).unwrap();
        assert_eq!(texture.level_count(), 0);
        assert_eq!(texture.state.lock().byte_size(), 0);
    }
}

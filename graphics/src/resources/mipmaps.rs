//! CPU mip chain generation with a 2x2 box filter.

use tessera_core::texture::{ChannelType, PixelFormat};

use crate::error::GraphicsError;
use crate::types::MipLevel;

/// Number of levels in a full chain down to 1x1.
pub(crate) fn full_chain_len(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Build a mip chain from `top`.
///
/// `max_levels` of 0 generates down to 1x1. Generated levels are tightly
/// packed. Fails for 16-bit float formats.
pub(crate) fn generate(
    top: MipLevel,
    format: PixelFormat,
    max_levels: u32,
) -> Result<Vec<MipLevel>, GraphicsError> {
    let channel = format
        .channel_type()
        .ok_or(GraphicsError::UnsupportedPixelFormat(format))?;
    if channel == ChannelType::Float16 {
        return Err(GraphicsError::FeatureNotSupported(format!(
            "mipmap generation for {format:?}"
        )));
    }

    let full = full_chain_len(top.width, top.height);
    let count = if max_levels == 0 { full } else { max_levels.min(full) };
    let pixel_size = format.pixel_size();
    let channels = format.channel_count() as usize;

    let mut levels = Vec::with_capacity(count as usize);
    levels.push(top);
    while levels.len() < count as usize {
        let Some(previous) = levels.last() else {
            break;
        };
        let next = downsample(previous, pixel_size, channels, channel);
        levels.push(next);
    }
    Ok(levels)
}

fn downsample(src: &MipLevel, pixel_size: u32, channels: usize, channel: ChannelType) -> MipLevel {
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let mut dst = MipLevel::zeroed(width, height, pixel_size);
    let channel_size = channel.size() as usize;

    for y in 0..height {
        let y0 = (y * 2).min(src.height - 1);
        let y1 = (y * 2 + 1).min(src.height - 1);
        for x in 0..width {
            let x0 = (x * 2).min(src.width - 1);
            let x1 = (x * 2 + 1).min(src.width - 1);
            let taps = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
                .map(|(tx, ty)| (ty * src.pitch + tx * pixel_size) as usize);
            let out = (y * dst.pitch + x * pixel_size) as usize;

            for c in 0..channels {
                let offset = c * channel_size;
                let samples = taps.map(|tap| &src.data[tap + offset..tap + offset + channel_size]);
                let target = &mut dst.data[out + offset..out + offset + channel_size];
                average(channel, samples, target);
            }
        }
    }
    dst
}

fn average(channel: ChannelType, samples: [&[u8]; 4], out: &mut [u8]) {
    match channel {
        ChannelType::Unorm8 | ChannelType::Uint8 => {
            let sum: u32 = samples.iter().map(|s| u32::from(s[0])).sum();
            out[0] = ((sum + 2) / 4) as u8;
        }
        ChannelType::Snorm8 | ChannelType::Sint8 => {
            let sum: i32 = samples.iter().map(|s| i32::from(s[0] as i8)).sum();
            out[0] = (sum / 4) as i8 as u8;
        }
        ChannelType::Unorm16 | ChannelType::Uint16 => {
            let sum: u32 = samples
                .iter()
                .map(|s| u32::from(u16::from_ne_bytes([s[0], s[1]])))
                .sum();
            out.copy_from_slice(&(((sum + 2) / 4) as u16).to_ne_bytes());
        }
        ChannelType::Snorm16 | ChannelType::Sint16 => {
            let sum: i32 = samples
                .iter()
                .map(|s| i32::from(i16::from_ne_bytes([s[0], s[1]])))
                .sum();
            out.copy_from_slice(&((sum / 4) as i16).to_ne_bytes());
        }
        ChannelType::Uint32 => {
            let sum: u64 = samples
                .iter()
                .map(|s| u64::from(u32::from_ne_bytes([s[0], s[1], s[2], s[3]])))
                .sum();
            out.copy_from_slice(&((sum / 4) as u32).to_ne_bytes());
        }
        ChannelType::Sint32 => {
            let sum: i64 = samples
                .iter()
                .map(|s| i64::from(i32::from_ne_bytes([s[0], s[1], s[2], s[3]])))
                .sum();
            out.copy_from_slice(&((sum / 4) as i32).to_ne_bytes());
        }
        ChannelType::Float32 => {
            let sum: f32 = samples
                .iter()
                .map(|s| f32::from_ne_bytes([s[0], s[1], s[2], s[3]]))
                .sum();
            out.copy_from_slice(&(sum / 4.0).to_ne_bytes());
        }
        // Rejected by `generate`.
        ChannelType::Float16 => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_chain_len() {
        assert_eq!(full_chain_len(1, 1), 1);
        assert_eq!(full_chain_len(4, 4), 3);
        assert_eq!(full_chain_len(256, 16), 9);
        assert_eq!(full_chain_len(5, 3), 3);
    }

    #[test]
    fn test_rgba8_chain() {
        let top = MipLevel::new(
            2,
            2,
            8,
            vec![
                0, 10, 100, 255, 4, 10, 100, 255, //
                8, 10, 100, 255, 12, 10, 100, 255,
            ],
        );
        let levels = generate(top, PixelFormat::Rgba8Unorm, 0).unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1].width, 1);
        assert_eq!(levels[1].data, vec![6, 10, 100, 255]);
    }

    #[test]
    fn test_level_limit() {
        let top = MipLevel::zeroed(16, 16, 1);
        let levels = generate(top, PixelFormat::R8Unorm, 2).unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!((levels[1].width, levels[1].height), (8, 8));
    }

    #[test]
    fn test_odd_dimensions_clamp() {
        let top = MipLevel::new(3, 1, 3, vec![3, 6, 9]);
        let levels = generate(top, PixelFormat::R8Uint, 0).unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1].data, vec![5]);
    }

    #[test]
    fn test_signed_and_float_channels() {
        let sint = MipLevel::new(2, 1, 2, vec![(-4i8) as u8, (-2i8) as u8]);
        let levels = generate(sint, PixelFormat::R8Sint, 0).unwrap();
        assert_eq!(levels[1].data[0] as i8, -3);

        let mut data = Vec::new();
        for v in [1.0f32, 3.0] {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        let float = MipLevel::new(2, 1, 8, data);
        let levels = generate(float, PixelFormat::R32Float, 0).unwrap();
        assert_eq!(levels[1].data, 2.0f32.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_half_float_rejected() {
        let top = MipLevel::zeroed(4, 4, 8);
        assert!(matches!(
            generate(top, PixelFormat::Rgba16Float, 0),
            Err(GraphicsError::FeatureNotSupported(_))
        ));
    }
}

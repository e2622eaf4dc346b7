//! Row pitch helpers shared by the software devices.

/// Round `value` up to a multiple of `alignment` (a power of two).
pub(crate) fn align_up(value: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Copy `rows` rows from `src` to `dst`.
///
/// When the pitches match, the whole span is copied at once. Otherwise each
/// row copies `min(src_pitch, dst_pitch)` bytes, advancing each side by its
/// own pitch. Rows that run past the end of either slice are truncated.
pub(crate) fn copy_rows(dst: &mut [u8], dst_pitch: u32, src: &[u8], src_pitch: u32, rows: u32) {
    if dst_pitch == src_pitch {
        let len = (dst_pitch as usize * rows as usize)
            .min(src.len())
            .min(dst.len());
        dst[..len].copy_from_slice(&src[..len]);
        return;
    }

    let row_len = src_pitch.min(dst_pitch) as usize;
    for row in 0..rows as usize {
        let src_start = row * src_pitch as usize;
        let dst_start = row * dst_pitch as usize;
        if src_start >= src.len() || dst_start >= dst.len() {
            break;
        }
        let len = row_len
            .min(src.len() - src_start)
            .min(dst.len() - dst_start);
        dst[dst_start..dst_start + len].copy_from_slice(&src[src_start..src_start + len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(8, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 4), 20);
    }

    #[test]
    fn test_copy_equal_pitch() {
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0u8; 16];
        copy_rows(&mut dst, 8, &src, 8, 2);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_copy_into_wider_pitch() {
        let src: Vec<u8> = (1..=16).collect();
        let mut dst = vec![0xAAu8; 32];
        copy_rows(&mut dst, 16, &src, 8, 2);
        assert_eq!(&dst[0..8], &src[0..8]);
        assert_eq!(&dst[16..24], &src[8..16]);
        // Padding bytes are left alone.
        assert!(dst[8..16].iter().all(|&b| b == 0xAA));
        assert!(dst[24..32].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_copy_from_wider_pitch() {
        let src: Vec<u8> = (0..24).collect();
        let mut dst = vec![0u8; 8];
        copy_rows(&mut dst, 4, &src, 12, 2);
        assert_eq!(dst, vec![0, 1, 2, 3, 12, 13, 14, 15]);
    }

    #[test]
    fn test_copy_truncates_short_source() {
        let src = vec![7u8; 10];
        let mut dst = vec![0u8; 32];
        copy_rows(&mut dst, 16, &src, 8, 2);
        assert_eq!(&dst[0..8], &[7; 8]);
        assert_eq!(&dst[16..18], &[7; 2]);
        assert_eq!(dst[18], 0);
    }
}

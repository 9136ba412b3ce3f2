//! In-place byte order correction of freshly read sample buffers.
use super::descriptor::{ByteOrder, RasterDescriptor};

/// Reverse the bytes of every `width`-byte sample in `buf`.
///
/// A trailing partial sample, if any, is left alone. Widths of zero or one
/// do nothing.
#[inline]
pub fn swap_in_place(buf: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    buf.chunks_exact_mut(width).for_each(|sample| sample.reverse());
}

/// Whether samples stored in `order` must be swapped on this host.
#[inline]
pub fn needs_swap(order: ByteOrder) -> bool {
    order != ByteOrder::native()
}

/// Swap `buf` to host order if the raster's samples are stored the other
/// way. Returns whether a swap was done.
pub fn swap_if_needed(buf: &mut [u8], descriptor: &RasterDescriptor) -> bool {
    let width = descriptor.bytes_per_pixel();
    if width < 2 || !needs_swap(descriptor.byte_order()) {
        return false;
    }
    swap_in_place(buf, width);
    true
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::raster::{Interleave, ScalarType};

    #[test]
    fn test_swap_widths() {
        let mut buf = [1_u8, 2, 3, 4, 5, 6, 7, 8, 9];
        swap_in_place(&mut buf, 2);
        assert_eq!(buf, [2, 1, 4, 3, 6, 5, 8, 7, 9]);

        let mut buf = [1_u8, 2, 3, 4, 5, 6, 7, 8];
        swap_in_place(&mut buf, 4);
        assert_eq!(buf, [4, 3, 2, 1, 8, 7, 6, 5]);

        swap_in_place(&mut buf, 8);
        assert_eq!(buf, [5, 6, 7, 8, 1, 2, 3, 4]);

        swap_in_place(&mut buf, 1);
        assert_eq!(buf, [5, 6, 7, 8, 1, 2, 3, 4]);
    }

    #[test]
    fn test_swap_decodes_foreign_order() {
        let values = [1.5_f32, -2.25, 1e6];
        let mut buf: Vec<u8> = values
            .iter()
            .flat_map(|v| match ByteOrder::native().opposite() {
                ByteOrder::BigEndian => v.to_be_bytes(),
                ByteOrder::LittleEndian => v.to_le_bytes(),
            })
            .collect();

        let d = RasterDescriptor::new(vec![], 3, 1, 1, ScalarType::F32, Interleave::Bsq)
            .with_byte_order(ByteOrder::native().opposite());
        assert!(swap_if_needed(&mut buf, &d));
        let decoded: Vec<f32> = bytemuck::pod_collect_to_vec(&buf[..]);
        assert_eq!(decoded, values);

        let native = d.with_byte_order(ByteOrder::native());
        assert!(!swap_if_needed(&mut buf, &native));
        let u8s = RasterDescriptor::new(vec![], 3, 1, 1, ScalarType::U8, Interleave::Bsq)
            .with_byte_order(ByteOrder::native().opposite());
        assert!(!swap_if_needed(&mut buf, &u8s));
    }
}

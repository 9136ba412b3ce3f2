//! Write samples out as a general raster.
//!
//! The inverse of [`RasterReader`](super::RasterReader): samples held band
//! sequentially in memory are laid out in the descriptor's interleave and
//! byte order, after a zero-filled header.
use std::fs;

use bytemuck::Pod;
use log::debug;

use super::descriptor::{Interleave, RasterDescriptor};
use super::endian::{needs_swap, swap_in_place};
use crate::error::{Error, Result};

/// Write a raster to the files named by the descriptor.
///
/// `data` holds every raw sample, band by band, each band line by line.
///
/// # Errors
/// * If the descriptor is inconsistent or names the wrong number of files
/// * If `data` does not match the descriptor's scalar type or raw extent
/// * If a file cannot be written
pub fn write_raster<T: Pod>(descriptor: &RasterDescriptor, data: &[T]) -> Result<()> {
    descriptor.validate_files()?;
    let contents = write_to(descriptor, data)?;
    for (path, bytes) in descriptor.files().iter().zip(contents) {
        debug!("Writing {} bytes to {}", bytes.len(), path.display());
        fs::write(path, bytes)?;
    }
    Ok(())
}

/// Lay out a raster in memory, one byte vector per backing file.
///
/// # Errors
/// * If the descriptor is inconsistent
/// * If `data` does not match the descriptor's scalar type or raw extent
pub fn write_to<T: Pod>(descriptor: &RasterDescriptor, data: &[T]) -> Result<Vec<Vec<u8>>> {
    descriptor.validate()?;
    let bpp = descriptor.bytes_per_pixel();
    if std::mem::size_of::<T>() != bpp {
        return Err(Error::ScalarMismatch {
            expected: std::mem::size_of::<T>(),
            actual: descriptor.scalar_type(),
        });
    }

    let samples = descriptor.raw_samples();
    let lines = descriptor.raw_lines();
    let bands = descriptor.number_of_bands();
    let plane = samples * lines;
    if data.len() != plane * bands {
        return Err(Error::DimensionMismatch(format!(
            "{samples}x{lines}x{bands} raster needs {} samples, got {}",
            plane * bands,
            data.len()
        )));
    }

    let src: &[u8] = bytemuck::cast_slice(data);
    let sample = |b: usize, x: usize, y: usize| {
        let i = (b * plane + y * samples + x) * bpp;
        &src[i..i + bpp]
    };

    let header = vec![0_u8; descriptor.header_size() as usize];
    let mut files: Vec<Vec<u8>> = (0..descriptor.stream_count())
        .map(|_| header.clone())
        .collect();

    match descriptor.interleave() {
        Interleave::Bip => {
            for y in 0..lines {
                for x in 0..samples {
                    for b in 0..bands {
                        files[0].extend_from_slice(sample(b, x, y));
                    }
                }
            }
        }
        Interleave::Bil => {
            for y in 0..lines {
                for b in 0..bands {
                    for x in 0..samples {
                        files[0].extend_from_slice(sample(b, x, y));
                    }
                }
            }
        }
        Interleave::Bsq => {
            files[0].extend_from_slice(src);
        }
        Interleave::BsqMultiFile => {
            for (b, file) in files.iter_mut().enumerate() {
                file.extend_from_slice(&src[b * plane * bpp..(b + 1) * plane * bpp]);
            }
        }
    }

    if needs_swap(descriptor.byte_order()) {
        let start = header.len();
        files
            .iter_mut()
            .for_each(|f| swap_in_place(&mut f[start..], bpp));
    }
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::raster::{ByteOrder, ScalarType};

    fn descriptor(interleave: Interleave) -> RasterDescriptor {
        RasterDescriptor::new(vec![], 3, 2, 2, ScalarType::U16, interleave).with_header_size(4)
    }

    // Band b at (x, y) holds 10 * b + 3 * y + x
    fn data() -> Vec<u16> {
        (0..12).map(|i| (10 * (i / 6) + i % 6) as u16).collect()
    }

    fn decode(bytes: &[u8]) -> Vec<u16> {
        bytemuck::pod_collect_to_vec(&bytes[4..])
    }

    #[test]
    fn test_layouts() {
        let bip = write_to(&descriptor(Interleave::Bip), &data()).unwrap();
        assert_eq!(bip.len(), 1);
        assert_eq!(&bip[0][..4], &[0, 0, 0, 0]);
        assert_eq!(decode(&bip[0]), vec![0, 10, 1, 11, 2, 12, 3, 13, 4, 14, 5, 15]);

        let bil = write_to(&descriptor(Interleave::Bil), &data()).unwrap();
        assert_eq!(decode(&bil[0]), vec![0, 1, 2, 10, 11, 12, 3, 4, 5, 13, 14, 15]);

        let bsq = write_to(&descriptor(Interleave::Bsq), &data()).unwrap();
        assert_eq!(decode(&bsq[0]), data());

        let multi = write_to(&descriptor(Interleave::BsqMultiFile), &data()).unwrap();
        assert_eq!(multi.len(), 2);
        assert_eq!(decode(&multi[1]), vec![10, 11, 12, 13, 14, 15]);

        for files in [bip, bil, bsq] {
            assert_eq!(files[0].len() as u64, descriptor(Interleave::Bsq).expected_file_size());
        }
    }

    #[test]
    fn test_foreign_byte_order() {
        let d = descriptor(Interleave::Bsq).with_byte_order(ByteOrder::native().opposite());
        let files = write_to(&d, &data()).unwrap();
        let swapped: Vec<u16> = decode(&files[0]).iter().map(|v| v.swap_bytes()).collect();
        assert_eq!(swapped, data());
    }

    #[test]
    fn test_rejects_mismatched_data() {
        let d = descriptor(Interleave::Bip);
        assert!(matches!(
            write_to(&d, &[0_u8; 12]),
            Err(Error::ScalarMismatch { expected: 1, actual: ScalarType::U16 })
        ));
        assert!(matches!(
            write_to(&d, &[0_u16; 11]),
            Err(Error::DimensionMismatch(_))
        ));
        assert!(write_raster(&d, &data()).is_err());
    }

    #[test]
    fn test_write_raster_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.bil");
        let d = RasterDescriptor::new(vec![path.clone()], 3, 2, 2, ScalarType::U16, Interleave::Bil);
        write_raster(&d, &data()).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 24);
    }
}

//! Layout of a general raster on disk.
//!
//! A [`RasterDescriptor`] is built once from already-parsed header metadata
//! and never changes after the raster is opened. It answers every question
//! the reader needs to schedule seeks: where the first valid sample lives,
//! how long a raw line is, and how far apart bands are.
use std::path::PathBuf;

use super::rect::Rect;
use crate::error::{Error, Result};

/// Numeric type of one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl ScalarType {
    /// Bytes per sample.
    pub fn size(self) -> usize {
        match self {
            ScalarType::U8 | ScalarType::I8 => 1,
            ScalarType::U16 | ScalarType::I16 => 2,
            ScalarType::U32 | ScalarType::I32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    /// Decode one sample stored in host byte order.
    ///
    /// # Panics
    /// If `bytes` is shorter than [`ScalarType::size`].
    #[inline]
    pub fn decode_native(self, bytes: &[u8]) -> f64 {
        macro_rules! ne {
            ($t:ty, $n:expr) => {{
                let mut b = [0_u8; $n];
                b.copy_from_slice(&bytes[..$n]);
                <$t>::from_ne_bytes(b) as f64
            }};
        }
        match self {
            ScalarType::U8 => bytes[0] as f64,
            ScalarType::I8 => bytes[0] as i8 as f64,
            ScalarType::U16 => ne!(u16, 2),
            ScalarType::I16 => ne!(i16, 2),
            ScalarType::U32 => ne!(u32, 4),
            ScalarType::I32 => ne!(i32, 4),
            ScalarType::F32 => ne!(f32, 4),
            ScalarType::F64 => ne!(f64, 8),
        }
    }

    /// Encode one sample in host byte order, saturating at the type's range.
    pub fn encode_native(self, value: f64, out: &mut [u8]) {
        match self {
            ScalarType::U8 => out[0] = value as u8,
            ScalarType::I8 => out[0] = (value as i8) as u8,
            ScalarType::U16 => out[..2].copy_from_slice(&(value as u16).to_ne_bytes()),
            ScalarType::I16 => out[..2].copy_from_slice(&(value as i16).to_ne_bytes()),
            ScalarType::U32 => out[..4].copy_from_slice(&(value as u32).to_ne_bytes()),
            ScalarType::I32 => out[..4].copy_from_slice(&(value as i32).to_ne_bytes()),
            ScalarType::F32 => out[..4].copy_from_slice(&(value as f32).to_ne_bytes()),
            ScalarType::F64 => out[..8].copy_from_slice(&value.to_ne_bytes()),
        }
    }
}

/// Byte order of multi-byte samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
        }
    }
}

/// On-disk ordering of bands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interleave {
    /// Band interleaved by pixel: all bands of a pixel are adjacent
    Bip,
    /// Band interleaved by line: each raw line holds one band
    Bil,
    /// Band sequential: each band is a complete image, one after another
    Bsq,
    /// Band sequential with one file per band
    BsqMultiFile,
}

/// Null, min and max sample values of one band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandValues {
    pub null: f64,
    pub min: f64,
    pub max: f64,
}

impl BandValues {
    /// Conventional defaults for a scalar type. The null value sits just
    /// outside the valid range.
    pub fn default_for(scalar: ScalarType) -> Self {
        let (null, min, max) = match scalar {
            ScalarType::U8 => (0.0, 1.0, u8::MAX as f64),
            ScalarType::I8 => (i8::MIN as f64, i8::MIN as f64 + 1.0, i8::MAX as f64),
            ScalarType::U16 => (0.0, 1.0, u16::MAX as f64),
            ScalarType::I16 => (i16::MIN as f64, i16::MIN as f64 + 1.0, i16::MAX as f64),
            ScalarType::U32 => (0.0, 1.0, u32::MAX as f64),
            ScalarType::I32 => (i32::MIN as f64, i32::MIN as f64 + 1.0, i32::MAX as f64),
            ScalarType::F32 => {
                let big = 1.0 / f32::EPSILON as f64;
                (-big, -big + 1.0, big)
            }
            ScalarType::F64 => {
                let big = 1.0 / f64::EPSILON;
                (-big, -big + 1.0, big)
            }
        };
        Self { null, min, max }
    }
}

/// Immutable description of one raster.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterDescriptor {
    files: Vec<PathBuf>,
    raw_samples: usize,
    raw_lines: usize,
    bands: usize,
    scalar: ScalarType,
    interleave: Interleave,
    byte_order: ByteOrder,
    header_size: u64,
    valid_rect: Rect,
    sub_image_offset: (i64, i64),
    band_values: Vec<BandValues>,
}

impl RasterDescriptor {
    /// Describe a raster with no header, no margin, little-endian samples
    /// and default band values. Refine with the `with_*` methods.
    pub fn new(
        files: Vec<PathBuf>,
        raw_samples: usize,
        raw_lines: usize,
        bands: usize,
        scalar: ScalarType,
        interleave: Interleave,
    ) -> Self {
        Self {
            files,
            raw_samples,
            raw_lines,
            bands,
            scalar,
            interleave,
            byte_order: ByteOrder::LittleEndian,
            header_size: 0,
            valid_rect: Rect::from_origin_size(0, 0, raw_samples, raw_lines),
            sub_image_offset: (0, 0),
            band_values: vec![BandValues::default_for(scalar); bands],
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Bytes before the first raw line of each file.
    pub fn with_header_size(mut self, header_size: u64) -> Self {
        self.header_size = header_size;
        self
    }

    /// Part of the raw image holding valid data, in raw line/sample space.
    pub fn with_valid_rect(mut self, valid_rect: Rect) -> Self {
        self.valid_rect = valid_rect;
        self
    }

    /// Offset of this image within a larger image, as `(samples, lines)`.
    pub fn with_sub_image_offset(mut self, x: i64, y: i64) -> Self {
        self.sub_image_offset = (x, y);
        self
    }

    pub fn with_band_values(mut self, band_values: Vec<BandValues>) -> Self {
        self.band_values = band_values;
        self
    }

    /// Check that the layout is self-consistent.
    ///
    /// # Errors
    /// * If any extent is zero
    /// * If the valid rectangle does not fit in the raw image
    /// * If there are not one set of band values per band
    pub fn validate(&self) -> Result<()> {
        if self.raw_samples == 0 || self.raw_lines == 0 || self.bands == 0 {
            return Err(Error::InvalidDescriptor(format!(
                "empty raster: {} samples, {} lines, {} bands",
                self.raw_samples, self.raw_lines, self.bands
            )));
        }
        let raw = Rect::from_origin_size(0, 0, self.raw_samples, self.raw_lines);
        if !self.valid_rect.completely_within(&raw) {
            return Err(Error::InvalidDescriptor(format!(
                "valid rectangle {:?} is outside the raw image {raw:?}",
                self.valid_rect
            )));
        }
        if self.band_values.len() != self.bands {
            return Err(Error::InvalidDescriptor(format!(
                "{} bands but {} band value entries",
                self.bands,
                self.band_values.len()
            )));
        }
        Ok(())
    }

    /// Check that the descriptor names one file per backing stream.
    ///
    /// # Errors
    /// * If the number of files does not match [`RasterDescriptor::stream_count`]
    pub fn validate_files(&self) -> Result<()> {
        if self.files.len() != self.stream_count() {
            return Err(Error::InvalidDescriptor(format!(
                "{:?} layout needs {} files, got {}",
                self.interleave,
                self.stream_count(),
                self.files.len()
            )));
        }
        Ok(())
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of backing files: one per band for multi-file rasters,
    /// otherwise one.
    pub fn stream_count(&self) -> usize {
        match self.interleave {
            Interleave::BsqMultiFile => self.bands,
            _ => 1,
        }
    }

    pub fn raw_samples(&self) -> usize {
        self.raw_samples
    }

    pub fn raw_lines(&self) -> usize {
        self.raw_lines
    }

    pub fn valid_samples(&self) -> usize {
        self.valid_rect.width()
    }

    pub fn valid_lines(&self) -> usize {
        self.valid_rect.height()
    }

    pub fn valid_rect(&self) -> Rect {
        self.valid_rect
    }

    pub fn number_of_bands(&self) -> usize {
        self.bands
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.scalar
    }

    pub fn interleave(&self) -> Interleave {
        self.interleave
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    pub fn sub_image_offset(&self) -> (i64, i64) {
        self.sub_image_offset
    }

    pub fn band_values(&self) -> &[BandValues] {
        &self.band_values
    }

    /// Bytes per sample of one band.
    pub fn bytes_per_pixel(&self) -> usize {
        self.scalar.size()
    }

    /// Bytes in one raw line of the file. For BIP a raw line holds every
    /// band; otherwise it holds a single band.
    pub fn bytes_per_raw_line(&self) -> u64 {
        let line = (self.raw_samples * self.bytes_per_pixel()) as u64;
        match self.interleave {
            Interleave::Bip => line * self.bands as u64,
            _ => line,
        }
    }

    /// File offset of the first sample of the valid rectangle (of the first
    /// band for BSQ layouts).
    pub fn offset_to_first_valid_sample(&self) -> u64 {
        let bprl = self.bytes_per_raw_line();
        let bpp = self.bytes_per_pixel() as u64;
        let ulx = self.valid_rect.ul_x as u64;
        let uly = self.valid_rect.ul_y as u64;
        match self.interleave {
            Interleave::Bip => self.header_size + uly * bprl + ulx * bpp * self.bands as u64,
            Interleave::Bil => self.header_size + uly * bprl * self.bands as u64 + ulx * bpp,
            Interleave::Bsq | Interleave::BsqMultiFile => {
                self.header_size + uly * bprl + ulx * bpp
            }
        }
    }

    /// Distance between the same sample of consecutive bands in a single
    /// band-sequential file.
    pub fn band_stride(&self) -> u64 {
        self.bytes_per_raw_line() * self.raw_lines as u64
    }

    /// Smallest size of each backing file that holds the whole raster.
    pub fn expected_file_size(&self) -> u64 {
        let image = self.band_stride();
        match self.interleave {
            Interleave::Bip | Interleave::BsqMultiFile => self.header_size + image,
            Interleave::Bil | Interleave::Bsq => self.header_size + image * self.bands as u64,
        }
    }

    /// Zero-based rectangle of the valid image.
    pub fn image_rect(&self) -> Rect {
        Rect::from_origin_size(0, 0, self.valid_samples(), self.valid_lines())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn descriptor(interleave: Interleave) -> RasterDescriptor {
        RasterDescriptor::new(
            vec![PathBuf::from("a.raw")],
            100,
            50,
            3,
            ScalarType::I16,
            interleave,
        )
        .with_header_size(512)
        .with_valid_rect(Rect::new(10, 5, 89, 44))
    }

    #[test]
    fn test_offsets_per_interleave() {
        let bip = descriptor(Interleave::Bip);
        assert_eq!(bip.bytes_per_raw_line(), 600);
        assert_eq!(bip.offset_to_first_valid_sample(), 512 + 5 * 600 + 10 * 2 * 3);
        assert_eq!(bip.expected_file_size(), 512 + 600 * 50);

        let bil = descriptor(Interleave::Bil);
        assert_eq!(bil.bytes_per_raw_line(), 200);
        assert_eq!(bil.offset_to_first_valid_sample(), 512 + 5 * 200 * 3 + 10 * 2);
        assert_eq!(bil.expected_file_size(), 512 + 200 * 50 * 3);

        let bsq = descriptor(Interleave::Bsq);
        assert_eq!(bsq.bytes_per_raw_line(), 200);
        assert_eq!(bsq.offset_to_first_valid_sample(), 512 + 5 * 200 + 10 * 2);
        assert_eq!(bsq.band_stride(), 200 * 50);
        assert_eq!(bsq.expected_file_size(), 512 + 200 * 50 * 3);
    }

    #[test]
    fn test_valid_geometry() {
        let d = descriptor(Interleave::Bsq);
        assert_eq!((d.valid_samples(), d.valid_lines()), (80, 40));
        assert_eq!(d.image_rect(), Rect::new(0, 0, 79, 39));
        assert!(d.validate().is_ok());
        assert!(d.validate_files().is_ok());
        assert_eq!(d.band_values().len(), 3);
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        let margin = descriptor(Interleave::Bil).with_valid_rect(Rect::new(0, 0, 100, 10));
        assert!(matches!(margin.validate(), Err(Error::InvalidDescriptor(_))));

        let bands = descriptor(Interleave::Bip).with_band_values(vec![]);
        assert!(bands.validate().is_err());

        let files = descriptor(Interleave::BsqMultiFile);
        assert_eq!(files.stream_count(), 3);
        assert!(files.validate_files().is_err());

        let empty = RasterDescriptor::new(vec![], 0, 4, 1, ScalarType::U8, Interleave::Bsq);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_scalar_round_trip_host_order() {
        let mut buf = [0_u8; 8];
        for (scalar, v) in [
            (ScalarType::U8, 200.0),
            (ScalarType::I8, -100.0),
            (ScalarType::U16, 60000.0),
            (ScalarType::I16, -1234.0),
            (ScalarType::U32, 4e9),
            (ScalarType::I32, -2e9),
            (ScalarType::F32, 1.5),
            (ScalarType::F64, -0.125),
        ] {
            scalar.encode_native(v, &mut buf);
            assert_eq!(scalar.decode_native(&buf), v, "{scalar:?}");
        }
    }

    #[test]
    fn test_default_band_values() {
        let v = BandValues::default_for(ScalarType::I16);
        assert_eq!((v.null, v.min, v.max), (-32768.0, -32767.0, 32767.0));
        let v = BandValues::default_for(ScalarType::U8);
        assert_eq!((v.null, v.min, v.max), (0.0, 1.0, 255.0));
        assert_eq!(ByteOrder::native().opposite().opposite(), ByteOrder::native());
    }
}

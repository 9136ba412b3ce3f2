//! Tiled access to general raster files.
//!
//! A [`RasterReader`] serves arbitrary rectangles of a raster that may be
//! far larger than memory. It keeps one fill buffer holding the most recent
//! rectangle read from disk, in the file's own interleave, and only goes
//! back to the file when a request is not already covered by that buffer.
//!
//! ```rust,no_run
//! use rasterspline::raster::{Interleave, OpenOptions, RasterDescriptor, RasterReader, Rect, ScalarType};
//!
//! let descriptor = RasterDescriptor::new(
//!     vec!["scene.raw".into()],
//!     4096,
//!     4096,
//!     3,
//!     ScalarType::U16,
//!     Interleave::Bil,
//! );
//! let mut reader = RasterReader::open(descriptor, OpenOptions::default()).unwrap();
//! let tile = reader.get_tile(&Rect::new(128, 128, 191, 191), 0).unwrap();
//! let red: Vec<u16> = tile.band_as(0).unwrap();
//! # let _ = red;
//! ```
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;

use log::{debug, trace, warn};

use super::descriptor::{Interleave, RasterDescriptor, ScalarType};
use super::endian::{needs_swap, swap_if_needed};
use super::rect::Rect;
use super::tile::Tile;
use crate::error::{Error, Result};

/// Anything that can serve tiles of an image at one or more resolution
/// levels. Level 0 is full resolution.
pub trait TileSource {
    fn number_of_bands(&self) -> usize;

    fn scalar_type(&self) -> ScalarType;

    /// Zero-based image rectangle at a resolution level, if the level exists.
    fn image_rect(&self, res_level: u32) -> Option<Rect>;

    fn is_valid_res_level(&self, res_level: u32) -> bool;

    /// Read the pixels of `rect` at a resolution level.
    fn get_tile(&mut self, rect: &Rect, res_level: u32) -> Result<Tile>;
}

/// Options applied when opening a raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenOptions {
    /// Width in pixels of the fill buffer allocated at open
    pub tile_width: usize,
    /// Height in pixels of the fill buffer allocated at open
    pub tile_height: usize,
    /// Reject backing files shorter than the descriptor implies
    pub validate_file_size: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            tile_width: 64,
            tile_height: 64,
            validate_file_size: false,
        }
    }
}

impl OpenOptions {
    pub fn with_tile_size(mut self, width: usize, height: usize) -> Self {
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn with_validate_file_size(mut self, validate: bool) -> Self {
        self.validate_file_size = validate;
        self
    }
}

/// Reader for rasters laid out as described by a [`RasterDescriptor`].
///
/// Not safe to share between threads without external locking: every
/// [`RasterReader::get_tile`] may refill the single fill buffer.
pub struct RasterReader<R = File> {
    descriptor: RasterDescriptor,
    options: OpenOptions,
    streams: Vec<R>,
    swap_bytes: bool,
    buffer: Vec<u8>,
    /// Pixels the buffer was last allocated for
    buffer_pixels: usize,
    /// Rectangle currently held in the buffer; `None` when it holds nothing
    /// valid
    buffer_rect: Option<Rect>,
    buffer_allocations: usize,
    overview: Option<Box<dyn TileSource + Send>>,
}

impl RasterReader<File> {
    /// Open the files named by the descriptor.
    ///
    /// # Errors
    /// * If the descriptor is inconsistent or names the wrong number of files
    /// * If any file cannot be opened for reading
    /// * If file size validation is enabled and a file is too small
    pub fn open(descriptor: RasterDescriptor, options: OpenOptions) -> Result<Self> {
        descriptor.validate()?;
        descriptor.validate_files()?;

        let streams = descriptor
            .files()
            .iter()
            .map(|path| {
                File::open(path).map_err(|source| Error::CannotOpen {
                    path: path.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<File>>>()?;

        Self::from_streams(descriptor, streams, options)
    }
}

impl<R: Read + Seek> RasterReader<R> {
    /// Read from already-open streams, one per backing file.
    ///
    /// # Errors
    /// * If the descriptor is inconsistent
    /// * If the number of streams does not match the layout
    /// * If file size validation is enabled and a stream is too small
    pub fn from_streams(
        descriptor: RasterDescriptor,
        mut streams: Vec<R>,
        options: OpenOptions,
    ) -> Result<Self> {
        descriptor.validate()?;
        if streams.len() != descriptor.stream_count() {
            return Err(Error::InvalidDescriptor(format!(
                "{:?} layout needs {} streams, got {}",
                descriptor.interleave(),
                descriptor.stream_count(),
                streams.len()
            )));
        }

        if options.validate_file_size {
            let expected = descriptor.expected_file_size();
            for (i, stream) in streams.iter_mut().enumerate() {
                let actual = stream.seek(SeekFrom::End(0))?;
                stream.seek(SeekFrom::Start(0))?;
                if actual < expected {
                    let path = descriptor
                        .files()
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| PathBuf::from(format!("<stream {i}>")));
                    return Err(Error::FileTooSmall {
                        path,
                        expected,
                        actual,
                    });
                }
            }
        }

        let swap_bytes = needs_swap(descriptor.byte_order()) && descriptor.bytes_per_pixel() > 1;
        let mut reader = Self {
            descriptor,
            options,
            streams,
            swap_bytes,
            buffer: Vec::new(),
            buffer_pixels: 0,
            buffer_rect: None,
            buffer_allocations: 0,
            overview: None,
        };
        reader.check_buffer(&Rect::from_origin_size(
            0,
            0,
            options.tile_width,
            options.tile_height,
        ));

        debug!(
            "Opened {:?} raster {}x{}x{}: {} stream(s), swap bytes {}, buffer {} bytes",
            reader.descriptor.interleave(),
            reader.descriptor.valid_samples(),
            reader.descriptor.valid_lines(),
            reader.descriptor.number_of_bands(),
            reader.streams.len(),
            reader.swap_bytes,
            reader.buffer.len()
        );
        Ok(reader)
    }

    /// Read the pixels of `rect`, in zero-based image space.
    ///
    /// Pixels outside the image hold the band's null value, and a rectangle
    /// that misses the image entirely gives a blank tile. When an overview
    /// serves `res_level`, the request goes to the overview instead.
    ///
    /// # Errors
    /// * If the reader is closed
    /// * If `res_level > 0` and no overview serves it
    /// * If a seek or read fails; the fill buffer is then discarded
    pub fn get_tile(&mut self, rect: &Rect, res_level: u32) -> Result<Tile> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }

        if let Some(overview) = self.overview.as_mut() {
            if overview.is_valid_res_level(res_level) {
                let (dx, dy) = self.descriptor.sub_image_offset();
                let mut tile = overview.get_tile(&rect.translate(-dx, -dy), res_level)?;
                tile.translate(dx, dy);
                return Ok(tile);
            }
        }
        if res_level > 0 {
            warn!("No overview for resolution level {res_level}");
            return Err(Error::InvalidResLevel(res_level));
        }

        let mut tile = Tile::blank(
            *rect,
            self.descriptor.scalar_type(),
            self.descriptor.band_values(),
        );
        let Some(clip) = rect.clip_to(&self.descriptor.image_rect()) else {
            return Ok(tile);
        };

        self.check_buffer(rect);
        let buffered = self
            .buffer_rect
            .is_some_and(|b| clip.completely_within(&b));
        if !buffered {
            if let Err(e) = self.fill_buffer((clip.ul_x, clip.ul_y), (rect.width(), rect.height())) {
                warn!("Error filling buffer at ({}, {}): {e}", clip.ul_x, clip.ul_y);
                return Err(e);
            }
        }

        let buffer_rect = self.buffer_rect.ok_or(Error::NotOpen)?;
        tile.load_from_buffer(
            &self.buffer,
            &buffer_rect,
            &clip,
            self.descriptor.interleave(),
        );
        tile.validate();
        Ok(tile)
    }

    /// Read the `size` pixels starting at `origin` (`(x, y)` in zero-based
    /// image space) into the fill buffer, clipped to the image, and return
    /// the rectangle now buffered.
    ///
    /// Samples are swapped to host byte order after a successful read. On
    /// failure the buffer holds nothing.
    ///
    /// # Errors
    /// * If the reader is closed
    /// * If `origin` is outside the image
    /// * If a seek fails or a read comes up short
    pub fn fill_buffer(&mut self, origin: (i64, i64), size: (usize, usize)) -> Result<Rect> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }
        let image = self.descriptor.image_rect();
        if !image.contains(origin.0, origin.1) || size.0 == 0 || size.1 == 0 {
            return Err(Error::DimensionMismatch(format!(
                "fill origin {origin:?} with size {size:?} is outside image {image:?}"
            )));
        }

        self.check_buffer(&Rect::from_origin_size(origin.0, origin.1, size.0, size.1));
        self.buffer_rect = None;

        let (x, y) = origin;
        let rect = Rect::new(
            x,
            y,
            (x + size.0 as i64 - 1).min(image.lr_x),
            (y + size.1 as i64 - 1).min(image.lr_y),
        );
        trace!("Filling {:?} buffer with {rect:?}", self.descriptor.interleave());

        let d = &self.descriptor;
        let streams = &mut self.streams;
        let buffer = &mut self.buffer;
        match d.interleave() {
            Interleave::Bip => fill_bip(d, &mut streams[0], buffer, &rect)?,
            Interleave::Bil => fill_bil(d, &mut streams[0], buffer, &rect)?,
            Interleave::Bsq => fill_bsq(d, &mut streams[0], buffer, &rect)?,
            Interleave::BsqMultiFile => fill_bsq_multi_file(d, streams, buffer, &rect)?,
        }

        if self.swap_bytes {
            let used = rect.area() * d.number_of_bands() * d.bytes_per_pixel();
            swap_if_needed(&mut self.buffer[..used], d);
        }
        self.buffer_rect = Some(rect);
        Ok(rect)
    }

    /// Make the fill buffer fit `rect`. The buffer is only reallocated, and
    /// its contents discarded, when the pixel count of `rect` differs from
    /// the one it was sized for; rectangles of equal area share a buffer.
    pub fn check_buffer(&mut self, rect: &Rect) {
        let pixels = rect.area();
        if pixels == self.buffer_pixels && !self.buffer.is_empty() {
            return;
        }
        let bytes = pixels * self.descriptor.number_of_bands() * self.descriptor.bytes_per_pixel();
        debug!("Allocating {bytes} byte fill buffer for {pixels} pixels");
        self.buffer = vec![0; bytes];
        self.buffer_pixels = pixels;
        self.buffer_rect = None;
        self.buffer_allocations += 1;
    }
}

impl<R> RasterReader<R> {
    pub fn is_open(&self) -> bool {
        !self.streams.is_empty()
    }

    /// Drop the streams, the fill buffer and any overview.
    pub fn close(&mut self) {
        self.streams.clear();
        self.buffer = Vec::new();
        self.buffer_pixels = 0;
        self.buffer_rect = None;
        self.overview = None;
    }

    /// Serve some resolution levels from another source.
    pub fn set_overview(&mut self, overview: Box<dyn TileSource + Send>) {
        self.overview = Some(overview);
    }

    pub fn has_overview(&self) -> bool {
        self.overview.is_some()
    }

    pub fn descriptor(&self) -> &RasterDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Lines at a resolution level, or zero if the level does not exist.
    pub fn number_of_lines(&self, res_level: u32) -> usize {
        self.rect_at(res_level).map_or(0, |r| r.height())
    }

    /// Samples per line at a resolution level, or zero if the level does
    /// not exist.
    pub fn number_of_samples(&self, res_level: u32) -> usize {
        self.rect_at(res_level).map_or(0, |r| r.width())
    }

    pub fn null_pixel_value(&self, band: usize) -> Option<f64> {
        self.descriptor.band_values().get(band).map(|v| v.null)
    }

    pub fn min_pixel_value(&self, band: usize) -> Option<f64> {
        self.descriptor.band_values().get(band).map(|v| v.min)
    }

    pub fn max_pixel_value(&self, band: usize) -> Option<f64> {
        self.descriptor.band_values().get(band).map(|v| v.max)
    }

    pub fn tile_width(&self) -> usize {
        self.options.tile_width
    }

    pub fn tile_height(&self) -> usize {
        self.options.tile_height
    }

    /// Whether samples are swapped to host order after each read.
    pub fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    pub fn buffer_rect(&self) -> Option<Rect> {
        self.buffer_rect
    }

    /// Number of times the fill buffer has been allocated, including at
    /// open.
    pub fn buffer_allocations(&self) -> usize {
        self.buffer_allocations
    }

    fn rect_at(&self, res_level: u32) -> Option<Rect> {
        if let Some(overview) = self.overview.as_ref() {
            if overview.is_valid_res_level(res_level) {
                return overview.image_rect(res_level);
            }
        }
        (res_level == 0).then(|| self.descriptor.image_rect())
    }
}

impl<R: Read + Seek> TileSource for RasterReader<R> {
    fn number_of_bands(&self) -> usize {
        self.descriptor.number_of_bands()
    }

    fn scalar_type(&self) -> ScalarType {
        self.descriptor.scalar_type()
    }

    fn image_rect(&self, res_level: u32) -> Option<Rect> {
        self.rect_at(res_level)
    }

    fn is_valid_res_level(&self, res_level: u32) -> bool {
        self.rect_at(res_level).is_some()
    }

    fn get_tile(&mut self, rect: &Rect, res_level: u32) -> Result<Tile> {
        RasterReader::get_tile(self, rect, res_level)
    }
}

/// Seek to `offset` and fill `buf` completely.
fn read_at<R: Read + Seek>(stream: &mut R, offset: u64, buf: &mut [u8]) -> Result<()> {
    stream
        .seek(SeekFrom::Start(offset))
        .map_err(|source| Error::SeekFailed { offset, source })?;

    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(Error::ReadFailed { offset, source }),
        }
    }
    if filled != buf.len() {
        return Err(Error::ShortRead {
            offset,
            expected: buf.len(),
            actual: filled,
        });
    }
    Ok(())
}

/// One read per line, covering every band of each pixel.
fn fill_bip<R: Read + Seek>(
    d: &RasterDescriptor,
    stream: &mut R,
    buffer: &mut [u8],
    rect: &Rect,
) -> Result<()> {
    let bpp = d.bytes_per_pixel() as u64;
    let bands = d.number_of_bands() as u64;
    let bprl = d.bytes_per_raw_line();
    let width = rect.width() * bands as usize * bpp as usize;

    let mut offset =
        d.offset_to_first_valid_sample() + rect.ul_y as u64 * bprl + rect.ul_x as u64 * bpp * bands;
    for line in buffer.chunks_exact_mut(width).take(rect.height()) {
        read_at(stream, offset, line)?;
        offset += bprl;
    }
    Ok(())
}

/// One read per line and band. Raw lines of consecutive bands are
/// adjacent in the file.
fn fill_bil<R: Read + Seek>(
    d: &RasterDescriptor,
    stream: &mut R,
    buffer: &mut [u8],
    rect: &Rect,
) -> Result<()> {
    let bpp = d.bytes_per_pixel() as u64;
    let bands = d.number_of_bands();
    let bprl = d.bytes_per_raw_line();
    let width = rect.width() * bpp as usize;

    let mut offset = d.offset_to_first_valid_sample()
        + rect.ul_y as u64 * bprl * bands as u64
        + rect.ul_x as u64 * bpp;
    for line in buffer.chunks_exact_mut(width).take(rect.height() * bands) {
        read_at(stream, offset, line)?;
        offset += bprl;
    }
    Ok(())
}

/// One read per band and line, bands a whole band image apart.
fn fill_bsq<R: Read + Seek>(
    d: &RasterDescriptor,
    stream: &mut R,
    buffer: &mut [u8],
    rect: &Rect,
) -> Result<()> {
    let start = bsq_start(d, rect);
    let plane = rect.area() * d.bytes_per_pixel();
    for (band, chunk) in buffer.chunks_exact_mut(plane).take(d.number_of_bands()).enumerate() {
        fill_band(d, stream, chunk, rect, start + band as u64 * d.band_stride())?;
    }
    Ok(())
}

/// Same addressing as a single band of [`fill_bsq`], each band from its own
/// stream.
fn fill_bsq_multi_file<R: Read + Seek>(
    d: &RasterDescriptor,
    streams: &mut [R],
    buffer: &mut [u8],
    rect: &Rect,
) -> Result<()> {
    let start = bsq_start(d, rect);
    let plane = rect.area() * d.bytes_per_pixel();
    for (stream, chunk) in streams.iter_mut().zip(buffer.chunks_exact_mut(plane)) {
        fill_band(d, stream, chunk, rect, start)?;
    }
    Ok(())
}

fn bsq_start(d: &RasterDescriptor, rect: &Rect) -> u64 {
    d.offset_to_first_valid_sample()
        + rect.ul_y as u64 * d.bytes_per_raw_line()
        + rect.ul_x as u64 * d.bytes_per_pixel() as u64
}

fn fill_band<R: Read + Seek>(
    d: &RasterDescriptor,
    stream: &mut R,
    plane: &mut [u8],
    rect: &Rect,
    mut offset: u64,
) -> Result<()> {
    let width = rect.width() * d.bytes_per_pixel();
    for line in plane.chunks_exact_mut(width) {
        read_at(stream, offset, line)?;
        offset += d.bytes_per_raw_line();
    }
    Ok(())
}

//! Typed views of a rectangle of raster data.
//!
//! A [`Tile`] always stores its samples band sequentially in host byte
//! order, whatever the interleave of the file it was read from. Pixels of
//! the tile that fall outside the image hold the band's null value.
use bytemuck::Pod;

use super::descriptor::{BandValues, Interleave, ScalarType};
use super::rect::Rect;
use crate::error::{Error, Result};
use crate::image::{Image, Region};

/// How much of a tile holds data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileStatus {
    /// Every sample is null
    Blank,
    /// Some samples are null
    Partial,
    /// No sample is null
    Full,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    rect: Rect,
    scalar: ScalarType,
    bands: usize,
    nulls: Vec<f64>,
    data: Vec<u8>,
    status: TileStatus,
}

impl Tile {
    /// A tile over `rect` with every sample set to its band's null value.
    pub fn blank(rect: Rect, scalar: ScalarType, band_values: &[BandValues]) -> Self {
        let mut tile = Self {
            rect,
            scalar,
            bands: band_values.len(),
            nulls: band_values.iter().map(|v| v.null).collect(),
            data: vec![0; rect.area() * band_values.len() * scalar.size()],
            status: TileStatus::Blank,
        };
        tile.make_blank();
        tile
    }

    /// Set every sample to its band's null value.
    pub fn make_blank(&mut self) {
        let bpp = self.scalar.size();
        let plane = self.rect.area() * bpp;
        let mut null = [0_u8; 8];
        for (band, chunk) in self.data.chunks_exact_mut(plane.max(1)).enumerate() {
            self.scalar.encode_native(self.nulls[band], &mut null);
            chunk
                .chunks_exact_mut(bpp)
                .for_each(|s| s.copy_from_slice(&null[..bpp]));
        }
        self.status = TileStatus::Blank;
    }

    /// Copy the pixels of `clip` out of a fill buffer holding `buffer_rect`
    /// in the given interleave. `clip` must lie inside both `buffer_rect` and
    /// this tile.
    pub fn load_from_buffer(
        &mut self,
        buffer: &[u8],
        buffer_rect: &Rect,
        clip: &Rect,
        interleave: Interleave,
    ) {
        let bpp = self.scalar.size();
        let bands = self.bands;
        let buf_w = buffer_rect.width();
        let buf_plane = buffer_rect.area() * bpp;
        let tile_w = self.rect.width();
        let tile_plane = self.rect.area() * bpp;
        let row_bytes = clip.width() * bpp;

        for y in clip.ul_y..=clip.lr_y {
            let by = (y - buffer_rect.ul_y) as usize;
            let bx = (clip.ul_x - buffer_rect.ul_x) as usize;
            let ty = (y - self.rect.ul_y) as usize;
            let tx = (clip.ul_x - self.rect.ul_x) as usize;

            for band in 0..bands {
                let dst = band * tile_plane + (ty * tile_w + tx) * bpp;
                match interleave {
                    Interleave::Bip => {
                        // Pixels of one band are `bands * bpp` apart
                        let src_row = by * buf_w * bands * bpp;
                        for i in 0..clip.width() {
                            let src = src_row + ((bx + i) * bands + band) * bpp;
                            let d = dst + i * bpp;
                            self.data[d..d + bpp].copy_from_slice(&buffer[src..src + bpp]);
                        }
                    }
                    Interleave::Bil => {
                        let src = ((by * bands + band) * buf_w + bx) * bpp;
                        self.data[dst..dst + row_bytes]
                            .copy_from_slice(&buffer[src..src + row_bytes]);
                    }
                    Interleave::Bsq | Interleave::BsqMultiFile => {
                        let src = band * buf_plane + (by * buf_w + bx) * bpp;
                        self.data[dst..dst + row_bytes]
                            .copy_from_slice(&buffer[src..src + row_bytes]);
                    }
                }
            }
        }
    }

    /// Recompute the status by comparing every sample to its band's null.
    pub fn validate(&mut self) -> TileStatus {
        let bpp = self.scalar.size();
        let plane = self.rect.area() * bpp;
        let (mut nulls, mut total) = (0_usize, 0_usize);
        for (band, chunk) in self.data.chunks_exact(plane.max(1)).enumerate() {
            let null = self.nulls[band];
            for s in chunk.chunks_exact(bpp) {
                total += 1;
                if self.scalar.decode_native(s) == null {
                    nulls += 1;
                }
            }
        }
        self.status = if nulls == total {
            TileStatus::Blank
        } else if nulls == 0 {
            TileStatus::Full
        } else {
            TileStatus::Partial
        };
        self.status
    }

    pub fn status(&self) -> TileStatus {
        self.status
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Move the tile in image space without touching its samples.
    pub fn translate(&mut self, dx: i64, dy: i64) {
        self.rect = self.rect.translate(dx, dy);
    }

    pub fn width(&self) -> usize {
        self.rect.width()
    }

    pub fn height(&self) -> usize {
        self.rect.height()
    }

    pub fn number_of_bands(&self) -> usize {
        self.bands
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.scalar
    }

    pub fn null_value(&self, band: usize) -> Option<f64> {
        self.nulls.get(band).copied()
    }

    /// All samples, band sequential, in host byte order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn band_bytes(&self, band: usize) -> Result<&[u8]> {
        if band >= self.bands {
            return Err(Error::DimensionMismatch(format!(
                "band {band} of a {}-band tile",
                self.bands
            )));
        }
        let plane = self.rect.area() * self.scalar.size();
        Ok(&self.data[band * plane..(band + 1) * plane])
    }

    /// Samples of one band as a plain-old-data type of the same width as the
    /// raster's scalar type, row by row.
    ///
    /// # Errors
    /// * If `band` is out of range
    /// * If `T` is not as wide as the raster's samples
    pub fn band_as<T: Pod>(&self, band: usize) -> Result<Vec<T>> {
        if std::mem::size_of::<T>() != self.scalar.size() {
            return Err(Error::ScalarMismatch {
                expected: std::mem::size_of::<T>(),
                actual: self.scalar,
            });
        }
        Ok(bytemuck::pod_collect_to_vec(self.band_bytes(band)?))
    }

    /// Samples of one band decoded to `f64`, row by row.
    ///
    /// # Errors
    /// * If `band` is out of range
    pub fn band_values(&self, band: usize) -> Result<Vec<f64>> {
        let bpp = self.scalar.size();
        Ok(self
            .band_bytes(band)?
            .chunks_exact(bpp)
            .map(|s| self.scalar.decode_native(s))
            .collect())
    }

    /// One band as an image whose region is the tile's rectangle in image
    /// space, ready for B-spline decomposition.
    ///
    /// # Errors
    /// * If `band` is out of range
    pub fn band_to_image(&self, band: usize) -> Result<Image<f64, 2>> {
        let region = Region::new(
            [self.rect.ul_x, self.rect.ul_y],
            [self.rect.width(), self.rect.height()],
        );
        Image::from_vec(region, self.band_values(band)?)
    }

    /// One sample at image coordinates, or `None` outside the tile.
    pub fn sample(&self, band: usize, x: i64, y: i64) -> Option<f64> {
        if !self.rect.contains(x, y) {
            return None;
        }
        let bpp = self.scalar.size();
        let i = (y - self.rect.ul_y) as usize * self.rect.width() + (x - self.rect.ul_x) as usize;
        let bytes = self.band_bytes(band).ok()?;
        Some(self.scalar.decode_native(&bytes[i * bpp..(i + 1) * bpp]))
    }
}

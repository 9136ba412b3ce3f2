//! N-dimensional images and regions.
//!
//! An [`Image`] stores exactly the samples of its buffered [`Region`], which
//! may be an arbitrary window into a much larger logical image. Indices are
//! always expressed in the coordinates of that larger image, so a region
//! read from the middle of a raster keeps its true position.
//!
//! Memory order has axis 0 varying fastest (sample, then line, then slice),
//! the same order rows are stored in a raster file.
use crate::error::{Error, Result};

/// An axis-aligned N-dimensional block of index space: a starting index and
/// a per-axis extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region<const D: usize> {
    /// First index on each axis
    pub index: [i64; D],

    /// Number of samples on each axis
    pub size: [usize; D],
}

impl<const D: usize> Region<D> {
    pub fn new(index: [i64; D], size: [usize; D]) -> Self {
        Self { index, size }
    }

    /// A region starting at the origin.
    pub fn from_size(size: [usize; D]) -> Self {
        Self {
            index: [0; D],
            size,
        }
    }

    /// Total number of samples covered.
    pub fn num_pixels(&self) -> usize {
        self.size.iter().product()
    }

    /// Whether an integer index lies inside the region.
    pub fn is_inside(&self, index: &[i64; D]) -> bool {
        (0..D).all(|i| {
            index[i] >= self.index[i] && index[i] < self.index[i] + self.size[i] as i64
        })
    }

    /// Stride in the flat buffer between neighbors along each axis.
    ///
    /// Each entry is the cumulative product of the sizes of the axes lower
    /// than this one.
    pub fn strides(&self) -> [usize; D] {
        let mut strides = [1_usize; D];
        let mut acc = 1;
        for i in 0..D {
            strides[i] = acc;
            acc *= self.size[i];
        }
        strides
    }

    /// Flat buffer offset of an index, or `None` if it is outside the region.
    pub fn offset_of(&self, index: &[i64; D]) -> Option<usize> {
        if !self.is_inside(index) {
            return None;
        }
        let strides = self.strides();
        Some(
            (0..D)
                .map(|i| (index[i] - self.index[i]) as usize * strides[i])
                .sum(),
        )
    }
}

/// A regular grid of samples over a buffered region, with the physical
/// origin and spacing of the full image it was cut from.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const D: usize> {
    region: Region<D>,
    origin: [f64; D],
    spacing: [f64; D],
    data: Vec<T>,
}

impl<T: Copy, const D: usize> Image<T, D> {
    /// Allocate an image over `region` with every sample set to `fill`.
    pub fn new(region: Region<D>, fill: T) -> Self {
        Self {
            region,
            origin: [0.0; D],
            spacing: [1.0; D],
            data: vec![fill; region.num_pixels()],
        }
    }

    /// Wrap existing samples, which must be in axis-0-fastest order.
    ///
    /// # Errors
    /// * If the number of samples does not match the region
    pub fn from_vec(region: Region<D>, data: Vec<T>) -> Result<Self> {
        if data.len() != region.num_pixels() {
            return Err(Error::DimensionMismatch(format!(
                "region {:?} holds {} samples, got {}",
                region.size,
                region.num_pixels(),
                data.len()
            )));
        }
        Ok(Self {
            region,
            origin: [0.0; D],
            spacing: [1.0; D],
            data,
        })
    }

    /// Set the physical location of index zero.
    pub fn with_origin(mut self, origin: [f64; D]) -> Self {
        self.origin = origin;
        self
    }

    /// Set the physical distance between samples on each axis.
    ///
    /// # Errors
    /// * If any spacing is not strictly positive
    pub fn with_spacing(mut self, spacing: [f64; D]) -> Result<Self> {
        if !spacing.iter().all(|&s| s > 0.0) {
            return Err(Error::DimensionMismatch(format!(
                "spacing must be positive, got {spacing:?}"
            )));
        }
        self.spacing = spacing;
        Ok(self)
    }

    pub fn region(&self) -> &Region<D> {
        &self.region
    }

    pub fn origin(&self) -> &[f64; D] {
        &self.origin
    }

    pub fn spacing(&self) -> &[f64; D] {
        &self.spacing
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Read a sample.
    ///
    /// # Panics
    /// If the index is outside the buffered region. Check with
    /// [`Region::is_inside`] first when that is not already guaranteed.
    #[inline]
    pub fn get(&self, index: &[i64; D]) -> T {
        self.data[self.flat(index)]
    }

    /// Read a sample, or `None` outside the buffered region.
    pub fn try_get(&self, index: &[i64; D]) -> Option<T> {
        self.region.offset_of(index).map(|i| self.data[i])
    }

    /// Write a sample.
    ///
    /// # Panics
    /// If the index is outside the buffered region.
    #[inline]
    pub fn set(&mut self, index: &[i64; D], value: T) {
        let i = self.flat(index);
        self.data[i] = value;
    }

    /// Whether a continuous index falls on a buffered sample, using the
    /// convention that each sample covers half a pixel on either side.
    pub fn is_inside_buffer(&self, cindex: &[f64; D]) -> bool {
        (0..D).all(|i| {
            let start = self.region.index[i] as f64 - 0.5;
            let end = start + self.region.size[i] as f64;
            cindex[i] >= start && cindex[i] < end
        })
    }

    /// Convert a physical point to a continuous index.
    pub fn transform_point_to_continuous_index(&self, point: &[f64; D]) -> [f64; D] {
        let mut cindex = [0.0; D];
        for i in 0..D {
            cindex[i] = (point[i] - self.origin[i]) / self.spacing[i];
        }
        cindex
    }

    /// An image with the same geometry holding different samples.
    pub(crate) fn with_data<U>(&self, data: Vec<U>) -> Image<U, D> {
        debug_assert_eq!(data.len(), self.data.len());
        Image {
            region: self.region,
            origin: self.origin,
            spacing: self.spacing,
            data,
        }
    }

    #[inline]
    fn flat(&self, index: &[i64; D]) -> usize {
        let strides = self.region.strides();
        let mut i = 0;
        for j in 0..D {
            i += (index[j] - self.region.index[j]) as usize * strides[j];
        }
        i
    }
}

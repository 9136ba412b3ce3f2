//! Out-of-core access to general raster files, and N-dimensional B-spline
//! decomposition and interpolation of the regions read from them.
//!
//! Data flows through three stages:
//! 1. [`raster::RasterReader`] reads an arbitrary rectangle of a BIP, BIL, BSQ
//!    or multi-file BSQ raster into a [`raster::Tile`], correcting byte order.
//! 2. [`BSplineDecomposition`] turns the samples of an [`Image`] into B-spline
//!    coefficients with a separable recursive filter.
//! 3. [`BSplineInterpolator`] evaluates the continuous spline, or its gradient,
//!    anywhere in (or, by mirror reflection, outside) the image.
//!
//! # Performance Scalings
//! A spline of order `n` in `D` dimensions touches `(n + 1)^D` coefficients
//! per evaluated point. The coefficient filter costs a constant number of
//! operations per sample and pole on each axis, and its lines along an axis
//! are filtered in parallel with the `parallel` feature.
//!
//! | Method                        | RAM             | Cost                       |
//! |-------------------------------|-----------------|----------------------------|
//! | BSplineDecomposition::compute | O(pixels)       | O(poles * D * pixels)      |
//! | BSplineInterpolator (value)   | O((n + 1) ^ D)  | O((n + 1) ^ D)             |
//! | BSplineInterpolator (grad)    | O((n + 1) ^ D)  | O(D * (n + 1) ^ D)         |
//! | RasterReader::get_tile        | O(tile)         | O(lines * bands) reads     |
//!
//! # Example: Cubic interpolation of a raster tile
//! ```rust
//! use rasterspline::raster::{write_to, Interleave, OpenOptions, RasterDescriptor, RasterReader, Rect, ScalarType};
//! use rasterspline::BSplineInterpolator;
//! use std::io::Cursor;
//!
//! // A 16x16 single-band ramp
//! let data: Vec<f32> = (0..256).map(|i| i as f32).collect();
//! let descriptor = RasterDescriptor::new(vec![], 16, 16, 1, ScalarType::F32, Interleave::Bsq);
//! let streams: Vec<_> = write_to(&descriptor, &data).unwrap().into_iter().map(Cursor::new).collect();
//!
//! // Read the middle of it
//! let mut reader = RasterReader::from_streams(descriptor, streams, OpenOptions::default()).unwrap();
//! let tile = reader.get_tile(&Rect::new(4, 4, 11, 11), 0).unwrap();
//! let image = tile.band_to_image(0).unwrap();
//!
//! // Interpolate between samples
//! let mut interp = BSplineInterpolator::new(3).unwrap();
//! interp.set_input_image(&image);
//! let v = interp.evaluate_at_continuous_index(&[7.5, 7.5]).unwrap();
//! assert!((v - 127.5).abs() < 1e-6);
//! ```
// These "needless" range loops are a significant speedup
#![allow(clippy::needless_range_loop)]

pub mod bspline;
pub use bspline::{BSplineDecomposition, BSplineInterpolator, CoefficientState};

pub mod error;
pub use error::{Error, Result};

pub mod image;
pub use image::{Image, Region};

pub mod raster;

pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

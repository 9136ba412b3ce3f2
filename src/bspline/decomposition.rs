//! Separable recursive filter turning samples into B-spline coefficients.
//!
//! Along each axis in turn, every 1-D line of samples is multiplied by the
//! filter gain and then run through one causal and one anticausal
//! first-order recursion per pole. Each axis pass reads the output of the
//! previous one, and all lines of an axis finish before the next axis
//! starts. Lines within a pass are independent and, with the `parallel`
//! feature, are processed on the rayon thread pool.
//!
//! All arithmetic is done in `f64` whatever the input and output types.
//!
//! ```rust
//! use rasterspline::{BSplineDecomposition, Image, Region};
//!
//! let samples: Vec<f32> = (0..20).map(|i| (i as f32).sin()).collect();
//! let image = Image::from_vec(Region::from_size([5, 4]), samples).unwrap();
//!
//! let filter = BSplineDecomposition::new(3).unwrap();
//! let coefficients: Image<f64, 2> = filter.compute(&image);
//! assert_eq!(coefficients.region(), image.region());
//! ```
use log::trace;
use num_traits::{Float, NumCast, ToPrimitive};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{Poles, TOLERANCE, check_order};
use crate::error::{Error, Result};
use crate::image::Image;

/// Most strided lines held in scratch at once during one axis pass.
const LINE_BATCH: usize = 1024;

/// B-spline coefficient filter for a fixed spline order.
#[derive(Clone, Debug, PartialEq)]
pub struct BSplineDecomposition {
    order: usize,
    poles: Poles,
}

impl BSplineDecomposition {
    /// Build a filter for a spline order in `0..=5`.
    ///
    /// # Errors
    /// * If the order is not supported
    pub fn new(order: usize) -> Result<Self> {
        Ok(Self {
            order: check_order(order)?,
            poles: Poles::for_order(order)?,
        })
    }

    /// Change the spline order. On error the previous order is kept.
    ///
    /// # Errors
    /// * If the order is not supported
    pub fn set_spline_order(&mut self, order: usize) -> Result<()> {
        if order == self.order {
            return Ok(());
        }
        self.poles = Poles::for_order(order)?;
        self.order = order;
        Ok(())
    }

    pub fn spline_order(&self) -> usize {
        self.order
    }

    pub fn poles(&self) -> &Poles {
        &self.poles
    }

    /// Compute the coefficients of the buffered region of `input`.
    ///
    /// The result has the same region, origin and spacing as the input.
    /// Input samples that have no `f64` representation become NaN.
    pub fn compute<P, C, const D: usize>(&self, input: &Image<P, D>) -> Image<C, D>
    where
        P: Copy + ToPrimitive,
        C: Float,
    {
        let mut work: Vec<f64> = input
            .data()
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect();
        self.data_to_coefficients_nd(&mut work, &input.region().size);

        input.with_data(
            work.into_iter()
                .map(|v| <C as NumCast>::from(v).unwrap_or_else(C::nan))
                .collect(),
        )
    }

    /// Transform samples to coefficients in place.
    ///
    /// `data` holds `prod(size)` samples with axis 0 varying fastest.
    ///
    /// # Errors
    /// * If the length of `data` does not match `size`
    pub fn transform_in_place<const D: usize>(
        &self,
        data: &mut [f64],
        size: &[usize; D],
    ) -> Result<()> {
        let n: usize = size.iter().product();
        if data.len() != n {
            return Err(Error::DimensionMismatch(format!(
                "size {size:?} holds {n} samples, got {}",
                data.len()
            )));
        }
        self.data_to_coefficients_nd(data, size);
        Ok(())
    }

    fn data_to_coefficients_nd<const D: usize>(&self, data: &mut [f64], size: &[usize; D]) {
        if self.poles.is_empty() || data.is_empty() {
            return;
        }

        // Number of lines interleaved with each other along this axis
        let mut inner = 1;
        for axis in 0..D {
            let len = size[axis];
            if len == 1 {
                // No recursion can run on a single sample; mirroring it is
                // the identity.
                trace!("Skipping singleton axis {axis}");
            } else if inner == 1 {
                self.transform_contiguous(data, len);
            } else {
                self.transform_strided(data, len, inner);
            }
            inner *= len;
        }
    }

    /// Lines along axis 0 are contiguous runs of `len` samples.
    fn transform_contiguous(&self, data: &mut [f64], len: usize) {
        #[cfg(feature = "parallel")]
        data.par_chunks_mut(len).for_each(|line| {
            self.data_to_coefficients_1d(line);
        });

        #[cfg(not(feature = "parallel"))]
        data.chunks_mut(len).for_each(|line| {
            self.data_to_coefficients_1d(line);
        });
    }

    /// Lines along higher axes have stride `inner`. Each block of
    /// `len * inner` samples holds `inner` complete lines, which are gathered
    /// at most `LINE_BATCH` at a time into contiguous scratch lines.
    fn transform_strided(&self, data: &mut [f64], len: usize, inner: usize) {
        let batch = LINE_BATCH.min(inner);
        let mut scratch = vec![0.0; batch * len];
        for block in data.chunks_mut(len * inner) {
            for j0 in (0..inner).step_by(batch) {
                let lines = batch.min(inner - j0);
                let scratch = &mut scratch[..lines * len];
                for n in 0..len {
                    let row = &block[n * inner + j0..n * inner + j0 + lines];
                    for (l, &v) in row.iter().enumerate() {
                        scratch[l * len + n] = v;
                    }
                }

                self.transform_contiguous(scratch, len);

                for n in 0..len {
                    let row = &mut block[n * inner + j0..n * inner + j0 + lines];
                    for (l, v) in row.iter_mut().enumerate() {
                        *v = scratch[l * len + n];
                    }
                }
            }
        }
    }

    /// Run the recursive filter over one line in place.
    ///
    /// Returns `false`, leaving the line untouched, when it has fewer than two
    /// samples.
    pub(crate) fn data_to_coefficients_1d(&self, line: &mut [f64]) -> bool {
        let len = line.len();
        if len < 2 {
            return false;
        }

        let c0 = self.poles.gain();
        line.iter_mut().for_each(|x| *x *= c0);

        for &z in self.poles.as_slice() {
            set_initial_causal_coefficient(line, z);
            for n in 1..len {
                line[n] += z * line[n - 1];
            }

            set_initial_anticausal_coefficient(line, z);
            for n in (0..len - 1).rev() {
                line[n] = z * (line[n + 1] - line[n]);
            }
        }

        true
    }
}

/// Initialize the causal recursion at index 0 with the mirror-extended
/// geometric sum `sum(z^k * x[k])`.
///
/// When the pole decays below [`TOLERANCE`] inside the line the sum is simply
/// truncated; otherwise the full mirror-symmetric sum is taken in closed form.
fn set_initial_causal_coefficient(line: &mut [f64], z: f64) {
    let len = line.len();
    let horizon = (TOLERANCE.ln() / z.abs().ln()).ceil() as usize;
    let mut zn = z;

    if horizon < len {
        let mut sum = line[0];
        for n in 1..horizon {
            sum += zn * line[n];
            zn *= z;
        }
        line[0] = sum;
    } else {
        // Only reached when `len <= horizon`, which is a few dozen samples
        let iz = 1.0 / z;
        let mut z2n = z.powi((len - 1) as i32);
        let mut sum = line[0] + z2n * line[len - 1];
        z2n *= z2n * iz;
        for n in 1..len - 1 {
            sum += (zn + z2n) * line[n];
            zn *= z;
            z2n *= iz;
        }
        line[0] = sum / (1.0 - zn * zn);
    }
}

/// Initialize the anticausal recursion at the last index.
#[inline]
fn set_initial_anticausal_coefficient(line: &mut [f64], z: f64) {
    let len = line.len();
    line[len - 1] = (z / (z * z - 1.0)) * (z * line[len - 2] + line[len - 1]);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bspline::{MAX_SUPPORT, mirror_index};
    use crate::bspline::weights::basis_weights;
    use crate::image::Region;
    use crate::testing::*;

    /// Rebuild samples from coefficients by sampling the spline at the grid
    /// points, with mirrored coefficients past the ends.
    fn resample_1d(coefs: &[f64], order: usize) -> Vec<f64> {
        let len = coefs.len();
        let mut w = [0.0; MAX_SUPPORT];
        (0..len)
            .map(|i| {
                let x = i as f64;
                let start = crate::bspline::weights::support_start(x, order);
                basis_weights(x, start, order, &mut w);
                (0..=order)
                    .map(|k| w[k] * coefs[mirror_index(start + k as i64, len)])
                    .sum()
            })
            .collect()
    }

    #[test]
    fn test_rejects_unsupported_order() {
        assert!(matches!(
            BSplineDecomposition::new(6),
            Err(Error::UnsupportedOrder(6))
        ));

        let mut f = BSplineDecomposition::new(3).unwrap();
        assert!(f.set_spline_order(9).is_err());
        assert_eq!(f.spline_order(), 3);
        f.set_spline_order(5).unwrap();
        assert_eq!(f.spline_order(), 5);
        assert_eq!(f.poles().len(), 2);
    }

    #[test]
    fn test_orders_without_poles_are_identity() {
        let mut rng = rng_fixed_seed();
        let x = randn::<f64>(&mut rng, 30);
        for order in [0, 1] {
            let f = BSplineDecomposition::new(order).unwrap();
            let mut y = x.clone();
            f.transform_in_place(&mut y, &[5, 6]).unwrap();
            assert_eq!(x, y);
        }
    }

    /// Short lines take the exact closed-form initialization; long lines take
    /// the truncated sum. Both must reproduce the samples.
    #[test]
    fn test_1d_reconstruction_all_orders() {
        let mut rng = rng_fixed_seed();
        for order in 2..=5 {
            for len in [2, 3, 4, 7, 16, 100] {
                let x = randn::<f64>(&mut rng, len);
                let f = BSplineDecomposition::new(order).unwrap();
                let mut c = x.clone();
                assert!(f.data_to_coefficients_1d(&mut c));

                let y = resample_1d(&c, order);
                for i in 0..len {
                    assert!(
                        (x[i] - y[i]).abs() < 1e-8,
                        "order {order}, len {len}, i {i}: {} vs {}",
                        x[i],
                        y[i]
                    );
                }
            }
        }
    }

    #[test]
    fn test_singleton_line_untouched() {
        let f = BSplineDecomposition::new(3).unwrap();
        let mut line = [4.25];
        assert!(!f.data_to_coefficients_1d(&mut line));
        assert_eq!(line, [4.25]);

        let mut empty: [f64; 0] = [];
        assert!(!f.data_to_coefficients_1d(&mut empty));
    }

    /// An image with a singleton axis filters exactly like the 1-D lines
    /// along its other axis, and never faults.
    #[test]
    fn test_degenerate_axis() {
        let mut rng = rng_fixed_seed();
        let x = randn::<f64>(&mut rng, 9);
        let f = BSplineDecomposition::new(3).unwrap();

        let mut expected = x.clone();
        f.data_to_coefficients_1d(&mut expected);

        let mut row = x.clone();
        f.transform_in_place(&mut row, &[9, 1]).unwrap();
        let mut col = x.clone();
        f.transform_in_place(&mut col, &[1, 9]).unwrap();
        for i in 0..9 {
            assert!((row[i] - expected[i]).abs() < 1e-14);
            assert!((col[i] - expected[i]).abs() < 1e-14);
        }

        let mut single = [2.5];
        f.transform_in_place(&mut single, &[1, 1, 1]).unwrap();
        assert_eq!(single, [2.5]);
    }

    /// The N-D transform is the composition of 1-D transforms along each axis.
    #[test]
    fn test_separable_composition_3d() {
        let mut rng = rng_fixed_seed();
        let f = BSplineDecomposition::new(3).unwrap();

        // The second size puts more lines on the last axis than one batch holds
        for size in [[4_usize, 5, 3], [40, 30, 3]] {
            let n: usize = size.iter().product();
            let x = randn::<f64>(&mut rng, n);

            let mut got = x.clone();
            f.transform_in_place(&mut got, &size).unwrap();

            let region = Region::from_size(size);
            let strides = region.strides();
            let mut expected = x.clone();
            for axis in 0..3 {
                // Walk every line along `axis` by iterating the other two
                let others: Vec<usize> = (0..3).filter(|&a| a != axis).collect();
                for i in 0..size[others[0]] {
                    for j in 0..size[others[1]] {
                        let base = i * strides[others[0]] + j * strides[others[1]];
                        let mut line: Vec<f64> = (0..size[axis])
                            .map(|k| expected[base + k * strides[axis]])
                            .collect();
                        f.data_to_coefficients_1d(&mut line);
                        for k in 0..size[axis] {
                            expected[base + k * strides[axis]] = line[k];
                        }
                    }
                }
            }

            for i in 0..n {
                assert!((got[i] - expected[i]).abs() < 1e-12, "size {size:?}, sample {i}");
            }
        }
    }

    #[test]
    fn test_compute_keeps_geometry_and_casts() {
        let data: Vec<u16> = (0..24).map(|i| (i * 7 % 11) as u16).collect();
        let img = Image::from_vec(Region::new([3, -2], [6, 4]), data)
            .unwrap()
            .with_origin([1.0, 2.0]);
        let f = BSplineDecomposition::new(2).unwrap();

        let c64: Image<f64, 2> = f.compute(&img);
        let c32: Image<f32, 2> = f.compute(&img);
        assert_eq!(c64.region(), img.region());
        assert_eq!(c64.origin(), &[1.0, 2.0]);
        for (a, b) in c64.data().iter().zip(c32.data()) {
            assert!((*a as f32 - *b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_transform_in_place_size_mismatch() {
        let f = BSplineDecomposition::new(3).unwrap();
        let mut data = vec![0.0; 10];
        assert!(matches!(
            f.transform_in_place(&mut data, &[3, 3]),
            Err(Error::DimensionMismatch(_))
        ));
    }
}

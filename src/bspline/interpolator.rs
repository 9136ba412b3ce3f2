//! Evaluate a B-spline interpolant and its gradient at continuous indices.
//!
//! The interpolator borrows an input image, lazily computes B-spline
//! coefficients over the image's buffered region, and keeps them until the
//! spline order or the input changes.
//!
//! ```rust
//! use rasterspline::{BSplineInterpolator, Image, Region};
//!
//! let data: Vec<f64> = (0..64).map(|i| (i % 8) as f64 + 8.0 * (i / 8) as f64).collect();
//! let image = Image::from_vec(Region::from_size([8, 8]), data).unwrap();
//!
//! let mut interp = BSplineInterpolator::new(3).unwrap();
//! interp.set_input_image(&image);
//! let v = interp.evaluate_at_continuous_index(&[3.5, 3.5]).unwrap();
//! assert!((v - 31.5).abs() < 1e-6);
//! ```
//!
//! Evaluation does not check bounds. Points outside the buffered region see
//! the mirror-symmetric extension of the image; use
//! [`BSplineInterpolator::is_inside_buffer`] first when that is not wanted.
use itertools::Itertools;
use log::debug;
use num_traits::ToPrimitive;

use super::weights::{basis_weights, derivative_weights, support_start};
use super::{BSplineDecomposition, MAX_SUPPORT, fold_period, mirror_index};
use crate::error::{Error, Result};
use crate::image::{Image, Region};

/// Lifecycle of the cached coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoefficientState {
    /// No input image has been set
    Uninitialized,
    /// Coefficients are missing or out of date with the input
    Stale,
    /// Coefficients match the input's buffered region and the spline order
    Ready,
}

/// B-spline interpolation over the buffered region of an image.
pub struct BSplineInterpolator<'a, P, const D: usize> {
    input: Option<&'a Image<P, D>>,
    decomposition: BSplineDecomposition,
    coefficients: Option<Image<f64, D>>,
    state: CoefficientState,
    /// Offsets of each point of the region of support relative to its
    /// first corner, one entry per point
    points_to_index: Vec<[usize; D]>,
}

impl<'a, P, const D: usize> BSplineInterpolator<'a, P, D>
where
    P: Copy + ToPrimitive,
{
    /// Build an interpolator with no input image.
    ///
    /// # Errors
    /// * If the spline order is not in `0..=5`
    pub fn new(order: usize) -> Result<Self> {
        let decomposition = BSplineDecomposition::new(order)?;
        Ok(Self {
            input: None,
            decomposition,
            coefficients: None,
            state: CoefficientState::Uninitialized,
            points_to_index: points_to_index::<D>(order),
        })
    }

    pub fn spline_order(&self) -> usize {
        self.decomposition.spline_order()
    }

    /// Change the spline order, invalidating cached coefficients.
    /// Setting the current order again does nothing.
    ///
    /// # Errors
    /// * If the spline order is not in `0..=5`, leaving the interpolator as
    ///   it was
    pub fn set_spline_order(&mut self, order: usize) -> Result<()> {
        if order == self.spline_order() {
            return Ok(());
        }
        self.decomposition.set_spline_order(order)?;
        self.points_to_index = points_to_index::<D>(order);
        self.invalidate();
        Ok(())
    }

    /// Set the image to interpolate.
    ///
    /// Passing the image already set keeps its coefficients. The image is
    /// borrowed for the interpolator's lifetime, so it cannot have changed.
    pub fn set_input_image(&mut self, image: &'a Image<P, D>) {
        let unchanged = self.input.is_some_and(|old| std::ptr::eq(old, image));
        self.input = Some(image);
        if !unchanged {
            self.invalidate();
        }
    }

    pub fn input_image(&self) -> Option<&'a Image<P, D>> {
        self.input
    }

    pub fn state(&self) -> CoefficientState {
        self.state
    }

    /// Coefficients from the last computation, if any.
    pub fn coefficients(&self) -> Option<&Image<f64, D>> {
        self.coefficients.as_ref()
    }

    /// Recompute coefficients if they are not ready.
    ///
    /// # Errors
    /// * If no input image has been set
    /// * If the input image has no samples
    pub fn compute_if_stale(&mut self) -> Result<()> {
        self.input.ok_or(Error::NoInputImage)?;
        if self.state != CoefficientState::Ready {
            self.update_coefficients_filter()?;
        }
        Ok(())
    }

    /// Recompute coefficients over the input's current buffered region.
    ///
    /// # Errors
    /// * If no input image has been set
    /// * If the input image has no samples
    pub fn update_coefficients_filter(&mut self) -> Result<()> {
        let input = self.input.ok_or(Error::NoInputImage)?;
        if input.region().num_pixels() == 0 {
            return Err(Error::DimensionMismatch(format!(
                "cannot interpolate over empty region {:?}",
                input.region().size
            )));
        }
        debug!(
            "Computing order {} coefficients over {:?}",
            self.spline_order(),
            input.region()
        );
        self.coefficients = Some(self.decomposition.compute(input));
        self.state = CoefficientState::Ready;
        Ok(())
    }

    /// Whether a continuous index lies on the input's buffered region.
    pub fn is_inside_buffer(&self, cindex: &[f64; D]) -> bool {
        self.input.is_some_and(|img| img.is_inside_buffer(cindex))
    }

    /// Interpolated value at a continuous index.
    ///
    /// # Errors
    /// * If no input image has been set
    pub fn evaluate_at_continuous_index(&mut self, cindex: &[f64; D]) -> Result<f64> {
        self.compute_if_stale()?;
        let coefs = self.coefficients.as_ref().ok_or(Error::NoInputImage)?;
        let order = self.spline_order();

        if order == 0 {
            return Ok(nearest(coefs, cindex));
        }

        let support = Support::new(coefs.region(), cindex, order);
        let mut weights = [[0.0; MAX_SUPPORT]; D];
        for j in 0..D {
            basis_weights(cindex[j], support.start[j], order, &mut weights[j]);
        }

        let data = coefs.data();
        let mut value = 0.0;
        for p in self.points_to_index.iter() {
            let mut w = 1.0;
            let mut flat = 0;
            for j in 0..D {
                w *= weights[j][p[j]];
                flat += support.index[j][p[j]];
            }
            value += w * data[flat];
        }

        Ok(value)
    }

    /// Gradient at a continuous index, in units of value per index step.
    ///
    /// # Errors
    /// * If no input image has been set
    pub fn evaluate_derivative_at_continuous_index(
        &mut self,
        cindex: &[f64; D],
    ) -> Result<[f64; D]> {
        Ok(self.evaluate_value_and_derivative(cindex)?.1)
    }

    /// Value and gradient at a continuous index, sharing one pass over the
    /// region of support.
    ///
    /// # Errors
    /// * If no input image has been set
    pub fn evaluate_value_and_derivative(&mut self, cindex: &[f64; D]) -> Result<(f64, [f64; D])> {
        self.compute_if_stale()?;
        let coefs = self.coefficients.as_ref().ok_or(Error::NoInputImage)?;
        let order = self.spline_order();

        // Piecewise constant: flat everywhere it is defined
        if order == 0 {
            return Ok((nearest(coefs, cindex), [0.0; D]));
        }

        let support = Support::new(coefs.region(), cindex, order);
        let mut weights = [[0.0; MAX_SUPPORT]; D];
        let mut dweights = [[0.0; MAX_SUPPORT]; D];
        for j in 0..D {
            basis_weights(cindex[j], support.start[j], order, &mut weights[j]);
            derivative_weights(cindex[j], support.start[j], order, &mut dweights[j]);
        }

        let data = coefs.data();
        let mut value = 0.0;
        let mut grad = [0.0; D];
        for p in self.points_to_index.iter() {
            let mut flat = 0;
            for j in 0..D {
                flat += support.index[j][p[j]];
            }
            let c = data[flat];

            let mut w = 1.0;
            for j in 0..D {
                w *= weights[j][p[j]];
            }
            value += w * c;

            for a in 0..D {
                let mut wd = 1.0;
                for j in 0..D {
                    wd *= if j == a {
                        dweights[j][p[j]]
                    } else {
                        weights[j][p[j]]
                    };
                }
                grad[a] += wd * c;
            }
        }

        Ok((value, grad))
    }

    /// Interpolated value at a physical point of the input image.
    ///
    /// # Errors
    /// * If no input image has been set
    pub fn evaluate(&mut self, point: &[f64; D]) -> Result<f64> {
        let cindex = self.continuous_index(point)?;
        self.evaluate_at_continuous_index(&cindex)
    }

    /// Gradient at a physical point, in units of value per unit length.
    ///
    /// # Errors
    /// * If no input image has been set
    pub fn evaluate_derivative(&mut self, point: &[f64; D]) -> Result<[f64; D]> {
        let cindex = self.continuous_index(point)?;
        let mut grad = self.evaluate_derivative_at_continuous_index(&cindex)?;
        let spacing = self.input.ok_or(Error::NoInputImage)?.spacing();
        for j in 0..D {
            grad[j] /= spacing[j];
        }
        Ok(grad)
    }

    fn continuous_index(&self, point: &[f64; D]) -> Result<[f64; D]> {
        let input = self.input.ok_or(Error::NoInputImage)?;
        Ok(input.transform_point_to_continuous_index(point))
    }

    fn invalidate(&mut self) {
        self.state = if self.input.is_some() {
            CoefficientState::Stale
        } else {
            CoefficientState::Uninitialized
        };
    }
}

/// Region of support of one continuous index, already mirror-folded into
/// the coefficient buffer and scaled by the buffer strides.
struct Support<const D: usize> {
    start: [i64; D],
    index: [[usize; MAX_SUPPORT]; D],
}

impl<const D: usize> Support<D> {
    #[inline]
    fn new(region: &Region<D>, cindex: &[f64; D], order: usize) -> Self {
        let strides = region.strides();
        let mut start = [0_i64; D];
        let mut index = [[0_usize; MAX_SUPPORT]; D];
        for j in 0..D {
            start[j] = support_start(cindex[j], order);
            let local = fold_period(start[j].saturating_sub(region.index[j]), region.size[j]);
            for k in 0..=order {
                index[j][k] = mirror_index(local + k as i64, region.size[j]) * strides[j];
            }
        }
        Self { start, index }
    }
}

/// Coefficient at the nearest grid point, mirror-folded into the buffer.
#[inline]
fn nearest<const D: usize>(coefs: &Image<f64, D>, cindex: &[f64; D]) -> f64 {
    let region = coefs.region();
    let strides = region.strides();
    let mut flat = 0;
    for j in 0..D {
        let i = ((cindex[j] + 0.5).floor() as i64).saturating_sub(region.index[j]);
        flat += mirror_index(i, region.size[j]) * strides[j];
    }
    coefs.data()[flat]
}

/// Per-axis offsets of every point in an `(order + 1)^D` region of support.
fn points_to_index<const D: usize>(order: usize) -> Vec<[usize; D]> {
    (0..D)
        .map(|_| 0..=order)
        .multi_cartesian_product()
        .map(|p| {
            let mut offsets = [0_usize; D];
            offsets.copy_from_slice(&p);
            offsets
        })
        .collect()
}

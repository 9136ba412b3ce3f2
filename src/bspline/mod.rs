//! B-spline decomposition and interpolation of N-dimensional images.
//!
//! Interpolating with B-splines of order `n` is a two-stage process:
//! 1. [`BSplineDecomposition`] inverts the sampling of the B-spline basis with a
//!    separable causal/anticausal recursive filter, turning samples into
//!    coefficients of the same extent.
//! 2. [`BSplineInterpolator`] evaluates the continuous spline (or its gradient)
//!    from the `(n + 1)^D` coefficients in the region of support of a point.
//!
//! Both stages extend the signal past its edges by whole-sample symmetric
//! reflection, so a sample at index `-1` mirrors index `1`.
//!
//! References
//! * M. Unser, "Splines: A Perfect Fit for Signal and Image Processing",
//!   IEEE Signal Processing Magazine, 1999.
//! * M. Unser, A. Aldroubi, M. Eden, "B-Spline Signal Processing: Part II",
//!   IEEE Transactions on Signal Processing, 1993.
use crate::error::{Error, Result};

pub mod decomposition;
pub mod interpolator;
pub mod mirror;
pub mod weights;

pub use decomposition::BSplineDecomposition;
pub use interpolator::{BSplineInterpolator, CoefficientState};
pub use mirror::{fold_period, mirror_index};

/// Highest supported spline order.
pub const MAX_SPLINE_ORDER: usize = 5;

/// Largest number of coefficients in the region of support along one axis.
pub const MAX_SUPPORT: usize = MAX_SPLINE_ORDER + 1;

/// Relative size below which a pole's geometric series is truncated when
/// initializing the causal recursion.
pub const TOLERANCE: f64 = 1e-10;

/// Check that a spline order is in the supported range.
///
/// # Errors
/// * If `order > 5`
#[inline]
pub fn check_order(order: usize) -> Result<usize> {
    if order > MAX_SPLINE_ORDER {
        return Err(Error::UnsupportedOrder(order));
    }
    Ok(order)
}

/// Number of grid points on each side of a sample that a spline of this order
/// touches, `ceil((order + 1) / 2)`.
#[inline]
pub fn support_half_width(order: usize) -> usize {
    (order + 2) / 2
}

/// The poles of the recursive filter for one spline order.
///
/// Orders 0 and 1 interpolate the samples directly and have no poles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Poles {
    count: usize,
    values: [f64; 2],
}

impl Poles {
    /// Look up the closed-form poles for a spline order.
    ///
    /// # Errors
    /// * If `order > 5`
    pub fn for_order(order: usize) -> Result<Self> {
        let (count, values) = match check_order(order)? {
            0 | 1 => (0, [0.0; 2]),
            2 => (1, [8.0_f64.sqrt() - 3.0, 0.0]),
            3 => (1, [3.0_f64.sqrt() - 2.0, 0.0]),
            4 => (
                2,
                [
                    (664.0 - 438976.0_f64.sqrt()).sqrt() + 304.0_f64.sqrt() - 19.0,
                    (664.0 + 438976.0_f64.sqrt()).sqrt() - 304.0_f64.sqrt() - 19.0,
                ],
            ),
            _ => (
                2,
                [
                    (135.0 / 2.0 - (17745.0_f64 / 4.0).sqrt()).sqrt() + (105.0_f64 / 4.0).sqrt()
                        - 13.0 / 2.0,
                    (135.0 / 2.0 + (17745.0_f64 / 4.0).sqrt()).sqrt()
                        - (105.0_f64 / 4.0).sqrt()
                        - 13.0 / 2.0,
                ],
            ),
        };
        Ok(Self { count, values })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.count]
    }

    /// Overall gain of the filter, `prod((1 - z) * (1 - 1 / z))`.
    pub fn gain(&self) -> f64 {
        self.as_slice()
            .iter()
            .fold(1.0, |acc, &z| acc * (1.0 - z) * (1.0 - 1.0 / z))
    }
}

//! Region of support and separable B-spline weights along one axis.
//!
//! For a continuous coordinate `x`, a spline of order `n` touches the `n + 1`
//! consecutive grid indices starting at [`support_start`]. The weight of the
//! `k`-th index is the B-spline basis function evaluated at the distance from
//! `x` to that index. Odd orders center the support on the cell containing `x`,
//! even orders on the nearest grid point.
//!
//! The derivative of a B-spline of order `n` is a difference of two B-splines
//! of order `n - 1` shifted by half a sample,
//! `B'_n(t) = B_{n-1}(t + 1/2) - B_{n-1}(t - 1/2)`,
//! which is how [`derivative_weights`] builds its weights.
use super::MAX_SUPPORT;

/// First grid index of the region of support of `x` along one axis.
#[inline]
pub fn support_start(x: f64, order: usize) -> i64 {
    let half_offset = if order & 1 == 1 { 0.0 } else { 0.5 };
    // Float-to-int casts saturate, so keep the subtraction saturating too
    ((x + half_offset).floor() as i64).saturating_sub((order / 2) as i64)
}

/// Fill `w[..=order]` with the basis weights of the `order + 1` grid points
/// starting at `start`. Entries past `order` are left untouched.
///
/// `start` must be `support_start(x, order)`.
#[inline]
pub fn basis_weights(x: f64, start: i64, order: usize, w: &mut [f64; MAX_SUPPORT]) {
    match order {
        0 => {
            w[0] = 1.0;
        }
        1 => {
            let t = x - start as f64;
            w[1] = t;
            w[0] = 1.0 - t;
        }
        2 => {
            let t = x - (start as f64 + 1.0);
            w[1] = 0.75 - t * t;
            w[2] = 0.5 * (t - w[1] + 1.0);
            w[0] = 1.0 - w[1] - w[2];
        }
        3 => {
            let t = x - (start as f64 + 1.0);
            w[3] = (1.0 / 6.0) * t * t * t;
            w[0] = (1.0 / 6.0) + 0.5 * t * (t - 1.0) - w[3];
            w[2] = t + w[0] - 2.0 * w[3];
            w[1] = 1.0 - w[0] - w[2] - w[3];
        }
        4 => {
            let t = x - (start as f64 + 2.0);
            let t2 = t * t;
            let s = (1.0 / 6.0) * t2;
            w[0] = 0.5 - t;
            w[0] *= w[0];
            w[0] *= (1.0 / 24.0) * w[0];
            let t0 = t * (s - 11.0 / 24.0);
            let t1 = 19.0 / 96.0 + t2 * (0.25 - s);
            w[1] = t1 + t0;
            w[3] = t1 - t0;
            w[4] = w[0] + t0 + 0.5 * t;
            w[2] = 1.0 - w[0] - w[1] - w[3] - w[4];
        }
        5 => {
            let mut t = x - (start as f64 + 2.0);
            let mut t2 = t * t;
            w[5] = (1.0 / 120.0) * t * t2 * t2;
            t2 -= t;
            let t4 = t2 * t2;
            t -= 0.5;
            let s = t2 * (t2 - 3.0);
            w[0] = (1.0 / 24.0) * (1.0 / 5.0 + t2 + t4) - w[5];
            let t0 = (1.0 / 24.0) * (t2 * (t2 - 5.0) + 46.0 / 5.0);
            let t1 = (-1.0 / 12.0) * t * (s + 4.0);
            w[2] = t0 + t1;
            w[3] = t0 - t1;
            let t0 = (1.0 / 16.0) * (9.0 / 5.0 - s);
            let t1 = (1.0 / 24.0) * t * (t4 - t2 - 5.0);
            w[1] = t0 + t1;
            w[4] = t0 - t1;
        }
        _ => unreachable!("spline order is validated on construction"),
    }
}

/// Fill `w[..=order]` with the weights of the first derivative of the spline
/// with respect to `x`, in index units, for the `order + 1` grid points
/// starting at `start`.
///
/// `start` must be `support_start(x, order)`.
#[inline]
pub fn derivative_weights(x: f64, start: i64, order: usize, w: &mut [f64; MAX_SUPPORT]) {
    match order {
        // Piecewise constant, flat almost everywhere
        0 => {
            w[0] = 0.0;
        }
        1 => {
            w[0] = -1.0;
            w[1] = 1.0;
        }
        2 => {
            let t = x + 0.5 - (start as f64 + 1.0);
            let w1 = 1.0 - t;
            w[0] = -w1;
            w[1] = w1 - t;
            w[2] = t;
        }
        3 => {
            let t = x + 0.5 - (start as f64 + 2.0);
            let w2 = 0.75 - t * t;
            let w3 = 0.5 * (t - w2 + 1.0);
            let w1 = 1.0 - w2 - w3;
            w[0] = -w1;
            w[1] = w1 - w2;
            w[2] = w2 - w3;
            w[3] = w3;
        }
        4 => {
            let t = x + 0.5 - (start as f64 + 2.0);
            let w4 = (1.0 / 6.0) * t * t * t;
            let w1 = (1.0 / 6.0) + 0.5 * t * (t - 1.0) - w4;
            let w3 = t + w1 - 2.0 * w4;
            let w2 = 1.0 - w1 - w3 - w4;
            w[0] = -w1;
            w[1] = w1 - w2;
            w[2] = w2 - w3;
            w[3] = w3 - w4;
            w[4] = w4;
        }
        5 => {
            let t = x + 0.5 - (start as f64 + 3.0);
            let t2 = t * t;
            let s = (1.0 / 6.0) * t2;
            let mut w1 = 0.5 - t;
            w1 *= w1;
            w1 *= (1.0 / 24.0) * w1;
            let t0 = t * (s - 11.0 / 24.0);
            let t1 = 19.0 / 96.0 + t2 * (0.25 - s);
            let w2 = t1 + t0;
            let w4 = t1 - t0;
            let w5 = w1 + t0 + 0.5 * t;
            let w3 = 1.0 - w1 - w2 - w4 - w5;
            w[0] = -w1;
            w[1] = w1 - w2;
            w[2] = w2 - w3;
            w[3] = w3 - w4;
            w[4] = w4 - w5;
            w[5] = w5;
        }
        _ => unreachable!("spline order is validated on construction"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::linspace;

    #[test]
    fn test_support_start() {
        // Odd orders start from the cell, even orders from the nearest point
        assert_eq!(support_start(2.3, 1), 2);
        assert_eq!(support_start(2.3, 3), 1);
        assert_eq!(support_start(2.3, 5), 0);
        assert_eq!(support_start(2.3, 0), 2);
        assert_eq!(support_start(2.7, 0), 3);
        assert_eq!(support_start(2.7, 2), 2);
        assert_eq!(support_start(2.3, 4), 0);
        assert_eq!(support_start(-0.2, 3), -2);
    }

    /// Basis weights form a partition of unity and reproduce the coordinate
    /// (first moment), for every order and fractional offset.
    #[test]
    fn test_partition_of_unity_and_first_moment() {
        for order in 0..=5 {
            for x in linspace(-3.0, 4.0, 57) {
                let start = support_start(x, order);
                let mut w = [0.0; MAX_SUPPORT];
                basis_weights(x, start, order, &mut w);
                let sum: f64 = w[..=order].iter().sum();
                assert!((sum - 1.0).abs() < 1e-12, "order {order}, x {x}");

                if order > 0 {
                    let moment: f64 = (0..=order).map(|k| w[k] * (start + k as i64) as f64).sum();
                    assert!((moment - x).abs() < 1e-12, "order {order}, x {x}");
                }
            }
        }
    }

    /// Derivative weights sum to zero (constants have no slope) and
    /// differentiate the identity to one.
    #[test]
    fn test_derivative_weights_moments() {
        for order in 1..=5 {
            for x in linspace(-3.0, 4.0, 57) {
                let start = support_start(x, order);
                let mut w = [0.0; MAX_SUPPORT];
                derivative_weights(x, start, order, &mut w);
                let sum: f64 = w[..=order].iter().sum();
                assert!(sum.abs() < 1e-12, "order {order}, x {x}");

                let slope: f64 = (0..=order).map(|k| w[k] * (start + k as i64) as f64).sum();
                assert!((slope - 1.0).abs() < 1e-12, "order {order}, x {x}");
            }
        }
    }

    #[test]
    fn test_cubic_weights_on_grid_point() {
        let mut w = [0.0; MAX_SUPPORT];
        basis_weights(5.0, support_start(5.0, 3), 3, &mut w);
        let expected = [1.0 / 6.0, 4.0 / 6.0, 1.0 / 6.0, 0.0];
        for k in 0..4 {
            assert!((w[k] - expected[k]).abs() < 1e-15);
        }
    }

    /// Derivative weights agree with a central finite difference of the
    /// basis weights.
    #[test]
    fn test_derivative_weights_match_finite_difference() {
        let h = 1e-6;
        for order in 1..=5 {
            // Stay away from knots, where lower orders have kinks
            for x in [0.23, 0.61, 1.37, 2.88] {
                let start = support_start(x, order);
                assert_eq!(start, support_start(x + h, order));
                assert_eq!(start, support_start(x - h, order));

                let (mut wp, mut wm, mut wd) =
                    ([0.0; MAX_SUPPORT], [0.0; MAX_SUPPORT], [0.0; MAX_SUPPORT]);
                basis_weights(x + h, start, order, &mut wp);
                basis_weights(x - h, start, order, &mut wm);
                derivative_weights(x, start, order, &mut wd);
                for k in 0..=order {
                    let fd = (wp[k] - wm[k]) / (2.0 * h);
                    assert!((fd - wd[k]).abs() < 1e-6, "order {order}, x {x}, k {k}");
                }
            }
        }
    }
}

//! Convenience methods for constructing grids of sample locations.
use itertools::Itertools;
use num_traits::Float;

use crate::image::Region;

/// Generates evenly spaced values from start to stop,
/// including the endpoint. A single value is just `start`.
pub fn linspace<T>(start: T, stop: T, n: usize) -> Vec<T>
where
    T: Float,
{
    if n < 2 {
        return vec![start; n];
    }
    let steps = T::from(n - 1).unwrap_or_else(T::nan);
    let dx: T = (stop - start) / steps;
    (0..n)
        .map(|i| start + T::from(i).unwrap_or_else(T::nan) * dx)
        .collect()
}

/// Generates a meshgrid in C ordering (x0, y0, z0, x0, y0, z1, ..., x0, yn, zn)
pub fn meshgrid<T>(x: Vec<&Vec<T>>) -> Vec<Vec<T>>
where
    T: Float,
{
    x.into_iter()
        .multi_cartesian_product()
        .map(|xx| xx.iter().map(|y| **y).collect())
        .collect()
}

/// Every integer index of a region, in buffer order (axis 0 fastest).
pub fn region_indices<const D: usize>(region: &Region<D>) -> Vec<[i64; D]> {
    if D == 0 || region.num_pixels() == 0 {
        return Vec::new();
    }
    // The cartesian product varies its last factor fastest, so walk the
    // axes in reverse and flip each tuple back.
    (0..D)
        .rev()
        .map(|i| region.index[i]..region.index[i] + region.size[i] as i64)
        .multi_cartesian_product()
        .map(|rev| {
            let mut index = [0_i64; D];
            for (i, v) in rev.into_iter().rev().enumerate() {
                index[i] = v;
            }
            index
        })
        .collect()
}

//! Whole-sample symmetric extension of index space.
//!
//! An axis of length `n` is extended by reflecting about samples `0` and
//! `n - 1` without repeating them, which makes the extended signal periodic
//! with period `2n - 2`:
//!
//! ```text
//! index:  -3 -2 -1  0  1  2  3  4  5  6
//! n = 4:   3  2  1  0  1  2  3  2  1  0
//! ```

/// Fold an index into `0..len` by mirror reflection.
///
/// Any index, however far outside the axis, folds in one step. An axis of
/// length one maps every index to zero. `len` must be nonzero.
#[inline]
pub fn mirror_index(i: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * len as i64 - 2;
    let r = i.rem_euclid(period);
    if r < len as i64 {
        r as usize
    } else {
        (period - r) as usize
    }
}

/// Reduce an index into one mirror period, `0..2 * len - 2`, without
/// changing where it folds to. Offsets up to `len` can then be added to the
/// result without overflow, however extreme the original index.
#[inline]
pub fn fold_period(i: i64, len: usize) -> i64 {
    if len == 1 {
        return 0;
    }
    i.rem_euclid(2 * len as i64 - 2)
}

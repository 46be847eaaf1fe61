//! Run-length-encoded segment sums.
//!
//! Pixels are pre-grouped by bin (`BinIndices`), so each output bin is the sum
//! of one contiguous run of the permuted pixel list. Every row of a block is
//! reduced independently; no worker ever writes into shared state.

use super::bins::BinIndices;
use crate::element::Element;
use ndarray::{Array2, ArrayView2, Axis};

/// Sum the pixels of every bin for each row of `values` (`items x pixels`).
///
/// Returns an `items x num_bins` array.
pub fn sum_run_length_encoded<T: Element>(
    values: ArrayView2<'_, T>,
    indices: &BinIndices,
) -> Array2<T> {
    let items = values.len_of(Axis(0));
    let num_bins = indices.num_bins();
    let order = indices.order();
    let offsets = indices.offsets();
    let mut out = Array2::from_elem((items, num_bins), T::zero());
    for (row, mut sums) in values.outer_iter().zip(out.outer_iter_mut()) {
        for (b, slot) in sums.iter_mut().enumerate() {
            let mut acc = T::zero();
            for &pixel in &order[offsets[b]..offsets[b + 1]] {
                acc = acc + row[pixel];
            }
            *slot = acc;
        }
    }
    out
}

/// Sum the pixels listed in `positions` for each row of `values`.
pub fn sum_positions<T: Element>(values: ArrayView2<'_, T>, positions: &[usize]) -> Vec<T> {
    values
        .outer_iter()
        .map(|row| positions.iter().fold(T::zero(), |acc, &p| acc + row[p]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_sums_match_scatter_add() {
        let assignment = vec![Some(2), Some(0), None, Some(2), Some(1), Some(0)];
        let indices = BinIndices::from_assignment(&assignment, 3);
        let values = Array2::from_shape_fn((2, 6), |(i, j)| (i * 10 + j) as f64);
        let sums = sum_run_length_encoded(values.view(), &indices);

        let mut expected = Array2::<f64>::zeros((2, 3));
        for i in 0..2 {
            for (j, bin) in assignment.iter().enumerate() {
                if let Some(b) = bin {
                    expected[[i, *b]] += values[[i, j]];
                }
            }
        }
        assert_eq!(sums, expected);
    }

    #[test]
    fn empty_bins_sum_to_zero() {
        let indices = BinIndices::from_assignment(&[Some(0), Some(0)], 2);
        let values = Array2::from_elem((1, 2), 1.5);
        let sums = sum_run_length_encoded(values.view(), &indices);
        assert_eq!(sums[[0, 0]], 3.0);
        assert_eq!(sums[[0, 1]], 0.0);
        assert_eq!(sum_positions(values.view(), &[1]), vec![1.5]);
    }
}

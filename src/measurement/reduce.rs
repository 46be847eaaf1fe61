//! Joint reductions over a set of array dimensions.

use crate::element::Element;
use crate::lazy::reshape;
use ndarray::{ArrayD, Axis, IxDyn};

/// Statistic collapsing the reduced dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    Mean,
    Sum,
    /// Population standard deviation; complex inputs give a real-valued result.
    Std,
}

/// Collapse `axes` (sorted, unique, in range) of `array` with `reduction`.
pub(crate) fn reduce_axes<T: Element>(array: &ArrayD<T>, axes: &[usize], reduction: Reduction) -> ArrayD<T> {
    if axes.is_empty() {
        return array.clone();
    }
    let shape = array.shape();
    let kept: Vec<usize> = (0..shape.len()).filter(|a| !axes.contains(a)).collect();
    let mut order = axes.to_vec();
    order.extend(kept.iter().copied());

    let n: usize = axes.iter().map(|&a| shape[a]).product();
    let out_shape: Vec<usize> = kept.iter().map(|&a| shape[a]).collect();
    let m: usize = out_shape.iter().product();

    let permuted = array.view().permuted_axes(IxDyn(&order)).to_owned();
    let flat = reshape(permuted, &[n, m]);

    let count = n as f64;
    let columns = flat.lanes(Axis(0));
    let values: Vec<T> = columns
        .into_iter()
        .map(|column| {
            let total = column.iter().fold(T::zero(), |acc, &v| acc + v);
            match reduction {
                Reduction::Sum => total,
                Reduction::Mean => total / count,
                Reduction::Std => {
                    let mean = total / count;
                    let spread: f64 = column.iter().map(|&v| (v - mean).norm_sqr()).sum();
                    T::from_real((spread / count).sqrt())
                }
            }
        })
        .collect();
    reshape(
        ArrayD::from_shape_vec(IxDyn(&[m]), values).expect("one value per kept element"),
        &out_shape,
    )
}

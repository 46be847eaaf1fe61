//! CPU FFT helpers over the last two dimensions of a slice.
//!
//! Forward transforms are unnormalised; inverse transforms scale by
//! `1 / (n0 * n1)`. Frequencies follow the usual `fftfreq` ordering.

use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FftDirection {
    Forward,
    Inverse,
}

/// Sample frequencies of an `n`-point transform with spacing `d`, in
/// unshifted order: `[0, 1, ..., ceil(n/2)-1, -floor(n/2), ..., -1] / (n d)`.
pub fn fftfreq(n: usize, d: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * d);
    (0..n).map(|i| signed_frequency_index(i, n) as f64 * scale).collect()
}

/// Integer frequency of position `i` in unshifted order.
#[inline]
pub fn signed_frequency_index(i: usize, n: usize) -> isize {
    if i < n.div_ceil(2) {
        i as isize
    } else {
        i as isize - n as isize
    }
}

/// Integer frequency of position `i` when the zero frequency sits at `n / 2`.
#[inline]
pub fn shifted_frequency_index(i: usize, n: usize) -> isize {
    i as isize - (n / 2) as isize
}

fn transform_lanes(array: &mut Array2<Complex64>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let mut buffer = Vec::with_capacity(array.len_of(axis));
    for mut lane in array.lanes_mut(axis) {
        buffer.clear();
        buffer.extend(lane.iter().copied());
        fft.process(&mut buffer);
        for (dst, src) in lane.iter_mut().zip(&buffer) {
            *dst = *src;
        }
    }
}

/// Row and column plans for one slice shape, in both directions.
///
/// Plans are read-only after construction, so one instance serves every
/// slice of a measurement across worker threads.
#[derive(Clone)]
pub struct Fft2Plan {
    shape: (usize, usize),
    forward: [Arc<dyn Fft<f64>>; 2],
    inverse: [Arc<dyn Fft<f64>>; 2],
}

impl Fft2Plan {
    pub fn new(shape: (usize, usize)) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let (n0, n1) = (shape.0.max(1), shape.1.max(1));
        Self {
            shape,
            forward: [planner.plan_fft_forward(n0), planner.plan_fft_forward(n1)],
            inverse: [planner.plan_fft_inverse(n0), planner.plan_fft_inverse(n1)],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Two-dimensional transform in place. `array` must have the planned shape.
    pub fn process(&self, array: &mut Array2<Complex64>, direction: FftDirection) {
        debug_assert_eq!(array.dim(), self.shape, "slice shape differs from the plan");
        let (n0, n1) = self.shape;
        if n0 == 0 || n1 == 0 {
            return;
        }
        let [plan0, plan1] = match direction {
            FftDirection::Forward => &self.forward,
            FftDirection::Inverse => &self.inverse,
        };
        transform_lanes(array, Axis(1), plan1);
        transform_lanes(array, Axis(0), plan0);
        if direction == FftDirection::Inverse {
            let scale = 1.0 / (n0 * n1) as f64;
            array.mapv_inplace(|v| v * scale);
        }
    }
}

/// Two-dimensional transform in place with freshly built plans.
pub fn fft2(array: &mut Array2<Complex64>, direction: FftDirection) {
    Fft2Plan::new(array.dim()).process(array, direction);
}

/// Map kept frequencies of an `old`-point axis onto a `new`-point axis.
///
/// Returns `(old_index, new_index)` pairs for the `min(old, new)` lowest
/// frequencies.
fn crop_pairs(old: usize, new: usize) -> Vec<(usize, usize)> {
    let kept = old.min(new);
    let positive = kept.div_ceil(2);
    let negative = kept / 2;
    let mut pairs: Vec<(usize, usize)> = (0..positive).map(|k| (k, k)).collect();
    pairs.extend((1..=negative).map(|j| (old - j, new - j)));
    pairs
}

/// Zero-pad or crop a spectrum to `new_shape`, keeping the lowest
/// frequencies.
pub fn fft_crop(spectrum: &Array2<Complex64>, new_shape: (usize, usize)) -> Array2<Complex64> {
    let (n0, n1) = spectrum.dim();
    let mut out = Array2::zeros(new_shape);
    let rows = crop_pairs(n0, new_shape.0);
    let cols = crop_pairs(n1, new_shape.1);
    for &(r_old, r_new) in &rows {
        for &(c_old, c_new) in &cols {
            out[[r_new, c_new]] = spectrum[[r_old, c_old]];
        }
    }
    out
}

/// Resizes periodic slices of one shape by Fourier zero-padding or
/// cropping. Values are preserved: a constant slice stays the same constant.
#[derive(Clone)]
pub struct FourierResampler {
    source: Fft2Plan,
    target: Fft2Plan,
}

impl FourierResampler {
    pub fn new(source_shape: (usize, usize), target_shape: (usize, usize)) -> Self {
        Self {
            source: Fft2Plan::new(source_shape),
            target: Fft2Plan::new(target_shape),
        }
    }

    pub fn resample(&self, slice: ArrayView2<'_, Complex64>) -> Array2<Complex64> {
        let (n0, n1) = slice.dim();
        let new_shape = self.target.shape();
        if (n0, n1) == new_shape {
            return slice.to_owned();
        }
        let mut spectrum = slice.to_owned();
        self.source.process(&mut spectrum, FftDirection::Forward);
        let mut resized = fft_crop(&spectrum, new_shape);
        self.target.process(&mut resized, FftDirection::Inverse);
        let old_size = (n0 * n1).max(1) as f64;
        let new_size = (new_shape.0 * new_shape.1) as f64;
        resized.mapv_inplace(|v| v * (new_size / old_size));
        resized
    }
}

/// Resize a single periodic slice; see [`FourierResampler`].
pub fn fft2_interpolate(slice: ArrayView2<'_, Complex64>, new_shape: (usize, usize)) -> Array2<Complex64> {
    FourierResampler::new(slice.dim(), new_shape).resample(slice)
}

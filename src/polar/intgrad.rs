//! Frequency-domain inverse gradient.
//!
//! Recovers a periodic scalar field `T` from its gradient `(gx, gy)` through
//! `T^ = (gx^ kx + gy^ ky) / (2 pi i (kx^2 + ky^2))`. The zero frequency is
//! regularised to `1e-12`; the result is shifted so its minimum is zero.

use crate::fft::{fftfreq, Fft2Plan, FftDirection};
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use std::f64::consts::TAU;

const ZERO_FREQUENCY: f64 = 1e-12;

/// `plan` must match the shape of `gx` and `gy`.
pub fn intgrad2d(
    gx: ArrayView2<'_, f64>,
    gy: ArrayView2<'_, f64>,
    sampling: (f64, f64),
    plan: &Fft2Plan,
) -> Array2<f64> {
    let (nx, ny) = gx.dim();
    if nx == 0 || ny == 0 {
        return Array2::zeros((nx, ny));
    }
    let kx = fftfreq(nx, sampling.0);
    let ky = fftfreq(ny, sampling.1);

    let mut fx = gx.mapv(|v| Complex64::new(v, 0.0));
    let mut fy = gy.mapv(|v| Complex64::new(v, 0.0));
    plan.process(&mut fx, FftDirection::Forward);
    plan.process(&mut fy, FftDirection::Forward);

    let denominator_scale = Complex64::new(0.0, TAU);
    let mut spectrum = Array2::from_shape_fn((nx, ny), |(i, j)| {
        let mut k2 = kx[i] * kx[i] + ky[j] * ky[j];
        if k2 == 0.0 {
            k2 = ZERO_FREQUENCY;
        }
        (fx[[i, j]] * kx[i] + fy[[i, j]] * ky[j]) / (denominator_scale * k2)
    });
    plan.process(&mut spectrum, FftDirection::Inverse);

    let field = spectrum.mapv(|v| v.re);
    let min = field.iter().copied().fold(f64::INFINITY, f64::min);
    field.mapv(|v| v - min)
}

//! Separable smoothing filters with explicit boundary handling.

use crate::element::Element;
use crate::error::{MeasurementError, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Trait implemented by separable 1D filters. Taps are listed left to right
/// and centred on the middle tap, so their count must be odd.
pub trait SeparableFilter {
    fn taps(&self) -> &[f64];

    fn radius(&self) -> usize {
        self.taps().len() / 2
    }
}

/// How samples beyond the slice edge are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Wrap around (`... c d | a b c d | a b ...`).
    #[default]
    Periodic,
    /// Mirror about the edge (`... b a | a b c d | d c ...`).
    Reflect,
    /// Repeat the edge sample.
    Nearest,
    /// Fill with a constant.
    Constant(f64),
}

impl Boundary {
    /// Parse a boundary name; `"constant"` fills with zero.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "periodic" | "wrap" => Ok(Boundary::Periodic),
            "reflect" => Ok(Boundary::Reflect),
            "nearest" => Ok(Boundary::Nearest),
            "constant" => Ok(Boundary::Constant(0.0)),
            other => Err(MeasurementError::Configuration(format!(
                "unknown boundary mode '{other}'"
            ))),
        }
    }

    /// Source position for a possibly out-of-range index, `None` for constant fill.
    #[inline]
    pub fn source_index(&self, index: isize, n: usize) -> Option<usize> {
        let len = n as isize;
        if (0..len).contains(&index) {
            return Some(index as usize);
        }
        match self {
            Boundary::Periodic => Some(index.rem_euclid(len) as usize),
            Boundary::Reflect => {
                let m = index.rem_euclid(2 * len);
                let mirrored = if m >= len { 2 * len - 1 - m } else { m };
                Some(mirrored as usize)
            }
            Boundary::Nearest => Some(index.clamp(0, len - 1) as usize),
            Boundary::Constant(_) => None,
        }
    }
}

/// Normalised sampled Gaussian.
#[derive(Clone, Debug)]
pub struct GaussianFilter {
    taps: Vec<f64>,
}

impl GaussianFilter {
    /// Gaussian of width `sigma` (pixels) truncated at `radius` taps each side.
    /// `sigma <= 0` yields the identity filter.
    pub fn new(sigma: f64, radius: usize) -> Self {
        if sigma <= 0.0 {
            return Self { taps: vec![1.0] };
        }
        let r = radius as isize;
        let mut taps: Vec<f64> = (-r..=r)
            .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
            .collect();
        let total: f64 = taps.iter().sum();
        for t in &mut taps {
            *t /= total;
        }
        Self { taps }
    }
}

impl SeparableFilter for GaussianFilter {
    #[inline]
    fn taps(&self) -> &[f64] {
        &self.taps
    }
}

/// Kernel radius shared by both axes: `ceil(4 * max(sigma))`.
pub fn gaussian_radius(sigma: (f64, f64)) -> usize {
    (4.0 * sigma.0.max(sigma.1)).ceil().max(0.0) as usize
}

fn convolve_axis<T: Element, F: SeparableFilter>(
    input: ArrayView2<'_, T>,
    filter: &F,
    axis: Axis,
    boundary: Boundary,
) -> Array2<T> {
    let taps = filter.taps();
    let radius = filter.radius() as isize;
    let fill = match boundary {
        Boundary::Constant(c) => T::from_real(c),
        _ => T::zero(),
    };
    let n = input.len_of(axis);
    let mut out = Array2::from_elem(input.dim(), T::zero());
    for (src, mut dst) in input.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        for (i, value) in dst.iter_mut().enumerate() {
            let mut acc = T::zero();
            for (k, &w) in taps.iter().enumerate() {
                let j = i as isize + k as isize - radius;
                let sample = match boundary.source_index(j, n) {
                    Some(j) => src[j],
                    None => fill,
                };
                acc = acc + sample * w;
            }
            *value = acc;
        }
    }
    out
}

/// Filter rows with `filter0` along axis 0 and `filter1` along axis 1.
pub fn apply_separable<T: Element, F: SeparableFilter>(
    slice: ArrayView2<'_, T>,
    filter0: &F,
    filter1: &F,
    boundary: Boundary,
) -> Array2<T> {
    if slice.is_empty() {
        return slice.to_owned();
    }
    let tmp = convolve_axis(slice, filter0, Axis(0), boundary);
    convolve_axis(tmp.view(), filter1, Axis(1), boundary)
}

//! Bilinear resampling of a Fourier-space grid onto a new angular sampling.
//!
//! For each target frequency the bracketing pair of source frequencies is
//! found; the lower one is the node and the fractional distance to it is the
//! weight of the upper neighbour. Nodes are returned as array positions, so
//! grids stored with or without `fftshift` resample the same way.

use crate::element::Element;
use crate::error::{MeasurementError, Result};
use crate::polar::bins::angular_coordinate;
use ndarray::{Array2, ArrayView2};
use std::str::FromStr;

/// Supported resampling targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResampleMode {
    /// Both axes resampled to the coarser of the two samplings.
    Uniform,
}

impl ResampleMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "uniform" => Ok(ResampleMode::Uniform),
            other => Err(MeasurementError::UnsupportedMode(format!(
                "resampling mode '{other}' is not implemented"
            ))),
        }
    }
}

impl FromStr for ResampleMode {
    type Err = MeasurementError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Target grid and sampling for `mode`.
///
/// Each axis is scaled by `d_i / max(d)` and rounded up; sizes that end up
/// within two pixels of each other are snapped to the smaller one.
pub fn resampled_gpts(
    mode: ResampleMode,
    gpts: (usize, usize),
    sampling: (f64, f64),
) -> ((usize, usize), (f64, f64)) {
    match mode {
        ResampleMode::Uniform => {
            let coarse = sampling.0.max(sampling.1);
            let scale = (sampling.0 / coarse, sampling.1 / coarse);
            let mut new_gpts = (
                (gpts.0 as f64 * scale.0).ceil() as usize,
                (gpts.1 as f64 * scale.1).ceil() as usize,
            );
            if new_gpts.0.abs_diff(new_gpts.1) <= 2 {
                let m = new_gpts.0.min(new_gpts.1);
                new_gpts = (m, m);
            }
            (new_gpts, (sampling.0 / scale.0, sampling.1 / scale.1))
        }
    }
}

/// Interpolation nodes along one axis.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisNodes {
    pub lower: Vec<usize>,
    pub upper: Vec<usize>,
    /// Weight of `upper`; `lower` carries `1 - weight`.
    pub weight: Vec<f64>,
}

/// Array position of sorted (ascending-frequency) index `s`.
#[inline]
fn sorted_to_position(s: usize, n: usize, fftshift: bool) -> usize {
    if fftshift {
        s
    } else {
        (s + n - n / 2) % n
    }
}

/// Nodes mapping an `old_n`-point axis sampled at `old_d` onto `new_n`
/// points sampled at `new_d`.
pub fn bilinear_nodes_and_weights(
    old_n: usize,
    new_n: usize,
    old_d: f64,
    new_d: f64,
    fftshift: bool,
) -> AxisNodes {
    let mut nodes = AxisNodes {
        lower: Vec::with_capacity(new_n),
        upper: Vec::with_capacity(new_n),
        weight: Vec::with_capacity(new_n),
    };
    let half = (old_n / 2) as f64;
    for j in 0..new_n {
        let k = angular_coordinate(j, new_n, new_d, fftshift);
        let position = k / old_d + half;
        let (s, w) = if position <= 0.0 {
            (0, 0.0)
        } else {
            let s = (position + 1e-9).floor() as usize;
            if s + 1 >= old_n {
                (old_n - 1, 0.0)
            } else {
                (s, (position - s as f64).clamp(0.0, 1.0))
            }
        };
        let upper = (s + 1).min(old_n - 1);
        nodes.lower.push(sorted_to_position(s, old_n, fftshift));
        nodes.upper.push(sorted_to_position(upper, old_n, fftshift));
        nodes.weight.push(w);
    }
    nodes
}

/// Resample one slice with separable bilinear weights.
pub fn interpolate_bilinear<T: Element>(
    slice: ArrayView2<'_, T>,
    rows: &AxisNodes,
    cols: &AxisNodes,
) -> Array2<T> {
    Array2::from_shape_fn((rows.lower.len(), cols.lower.len()), |(i, j)| {
        let (v0, v1, vw) = (rows.lower[i], rows.upper[i], rows.weight[i]);
        let (u0, u1, uw) = (cols.lower[j], cols.upper[j], cols.weight[j]);
        slice[[v0, u0]] * ((1.0 - vw) * (1.0 - uw))
            + slice[[v1, u0]] * (vw * (1.0 - uw))
            + slice[[v0, u1]] * ((1.0 - vw) * uw)
            + slice[[v1, u1]] * (vw * uw)
    })
}

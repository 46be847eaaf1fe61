//! Pixel to polar-bin assignment on a Fourier-space grid.
//!
//! Every pixel gets a flat bin `radial * nbins_azimuthal + azimuthal`, or no
//! bin when its radius falls outside `[inner, outer)`. The assignment is then
//! inverted into `BinIndices`: pixel positions grouped by bin with cumulative
//! offsets, the layout consumed by the segment sum in `rle`.

use crate::error::{MeasurementError, Result};
use crate::fft::{shifted_frequency_index, signed_frequency_index};
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Annular/sector layout of a polar detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolarLayout {
    pub nbins_radial: usize,
    pub nbins_azimuthal: usize,
    /// Inner radius (inclusive), in the grid's angular units.
    pub inner: f64,
    /// Outer radius (exclusive).
    pub outer: f64,
    /// Azimuthal origin in radians.
    #[serde(default)]
    pub rotation: f64,
}

impl PolarLayout {
    pub fn new(nbins_radial: usize, nbins_azimuthal: usize, inner: f64, outer: f64) -> Self {
        Self {
            nbins_radial,
            nbins_azimuthal,
            inner,
            outer,
            rotation: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.nbins_radial == 0 || self.nbins_azimuthal == 0 {
            return Err(MeasurementError::Configuration(format!(
                "polar binning needs at least one bin per axis, got {}x{}",
                self.nbins_radial, self.nbins_azimuthal
            )));
        }
        if self.outer.is_nan() || self.outer <= self.inner || self.inner < 0.0 {
            return Err(MeasurementError::Configuration(format!(
                "invalid annulus [{}, {})",
                self.inner, self.outer
            )));
        }
        Ok(())
    }

    pub fn num_bins(&self) -> usize {
        self.nbins_radial * self.nbins_azimuthal
    }

    pub fn radial_step(&self) -> f64 {
        (self.outer - self.inner) / self.nbins_radial as f64
    }

    pub fn azimuthal_step(&self) -> f64 {
        TAU / self.nbins_azimuthal as f64
    }

    /// Flat bin of the point `(alpha_x, alpha_y)`.
    pub fn bin_of(&self, alpha_x: f64, alpha_y: f64) -> Option<usize> {
        let r = alpha_x.hypot(alpha_y);
        if r < self.inner || r >= self.outer {
            return None;
        }
        let radial = (((r - self.inner) / self.radial_step()).floor() as usize)
            .min(self.nbins_radial - 1);
        let theta = (alpha_y.atan2(alpha_x) - self.rotation).rem_euclid(TAU);
        let azimuthal =
            ((theta / self.azimuthal_step()).floor() as usize).min(self.nbins_azimuthal - 1);
        Some(radial * self.nbins_azimuthal + azimuthal)
    }
}

/// Angle of position `i` along an `n`-pixel Fourier axis with sampling `d`.
#[inline]
pub fn angular_coordinate(i: usize, n: usize, d: f64, fftshift: bool) -> f64 {
    let k = if fftshift {
        shifted_frequency_index(i, n)
    } else {
        signed_frequency_index(i, n)
    };
    k as f64 * d
}

/// Angles of every position along one axis, in array order.
pub fn angular_coordinates(n: usize, d: f64, fftshift: bool) -> Vec<f64> {
    (0..n).map(|i| angular_coordinate(i, n, d, fftshift)).collect()
}

/// Per-pixel flat bin (row-major), `None` outside the annulus.
pub fn polar_detector_bins(
    gpts: (usize, usize),
    sampling: (f64, f64),
    layout: &PolarLayout,
    fftshift: bool,
) -> Vec<Option<usize>> {
    let ax = angular_coordinates(gpts.0, sampling.0, fftshift);
    let ay = angular_coordinates(gpts.1, sampling.1, fftshift);
    let mut bins = Vec::with_capacity(gpts.0 * gpts.1);
    for &x in &ax {
        for &y in &ay {
            bins.push(layout.bin_of(x, y));
        }
    }
    bins
}

/// Pixel positions grouped by bin.
///
/// `order[offsets[b]..offsets[b + 1]]` lists the flat pixel positions of
/// bin `b` in increasing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinIndices {
    order: Vec<usize>,
    offsets: Vec<usize>,
}

impl BinIndices {
    pub fn from_assignment(assignment: &[Option<usize>], num_bins: usize) -> Self {
        let mut counts = vec![0usize; num_bins];
        for bin in assignment.iter().flatten() {
            counts[*bin] += 1;
        }
        let mut offsets = Vec::with_capacity(num_bins + 1);
        offsets.push(0);
        for c in &counts {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + c);
        }
        let mut cursor = offsets[..num_bins].to_vec();
        let mut order = vec![0usize; offsets[num_bins]];
        for (pixel, bin) in assignment.iter().enumerate() {
            if let Some(b) = bin {
                order[cursor[*b]] = pixel;
                cursor[*b] += 1;
            }
        }
        Self { order, offsets }
    }

    /// Validate the layout and assign every pixel of the grid.
    pub fn build(
        gpts: (usize, usize),
        sampling: (f64, f64),
        layout: &PolarLayout,
        fftshift: bool,
    ) -> Result<Self> {
        layout.validate()?;
        let assignment = polar_detector_bins(gpts, sampling, layout, fftshift);
        let indices = Self::from_assignment(&assignment, layout.num_bins());
        debug!(
            "polar bins: {}x{} over {}x{} pixels, {} pixels binned",
            layout.nbins_radial,
            layout.nbins_azimuthal,
            gpts.0,
            gpts.1,
            indices.order.len()
        );
        Ok(indices)
    }

    pub fn num_bins(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn bin(&self, b: usize) -> &[usize] {
        &self.order[self.offsets[b]..self.offsets[b + 1]]
    }

    pub fn count(&self, b: usize) -> usize {
        self.offsets[b + 1] - self.offsets[b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_and_unshifted_coordinates() {
        assert_eq!(angular_coordinates(4, 1.0, true), vec![-2.0, -1.0, 0.0, 1.0]);
        assert_eq!(angular_coordinates(4, 1.0, false), vec![0.0, 1.0, -2.0, -1.0]);
        assert_eq!(angular_coordinates(5, 2.0, true), vec![-4.0, -2.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn annulus_excludes_outer_edge() {
        let layout = PolarLayout::new(2, 1, 1.0, 3.0);
        assert_eq!(layout.bin_of(0.5, 0.0), None);
        assert_eq!(layout.bin_of(1.0, 0.0), Some(0));
        assert_eq!(layout.bin_of(2.5, 0.0), Some(1));
        assert_eq!(layout.bin_of(3.0, 0.0), None);
    }

    #[test]
    fn azimuthal_bins_follow_rotation() {
        let layout = PolarLayout::new(1, 4, 0.0, 10.0);
        assert_eq!(layout.bin_of(1.0, 0.1), Some(0));
        assert_eq!(layout.bin_of(-0.1, 1.0), Some(1));
        assert_eq!(layout.bin_of(-1.0, -0.1), Some(2));
        assert_eq!(layout.bin_of(0.1, -1.0), Some(3));
        let rotated = layout.with_rotation(std::f64::consts::FRAC_PI_2);
        assert_eq!(rotated.bin_of(1.0, 0.1), Some(3));
    }

    #[test]
    fn indices_group_pixels_by_bin() {
        let assignment = vec![Some(1), None, Some(0), Some(1), Some(2)];
        let idx = BinIndices::from_assignment(&assignment, 3);
        assert_eq!(idx.offsets(), &[0, 1, 3, 4]);
        assert_eq!(idx.bin(1), &[0, 3]);
        assert_eq!(idx.bin(2), &[4]);
        assert_eq!(idx.count(0), 1);
    }

    #[test]
    fn invalid_layouts_fail() {
        assert!(PolarLayout::new(0, 1, 0.0, 1.0).validate().is_err());
        assert!(PolarLayout::new(1, 1, 2.0, 1.0).validate().is_err());
    }
}

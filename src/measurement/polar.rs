//! Polar measurements: radial x azimuthal bins of a diffraction pattern.

use super::{pixel_kernel, BaseGrid, Images, Measurement, MeasurementTag};
use crate::axes::{AxisMetadata, HasAxes};
use crate::element::Element;
use crate::error::{MeasurementError, Result};
use crate::polar::sum_positions;
use log::debug;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolarGrid {
    /// Ring width in mrad.
    pub radial_sampling: f64,
    /// Sector width in radians.
    pub azimuthal_sampling: f64,
    /// Inner angle of the first ring.
    pub radial_offset: f64,
    /// Starting angle of the first sector.
    pub azimuthal_offset: f64,
}

impl BaseGrid for PolarGrid {
    const TAG: MeasurementTag = MeasurementTag::PolarMeasurements;
    const NUM_BASE_AXES: usize = 2;

    fn base_axes_metadata(&self, _base_shape: &[usize]) -> Vec<AxisMetadata> {
        vec![
            AxisMetadata::linear("Radial scattering angle", self.radial_sampling, "mrad")
                .with_offset(self.radial_offset),
            AxisMetadata::linear("Azimuthal scattering angle", self.azimuthal_sampling, "rad")
                .with_offset(self.azimuthal_offset),
        ]
    }

    fn validate(&self, _base_shape: &[usize]) -> Result<()> {
        if self.radial_sampling > 0.0 && self.azimuthal_sampling > 0.0 {
            Ok(())
        } else {
            Err(MeasurementError::Configuration(format!(
                "polar sampling must be positive, got {} x {}",
                self.radial_sampling, self.azimuthal_sampling
            )))
        }
    }
}

pub type PolarMeasurements<T = f64> = Measurement<PolarGrid, T>;

/// Region of a polar measurement to sum.
///
/// `detector_regions` names flat bins (`radial * nbins_azimuthal +
/// azimuthal`) and takes precedence over the limits. Missing limits span the
/// whole axis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarIntegration {
    #[serde(default)]
    pub radial_limits: Option<(f64, f64)>,
    #[serde(default)]
    pub azimuthal_limits: Option<(f64, f64)>,
    #[serde(default)]
    pub detector_regions: Option<Vec<usize>>,
}

/// Bin range covered by `limits` on an axis of `n` bins.
fn limit_range(limits: Option<(f64, f64)>, n: usize, offset: f64, sampling: f64) -> Range<usize> {
    let Some((lo, hi)) = limits else {
        return 0..n;
    };
    let to_index = |angle: f64| ((angle - offset) / sampling).floor().clamp(0.0, n as f64) as usize;
    let (start, end) = (to_index(lo), to_index(hi));
    start..end.max(start)
}

impl<T: Element> Measurement<PolarGrid, T> {
    pub fn nbins(&self) -> (usize, usize) {
        let base = self.base_shape();
        (base[0], base[1])
    }

    pub fn radial_sampling(&self) -> f64 {
        self.grid().radial_sampling
    }

    pub fn azimuthal_sampling(&self) -> f64 {
        self.grid().azimuthal_sampling
    }

    pub fn inner_angle(&self) -> f64 {
        self.grid().radial_offset
    }

    pub fn outer_angle(&self) -> f64 {
        self.inner_angle() + self.nbins().0 as f64 * self.radial_sampling()
    }

    /// Flat bins selected by `region`.
    fn region_bins(&self, region: &PolarIntegration) -> Result<Vec<usize>> {
        let (nr, na) = self.nbins();
        if let Some(regions) = &region.detector_regions {
            if let Some(&bad) = regions.iter().find(|&&b| b >= nr * na) {
                return Err(MeasurementError::IndexOutOfRange {
                    index: bad as isize,
                    len: nr * na,
                });
            }
            return Ok(regions.clone());
        }
        let grid = self.grid();
        let radial = limit_range(region.radial_limits, nr, grid.radial_offset, grid.radial_sampling);
        let azimuthal = limit_range(
            region.azimuthal_limits,
            na,
            grid.azimuthal_offset,
            grid.azimuthal_sampling,
        );
        Ok(radial
            .flat_map(|r| azimuthal.clone().map(move |a| r * na + a))
            .collect())
    }

    /// Sum the selected bins for every scan position.
    pub fn integrate(&self, region: &PolarIntegration) -> Result<Images<T>> {
        let grid = self.scan_image_grid()?;
        let bins = self.region_bins(region)?;
        debug!("integrate {} of {} polar bins", bins.len(), self.nbins().0 * self.nbins().1);
        let kernel = pixel_kernel(Vec::new(), move |pixels: ArrayView2<'_, T>| {
            let sums = sum_positions(pixels, &bins);
            let items = sums.len();
            Array2::from_shape_vec((items, 1), sums).expect("one sum per item")
        });
        self.collapse_onto_scan(grid, kernel)
    }

    pub fn integrate_radial(&self, inner: f64, outer: f64) -> Result<Images<T>> {
        self.integrate(&PolarIntegration {
            radial_limits: Some((inner, outer)),
            ..PolarIntegration::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 2x2 scan of 3x4 bins holding `bin index + 100 * scan position`.
    fn polar() -> PolarMeasurements {
        let data = ArrayD::from_shape_fn(IxDyn(&[2, 2, 3, 4]), |ix| {
            (100 * (ix[0] * 2 + ix[1]) + ix[2] * 4 + ix[3]) as f64
        });
        let grid = PolarGrid {
            radial_sampling: 10.0,
            azimuthal_sampling: TAU / 4.0,
            radial_offset: 5.0,
            azimuthal_offset: 0.0,
        };
        PolarMeasurements::from_array(data, grid)
            .unwrap()
            .with_ensemble_axes(vec![
                AxisMetadata::scan("x", 0.5, "Å"),
                AxisMetadata::scan("y", 0.25, "Å"),
            ])
            .unwrap()
    }

    #[test]
    fn angles_follow_offset_and_sampling() {
        let m = polar();
        assert!(approx_eq(m.inner_angle(), 5.0));
        assert!(approx_eq(m.outer_angle(), 35.0));
        assert_eq!(m.base_axes_metadata()[0].offset(), Some(5.0));
    }

    #[test]
    fn detector_regions_sum_named_bins() {
        let m = polar();
        let images = m
            .integrate(&PolarIntegration {
                detector_regions: Some(vec![1, 6, 11]),
                ..PolarIntegration::default()
            })
            .unwrap();
        assert_eq!(images.shape(), vec![2, 2]);
        assert_eq!(images.sampling(), (0.5, 0.25));
        assert!(approx_eq(images.array()[[0, 0]], 18.0));
        assert!(approx_eq(images.array()[[1, 1]], 18.0 + 900.0));
        let out_of_range = m.integrate(&PolarIntegration {
            detector_regions: Some(vec![12]),
            ..PolarIntegration::default()
        });
        assert!(matches!(out_of_range, Err(MeasurementError::IndexOutOfRange { .. })));
    }

    #[test]
    fn limits_select_rings_and_sectors() {
        let m = polar();
        // rings [15, 35) -> radial bins 1 and 2
        let rings = m.integrate_radial(15.0, 35.0).unwrap();
        let expected: f64 = (4..12).map(|b| b as f64).sum();
        assert!(approx_eq(rings.array()[[0, 0]], expected));

        // sector [pi/2, pi) -> azimuthal bin 1 in every ring
        let sector = m
            .integrate(&PolarIntegration {
                azimuthal_limits: Some((FRAC_PI_2, 2.0 * FRAC_PI_2)),
                ..PolarIntegration::default()
            })
            .unwrap();
        assert!(approx_eq(sector.array()[[0, 0]], 1.0 + 5.0 + 9.0));

        let everything = m.integrate(&PolarIntegration::default()).unwrap();
        assert!(approx_eq(everything.array()[[0, 0]], 66.0));
    }

    #[test]
    fn integration_needs_two_scan_axes() {
        let m = polar().with_ensemble_axes(vec![AxisMetadata::unknown(); 2]).unwrap();
        assert!(matches!(
            m.integrate_radial(5.0, 15.0),
            Err(MeasurementError::Configuration(_))
        ));
    }
}

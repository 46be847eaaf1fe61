//! Diffraction patterns: two Fourier-space base axes in mrad.
//!
//! Pixel angles follow the grid's `fftshift` flag: shifted grids run from the
//! most negative frequency upwards, unshifted grids start at zero.

use super::{
    pixel_kernel, slice_kernel, BaseGrid, ImageGrid, Images, LineProfiles, Measurement,
    MeasurementTag, PolarGrid, PolarMeasurements,
};
use crate::axes::{AxisMetadata, HasAxes};
use crate::element::Element;
use crate::error::{MeasurementError, Result};
use crate::fft::Fft2Plan;
use crate::polar::{
    angular_coordinates, bilinear_nodes_and_weights, interpolate_bilinear, intgrad2d,
    resampled_gpts, sum_positions, sum_run_length_encoded, BinIndices, PolarLayout, ResampleMode,
};
use log::debug;
use ndarray::{arr0, Array1, Array2, ArrayView2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffractionGrid {
    /// Angular pixel size along the two base axes, in mrad.
    pub angular_sampling: (f64, f64),
    /// Zero frequency stored at the centre rather than the first pixel.
    pub fftshift: bool,
}

impl DiffractionGrid {
    pub fn new(angular_sampling: (f64, f64), fftshift: bool) -> Self {
        Self {
            angular_sampling,
            fftshift,
        }
    }
}

impl BaseGrid for DiffractionGrid {
    const TAG: MeasurementTag = MeasurementTag::DiffractionPatterns;
    const NUM_BASE_AXES: usize = 2;

    fn base_axes_metadata(&self, _base_shape: &[usize]) -> Vec<AxisMetadata> {
        vec![
            AxisMetadata::fourier_space("kx", self.angular_sampling.0, "mrad")
                .with_fftshift(self.fftshift),
            AxisMetadata::fourier_space("ky", self.angular_sampling.1, "mrad")
                .with_fftshift(self.fftshift),
        ]
    }

    fn validate(&self, _base_shape: &[usize]) -> Result<()> {
        let (d0, d1) = self.angular_sampling;
        if d0 > 0.0 && d1 > 0.0 {
            Ok(())
        } else {
            Err(MeasurementError::Configuration(format!(
                "angular sampling must be positive, got {:?}",
                self.angular_sampling
            )))
        }
    }
}

pub type DiffractionPatterns<T = f64> = Measurement<DiffractionGrid, T>;

/// Result of collapsing every pattern onto the scan grid.
#[derive(Debug)]
pub enum ScanMeasurement<T: Element = f64> {
    Line(LineProfiles<T>),
    Image(Images<T>),
}

impl<T: Element> ScanMeasurement<T> {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            ScanMeasurement::Line(m) => m.shape(),
            ScanMeasurement::Image(m) => m.shape(),
        }
    }

    pub fn array(&self) -> &ndarray::ArrayD<T> {
        match self {
            ScanMeasurement::Line(m) => m.array(),
            ScanMeasurement::Image(m) => m.array(),
        }
    }

    pub fn into_line_profiles(self) -> Option<LineProfiles<T>> {
        match self {
            ScanMeasurement::Line(m) => Some(m),
            ScanMeasurement::Image(_) => None,
        }
    }

    pub fn into_images(self) -> Option<Images<T>> {
        match self {
            ScanMeasurement::Image(m) => Some(m),
            ScanMeasurement::Line(_) => None,
        }
    }
}

/// Smallest and largest angle along an `n`-pixel axis.
fn axis_extent(n: usize, d: f64) -> (f64, f64) {
    if n % 2 == 0 {
        (-((n / 2) as f64) * d, ((n / 2) as f64 - 1.0) * d)
    } else {
        let half = ((n - 1) / 2) as f64;
        (-half * d, half * d)
    }
}

impl<T: Element> Measurement<DiffractionGrid, T> {
    pub fn angular_sampling(&self) -> (f64, f64) {
        self.grid().angular_sampling
    }

    pub fn fftshift(&self) -> bool {
        self.grid().fftshift
    }

    pub fn gpts(&self) -> (usize, usize) {
        let base = self.base_shape();
        (base[0], base[1])
    }

    /// Largest angle resolved along each axis.
    pub fn max_angles(&self) -> (f64, f64) {
        let (n0, n1) = self.gpts();
        let (d0, d1) = self.angular_sampling();
        ((n0 / 2) as f64 * d0, (n1 / 2) as f64 * d1)
    }

    pub fn fourier_space_extent(&self) -> ((f64, f64), (f64, f64)) {
        let (n0, n1) = self.gpts();
        let (d0, d1) = self.angular_sampling();
        (axis_extent(n0, d0), axis_extent(n1, d1))
    }

    pub fn check_max_angle(&self, angle: f64) -> Result<()> {
        let max = self.max_angles();
        if angle > max.0 || angle > max.1 {
            return Err(MeasurementError::AngleOutOfRange { angle, max });
        }
        Ok(())
    }

    /// Angle of every pixel along each base axis, in array order.
    pub fn angular_coordinates(&self) -> (Vec<f64>, Vec<f64>) {
        let (n0, n1) = self.gpts();
        let (d0, d1) = self.angular_sampling();
        let shift = self.fftshift();
        (
            angular_coordinates(n0, d0, shift),
            angular_coordinates(n1, d1, shift),
        )
    }

    /// Flat positions of the pixels with `inner <= |alpha| < outer`.
    fn annulus_positions(&self, inner: f64, outer: f64) -> Vec<usize> {
        let (ax, ay) = self.angular_coordinates();
        let mut positions = Vec::new();
        for (i, &x) in ax.iter().enumerate() {
            for (j, &y) in ay.iter().enumerate() {
                let r = x.hypot(y);
                if r >= inner && r < outer {
                    positions.push(i * ay.len() + j);
                }
            }
        }
        positions
    }

    /// Resample both axes onto a common angular sampling.
    pub fn interpolate(&self, mode: ResampleMode) -> Result<Self> {
        let gpts = self.gpts();
        let sampling = self.angular_sampling();
        let shift = self.fftshift();
        let (new_gpts, new_sampling) = resampled_gpts(mode, gpts, sampling);
        debug!(
            "resample diffraction patterns {:?} @ {:?} -> {:?} @ {:?}",
            gpts, sampling, new_gpts, new_sampling
        );
        let rows = bilinear_nodes_and_weights(gpts.0, new_gpts.0, sampling.0, new_sampling.0, shift);
        let cols = bilinear_nodes_and_weights(gpts.1, new_gpts.1, sampling.1, new_sampling.1, shift);
        let kernel = slice_kernel(vec![new_gpts.0, new_gpts.1], move |slice: ArrayView2<'_, T>| {
            interpolate_bilinear(slice, &rows, &cols).into_dyn()
        });
        self.map_base(
            DiffractionGrid::new(new_sampling, shift),
            vec![new_gpts.0, new_gpts.1],
            kernel,
        )
    }

    /// Sum intensity over annular sectors.
    pub fn polar_binning(&self, layout: &PolarLayout) -> Result<PolarMeasurements<T>> {
        self.check_max_angle(layout.outer)?;
        layout.validate()?;
        let indices = Arc::new(BinIndices::build(
            self.gpts(),
            self.angular_sampling(),
            layout,
            self.fftshift(),
        )?);
        let grid = PolarGrid {
            radial_sampling: layout.radial_step(),
            azimuthal_sampling: layout.azimuthal_step(),
            radial_offset: layout.inner,
            azimuthal_offset: layout.rotation,
        };
        let out_base = vec![layout.nbins_radial, layout.nbins_azimuthal];
        let kernel = pixel_kernel(out_base.clone(), move |pixels: ArrayView2<'_, T>| {
            sum_run_length_encoded(pixels, &indices)
        });
        self.map_base(grid, out_base, kernel)
    }

    /// Azimuthally integrated rings of width `step`; `outer` defaults to the
    /// smaller maximum angle.
    pub fn radial_binning(
        &self,
        step: f64,
        inner: f64,
        outer: Option<f64>,
    ) -> Result<PolarMeasurements<T>> {
        if step.is_nan() || step <= 0.0 {
            return Err(MeasurementError::Configuration(format!(
                "radial step must be positive, got {step}"
            )));
        }
        let outer = outer.unwrap_or_else(|| {
            let max = self.max_angles();
            max.0.min(max.1)
        });
        let nbins_radial = ((outer - inner) / step).floor().max(0.0) as usize;
        self.polar_binning(&PolarLayout::new(nbins_radial, 1, inner, outer))
    }

    /// Total intensity in `[inner, outer)` for every scan position.
    pub fn integrate_radial(&self, inner: f64, outer: f64) -> Result<ScanMeasurement<T>> {
        self.check_max_angle(outer)?;
        let positions = self.annulus_positions(inner, outer);
        debug!(
            "integrate_radial [{inner}, {outer}): {} pixels",
            positions.len()
        );
        let kernel = pixel_kernel(Vec::new(), move |pixels: ArrayView2<'_, T>| {
            let sums = sum_positions(pixels, &positions);
            let items = sums.len();
            Array2::from_shape_vec((items, 1), sums).expect("one sum per item")
        });
        match self.num_scan_axes() {
            1 => Ok(ScanMeasurement::Line(
                self.collapse_onto_scan(self.scan_line_grid()?, kernel)?,
            )),
            2 => Ok(ScanMeasurement::Image(
                self.collapse_onto_scan(self.scan_image_grid()?, kernel)?,
            )),
            _ => Err(MeasurementError::Configuration(
                "radial integration needs at least one scan axis".to_string(),
            )),
        }
    }

    /// Zero the direct beam: every pixel closer than `radius` to the optical
    /// axis. Defaults to 1.1 times the coarser sampling.
    pub fn block_direct(&self, radius: Option<f64>) -> Result<Self> {
        let (d0, d1) = self.angular_sampling();
        let radius = radius.unwrap_or(1.1 * d0.max(d1));
        let (ax, ay) = self.angular_coordinates();
        let blocked = Array2::from_shape_fn((ax.len(), ay.len()), |(i, j)| {
            ax[i] * ax[i] + ay[j] * ay[j] < radius * radius
        });
        let gpts = self.gpts();
        let kernel = slice_kernel(vec![gpts.0, gpts.1], move |slice: ArrayView2<'_, T>| {
            let mut out = slice.to_owned();
            out.zip_mut_with(&blocked, |v, &b| {
                if b {
                    *v = T::zero();
                }
            });
            out.into_dyn()
        });
        self.map_base(self.grid().clone(), vec![gpts.0, gpts.1], kernel)
    }
}

impl Measurement<DiffractionGrid, f64> {
    /// Unnormalised first moment of every pattern: `x` in the real part, `y`
    /// in the imaginary part, on the two-dimensional scan grid.
    pub fn center_of_mass(&self) -> Result<Images<Complex64>> {
        let grid = self.scan_image_grid()?;
        let (ax, ay) = self.angular_coordinates();
        let ax = Array1::from(ax);
        let ay = Array1::from(ay);
        let kernel = slice_kernel(Vec::new(), move |slice: ArrayView2<'_, f64>| {
            let mut com = Complex64::new(0.0, 0.0);
            for ((i, j), &v) in slice.indexed_iter() {
                com.re += v * ax[i];
                com.im += v * ay[j];
            }
            arr0(com).into_dyn()
        });
        self.collapse_onto_scan(grid, kernel)
    }

    /// Scalar field whose gradient is the center of mass, minimum zero.
    pub fn integrated_center_of_mass(&self) -> Result<Images<f64>> {
        let com = self.center_of_mass()?;
        let sampling = com.sampling();
        let gpts = com.gpts();
        let plan = Fft2Plan::new(gpts);
        let kernel = slice_kernel(vec![gpts.0, gpts.1], move |slice: ArrayView2<'_, Complex64>| {
            let gx = slice.mapv(|c| c.re);
            let gy = slice.mapv(|c| c.im);
            intgrad2d(gx.view(), gy.view(), sampling, &plan).into_dyn()
        });
        com.map_base(ImageGrid::new(sampling), vec![gpts.0, gpts.1], kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn ones(shape: &[usize], sampling: (f64, f64)) -> DiffractionPatterns {
        DiffractionPatterns::from_array(
            ArrayD::from_elem(IxDyn(shape), 1.0),
            DiffractionGrid::new(sampling, true),
        )
        .unwrap()
    }

    #[test]
    fn extent_and_max_angles() {
        let even = ones(&[64, 64], (1.0, 1.0));
        assert_eq!(even.fourier_space_extent(), ((-32.0, 31.0), (-32.0, 31.0)));
        assert_eq!(even.max_angles(), (32.0, 32.0));
        let odd = ones(&[63, 63], (1.0, 1.0));
        assert_eq!(odd.fourier_space_extent(), ((-31.0, 31.0), (-31.0, 31.0)));
        assert!(matches!(
            even.check_max_angle(40.0),
            Err(MeasurementError::AngleOutOfRange { .. })
        ));
        assert!(even.check_max_angle(32.0).is_ok());
    }

    #[test]
    fn base_axes_carry_fftshift() {
        let m = DiffractionPatterns::from_array(
            ArrayD::<f64>::zeros(IxDyn(&[4, 4])),
            DiffractionGrid::new((0.5, 0.5), false),
        )
        .unwrap();
        let (ax, _) = m.angular_coordinates();
        assert_eq!(ax, vec![0.0, 0.5, -1.0, -0.5]);
        assert_eq!(m.base_axes_metadata()[0].units(), Some("mrad"));
    }

    #[test]
    fn polar_binning_preserves_total_inside_annulus() {
        let m = ones(&[3, 16, 16], (1.0, 1.0));
        let polar = m.polar_binning(&PolarLayout::new(2, 4, 0.0, 8.0)).unwrap();
        assert_eq!(polar.shape(), vec![3, 2, 4]);
        let inside = m.annulus_positions(0.0, 8.0).len() as f64;
        for item in polar.array().outer_iter() {
            assert!(approx_eq(item.sum(), inside));
        }
    }

    #[test]
    fn radial_binning_defaults_outer() {
        let m = ones(&[16, 16], (0.5, 0.5));
        let radial = m.radial_binning(1.0, 0.0, None).unwrap();
        assert_eq!(radial.base_shape(), vec![4, 1]);
        assert!(approx_eq(radial.outer_angle(), 4.0));
    }

    #[test]
    fn block_direct_zeroes_center() {
        let m = ones(&[8, 8], (1.0, 1.0));
        let blocked = m.block_direct(None).unwrap();
        let a = blocked.array();
        assert_eq!(a[[4, 4]], 0.0);
        assert_eq!(a[[4, 5]], 0.0);
        assert_eq!(a[[5, 5]], 1.0);
        assert!(approx_eq(a.sum(), 64.0 - 5.0));
    }

    #[test]
    fn uniform_interpolation_equalises_sampling() {
        let m = ones(&[16, 32], (1.0, 0.5));
        let resampled = m.interpolate(ResampleMode::Uniform).unwrap();
        let (d0, d1) = resampled.angular_sampling();
        assert!(approx_eq(d0, d1));
        assert_eq!(resampled.gpts(), (16, 16));
        assert!(resampled.array().iter().all(|&v| approx_eq(v, 1.0)));
    }

    #[test]
    fn integrate_radial_requires_scan_axes() {
        let m = ones(&[2, 8, 8], (1.0, 1.0));
        assert!(matches!(
            m.integrate_radial(0.0, 2.0),
            Err(MeasurementError::Configuration(_))
        ));
        let scanned = m
            .with_ensemble_axes(vec![AxisMetadata::scan("x", 0.3, "Å")])
            .unwrap();
        let line = scanned
            .integrate_radial(0.0, 2.0)
            .unwrap()
            .into_line_profiles()
            .unwrap();
        assert_eq!(line.shape(), vec![2]);
        assert!(approx_eq(line.sampling(), 0.3));
        // r < 2 on a unit grid: the origin, 4 edge and 4 diagonal neighbours
        assert!(approx_eq(line.array()[[0]], 9.0));
    }

    #[test]
    fn center_of_mass_of_offset_peak() {
        let mut data = ArrayD::<f64>::zeros(IxDyn(&[2, 2, 8, 8]));
        data[[0, 1, 6, 3]] = 2.0;
        let m = DiffractionPatterns::from_array(data, DiffractionGrid::new((0.5, 0.5), true))
            .unwrap()
            .with_ensemble_axes(vec![
                AxisMetadata::scan("x", 0.2, "Å"),
                AxisMetadata::scan("y", 0.2, "Å"),
            ])
            .unwrap();
        let com = m.center_of_mass().unwrap();
        assert_eq!(com.shape(), vec![2, 2]);
        assert_eq!(com.num_ensemble_axes(), 0);
        let value = com.array()[[0, 1]];
        assert!(approx_eq(value.re, 2.0 * 1.0));
        assert!(approx_eq(value.im, 2.0 * -0.5));
        assert_eq!(com.array()[[1, 1]], Complex64::new(0.0, 0.0));
    }
}

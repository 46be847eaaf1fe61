//! Images: two real-space base axes.

use super::line_profiles::{LineGrid, LineProfiles};
use super::{slice_kernel, BaseGrid, Measurement, MeasurementTag};
use crate::axes::{AxisMetadata, HasAxes};
use crate::element::Element;
use crate::error::{MeasurementError, Result};
use crate::fft::FourierResampler;
use crate::filters::{apply_separable, gaussian_radius, Boundary, GaussianFilter};
use crate::lazy::LazyArray;
use crate::scan::LineScan;
use crate::select::Selector;
use log::debug;
use nalgebra::Vector2;
use ndarray::{Array1, Array2, ArrayView2, Ix2};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageGrid {
    /// Pixel size along the two base axes, in Å.
    pub sampling: (f64, f64),
}

impl ImageGrid {
    pub fn new(sampling: (f64, f64)) -> Self {
        Self { sampling }
    }
}

impl BaseGrid for ImageGrid {
    const TAG: MeasurementTag = MeasurementTag::Images;
    const NUM_BASE_AXES: usize = 2;

    fn base_axes_metadata(&self, _base_shape: &[usize]) -> Vec<AxisMetadata> {
        vec![
            AxisMetadata::real_space("x", self.sampling.0, "Å"),
            AxisMetadata::real_space("y", self.sampling.1, "Å"),
        ]
    }

    fn validate(&self, _base_shape: &[usize]) -> Result<()> {
        if self.sampling.0 > 0.0 && self.sampling.1 > 0.0 {
            Ok(())
        } else {
            Err(MeasurementError::Configuration(format!(
                "image sampling must be positive, got {:?}",
                self.sampling
            )))
        }
    }
}

pub type Images<T = f64> = Measurement<ImageGrid, T>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Fourier zero-padding or cropping.
    Fft,
}

/// Target of `Images::interpolate`; exactly one of `sampling` and `gpts`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageInterpolation {
    pub sampling: Option<(f64, f64)>,
    pub gpts: Option<(usize, usize)>,
    pub method: InterpolationMethod,
    pub boundary: Boundary,
}

impl Default for ImageInterpolation {
    fn default() -> Self {
        Self {
            sampling: None,
            gpts: None,
            method: InterpolationMethod::Fft,
            boundary: Boundary::Periodic,
        }
    }
}

impl ImageInterpolation {
    pub fn to_sampling(sampling: (f64, f64)) -> Self {
        Self {
            sampling: Some(sampling),
            ..Self::default()
        }
    }

    pub fn to_gpts(gpts: (usize, usize)) -> Self {
        Self {
            gpts: Some(gpts),
            ..Self::default()
        }
    }
}

/// Line to sample with `Images::interpolate_line`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    pub start: [f64; 2],
    /// End point; when absent the line leaves `start` at `angle` and stops
    /// at the image edge.
    #[serde(default)]
    pub end: Option<[f64; 2]>,
    /// Direction in degrees, used only without `end`.
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub gpts: Option<usize>,
    /// Spacing along the line; defaults to the finer image sampling.
    #[serde(default)]
    pub sampling: Option<f64>,
    #[serde(default)]
    pub margin: f64,
    /// Average across a band of this width, perpendicular to the line.
    #[serde(default)]
    pub width: Option<f64>,
}

impl LineSpec {
    pub fn between(start: [f64; 2], end: [f64; 2]) -> Self {
        Self {
            start,
            end: Some(end),
            angle: 0.0,
            gpts: None,
            sampling: None,
            margin: 0.0,
            width: None,
        }
    }
}

/// First ensemble slice prepared for rendering.
#[derive(Clone, Debug)]
pub struct DisplaySlice {
    pub values: Array2<f64>,
    pub extent: (f64, f64),
    pub x_label: String,
    pub y_label: String,
}

/// Periodic bilinear sample of `slice` at fractional pixel `(x, y)`.
fn sample_periodic<T: Element>(slice: &ArrayView2<'_, T>, x: f64, y: f64) -> T {
    let (n0, n1) = slice.dim();
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let i0 = (x0 as isize).rem_euclid(n0 as isize) as usize;
    let j0 = (y0 as isize).rem_euclid(n1 as isize) as usize;
    let i1 = (i0 + 1) % n0;
    let j1 = (j0 + 1) % n1;
    slice[[i0, j0]] * ((1.0 - fx) * (1.0 - fy))
        + slice[[i1, j0]] * (fx * (1.0 - fy))
        + slice[[i0, j1]] * ((1.0 - fx) * fy)
        + slice[[i1, j1]] * (fx * fy)
}

impl<T: Element> Measurement<ImageGrid, T> {
    pub fn sampling(&self) -> (f64, f64) {
        self.grid().sampling
    }

    pub fn gpts(&self) -> (usize, usize) {
        let base = self.base_shape();
        (base[0], base[1])
    }

    pub fn extent(&self) -> (f64, f64) {
        let (n0, n1) = self.gpts();
        let (s0, s1) = self.sampling();
        (n0 as f64 * s0, n1 as f64 * s1)
    }

    /// Pixel coordinates along both base axes.
    pub fn coordinates(&self) -> (Vec<f64>, Vec<f64>) {
        let (n0, n1) = self.gpts();
        let (s0, s1) = self.sampling();
        (
            (0..n0).map(|i| i as f64 * s0).collect(),
            (0..n1).map(|j| j as f64 * s1).collect(),
        )
    }

    /// Resample the base grid by Fourier zero-padding or cropping.
    pub fn interpolate(&self, request: &ImageInterpolation) -> Result<Self> {
        if request.boundary != Boundary::Periodic {
            return Err(MeasurementError::Configuration(format!(
                "{:?} interpolation requires a periodic boundary, got {:?}",
                request.method, request.boundary
            )));
        }
        let extent = self.extent();
        let gpts = match (request.sampling, request.gpts) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(MeasurementError::Configuration(
                    "interpolation needs exactly one of sampling and gpts".to_string(),
                ))
            }
            (Some((d0, d1)), None) => {
                if d0 <= 0.0 || d1 <= 0.0 {
                    return Err(MeasurementError::Configuration(format!(
                        "interpolation sampling must be positive, got {:?}",
                        (d0, d1)
                    )));
                }
                ((extent.0 / d0).ceil() as usize, (extent.1 / d1).ceil() as usize)
            }
            (None, Some(gpts)) => gpts,
        };
        if gpts.0 == 0 || gpts.1 == 0 {
            return Err(MeasurementError::Configuration(format!(
                "interpolation target {gpts:?} is empty"
            )));
        }
        let sampling = (extent.0 / gpts.0 as f64, extent.1 / gpts.1 as f64);
        debug!("interpolate images {:?} -> {:?}", self.gpts(), gpts);

        let resampler = FourierResampler::new(self.gpts(), gpts);
        let kernel = slice_kernel(vec![gpts.0, gpts.1], move |slice: ArrayView2<'_, T>| {
            let complex = slice.mapv(Element::to_complex);
            resampler
                .resample(complex.view())
                .mapv(T::from_complex)
                .into_dyn()
        });
        self.map_base(ImageGrid::new(sampling), vec![gpts.0, gpts.1], kernel)
    }

    /// Sample every slice along a line with periodic bilinear interpolation.
    pub fn interpolate_line(&self, request: &LineSpec) -> Result<LineProfiles<T>> {
        let start = Vector2::new(request.start[0], request.start[1]);
        let end = match request.end {
            Some(end) => Vector2::new(end[0], end[1]),
            None => LineScan::end_from_angle(start, request.angle, self.extent()),
        };
        let sampling = self.sampling();
        let scan = match (request.gpts, request.sampling) {
            (Some(gpts), _) => LineScan::new(start, end, gpts, request.margin, true)?,
            (None, line_sampling) => LineScan::with_sampling(
                start,
                end,
                line_sampling.unwrap_or(sampling.0.min(sampling.1)),
                request.margin,
                true,
            )?,
        };

        let mut offsets = vec![Vector2::zeros()];
        if let Some(width) = request.width.filter(|w| *w > 0.0) {
            let normal = Vector2::new(-scan.direction().y, scan.direction().x);
            let n = ((width / scan.sampling()).ceil() as usize).max(2);
            offsets = (0..n)
                .map(|i| normal * (-0.5 * width + width * i as f64 / (n - 1) as f64))
                .collect();
        }
        let positions: Vec<(f64, f64)> = scan
            .positions()
            .into_iter()
            .map(|p| (p.x / sampling.0, p.y / sampling.1))
            .collect();
        let offsets: Vec<(f64, f64)> = offsets
            .into_iter()
            .map(|o| (o.x / sampling.0, o.y / sampling.1))
            .collect();

        let gpts = positions.len();
        let kernel = slice_kernel(vec![gpts], move |slice: ArrayView2<'_, T>| {
            let weight = 1.0 / offsets.len() as f64;
            Array1::from_iter(positions.iter().map(|&(x, y)| {
                offsets.iter().fold(T::zero(), |acc, &(ox, oy)| {
                    acc + sample_periodic(&slice, x + ox, y + oy) * weight
                })
            }))
            .into_dyn()
        });
        let (a, b) = (scan.margin_start(), scan.margin_end());
        let grid = LineGrid::new([a.x, a.y], [b.x, b.y], scan.endpoint());
        self.map_base(grid, vec![gpts], kernel)
    }

    /// Separable Gaussian smoothing; `sigma` in Å per base axis.
    pub fn gaussian_filter(&self, sigma: (f64, f64), boundary: Boundary) -> Result<Self> {
        if sigma.0 < 0.0 || sigma.1 < 0.0 {
            return Err(MeasurementError::Configuration(format!(
                "gaussian sigma must be non-negative, got {sigma:?}"
            )));
        }
        let sampling = self.sampling();
        let pixels = (sigma.0 / sampling.0, sigma.1 / sampling.1);
        let radius = gaussian_radius(pixels);
        let filter0 = GaussianFilter::new(pixels.0, radius);
        let filter1 = GaussianFilter::new(pixels.1, radius);
        let gpts = self.gpts();
        let kernel = slice_kernel(vec![gpts.0, gpts.1], move |slice: ArrayView2<'_, T>| {
            apply_separable(slice, &filter0, &filter1, boundary).into_dyn()
        });
        self.map_base(self.grid().clone(), vec![gpts.0, gpts.1], kernel)
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self.sampling() == other.sampling()
            && self.axes_metadata() == other.axes_metadata()
    }

    /// Elementwise `self - other`.
    pub fn subtract(&self, other: &Self) -> Result<Self> {
        if !self.is_compatible(other) {
            return Err(MeasurementError::IncompatibleMeasurement(format!(
                "cannot subtract images of shape {:?} and sampling {:?} from shape {:?} and sampling {:?}",
                other.shape(),
                other.sampling(),
                self.shape(),
                self.sampling()
            )));
        }
        let (a, b) = (self.lazy().view(), other.lazy().view());
        let array = LazyArray::deferred(self.shape(), self.lazy().chunk_len(), move || {
            a.compute() - b.compute()
        });
        Measurement::new(
            array,
            self.grid().clone(),
            self.ensemble_axes_metadata().to_vec(),
            self.metadata().clone(),
        )
    }

    /// Repeat the base grid `reps` times along each base axis.
    pub fn tile(&self, reps: (usize, usize)) -> Result<Self> {
        if reps.0 == 0 || reps.1 == 0 {
            return Err(MeasurementError::Configuration(format!(
                "tile repetitions must be positive, got {reps:?}"
            )));
        }
        let (n0, n1) = self.gpts();
        let out = (n0 * reps.0, n1 * reps.1);
        let kernel = slice_kernel(vec![out.0, out.1], move |slice: ArrayView2<'_, T>| {
            Array2::from_shape_fn(out, |(i, j)| slice[[i % n0, j % n1]]).into_dyn()
        });
        self.map_base(self.grid().clone(), vec![out.0, out.1], kernel)
    }

    /// First ensemble slice, as real values, for rendering.
    pub fn display_slice(&self) -> Result<DisplaySlice> {
        let first = vec![Selector::Index(0); self.num_ensemble_axes()];
        let slice = self.index(&first)?;
        let values = slice
            .array()
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| MeasurementError::AxesMismatch(e.to_string()))?
            .mapv(Element::display_value);
        let base = self.base_axes_metadata();
        Ok(DisplaySlice {
            values,
            extent: self.extent(),
            x_label: base[0].format_label(),
            y_label: base[1].format_label(),
        })
    }
}

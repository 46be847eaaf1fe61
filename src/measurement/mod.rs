//! Measurements: a deferred array plus ensemble and base axis metadata.
//!
//! `Measurement<G, T>` pairs a [`LazyArray`] with an ordered list of ensemble
//! axes and a base grid `G` describing the trailing base dimensions. Every
//! transform returns a new measurement; the array is never mutated in place
//! and the metadata lists are cloned, never shared.
//!
//! Specialised kinds are type aliases over the base grid:
//! [`Images`], [`LineProfiles`], [`DiffractionPatterns`] and
//! [`PolarMeasurements`].

pub mod diffraction;
pub mod images;
pub mod line_profiles;
pub mod polar;
pub mod reduce;
pub mod store;

pub use diffraction::{DiffractionGrid, DiffractionPatterns, ScanMeasurement};
pub use images::{DisplaySlice, ImageGrid, ImageInterpolation, Images, InterpolationMethod, LineSpec};
pub use line_profiles::{LineGrid, LineProfiles};
pub use polar::{PolarGrid, PolarIntegration, PolarMeasurements};
pub use reduce::Reduction;
pub use store::{AnyMeasurement, DirectoryStore, MeasurementTag, MemoryStore, Store, StoredArray};

use crate::axes::{AxisMetadata, HasAxes};
use crate::element::Element;
use crate::error::{MeasurementError, Result};
use crate::lazy::{reshape, ArrayOwnership, BlockFn, LazyArray};
use crate::select::Selector;
use log::debug;
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Free-form scalar metadata value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Text(v)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Describes the base dimensions of a measurement kind.
///
/// The grid is the only source of base axis metadata, so a kind that cannot
/// describe its base axes cannot be constructed.
pub trait BaseGrid:
    Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const TAG: MeasurementTag;
    const NUM_BASE_AXES: usize;

    fn base_axes_metadata(&self, base_shape: &[usize]) -> Vec<AxisMetadata>;

    /// Reject grids that cannot describe `base_shape`.
    fn validate(&self, _base_shape: &[usize]) -> Result<()> {
        Ok(())
    }
}

/// Whether `copy` duplicates the array or aliases it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyMode {
    Owned,
    View,
}

/// Signal-axis descriptor for export adapters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalAxis {
    pub name: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub navigate: bool,
}

#[derive(Debug)]
pub struct Measurement<G: BaseGrid, T: Element = f64> {
    array: LazyArray<T>,
    grid: G,
    ensemble_axes: Vec<AxisMetadata>,
    metadata: Metadata,
}

impl<G: BaseGrid, T: Element> HasAxes for Measurement<G, T> {
    fn ensemble_shape(&self) -> Vec<usize> {
        let shape = self.array.shape();
        shape[..shape.len().saturating_sub(G::NUM_BASE_AXES)].to_vec()
    }

    fn base_shape(&self) -> Vec<usize> {
        let shape = self.array.shape();
        shape[shape.len().saturating_sub(G::NUM_BASE_AXES)..].to_vec()
    }

    fn ensemble_axes_metadata(&self) -> &[AxisMetadata] {
        &self.ensemble_axes
    }

    fn base_axes_metadata(&self) -> Vec<AxisMetadata> {
        self.grid.base_axes_metadata(&self.base_shape())
    }
}

impl<G: BaseGrid, T: Element> Measurement<G, T> {
    /// Wrap `array`; its leading dimensions are described by `ensemble_axes`.
    pub fn new(
        array: LazyArray<T>,
        grid: G,
        ensemble_axes: Vec<AxisMetadata>,
        metadata: Metadata,
    ) -> Result<Self> {
        let rank = array.ndim();
        if rank < G::NUM_BASE_AXES {
            return Err(MeasurementError::AxesMismatch(format!(
                "{} needs at least {} dimensions, got {rank}",
                G::TAG.as_str(),
                G::NUM_BASE_AXES
            )));
        }
        if ensemble_axes.len() != rank - G::NUM_BASE_AXES {
            return Err(MeasurementError::AxesMismatch(format!(
                "{} ensemble axes given for {} ensemble dimensions",
                ensemble_axes.len(),
                rank - G::NUM_BASE_AXES
            )));
        }
        let measurement = Self {
            array,
            grid,
            ensemble_axes,
            metadata,
        };
        measurement.grid.validate(&measurement.base_shape())?;
        measurement.check_axes_metadata()?;
        Ok(measurement)
    }

    /// Wrap a ready array, describing every ensemble dimension as unknown.
    pub fn from_array(array: ArrayD<T>, grid: G) -> Result<Self> {
        let num_ensemble = array.ndim().saturating_sub(G::NUM_BASE_AXES);
        Self::new(
            LazyArray::from_array(array),
            grid,
            vec![AxisMetadata::unknown(); num_ensemble],
            Metadata::new(),
        )
    }

    pub fn with_ensemble_axes(self, ensemble_axes: Vec<AxisMetadata>) -> Result<Self> {
        Self::new(self.array, self.grid, ensemble_axes, self.metadata)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn lazy(&self) -> &LazyArray<T> {
        &self.array
    }

    pub fn ownership(&self) -> ArrayOwnership {
        self.array.ownership()
    }

    /// Evaluated array; evaluates on first use.
    pub fn array(&self) -> &ArrayD<T> {
        self.array.compute()
    }

    pub fn is_computed(&self) -> bool {
        self.array.is_computed()
    }

    /// Force evaluation. The result shares the evaluated data.
    pub fn compute(&self) -> Self {
        Self {
            array: self.array.materialize(),
            grid: self.grid.clone(),
            ensemble_axes: self.ensemble_axes.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn copy(&self, mode: CopyMode) -> Self {
        let array = match mode {
            CopyMode::Owned => self.array.deep_copy(),
            CopyMode::View => self.array.view(),
        };
        Self {
            array,
            grid: self.grid.clone(),
            ensemble_axes: self.ensemble_axes.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Same measurement evaluated in chunks of `chunk_len` ensemble items.
    pub fn rechunk(&self, chunk_len: usize) -> Self {
        Self {
            array: self.array.rechunk(chunk_len),
            grid: self.grid.clone(),
            ensemble_axes: self.ensemble_axes.clone(),
            metadata: self.metadata.clone(),
        }
    }

    fn reduction_axes(&self, axes: Option<&[usize]>) -> Result<Vec<usize>> {
        let mut axes = match axes {
            Some(axes) => axes.to_vec(),
            None => self.ensemble_axes(),
        };
        axes.sort_unstable();
        axes.dedup();
        let rank = self.num_axes();
        if let Some(&bad) = axes.iter().find(|&&a| a >= rank) {
            return Err(MeasurementError::IndexOutOfRange {
                index: bad as isize,
                len: rank,
            });
        }
        if self.is_base_axis(&axes) {
            let base = self.base_axes();
            return Err(MeasurementError::ReduceOnBaseAxis {
                axes: axes.into_iter().filter(|a| base.contains(a)).collect(),
            });
        }
        Ok(axes)
    }

    /// Collapse ensemble `axes` (all ensemble axes when `None`).
    pub fn reduce(&self, axes: Option<&[usize]>, reduction: Reduction) -> Result<Self> {
        let axes = self.reduction_axes(axes)?;
        let shape = self.shape();
        let out_shape: Vec<usize> = (0..shape.len())
            .filter(|a| !axes.contains(a))
            .map(|a| shape[a])
            .collect();
        let ensemble_axes: Vec<AxisMetadata> = self
            .ensemble_axes
            .iter()
            .enumerate()
            .filter(|(i, _)| !axes.contains(i))
            .map(|(_, axis)| axis.clone())
            .collect();
        debug!("{:?} over axes {:?}: {:?} -> {:?}", reduction, axes, shape, out_shape);
        let array = self
            .array
            .map(out_shape, move |data| reduce::reduce_axes(data, &axes, reduction));
        Self::new(array, self.grid.clone(), ensemble_axes, self.metadata.clone())
    }

    pub fn mean(&self, axes: Option<&[usize]>) -> Result<Self> {
        self.reduce(axes, Reduction::Mean)
    }

    pub fn sum(&self, axes: Option<&[usize]>) -> Result<Self> {
        self.reduce(axes, Reduction::Sum)
    }

    pub fn std(&self, axes: Option<&[usize]>) -> Result<Self> {
        self.reduce(axes, Reduction::Std)
    }

    /// Select with one selector per leading dimension.
    ///
    /// Scalar selectors remove their dimension and its axis; other selectors
    /// narrow ordinal axes. Scalar selection of a base dimension fails.
    pub fn index(&self, selectors: &[Selector]) -> Result<Self> {
        let rank = self.num_axes();
        if selectors.len() > rank {
            return Err(MeasurementError::AxesMismatch(format!(
                "too many indices ({}) for a measurement with {rank} axes",
                selectors.len()
            )));
        }
        let base = self.base_axes();
        let removed_base: Vec<usize> = selectors
            .iter()
            .enumerate()
            .filter(|(i, s)| s.is_scalar() && base.contains(i))
            .map(|(i, _)| i)
            .collect();
        if !removed_base.is_empty() {
            return Err(MeasurementError::IndexOnBaseAxis { axes: removed_base });
        }

        let array = self.array.index(selectors)?;
        let mut ensemble_axes = Vec::with_capacity(self.ensemble_axes.len());
        for (i, axis) in self.ensemble_axes.iter().enumerate() {
            match selectors.get(i) {
                Some(selector) if selector.is_scalar() => {}
                Some(selector) => ensemble_axes.push(axis.select(selector)?),
                None => ensemble_axes.push(axis.clone()),
            }
        }
        Self::new(array, self.grid.clone(), ensemble_axes, self.metadata.clone())
    }

    /// Join with `other` along ensemble axis `axis`.
    pub fn concatenate(&self, other: &Self, axis: usize) -> Result<Self> {
        if axis >= self.num_ensemble_axes() {
            return Err(MeasurementError::IncompatibleMeasurement(format!(
                "axis {axis} is not an ensemble axis"
            )));
        }
        if self.grid != other.grid {
            return Err(MeasurementError::IncompatibleMeasurement(format!(
                "base grids differ: {:?} vs {:?}",
                self.grid, other.grid
            )));
        }
        if self.num_ensemble_axes() != other.num_ensemble_axes() {
            return Err(MeasurementError::IncompatibleMeasurement(
                "measurements have a different number of ensemble axes".to_string(),
            ));
        }
        let mut ensemble_axes = Vec::with_capacity(self.ensemble_axes.len());
        for (i, (a, b)) in self.ensemble_axes.iter().zip(&other.ensemble_axes).enumerate() {
            if i == axis {
                ensemble_axes.push(a.concatenate(b)?);
            } else if a != b {
                return Err(MeasurementError::IncompatibleMeasurement(format!(
                    "ensemble axis {i} differs ('{}' vs '{}')",
                    a.label, b.label
                )));
            } else {
                ensemble_axes.push(a.clone());
            }
        }
        let array = self.array.concatenate(&other.array, axis)?;
        Self::new(array, self.grid.clone(), ensemble_axes, self.metadata.clone())
    }

    /// Export descriptors: ensemble (navigation) axes, then base axes.
    pub fn signal_axes(&self) -> Vec<SignalAxis> {
        self.axes_metadata()
            .into_iter()
            .zip(self.shape())
            .enumerate()
            .map(|(i, (axis, size))| {
                let navigate = i < self.num_ensemble_axes();
                SignalAxis {
                    name: axis.label.clone(),
                    size,
                    scale: axis.sampling(),
                    offset: axis.offset(),
                    units: axis.units().map(str::to_string),
                    navigate,
                }
            })
            .collect()
    }

    /// Apply `kernel` over the base dimensions, producing a measurement of
    /// another kind with the same ensemble axes.
    pub(crate) fn map_base<G2: BaseGrid, U: Element>(
        &self,
        grid: G2,
        out_base_shape: Vec<usize>,
        kernel: Arc<BlockFn<T, U>>,
    ) -> Result<Measurement<G2, U>> {
        let array = self
            .array
            .map_blocks(G::NUM_BASE_AXES, out_base_shape, kernel)?;
        Measurement::new(array, grid, self.ensemble_axes.clone(), self.metadata.clone())
    }

    /// Collapse the base dimensions to one value per ensemble item and treat
    /// the scan axes as the base axes of a new measurement.
    pub(crate) fn collapse_onto_scan<G2: BaseGrid, U: Element>(
        &self,
        grid: G2,
        kernel: Arc<BlockFn<T, U>>,
    ) -> Result<Measurement<G2, U>> {
        let scan = self.scan_axes();
        let array = self.array.map_blocks(G::NUM_BASE_AXES, Vec::new(), kernel)?;
        let ensemble_axes = self
            .ensemble_axes
            .iter()
            .enumerate()
            .filter(|(i, _)| !scan.contains(i))
            .map(|(_, axis)| axis.clone())
            .collect();
        Measurement::new(array, grid, ensemble_axes, self.metadata.clone())
    }

    /// Image grid spanned by exactly two trailing scan axes.
    pub(crate) fn scan_image_grid(&self) -> Result<ImageGrid> {
        match self.scan_sampling()[..] {
            [s0, s1] => Ok(ImageGrid::new((s0, s1))),
            _ => Err(MeasurementError::Configuration(format!(
                "expected two scan axes, found {}",
                self.num_scan_axes()
            ))),
        }
    }

    /// Line grid of a single trailing scan axis; falls back to a line along
    /// x from the origin when the scan endpoints were not recorded.
    pub(crate) fn scan_line_grid(&self) -> Result<LineGrid> {
        let scan = self.scan_axes_metadata();
        let [axis] = &scan[..] else {
            return Err(MeasurementError::Configuration(format!(
                "expected one scan axis, found {}",
                scan.len()
            )));
        };
        let gpts = self.scan_shape()[0];
        match axis.scan_extent() {
            Some((start, end)) => Ok(LineGrid::new(start, end, axis.endpoint().unwrap_or(true))),
            None => Ok(LineGrid::from_sampling(axis.sampling().unwrap_or(1.0), gpts)),
        }
    }
}

/// Block kernel applying `f` to every two-dimensional base slice.
///
/// `f` must return an array of exactly `out_base` shape.
pub(crate) fn slice_kernel<T, U, F>(out_base: Vec<usize>, f: F) -> Arc<BlockFn<T, U>>
where
    T: Element,
    U: Element,
    F: Fn(ArrayView2<'_, T>) -> ArrayD<U> + Send + Sync + 'static,
{
    Arc::new(move |block: ArrayViewD<'_, T>| {
        let items = block.len_of(Axis(0));
        let mut out_shape = vec![items];
        out_shape.extend(out_base.iter().copied());
        let mut data = Vec::with_capacity(out_shape.iter().product());
        for item in block.outer_iter() {
            let slice = item
                .into_dimensionality::<Ix2>()
                .expect("blocks carry two base dimensions");
            data.extend(f(slice).iter().copied());
        }
        ArrayD::from_shape_vec(IxDyn(&out_shape), data)
            .expect("slice kernels return their declared base shape")
    })
}

/// Block kernel over flattened base pixels.
///
/// `f` receives `items x pixels` and returns `items x prod(out_base)`.
pub(crate) fn pixel_kernel<T, U, F>(out_base: Vec<usize>, f: F) -> Arc<BlockFn<T, U>>
where
    T: Element,
    U: Element,
    F: Fn(ArrayView2<'_, T>) -> Array2<U> + Send + Sync + 'static,
{
    Arc::new(move |block: ArrayViewD<'_, T>| {
        let items = block.len_of(Axis(0));
        let pixels = block.len() / items.max(1);
        let flat = Array2::from_shape_vec((items, pixels), block.iter().copied().collect())
            .expect("blocks hold items x pixels values");
        let mut out_shape = vec![items];
        out_shape.extend(out_base.iter().copied());
        reshape(f(flat.view()).into_dyn(), &out_shape)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axes::{ordinal_values, AxisVariant};
    use ndarray::Array;

    fn ramp(shape: &[usize]) -> ArrayD<f64> {
        let n: usize = shape.iter().product();
        Array::from_shape_vec(IxDyn(shape), (0..n).map(|v| v as f64).collect()).unwrap()
    }

    fn images() -> Images {
        Images::from_array(ramp(&[2, 3, 4, 4]), ImageGrid::new((0.5, 0.5)))
            .unwrap()
            .with_ensemble_axes(vec![
                AxisMetadata::frozen_phonons(2),
                AxisMetadata::thickness(ordinal_values([1.0, 2.0, 3.0])),
            ])
            .unwrap()
            .with_metadata("energy", 80e3)
    }

    #[test]
    fn construction_checks_ordinal_lengths() {
        let err = Images::from_array(ramp(&[2, 4, 4]), ImageGrid::new((1.0, 1.0)))
            .unwrap()
            .with_ensemble_axes(vec![AxisMetadata::frozen_phonons(3)]);
        assert!(matches!(err, Err(MeasurementError::AxesMismatch(_))));
        assert!(Images::from_array(ramp(&[4]), ImageGrid::new((1.0, 1.0))).is_err());
    }

    #[test]
    fn mean_removes_reduced_axes() {
        let m = images();
        let reduced = m.mean(Some(&[0])).unwrap();
        assert_eq!(reduced.shape(), vec![3, 4, 4]);
        assert_eq!(reduced.ensemble_axes_metadata()[0].variant(), AxisVariant::Thickness);
        assert_eq!(reduced.array()[[0, 0, 0]], 24.0);
        assert_eq!(reduced.metadata(), m.metadata());

        let all = m.sum(None).unwrap();
        assert_eq!(all.shape(), vec![4, 4]);
        assert_eq!(all.num_ensemble_axes(), 0);
        assert_eq!(all.array()[[0, 0]], (0..6).map(|i| (i * 16) as f64).sum::<f64>());
    }

    #[test]
    fn reduction_on_base_axis_fails() {
        let m = images();
        assert!(matches!(
            m.mean(Some(&[1, 2])),
            Err(MeasurementError::ReduceOnBaseAxis { axes }) if axes == vec![2]
        ));
        assert!(matches!(
            m.std(Some(&[7])),
            Err(MeasurementError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn scalar_index_removes_axis_and_range_narrows() {
        let m = images();
        let picked = m.index(&[Selector::Index(1), Selector::range(0, 2)]).unwrap();
        assert_eq!(picked.shape(), vec![2, 4, 4]);
        assert_eq!(picked.num_ensemble_axes(), 1);
        assert_eq!(picked.ensemble_axes_metadata()[0].len(), Some(2));
        assert_eq!(picked.array()[[1, 0, 0]], 64.0);
    }

    #[test]
    fn scalar_index_on_base_axis_fails() {
        let m = images();
        let err = m.index(&[Selector::Full, Selector::Full, Selector::Index(0)]);
        assert!(matches!(err, Err(MeasurementError::IndexOnBaseAxis { axes }) if axes == vec![2]));
        let narrowed = m
            .index(&[Selector::Full, Selector::Full, Selector::range(0, 2)])
            .unwrap();
        assert_eq!(narrowed.base_shape(), vec![2, 4]);
    }

    #[test]
    fn copies_track_ownership_and_preserve_values() {
        let m = images();
        let view = m.copy(CopyMode::View);
        assert_eq!(view.ownership(), ArrayOwnership::View);
        let owned = view.copy(CopyMode::Owned);
        assert_eq!(owned.ownership(), ArrayOwnership::Owned);
        assert_eq!(owned.array(), m.array());
        assert_eq!(owned.axes_metadata(), m.axes_metadata());
    }

    #[test]
    fn compute_is_idempotent() {
        let m = images().mean(None).unwrap();
        assert!(!m.is_computed());
        let computed = m.compute();
        assert!(computed.is_computed());
        assert_eq!(computed.compute().array(), m.array());
    }

    #[test]
    fn concatenation_appends_ordinal_values() {
        let m = images();
        let joined = m.concatenate(&m.copy(CopyMode::View), 1).unwrap();
        assert_eq!(joined.shape(), vec![2, 6, 4, 4]);
        assert_eq!(joined.ensemble_axes_metadata()[1].len(), Some(6));
        let other = Images::from_array(ramp(&[2, 3, 4, 4]), ImageGrid::new((0.25, 0.5))).unwrap();
        assert!(matches!(
            m.concatenate(&other, 0),
            Err(MeasurementError::IncompatibleMeasurement(_))
        ));
    }

    #[test]
    fn signal_axes_list_navigation_first() {
        let axes = images().signal_axes();
        assert_eq!(axes.len(), 4);
        assert!(axes[0].navigate && axes[1].navigate);
        assert!(!axes[2].navigate);
        assert_eq!(axes[2].scale, Some(0.5));
        assert_eq!(axes[3].units.as_deref(), Some("Å"));
        assert_eq!(axes[1].units.as_deref(), Some("Å"));
        assert_eq!(axes[0].scale, None);
    }
}

//! Ensemble/base axis bookkeeping shared by every measurement kind.
//!
//! Implementors supply the ensemble and base halves of the shape and of the
//! axis metadata; everything else (axis indices, scan detection, invariant
//! checks) is derived here.

use super::metadata::{AxisMetadata, AxisVariant};
use crate::error::{MeasurementError, Result};

/// Longest run of trailing scan axes considered a scan grid.
pub const MAX_SCAN_AXES: usize = 2;

pub trait HasAxes {
    fn ensemble_shape(&self) -> Vec<usize>;
    fn base_shape(&self) -> Vec<usize>;
    fn ensemble_axes_metadata(&self) -> &[AxisMetadata];
    fn base_axes_metadata(&self) -> Vec<AxisMetadata>;

    fn axes_metadata(&self) -> Vec<AxisMetadata> {
        let mut axes = self.ensemble_axes_metadata().to_vec();
        axes.extend(self.base_axes_metadata());
        axes
    }

    fn num_ensemble_axes(&self) -> usize {
        self.ensemble_axes_metadata().len()
    }

    fn num_base_axes(&self) -> usize {
        self.base_axes_metadata().len()
    }

    fn num_axes(&self) -> usize {
        self.num_ensemble_axes() + self.num_base_axes()
    }

    fn ensemble_axes(&self) -> Vec<usize> {
        (0..self.num_ensemble_axes()).collect()
    }

    fn base_axes(&self) -> Vec<usize> {
        let start = self.num_ensemble_axes();
        (start..start + self.num_base_axes()).collect()
    }

    fn shape(&self) -> Vec<usize> {
        let mut shape = self.ensemble_shape();
        shape.extend(self.base_shape());
        shape
    }

    /// Rank and ordinal-length invariants.
    fn check_axes_metadata(&self) -> Result<()> {
        let shape = self.shape();
        if shape.len() != self.num_axes() {
            return Err(MeasurementError::AxesMismatch(format!(
                "number of dimensions ({}) does not match number of axis metadata items ({})",
                shape.len(),
                self.num_axes()
            )));
        }
        for (i, (n, axis)) in shape.iter().zip(self.axes_metadata()).enumerate() {
            if let Some(len) = axis.len() {
                if len != *n {
                    return Err(MeasurementError::AxesMismatch(format!(
                        "ordinal axis '{}' at dimension {i} has {len} values but the dimension has size {n}",
                        axis.label
                    )));
                }
            }
        }
        Ok(())
    }

    fn is_base_axis(&self, axes: &[usize]) -> bool {
        let base = self.base_axes();
        axes.iter().any(|a| base.contains(a))
    }

    /// Indices of every axis whose variant is `variant` or derives from it.
    fn find_axes_type(&self, variant: AxisVariant) -> Vec<usize> {
        self.axes_metadata()
            .iter()
            .enumerate()
            .filter_map(|(i, axis)| axis.is_a(variant).then_some(i))
            .collect()
    }

    /// Trailing ensemble axes (at most two) that form the scan grid.
    fn scan_axes(&self) -> Vec<usize> {
        let ensemble = self.ensemble_axes_metadata();
        let trailing = ensemble
            .iter()
            .rev()
            .take(MAX_SCAN_AXES)
            .take_while(|axis| axis.is_a(AxisVariant::Scan))
            .count();
        (ensemble.len() - trailing..ensemble.len()).collect()
    }

    fn num_scan_axes(&self) -> usize {
        self.scan_axes().len()
    }

    fn scan_axes_metadata(&self) -> Vec<AxisMetadata> {
        let ensemble = self.ensemble_axes_metadata();
        self.scan_axes()
            .into_iter()
            .map(|i| ensemble[i].clone())
            .collect()
    }

    fn scan_shape(&self) -> Vec<usize> {
        let shape = self.ensemble_shape();
        self.scan_axes().into_iter().map(|i| shape[i]).collect()
    }

    fn scan_sampling(&self) -> Vec<f64> {
        self.scan_axes_metadata()
            .iter()
            .filter_map(AxisMetadata::sampling)
            .collect()
    }

    /// Axes flagged for averaging by downstream statistical aggregation.
    fn ensemble_axes_to_reduce(&self) -> Vec<usize> {
        self.axes_metadata()
            .iter()
            .enumerate()
            .filter_map(|(i, axis)| axis.ensemble_mean.then_some(i))
            .collect()
    }
}

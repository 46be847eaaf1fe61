//! Line profiles: one real-space base axis along a straight line.

use super::{BaseGrid, Measurement, MeasurementTag};
use crate::axes::{AxisMetadata, HasAxes};
use crate::element::Element;
use crate::error::{MeasurementError, Result};
use serde::{Deserialize, Serialize};

/// Line from `start` to `end` in Å; with `endpoint` the last sample sits on `end`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineGrid {
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub endpoint: bool,
}

impl LineGrid {
    pub fn new(start: [f64; 2], end: [f64; 2], endpoint: bool) -> Self {
        Self {
            start,
            end,
            endpoint,
        }
    }

    /// Line along x from the origin covering `gpts` samples of `sampling`.
    pub fn from_sampling(sampling: f64, gpts: usize) -> Self {
        Self::new([0.0, 0.0], [sampling * gpts as f64, 0.0], false)
    }

    pub fn extent(&self) -> f64 {
        (self.end[0] - self.start[0]).hypot(self.end[1] - self.start[1])
    }

    /// Spacing of `gpts` samples along the line.
    pub fn sampling(&self, gpts: usize) -> f64 {
        let intervals = if self.endpoint {
            gpts.saturating_sub(1)
        } else {
            gpts
        };
        if intervals == 0 {
            return self.extent();
        }
        self.extent() / intervals as f64
    }
}

impl BaseGrid for LineGrid {
    const TAG: MeasurementTag = MeasurementTag::LineProfiles;
    const NUM_BASE_AXES: usize = 1;

    fn base_axes_metadata(&self, base_shape: &[usize]) -> Vec<AxisMetadata> {
        let gpts = base_shape.first().copied().unwrap_or(0);
        vec![AxisMetadata::real_space("r", self.sampling(gpts), "Å").with_endpoint(self.endpoint)]
    }

    fn validate(&self, base_shape: &[usize]) -> Result<()> {
        if base_shape.first().copied().unwrap_or(0) > 1 && self.extent() == 0.0 {
            return Err(MeasurementError::Configuration(
                "line profile start and end coincide".to_string(),
            ));
        }
        Ok(())
    }
}

pub type LineProfiles<T = f64> = Measurement<LineGrid, T>;

impl<T: Element> Measurement<LineGrid, T> {
    pub fn start(&self) -> [f64; 2] {
        self.grid().start
    }

    pub fn end(&self) -> [f64; 2] {
        self.grid().end
    }

    pub fn gpts(&self) -> usize {
        self.base_shape()[0]
    }

    pub fn extent(&self) -> f64 {
        self.grid().extent()
    }

    pub fn sampling(&self) -> f64 {
        self.grid().sampling(self.gpts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn sampling_depends_on_endpoint() {
        let closed = LineGrid::new([0.0, 0.0], [3.0, 4.0], true);
        assert!(approx_eq(closed.extent(), 5.0));
        assert!(approx_eq(closed.sampling(11), 0.5));
        let open = LineGrid::new([0.0, 0.0], [3.0, 4.0], false);
        assert!(approx_eq(open.sampling(10), 0.5));
    }

    #[test]
    fn from_sampling_round_trips() {
        let grid = LineGrid::from_sampling(0.2, 15);
        let profiles = LineProfiles::from_array(ArrayD::<f64>::zeros(IxDyn(&[3, 15])), grid).unwrap();
        assert!(approx_eq(profiles.sampling(), 0.2));
        assert!(approx_eq(profiles.extent(), 3.0));
        let base = profiles.base_axes_metadata();
        assert_eq!(base[0].sampling(), Some(profiles.sampling()));
        assert_eq!(profiles.num_ensemble_axes(), 1);
    }

    #[test]
    fn degenerate_line_is_rejected() {
        let grid = LineGrid::new([1.0, 1.0], [1.0, 1.0], true);
        assert!(LineProfiles::from_array(ArrayD::<f64>::zeros(IxDyn(&[4])), grid).is_err());
    }
}

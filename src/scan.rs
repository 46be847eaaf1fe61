//! Straight-line scan geometry.
//!
//! A `LineScan` places `gpts` equally spaced positions on the segment from
//! `start` to `end`, extended by `margin` at both ends. With `endpoint` set
//! the last position lands exactly on the extended end point.

use crate::error::{MeasurementError, Result};
use nalgebra::Vector2;

#[derive(Clone, Debug, PartialEq)]
pub struct LineScan {
    start: Vector2<f64>,
    end: Vector2<f64>,
    gpts: usize,
    margin: f64,
    endpoint: bool,
}

impl LineScan {
    pub fn new(
        start: Vector2<f64>,
        end: Vector2<f64>,
        gpts: usize,
        margin: f64,
        endpoint: bool,
    ) -> Result<Self> {
        if gpts == 0 {
            return Err(MeasurementError::Configuration(
                "line scan needs at least one grid point".to_string(),
            ));
        }
        if (end - start).norm() == 0.0 && margin == 0.0 && gpts > 1 {
            return Err(MeasurementError::Configuration(
                "line scan start and end coincide".to_string(),
            ));
        }
        Ok(Self {
            start,
            end,
            gpts,
            margin,
            endpoint,
        })
    }

    /// Scan whose point count is chosen so the spacing is at most `sampling`.
    pub fn with_sampling(
        start: Vector2<f64>,
        end: Vector2<f64>,
        sampling: f64,
        margin: f64,
        endpoint: bool,
    ) -> Result<Self> {
        if sampling.is_nan() || sampling <= 0.0 {
            return Err(MeasurementError::Configuration(format!(
                "line sampling must be positive, got {sampling}"
            )));
        }
        let extent = (end - start).norm() + 2.0 * margin;
        let intervals = (extent / sampling).ceil().max(1.0) as usize;
        let gpts = if endpoint { intervals + 1 } else { intervals };
        Self::new(start, end, gpts, margin, endpoint)
    }

    /// End point of the ray leaving `start` at `angle` degrees (from +x),
    /// clipped to the box `[0, extent.0] x [0, extent.1]`.
    pub fn end_from_angle(start: Vector2<f64>, angle: f64, extent: (f64, f64)) -> Vector2<f64> {
        let direction = Vector2::new(angle.to_radians().cos(), angle.to_radians().sin());
        let bounds = [extent.0, extent.1];
        let mut reach = f64::INFINITY;
        for axis in 0..2 {
            let d = direction[axis];
            if d.abs() < 1e-12 {
                continue;
            }
            let wall = if d > 0.0 { bounds[axis] } else { 0.0 };
            let t = (wall - start[axis]) / d;
            if t >= 0.0 {
                reach = reach.min(t);
            }
        }
        if !reach.is_finite() {
            reach = 0.0;
        }
        start + direction * reach
    }

    pub fn start(&self) -> Vector2<f64> {
        self.start
    }

    pub fn end(&self) -> Vector2<f64> {
        self.end
    }

    pub fn gpts(&self) -> usize {
        self.gpts
    }

    pub fn endpoint(&self) -> bool {
        self.endpoint
    }

    /// Unit vector from start to end; +x for a degenerate segment.
    pub fn direction(&self) -> Vector2<f64> {
        let delta = self.end - self.start;
        let norm = delta.norm();
        if norm > 0.0 {
            delta / norm
        } else {
            Vector2::x()
        }
    }

    pub fn margin_start(&self) -> Vector2<f64> {
        self.start - self.direction() * self.margin
    }

    pub fn margin_end(&self) -> Vector2<f64> {
        self.end + self.direction() * self.margin
    }

    /// Length of the extended segment.
    pub fn extent(&self) -> f64 {
        (self.margin_end() - self.margin_start()).norm()
    }

    pub fn sampling(&self) -> f64 {
        let intervals = if self.endpoint {
            self.gpts.saturating_sub(1).max(1)
        } else {
            self.gpts
        };
        self.extent() / intervals as f64
    }

    pub fn positions(&self) -> Vec<Vector2<f64>> {
        let origin = self.margin_start();
        let step = self.direction() * self.sampling();
        (0..self.gpts).map(|i| origin + step * i as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn endpoint_positions_span_the_segment() {
        let scan = LineScan::new(Vector2::new(0.0, 0.0), Vector2::new(4.0, 0.0), 5, 0.0, true).unwrap();
        let positions = scan.positions();
        assert!(approx_eq(scan.sampling(), 1.0));
        assert!(approx_eq(positions[4].x, 4.0));
        let open = LineScan::new(Vector2::new(0.0, 0.0), Vector2::new(4.0, 0.0), 4, 0.0, false).unwrap();
        assert!(approx_eq(open.positions()[3].x, 3.0));
    }

    #[test]
    fn margin_extends_both_ends() {
        let scan = LineScan::new(Vector2::new(1.0, 1.0), Vector2::new(1.0, 3.0), 3, 0.5, true).unwrap();
        assert!(approx_eq(scan.margin_start().y, 0.5));
        assert!(approx_eq(scan.margin_end().y, 3.5));
        assert!(approx_eq(scan.extent(), 3.0));
    }

    #[test]
    fn sampling_sets_point_count() {
        let scan = LineScan::with_sampling(Vector2::zeros(), Vector2::new(3.0, 4.0), 0.5, 0.0, true).unwrap();
        assert_eq!(scan.gpts(), 11);
        assert!(approx_eq(scan.sampling(), 0.5));
        assert!(LineScan::with_sampling(Vector2::zeros(), Vector2::x(), 0.0, 0.0, true).is_err());
    }

    #[test]
    fn ray_is_clipped_to_extent() {
        let end = LineScan::end_from_angle(Vector2::new(1.0, 1.0), 0.0, (10.0, 5.0));
        assert!(approx_eq(end.x, 10.0) && approx_eq(end.y, 1.0));
        let diag = LineScan::end_from_angle(Vector2::new(0.0, 0.0), 45.0, (10.0, 5.0));
        assert!(approx_eq(diag.x, 5.0) && approx_eq(diag.y, 5.0));
    }
}

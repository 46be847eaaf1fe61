//! Polar binning and resampling engine for Fourier-space grids.
//!
//! - `bins`: pixel to (radial, azimuthal) bin assignment and its inverse.
//! - `rle`: run-length-encoded segment sums over bin-sorted pixels.
//! - `resample`: bracketing bilinear resampling onto a new angular sampling.
//! - `intgrad`: frequency-domain inverse gradient (integrated center of mass).

pub mod bins;
pub mod intgrad;
pub mod resample;
pub mod rle;

pub use bins::{angular_coordinates, polar_detector_bins, BinIndices, PolarLayout};
pub use intgrad::intgrad2d;
pub use resample::{bilinear_nodes_and_weights, interpolate_bilinear, resampled_gpts, AxisNodes, ResampleMode};
pub use rle::{sum_positions, sum_run_length_encoded};

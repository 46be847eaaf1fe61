#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod axes;
pub mod error;
pub mod measurement;
pub mod select;

// Numerical building blocks used by the measurement transforms.
pub mod element;
pub mod fft;
pub mod filters;
pub mod lazy;
pub mod polar;
pub mod scan;

// Tooling support.
pub mod config;
pub mod io;

// --- High-level re-exports -------------------------------------------------

pub use crate::axes::{AxisMetadata, AxisVariant, HasAxes};
pub use crate::error::{MeasurementError, Result};
pub use crate::measurement::{
    AnyMeasurement, DiffractionGrid, DiffractionPatterns, ImageGrid, Images, LineGrid,
    LineProfiles, Measurement, PolarGrid, PolarMeasurements,
};
pub use crate::polar::{PolarLayout, ResampleMode};
pub use crate::select::Selector;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use scan_measurements::prelude::*;
/// use ndarray::{ArrayD, IxDyn};
///
/// # fn main() -> scan_measurements::Result<()> {
/// let patterns = DiffractionPatterns::from_array(
///     ArrayD::from_elem(IxDyn(&[4, 4, 64, 64]), 1.0),
///     DiffractionGrid::new((1.0, 1.0), true),
/// )?
/// .with_ensemble_axes(vec![
///     AxisMetadata::scan("x", 0.2, "Å"),
///     AxisMetadata::scan("y", 0.2, "Å"),
/// ])?;
///
/// let polar = patterns.polar_binning(&PolarLayout::new(4, 1, 0.0, 32.0))?;
/// println!("polar shape {:?}", polar.shape());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::axes::{AxisMetadata, HasAxes};
    pub use crate::measurement::{
        DiffractionGrid, DiffractionPatterns, ImageGrid, Images, PolarIntegration,
    };
    pub use crate::polar::PolarLayout;
    pub use crate::select::Selector;
}

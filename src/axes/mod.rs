//! Axis metadata hierarchy and the ensemble/base bookkeeping built on it.

pub mod has_axes;
pub mod metadata;
pub mod ordinal;

pub use has_axes::{HasAxes, MAX_SCAN_AXES};
pub use metadata::{AxisKind, AxisMetadata, AxisVariant};
pub use ordinal::{ordinal_values, OrdinalValue};

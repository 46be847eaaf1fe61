//! JSON configuration for the command-line tools.

pub mod diffraction_tool;

pub use diffraction_tool::{load_config, DiffractionToolConfig};

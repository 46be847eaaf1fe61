use crate::polar::{PolarLayout, ResampleMode};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct DiffractionToolConfig {
    /// Directory store holding a `DiffractionPatterns` measurement.
    pub input: PathBuf,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub polar: Option<PolarConfig>,
    #[serde(default)]
    pub radial: Option<RadialConfig>,
    #[serde(default)]
    pub center_of_mass: bool,
    pub output: DiffractionOutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Resampling mode name, e.g. `"uniform"`.
    pub resample: Option<String>,
    pub block_direct: bool,
    /// Direct-beam radius in mrad; defaults to 1.1 x the coarser sampling.
    pub block_radius: Option<f64>,
    /// Ensemble chunk length used by blockwise kernels.
    pub chunk_len: Option<usize>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            resample: None,
            block_direct: false,
            block_radius: None,
            chunk_len: None,
        }
    }
}

impl PreprocessConfig {
    pub fn resample_mode(&self) -> Result<Option<ResampleMode>, String> {
        self.resample
            .as_deref()
            .map(|mode| ResampleMode::parse(mode).map_err(|e| e.to_string()))
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
pub struct PolarConfig {
    pub nbins_radial: usize,
    pub nbins_azimuthal: usize,
    #[serde(default)]
    pub inner: f64,
    pub outer: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl PolarConfig {
    pub fn layout(&self) -> PolarLayout {
        PolarLayout::new(self.nbins_radial, self.nbins_azimuthal, self.inner, self.outer)
            .with_rotation(self.rotation)
    }
}

#[derive(Debug, Deserialize)]
pub struct RadialConfig {
    #[serde(default)]
    pub inner: f64,
    pub outer: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiffractionOutputConfig {
    /// Directory store for the polar measurement.
    pub polar_store: Option<PathBuf>,
    pub radial_png: Option<PathBuf>,
    pub icom_png: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<DiffractionToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_default_when_missing() {
        let config: DiffractionToolConfig =
            serde_json::from_str(r#"{"input": "patterns", "output": {}}"#).unwrap();
        assert_eq!(config.input, PathBuf::from("patterns"));
        assert!(!config.preprocess.block_direct);
        assert!(config.polar.is_none());
        assert_eq!(config.preprocess.resample_mode().unwrap(), None);
    }

    #[test]
    fn polar_section_builds_layout() {
        let config: DiffractionToolConfig = serde_json::from_str(
            r#"{
                "input": "patterns",
                "preprocess": {"resample": "uniform"},
                "polar": {"nbins_radial": 4, "nbins_azimuthal": 8, "outer": 30.0},
                "output": {"summary_json": "out/summary.json"}
            }"#,
        )
        .unwrap();
        let layout = config.polar.unwrap().layout();
        assert_eq!(layout.num_bins(), 32);
        assert_eq!(layout.inner, 0.0);
        assert_eq!(
            config.preprocess.resample_mode().unwrap(),
            Some(ResampleMode::Uniform)
        );
    }

    #[test]
    fn unknown_resample_mode_is_reported() {
        let preprocess = PreprocessConfig {
            resample: Some("cubic".to_string()),
            ..PreprocessConfig::default()
        };
        assert!(preprocess.resample_mode().is_err());
    }
}

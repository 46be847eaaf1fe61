use env_logger::{Builder, Env};
use log::info;
use scan_measurements::config::{load_config, DiffractionToolConfig};
use scan_measurements::io::{save_slice_png, write_json_file};
use scan_measurements::measurement::{DiffractionPatterns, DirectoryStore, ScanMeasurement};
use scan_measurements::HasAxes;
use serde::Serialize;
use std::env;
use std::path::Path;

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;

    let store = DirectoryStore::new(&config.input);
    let mut patterns = DiffractionPatterns::<f64>::from_store(&store)
        .map_err(|e| format!("Failed to load {}: {e}", config.input.display()))?;
    info!(
        "loaded diffraction patterns {:?} at {:?} mrad",
        patterns.shape(),
        patterns.angular_sampling()
    );
    let mut summary = ToolSummary {
        input_shape: patterns.shape(),
        ..ToolSummary::default()
    };

    patterns = preprocess(patterns, &config)?;
    summary.angular_sampling = patterns.angular_sampling();
    summary.max_angles = patterns.max_angles();

    if let Some(polar) = &config.polar {
        let measurement = patterns
            .polar_binning(&polar.layout())
            .map_err(|e| e.to_string())?;
        summary.polar_shape = Some(measurement.shape());
        if let Some(dir) = &config.output.polar_store {
            let mut out = DirectoryStore::new(dir);
            measurement.to_store(&mut out).map_err(|e| e.to_string())?;
            info!("saved polar measurement to {}", dir.display());
        }
    }

    if let Some(radial) = &config.radial {
        let integrated = patterns
            .integrate_radial(radial.inner, radial.outer)
            .map_err(|e| e.to_string())?;
        summary.radial_shape = Some(integrated.shape());
        match (integrated, &config.output.radial_png) {
            (ScanMeasurement::Image(images), Some(path)) => {
                let slice = images.display_slice().map_err(|e| e.to_string())?;
                save_slice_png(&slice, 1.0, path)?;
                info!("saved radial integration to {}", path.display());
            }
            (ScanMeasurement::Line(_), Some(path)) => {
                info!("line scan result, skipping image {}", path.display());
            }
            (_, None) => {}
        }
    }

    if config.center_of_mass {
        let icom = patterns
            .integrated_center_of_mass()
            .map_err(|e| e.to_string())?;
        summary.icom_shape = Some(icom.shape());
        if let Some(path) = &config.output.icom_png {
            let slice = icom.display_slice().map_err(|e| e.to_string())?;
            save_slice_png(&slice, 1.0, path)?;
            info!("saved integrated center of mass to {}", path.display());
        }
    }

    if let Some(path) = &config.output.summary_json {
        write_json_file(path, &summary)?;
        println!("Saved summary to {}", path.display());
    }
    Ok(())
}

fn preprocess(
    patterns: DiffractionPatterns,
    config: &DiffractionToolConfig,
) -> Result<DiffractionPatterns, String> {
    let mut patterns = match config.preprocess.chunk_len {
        Some(n) => patterns.rechunk(n),
        None => patterns,
    };
    if let Some(mode) = config.preprocess.resample_mode()? {
        patterns = patterns.interpolate(mode).map_err(|e| e.to_string())?;
        info!("resampled to {:?}", patterns.base_shape());
    }
    if config.preprocess.block_direct {
        patterns = patterns
            .block_direct(config.preprocess.block_radius)
            .map_err(|e| e.to_string())?;
    }
    Ok(patterns)
}

fn usage() -> String {
    "Usage: diffraction_tool <config.json>".to_string()
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSummary {
    input_shape: Vec<usize>,
    angular_sampling: (f64, f64),
    max_angles: (f64, f64),
    polar_shape: Option<Vec<usize>>,
    radial_shape: Option<Vec<usize>>,
    icom_shape: Option<Vec<usize>>,
}

//! I/O helpers for rendered slices and JSON.
//!
//! - `save_slice_png`: write a `DisplaySlice` to an 8-bit grayscale PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use crate::measurement::DisplaySlice;
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Save a display slice as a grayscale PNG.
///
/// Values are raised to `power`, then stretched to [0, 255] between their
/// minimum and maximum. The first base axis runs left to right and the second
/// bottom to top.
pub fn save_slice_png(slice: &DisplaySlice, power: f64, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let (nx, ny) = slice.values.dim();
    if nx == 0 || ny == 0 {
        return Err(format!("Cannot render an empty {nx}x{ny} slice"));
    }
    let values = slice.values.mapv(|v| v.powf(power));
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = if hi > lo { hi - lo } else { 1.0 };

    let mut out = GrayImage::new(nx as u32, ny as u32);
    for ((x, y), &v) in values.indexed_iter() {
        let scaled = if v.is_finite() {
            ((v - lo) / range * 255.0).clamp(0.0, 255.0)
        } else {
            0.0
        };
        out.put_pixel(x as u32, (ny - 1 - y) as u32, Luma([scaled as u8]));
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

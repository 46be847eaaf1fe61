use ndarray::{Array2, ArrayD, IxDyn};
use scan_measurements::axes::AxisMetadata;
use scan_measurements::measurement::{DiffractionGrid, DiffractionPatterns, ImageGrid, Images};
use std::f64::consts::TAU;

/// Two scan axes with the given sampling in Å.
pub fn scan_axes(sampling: (f64, f64)) -> Vec<AxisMetadata> {
    vec![
        AxisMetadata::scan("x", sampling.0, "Å"),
        AxisMetadata::scan("y", sampling.1, "Å"),
    ]
}

/// Diffraction patterns on a `scan` grid whose pixels hold `f(scan_x, scan_y, i, j)`.
pub fn patterns_from_fn<F>(
    scan: (usize, usize),
    gpts: (usize, usize),
    sampling: (f64, f64),
    f: F,
) -> DiffractionPatterns
where
    F: Fn(usize, usize, usize, usize) -> f64,
{
    let data = ArrayD::from_shape_fn(IxDyn(&[scan.0, scan.1, gpts.0, gpts.1]), |ix| {
        f(ix[0], ix[1], ix[2], ix[3])
    });
    DiffractionPatterns::from_array(data, DiffractionGrid::new(sampling, true))
        .expect("valid diffraction grid")
        .with_ensemble_axes(scan_axes((0.5, 0.5)))
        .expect("two scan axes")
}

/// Patterns of constant intensity.
pub fn uniform_patterns(
    scan: (usize, usize),
    gpts: (usize, usize),
    sampling: (f64, f64),
) -> DiffractionPatterns {
    patterns_from_fn(scan, gpts, sampling, |_, _, _, _| 1.0)
}

/// Deterministic non-negative texture, different for every scan position.
pub fn textured_patterns(
    scan: (usize, usize),
    gpts: (usize, usize),
    sampling: (f64, f64),
) -> DiffractionPatterns {
    patterns_from_fn(scan, gpts, sampling, |sx, sy, i, j| {
        ((sx * 7 + sy * 13 + i * 3 + j * 5) % 11) as f64 + 0.5
    })
}

/// Single real image of `cos(2 pi x / extent)` along the first axis.
pub fn cosine_image(gpts: (usize, usize), sampling: (f64, f64)) -> Images {
    let image = Array2::from_shape_fn(gpts, |(i, _)| (TAU * i as f64 / gpts.0 as f64).cos());
    Images::from_array(image.into_dyn(), ImageGrid::new(sampling)).expect("valid image grid")
}

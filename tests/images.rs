mod common;

use common::synthetic::cosine_image;
use scan_measurements::axes::HasAxes;
use scan_measurements::filters::Boundary;
use scan_measurements::measurement::{ImageInterpolation, LineSpec};
use std::f64::consts::TAU;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn fourier_upsampling_keeps_band_limited_values() {
    let image = cosine_image((16, 8), (0.5, 0.5));
    let fine = image.interpolate(&ImageInterpolation::to_gpts((32, 16))).unwrap();
    assert_eq!(fine.sampling(), (0.25, 0.25));
    assert_eq!(fine.extent(), image.extent());
    let array = fine.array();
    for i in 0..32 {
        let expected = (TAU * i as f64 / 32.0).cos();
        for j in 0..16 {
            assert!(approx_eq(array[[i, j]], expected), "({i}, {j})");
        }
    }
}

#[test]
fn fourier_downsampling_round_trips() {
    let image = cosine_image((16, 16), (0.5, 0.5));
    let coarse = image.interpolate(&ImageInterpolation::to_sampling((1.0, 1.0))).unwrap();
    assert_eq!(coarse.gpts(), (8, 8));
    let restored = coarse.interpolate(&ImageInterpolation::to_gpts((16, 16))).unwrap();
    for (a, b) in restored.array().iter().zip(image.array().iter()) {
        assert!(approx_eq(*a, *b));
    }
}

#[test]
fn line_along_the_modulated_axis_follows_the_cosine() {
    let image = cosine_image((16, 16), (0.5, 0.5));
    let line = image
        .interpolate_line(&LineSpec {
            gpts: Some(17),
            ..LineSpec::between([0.0, 1.0], [8.0, 1.0])
        })
        .unwrap();
    assert_eq!(line.shape(), vec![17]);
    assert!(approx_eq(line.sampling(), 0.5));
    let values = line.array();
    for k in 0..16 {
        let expected = (TAU * k as f64 / 16.0).cos();
        assert!(approx_eq(values[[k]], expected), "sample {k}");
    }
    // periodic wrap at the far edge
    assert!(approx_eq(values[[16]], 1.0));
}

#[test]
fn smoothing_keeps_total_and_damps_extremes() {
    let image = cosine_image((16, 16), (0.5, 0.5));
    let smooth = image.gaussian_filter((0.5, 0.5), Boundary::Periodic).unwrap();
    assert!(approx_eq(smooth.array().sum(), image.array().sum()));
    let peak = smooth.array()[[0, 0]];
    assert!(peak < 1.0 && peak > 0.5);
}

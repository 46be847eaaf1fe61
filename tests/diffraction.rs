mod common;

use common::synthetic::{patterns_from_fn, scan_axes, textured_patterns, uniform_patterns};
use ndarray::{ArrayD, IxDyn};
use scan_measurements::axes::{AxisMetadata, HasAxes};
use scan_measurements::measurement::{
    CopyMode, DiffractionGrid, DiffractionPatterns, ScanMeasurement,
};
use scan_measurements::polar::ResampleMode;
use scan_measurements::MeasurementError;
use std::f64::consts::TAU;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

#[test]
fn fourier_space_extent_even_and_odd() {
    let even = uniform_patterns((1, 1), (64, 64), (1.0, 1.0));
    assert_eq!(even.fourier_space_extent(), ((-32.0, 31.0), (-32.0, 31.0)));
    let odd = uniform_patterns((1, 1), (63, 63), (1.0, 1.0));
    assert_eq!(odd.fourier_space_extent(), ((-31.0, 31.0), (-31.0, 31.0)));
}

#[test]
fn radial_integration_on_two_scan_axes_gives_images() {
    let patterns = uniform_patterns((3, 4), (16, 16), (1.0, 1.0));
    let integrated = patterns.integrate_radial(0.0, 1.2).unwrap();
    let ScanMeasurement::Image(images) = integrated else {
        panic!("two scan axes should produce images");
    };
    assert_eq!(images.shape(), vec![3, 4]);
    assert_eq!(images.sampling(), (0.5, 0.5));
    assert!(images.array().iter().all(|&v| v == 5.0));
}

#[test]
fn radial_integration_keeps_leading_ensemble_axes() {
    let data = ArrayD::<f64>::from_elem(IxDyn(&[2, 3, 4, 8, 8]), 2.0);
    let mut axes = vec![AxisMetadata::frozen_phonons(2)];
    axes.extend(scan_axes((0.25, 0.5)));
    let patterns = DiffractionPatterns::from_array(data, DiffractionGrid::new((1.0, 1.0), true))
        .unwrap()
        .with_ensemble_axes(axes)
        .unwrap();
    let images = patterns
        .integrate_radial(0.0, 1.0)
        .unwrap()
        .into_images()
        .unwrap();
    assert_eq!(images.shape(), vec![2, 3, 4]);
    assert_eq!(images.num_ensemble_axes(), 1);
    assert_eq!(images.sampling(), (0.25, 0.5));
    assert!(images.array().iter().all(|&v| v == 2.0));
}

#[test]
fn integration_angle_is_checked() {
    let patterns = uniform_patterns((1, 1), (16, 16), (1.0, 1.0));
    assert!(matches!(
        patterns.integrate_radial(0.0, 9.0),
        Err(MeasurementError::AngleOutOfRange { .. })
    ));
}

#[test]
fn block_direct_with_explicit_radius() {
    let patterns = uniform_patterns((2, 2), (16, 16), (0.5, 0.5));
    let blocked = patterns.block_direct(Some(1.01)).unwrap();
    let array = blocked.array();
    // |alpha| < 1.01 mrad: r^2 in {0, 0.25, 0.5, 1.0} -> 1 + 4 + 4 + 4 pixels
    let zeros = array.iter().filter(|&&v| v == 0.0).count();
    assert_eq!(zeros, 4 * 13);
    assert_eq!(blocked.axes_metadata(), patterns.axes_metadata());
}

#[test]
fn uniform_resampling_of_anisotropic_grid() {
    let patterns = patterns_from_fn((1, 2), (32, 64), (1.0, 0.5), |_, _, i, _| i as f64);
    let resampled = patterns.interpolate(ResampleMode::Uniform).unwrap();
    assert_eq!(resampled.gpts(), (32, 32));
    assert_eq!(resampled.angular_sampling(), (1.0, 1.0));
    assert_eq!(resampled.ensemble_shape(), vec![1, 2]);
    // the first axis is untouched
    let array = resampled.array();
    for i in 0..32 {
        assert!(approx_eq(array[[0, 1, i, 7]], i as f64, 1e-9));
    }
    assert!(matches!(
        "bilinear".parse::<ResampleMode>(),
        Err(MeasurementError::UnsupportedMode(_))
    ));
}

#[test]
fn center_of_mass_requires_two_scan_axes() {
    let data = ArrayD::<f64>::from_elem(IxDyn(&[4, 8, 8]), 1.0);
    let patterns = DiffractionPatterns::from_array(data, DiffractionGrid::new((1.0, 1.0), true))
        .unwrap()
        .with_ensemble_axes(vec![AxisMetadata::scan("x", 0.1, "Å")])
        .unwrap();
    assert!(matches!(
        patterns.center_of_mass(),
        Err(MeasurementError::Configuration(_))
    ));
}

#[test]
fn integrated_center_of_mass_recovers_potential() {
    let n = 16;
    let sampling = 0.5;
    let period = n as f64 * sampling;
    let center = 8;
    // com_x = d/dx cos(2 pi x / period), com_y = 0
    let patterns = patterns_from_fn((n, n), (16, 16), (1.0, 1.0), |sx, _, i, j| {
        let x = sx as f64 * sampling;
        let gx = -TAU / period * (TAU * x / period).sin();
        if i == center + 1 && j == center {
            gx
        } else {
            0.0
        }
    });
    let com = patterns.center_of_mass().unwrap();
    assert_eq!(com.shape(), vec![n, n]);
    let icom = patterns.integrated_center_of_mass().unwrap();
    assert_eq!(icom.sampling(), (sampling, sampling));
    let array = icom.array();
    for sx in 0..n {
        let x = sx as f64 * sampling;
        let expected = (TAU * x / period).cos() + 1.0;
        for sy in 0..n {
            assert!(
                approx_eq(array[[sx, sy]], expected, 1e-9),
                "({sx}, {sy}): {} vs {expected}",
                array[[sx, sy]]
            );
        }
    }
}

#[test]
fn view_copies_integrate_identically() {
    let patterns = textured_patterns((2, 2), (16, 16), (1.0, 1.0));
    let view = patterns.copy(CopyMode::View);
    let a = patterns.integrate_radial(0.0, 8.0).unwrap();
    let b = view.integrate_radial(0.0, 8.0).unwrap();
    assert_eq!(a.array(), b.array());
}

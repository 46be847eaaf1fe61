mod common;

use common::synthetic::{cosine_image, textured_patterns};
use num_complex::Complex64;
use scan_measurements::axes::{ordinal_values, AxisMetadata, HasAxes};
use scan_measurements::element::Element;
use scan_measurements::measurement::{
    AnyMeasurement, BaseGrid, DirectoryStore, ImageGrid, Images, LineSpec, Measurement,
    MeasurementTag, MemoryStore,
};
use scan_measurements::polar::PolarLayout;
use std::fs;
use std::path::{Path, PathBuf};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "scan_measurements_{name}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn assert_round_trip<G: BaseGrid, T: Element>(
    measurement: &Measurement<G, T>,
    dir: &Path,
    tag: MeasurementTag,
) {
    let mut store = DirectoryStore::new(dir);
    measurement.to_store(&mut store).unwrap();

    let any = AnyMeasurement::from_store(&store).unwrap();
    assert_eq!(any.tag(), tag, "{}", dir.display());
    assert_eq!(any.shape(), measurement.shape(), "{}", dir.display());

    let restored = Measurement::<G, T>::from_store(&DirectoryStore::new(dir)).unwrap();
    assert_eq!(restored.array(), measurement.array(), "{}", dir.display());
    assert_eq!(restored.grid(), measurement.grid(), "{}", dir.display());
    assert_eq!(restored.axes_metadata(), measurement.axes_metadata(), "{}", dir.display());
    assert_eq!(restored.metadata(), measurement.metadata(), "{}", dir.display());
}

#[test]
fn every_kind_round_trips_through_a_directory() {
    let patterns = textured_patterns((2, 3), (16, 16), (1.0, 1.0)).with_metadata("energy", 100e3);
    let polar = patterns
        .polar_binning(&PolarLayout::new(2, 4, 0.0, 8.0))
        .unwrap();
    let adf = patterns
        .integrate_radial(2.0, 6.0)
        .unwrap()
        .into_images()
        .unwrap();
    let profile = cosine_image((16, 16), (0.5, 0.5))
        .interpolate_line(&LineSpec::between([0.0, 0.0], [4.0, 4.0]))
        .unwrap();
    let com = patterns.center_of_mass().unwrap();
    assert_eq!(polar.metadata(), patterns.metadata());

    let root = scratch_dir("kinds");
    assert_round_trip(&patterns, &root.join("patterns"), MeasurementTag::DiffractionPatterns);
    assert_round_trip(&polar, &root.join("polar"), MeasurementTag::PolarMeasurements);
    assert_round_trip(&adf, &root.join("adf"), MeasurementTag::Images);
    assert_round_trip(&profile, &root.join("profile"), MeasurementTag::LineProfiles);
    assert_round_trip(&com, &root.join("com"), MeasurementTag::Images);

    let complex = AnyMeasurement::from_store(&DirectoryStore::new(root.join("com"))).unwrap();
    let AnyMeasurement::ComplexImages(complex) = complex else {
        panic!("expected complex images");
    };
    assert_eq!(complex.array(), com.array());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn non_finite_values_survive_a_directory_round_trip() {
    let data = ndarray::Array2::from_shape_vec(
        (2, 3),
        vec![1.0, f64::NAN, f64::INFINITY, 2.0, f64::NEG_INFINITY, -0.5],
    )
    .unwrap();
    let images: Images = Images::from_array(data.into_dyn(), ImageGrid::new((0.5, 0.5))).unwrap();
    let complex: Images<Complex64> = Images::from_array(
        ndarray::arr2(&[[Complex64::new(f64::NAN, 1.0), Complex64::new(3.0, f64::INFINITY)]])
            .into_dyn(),
        ImageGrid::new((0.5, 0.5)),
    )
    .unwrap();

    let root = scratch_dir("non_finite");
    let mut store = DirectoryStore::new(root.join("real"));
    images.to_store(&mut store).unwrap();
    let restored = Images::<f64>::from_store(&store).unwrap();
    for (a, b) in restored.array().iter().zip(images.array().iter()) {
        assert!(a == b || (a.is_nan() && b.is_nan()), "{a} vs {b}");
    }

    let mut store = DirectoryStore::new(root.join("complex"));
    complex.to_store(&mut store).unwrap();
    let restored = Images::<Complex64>::from_store(&store).unwrap();
    let values: Vec<Complex64> = restored.array().iter().copied().collect();
    assert!(values[0].re.is_nan() && values[0].im == 1.0);
    assert_eq!(values[1], Complex64::new(3.0, f64::INFINITY));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn memory_store_keeps_complex_values_and_axes() {
    let data = ndarray::Array3::from_shape_fn((3, 2, 2), |(k, i, j)| {
        Complex64::new(k as f64, (i * 2 + j) as f64)
    });
    let images: Images<Complex64> = Images::from_array(
        data.into_dyn(),
        ImageGrid::new((0.2, 0.2)),
    )
    .unwrap()
    .with_ensemble_axes(vec![AxisMetadata::tilt(
        "tilt_x",
        ordinal_values([0.0, 1.0, 2.0]),
        "x",
    )])
    .unwrap();

    let mut store = MemoryStore::new();
    images.to_store(&mut store).unwrap();
    let restored = Images::<Complex64>::from_store(&store).unwrap();
    assert_eq!(restored.array(), images.array());
    assert_eq!(restored.ensemble_axes_metadata(), images.ensemble_axes_metadata());
    assert!(Images::<f64>::from_store(&store).is_err());
}

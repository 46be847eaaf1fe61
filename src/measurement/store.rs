//! Persistence of measurements to key/value stores.
//!
//! A measurement is written as one array named `"array"` (shape, ensemble
//! chunk length, dtype and row-major data) plus five attributes:
//! `ensemble_axes_metadata`, `metadata`, `kwargs` (the serialized base grid),
//! `cls` (the measurement tag) and `dtype`.

use super::{
    BaseGrid, DiffractionPatterns, Images, LineProfiles, Measurement, Metadata,
    PolarMeasurements,
};
use crate::axes::{AxisMetadata, HasAxes};
use crate::element::Element;
use crate::error::{MeasurementError, Result};
use crate::io::write_json_file;
use crate::lazy::LazyArray;
use log::debug;
use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const ARRAY_NAME: &str = "array";
const ATTRIBUTES_FILE: &str = "attributes.json";

/// Closed registry of measurement kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementTag {
    Images,
    LineProfiles,
    DiffractionPatterns,
    PolarMeasurements,
}

impl MeasurementTag {
    pub const ALL: [MeasurementTag; 4] = [
        MeasurementTag::Images,
        MeasurementTag::LineProfiles,
        MeasurementTag::DiffractionPatterns,
        MeasurementTag::PolarMeasurements,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementTag::Images => "Images",
            MeasurementTag::LineProfiles => "LineProfiles",
            MeasurementTag::DiffractionPatterns => "DiffractionPatterns",
            MeasurementTag::PolarMeasurements => "PolarMeasurements",
        }
    }

    pub fn parse(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| {
                MeasurementError::Serialization(format!("unknown measurement class '{tag}'"))
            })
    }
}

/// Array payload as written to a store.
///
/// `data` is the flat list of `f64` parts in row-major order, two per value
/// for complex arrays. Non-finite parts are written as `"NaN"`, `"inf"` and
/// `"-inf"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredArray {
    pub shape: Vec<usize>,
    pub chunk_len: usize,
    pub dtype: String,
    pub data: Value,
}

fn encode_part(value: f64) -> Value {
    if value.is_nan() {
        Value::from("NaN")
    } else if value == f64::INFINITY {
        Value::from("inf")
    } else if value == f64::NEG_INFINITY {
        Value::from("-inf")
    } else {
        Value::from(value)
    }
}

fn decode_part(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            MeasurementError::Serialization(format!("array value {n} is not a float"))
        }),
        Value::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            other => Err(MeasurementError::Serialization(format!(
                "unknown array value '{other}'"
            ))),
        },
        other => Err(MeasurementError::Serialization(format!(
            "array value should be a number, got {other}"
        ))),
    }
}

fn encode_data<'a, T: Element>(values: impl Iterator<Item = &'a T>) -> Value {
    let mut parts = Vec::new();
    for value in values {
        let c = value.to_complex();
        parts.extend([c.re, c.im][..T::COMPONENTS].iter().map(|&p| encode_part(p)));
    }
    Value::Array(parts)
}

fn decode_data<T: Element>(data: &Value) -> Result<Vec<T>> {
    let Value::Array(parts) = data else {
        return Err(MeasurementError::Serialization(
            "array data should be a list".to_string(),
        ));
    };
    if parts.len() % T::COMPONENTS != 0 {
        return Err(MeasurementError::Serialization(format!(
            "{} parts do not form {} values",
            parts.len(),
            T::DTYPE
        )));
    }
    let parts = parts.iter().map(decode_part).collect::<Result<Vec<f64>>>()?;
    Ok(parts
        .chunks_exact(T::COMPONENTS)
        .map(|c| T::from_complex(Complex64::new(c[0], c.get(1).copied().unwrap_or(0.0))))
        .collect())
}

pub trait Store {
    fn write_array(&mut self, name: &str, array: StoredArray) -> Result<()>;
    fn read_array(&self, name: &str) -> Result<StoredArray>;
    fn set_attribute(&mut self, key: &str, value: Value) -> Result<()>;
    fn attribute(&self, key: &str) -> Result<Value>;
}

fn missing(what: &str, name: &str) -> MeasurementError {
    MeasurementError::Serialization(format!("store has no {what} '{name}'"))
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    arrays: BTreeMap<String, StoredArray>,
    attributes: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn write_array(&mut self, name: &str, array: StoredArray) -> Result<()> {
        self.arrays.insert(name.to_string(), array);
        Ok(())
    }

    fn read_array(&self, name: &str) -> Result<StoredArray> {
        self.arrays
            .get(name)
            .cloned()
            .ok_or_else(|| missing("array", name))
    }

    fn set_attribute(&mut self, key: &str, value: Value) -> Result<()> {
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    fn attribute(&self, key: &str) -> Result<Value> {
        self.attributes
            .get(key)
            .cloned()
            .ok_or_else(|| missing("attribute", key))
    }
}

/// Store backed by a directory: `attributes.json` plus `<name>.json` per array.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn array_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn read_attributes(&self) -> Result<BTreeMap<String, Value>> {
        let path = self.root.join(ATTRIBUTES_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl Store for DirectoryStore {
    fn write_array(&mut self, name: &str, array: StoredArray) -> Result<()> {
        write_json_file(&self.array_path(name), &array).map_err(MeasurementError::Io)
    }

    fn read_array(&self, name: &str) -> Result<StoredArray> {
        let path = self.array_path(name);
        let data = fs::read_to_string(&path)
            .map_err(|e| MeasurementError::Io(format!("Failed to read {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&data)?)
    }

    fn set_attribute(&mut self, key: &str, value: Value) -> Result<()> {
        let mut attributes = self.read_attributes()?;
        attributes.insert(key.to_string(), value);
        write_json_file(&self.root.join(ATTRIBUTES_FILE), &attributes).map_err(MeasurementError::Io)
    }

    fn attribute(&self, key: &str) -> Result<Value> {
        self.read_attributes()?
            .remove(key)
            .ok_or_else(|| missing("attribute", key))
    }
}

fn string_attribute<S: Store + ?Sized>(store: &S, key: &str) -> Result<String> {
    match store.attribute(key)? {
        Value::String(s) => Ok(s),
        other => Err(MeasurementError::Serialization(format!(
            "attribute '{key}' should be a string, got {other}"
        ))),
    }
}

impl<G: BaseGrid, T: Element> Measurement<G, T> {
    /// Write the evaluated array and all metadata to `store`.
    pub fn to_store<S: Store + ?Sized>(&self, store: &mut S) -> Result<()> {
        let array = self.array();
        store.write_array(
            ARRAY_NAME,
            StoredArray {
                shape: array.shape().to_vec(),
                chunk_len: self.lazy().chunk_len(),
                dtype: T::DTYPE.to_string(),
                data: encode_data(array.iter()),
            },
        )?;
        let axes = self
            .ensemble_axes_metadata()
            .iter()
            .map(AxisMetadata::to_json)
            .collect::<Result<Vec<_>>>()?;
        store.set_attribute("ensemble_axes_metadata", Value::Array(axes))?;
        store.set_attribute("metadata", serde_json::to_value(self.metadata())?)?;
        store.set_attribute("kwargs", serde_json::to_value(self.grid())?)?;
        store.set_attribute("cls", Value::from(G::TAG.as_str()))?;
        store.set_attribute("dtype", Value::from(T::DTYPE))?;
        debug!("stored {} of shape {:?}", G::TAG.as_str(), array.shape());
        Ok(())
    }

    /// Read a measurement written by `to_store`; the stored class and dtype
    /// must match `G` and `T`.
    pub fn from_store<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let tag = MeasurementTag::parse(&string_attribute(store, "cls")?)?;
        if tag != G::TAG {
            return Err(MeasurementError::IncompatibleMeasurement(format!(
                "store holds {}, expected {}",
                tag.as_str(),
                G::TAG.as_str()
            )));
        }
        let dtype = string_attribute(store, "dtype")?;
        if dtype != T::DTYPE {
            return Err(MeasurementError::IncompatibleMeasurement(format!(
                "store holds {dtype} data, expected {}",
                T::DTYPE
            )));
        }

        let stored = store.read_array(ARRAY_NAME)?;
        let data: Vec<T> = decode_data(&stored.data)?;
        let array = ArrayD::from_shape_vec(IxDyn(&stored.shape), data)
            .map_err(|e| MeasurementError::Serialization(format!("array payload: {e}")))?;

        let axes = match store.attribute("ensemble_axes_metadata")? {
            Value::Array(values) => values
                .into_iter()
                .map(AxisMetadata::from_json)
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(MeasurementError::Serialization(format!(
                    "ensemble_axes_metadata should be a list, got {other}"
                )))
            }
        };
        let metadata: Metadata = serde_json::from_value(store.attribute("metadata")?)?;
        let grid: G = serde_json::from_value(store.attribute("kwargs")?)?;
        let lazy = LazyArray::from_array(array).rechunk(stored.chunk_len);
        Self::new(lazy, grid, axes, metadata)
    }
}

/// Any measurement kind, decoded by its stored class tag.
#[derive(Debug)]
pub enum AnyMeasurement {
    Images(Images),
    ComplexImages(Images<Complex64>),
    LineProfiles(LineProfiles),
    DiffractionPatterns(DiffractionPatterns),
    PolarMeasurements(PolarMeasurements),
}

impl AnyMeasurement {
    pub fn from_store<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let tag = MeasurementTag::parse(&string_attribute(store, "cls")?)?;
        let dtype = string_attribute(store, "dtype")?;
        let complex = dtype == Complex64::DTYPE;
        Ok(match (tag, complex) {
            (MeasurementTag::Images, false) => AnyMeasurement::Images(Images::<f64>::from_store(store)?),
            (MeasurementTag::Images, true) => {
                AnyMeasurement::ComplexImages(Images::<Complex64>::from_store(store)?)
            }
            (MeasurementTag::LineProfiles, false) => {
                AnyMeasurement::LineProfiles(LineProfiles::<f64>::from_store(store)?)
            }
            (MeasurementTag::DiffractionPatterns, false) => {
                AnyMeasurement::DiffractionPatterns(DiffractionPatterns::<f64>::from_store(store)?)
            }
            (MeasurementTag::PolarMeasurements, false) => {
                AnyMeasurement::PolarMeasurements(PolarMeasurements::<f64>::from_store(store)?)
            }
            (tag, true) => {
                return Err(MeasurementError::IncompatibleMeasurement(format!(
                    "complex {} are not supported",
                    tag.as_str()
                )))
            }
        })
    }

    pub fn tag(&self) -> MeasurementTag {
        match self {
            AnyMeasurement::Images(_) | AnyMeasurement::ComplexImages(_) => MeasurementTag::Images,
            AnyMeasurement::LineProfiles(_) => MeasurementTag::LineProfiles,
            AnyMeasurement::DiffractionPatterns(_) => MeasurementTag::DiffractionPatterns,
            AnyMeasurement::PolarMeasurements(_) => MeasurementTag::PolarMeasurements,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            AnyMeasurement::Images(m) => m.shape(),
            AnyMeasurement::ComplexImages(m) => m.shape(),
            AnyMeasurement::LineProfiles(m) => m.shape(),
            AnyMeasurement::DiffractionPatterns(m) => m.shape(),
            AnyMeasurement::PolarMeasurements(m) => m.shape(),
        }
    }
}

//! Values carried by ordinal axes.
//!
//! Ordinal axes label every index of a dimension with a discrete value: a
//! frozen-phonon index, a tilt angle, a thickness, or a probe position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One per-index label of an ordinal axis.
///
/// Serialized untagged, so JSON integers, floats, strings and float arrays map
/// directly onto the variants (integers are tried before floats).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrdinalValue {
    Int(i64),
    Float(f64),
    Text(String),
    Point(Vec<f64>),
}

impl OrdinalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OrdinalValue::Int(v) => Some(*v as f64),
            OrdinalValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Format with a fixed number of decimals for numeric components.
    pub fn format_with_precision(&self, precision: usize) -> String {
        match self {
            OrdinalValue::Int(v) => v.to_string(),
            OrdinalValue::Float(v) => format!("{v:.precision$}"),
            OrdinalValue::Text(v) => v.clone(),
            OrdinalValue::Point(p) => p
                .iter()
                .map(|c| format!("{c:.precision$}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl fmt::Display for OrdinalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrdinalValue::Int(v) => write!(f, "{v}"),
            OrdinalValue::Float(v) => write!(f, "{v}"),
            OrdinalValue::Text(v) => write!(f, "{v}"),
            OrdinalValue::Point(p) => {
                let parts: Vec<String> = p.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl From<i64> for OrdinalValue {
    fn from(v: i64) -> Self {
        OrdinalValue::Int(v)
    }
}

impl From<usize> for OrdinalValue {
    fn from(v: usize) -> Self {
        OrdinalValue::Int(v as i64)
    }
}

impl From<f64> for OrdinalValue {
    fn from(v: f64) -> Self {
        OrdinalValue::Float(v)
    }
}

impl From<&str> for OrdinalValue {
    fn from(v: &str) -> Self {
        OrdinalValue::Text(v.to_string())
    }
}

impl From<String> for OrdinalValue {
    fn from(v: String) -> Self {
        OrdinalValue::Text(v)
    }
}

impl From<[f64; 2]> for OrdinalValue {
    fn from(v: [f64; 2]) -> Self {
        OrdinalValue::Point(v.to_vec())
    }
}

/// Collect anything convertible into ordinal values.
pub fn ordinal_values<I, V>(values: I) -> Vec<OrdinalValue>
where
    I: IntoIterator<Item = V>,
    V: Into<OrdinalValue>,
{
    values.into_iter().map(Into::into).collect()
}

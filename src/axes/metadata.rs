//! Axis metadata: what one array dimension means physically.
//!
//! The variant set is closed. Uniformly sampled axes (`Linear` and its
//! real-space, Fourier-space and scan refinements) are index invariant;
//! ordinal axes carry one value per index and narrow under selection.
//!
//! Serialization writes the common fields next to a `"type"` tag naming the
//! variant; decoding matches the tag against the closed registry below, so an
//! unknown tag fails instead of guessing.

use super::ordinal::OrdinalValue;
use crate::error::{MeasurementError, Result};
use crate::select::{Resolved, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

/// Descriptor of one array dimension.
///
/// Equality compares the label and the variant fields; the bookkeeping flags
/// `concatenation_allowed` and `ensemble_mean` are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AxisMetadata {
    pub label: String,
    #[serde(default = "default_true")]
    pub concatenation_allowed: bool,
    /// Downstream statistical aggregation should average this axis away.
    #[serde(default)]
    pub ensemble_mean: bool,
    #[serde(flatten)]
    pub kind: AxisKind,
}

/// Variant-specific fields, tagged by the variant name on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AxisKind {
    #[serde(rename = "UnknownAxis")]
    Unknown,
    #[serde(rename = "SampleAxis")]
    Sample,
    #[serde(rename = "LinearAxis")]
    Linear {
        sampling: f64,
        offset: f64,
        units: String,
    },
    #[serde(rename = "RealSpaceAxis")]
    RealSpace {
        sampling: f64,
        offset: f64,
        units: String,
        endpoint: bool,
    },
    #[serde(rename = "FourierSpaceAxis")]
    FourierSpace {
        sampling: f64,
        offset: f64,
        units: String,
        fftshift: bool,
    },
    #[serde(rename = "ScanAxis")]
    Scan {
        sampling: f64,
        offset: f64,
        units: String,
        endpoint: bool,
        start: Option<[f64; 2]>,
        end: Option<[f64; 2]>,
    },
    #[serde(rename = "OrdinalAxis")]
    Ordinal { values: Vec<OrdinalValue> },
    #[serde(rename = "NonLinearAxis")]
    NonLinear {
        values: Vec<OrdinalValue>,
        units: String,
    },
    #[serde(rename = "TiltAxis")]
    Tilt {
        values: Vec<OrdinalValue>,
        units: String,
        direction: String,
    },
    #[serde(rename = "ThicknessAxis")]
    Thickness {
        values: Vec<OrdinalValue>,
        units: String,
    },
    #[serde(rename = "ParameterSeriesAxis")]
    ParameterSeries {
        values: Vec<OrdinalValue>,
        units: String,
    },
    #[serde(rename = "PositionsAxis")]
    Positions {
        values: Vec<OrdinalValue>,
        units: String,
    },
    #[serde(rename = "FrozenPhononsAxis")]
    FrozenPhonons { values: Vec<OrdinalValue> },
    #[serde(rename = "PrismPlaneWavesAxis")]
    PrismPlaneWaves { values: Vec<OrdinalValue> },
}

/// Closed registry of axis variants with their subtype relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisVariant {
    Unknown,
    Sample,
    Linear,
    RealSpace,
    FourierSpace,
    Scan,
    Ordinal,
    NonLinear,
    Tilt,
    Thickness,
    ParameterSeries,
    Positions,
    FrozenPhonons,
    PrismPlaneWaves,
}

impl AxisVariant {
    pub const ALL: [AxisVariant; 14] = [
        AxisVariant::Unknown,
        AxisVariant::Sample,
        AxisVariant::Linear,
        AxisVariant::RealSpace,
        AxisVariant::FourierSpace,
        AxisVariant::Scan,
        AxisVariant::Ordinal,
        AxisVariant::NonLinear,
        AxisVariant::Tilt,
        AxisVariant::Thickness,
        AxisVariant::ParameterSeries,
        AxisVariant::Positions,
        AxisVariant::FrozenPhonons,
        AxisVariant::PrismPlaneWaves,
    ];

    /// Wire tag of the variant.
    pub fn tag(self) -> &'static str {
        match self {
            AxisVariant::Unknown => "UnknownAxis",
            AxisVariant::Sample => "SampleAxis",
            AxisVariant::Linear => "LinearAxis",
            AxisVariant::RealSpace => "RealSpaceAxis",
            AxisVariant::FourierSpace => "FourierSpaceAxis",
            AxisVariant::Scan => "ScanAxis",
            AxisVariant::Ordinal => "OrdinalAxis",
            AxisVariant::NonLinear => "NonLinearAxis",
            AxisVariant::Tilt => "TiltAxis",
            AxisVariant::Thickness => "ThicknessAxis",
            AxisVariant::ParameterSeries => "ParameterSeriesAxis",
            AxisVariant::Positions => "PositionsAxis",
            AxisVariant::FrozenPhonons => "FrozenPhononsAxis",
            AxisVariant::PrismPlaneWaves => "PrismPlaneWavesAxis",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.tag() == tag)
    }

    /// Direct supertype, `None` for roots.
    pub fn parent(self) -> Option<AxisVariant> {
        match self {
            AxisVariant::Unknown
            | AxisVariant::Sample
            | AxisVariant::Linear
            | AxisVariant::Ordinal => None,
            AxisVariant::RealSpace | AxisVariant::FourierSpace => Some(AxisVariant::Linear),
            AxisVariant::Scan => Some(AxisVariant::RealSpace),
            AxisVariant::NonLinear
            | AxisVariant::FrozenPhonons
            | AxisVariant::PrismPlaneWaves => Some(AxisVariant::Ordinal),
            AxisVariant::Tilt
            | AxisVariant::Thickness
            | AxisVariant::ParameterSeries
            | AxisVariant::Positions => Some(AxisVariant::NonLinear),
        }
    }

    /// True when `self` equals `ancestor` or derives from it.
    pub fn is_a(self, ancestor: AxisVariant) -> bool {
        let mut current = Some(self);
        while let Some(variant) = current {
            if variant == ancestor {
                return true;
            }
            current = variant.parent();
        }
        false
    }
}

impl AxisKind {
    pub fn variant(&self) -> AxisVariant {
        match self {
            AxisKind::Unknown => AxisVariant::Unknown,
            AxisKind::Sample => AxisVariant::Sample,
            AxisKind::Linear { .. } => AxisVariant::Linear,
            AxisKind::RealSpace { .. } => AxisVariant::RealSpace,
            AxisKind::FourierSpace { .. } => AxisVariant::FourierSpace,
            AxisKind::Scan { .. } => AxisVariant::Scan,
            AxisKind::Ordinal { .. } => AxisVariant::Ordinal,
            AxisKind::NonLinear { .. } => AxisVariant::NonLinear,
            AxisKind::Tilt { .. } => AxisVariant::Tilt,
            AxisKind::Thickness { .. } => AxisVariant::Thickness,
            AxisKind::ParameterSeries { .. } => AxisVariant::ParameterSeries,
            AxisKind::Positions { .. } => AxisVariant::Positions,
            AxisKind::FrozenPhonons { .. } => AxisVariant::FrozenPhonons,
            AxisKind::PrismPlaneWaves { .. } => AxisVariant::PrismPlaneWaves,
        }
    }

    fn values(&self) -> Option<&Vec<OrdinalValue>> {
        match self {
            AxisKind::Ordinal { values }
            | AxisKind::NonLinear { values, .. }
            | AxisKind::Tilt { values, .. }
            | AxisKind::Thickness { values, .. }
            | AxisKind::ParameterSeries { values, .. }
            | AxisKind::Positions { values, .. }
            | AxisKind::FrozenPhonons { values }
            | AxisKind::PrismPlaneWaves { values } => Some(values),
            _ => None,
        }
    }

    fn values_mut(&mut self) -> Option<&mut Vec<OrdinalValue>> {
        match self {
            AxisKind::Ordinal { values }
            | AxisKind::NonLinear { values, .. }
            | AxisKind::Tilt { values, .. }
            | AxisKind::Thickness { values, .. }
            | AxisKind::ParameterSeries { values, .. }
            | AxisKind::Positions { values, .. }
            | AxisKind::FrozenPhonons { values }
            | AxisKind::PrismPlaneWaves { values } => Some(values),
            _ => None,
        }
    }
}

impl PartialEq for AxisMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.kind == other.kind
    }
}

impl Default for AxisMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

// --- Constructors -----------------------------------------------------------

impl AxisMetadata {
    fn with_kind(label: impl Into<String>, kind: AxisKind) -> Self {
        Self {
            label: label.into(),
            concatenation_allowed: true,
            ensemble_mean: false,
            kind,
        }
    }

    pub fn unknown() -> Self {
        Self::with_kind("unknown", AxisKind::Unknown)
    }

    pub fn sample(label: impl Into<String>) -> Self {
        Self::with_kind(label, AxisKind::Sample)
    }

    pub fn linear(label: impl Into<String>, sampling: f64, units: impl Into<String>) -> Self {
        Self::with_kind(
            label,
            AxisKind::Linear {
                sampling,
                offset: 0.0,
                units: units.into(),
            },
        )
    }

    pub fn real_space(label: impl Into<String>, sampling: f64, units: impl Into<String>) -> Self {
        Self::with_kind(
            label,
            AxisKind::RealSpace {
                sampling,
                offset: 0.0,
                units: units.into(),
                endpoint: true,
            },
        )
    }

    /// Fourier-space axes refuse concatenation by default.
    pub fn fourier_space(
        label: impl Into<String>,
        sampling: f64,
        units: impl Into<String>,
    ) -> Self {
        let mut axis = Self::with_kind(
            label,
            AxisKind::FourierSpace {
                sampling,
                offset: 0.0,
                units: units.into(),
                fftshift: true,
            },
        );
        axis.concatenation_allowed = false;
        axis
    }

    pub fn scan(label: impl Into<String>, sampling: f64, units: impl Into<String>) -> Self {
        Self::with_kind(
            label,
            AxisKind::Scan {
                sampling,
                offset: 0.0,
                units: units.into(),
                endpoint: true,
                start: None,
                end: None,
            },
        )
    }

    pub fn ordinal(label: impl Into<String>, values: Vec<OrdinalValue>) -> Self {
        Self::with_kind(label, AxisKind::Ordinal { values })
    }

    pub fn non_linear(
        label: impl Into<String>,
        values: Vec<OrdinalValue>,
        units: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            label,
            AxisKind::NonLinear {
                values,
                units: units.into(),
            },
        )
    }

    pub fn tilt(label: impl Into<String>, values: Vec<OrdinalValue>, direction: &str) -> Self {
        Self::with_kind(
            label,
            AxisKind::Tilt {
                values,
                units: "mrad".to_string(),
                direction: direction.to_string(),
            },
        )
    }

    pub fn thickness(values: Vec<OrdinalValue>) -> Self {
        Self::with_kind(
            "thickness",
            AxisKind::Thickness {
                values,
                units: "Å".to_string(),
            },
        )
    }

    pub fn parameter_series(
        label: impl Into<String>,
        values: Vec<OrdinalValue>,
        units: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            label,
            AxisKind::ParameterSeries {
                values,
                units: units.into(),
            },
        )
    }

    pub fn positions(values: Vec<OrdinalValue>) -> Self {
        Self::with_kind(
            "x, y",
            AxisKind::Positions {
                values,
                units: "Å".to_string(),
            },
        )
    }

    /// Frozen-phonon configurations labelled `0..count`.
    pub fn frozen_phonons(count: usize) -> Self {
        Self::with_kind(
            "Frozen phonons",
            AxisKind::FrozenPhonons {
                values: (0..count).map(OrdinalValue::from).collect(),
            },
        )
    }

    pub fn prism_plane_waves(label: impl Into<String>, values: Vec<OrdinalValue>) -> Self {
        Self::with_kind(label, AxisKind::PrismPlaneWaves { values })
    }

    pub fn with_offset(mut self, new_offset: f64) -> Self {
        match &mut self.kind {
            AxisKind::Linear { offset, .. }
            | AxisKind::RealSpace { offset, .. }
            | AxisKind::FourierSpace { offset, .. }
            | AxisKind::Scan { offset, .. } => *offset = new_offset,
            _ => {}
        }
        self
    }

    pub fn with_endpoint(mut self, value: bool) -> Self {
        match &mut self.kind {
            AxisKind::RealSpace { endpoint, .. } | AxisKind::Scan { endpoint, .. } => {
                *endpoint = value
            }
            _ => {}
        }
        self
    }

    pub fn with_fftshift(mut self, value: bool) -> Self {
        if let AxisKind::FourierSpace { fftshift, .. } = &mut self.kind {
            *fftshift = value;
        }
        self
    }

    /// Attach scan line endpoints to a scan axis.
    pub fn with_scan_extent(mut self, scan_start: [f64; 2], scan_end: [f64; 2]) -> Self {
        if let AxisKind::Scan { start, end, .. } = &mut self.kind {
            *start = Some(scan_start);
            *end = Some(scan_end);
        }
        self
    }

    pub fn with_ensemble_mean(mut self, value: bool) -> Self {
        self.ensemble_mean = value;
        self
    }

    pub fn with_concatenation(mut self, allowed: bool) -> Self {
        self.concatenation_allowed = allowed;
        self
    }
}

// --- Queries ----------------------------------------------------------------

impl AxisMetadata {
    pub fn variant(&self) -> AxisVariant {
        self.kind.variant()
    }

    pub fn is_a(&self, variant: AxisVariant) -> bool {
        self.variant().is_a(variant)
    }

    pub fn is_ordinal(&self) -> bool {
        self.is_a(AxisVariant::Ordinal)
    }

    /// Per-index values of ordinal axes.
    pub fn values(&self) -> Option<&[OrdinalValue]> {
        self.kind.values().map(Vec::as_slice)
    }

    /// Number of values of an ordinal axis; `None` for uniformly sampled axes.
    pub fn len(&self) -> Option<usize> {
        self.kind.values().map(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    pub fn sampling(&self) -> Option<f64> {
        match &self.kind {
            AxisKind::Linear { sampling, .. }
            | AxisKind::RealSpace { sampling, .. }
            | AxisKind::FourierSpace { sampling, .. }
            | AxisKind::Scan { sampling, .. } => Some(*sampling),
            _ => None,
        }
    }

    pub fn offset(&self) -> Option<f64> {
        match &self.kind {
            AxisKind::Linear { offset, .. }
            | AxisKind::RealSpace { offset, .. }
            | AxisKind::FourierSpace { offset, .. }
            | AxisKind::Scan { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    pub fn units(&self) -> Option<&str> {
        match &self.kind {
            AxisKind::Linear { units, .. }
            | AxisKind::RealSpace { units, .. }
            | AxisKind::FourierSpace { units, .. }
            | AxisKind::Scan { units, .. }
            | AxisKind::NonLinear { units, .. }
            | AxisKind::Tilt { units, .. }
            | AxisKind::Thickness { units, .. }
            | AxisKind::ParameterSeries { units, .. }
            | AxisKind::Positions { units, .. } => Some(units),
            _ => None,
        }
    }

    pub fn endpoint(&self) -> Option<bool> {
        match &self.kind {
            AxisKind::RealSpace { endpoint, .. } | AxisKind::Scan { endpoint, .. } => {
                Some(*endpoint)
            }
            _ => None,
        }
    }

    /// Line endpoints of a scan axis, when recorded.
    pub fn scan_extent(&self) -> Option<([f64; 2], [f64; 2])> {
        match &self.kind {
            AxisKind::Scan {
                start: Some(start),
                end: Some(end),
                ..
            } => Some((*start, *end)),
            _ => None,
        }
    }

    /// `"label [units]"` for axes with units, otherwise the bare label.
    pub fn format_label(&self) -> String {
        match self.units() {
            Some(units) => format!("{} [{}]", self.label, units),
            None => self.label.clone(),
        }
    }

    /// Title describing the first value of an ordinal axis.
    pub fn format_title(&self, precision: usize) -> String {
        let Some(first) = self.values().and_then(|v| v.first()) else {
            return self.label.clone();
        };
        let formatted = first.format_with_precision(precision);
        match (&self.kind, self.units()) {
            (AxisKind::Ordinal { .. }, _)
            | (AxisKind::FrozenPhonons { .. }, _)
            | (AxisKind::PrismPlaneWaves { .. }, _) => formatted,
            (_, Some(units)) => format!("{} = {} {}", self.label, formatted, units),
            (_, None) => format!("{} = {}", self.label, formatted),
        }
    }
}

// --- Contracts --------------------------------------------------------------

impl AxisMetadata {
    /// Combine two axes of the same concrete variant.
    ///
    /// Uniform axes must be identical and the result is `self` (their length is
    /// implicit). Ordinal axes must agree on everything except `values`, which
    /// are appended.
    pub fn concatenate(&self, other: &AxisMetadata) -> Result<AxisMetadata> {
        if self.variant() != other.variant() {
            return Err(MeasurementError::IncompatibleAxis(format!(
                "cannot concatenate {} with {}",
                self.variant().tag(),
                other.variant().tag()
            )));
        }
        if !self.concatenation_allowed {
            return Err(MeasurementError::IncompatibleAxis(format!(
                "axis '{}' ({}) does not allow concatenation",
                self.label,
                self.variant().tag()
            )));
        }

        match (self.kind.values(), other.kind.values()) {
            (Some(_), Some(other_values)) => {
                if self.without_values() != other.without_values() {
                    return Err(MeasurementError::IncompatibleAxis(format!(
                        "ordinal axes '{}' and '{}' differ outside their values",
                        self.label, other.label
                    )));
                }
                let mut merged = self.clone();
                if let Some(values) = merged.kind.values_mut() {
                    values.extend(other_values.iter().cloned());
                }
                Ok(merged)
            }
            _ => {
                if self != other {
                    return Err(MeasurementError::IncompatibleAxis(format!(
                        "axes '{}' and '{}' are not equal",
                        self.label, other.label
                    )));
                }
                Ok(self.clone())
            }
        }
    }

    /// Metadata describing one index: `{label: value}` for ordinal axes.
    pub fn item_metadata(&self, index: usize) -> BTreeMap<String, OrdinalValue> {
        let mut item = BTreeMap::new();
        if let Some(value) = self.values().and_then(|v| v.get(index)) {
            item.insert(self.label.clone(), value.clone());
        }
        item
    }

    /// Axis describing the selected part of the dimension.
    ///
    /// Uniformly sampled axes are unchanged; ordinal axes keep only the
    /// selected values.
    pub fn select(&self, selector: &Selector) -> Result<AxisMetadata> {
        let Some(values) = self.kind.values() else {
            return Ok(self.clone());
        };
        let picked: Vec<OrdinalValue> = match selector.resolve(values.len())? {
            Resolved::Scalar(i) => vec![values[i].clone()],
            Resolved::Positions(positions) => {
                positions.into_iter().map(|i| values[i].clone()).collect()
            }
        };
        let mut narrowed = self.clone();
        if let Some(slot) = narrowed.kind.values_mut() {
            *slot = picked;
        }
        Ok(narrowed)
    }

    fn without_values(&self) -> AxisMetadata {
        let mut stripped = self.clone();
        if let Some(values) = stripped.kind.values_mut() {
            values.clear();
        }
        stripped
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<AxisMetadata> {
        Ok(serde_json::from_value(value)?)
    }
}

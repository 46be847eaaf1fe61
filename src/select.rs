//! Per-dimension selectors shared by axis metadata and lazy arrays.
//!
//! A selector is resolved against the length of the dimension it addresses.
//! Scalar selectors drop the dimension; every other selector keeps it and
//! resolves to an explicit list of positions.

use crate::error::{MeasurementError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    /// Single position, negative values count from the end.
    Index(isize),
    /// Half-open range with python-like clamping; `step` must be positive.
    Range {
        start: Option<isize>,
        end: Option<isize>,
        step: usize,
    },
    /// Explicit positions (fancy indexing), negative values count from the end.
    Indices(Vec<isize>),
    /// Boolean mask with one entry per position.
    Mask(Vec<bool>),
    Full,
}

/// Selector resolved against a concrete dimension length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Scalar(usize),
    Positions(Vec<usize>),
}

impl Selector {
    pub fn range(start: isize, end: isize) -> Self {
        Selector::Range {
            start: Some(start),
            end: Some(end),
            step: 1,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Selector::Index(_))
    }

    pub fn resolve(&self, len: usize) -> Result<Resolved> {
        match self {
            Selector::Index(index) => wrap_index(*index, len).map(Resolved::Scalar),
            Selector::Range { start, end, step } => {
                if *step == 0 {
                    return Err(MeasurementError::Configuration(
                        "slice step must be positive".to_string(),
                    ));
                }
                let lo = clamp_bound(start.unwrap_or(0), len);
                let hi = clamp_bound(end.unwrap_or(len as isize), len);
                Ok(Resolved::Positions((lo..hi.max(lo)).step_by(*step).collect()))
            }
            Selector::Indices(indices) => indices
                .iter()
                .map(|&i| wrap_index(i, len))
                .collect::<Result<Vec<_>>>()
                .map(Resolved::Positions),
            Selector::Mask(mask) => {
                if mask.len() != len {
                    return Err(MeasurementError::AxesMismatch(format!(
                        "boolean mask of length {} cannot index a dimension of length {len}",
                        mask.len()
                    )));
                }
                Ok(Resolved::Positions(
                    mask.iter()
                        .enumerate()
                        .filter_map(|(i, &keep)| keep.then_some(i))
                        .collect(),
                ))
            }
            Selector::Full => Ok(Resolved::Positions((0..len).collect())),
        }
    }
}

impl From<isize> for Selector {
    fn from(index: isize) -> Self {
        Selector::Index(index)
    }
}

impl From<std::ops::Range<isize>> for Selector {
    fn from(range: std::ops::Range<isize>) -> Self {
        Selector::range(range.start, range.end)
    }
}

fn wrap_index(index: isize, len: usize) -> Result<usize> {
    let wrapped = if index < 0 { index + len as isize } else { index };
    if wrapped < 0 || wrapped as usize >= len {
        return Err(MeasurementError::IndexOutOfRange { index, len });
    }
    Ok(wrapped as usize)
}

fn clamp_bound(bound: isize, len: usize) -> usize {
    let n = len as isize;
    let b = if bound < 0 { bound + n } else { bound };
    b.clamp(0, n) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_index_wraps() {
        assert_eq!(Selector::Index(-1).resolve(4).unwrap(), Resolved::Scalar(3));
        assert!(matches!(
            Selector::Index(4).resolve(4),
            Err(MeasurementError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn range_clamps_like_python_slices() {
        let sel = Selector::Range {
            start: Some(1),
            end: Some(100),
            step: 2,
        };
        assert_eq!(sel.resolve(6).unwrap(), Resolved::Positions(vec![1, 3, 5]));
        assert_eq!(
            Selector::range(-2, 10).resolve(5).unwrap(),
            Resolved::Positions(vec![3, 4])
        );
        assert_eq!(
            Selector::range(4, 1).resolve(5).unwrap(),
            Resolved::Positions(vec![])
        );
    }

    #[test]
    fn mask_requires_matching_length() {
        let sel = Selector::Mask(vec![true, false, true]);
        assert_eq!(sel.resolve(3).unwrap(), Resolved::Positions(vec![0, 2]));
        assert!(sel.resolve(4).is_err());
    }
}

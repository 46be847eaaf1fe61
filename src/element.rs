//! Numeric element types a measurement array may hold.

use num_complex::Complex64;
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};

/// Element of a measurement array: `f64` or `Complex64`.
pub trait Element:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// Data type name recorded by the persistence layer.
    const DTYPE: &'static str;
    /// Number of `f64` parts per value: 1 for real, 2 for complex.
    const COMPONENTS: usize;

    fn from_real(value: f64) -> Self;
    fn zero() -> Self {
        Self::from_real(0.0)
    }
    fn to_complex(self) -> Complex64;
    /// Real inputs keep the real part only.
    fn from_complex(value: Complex64) -> Self;
    fn norm_sqr(self) -> f64;
    fn magnitude(self) -> f64 {
        self.norm_sqr().sqrt()
    }
    /// Scalar shown when rendering: the value itself, or the modulus.
    fn display_value(self) -> f64;
}

impl Element for f64 {
    const DTYPE: &'static str = "float64";
    const COMPONENTS: usize = 1;

    #[inline]
    fn from_real(value: f64) -> Self {
        value
    }
    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
    #[inline]
    fn from_complex(value: Complex64) -> Self {
        value.re
    }
    #[inline]
    fn norm_sqr(self) -> f64 {
        self * self
    }
    #[inline]
    fn display_value(self) -> f64 {
        self
    }
}

impl Element for Complex64 {
    const DTYPE: &'static str = "complex128";
    const COMPONENTS: usize = 2;

    #[inline]
    fn from_real(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }
    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }
    #[inline]
    fn from_complex(value: Complex64) -> Self {
        value
    }
    #[inline]
    fn norm_sqr(self) -> f64 {
        Complex64::norm_sqr(&self)
    }
    #[inline]
    fn display_value(self) -> f64 {
        self.norm()
    }
}

//! Compile-time unit safety for building-physics quantities.
//!
//! Prevents mixing incompatible units like m³/s and m³/h, or W and W/m².
//! Ventilation flow arithmetic in particular passes through three bases
//! (L/s per m², m³/h, m³/s) and a transposed conversion is invisible in raw
//! `f64` code.
//!
//! All types use `#[repr(transparent)]` so they have the same memory layout
//! as `f64`; the wrappers compile away entirely.
//!
//! # Usage
//!
//! ```
//! use besim_core::units::{CubicMetersPerHour, SquareMeters};
//!
//! let per_m2 = 0.333; // m³/h per m² at 1 Pa
//! let area = SquareMeters(120.0);
//! let flow = CubicMetersPerHour(per_m2 * area.value());
//! assert!((flow.to_m3_per_s().value() - 0.0111).abs() < 1e-3);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Absolute value
            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }
    };
}

/// Floor area in m²
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SquareMeters(pub f64);
impl_unit_ops!(SquareMeters, "m²");

/// Volumetric flow in m³/s (the engine's native flow unit)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CubicMetersPerSecond(pub f64);
impl_unit_ops!(CubicMetersPerSecond, "m³/s");

/// Volumetric flow in m³/h (the lookup tables' flow unit)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CubicMetersPerHour(pub f64);
impl_unit_ops!(CubicMetersPerHour, "m³/h");

/// Temperature in °C
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Celsius(pub f64);
impl_unit_ops!(Celsius, "°C");

/// Pressure in Pa (fan pressure rise)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Pascals(pub f64);
impl_unit_ops!(Pascals, "Pa");

/// Power in W
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Watts(pub f64);
impl_unit_ops!(Watts, "W");

impl CubicMetersPerHour {
    /// Convert to m³/s.
    #[inline]
    pub fn to_m3_per_s(self) -> CubicMetersPerSecond {
        CubicMetersPerSecond(self.0 / 3600.0)
    }
}

impl CubicMetersPerSecond {
    /// Convert to m³/h.
    #[inline]
    pub fn to_m3_per_h(self) -> CubicMetersPerHour {
        CubicMetersPerHour(self.0 * 3600.0)
    }
}

/// Convert a rate in L/s (= dm³/s) to m³/h.
#[inline]
pub fn liters_per_s_to_m3_per_h(liters_per_s: f64) -> CubicMetersPerHour {
    CubicMetersPerHour(liters_per_s * 3.6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_conversions_round_trip() {
        let q = CubicMetersPerSecond(0.325);
        assert!((q.to_m3_per_h().value() - 1170.0).abs() < 1e-9);
        assert!((q.to_m3_per_h().to_m3_per_s().value() - 0.325).abs() < 1e-12);
    }

    #[test]
    fn liters_per_second_basis() {
        // 0.9 L/s/m2 over 100 m2 => 90 L/s => 324 m3/h
        let flow = liters_per_s_to_m3_per_h(0.9 * 100.0);
        assert!((flow.value() - 324.0).abs() < 1e-9);
    }

    #[test]
    fn arithmetic_stays_in_unit() {
        let a = SquareMeters(10.0) + SquareMeters(5.0);
        assert_eq!(a.value(), 15.0);
        let scaled = 2.0 * Pascals(50.0);
        assert_eq!(scaled.value(), 100.0);
    }
}

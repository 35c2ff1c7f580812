//! # Unit Types
//!
//! Lightweight newtype wrappers for the handful of US customary units the
//! solvers convert between. Struct fields stay plain `f64` with the unit in
//! the field name (`moment_kipft`, `depth_in`); these wrappers are used at the
//! conversion points so a factor of 12 or 1000 is never applied twice.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::units::{KipFt, KipIn, Feet, Inches};
//!
//! let m: KipIn = KipFt(10.0).into();
//! assert_eq!(m.0, 120.0);
//!
//! let depth: Inches = Feet(3.0).into();
//! assert_eq!(depth.0, 36.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Inches per foot
pub const IN_PER_FT: f64 = 12.0;
/// Pounds per kip
pub const LB_PER_KIP: f64 = 1000.0;
/// Square inches per square foot
pub const IN2_PER_FT2: f64 = 144.0;
/// Cubic feet per cubic yard
pub const FT3_PER_YD3: f64 = 27.0;

// ============================================================================
// Length
// ============================================================================

/// Length in feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feet(pub f64);

/// Length in inches
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inches(pub f64);

impl From<Feet> for Inches {
    fn from(ft: Feet) -> Self {
        Inches(ft.0 * IN_PER_FT)
    }
}

impl From<Inches> for Feet {
    fn from(inches: Inches) -> Self {
        Feet(inches.0 / IN_PER_FT)
    }
}

// ============================================================================
// Force
// ============================================================================

/// Force in pounds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pounds(pub f64);

/// Force in kips
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kips(pub f64);

impl From<Pounds> for Kips {
    fn from(lb: Pounds) -> Self {
        Kips(lb.0 / LB_PER_KIP)
    }
}

impl From<Kips> for Pounds {
    fn from(k: Kips) -> Self {
        Pounds(k.0 * LB_PER_KIP)
    }
}

// ============================================================================
// Moment
// ============================================================================

/// Moment in foot-pounds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FtLb(pub f64);

/// Moment in kip-feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KipFt(pub f64);

/// Moment in kip-inches
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KipIn(pub f64);

impl From<KipFt> for KipIn {
    fn from(kipft: KipFt) -> Self {
        KipIn(kipft.0 * IN_PER_FT)
    }
}

impl From<KipIn> for KipFt {
    fn from(kipin: KipIn) -> Self {
        KipFt(kipin.0 / IN_PER_FT)
    }
}

impl From<FtLb> for KipFt {
    fn from(ftlb: FtLb) -> Self {
        KipFt(ftlb.0 / LB_PER_KIP)
    }
}

// ============================================================================
// Pressure / stress
// ============================================================================

/// Pressure in pounds per square foot
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Psf(pub f64);

/// Stress in pounds per square inch
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Psi(pub f64);

/// Stress in kips per square inch
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ksi(pub f64);

impl From<Psf> for Psi {
    fn from(psf: Psf) -> Self {
        Psi(psf.0 / IN2_PER_FT2)
    }
}

impl From<Psi> for Ksi {
    fn from(psi: Psi) -> Self {
        Ksi(psi.0 / LB_PER_KIP)
    }
}

impl From<Ksi> for Psi {
    fn from(ksi: Ksi) -> Self {
        Psi(ksi.0 * LB_PER_KIP)
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
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

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }
        }
    };
}

impl_arithmetic!(Feet);
impl_arithmetic!(Inches);
impl_arithmetic!(Pounds);
impl_arithmetic!(Kips);
impl_arithmetic!(FtLb);
impl_arithmetic!(KipFt);
impl_arithmetic!(KipIn);
impl_arithmetic!(Psf);
impl_arithmetic!(Psi);
impl_arithmetic!(Ksi);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feet_to_inches() {
        let inches: Inches = Feet(3.0).into();
        assert_eq!(inches.0, 36.0);
        let back: Feet = inches.into();
        assert_eq!(back.0, 3.0);
    }

    #[test]
    fn test_moment_conversions() {
        let kipin: KipIn = KipFt(5.0).into();
        assert_eq!(kipin.0, 60.0);
        let kipft: KipFt = FtLb(2500.0).into();
        assert_eq!(kipft.0, 2.5);
    }

    #[test]
    fn test_pressure_conversions() {
        let psi: Psi = Psf(144.0).into();
        assert_eq!(psi.0, 1.0);
        let ksi: Ksi = Psi(4000.0).into();
        assert_eq!(ksi.0, 4.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Kips(10.0);
        let b = Kips(4.0);
        assert_eq!((a + b).0, 14.0);
        assert_eq!((a - b).0, 6.0);
        assert_eq!((a * 2.0).value(), 20.0);
        assert_eq!((a / 2.0).value(), 5.0);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Feet(12.5)).unwrap();
        assert_eq!(json, "12.5");
        let roundtrip: Feet = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, Feet(12.5));
    }
}

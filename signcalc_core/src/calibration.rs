//! # Calibration Store
//!
//! Versioned physical constants (resistance factors, wind coefficients,
//! footing K factors, concrete strengths) keyed by `(name, version)`.
//! Every constant carries a source citation and an effective date so a
//! result can be traced back to the exact numbers that produced it.
//!
//! Constants are immutable once published. Inserting a `(name, version)`
//! that already exists is a configuration error, and so is looking up one
//! that was never published. The store never substitutes a default.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::calibration::{CalibrationStore, versions, names};
//!
//! let store = CalibrationStore::with_defaults();
//! let phi_b = store.value(names::PHI_BENDING, versions::AISC360_22).unwrap();
//! assert_eq!(phi_b, 0.9);
//!
//! assert!(store.get_constant("PHI_BENDING", "aisc360_05").is_err());
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

// ============================================================================
// Names and versions
// ============================================================================

/// Published calibration versions.
pub mod versions {
    /// ASCE 7-22 wind provisions
    pub const ASCE7_22: &str = "asce7_22";
    /// AISC 360-22 steel design
    pub const AISC360_22: &str = "aisc360_22";
    /// ACI 318-19 anchoring and bearing
    pub const ACI318_19: &str = "aci318_19";
    /// Original embedment K factor
    pub const FOOTING_V1: &str = "footing_v1";
    /// Recalibrated embedment K factor
    pub const FOOTING_V2: &str = "footing_v2";
    /// IBC 2024 presumptive soil values
    pub const IBC2024: &str = "ibc2024";
}

/// Constant names used by the solvers.
pub mod names {
    pub const VELOCITY_PRESSURE_COEFF: &str = "VELOCITY_PRESSURE_COEFF";
    pub const KZT: &str = "KZT";
    pub const KD: &str = "KD";
    pub const GUST_FACTOR: &str = "GUST_FACTOR";
    pub const FORCE_COEFF: &str = "FORCE_COEFF";
    pub const KZ_MIN_HEIGHT_FT: &str = "KZ_MIN_HEIGHT_FT";
    pub const ALPHA_B: &str = "ALPHA_B";
    pub const ZG_B_FT: &str = "ZG_B_FT";
    pub const ALPHA_C: &str = "ALPHA_C";
    pub const ZG_C_FT: &str = "ZG_C_FT";
    pub const ALPHA_D: &str = "ALPHA_D";
    pub const ZG_D_FT: &str = "ZG_D_FT";

    pub const PHI_BENDING: &str = "PHI_BENDING";
    pub const PHI_WELD: &str = "PHI_WELD";
    pub const WELD_ELECTRODE_FEXX_KSI: &str = "WELD_ELECTRODE_FEXX_KSI";
    pub const PHI_ANCHOR_TENSION: &str = "PHI_ANCHOR_TENSION";
    pub const STEEL_DENSITY_PCF: &str = "STEEL_DENSITY_PCF";

    pub const PHI_BREAKOUT: &str = "PHI_BREAKOUT";
    pub const BREAKOUT_KC: &str = "BREAKOUT_KC";
    pub const CONCRETE_FC_PSI: &str = "CONCRETE_FC_PSI";
    pub const PHI_ANCHOR_SHEAR: &str = "PHI_ANCHOR_SHEAR";
    pub const PHI_BEARING: &str = "PHI_BEARING";

    pub const K_FACTOR: &str = "K_FACTOR";
    pub const SOIL_BEARING_DEFAULT_PSF: &str = "SOIL_BEARING_DEFAULT_PSF";
}

// ============================================================================
// Code References
// ============================================================================

/// Reference to the document a constant was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CodeReference {
    /// ASCE 7 - Minimum Design Loads for Buildings
    ASCE7 { year: u16, section: &'static str },
    /// AISC 360 - Specification for Structural Steel Buildings
    AISC360 { year: u16, section: &'static str },
    /// ACI 318 - Building Code Requirements for Structural Concrete
    ACI318 { year: u16, section: &'static str },
    /// International Building Code
    IBC { year: u16, section: &'static str },
    /// Calibrated in-house against field installations
    FieldCalibration { revision: u8 },
}

impl CodeReference {
    /// Format the reference for assumption strings and audit trails
    pub fn citation(&self) -> String {
        match self {
            CodeReference::ASCE7 { year, section } => {
                format!("ASCE 7-{} Section {}", year % 100, section)
            }
            CodeReference::AISC360 { year, section } => {
                format!("AISC 360-{} Section {}", year % 100, section)
            }
            CodeReference::ACI318 { year, section } => {
                format!("ACI 318-{} Section {}", year % 100, section)
            }
            CodeReference::IBC { year, section } => format!("IBC {} Section {}", year, section),
            CodeReference::FieldCalibration { revision } => {
                format!("Field calibration, revision {}", revision)
            }
        }
    }
}

// ============================================================================
// Constants
// ============================================================================

/// A single published constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstant {
    pub name: String,
    pub version: String,
    pub value: f64,
    /// Unit label ("psf", "ksi", "-")
    pub unit: String,
    /// Source citation
    pub source: String,
    pub effective_from: NaiveDate,
}

impl CalibrationConstant {
    fn published(
        name: &str,
        version: &str,
        value: f64,
        unit: &str,
        source: CodeReference,
        effective_from: NaiveDate,
    ) -> Self {
        CalibrationConstant {
            name: name.to_string(),
            version: version.to_string(),
            value,
            unit: unit.to_string(),
            source: source.citation(),
            effective_from,
        }
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

static DEFAULT_CONSTANTS: Lazy<Vec<CalibrationConstant>> = Lazy::new(|| {
    use names::*;
    use versions::*;

    let asce = |section| CodeReference::ASCE7 { year: 2022, section };
    let aisc = |section| CodeReference::AISC360 { year: 2022, section };
    let aci = |section| CodeReference::ACI318 { year: 2019, section };
    let wind_from = date(2022, 1, 1);
    let steel_from = date(2022, 8, 1);
    let concrete_from = date(2019, 6, 1);

    vec![
        // Wind
        CalibrationConstant::published(VELOCITY_PRESSURE_COEFF, ASCE7_22, 0.00256, "-", asce("26.10.2"), wind_from),
        CalibrationConstant::published(KZT, ASCE7_22, 1.0, "-", asce("26.8"), wind_from),
        CalibrationConstant::published(KD, ASCE7_22, 0.85, "-", asce("26.6"), wind_from),
        CalibrationConstant::published(GUST_FACTOR, ASCE7_22, 0.85, "-", asce("26.11"), wind_from),
        CalibrationConstant::published(FORCE_COEFF, ASCE7_22, 1.2, "-", asce("29.3.1"), wind_from),
        CalibrationConstant::published(KZ_MIN_HEIGHT_FT, ASCE7_22, 15.0, "ft", asce("26.10.1"), wind_from),
        CalibrationConstant::published(ALPHA_B, ASCE7_22, 7.0, "-", asce("26.11-1"), wind_from),
        CalibrationConstant::published(ZG_B_FT, ASCE7_22, 1200.0, "ft", asce("26.11-1"), wind_from),
        CalibrationConstant::published(ALPHA_C, ASCE7_22, 9.5, "-", asce("26.11-1"), wind_from),
        CalibrationConstant::published(ZG_C_FT, ASCE7_22, 900.0, "ft", asce("26.11-1"), wind_from),
        CalibrationConstant::published(ALPHA_D, ASCE7_22, 11.5, "-", asce("26.11-1"), wind_from),
        CalibrationConstant::published(ZG_D_FT, ASCE7_22, 700.0, "ft", asce("26.11-1"), wind_from),
        // Steel
        CalibrationConstant::published(PHI_BENDING, AISC360_22, 0.9, "-", aisc("F1"), steel_from),
        CalibrationConstant::published(PHI_WELD, AISC360_22, 0.75, "-", aisc("J2.4"), steel_from),
        CalibrationConstant::published(WELD_ELECTRODE_FEXX_KSI, AISC360_22, 70.0, "ksi", aisc("J2.4"), steel_from),
        CalibrationConstant::published(PHI_ANCHOR_TENSION, AISC360_22, 0.75, "-", aisc("J3.6"), steel_from),
        CalibrationConstant::published(STEEL_DENSITY_PCF, AISC360_22, 490.0, "pcf", aisc("A3.1"), steel_from),
        // Concrete
        CalibrationConstant::published(PHI_BREAKOUT, ACI318_19, 0.70, "-", aci("17.5.3"), concrete_from),
        CalibrationConstant::published(BREAKOUT_KC, ACI318_19, 24.0, "-", aci("17.6.2.2"), concrete_from),
        CalibrationConstant::published(CONCRETE_FC_PSI, ACI318_19, 4000.0, "psi", aci("19.2.1"), concrete_from),
        CalibrationConstant::published(PHI_ANCHOR_SHEAR, ACI318_19, 0.65, "-", aci("17.5.3"), concrete_from),
        CalibrationConstant::published(PHI_BEARING, ACI318_19, 0.65, "-", aci("21.2.1"), concrete_from),
        // Footing
        CalibrationConstant::published(
            K_FACTOR,
            FOOTING_V1,
            0.15,
            "-",
            CodeReference::FieldCalibration { revision: 1 },
            date(2023, 3, 1),
        ),
        CalibrationConstant::published(
            K_FACTOR,
            FOOTING_V2,
            10.0,
            "-",
            CodeReference::FieldCalibration { revision: 2 },
            date(2025, 1, 15),
        ),
        // Site
        CalibrationConstant::published(
            SOIL_BEARING_DEFAULT_PSF,
            IBC2024,
            3000.0,
            "psf",
            CodeReference::IBC { year: 2024, section: "1806.2" },
            date(2024, 1, 1),
        ),
    ]
});

// ============================================================================
// Store
// ============================================================================

/// Read-only lookup table of published constants.
///
/// Built once at startup and shared by reference with the solvers.
#[derive(Debug, Clone, Default)]
pub struct CalibrationStore {
    constants: BTreeMap<(String, String), CalibrationConstant>,
}

impl CalibrationStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with every built-in constant.
    pub fn with_defaults() -> Self {
        let mut constants = BTreeMap::new();
        for c in DEFAULT_CONSTANTS.iter() {
            constants.insert((c.name.clone(), c.version.clone()), c.clone());
        }
        CalibrationStore { constants }
    }

    /// Load constants from a JSON array of [`CalibrationConstant`].
    pub fn from_json(json: &str) -> CalcResult<Self> {
        let list: Vec<CalibrationConstant> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for constant in list {
            store.publish(constant)?;
        }
        Ok(store)
    }

    /// Publish a new constant. Republishing an existing `(name, version)` fails.
    pub fn publish(&mut self, constant: CalibrationConstant) -> CalcResult<()> {
        if !constant.value.is_finite() {
            return Err(CalcError::configuration(
                format!("{}@{}", constant.name, constant.version),
                "Constant value must be finite",
            ));
        }
        let key = (constant.name.clone(), constant.version.clone());
        if self.constants.contains_key(&key) {
            return Err(CalcError::configuration(
                format!("{}@{}", key.0, key.1),
                "Constant already published; publish a new version instead",
            ));
        }
        self.constants.insert(key, constant);
        Ok(())
    }

    /// Look up a constant by name and version.
    pub fn get_constant(&self, name: &str, version: &str) -> CalcResult<&CalibrationConstant> {
        self.constants
            .get(&(name.to_string(), version.to_string()))
            .ok_or_else(|| CalcError::calibration_not_found(name, version))
    }

    /// Shorthand for `get_constant(..)?.value`
    pub fn value(&self, name: &str, version: &str) -> CalcResult<f64> {
        self.get_constant(name, version).map(|c| c.value)
    }

    /// All published versions of a constant, in sorted order.
    pub fn versions_of(&self, name: &str) -> Vec<&str> {
        self.constants
            .values()
            .filter(|c| c.name == name)
            .map(|c| c.version.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over every constant in `(name, version)` order.
    pub fn iter(&self) -> impl Iterator<Item = &CalibrationConstant> {
        self.constants.values()
    }
}

//! # Pole Section Catalog
//!
//! Candidate structural sections for sign poles: pipe, wide flange, round and
//! rectangular HSS. Records are plain data; where they come from (a vendor
//! table, a database export, the built-in list) is hidden behind the
//! [`SectionSource`] trait so the solvers never depend on a loader.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::sections::{SectionFamily, SectionSource, StaticCatalog};
//!
//! let catalog = StaticCatalog::builtin();
//! let sections = catalog.load_sections().unwrap();
//! assert!(sections.iter().any(|s| s.family == SectionFamily::HssRect));
//!
//! let hss = catalog.find("HSS8X8X3/8").unwrap();
//! assert_eq!(hss.sx_in3, 25.0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{require_non_negative, require_positive, CalcError, CalcResult};

/// Section family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionFamily {
    /// Standard weight steel pipe
    Pipe,
    /// Wide flange
    W,
    /// Round hollow structural section
    HssRound,
    /// Square or rectangular hollow structural section
    HssRect,
}

impl SectionFamily {
    pub fn display_name(&self) -> &'static str {
        match self {
            SectionFamily::Pipe => "Pipe",
            SectionFamily::W => "Wide Flange (W)",
            SectionFamily::HssRound => "HSS Round",
            SectionFamily::HssRect => "HSS Rectangular/Square",
        }
    }
}

impl fmt::Display for SectionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Steel material specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SteelGrade {
    #[serde(rename = "A500B")]
    A500B,
    #[serde(rename = "A500C")]
    A500C,
    #[serde(rename = "A53B")]
    A53B,
    #[serde(rename = "A36")]
    A36,
    #[serde(rename = "A572-50")]
    A572Gr50,
    #[serde(rename = "A992")]
    A992,
}

impl SteelGrade {
    /// Minimum yield stress Fy, ksi
    pub fn fy_ksi(&self) -> f64 {
        match self {
            SteelGrade::A500B => 46.0,
            SteelGrade::A500C => 50.0,
            SteelGrade::A53B => 35.0,
            SteelGrade::A36 => 36.0,
            SteelGrade::A572Gr50 => 50.0,
            SteelGrade::A992 => 50.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SteelGrade::A500B => "ASTM A500 Gr. B",
            SteelGrade::A500C => "ASTM A500 Gr. C",
            SteelGrade::A53B => "ASTM A53 Gr. B",
            SteelGrade::A36 => "ASTM A36",
            SteelGrade::A572Gr50 => "ASTM A572 Gr. 50",
            SteelGrade::A992 => "ASTM A992",
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub family: SectionFamily,
    /// AISC designation, e.g. "HSS8X8X3/8"
    pub designation: String,
    /// Declared grade; `None` for generic entries evaluated at the requested grade
    #[serde(default)]
    pub grade: Option<SteelGrade>,
    pub weight_plf: f64,
    pub area_in2: f64,
    pub sx_in3: f64,
    pub ix_in4: f64,
    pub rx_in: f64,
    pub yield_strength_ksi: f64,
    /// Relative price multiplier
    #[serde(default = "default_cost_basis")]
    pub cost_basis: f64,
}

fn default_cost_basis() -> f64 {
    1.0
}

impl Section {
    /// Reject records no check can be run on.
    pub fn validate(&self) -> CalcResult<()> {
        let field = |name: &str| format!("{}.{}", self.designation, name);
        require_positive(&field("weight_plf"), self.weight_plf, "Weight must be positive")?;
        require_positive(&field("sx_in3"), self.sx_in3, "Section modulus must be positive")?;
        require_positive(
            &field("yield_strength_ksi"),
            self.yield_strength_ksi,
            "Yield strength must be positive",
        )?;
        require_non_negative(&field("rx_in"), self.rx_in, "Radius of gyration cannot be negative")?;
        require_positive(&field("cost_basis"), self.cost_basis, "Cost basis must be positive")?;
        Ok(())
    }
}

/// Anything that can hand the solvers a list of sections.
pub trait SectionSource {
    fn load_sections(&self) -> CalcResult<Vec<Section>>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    sections: Vec<Section>,
}

impl StaticCatalog {
    pub fn new(sections: Vec<Section>) -> Self {
        StaticCatalog { sections }
    }

    /// Catalog of common sign-pole sections.
    pub fn builtin() -> Self {
        StaticCatalog {
            sections: builtin_pole_sections(),
        }
    }

    /// Parse a JSON array of [`Section`] records.
    pub fn from_json(json: &str) -> CalcResult<Self> {
        let sections: Vec<Section> = serde_json::from_str(json)?;
        for s in &sections {
            s.validate()?;
        }
        Ok(StaticCatalog { sections })
    }

    pub fn find(&self, designation: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.designation.eq_ignore_ascii_case(designation))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl SectionSource for StaticCatalog {
    fn load_sections(&self) -> CalcResult<Vec<Section>> {
        Ok(self.sections.clone())
    }
}

impl SectionSource for [Section] {
    fn load_sections(&self) -> CalcResult<Vec<Section>> {
        Ok(self.to_vec())
    }
}

/// Source that always fails; stands in for an unreachable catalog.
#[derive(Debug, Clone)]
pub struct UnavailableCatalog(pub String);

impl SectionSource for UnavailableCatalog {
    fn load_sections(&self) -> CalcResult<Vec<Section>> {
        Err(CalcError::catalog_unavailable(self.0.clone()))
    }
}

#[allow(clippy::too_many_arguments)]
fn section(
    family: SectionFamily,
    designation: &str,
    grade: SteelGrade,
    weight_plf: f64,
    area_in2: f64,
    ix_in4: f64,
    sx_in3: f64,
    rx_in: f64,
    cost_basis: f64,
) -> Section {
    Section {
        family,
        designation: designation.to_string(),
        grade: Some(grade),
        weight_plf,
        area_in2,
        sx_in3,
        ix_in4,
        rx_in,
        yield_strength_ksi: grade.fy_ksi(),
        cost_basis,
    }
}

/// Built-in pole sections (AISC Shapes Database v16.0 properties).
pub fn builtin_pole_sections() -> Vec<Section> {
    use SectionFamily::*;
    use SteelGrade::*;

    vec![
        // Pipe, standard weight
        section(Pipe, "Pipe4STD", A53B, 10.79, 2.96, 6.82, 3.03, 1.51, 0.9),
        section(Pipe, "Pipe6STD", A53B, 18.97, 5.20, 26.5, 8.50, 2.25, 0.9),
        section(Pipe, "Pipe8STD", A53B, 28.55, 7.85, 68.1, 15.8, 2.95, 0.9),
        section(Pipe, "Pipe10STD", A53B, 40.48, 11.5, 151.0, 28.1, 3.68, 0.9),
        section(Pipe, "Pipe12STD", A53B, 49.56, 13.7, 262.0, 41.0, 4.39, 0.9),
        // Round HSS
        section(HssRound, "HSS6.625X0.280", A500C, 19.02, 5.22, 26.0, 7.85, 2.23, 1.05),
        section(HssRound, "HSS8.625X0.322", A500C, 28.58, 7.85, 66.3, 15.4, 2.91, 1.05),
        section(HssRound, "HSS10.750X0.365", A500C, 40.52, 11.1, 151.0, 28.0, 3.68, 1.05),
        // Square HSS
        section(HssRect, "HSS4X4X1/4", A500B, 12.21, 3.37, 7.80, 3.90, 1.52, 1.0),
        section(HssRect, "HSS5X5X1/4", A500B, 15.62, 4.30, 16.0, 6.41, 1.93, 1.0),
        section(HssRect, "HSS6X6X1/4", A500B, 19.02, 5.24, 28.6, 9.54, 2.34, 1.0),
        section(HssRect, "HSS6X6X3/8", A500B, 27.48, 7.58, 39.5, 13.2, 2.28, 1.0),
        section(HssRect, "HSS8X8X1/4", A500B, 25.82, 7.10, 70.7, 17.7, 3.15, 1.0),
        section(HssRect, "HSS8X8X3/8", A500B, 37.69, 10.4, 100.0, 25.0, 3.10, 1.0),
        section(HssRect, "HSS10X10X3/8", A500B, 47.90, 13.2, 202.0, 40.4, 3.91, 1.0),
        section(HssRect, "HSS12X12X1/2", A500B, 76.07, 21.0, 457.0, 76.2, 4.67, 1.0),
        // Wide flange
        section(W, "W8X18", A992, 18.0, 5.26, 61.9, 15.2, 3.43, 0.95),
        section(W, "W10X22", A992, 22.0, 6.49, 118.0, 23.2, 4.27, 0.95),
        section(W, "W12X26", A992, 26.0, 7.65, 204.0, 33.4, 5.17, 0.95),
        section(W, "W14X30", A992, 30.0, 8.85, 291.0, 42.0, 5.73, 0.95),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_valid() {
        let sections = builtin_pole_sections();
        assert_eq!(sections.len(), 20);
        for s in &sections {
            s.validate().unwrap();
            assert_eq!(s.grade.map(|g| g.fy_ksi()), Some(s.yield_strength_ksi));
        }
    }

    #[test]
    fn test_find_case_insensitive() {
        let catalog = StaticCatalog::builtin();
        assert!(catalog.find("pipe6std").is_some());
        assert!(catalog.find("HSS99X99").is_none());
    }

    #[test]
    fn test_from_json_defaults() {
        let json = r#"[{
            "family": "HssRect", "designation": "HSS4X4X1/4",
            "weight_plf": 12.21, "area_in2": 3.37, "sx_in3": 3.90,
            "ix_in4": 7.80, "rx_in": 1.52, "yield_strength_ksi": 46.0
        }]"#;
        let catalog = StaticCatalog::from_json(json).unwrap();
        let s = catalog.find("HSS4X4X1/4").unwrap();
        assert_eq!(s.grade, None);
        assert_eq!(s.cost_basis, 1.0);
    }

    #[test]
    fn test_from_json_rejects_bad_record() {
        let json = r#"[{
            "family": "W", "designation": "W0X0",
            "weight_plf": 10.0, "area_in2": 1.0, "sx_in3": 0.0,
            "ix_in4": 1.0, "rx_in": 1.0, "yield_strength_ksi": 50.0
        }]"#;
        assert!(StaticCatalog::from_json(json).unwrap_err().is_validation_error());
    }

    #[test]
    fn test_grade_serde_names() {
        let json = serde_json::to_string(&SteelGrade::A572Gr50).unwrap();
        assert_eq!(json, "\"A572-50\"");
    }

    #[test]
    fn test_unavailable_catalog() {
        let err = UnavailableCatalog("vendor table offline".into())
            .load_sections()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}

//! # Wind Load Derivation (ASCE 7-22)
//!
//! Turns site wind data and the cabinet stack of a sign into the resultant
//! wind force and the overturning moment at grade.
//!
//! ## Method
//!
//! - Cabinets are stacked downward from the top of the structure, the first
//!   cabinet in the list at the top.
//! - Projected area: `A = Σ wᵢ·hᵢ`
//! - Centroid height: area-weighted mean of cabinet mid-heights
//! - Exposure coefficient: `Kz = 2.01·(max(z, z_min)/zg)^(2/α)`
//! - Velocity pressure: `q = C1·Kz·Kzt·Kd·V²·G`
//! - Force: `F = q·A·Cf`, moment: `M = F·z`
//!
//! Every coefficient is read from the [`CalibrationStore`] under the wind
//! version named in [`DesignSettings`].
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::calibration::CalibrationStore;
//! use signcalc_core::context::SolveContext;
//! use signcalc_core::loads::{derive_loads, Cabinet, Exposure, LoadInput, SiteLoads};
//! use signcalc_core::settings::DesignSettings;
//! use signcalc_core::versioning::SolverRegistry;
//!
//! let (store, settings, registry) =
//!     (CalibrationStore::with_defaults(), DesignSettings::default(), SolverRegistry::with_defaults());
//! let ctx = SolveContext::new(&store, &settings, &registry);
//!
//! let input = LoadInput {
//!     site: SiteLoads { wind_speed_mph: 115.0, exposure: Exposure::C },
//!     cabinets: vec![Cabinet::new(14.0, 8.0)],
//!     height_ft: 25.0,
//! };
//! let out = derive_loads(&ctx, &input).unwrap();
//! assert!(out.result.moment_kipft > 0.0);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{quantize, Normalize};
use crate::calibration::{names, CalibrationStore};
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_positive, CalcError, CalcResult, EPSILON};
use crate::units::{FtLb, KipFt, KipIn, Kips, Pounds};
use crate::versioning::solvers;

// ============================================================================
// Input types
// ============================================================================

/// ASCE 7 surface roughness exposure category.
///
/// Deserialized through [`FromStr`], so any other letter is rejected with the
/// same validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Exposure {
    /// Urban and suburban terrain
    B,
    /// Open terrain with scattered obstructions
    C,
    /// Flat, unobstructed areas and water surfaces
    D,
}

impl Exposure {
    /// Calibration names of (α, zg) for this exposure
    fn profile_names(&self) -> (&'static str, &'static str) {
        match self {
            Exposure::B => (names::ALPHA_B, names::ZG_B_FT),
            Exposure::C => (names::ALPHA_C, names::ZG_C_FT),
            Exposure::D => (names::ALPHA_D, names::ZG_D_FT),
        }
    }
}

impl fmt::Display for Exposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Exposure::B => "B",
            Exposure::C => "C",
            Exposure::D => "D",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Exposure {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "B" => Ok(Exposure::B),
            "C" => Ok(Exposure::C),
            "D" => Ok(Exposure::D),
            other => Err(CalcError::invalid_input(
                "exposure",
                other,
                "Exposure category must be B, C or D",
            )),
        }
    }
}

impl TryFrom<String> for Exposure {
    type Error = CalcError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Site wind data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteLoads {
    /// Basic wind speed V, mph
    pub wind_speed_mph: f64,
    pub exposure: Exposure,
}

/// One sign cabinet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cabinet {
    pub width_ft: f64,
    pub height_ft: f64,
    #[serde(default = "default_depth_in")]
    pub depth_in: f64,
    /// Self-weight per unit face area, psf
    #[serde(default = "default_weight_psf")]
    pub weight_psf: f64,
}

fn default_depth_in() -> f64 {
    12.0
}

fn default_weight_psf() -> f64 {
    10.0
}

impl Cabinet {
    /// Cabinet with the default 12 in depth and 10 psf self-weight
    pub fn new(width_ft: f64, height_ft: f64) -> Self {
        Cabinet {
            width_ft,
            height_ft,
            depth_in: default_depth_in(),
            weight_psf: default_weight_psf(),
        }
    }

    pub fn area_ft2(&self) -> f64 {
        self.width_ft * self.height_ft
    }
}

/// Input for [`derive_loads`].
///
/// ## JSON Example
///
/// ```json
/// {
///   "site": { "wind_speed_mph": 115.0, "exposure": "C" },
///   "cabinets": [ { "width_ft": 14.0, "height_ft": 8.0 } ],
///   "height_ft": 25.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadInput {
    pub site: SiteLoads,
    /// Top cabinet first
    pub cabinets: Vec<Cabinet>,
    /// Overall structure height above grade, feet
    pub height_ft: f64,
}

impl LoadInput {
    pub fn validate(&self) -> CalcResult<()> {
        require_positive(
            "site.wind_speed_mph",
            self.site.wind_speed_mph,
            "Wind speed must be positive",
        )?;
        require_positive("height_ft", self.height_ft, "Structure height must be positive")?;
        if self.cabinets.is_empty() {
            return Err(CalcError::missing_field("cabinets"));
        }
        for (i, cab) in self.cabinets.iter().enumerate() {
            require_positive(
                &format!("cabinets[{}].width_ft", i),
                cab.width_ft,
                "Cabinet width must be positive",
            )?;
            require_positive(
                &format!("cabinets[{}].height_ft", i),
                cab.height_ft,
                "Cabinet height must be positive",
            )?;
            require_positive(
                &format!("cabinets[{}].depth_in", i),
                cab.depth_in,
                "Cabinet depth must be positive",
            )?;
            require_positive(
                &format!("cabinets[{}].weight_psf", i),
                cab.weight_psf,
                "Cabinet weight must be positive",
            )?;
        }
        let stack_ft: f64 = self.cabinets.iter().map(|c| c.height_ft).sum();
        if stack_ft > self.height_ft + EPSILON {
            return Err(CalcError::invalid_input(
                "cabinets",
                format!("{:.2} ft stack", stack_ft),
                format!("Cabinet stack is taller than the {:.2} ft structure", self.height_ft),
            ));
        }
        Ok(())
    }
}

impl Normalize for LoadInput {
    fn normalized(&self, digits: u32) -> Self {
        LoadInput {
            site: SiteLoads {
                wind_speed_mph: quantize(self.site.wind_speed_mph, digits),
                exposure: self.site.exposure,
            },
            cabinets: self
                .cabinets
                .iter()
                .map(|c| Cabinet {
                    width_ft: quantize(c.width_ft, digits),
                    height_ft: quantize(c.height_ft, digits),
                    depth_in: quantize(c.depth_in, digits),
                    weight_psf: quantize(c.weight_psf, digits),
                })
                .collect(),
            height_ft: quantize(self.height_ft, digits),
        }
    }
}

// ============================================================================
// Result
// ============================================================================

/// Derived wind loads at grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedLoads {
    pub projected_area_ft2: f64,
    pub centroid_height_ft: f64,
    pub kz: f64,
    pub velocity_pressure_psf: f64,
    pub wind_force_lb: f64,
    /// Base shear
    pub shear_kip: f64,
    /// Overturning moment at grade
    pub moment_kipft: f64,
    /// Cabinet self-weight
    pub estimated_weight_lb: f64,
}

impl DerivedLoads {
    /// Moment in kip-in, the unit section checks work in
    pub fn moment_kipin(&self) -> f64 {
        KipIn::from(KipFt(self.moment_kipft)).value()
    }
}

// ============================================================================
// Calculation
// ============================================================================

/// Velocity pressure exposure coefficient at height `z_ft`.
pub fn exposure_coefficient(
    store: &CalibrationStore,
    version: &str,
    exposure: Exposure,
    z_ft: f64,
) -> CalcResult<f64> {
    let (alpha_name, zg_name) = exposure.profile_names();
    let alpha = store.value(alpha_name, version)?;
    let zg = store.value(zg_name, version)?;
    let z_min = store.value(names::KZ_MIN_HEIGHT_FT, version)?;
    Ok(2.01 * (z_ft.max(z_min) / zg).powf(2.0 / alpha))
}

/// Derive wind force and overturning moment for a sign.
pub fn derive_loads(ctx: &SolveContext, input: &LoadInput) -> CalcResult<SolverOutput<DerivedLoads>> {
    input.validate()?;

    let version = ctx.settings.versions.wind.as_str();
    let store = ctx.store;
    let c1 = store.value(names::VELOCITY_PRESSURE_COEFF, version)?;
    let kzt = store.value(names::KZT, version)?;
    let kd = store.value(names::KD, version)?;
    let g = store.value(names::GUST_FACTOR, version)?;
    let cf = store.value(names::FORCE_COEFF, version)?;

    let mut assumptions = vec![
        format!(
            "Wind per ASCE 7-22 ({}): Exposure {}, Kzt = {}, Kd = {}, G = {}, Cf = {}",
            version, input.site.exposure, kzt, kd, g, cf
        ),
        "Cabinets stacked downward from top of structure".to_string(),
    ];
    if input.height_ft > ctx.settings.max_pole_height_ft {
        warn!(
            height_ft = input.height_ft,
            max_ft = ctx.settings.max_pole_height_ft,
            "loads.height_exceeds_max"
        );
        assumptions.push(format!(
            "Warning: structure height {:.1} ft exceeds recommended maximum {:.1} ft",
            input.height_ft, ctx.settings.max_pole_height_ft
        ));
    }

    // Stack cabinets from the top down
    let mut top_ft = input.height_ft;
    let mut area_ft2 = 0.0;
    let mut area_moment = 0.0;
    let mut weight_lb = 0.0;
    for cab in &input.cabinets {
        let a = cab.area_ft2();
        let mid_ft = top_ft - cab.height_ft / 2.0;
        area_ft2 += a;
        area_moment += a * mid_ft;
        weight_lb += a * cab.weight_psf;
        top_ft -= cab.height_ft;
    }
    let centroid_ft = area_moment / area_ft2.max(EPSILON);

    let kz = exposure_coefficient(store, version, input.site.exposure, centroid_ft)?;
    let v = input.site.wind_speed_mph;
    let q_psf = c1 * kz * kzt * kd * v * v * g;
    let force_lb = q_psf * area_ft2 * cf;
    let moment = KipFt::from(FtLb(force_lb * centroid_ft));
    let shear = Kips::from(Pounds(force_lb));

    debug!(
        area_ft2,
        centroid_ft,
        kz,
        q_psf,
        moment_kipft = moment.value(),
        "loads.derive"
    );

    let result = DerivedLoads {
        projected_area_ft2: area_ft2,
        centroid_height_ft: centroid_ft,
        kz,
        velocity_pressure_psf: q_psf,
        wind_force_lb: force_lb,
        shear_kip: shear.value(),
        moment_kipft: moment.value(),
        estimated_weight_lb: weight_lb,
    };
    Ok(ctx.output(solvers::DERIVE_LOADS, result, assumptions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DesignSettings;
    use crate::versioning::SolverRegistry;

    fn sample_input() -> LoadInput {
        LoadInput {
            site: SiteLoads {
                wind_speed_mph: 115.0,
                exposure: Exposure::C,
            },
            cabinets: vec![Cabinet::new(14.0, 8.0)],
            height_ft: 25.0,
        }
    }

    fn run(input: &LoadInput) -> CalcResult<SolverOutput<DerivedLoads>> {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        derive_loads(&SolveContext::new(&store, &settings, &registry), input)
    }

    #[test]
    fn test_single_cabinet_example() {
        let out = run(&sample_input()).unwrap();
        let r = &out.result;

        assert!((r.projected_area_ft2 - 112.0).abs() < 1e-9);
        assert!((r.centroid_height_ft - 21.0).abs() < 1e-9);
        assert!((r.kz - 0.911).abs() < 0.002, "Kz = {}", r.kz);
        assert!((r.velocity_pressure_psf - 22.3).abs() < 0.1, "q = {}", r.velocity_pressure_psf);
        assert!((r.moment_kipft - 62.9).abs() < 0.3, "M = {}", r.moment_kipft);
        assert!((r.estimated_weight_lb - 1120.0).abs() < 1e-9);
        assert!((r.moment_kipin() - r.moment_kipft * 12.0).abs() < 1e-9);
        assert_eq!(out.confidence, 1.0);
        assert_eq!(out.solver, "derive_loads");
    }

    #[test]
    fn test_repeatable() {
        let a = run(&sample_input()).unwrap();
        let b = run(&sample_input()).unwrap();
        assert_eq!(a.result.moment_kipft.to_bits(), b.result.moment_kipft.to_bits());
    }

    #[test]
    fn test_stacked_centroid() {
        let mut input = sample_input();
        input.cabinets = vec![Cabinet::new(10.0, 4.0), Cabinet::new(10.0, 4.0)];
        let r = run(&input).unwrap().result;
        // mid-heights 23 and 19, equal area
        assert!((r.centroid_height_ft - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_sign_uses_minimum_height() {
        let store = CalibrationStore::with_defaults();
        let low = exposure_coefficient(&store, "asce7_22", Exposure::C, 5.0).unwrap();
        let floor = exposure_coefficient(&store, "asce7_22", Exposure::C, 15.0).unwrap();
        assert_eq!(low, floor);
    }

    #[test]
    fn test_exposure_ordering() {
        let store = CalibrationStore::with_defaults();
        let b = exposure_coefficient(&store, "asce7_22", Exposure::B, 30.0).unwrap();
        let c = exposure_coefficient(&store, "asce7_22", Exposure::C, 30.0).unwrap();
        let d = exposure_coefficient(&store, "asce7_22", Exposure::D, 30.0).unwrap();
        assert!(b < c && c < d);
    }

    #[test]
    fn test_tall_structure_warns() {
        let mut input = sample_input();
        input.height_ft = 45.0;
        let out = run(&input).unwrap();
        assert!(out.assumptions.iter().any(|a| a.starts_with("Warning")));
        assert!(out.confidence < 1.0);
    }

    #[test]
    fn test_validation() {
        let mut input = sample_input();
        input.site.wind_speed_mph = 0.0;
        assert!(run(&input).unwrap_err().is_validation_error());

        let mut input = sample_input();
        input.cabinets[0].width_ft = -2.0;
        assert!(run(&input).unwrap_err().is_validation_error());

        let mut input = sample_input();
        input.cabinets.clear();
        assert!(matches!(run(&input), Err(CalcError::MissingField { .. })));

        let mut input = sample_input();
        input.height_ft = 6.0;
        assert!(run(&input).unwrap_err().is_validation_error());
    }

    #[test]
    fn test_unknown_wind_version() {
        let store = CalibrationStore::with_defaults();
        let mut settings = DesignSettings::default();
        settings.versions.wind = "asce7_05".to_string();
        let registry = SolverRegistry::with_defaults();
        let err = derive_loads(&SolveContext::new(&store, &settings, &registry), &sample_input()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_exposure_parse() {
        assert_eq!("c".parse::<Exposure>().unwrap(), Exposure::C);
        assert!("E".parse::<Exposure>().is_err());
    }

    #[test]
    fn test_exposure_json() {
        let site: SiteLoads = serde_json::from_str(r#"{"wind_speed_mph": 115.0, "exposure": "d"}"#).unwrap();
        assert_eq!(site.exposure, Exposure::D);
        assert_eq!(serde_json::to_string(&Exposure::B).unwrap(), r#""B""#);

        let err = serde_json::from_str::<SiteLoads>(r#"{"wind_speed_mph": 115.0, "exposure": "E"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Exposure category must be B, C or D"));
    }
}

//! # Section Feasibility (AISC 360-22 Chapter F)
//!
//! Annotates every catalog section with its flexural stress ratio and
//! slenderness, then classifies it:
//!
//! | status         | condition                                    |
//! |----------------|----------------------------------------------|
//! | `Overstressed` | stress ratio > stress limit (1.0)            |
//! | `TooSlender`   | KL/r > slenderness limit (200)               |
//! | `HighStress`   | stress ratio > high-stress threshold (0.9)   |
//! | `Ok`           | otherwise                                    |
//!
//! Nothing is dropped for failing a check. Callers see every section that
//! matches the family/grade preferences and decide what to show.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::calibration::CalibrationStore;
//! use signcalc_core::calculations::feasibility::{filter_sections, FeasibilityInput, SectionStatus};
//! use signcalc_core::context::SolveContext;
//! use signcalc_core::sections::builtin_pole_sections;
//! use signcalc_core::settings::DesignSettings;
//! use signcalc_core::versioning::SolverRegistry;
//!
//! let (store, settings, registry) =
//!     (CalibrationStore::with_defaults(), DesignSettings::default(), SolverRegistry::with_defaults());
//! let ctx = SolveContext::new(&store, &settings, &registry);
//!
//! let input = FeasibilityInput::new(600.0, 20.0);
//! let out = filter_sections(&ctx, &input, &builtin_pole_sections()).unwrap();
//! let lightest_ok = out.result.iter().find(|s| s.status == SectionStatus::Ok).unwrap();
//! assert!(lightest_ok.stress_ratio <= 0.9);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{quantize, Normalize};
use crate::calibration::names;
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_non_negative, require_positive, CalcResult, EPSILON};
use crate::sections::{Section, SectionFamily, SectionSource, SteelGrade};
use crate::settings::DesignSettings;
use crate::units::{Feet, Inches};
use crate::versioning::solvers;

/// Check outcome for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionStatus {
    Ok,
    HighStress,
    Overstressed,
    TooSlender,
}

impl SectionStatus {
    /// Safe to select (possibly with a note)
    pub fn is_usable(&self) -> bool {
        matches!(self, SectionStatus::Ok | SectionStatus::HighStress)
    }
}

/// Ordering of the returned list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Lightest first
    #[default]
    Weight,
    /// Smallest section modulus first
    SectionModulus,
    /// Least utilized first
    StressRatio,
    Designation,
}

/// Family, grade and ordering preferences.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionPrefs {
    pub family: Option<SectionFamily>,
    pub grade: Option<SteelGrade>,
    pub sort_by: SortKey,
}

/// Input for [`filter_sections`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityInput {
    /// Factored moment demand Mu, kip-in
    pub moment_demand_kipin: f64,
    /// Unbraced pole height, feet
    pub height_ft: f64,
    #[serde(default)]
    pub prefs: SectionPrefs,
}

impl FeasibilityInput {
    pub fn new(moment_demand_kipin: f64, height_ft: f64) -> Self {
        FeasibilityInput {
            moment_demand_kipin,
            height_ft,
            prefs: SectionPrefs::default(),
        }
    }

    pub fn validate(&self) -> CalcResult<()> {
        require_non_negative(
            "moment_demand_kipin",
            self.moment_demand_kipin,
            "Moment demand cannot be negative",
        )?;
        require_positive("height_ft", self.height_ft, "Height must be positive")
    }
}

impl Normalize for FeasibilityInput {
    fn normalized(&self, digits: u32) -> Self {
        FeasibilityInput {
            moment_demand_kipin: quantize(self.moment_demand_kipin, digits),
            height_ft: quantize(self.height_ft, digits),
            prefs: self.prefs,
        }
    }
}

/// A catalog section with its check results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibleSection {
    #[serde(flatten)]
    pub section: Section,
    /// Yield stress the check used
    pub fy_ksi: f64,
    /// φb·Fy·Sx, kip-in
    pub capacity_kipin: f64,
    pub stress_ratio: f64,
    pub slenderness_ratio: f64,
    pub status: SectionStatus,
}

/// Classify a section from its ratios.
pub fn classify(settings: &DesignSettings, stress_ratio: f64, slenderness_ratio: f64) -> SectionStatus {
    if stress_ratio > settings.stress_limit {
        SectionStatus::Overstressed
    } else if slenderness_ratio > settings.max_slenderness {
        SectionStatus::TooSlender
    } else if stress_ratio > settings.high_stress_threshold {
        SectionStatus::HighStress
    } else {
        SectionStatus::Ok
    }
}

/// Run the flexure and slenderness checks on one section.
pub fn evaluate_section(
    settings: &DesignSettings,
    section: &Section,
    fy_ksi: f64,
    phi_b: f64,
    moment_demand_kipin: f64,
    height_ft: f64,
) -> FeasibleSection {
    let capacity_kipin = section.sx_in3 * fy_ksi * phi_b;
    let stress_ratio = moment_demand_kipin / capacity_kipin.max(EPSILON);
    let length_in: Inches = Feet(height_ft).into();
    let slenderness_ratio = length_in.value() / section.rx_in.max(EPSILON);
    FeasibleSection {
        section: section.clone(),
        fy_ksi,
        capacity_kipin,
        stress_ratio,
        slenderness_ratio,
        status: classify(settings, stress_ratio, slenderness_ratio),
    }
}

fn compare(key: SortKey, a: &FeasibleSection, b: &FeasibleSection) -> Ordering {
    let primary = match key {
        SortKey::Weight => a.section.weight_plf.total_cmp(&b.section.weight_plf),
        SortKey::SectionModulus => a.section.sx_in3.total_cmp(&b.section.sx_in3),
        SortKey::StressRatio => a.stress_ratio.total_cmp(&b.stress_ratio),
        SortKey::Designation => Ordering::Equal,
    };
    primary.then_with(|| a.section.designation.cmp(&b.section.designation))
}

/// Check and order every section that matches the preferences.
///
/// An empty catalog yields an empty list, not an error.
pub fn filter_sections(
    ctx: &SolveContext,
    input: &FeasibilityInput,
    sections: &[Section],
) -> CalcResult<SolverOutput<Vec<FeasibleSection>>> {
    input.validate()?;
    let steel_version = ctx.settings.versions.steel.as_str();
    let phi_b = ctx.store.value(names::PHI_BENDING, steel_version)?;
    let prefs = &input.prefs;

    let mut results: Vec<FeasibleSection> = sections
        .iter()
        .filter(|s| prefs.family.map_or(true, |f| s.family == f))
        .filter(|s| match (prefs.grade, s.grade) {
            (Some(wanted), Some(declared)) => wanted == declared,
            _ => true,
        })
        .map(|s| {
            let fy = match (s.grade, prefs.grade) {
                (None, Some(wanted)) => wanted.fy_ksi(),
                _ => s.yield_strength_ksi,
            };
            evaluate_section(
                ctx.settings,
                s,
                fy,
                phi_b,
                input.moment_demand_kipin,
                input.height_ft,
            )
        })
        .collect();
    results.sort_by(|a, b| compare(prefs.sort_by, a, b));

    let usable = results.iter().filter(|r| r.status.is_usable()).count();
    let mut assumptions = vec![format!(
        "Flexure per AISC 360-22 Chapter F, φb = {} ({}); KL/r limit {}",
        phi_b, steel_version, ctx.settings.max_slenderness
    )];
    if usable == 0 {
        assumptions.push(format!(
            "No feasible section for Mu = {:.1} kip-in at {:.1} ft",
            input.moment_demand_kipin, input.height_ft
        ));
    }
    debug!(
        candidates = sections.len(),
        matched = results.len(),
        usable,
        "feasibility.filter"
    );

    Ok(ctx.output(solvers::FILTER_SECTIONS, results, assumptions))
}

/// [`filter_sections`] over any [`SectionSource`].
pub fn filter_catalog(
    ctx: &SolveContext,
    input: &FeasibilityInput,
    source: &dyn SectionSource,
) -> CalcResult<SolverOutput<Vec<FeasibleSection>>> {
    let sections = source.load_sections()?;
    filter_sections(ctx, input, &sections)
}

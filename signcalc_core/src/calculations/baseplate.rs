//! # Baseplate Checks (AISC 360-22 Chapter J, ACI 318-19 Chapter 17)
//!
//! Closed-form checks for a square or rectangular baseplate welded around a
//! round pole and anchored with a rectangular bolt pattern.
//!
//! ## Assumptions
//!
//! - The overturning moment is resisted by a couple between the outer bolt
//!   row (tension) and a bearing block of `L/4` at the opposite edge.
//! - Axial tension is shared equally by all bolts, shear likewise.
//! - The plate cantilevers from 0.95·OD to the tension bolt line.
//! - The pole is welded all around with a fillet weld treated as a line.
//!
//! ## Checks
//!
//! | check            | demand                              | capacity                                |
//! |------------------|-------------------------------------|-----------------------------------------|
//! | Plate Bending    | fb = T_row·arm / (w·t²/6)           | φb·Fy                                   |
//! | Weld Strength    | √((M/S_w + T/L_w)² + (V/L_w)²)      | φw·0.6·FEXX·0.707·w                     |
//! | Anchor Tension   | T/n + T_couple/bolts_per_row        | min(φt·0.75·Ab·Fu, φ·kc·√f'c·hef^1.5)   |
//! | Anchor Shear     | V/n                                 | φv·0.6·Ab·Fu                            |
//! | Concrete Bearing | T_couple / (w·L/4)                  | φc·0.85·f'c                             |
//!
//! Each check reports `margin = 1 − demand/capacity`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{names, CalibrationStore};
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_non_negative, require_positive, CalcError, CalcResult, EPSILON};
use crate::settings::{BaseplateCosts, DesignSettings};
use crate::units::{KipFt, KipIn, Ksi, Psi};
use crate::versioning::solvers;

/// Plate steel yield (A36), ksi
pub const DEFAULT_PLATE_FY_KSI: f64 = 36.0;
/// Anchor rod tensile strength (F1554 Gr. 36), ksi
pub const DEFAULT_ANCHOR_FU_KSI: f64 = 58.0;
/// Cubic inches per cubic foot
const IN3_PER_FT3: f64 = 1728.0;

// ============================================================================
// Input types
// ============================================================================

/// Baseplate, weld and anchor configuration.
///
/// ## JSON Example
///
/// ```json
/// {
///   "plate_w_in": 16.0, "plate_l_in": 16.0, "plate_thk_in": 0.75,
///   "weld_size_in": 0.25, "anchor_dia_in": 0.75, "anchor_embed_in": 12.0,
///   "rows": 2, "bolts_per_row": 2, "row_spacing_in": 12.0,
///   "edge_distance_in": 2.0, "pole_od_in": 8.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseplateInput {
    pub plate_w_in: f64,
    /// Plate length in the direction of the moment
    pub plate_l_in: f64,
    pub plate_thk_in: f64,
    #[serde(default = "default_plate_fy")]
    pub fy_ksi: f64,
    pub weld_size_in: f64,
    pub anchor_dia_in: f64,
    #[serde(default = "default_anchor_fu")]
    pub anchor_fu_ksi: f64,
    pub anchor_embed_in: f64,
    pub rows: u32,
    pub bolts_per_row: u32,
    pub row_spacing_in: f64,
    pub edge_distance_in: f64,
    /// Pole outside diameter
    pub pole_od_in: f64,
}

fn default_plate_fy() -> f64 {
    DEFAULT_PLATE_FY_KSI
}

fn default_anchor_fu() -> f64 {
    DEFAULT_ANCHOR_FU_KSI
}

impl BaseplateInput {
    pub fn validate(&self) -> CalcResult<()> {
        require_positive("plate_w_in", self.plate_w_in, "Plate width must be positive")?;
        require_positive("plate_l_in", self.plate_l_in, "Plate length must be positive")?;
        require_positive("plate_thk_in", self.plate_thk_in, "Plate thickness must be positive")?;
        require_positive("fy_ksi", self.fy_ksi, "Plate yield must be positive")?;
        require_positive("weld_size_in", self.weld_size_in, "Weld size must be positive")?;
        require_positive("anchor_dia_in", self.anchor_dia_in, "Anchor diameter must be positive")?;
        require_positive("anchor_fu_ksi", self.anchor_fu_ksi, "Anchor strength must be positive")?;
        require_positive(
            "anchor_embed_in",
            self.anchor_embed_in,
            "Embedment must be positive for concrete breakout",
        )?;
        require_positive("row_spacing_in", self.row_spacing_in, "Row spacing must be positive")?;
        require_positive(
            "edge_distance_in",
            self.edge_distance_in,
            "Edge distance must be positive",
        )?;
        require_positive("pole_od_in", self.pole_od_in, "Pole diameter must be positive")?;
        if self.rows == 0 || self.bolts_per_row == 0 {
            return Err(CalcError::invalid_input(
                "rows",
                format!("{}x{}", self.rows, self.bolts_per_row),
                "At least one row with one bolt is required",
            ));
        }
        // Anchors must sit inside the plate with a positive lever arm
        if self.edge_distance_in >= self.plate_l_in / 2.0 {
            return Err(CalcError::invalid_input(
                "edge_distance_in",
                self.edge_distance_in.to_string(),
                format!(
                    "Edge distance must be less than half the plate length ({} in)",
                    self.plate_l_in / 2.0
                ),
            ));
        }
        if self.bolts_per_row > 1 && self.edge_distance_in >= self.plate_w_in / 2.0 {
            return Err(CalcError::invalid_input(
                "edge_distance_in",
                self.edge_distance_in.to_string(),
                format!(
                    "Edge distance must be less than half the plate width ({} in)",
                    self.plate_w_in / 2.0
                ),
            ));
        }
        if self.pole_od_in > self.plate_w_in.min(self.plate_l_in) {
            return Err(CalcError::invalid_input(
                "pole_od_in",
                self.pole_od_in.to_string(),
                "Pole does not fit on the plate",
            ));
        }
        Ok(())
    }

    pub fn bolt_count(&self) -> u32 {
        self.rows * self.bolts_per_row
    }

    /// Gross area of one anchor rod, in²
    pub fn anchor_area_in2(&self) -> f64 {
        PI * self.anchor_dia_in * self.anchor_dia_in / 4.0
    }

    /// All-around weld length at the pole, in
    pub fn weld_length_in(&self) -> f64 {
        PI * self.pole_od_in
    }

    pub fn plate_weight_lb(&self, steel_density_pcf: f64) -> f64 {
        self.plate_w_in * self.plate_l_in * self.plate_thk_in * steel_density_pcf / IN3_PER_FT3
    }
}

/// Factored connection loads at the pole base.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionLoads {
    pub moment_kipft: f64,
    pub shear_kip: f64,
    pub tension_kip: f64,
}

impl ConnectionLoads {
    pub fn validate(&self) -> CalcResult<()> {
        require_non_negative("moment_kipft", self.moment_kipft, "Moment cannot be negative")?;
        require_non_negative("shear_kip", self.shear_kip, "Shear cannot be negative")?;
        require_non_negative("tension_kip", self.tension_kip, "Tension cannot be negative")
    }
}

// ============================================================================
// Results
// ============================================================================

/// One named check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub demand: f64,
    pub capacity: f64,
    pub unit: String,
    #[serde(rename = "pass")]
    pub passes: bool,
    /// 1 − demand/capacity; negative when failing
    pub margin: f64,
    /// Limit state that controls the capacity
    pub governing: String,
}

impl CheckResult {
    fn new(name: &str, demand: f64, capacity: f64, unit: &str, governing: &str) -> Self {
        let margin = 1.0 - demand / capacity.max(EPSILON);
        CheckResult {
            name: name.to_string(),
            demand,
            capacity,
            unit: unit.to_string(),
            passes: demand <= capacity,
            margin,
            governing: governing.to_string(),
        }
    }
}

/// A configuration with its checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseplateDesign {
    pub plate: BaseplateInput,
    pub checks: Vec<CheckResult>,
    pub all_pass: bool,
}

impl BaseplateDesign {
    /// Check with the smallest margin
    pub fn governing_check(&self) -> Option<&CheckResult> {
        self.checks.iter().min_by(|a, b| a.margin.total_cmp(&b.margin))
    }
}

// ============================================================================
// Calculation
// ============================================================================

/// Constants the checks need, read once from the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseplateConstants {
    pub phi_b: f64,
    pub phi_w: f64,
    pub fexx_ksi: f64,
    pub phi_t: f64,
    pub steel_density_pcf: f64,
    pub phi_breakout: f64,
    pub kc: f64,
    pub fc_psi: f64,
    pub phi_v: f64,
    pub phi_c: f64,
}

impl BaseplateConstants {
    pub fn from_store(store: &CalibrationStore, settings: &DesignSettings) -> CalcResult<Self> {
        let steel = settings.versions.steel.as_str();
        let concrete = settings.versions.concrete.as_str();
        Ok(BaseplateConstants {
            phi_b: store.value(names::PHI_BENDING, steel)?,
            phi_w: store.value(names::PHI_WELD, steel)?,
            fexx_ksi: store.value(names::WELD_ELECTRODE_FEXX_KSI, steel)?,
            phi_t: store.value(names::PHI_ANCHOR_TENSION, steel)?,
            steel_density_pcf: store.value(names::STEEL_DENSITY_PCF, steel)?,
            phi_breakout: store.value(names::PHI_BREAKOUT, concrete)?,
            kc: store.value(names::BREAKOUT_KC, concrete)?,
            fc_psi: store.value(names::CONCRETE_FC_PSI, concrete)?,
            phi_v: store.value(names::PHI_ANCHOR_SHEAR, concrete)?,
            phi_c: store.value(names::PHI_BEARING, concrete)?,
        })
    }
}

/// Run all five checks. Inputs must already be validated.
pub fn evaluate_baseplate(
    k: &BaseplateConstants,
    plate: &BaseplateInput,
    loads: &ConnectionLoads,
) -> BaseplateDesign {
    let n = plate.bolt_count() as f64;
    let bpr = plate.bolts_per_row as f64;
    let moment_kipin = KipIn::from(KipFt(loads.moment_kipft)).value();
    let lever_in = (plate.plate_l_in - 2.0 * plate.edge_distance_in).max(EPSILON);
    let couple_kip = moment_kipin / lever_in;

    // Plate bending at the pole face
    let cantilever_in = ((plate.plate_l_in - 0.95 * plate.pole_od_in) / 2.0).max(0.0);
    let arm_in = (cantilever_in - plate.edge_distance_in).max(0.5);
    let row_tension_kip = loads.tension_kip * bpr / n + couple_kip;
    let s_plate = plate.plate_w_in * plate.plate_thk_in.powi(2) / 6.0;
    let fb_ksi = row_tension_kip * arm_in / s_plate.max(EPSILON);
    let plate_bending = CheckResult::new("Plate Bending", fb_ksi, k.phi_b * plate.fy_ksi, "ksi", "yielding");

    // Weld around the pole, treated as a line
    let lw = plate.weld_length_in();
    let sw = PI * plate.pole_od_in.powi(2) / 4.0;
    let f_normal = moment_kipin / sw + loads.tension_kip / lw;
    let f_shear = loads.shear_kip / lw;
    let weld_demand = (f_normal * f_normal + f_shear * f_shear).sqrt();
    let weld_capacity = k.phi_w * 0.6 * k.fexx_ksi * 0.707 * plate.weld_size_in;
    let weld = CheckResult::new("Weld Strength", weld_demand, weld_capacity, "kip/in", "weld metal");

    // Anchor tension: rod steel vs concrete breakout
    let ab = plate.anchor_area_in2();
    let bolt_tension = loads.tension_kip / n + couple_kip / bpr;
    let steel_kip = k.phi_t * 0.75 * ab * plate.anchor_fu_ksi;
    let hef = plate.anchor_embed_in;
    let spacing_factor = (plate.row_spacing_in / (3.0 * hef)).min(1.0);
    let breakout_kip = k.phi_breakout * k.kc * k.fc_psi.sqrt() * hef.powf(1.5) / 1000.0 * spacing_factor;
    let (tension_capacity, tension_governs) = if steel_kip <= breakout_kip {
        (steel_kip, "steel")
    } else {
        (breakout_kip, "breakout")
    };
    let anchor_tension = CheckResult::new(
        "Anchor Tension",
        bolt_tension,
        tension_capacity,
        "kip/bolt",
        tension_governs,
    );

    let anchor_shear = CheckResult::new(
        "Anchor Shear",
        loads.shear_kip / n,
        k.phi_v * 0.6 * ab * plate.anchor_fu_ksi,
        "kip/bolt",
        "steel",
    );

    // Bearing block of L/4 under the compression edge
    let bearing_area = plate.plate_w_in * plate.plate_l_in / 4.0;
    let fc_ksi = Ksi::from(Psi(k.fc_psi)).value();
    let bearing = CheckResult::new(
        "Concrete Bearing",
        couple_kip / bearing_area,
        k.phi_c * 0.85 * fc_ksi,
        "ksi",
        "bearing",
    );

    let checks = vec![plate_bending, weld, anchor_tension, anchor_shear, bearing];
    let all_pass = checks.iter().all(|c| c.passes);
    BaseplateDesign {
        plate: plate.clone(),
        checks,
        all_pass,
    }
}

/// Material and fabrication cost of a configuration.
pub fn baseplate_cost(plate: &BaseplateInput, costs: &BaseplateCosts, steel_density_pcf: f64) -> f64 {
    plate.plate_weight_lb(steel_density_pcf) * costs.plate_per_lb
        + plate.bolt_count() as f64 * costs.anchor_each
        + plate.weld_length_in() * costs.weld_per_in
}

fn suggestion(check: &CheckResult, plate: &BaseplateInput) -> Option<String> {
    let ratio = check.demand / check.capacity.max(EPSILON);
    match check.name.as_str() {
        "Plate Bending" => Some(format!(
            "Increase plate thickness to {:.3} in (currently {:.3} in)",
            plate.plate_thk_in * ratio.sqrt(),
            plate.plate_thk_in
        )),
        "Weld Strength" => Some(format!(
            "Increase weld size to {:.3} in (currently {:.3} in)",
            plate.weld_size_in * ratio,
            plate.weld_size_in
        )),
        "Anchor Tension" | "Anchor Shear" if check.governing == "steel" => Some(format!(
            "Increase anchor diameter to {:.3} in (currently {:.3} in)",
            plate.anchor_dia_in * ratio.sqrt(),
            plate.anchor_dia_in
        )),
        "Anchor Tension" => Some(format!(
            "Increase anchor embedment to {:.1} in (currently {:.1} in)",
            plate.anchor_embed_in * ratio.powf(2.0 / 3.0),
            plate.anchor_embed_in
        )),
        "Concrete Bearing" => Some("Increase plate length to widen the bearing block".to_string()),
        _ => None,
    }
}

/// Check a baseplate configuration.
pub fn baseplate_checks(
    ctx: &SolveContext,
    plate: &BaseplateInput,
    loads: &ConnectionLoads,
) -> CalcResult<SolverOutput<BaseplateDesign>> {
    plate.validate()?;
    loads.validate()?;
    let constants = BaseplateConstants::from_store(ctx.store, ctx.settings)?;
    let design = evaluate_baseplate(&constants, plate, loads);

    let mut assumptions = vec![format!(
        "Connection per AISC 360-22 Ch. J ({}) and ACI 318-19 Ch. 17 ({}), f'c = {} psi, FEXX = {} ksi",
        ctx.settings.versions.steel, ctx.settings.versions.concrete, constants.fc_psi, constants.fexx_ksi
    )];
    for check in design.checks.iter().filter(|c| !c.passes) {
        assumptions.push(format!(
            "{} check failed: {:.2} > {:.2} {}",
            check.name, check.demand, check.capacity, check.unit
        ));
        if let Some(s) = suggestion(check, plate) {
            assumptions.push(s);
        }
    }
    debug!(
        all_pass = design.all_pass,
        governing = design.governing_check().map(|c| c.name.as_str()).unwrap_or(""),
        "baseplate.checks"
    );
    Ok(ctx.output(solvers::BASEPLATE_CHECKS, design, assumptions))
}

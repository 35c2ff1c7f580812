//! Baseplate search space and scoring shared by the optimizers.

use serde::{Deserialize, Serialize};

use crate::calculations::baseplate::{
    baseplate_cost, evaluate_baseplate, BaseplateConstants, BaseplateDesign, BaseplateInput,
    ConnectionLoads, DEFAULT_ANCHOR_FU_KSI, DEFAULT_PLATE_FY_KSI,
};
use crate::errors::{require_non_negative, require_positive, CalcError, CalcResult, EPSILON};
use crate::settings::BaseplateCosts;

/// Plate dimension increment, in
pub const PLATE_STEP_IN: f64 = 2.0;
/// Plate thickness increment, in
pub const THICKNESS_STEP_IN: f64 = 0.125;
/// Fillet weld increment, in
pub const WELD_STEP_IN: f64 = 0.0625;
/// Anchor rod diameter increment, in
pub const ANCHOR_STEP_IN: f64 = 0.25;
/// Anchor embedment increment, in
pub const EMBED_STEP_IN: f64 = 1.0;
/// Bolt rows and bolts per row
pub const MIN_ROWS: u32 = 2;
pub const MAX_ROWS: u32 = 4;
/// Clear plate beyond the pole on each side, in
const POLE_CLEARANCE_IN: f64 = 1.0;
/// Most values one variable's grid may hold
pub const MAX_GRID_POINTS: usize = 1_000;

/// Penalty for a configuration that fails any check
pub const INFEASIBLE_PENALTY: f64 = 10_000.0;
/// Penalty per unit of safety factor below the minimum
pub const SAFETY_PENALTY_PER_UNIT: f64 = 5_000.0;
/// Penalty for anchors closer than the minimum spacing
pub const SPACING_PENALTY: f64 = 1_000.0;

/// Bounds on every design variable plus the acceptance limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateConstraints {
    pub min_plate_in: f64,
    pub max_plate_in: f64,
    pub min_thickness_in: f64,
    pub max_thickness_in: f64,
    pub min_weld_in: f64,
    pub max_weld_in: f64,
    pub min_anchor_dia_in: f64,
    pub max_anchor_dia_in: f64,
    pub min_embed_in: f64,
    pub max_embed_in: f64,
    /// Center-to-center anchor spacing below this is penalized
    pub min_anchor_spacing_in: f64,
    /// Smallest capacity/demand over all checks
    pub min_safety_factor: f64,
}

impl Default for PlateConstraints {
    fn default() -> Self {
        PlateConstraints {
            min_plate_in: 12.0,
            max_plate_in: 24.0,
            min_thickness_in: 0.25,
            max_thickness_in: 1.0,
            min_weld_in: 0.1875,
            max_weld_in: 0.5,
            min_anchor_dia_in: 0.5,
            max_anchor_dia_in: 1.0,
            min_embed_in: 6.0,
            max_embed_in: 18.0,
            min_anchor_spacing_in: 6.0,
            min_safety_factor: 2.0,
        }
    }
}

/// Discrete values `step·k` within `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShopGrid {
    first: i64,
    count: usize,
    step: f64,
}

impl ShopGrid {
    pub fn new(field: &str, lo: f64, hi: f64, step: f64) -> CalcResult<Self> {
        require_positive(field, step, "Grid increment must be positive")?;
        let range = format!("{}..{}", lo, hi);
        if !lo.is_finite() || !hi.is_finite() {
            return Err(CalcError::invalid_input(field, range, "Range bounds must be finite"));
        }
        let first = (lo / step - EPSILON).ceil();
        let last = (hi / step + EPSILON).floor();
        if last < first {
            return Err(CalcError::invalid_input(
                field,
                range,
                format!("Range holds no {} in increment", step),
            ));
        }
        // Checked in f64 so wide ranges cannot saturate the integer cast
        let count = last - first + 1.0;
        if count > MAX_GRID_POINTS as f64 {
            return Err(CalcError::invalid_input(
                field,
                range,
                format!(
                    "Range holds {} values in {} increments, limit is {}",
                    count, step, MAX_GRID_POINTS
                ),
            ));
        }
        Ok(ShopGrid {
            first: first as i64,
            count: count as usize,
            step,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn value(&self, index: usize) -> f64 {
        (self.first + index.min(self.count - 1) as i64) as f64 * self.step
    }

    /// Map a gene in `[0, 1]` onto the grid.
    pub fn pick(&self, gene: f64) -> f64 {
        let index = (gene.clamp(0.0, 1.0) * self.count as f64).floor() as usize;
        self.value(index)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count).map(move |i| self.value(i))
    }
}

/// Every variable's grid for one pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSpace {
    pub plate: ShopGrid,
    pub thickness: ShopGrid,
    pub weld: ShopGrid,
    pub anchor_dia: ShopGrid,
    pub embed: ShopGrid,
    pub rows: ShopGrid,
    pub pole_od_in: f64,
}

impl SearchSpace {
    pub fn new(constraints: &PlateConstraints, pole_od_in: f64) -> CalcResult<Self> {
        let c = constraints;
        require_positive("pole_od_in", pole_od_in, "Pole diameter must be positive")?;
        require_positive("min_thickness_in", c.min_thickness_in, "Thickness must be positive")?;
        require_positive("min_weld_in", c.min_weld_in, "Weld size must be positive")?;
        require_positive("min_anchor_dia_in", c.min_anchor_dia_in, "Anchor diameter must be positive")?;
        require_positive("min_embed_in", c.min_embed_in, "Embedment must be positive")?;
        require_positive(
            "min_safety_factor",
            c.min_safety_factor,
            "Safety factor must be positive",
        )?;
        require_positive("min_plate_in", c.min_plate_in, "Plate size must be positive")?;
        for (field, lo, hi) in [
            ("max_plate_in", c.min_plate_in, c.max_plate_in),
            ("max_thickness_in", c.min_thickness_in, c.max_thickness_in),
            ("max_weld_in", c.min_weld_in, c.max_weld_in),
            ("max_anchor_dia_in", c.min_anchor_dia_in, c.max_anchor_dia_in),
            ("max_embed_in", c.min_embed_in, c.max_embed_in),
        ] {
            if !hi.is_finite() || hi < lo {
                return Err(CalcError::invalid_input(
                    field,
                    hi.to_string(),
                    format!("Upper bound must be finite and at least {}", lo),
                ));
            }
        }
        require_non_negative(
            "min_anchor_spacing_in",
            c.min_anchor_spacing_in,
            "Anchor spacing must not be negative",
        )?;
        let min_plate = c.min_plate_in.max(pole_od_in + 2.0 * POLE_CLEARANCE_IN);
        Ok(SearchSpace {
            plate: ShopGrid::new("plate_in", min_plate, c.max_plate_in, PLATE_STEP_IN)?,
            thickness: ShopGrid::new(
                "thickness_in",
                c.min_thickness_in,
                c.max_thickness_in,
                THICKNESS_STEP_IN,
            )?,
            weld: ShopGrid::new("weld_in", c.min_weld_in, c.max_weld_in, WELD_STEP_IN)?,
            anchor_dia: ShopGrid::new(
                "anchor_dia_in",
                c.min_anchor_dia_in,
                c.max_anchor_dia_in,
                ANCHOR_STEP_IN,
            )?,
            embed: ShopGrid::new("embed_in", c.min_embed_in, c.max_embed_in, EMBED_STEP_IN)?,
            rows: ShopGrid::new("rows", MIN_ROWS as f64, MAX_ROWS as f64, 1.0)?,
            pole_od_in,
        })
    }
}

/// Discrete design variables before the bolt layout is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateChoice {
    pub plate_w_in: f64,
    pub plate_l_in: f64,
    pub plate_thk_in: f64,
    pub weld_size_in: f64,
    pub anchor_dia_in: f64,
    pub anchor_embed_in: f64,
    pub rows: u32,
    pub bolts_per_row: u32,
}

/// Minimum edge distance for a rod, in
pub fn edge_distance_in(anchor_dia_in: f64) -> f64 {
    (1.75 * anchor_dia_in).max(1.5)
}

/// Smallest center-to-center anchor spacing of a layout.
pub fn anchor_spacing_in(plate: &BaseplateInput) -> f64 {
    let across = if plate.bolts_per_row > 1 {
        (plate.plate_w_in - 2.0 * plate.edge_distance_in) / (plate.bolts_per_row - 1) as f64
    } else {
        f64::INFINITY
    };
    plate.row_spacing_in.min(across)
}

impl PlateChoice {
    /// Length is never shorter than width; rows spread evenly between edge distances.
    pub fn layout(&self, pole_od_in: f64) -> BaseplateInput {
        let plate_l_in = self.plate_l_in.max(self.plate_w_in);
        let edge = edge_distance_in(self.anchor_dia_in);
        let row_spacing_in = if self.rows > 1 {
            (plate_l_in - 2.0 * edge) / (self.rows - 1) as f64
        } else {
            plate_l_in - 2.0 * edge
        };
        BaseplateInput {
            plate_w_in: self.plate_w_in,
            plate_l_in,
            plate_thk_in: self.plate_thk_in,
            fy_ksi: DEFAULT_PLATE_FY_KSI,
            weld_size_in: self.weld_size_in,
            anchor_dia_in: self.anchor_dia_in,
            anchor_fu_ksi: DEFAULT_ANCHOR_FU_KSI,
            anchor_embed_in: self.anchor_embed_in,
            rows: self.rows,
            bolts_per_row: self.bolts_per_row,
            row_spacing_in: row_spacing_in.max(EPSILON),
            edge_distance_in: edge,
            pole_od_in,
        }
    }
}

/// A checked and priced configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub design: BaseplateDesign,
    pub cost: f64,
    pub penalty: f64,
    pub min_safety_factor: f64,
}

impl Scored {
    pub fn fitness(&self) -> f64 {
        self.cost + self.penalty
    }

    pub fn feasible(&self) -> bool {
        self.penalty == 0.0
    }
}

/// Check, price and penalize one layout.
pub fn score(
    k: &BaseplateConstants,
    costs: &BaseplateCosts,
    constraints: &PlateConstraints,
    plate: &BaseplateInput,
    loads: &ConnectionLoads,
) -> Scored {
    let design = evaluate_baseplate(k, plate, loads);
    let cost = baseplate_cost(plate, costs, k.steel_density_pcf);
    let min_safety_factor = design
        .checks
        .iter()
        .map(|c| c.capacity / c.demand.max(EPSILON))
        .fold(f64::INFINITY, f64::min);

    let mut penalty = 0.0;
    if !design.all_pass {
        penalty += INFEASIBLE_PENALTY;
    } else if min_safety_factor < constraints.min_safety_factor {
        penalty += SAFETY_PENALTY_PER_UNIT * (constraints.min_safety_factor - min_safety_factor);
    }
    if anchor_spacing_in(plate) < constraints.min_anchor_spacing_in {
        penalty += SPACING_PENALTY;
    }
    Scored {
        design,
        cost,
        penalty,
        min_safety_factor,
    }
}

/// Best configuration found by an optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseplateOptimum {
    pub design: BaseplateDesign,
    /// Material and fabrication cost, without penalties
    pub cost: f64,
    /// Cost plus penalties
    pub fitness: f64,
    pub min_safety_factor: f64,
    /// No penalty applied
    pub feasible: bool,
    pub evaluations: usize,
    /// Zero for exhaustive search
    pub generations_run: usize,
}

impl BaseplateOptimum {
    pub fn from_scored(best: Scored, evaluations: usize, generations_run: usize) -> Self {
        let fitness = best.fitness();
        let feasible = best.feasible();
        BaseplateOptimum {
            design: best.design,
            cost: best.cost,
            fitness,
            // Serialized as a number; no load means no finite demand ratio
            min_safety_factor: if best.min_safety_factor.is_finite() {
                best.min_safety_factor
            } else {
                f64::MAX
            },
            feasible,
            evaluations,
            generations_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;
    use crate::settings::DesignSettings;

    #[test]
    fn test_shop_grid() {
        let g = ShopGrid::new("t", 0.25, 1.0, 0.125).unwrap();
        assert_eq!(g.len(), 7);
        assert_eq!(g.pick(0.0), 0.25);
        assert_eq!(g.pick(1.0), 1.0);
        assert_eq!(g.pick(0.5), 0.625);
        assert!(ShopGrid::new("t", 1.1, 1.2, 0.25).is_err());
    }

    #[test]
    fn test_shop_grid_rejects_wide_ranges() {
        let err = ShopGrid::new("embed_in", 6.0, f64::INFINITY, 1.0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        let err = ShopGrid::new("embed_in", 6.0, 1e20, 1.0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(ShopGrid::new("embed_in", 6.0, 2000.0, 1.0).is_err());
        assert_eq!(ShopGrid::new("embed_in", 6.0, 1005.0, 1.0).unwrap().len(), MAX_GRID_POINTS);
        assert!(ShopGrid::new("embed_in", 6.0, 18.0, 0.0).is_err());
    }

    #[test]
    fn test_rejects_unbounded_constraints() {
        for max_embed_in in [f64::INFINITY, 1e20, f64::NAN] {
            let c = PlateConstraints {
                max_embed_in,
                ..Default::default()
            };
            let err = SearchSpace::new(&c, 6.0).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT");
        }

        let c = PlateConstraints {
            max_thickness_in: 0.125,
            ..Default::default()
        };
        match SearchSpace::new(&c, 6.0) {
            Err(CalcError::InvalidInput { field, .. }) => assert_eq!(field, "max_thickness_in"),
            other => panic!("expected invalid max_thickness_in, got {:?}", other),
        }

        let c = PlateConstraints {
            max_plate_in: f64::INFINITY,
            ..Default::default()
        };
        assert!(SearchSpace::new(&c, 6.0).is_err());
    }

    #[test]
    fn test_plate_clears_pole() {
        let space = SearchSpace::new(&PlateConstraints::default(), 14.0).unwrap();
        assert_eq!(space.plate.value(0), 16.0);
        assert!(SearchSpace::new(&PlateConstraints::default(), 30.0).is_err());
    }

    #[test]
    fn test_layout() {
        let choice = PlateChoice {
            plate_w_in: 18.0,
            plate_l_in: 14.0,
            plate_thk_in: 0.75,
            weld_size_in: 0.25,
            anchor_dia_in: 1.0,
            anchor_embed_in: 10.0,
            rows: 3,
            bolts_per_row: 2,
        };
        let plate = choice.layout(8.0);
        assert_eq!(plate.plate_l_in, 18.0);
        assert_eq!(plate.edge_distance_in, 1.75);
        assert!((plate.row_spacing_in - (18.0 - 3.5) / 2.0).abs() < 1e-12);
        assert!(plate.validate().is_ok());
        assert!((anchor_spacing_in(&plate) - 7.25).abs() < 1e-12);
    }

    #[test]
    fn test_penalties() {
        let k = BaseplateConstants::from_store(&CalibrationStore::with_defaults(), &DesignSettings::default())
            .unwrap();
        let costs = BaseplateCosts::default();
        let loads = ConnectionLoads {
            moment_kipft: 5.0,
            shear_kip: 2.0,
            tension_kip: 3.0,
        };
        let strong = PlateChoice {
            plate_w_in: 20.0,
            plate_l_in: 20.0,
            plate_thk_in: 1.0,
            weld_size_in: 0.375,
            anchor_dia_in: 1.0,
            anchor_embed_in: 12.0,
            rows: 2,
            bolts_per_row: 2,
        };
        let s = score(&k, &costs, &PlateConstraints::default(), &strong.layout(8.0), &loads);
        assert!(s.feasible(), "penalty {}", s.penalty);
        assert_eq!(s.fitness(), s.cost);

        let thin = PlateChoice {
            plate_thk_in: 0.125,
            ..strong
        };
        let s = score(&k, &costs, &PlateConstraints::default(), &thin.layout(8.0), &loads);
        assert!(s.penalty >= INFEASIBLE_PENALTY);
    }
}

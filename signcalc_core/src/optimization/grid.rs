//! Exhaustive baseplate search.
//!
//! Walks every combination on the shop grid (square and oblong plates with
//! length ≥ width, every thickness, 2×2, 3×3 and 4×4 bolt patterns, every rod
//! diameter, embedment in 2" steps and every weld size) and keeps the lowest
//! fitness. Slower than the genetic search but exact on its grid, which makes
//! it the reference the GA is measured against.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::space::{score, BaseplateOptimum, PlateChoice, PlateConstraints, Scored, SearchSpace, ShopGrid};
use crate::calculations::baseplate::{BaseplateConstants, ConnectionLoads};
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{CalcError, CalcResult};
use crate::versioning::solvers;

/// Bolt patterns tried, (rows, bolts per row)
pub const GRID_PATTERNS: [(u32, u32); 3] = [(2, 2), (3, 3), (4, 4)];
/// Embedment step of the exhaustive grid, in
const GRID_EMBED_STEP_IN: f64 = 2.0;
/// Most configurations one exhaustive solve will evaluate
pub const MAX_GRID_EVALUATIONS: usize = 2_000_000;

/// Input for [`baseplate_grid_solve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridInput {
    pub loads: ConnectionLoads,
    pub pole_od_in: f64,
    #[serde(default)]
    pub constraints: PlateConstraints,
}

impl GridInput {
    pub fn validate(&self) -> CalcResult<()> {
        self.loads.validate()?;
        SearchSpace::new(&self.constraints, self.pole_od_in).map(|_| ())
    }
}

/// Cheapest configuration on the full grid.
///
/// `progress` receives `(total, current)` after every evaluation. Ties keep
/// the first configuration in enumeration order.
pub fn baseplate_grid_solve(
    ctx: &SolveContext,
    input: &GridInput,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
) -> CalcResult<SolverOutput<BaseplateOptimum>> {
    input.validate()?;
    let space = SearchSpace::new(&input.constraints, input.pole_od_in)?;
    let embed = ShopGrid::new(
        "embed_in",
        input.constraints.min_embed_in,
        input.constraints.max_embed_in,
        GRID_EMBED_STEP_IN,
    )
    .unwrap_or(space.embed);
    let constants = BaseplateConstants::from_store(ctx.store, ctx.settings)?;
    let costs = ctx.settings.baseplate_costs;

    let n = space.plate.len();
    let plate_pairs = n * (n + 1) / 2;
    let total = [
        space.thickness.len(),
        GRID_PATTERNS.len(),
        space.anchor_dia.len(),
        embed.len(),
        space.weld.len(),
    ]
    .into_iter()
    .try_fold(plate_pairs, usize::checked_mul)
    .filter(|&t| t <= MAX_GRID_EVALUATIONS)
    .ok_or_else(|| {
        CalcError::invalid_input(
            "constraints",
            format!("{} plate sizes", n),
            format!(
                "Grid exceeds {} configurations; narrow the bounds or use the genetic search",
                MAX_GRID_EVALUATIONS
            ),
        )
    })?;

    let mut best: Option<Scored> = None;
    let mut current = 0usize;
    for (wi, plate_w_in) in space.plate.values().enumerate() {
        for plate_l_in in space.plate.values().skip(wi) {
            for plate_thk_in in space.thickness.values() {
                for (rows, bolts_per_row) in GRID_PATTERNS {
                    for anchor_dia_in in space.anchor_dia.values() {
                        for anchor_embed_in in embed.values() {
                            for weld_size_in in space.weld.values() {
                                let choice = PlateChoice {
                                    plate_w_in,
                                    plate_l_in,
                                    plate_thk_in,
                                    weld_size_in,
                                    anchor_dia_in,
                                    anchor_embed_in,
                                    rows,
                                    bolts_per_row,
                                };
                                let plate = choice.layout(input.pole_od_in);
                                let scored =
                                    score(&constants, &costs, &input.constraints, &plate, &input.loads);
                                if best.as_ref().map_or(true, |b| scored.fitness() < b.fitness()) {
                                    best = Some(scored);
                                }
                                current += 1;
                                if let Some(cb) = progress.as_deref_mut() {
                                    cb(total, current);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    let Some(best) = best else {
        return Err(CalcError::Internal {
            message: "baseplate grid is empty".to_string(),
        });
    };
    let optimum = BaseplateOptimum::from_scored(best, current, 0);

    let mut assumptions = vec![format!(
        "Exhaustive grid: {} configurations, bolt patterns 2x2/3x3/4x4",
        current
    )];
    if !optimum.feasible {
        warn!(fitness = optimum.fitness, "grid.no_feasible_design");
        assumptions.push("No feasible baseplate on the search grid".to_string());
    }
    debug!(evaluations = current, cost = optimum.cost, "grid.solve");
    Ok(ctx.output(solvers::BASEPLATE_GRID_SOLVE, optimum, assumptions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;
    use crate::settings::DesignSettings;
    use crate::versioning::SolverRegistry;

    fn loads() -> ConnectionLoads {
        ConnectionLoads {
            moment_kipft: 5.0,
            shear_kip: 2.0,
            tension_kip: 3.0,
        }
    }

    fn narrow() -> PlateConstraints {
        PlateConstraints {
            max_plate_in: 16.0,
            max_weld_in: 0.25,
            max_embed_in: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_grid_counts_and_progress() {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);
        let input = GridInput {
            loads: loads(),
            pole_od_in: 8.0,
            constraints: narrow(),
        };

        let mut calls = 0usize;
        let mut last = (0usize, 0usize);
        let mut record = |total: usize, current: usize| {
            calls += 1;
            last = (total, current);
        };
        let callback: &mut dyn FnMut(usize, usize) = &mut record;
        let out = baseplate_grid_solve(&ctx, &input, Some(callback)).unwrap();

        // plates 12..16 → 3 sizes, 6 pairs; 7 thicknesses; 3 patterns; 3 rods; embeds 6,8,10; welds 3/16, 1/4
        let expected = 6 * 7 * 3 * 3 * 3 * 2;
        assert_eq!(out.result.evaluations, expected);
        assert_eq!(calls, expected);
        assert_eq!(last, (expected, expected));
        assert!(out.result.feasible);
        assert_eq!(out.result.generations_run, 0);
    }

    #[test]
    fn test_grid_rejects_oversized_search() {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);

        for max_embed_in in [f64::INFINITY, 1e20] {
            let input = GridInput {
                loads: loads(),
                pole_od_in: 8.0,
                constraints: PlateConstraints {
                    max_embed_in,
                    ..Default::default()
                },
            };
            assert!(input.validate().is_err());
            let err = baseplate_grid_solve(&ctx, &input, None).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT");
        }

        // Every axis within its own limit, the product is not
        let input = GridInput {
            loads: loads(),
            pole_od_in: 8.0,
            constraints: PlateConstraints {
                max_plate_in: 200.0,
                max_thickness_in: 4.0,
                ..Default::default()
            },
        };
        let mut calls = 0usize;
        let mut record = |_: usize, _: usize| calls += 1;
        let callback: &mut dyn FnMut(usize, usize) = &mut record;
        let err = baseplate_grid_solve(&ctx, &input, Some(callback)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_grid_beats_hand_design() {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);
        let constraints = narrow();
        let input = GridInput {
            loads: loads(),
            pole_od_in: 8.0,
            constraints,
        };
        let best = baseplate_grid_solve(&ctx, &input, None).unwrap().result;

        let hand = PlateChoice {
            plate_w_in: 16.0,
            plate_l_in: 16.0,
            plate_thk_in: 1.0,
            weld_size_in: 0.25,
            anchor_dia_in: 1.0,
            anchor_embed_in: 10.0,
            rows: 2,
            bolts_per_row: 2,
        }
        .layout(8.0);
        let k = BaseplateConstants::from_store(&store, &settings).unwrap();
        let hand = score(&k, &settings.baseplate_costs, &constraints, &hand, &loads());
        assert!(hand.feasible());
        assert!(best.fitness <= hand.fitness());
        assert!(best.design.all_pass);
    }
}

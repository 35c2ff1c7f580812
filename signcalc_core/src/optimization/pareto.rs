//! # Pareto Pole Selection
//!
//! Ranks usable pole sections on three objectives at once:
//!
//! | objective     | definition                                | better |
//! |---------------|-------------------------------------------|--------|
//! | cost          | weight_plf · height · $/lb · cost_basis   | lower  |
//! | weight        | weight_plf                                | lower  |
//! | safety factor | φb·Fy·Sx / Mu                             | higher |
//!
//! `A` dominates `B` when it is at least as good on all three and strictly
//! better on one. Candidates are peeled into fronts by non-dominated sorting
//! (front 0 is the Pareto front) and returned front by front.
//!
//! Within a front the order is ascending cost, then weight, then a tie key
//! hashed from the seed and designation, then designation. Sections that tie
//! on every objective are ordered by the seed, and repeated calls with the
//! same input return the same list.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::calibration::CalibrationStore;
//! use signcalc_core::context::SolveContext;
//! use signcalc_core::optimization::pareto::{pareto_optimize_poles, ParetoInput};
//! use signcalc_core::sections::StaticCatalog;
//! use signcalc_core::settings::DesignSettings;
//! use signcalc_core::versioning::SolverRegistry;
//!
//! let (store, settings, registry) =
//!     (CalibrationStore::with_defaults(), DesignSettings::default(), SolverRegistry::with_defaults());
//! let ctx = SolveContext::new(&store, &settings, &registry);
//!
//! let input = ParetoInput::new(50.0, 25.0);
//! let out = pareto_optimize_poles(&ctx, &input, &StaticCatalog::builtin()).unwrap();
//! assert!(!out.result.is_empty());
//! assert!(out.result.len() <= input.max_solutions);
//! assert!(!out.result[0].is_dominated);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::feasibility::{filter_catalog, FeasibilityInput, FeasibleSection, SectionPrefs};
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_non_negative, require_positive, CalcError, CalcResult, EPSILON};
use crate::sections::{SectionFamily, SectionSource};
use crate::versioning::solvers;

fn default_max_solutions() -> usize {
    10
}

fn default_seed() -> u64 {
    42
}

/// Input for [`pareto_optimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoInput {
    /// Required moment Mu, kip-in
    pub moment_demand_kipin: f64,
    pub height_ft: f64,
    /// Installed steel price; `None` uses the configured default
    #[serde(default)]
    pub cost_per_lb: Option<f64>,
    #[serde(default = "default_max_solutions")]
    pub max_solutions: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Only used by [`pareto_optimize_poles`]
    #[serde(default)]
    pub prefs: SectionPrefs,
}

impl ParetoInput {
    pub fn new(moment_demand_kipin: f64, height_ft: f64) -> Self {
        ParetoInput {
            moment_demand_kipin,
            height_ft,
            cost_per_lb: None,
            max_solutions: default_max_solutions(),
            seed: default_seed(),
            prefs: SectionPrefs::default(),
        }
    }

    pub fn validate(&self) -> CalcResult<()> {
        require_non_negative(
            "moment_demand_kipin",
            self.moment_demand_kipin,
            "Moment demand cannot be negative",
        )?;
        require_positive("height_ft", self.height_ft, "Height must be positive")?;
        if let Some(price) = self.cost_per_lb {
            require_positive("cost_per_lb", price, "Steel price must be positive")?;
        }
        if self.max_solutions == 0 {
            return Err(CalcError::invalid_input(
                "max_solutions",
                "0",
                "At least one solution must be requested",
            ));
        }
        Ok(())
    }
}

/// A ranked pole choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoSolution {
    pub designation: String,
    pub family: SectionFamily,
    /// Non-dominated sorting rank, 0 = Pareto front
    pub front: usize,
    pub cost: f64,
    /// Total pole weight over the height, lb
    pub weight_lb: f64,
    pub weight_plf: f64,
    pub safety_factor: f64,
    pub is_dominated: bool,
}

impl ParetoSolution {
    /// Lower cost and weight, higher safety factor, strictly better somewhere.
    pub fn dominates(&self, other: &ParetoSolution) -> bool {
        let no_worse = self.cost <= other.cost
            && self.weight_plf <= other.weight_plf
            && self.safety_factor >= other.safety_factor;
        let better = self.cost < other.cost
            || self.weight_plf < other.weight_plf
            || self.safety_factor > other.safety_factor;
        no_worse && better
    }
}

/// SplitMix64 finalizer over an FNV-1a hash of the designation.
fn tie_key(seed: u64, designation: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in designation.bytes() {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut z = (h ^ seed).wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Front index of every solution (Deb's fast non-dominated sort).
pub fn non_dominated_fronts(solutions: &[ParetoSolution]) -> Vec<usize> {
    let n = solutions.len();
    let mut dominated_by_count = vec![0usize; n];
    let mut dominates: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if solutions[i].dominates(&solutions[j]) {
                dominates[i].push(j);
                dominated_by_count[j] += 1;
            } else if solutions[j].dominates(&solutions[i]) {
                dominates[j].push(i);
                dominated_by_count[i] += 1;
            }
        }
    }

    let mut front_of = vec![0usize; n];
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_by_count[i] == 0).collect();
    let mut rank = 0;
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            front_of[i] = rank;
            for &j in &dominates[i] {
                dominated_by_count[j] -= 1;
                if dominated_by_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        current = next;
        rank += 1;
    }
    front_of
}

fn to_solution(candidate: &FeasibleSection, demand_kipin: f64, height_ft: f64, price: f64) -> ParetoSolution {
    let s = &candidate.section;
    let weight_lb = s.weight_plf * height_ft;
    ParetoSolution {
        designation: s.designation.clone(),
        family: s.family,
        front: 0,
        cost: weight_lb * price * s.cost_basis,
        weight_lb,
        weight_plf: s.weight_plf,
        safety_factor: candidate.capacity_kipin / demand_kipin.max(EPSILON),
        is_dominated: false,
    }
}

/// Rank already-checked candidates into Pareto fronts.
///
/// Overstressed and too-slender candidates are ignored. No usable candidate
/// gives an empty list, not an error.
pub fn pareto_optimize(
    ctx: &SolveContext,
    input: &ParetoInput,
    candidates: &[FeasibleSection],
) -> CalcResult<SolverOutput<Vec<ParetoSolution>>> {
    input.validate()?;
    let price = input.cost_per_lb.unwrap_or(ctx.settings.pole_cost_per_lb);

    let mut solutions: Vec<ParetoSolution> = candidates
        .iter()
        .filter(|c| c.status.is_usable())
        .map(|c| to_solution(c, input.moment_demand_kipin, input.height_ft, price))
        .collect();

    let fronts = non_dominated_fronts(&solutions);
    for (solution, front) in solutions.iter_mut().zip(fronts) {
        solution.front = front;
        solution.is_dominated = front > 0;
    }

    let seed = input.seed;
    solutions.sort_by(|a, b| {
        a.front
            .cmp(&b.front)
            .then_with(|| a.cost.total_cmp(&b.cost))
            .then_with(|| a.weight_plf.total_cmp(&b.weight_plf))
            .then_with(|| tie_key(seed, &a.designation).cmp(&tie_key(seed, &b.designation)))
            .then_with(|| a.designation.cmp(&b.designation))
    });
    let usable = solutions.len();
    let front_size = solutions.iter().filter(|s| !s.is_dominated).count();
    solutions.truncate(input.max_solutions);

    let mut assumptions = vec![format!(
        "Objectives: cost at ${:.2}/lb over {:.1} ft, weight per foot, safety factor φMn/Mu",
        price, input.height_ft
    )];
    if usable == 0 {
        assumptions.push(format!(
            "No feasible section to optimize for Mu = {:.1} kip-in",
            input.moment_demand_kipin
        ));
    }

    debug!(usable, front_size, returned = solutions.len(), "pareto.optimize");
    Ok(ctx.output(solvers::PARETO_OPTIMIZE, solutions, assumptions))
}

/// Filter a catalog, then rank the usable sections.
pub fn pareto_optimize_poles(
    ctx: &SolveContext,
    input: &ParetoInput,
    source: &dyn SectionSource,
) -> CalcResult<SolverOutput<Vec<ParetoSolution>>> {
    input.validate()?;
    let feasibility = FeasibilityInput {
        moment_demand_kipin: input.moment_demand_kipin,
        height_ft: input.height_ft,
        prefs: input.prefs,
    };
    let filtered = filter_catalog(ctx, &feasibility, source)?;
    let mut out = pareto_optimize(ctx, input, &filtered.result)?;

    let mut assumptions = filtered.assumptions;
    assumptions.retain(|a| !out.assumptions.contains(a));
    assumptions.append(&mut out.assumptions);
    Ok(ctx.output(solvers::PARETO_OPTIMIZE, out.result, assumptions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::feasibility::SectionStatus;
    use crate::calibration::CalibrationStore;
    use crate::sections::{Section, StaticCatalog, SteelGrade};
    use crate::settings::DesignSettings;
    use crate::versioning::SolverRegistry;

    fn solution(name: &str, cost: f64, plf: f64, sf: f64) -> ParetoSolution {
        ParetoSolution {
            designation: name.to_string(),
            family: SectionFamily::HssRect,
            front: 0,
            cost,
            weight_lb: plf * 10.0,
            weight_plf: plf,
            safety_factor: sf,
            is_dominated: false,
        }
    }

    fn candidate(name: &str, plf: f64, capacity: f64, status: SectionStatus) -> FeasibleSection {
        FeasibleSection {
            section: Section {
                family: SectionFamily::HssRect,
                designation: name.to_string(),
                grade: Some(SteelGrade::A500B),
                weight_plf: plf,
                area_in2: 5.0,
                sx_in3: 10.0,
                ix_in4: 40.0,
                rx_in: 2.0,
                yield_strength_ksi: 46.0,
                cost_basis: 1.0,
            },
            fy_ksi: 46.0,
            capacity_kipin: capacity,
            stress_ratio: 0.5,
            slenderness_ratio: 100.0,
            status,
        }
    }

    fn run(input: &ParetoInput, candidates: &[FeasibleSection]) -> SolverOutput<Vec<ParetoSolution>> {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        pareto_optimize(&SolveContext::new(&store, &settings, &registry), input, candidates).unwrap()
    }

    #[test]
    fn test_dominance() {
        let a = solution("A", 100.0, 10.0, 2.0);
        let b = solution("B", 120.0, 12.0, 1.5);
        let c = solution("C", 90.0, 12.0, 2.0);
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
        assert!(!a.dominates(&c) && !c.dominates(&a));
        assert!(!a.dominates(&a.clone()));
    }

    #[test]
    fn test_fronts() {
        let s = vec![
            solution("A", 100.0, 10.0, 2.0),
            solution("B", 120.0, 12.0, 1.5),
            solution("C", 130.0, 13.0, 1.0),
            solution("D", 90.0, 12.0, 2.0),
        ];
        assert_eq!(non_dominated_fronts(&s), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_trade_off_front_and_order() {
        // Heavier sections buy safety factor, so all three are non-dominated
        let candidates = vec![
            candidate("HEAVY", 40.0, 400.0, SectionStatus::Ok),
            candidate("LIGHT", 10.0, 100.0, SectionStatus::Ok),
            candidate("MID", 20.0, 200.0, SectionStatus::HighStress),
            candidate("BAD", 5.0, 10.0, SectionStatus::Overstressed),
        ];
        let out = run(&ParetoInput::new(50.0, 25.0), &candidates);
        let names: Vec<&str> = out.result.iter().map(|s| s.designation.as_str()).collect();
        assert_eq!(names, vec!["LIGHT", "MID", "HEAVY"]);
        assert!(out.result.iter().all(|s| !s.is_dominated));
        assert!((out.result[0].cost - 10.0 * 25.0 * 3.0).abs() < 1e-9);
        assert!((out.result[0].safety_factor - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dominated_after_front_and_truncation() {
        let candidates = vec![
            candidate("WORSE", 20.0, 100.0, SectionStatus::Ok),
            candidate("BEST", 10.0, 150.0, SectionStatus::Ok),
        ];
        let mut input = ParetoInput::new(50.0, 10.0);
        let out = run(&input, &candidates);
        assert_eq!(out.result[0].designation, "BEST");
        assert!(out.result[1].is_dominated);
        assert_eq!(out.result[1].front, 1);

        input.max_solutions = 1;
        assert_eq!(run(&input, &candidates).result.len(), 1);
    }

    #[test]
    fn test_empty_is_not_error() {
        let out = run(&ParetoInput::new(50.0, 10.0), &[]);
        assert!(out.result.is_empty());
        assert!(out.confidence < 1.0);
    }

    #[test]
    fn test_repeatable() {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);
        let input = ParetoInput::new(120.0, 20.0);
        let catalog = StaticCatalog::builtin();
        let a = pareto_optimize_poles(&ctx, &input, &catalog).unwrap();
        let b = pareto_optimize_poles(&ctx, &input, &catalog).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_tie_key_depends_on_seed() {
        assert_eq!(tie_key(1, "HSS6X6X1/4"), tie_key(1, "HSS6X6X1/4"));
        assert_ne!(tie_key(1, "HSS6X6X1/4"), tie_key(2, "HSS6X6X1/4"));
    }

    #[test]
    fn test_seed_orders_exact_ties() {
        let candidates = vec![
            candidate("TWIN-A", 15.0, 150.0, SectionStatus::Ok),
            candidate("TWIN-B", 15.0, 150.0, SectionStatus::Ok),
        ];
        let mut seen = Vec::new();
        for seed in 0..64 {
            let mut input = ParetoInput::new(50.0, 20.0);
            input.seed = seed;
            let out = run(&input, &candidates);
            assert!(out.result.iter().all(|s| !s.is_dominated));
            let expected = if tie_key(seed, "TWIN-A") < tie_key(seed, "TWIN-B") {
                "TWIN-A"
            } else {
                "TWIN-B"
            };
            assert_eq!(out.result[0].designation, expected, "seed {}", seed);
            if !seen.contains(&expected) {
                seen.push(expected);
            }
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_validation() {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);
        let mut input = ParetoInput::new(50.0, 10.0);
        input.max_solutions = 0;
        assert!(pareto_optimize(&ctx, &input, &[]).is_err());
        let mut input = ParetoInput::new(50.0, 0.0);
        input.cost_per_lb = Some(3.0);
        assert!(pareto_optimize(&ctx, &input, &[]).is_err());
    }
}

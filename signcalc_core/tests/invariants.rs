//! Property-based tests for the solver invariants.
//!
//! Footing depth ordering, the feasibility status contract, Pareto
//! non-domination and confidence bounds must hold for all valid inputs.

use proptest::prelude::*;
use signcalc_core::calculations::feasibility::{filter_sections, FeasibilityInput};
use signcalc_core::calculations::footing::{footing_solve, FootingInput};
use signcalc_core::calibration::CalibrationStore;
use signcalc_core::context::SolveContext;
use signcalc_core::envelope::calc_confidence;
use signcalc_core::optimization::pareto::{pareto_optimize, ParetoInput};
use signcalc_core::sections::{builtin_pole_sections, Section, SectionFamily, SteelGrade};
use signcalc_core::settings::DesignSettings;
use signcalc_core::versioning::SolverRegistry;

struct Fixture {
    store: CalibrationStore,
    settings: DesignSettings,
    registry: SolverRegistry,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            store: CalibrationStore::with_defaults(),
            settings: DesignSettings::default(),
            registry: SolverRegistry::with_defaults(),
        }
    }

    fn ctx(&self) -> SolveContext<'_> {
        SolveContext::new(&self.store, &self.settings, &self.registry)
    }

    fn depth_in(&self, diameter_ft: f64, moment_kipft: f64, soil_psf: f64, poles: u32) -> f64 {
        footing_solve(&self.ctx(), &FootingInput::new(diameter_ft, moment_kipft, soil_psf, poles))
            .unwrap()
            .result
            .depth_in
    }
}

fn synthetic_section(i: usize, weight_plf: f64, sx_in3: f64, cost_basis: f64) -> Section {
    Section {
        family: SectionFamily::HssRound,
        designation: format!("TEST{:02}", i),
        grade: Some(SteelGrade::A500B),
        weight_plf,
        area_in2: weight_plf / 3.4,
        sx_in3,
        ix_in4: sx_in3 * 4.0,
        rx_in: 3.0,
        yield_strength_ksi: 46.0,
        cost_basis,
    }
}

// =============================================================================
// Footing Properties
// =============================================================================

proptest! {
    /// Wider footings are never deeper, and strictly shallower above the floor
    #[test]
    fn prop_footing_decreases_with_diameter(
        d1 in 1.0f64..5.0,
        dd in 0.1f64..3.0,
        moment in 1.0f64..500.0,
        soil in 1000.0f64..6000.0,
    ) {
        let f = Fixture::new();
        let shallow = f.depth_in(d1 + dd, moment, soil, 1);
        let deep = f.depth_in(d1, moment, soil, 1);
        prop_assert!(deep >= shallow);
        if shallow > f.settings.min_footing_depth_in {
            prop_assert!(deep > shallow);
        }
    }

    /// Larger moments need deeper footings, strictly once above the floor
    #[test]
    fn prop_footing_increases_with_moment(
        diameter in 1.0f64..6.0,
        m1 in 1.0f64..500.0,
        dm in 0.5f64..200.0,
        soil in 1000.0f64..6000.0,
    ) {
        let f = Fixture::new();
        let low = f.depth_in(diameter, m1, soil, 1);
        let high = f.depth_in(diameter, m1 + dm, soil, 1);
        prop_assert!(high >= low);
        if low > f.settings.min_footing_depth_in {
            prop_assert!(high > low);
        }
    }

    /// Two poles sharing a moment each need less embedment than one
    #[test]
    fn prop_two_pole_split(
        diameter in 1.0f64..3.0,
        moment in 50.0f64..500.0,
        soil in 1000.0f64..4000.0,
    ) {
        let f = Fixture::new();
        let one = f.depth_in(diameter, moment, soil, 1);
        let two = f.depth_in(diameter, moment, soil, 2);
        prop_assert!(two <= one);
        if two > f.settings.min_footing_depth_in {
            prop_assert!(two < one);
        }
    }

    /// The minimum embedment always holds
    #[test]
    fn prop_footing_floor(
        diameter in 0.5f64..10.0,
        moment in 0.1f64..1000.0,
        soil in 500.0f64..10000.0,
        poles in 1u32..4,
    ) {
        let f = Fixture::new();
        prop_assert!(f.depth_in(diameter, moment, soil, poles) >= 36.0);
    }
}

// =============================================================================
// Feasibility Properties
// =============================================================================

proptest! {
    /// Usable sections are never overstressed
    #[test]
    fn prop_usable_sections_within_limit(
        moment in 0.0f64..3000.0,
        height in 5.0f64..40.0,
    ) {
        let f = Fixture::new();
        let out = filter_sections(
            &f.ctx(),
            &FeasibilityInput::new(moment, height),
            &builtin_pole_sections(),
        )
        .unwrap();
        for s in out.result.iter().filter(|s| s.status.is_usable()) {
            prop_assert!(s.stress_ratio <= 1.0, "{} ratio {}", s.section.designation, s.stress_ratio);
            prop_assert!(s.slenderness_ratio <= f.settings.max_slenderness);
        }
        prop_assert!((0.0..=1.0).contains(&out.confidence));
    }
}

// =============================================================================
// Pareto Properties
// =============================================================================

proptest! {
    /// Non-dominated solutions never dominate each other, and every dominated
    /// solution is dominated by something
    #[test]
    fn prop_pareto_front_is_mutually_non_dominated(
        specs in prop::collection::vec((5.0f64..80.0, 5.0f64..120.0, 0.5f64..2.0), 1..25),
        moment in 10.0f64..400.0,
    ) {
        let f = Fixture::new();
        let catalog: Vec<Section> = specs
            .iter()
            .enumerate()
            .map(|(i, (w, sx, c))| synthetic_section(i, *w, *sx, *c))
            .collect();
        let screened = filter_sections(&f.ctx(), &FeasibilityInput::new(moment, 10.0), &catalog).unwrap();
        let mut input = ParetoInput::new(moment, 10.0);
        input.max_solutions = catalog.len();
        let out = pareto_optimize(&f.ctx(), &input, &screened.result).unwrap();

        let front: Vec<_> = out.result.iter().filter(|s| !s.is_dominated).collect();
        for a in &front {
            for b in &front {
                prop_assert!(!a.dominates(b));
            }
        }
        for d in out.result.iter().filter(|s| s.is_dominated) {
            prop_assert!(out.result.iter().any(|o| o.dominates(d)));
        }
        prop_assert!((0.0..=1.0).contains(&out.confidence));
    }
}

// =============================================================================
// Confidence Properties
// =============================================================================

fn assumption() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Warning: high stress".to_string()),
        Just("Bolt check failed".to_string()),
        Just("Request engineering review".to_string()),
        Just("No feasible section".to_string()),
        Just("Cannot solve for depth".to_string()),
        "[a-z ]{0,20}",
    ]
}

proptest! {
    /// Confidence stays in [0, 1] however many penalties accumulate
    #[test]
    fn prop_confidence_bounds(assumptions in prop::collection::vec(assumption(), 0..30)) {
        let c = calc_confidence(&assumptions);
        prop_assert!((0.0..=1.0).contains(&c));
    }
}

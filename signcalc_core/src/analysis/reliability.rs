//! # Monte Carlo Reliability
//!
//! Estimates the failure probability `pf = P(R < Q)` of a normally
//! distributed resistance `R` against a normally distributed load `Q`, and
//! the matching reliability index `β = −Φ⁻¹(pf)`.
//!
//! Sampling is seeded, so a given input and seed always give the same
//! answer. Different seeds give different (statistically consistent)
//! answers; the 95 % Wilson interval on `pf` narrows as the sample count
//! grows and is mapped through `−Φ⁻¹` into an interval on `β`.
//!
//! When no sample fails (or every sample fails) the empirical index is
//! unbounded, so `β` falls back to the first-order index
//! `(μR − μQ) / √(σR² + σQ²)`.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::analysis::reliability::{monte_carlo_reliability, ReliabilityInput};
//! use signcalc_core::calibration::CalibrationStore;
//! use signcalc_core::context::SolveContext;
//! use signcalc_core::settings::DesignSettings;
//! use signcalc_core::versioning::SolverRegistry;
//!
//! let (store, settings, registry) =
//!     (CalibrationStore::with_defaults(), DesignSettings::default(), SolverRegistry::with_defaults());
//! let ctx = SolveContext::new(&store, &settings, &registry);
//!
//! let input = ReliabilityInput::new(50.0, 10.0, 100.0, 12.0);
//! let out = monte_carlo_reliability(&ctx, &input).unwrap();
//! assert!(out.result.failure_probability < 0.01);
//! assert!(out.result.beta > 2.5);
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::{inverse_normal_cdf, standard_normal_pair, wilson_interval};
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_non_negative, CalcError, CalcResult, EPSILON};
use crate::versioning::solvers;

/// |β| is reported no larger than this
pub const BETA_LIMIT: f64 = 8.0;
/// Two-sided 95 % normal quantile
const Z_95: f64 = 1.959_963_984_540_054;
/// Upper bound on samples per call
pub const MAX_SAMPLES: u64 = 10_000_000;

fn default_samples() -> u64 {
    10_000
}

fn default_target_beta() -> f64 {
    3.5
}

/// Input for [`monte_carlo_reliability`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityInput {
    pub load_mean: f64,
    pub load_std: f64,
    pub resistance_mean: f64,
    pub resistance_std: f64,
    #[serde(default = "default_samples")]
    pub samples: u64,
    /// ASCE 7 target for normal-importance structures is 3.5
    #[serde(default = "default_target_beta")]
    pub target_beta: f64,
    #[serde(default)]
    pub seed: u64,
    /// Pair every draw with its mirror image
    #[serde(default)]
    pub antithetic: bool,
}

impl ReliabilityInput {
    pub fn new(load_mean: f64, load_std: f64, resistance_mean: f64, resistance_std: f64) -> Self {
        ReliabilityInput {
            load_mean,
            load_std,
            resistance_mean,
            resistance_std,
            samples: default_samples(),
            target_beta: default_target_beta(),
            seed: 0,
            antithetic: false,
        }
    }

    pub fn validate(&self) -> CalcResult<()> {
        for (field, v) in [
            ("load_mean", self.load_mean),
            ("resistance_mean", self.resistance_mean),
            ("target_beta", self.target_beta),
        ] {
            if !v.is_finite() {
                return Err(CalcError::invalid_input(field, v.to_string(), "Must be finite"));
            }
        }
        require_non_negative("load_std", self.load_std, "Standard deviation cannot be negative")?;
        require_non_negative(
            "resistance_std",
            self.resistance_std,
            "Standard deviation cannot be negative",
        )?;
        if self.samples < 2 || self.samples > MAX_SAMPLES {
            return Err(CalcError::invalid_input(
                "samples",
                self.samples.to_string(),
                format!("Sample count must be between 2 and {}", MAX_SAMPLES),
            ));
        }
        Ok(())
    }

    /// Cornell / first-order index
    pub fn first_order_beta(&self) -> f64 {
        let mu_g = self.resistance_mean - self.load_mean;
        let sigma_g = (self.resistance_std.powi(2) + self.load_std.powi(2)).sqrt();
        if sigma_g < EPSILON {
            return if mu_g > 0.0 {
                BETA_LIMIT
            } else if mu_g < 0.0 {
                -BETA_LIMIT
            } else {
                0.0
            };
        }
        (mu_g / sigma_g).clamp(-BETA_LIMIT, BETA_LIMIT)
    }
}

/// Reliability estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityResult {
    pub beta: f64,
    pub beta_first_order: f64,
    pub failure_probability: f64,
    pub failures: u64,
    pub samples: u64,
    /// 95 % interval on β, (lower, upper)
    pub beta_ci: (f64, f64),
    /// 95 % Wilson interval on pf, (lower, upper)
    pub pf_ci: (f64, f64),
    pub passes_target: bool,
    pub target_beta: f64,
}

fn beta_from_pf(pf: f64) -> f64 {
    (-inverse_normal_cdf(pf)).clamp(-BETA_LIMIT, BETA_LIMIT)
}

/// Count limit-state exceedances over `samples` seeded draws.
fn count_failures(input: &ReliabilityInput) -> u64 {
    let mut rng = StdRng::seed_from_u64(input.seed);
    let mut failures = 0u64;
    let (mut zq, mut zr) = (0.0, 0.0);
    for i in 0..input.samples {
        if input.antithetic && i % 2 == 1 {
            zq = -zq;
            zr = -zr;
        } else {
            (zq, zr) = standard_normal_pair(&mut rng);
        }
        let q = input.load_mean + input.load_std * zq;
        let r = input.resistance_mean + input.resistance_std * zr;
        if r < q {
            failures += 1;
        }
    }
    failures
}

/// Estimate failure probability and reliability index by simulation.
pub fn monte_carlo_reliability(
    ctx: &SolveContext,
    input: &ReliabilityInput,
) -> CalcResult<SolverOutput<ReliabilityResult>> {
    input.validate()?;

    let failures = count_failures(input);
    let n = input.samples;
    let pf = failures as f64 / n as f64;
    let beta_first_order = input.first_order_beta();

    let mut assumptions = vec![format!(
        "Normal load and resistance, {} seeded samples{}",
        n,
        if input.antithetic { " (antithetic pairs)" } else { "" }
    )];

    let beta = if failures == 0 || failures == n {
        assumptions.push(format!(
            "Monte Carlo estimate unresolved at {} samples (pf = {}); beta from first-order index",
            n, pf
        ));
        beta_first_order
    } else {
        beta_from_pf(pf)
    };

    let pf_ci = wilson_interval(failures, n, Z_95);
    let beta_ci = (beta_from_pf(pf_ci.1), beta_from_pf(pf_ci.0));
    let passes_target = beta >= input.target_beta;
    if !passes_target {
        assumptions.push(format!(
            "Warning: beta {:.2} below target {:.2}",
            beta, input.target_beta
        ));
    }

    debug!(samples = n, failures, pf, beta, "reliability.monte_carlo");

    let result = ReliabilityResult {
        beta,
        beta_first_order,
        failure_probability: pf,
        failures,
        samples: n,
        beta_ci,
        pf_ci,
        passes_target,
        target_beta: input.target_beta,
    };
    Ok(ctx.output(solvers::MONTE_CARLO_RELIABILITY, result, assumptions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;
    use crate::settings::DesignSettings;
    use crate::versioning::SolverRegistry;

    fn run(input: &ReliabilityInput) -> SolverOutput<ReliabilityResult> {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        monte_carlo_reliability(&SolveContext::new(&store, &settings, &registry), input).unwrap()
    }

    #[test]
    fn test_matches_analytic_pf() {
        // β = 1.0 exactly: pf = Φ(-1) = 0.1587
        let mut input = ReliabilityInput::new(0.0, 3.0, 5.0, 4.0);
        input.samples = 50_000;
        input.seed = 11;
        let r = run(&input).result;
        assert!((r.failure_probability - 0.1587).abs() < 0.01, "pf = {}", r.failure_probability);
        assert!((r.beta - 1.0).abs() < 0.05, "beta = {}", r.beta);
        assert!((r.beta_first_order - 1.0).abs() < 1e-12);
        assert!(r.pf_ci.0 <= r.failure_probability && r.failure_probability <= r.pf_ci.1);
        assert!(r.beta_ci.0 <= r.beta && r.beta <= r.beta_ci.1);
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut input = ReliabilityInput::new(40.0, 8.0, 60.0, 9.0);
        input.seed = 42;
        assert_eq!(run(&input).result, run(&input).result);
    }

    #[test]
    fn test_more_samples_narrow_interval() {
        let mut small = ReliabilityInput::new(40.0, 8.0, 60.0, 9.0);
        small.samples = 1_000;
        let mut large = small.clone();
        large.samples = 100_000;
        let ws = run(&small).result.pf_ci;
        let wl = run(&large).result.pf_ci;
        assert!(wl.1 - wl.0 < ws.1 - ws.0);
    }

    #[test]
    fn test_no_failures_falls_back() {
        let input = ReliabilityInput::new(10.0, 1.0, 100.0, 1.0);
        let out = run(&input);
        assert_eq!(out.result.failures, 0);
        assert_eq!(out.result.beta, BETA_LIMIT);
        assert!(out.result.passes_target);
        assert!(out.assumptions.iter().any(|a| a.contains("first-order")));
        assert_eq!(out.result.pf_ci.0, 0.0);
    }

    #[test]
    fn test_all_failures() {
        let input = ReliabilityInput::new(100.0, 1.0, 10.0, 1.0);
        let r = run(&input).result;
        assert_eq!(r.failures, r.samples);
        assert_eq!(r.failure_probability, 1.0);
        assert_eq!(r.beta, -BETA_LIMIT);
        assert!(!r.passes_target);
    }

    #[test]
    fn test_antithetic_reproducible() {
        let mut input = ReliabilityInput::new(0.0, 3.0, 5.0, 4.0);
        input.antithetic = true;
        input.samples = 20_001;
        let a = run(&input).result;
        let b = run(&input).result;
        assert_eq!(a, b);
        assert!((a.failure_probability - 0.1587).abs() < 0.015);
    }

    #[test]
    fn test_validation() {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);

        let mut bad = ReliabilityInput::new(1.0, -1.0, 2.0, 1.0);
        assert!(monte_carlo_reliability(&ctx, &bad).is_err());
        bad.load_std = 1.0;
        bad.samples = 1;
        assert!(monte_carlo_reliability(&ctx, &bad).is_err());
    }
}

//! # Sensitivity Analysis
//!
//! One-at-a-time variance decomposition. Each input is sampled from its
//! normal distribution while every other input sits at its mean; the output
//! variance that results is that input's partial variance, and its importance
//! is its share of the summed partial variances.
//!
//! All inputs are driven by the same standard-normal sequence (common random
//! numbers), so for a linear function `y = Σ cᵢ·xᵢ` the importances are
//! exactly proportional to `cᵢ²·σᵢ²` and the ranking never depends on
//! sampling noise.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use signcalc_core::analysis::sensitivity::{sensitivity_analysis, InputDistribution, SensitivityInput};
//! use signcalc_core::calibration::CalibrationStore;
//! use signcalc_core::context::SolveContext;
//! use signcalc_core::settings::DesignSettings;
//! use signcalc_core::versioning::SolverRegistry;
//!
//! let (store, settings, registry) =
//!     (CalibrationStore::with_defaults(), DesignSettings::default(), SolverRegistry::with_defaults());
//! let ctx = SolveContext::new(&store, &settings, &registry);
//!
//! let mut inputs = BTreeMap::new();
//! inputs.insert("wind".to_string(), InputDistribution { mean: 115.0, std: 10.0 });
//! inputs.insert("area".to_string(), InputDistribution { mean: 112.0, std: 2.0 });
//! let input = SensitivityInput { inputs, samples: 500, seed: 1 };
//!
//! let out = sensitivity_analysis(&ctx, &input, |x| x["wind"] * 3.0 + x["area"]).unwrap();
//! assert_eq!(out.result.ranked_inputs, vec!["wind", "area"]);
//! ```

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::{fill_standard_normal, variance};
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_non_negative, CalcError, CalcResult};
use crate::versioning::solvers;

/// Upper bound on samples per call
pub const MAX_SAMPLES: usize = 1_000_000;

/// Normal distribution of one input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputDistribution {
    pub mean: f64,
    pub std: f64,
}

/// Input for [`sensitivity_analysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub inputs: BTreeMap<String, InputDistribution>,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default)]
    pub seed: u64,
}

fn default_samples() -> usize {
    1000
}

impl SensitivityInput {
    pub fn validate(&self) -> CalcResult<()> {
        if self.inputs.is_empty() {
            return Err(CalcError::missing_field("inputs"));
        }
        for (name, dist) in &self.inputs {
            if !dist.mean.is_finite() {
                return Err(CalcError::invalid_input(
                    format!("inputs.{}.mean", name),
                    dist.mean.to_string(),
                    "Mean must be finite",
                ));
            }
            require_non_negative(
                &format!("inputs.{}.std", name),
                dist.std,
                "Standard deviation cannot be negative",
            )?;
        }
        if self.samples < 2 || self.samples > MAX_SAMPLES {
            return Err(CalcError::invalid_input(
                "samples",
                self.samples.to_string(),
                format!("Sample count must be between 2 and {}", MAX_SAMPLES),
            ));
        }
        Ok(())
    }

    fn means(&self) -> BTreeMap<String, f64> {
        self.inputs.iter().map(|(k, d)| (k.clone(), d.mean)).collect()
    }
}

/// Ranked input importances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    /// Most influential first; ties by name
    pub ranked_inputs: Vec<String>,
    /// Normalized importance; sums to 1 unless every partial variance is zero
    pub sensitivities: BTreeMap<String, f64>,
    pub partial_variances: BTreeMap<String, f64>,
    pub samples: usize,
}

/// Rank inputs by their share of output variance.
pub fn sensitivity_analysis<F>(
    ctx: &SolveContext,
    input: &SensitivityInput,
    output: F,
) -> CalcResult<SolverOutput<SensitivityResult>>
where
    F: Fn(&BTreeMap<String, f64>) -> f64,
{
    input.validate()?;

    let mut z = vec![0.0; input.samples];
    fill_standard_normal(&mut StdRng::seed_from_u64(input.seed), &mut z);

    let mut point = input.means();
    let mut partial_variances = BTreeMap::new();
    let mut outputs = Vec::with_capacity(input.samples);
    for (name, dist) in &input.inputs {
        outputs.clear();
        for zk in &z {
            point.insert(name.clone(), dist.mean + dist.std * zk);
            let y = output(&point);
            if !y.is_finite() {
                return Err(CalcError::calculation_failed(
                    "sensitivity_analysis",
                    format!("output function returned {} while varying '{}'", y, name),
                ));
            }
            outputs.push(y);
        }
        point.insert(name.clone(), dist.mean);
        partial_variances.insert(name.clone(), variance(&outputs));
    }

    let total: f64 = partial_variances.values().sum();
    let mut assumptions = vec![format!(
        "One-at-a-time variance decomposition, {} common random samples",
        input.samples
    )];
    let sensitivities: BTreeMap<String, f64> = if total > 0.0 {
        partial_variances
            .iter()
            .map(|(k, v)| (k.clone(), v / total))
            .collect()
    } else {
        assumptions.push("Warning: output has zero variance; all sensitivities are zero".to_string());
        partial_variances.keys().map(|k| (k.clone(), 0.0)).collect()
    };

    // BTreeMap order is alphabetical and the sort is stable, so ties stay by name
    let mut ranked_inputs: Vec<String> = sensitivities.keys().cloned().collect();
    ranked_inputs.sort_by(|a, b| sensitivities[b].total_cmp(&sensitivities[a]));

    debug!(inputs = input.inputs.len(), total_variance = total, "sensitivity.analyze");

    let result = SensitivityResult {
        ranked_inputs,
        sensitivities,
        partial_variances,
        samples: input.samples,
    };
    Ok(ctx.output(solvers::SENSITIVITY_ANALYSIS, result, assumptions))
}

fn default_scale() -> f64 {
    1.0
}

/// Closed-form output function for requests that arrive as data.
///
/// Every variable a model names must be one of the analysis inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseModel {
    /// `intercept + Σ cᵢ·xᵢ`
    Linear {
        #[serde(default)]
        intercept: f64,
        coefficients: BTreeMap<String, f64>,
    },
    /// `scale · Π xᵢ^eᵢ`, e.g. wind moment ∝ V²·A·h
    PowerLaw {
        #[serde(default = "default_scale")]
        scale: f64,
        exponents: BTreeMap<String, f64>,
    },
}

impl ResponseModel {
    fn terms(&self) -> &BTreeMap<String, f64> {
        match self {
            ResponseModel::Linear { coefficients, .. } => coefficients,
            ResponseModel::PowerLaw { exponents, .. } => exponents,
        }
    }

    /// Reject models that reference unknown inputs.
    pub fn validate(&self, input: &SensitivityInput) -> CalcResult<()> {
        if self.terms().is_empty() {
            return Err(CalcError::missing_field("model.terms"));
        }
        for name in self.terms().keys() {
            if !input.inputs.contains_key(name) {
                return Err(CalcError::invalid_input(
                    "model",
                    name.as_str(),
                    "model references a variable that is not an input",
                ));
            }
        }
        Ok(())
    }

    pub fn evaluate(&self, x: &BTreeMap<String, f64>) -> f64 {
        match self {
            ResponseModel::Linear {
                intercept,
                coefficients,
            } => coefficients
                .iter()
                .fold(*intercept, |acc, (k, c)| acc + c * x.get(k).copied().unwrap_or(0.0)),
            ResponseModel::PowerLaw { scale, exponents } => exponents
                .iter()
                .fold(*scale, |acc, (k, e)| acc * x.get(k).copied().unwrap_or(0.0).powf(*e)),
        }
    }
}

/// [`sensitivity_analysis`] of a [`ResponseModel`].
pub fn sensitivity_of_model(
    ctx: &SolveContext,
    input: &SensitivityInput,
    model: &ResponseModel,
) -> CalcResult<SolverOutput<SensitivityResult>> {
    model.validate(input)?;
    sensitivity_analysis(ctx, input, |x| model.evaluate(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;
    use crate::settings::DesignSettings;
    use crate::versioning::SolverRegistry;

    fn dist(mean: f64, std: f64) -> InputDistribution {
        InputDistribution { mean, std }
    }

    fn run<F: Fn(&BTreeMap<String, f64>) -> f64>(
        input: &SensitivityInput,
        f: F,
    ) -> CalcResult<SolverOutput<SensitivityResult>> {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        sensitivity_analysis(&SolveContext::new(&store, &settings, &registry), input, f)
    }

    fn linear_input() -> SensitivityInput {
        let mut inputs = BTreeMap::new();
        inputs.insert("a".to_string(), dist(1.0, 1.0));
        inputs.insert("b".to_string(), dist(1.0, 1.0));
        inputs.insert("c".to_string(), dist(1.0, 1.0));
        SensitivityInput {
            inputs,
            samples: 200,
            seed: 3,
        }
    }

    #[test]
    fn test_linear_ranking_and_shares() {
        let out = run(&linear_input(), |x| x["a"] + 3.0 * x["b"] + 2.0 * x["c"]).unwrap();
        let r = out.result;
        assert_eq!(r.ranked_inputs, vec!["b", "c", "a"]);
        // shares 1 : 9 : 4
        assert!((r.sensitivities["b"] - 9.0 / 14.0).abs() < 1e-9);
        assert!((r.sensitivities["a"] - 1.0 / 14.0).abs() < 1e-9);
        let sum: f64 = r.sensitivities.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_stable_across_seeds() {
        for seed in 0..5 {
            let mut input = linear_input();
            input.seed = seed;
            let r = run(&input, |x| 5.0 * x["a"] - 2.0 * x["b"] + 0.5 * x["c"]).unwrap().result;
            assert_eq!(r.ranked_inputs, vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn test_zero_variance() {
        let out = run(&linear_input(), |_| 42.0).unwrap();
        assert_eq!(out.result.ranked_inputs, vec!["a", "b", "c"]);
        assert!(out.result.sensitivities.values().all(|v| *v == 0.0));
        assert!(out.confidence < 1.0);
    }

    #[test]
    fn test_ties_by_name() {
        let out = run(&linear_input(), |x| x["c"] + x["a"]).unwrap();
        assert_eq!(out.result.ranked_inputs, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_non_finite_output() {
        let err = run(&linear_input(), |x| 1.0 / (x["a"] - x["a"])).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_FAILED");
    }

    #[test]
    fn test_validation() {
        let mut input = linear_input();
        input.inputs.clear();
        assert!(run(&input, |_| 0.0).is_err());

        let mut input = linear_input();
        input.inputs.insert("d".into(), dist(0.0, -1.0));
        assert!(run(&input, |_| 0.0).is_err());
    }

    #[test]
    fn test_response_model_from_json() {
        let model: ResponseModel = serde_json::from_str(
            r#"{"kind": "linear", "coefficients": {"a": 5.0, "b": -2.0, "c": 0.5}}"#,
        )
        .unwrap();
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);
        let out = sensitivity_of_model(&ctx, &linear_input(), &model).unwrap();
        assert_eq!(out.result.ranked_inputs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_power_law_model() {
        let mut exponents = BTreeMap::new();
        exponents.insert("a".to_string(), 2.0);
        exponents.insert("b".to_string(), 1.0);
        let model = ResponseModel::PowerLaw { scale: 0.5, exponents };
        let mut x = BTreeMap::new();
        x.insert("a".to_string(), 3.0);
        x.insert("b".to_string(), 4.0);
        assert!((model.evaluate(&x) - 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_model_unknown_variable() {
        let mut coefficients = BTreeMap::new();
        coefficients.insert("z".to_string(), 1.0);
        let model = ResponseModel::Linear {
            intercept: 0.0,
            coefficients,
        };
        let err = model.validate(&linear_input()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}

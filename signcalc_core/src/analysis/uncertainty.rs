//! Symmetric normal bands around a nominal value.

use serde::{Deserialize, Serialize};

use super::stats::inverse_normal_cdf;
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_non_negative, CalcError, CalcResult};
use crate::versioning::solvers;

fn default_cov() -> f64 {
    0.1
}

fn default_confidence() -> f64 {
    0.9
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandsInput {
    pub nominal: f64,
    #[serde(default = "default_cov")]
    pub coefficient_of_variation: f64,
    #[serde(default = "default_confidence")]
    pub confidence_level: f64,
}

impl BandsInput {
    pub fn new(nominal: f64) -> Self {
        BandsInput {
            nominal,
            coefficient_of_variation: default_cov(),
            confidence_level: default_confidence(),
        }
    }

    pub fn validate(&self) -> CalcResult<()> {
        if !self.nominal.is_finite() {
            return Err(CalcError::invalid_input(
                "nominal",
                self.nominal.to_string(),
                "Must be finite",
            ));
        }
        require_non_negative(
            "coefficient_of_variation",
            self.coefficient_of_variation,
            "Coefficient of variation cannot be negative",
        )?;
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(CalcError::invalid_input(
                "confidence_level",
                self.confidence_level.to_string(),
                "Confidence level must be strictly between 0 and 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBands {
    pub nominal: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub confidence_level: f64,
}

/// `nominal ± z·|nominal|·cov` with `z = Φ⁻¹(1 − α/2)`.
pub fn compute_uncertainty_bands(
    ctx: &SolveContext,
    input: &BandsInput,
) -> CalcResult<SolverOutput<UncertaintyBands>> {
    input.validate()?;
    let alpha = 1.0 - input.confidence_level;
    let z = inverse_normal_cdf(1.0 - alpha / 2.0);
    let std_dev = input.nominal.abs() * input.coefficient_of_variation;

    let result = UncertaintyBands {
        nominal: input.nominal,
        lower_bound: input.nominal - z * std_dev,
        upper_bound: input.nominal + z * std_dev,
        std_dev,
        coefficient_of_variation: input.coefficient_of_variation,
        confidence_level: input.confidence_level,
    };
    let assumptions = vec![format!(
        "Normal distribution, two-sided {:.0}% band (z = {:.3})",
        input.confidence_level * 100.0,
        z
    )];
    Ok(ctx.output(solvers::UNCERTAINTY_BANDS, result, assumptions))
}

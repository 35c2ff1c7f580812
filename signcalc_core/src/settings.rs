//! # Design Settings
//!
//! Policy values shared by every solver: status thresholds, footing limits,
//! which calibration version each group of constants is read from, cache
//! policy, cost weights and genetic-algorithm parameters.
//!
//! Settings are plain serde data with sensible defaults. A JSON document only
//! needs to name the fields it overrides.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::settings::DesignSettings;
//!
//! let settings = DesignSettings::from_json(r#"{"max_pole_height_ft": 35.0}"#).unwrap();
//! assert_eq!(settings.max_pole_height_ft, 35.0);
//! assert_eq!(settings.min_footing_depth_in, 36.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;
use crate::calibration::versions;
use crate::errors::{CalcError, CalcResult};

/// Which published version each group of constants is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationVersions {
    /// Wind coefficients (C1, Kd, Kzt, G, Cf, exposure profile)
    pub wind: String,
    /// Steel resistance factors and weld electrode
    pub steel: String,
    /// Anchor breakout, shear and bearing
    pub concrete: String,
    /// Embedment K factor
    pub footing: String,
    /// Presumptive soil values
    pub site: String,
}

impl Default for CalibrationVersions {
    fn default() -> Self {
        CalibrationVersions {
            wind: versions::ASCE7_22.to_string(),
            steel: versions::AISC360_22.to_string(),
            concrete: versions::ACI318_19.to_string(),
            footing: versions::FOOTING_V2.to_string(),
            site: versions::IBC2024.to_string(),
        }
    }
}

/// Unit costs used to price a baseplate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseplateCosts {
    /// Plate steel, $/lb
    pub plate_per_lb: f64,
    /// Installed anchor bolt, $/each
    pub anchor_each: f64,
    /// Fillet weld, $/in
    pub weld_per_in: f64,
}

impl Default for BaseplateCosts {
    fn default() -> Self {
        BaseplateCosts {
            plate_per_lb: 2.0,
            anchor_each: 5.0,
            weld_per_in: 0.5,
        }
    }
}

/// Genetic algorithm parameters for the baseplate optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaSettings {
    pub population_size: usize,
    pub tournament_size: usize,
    /// Best individuals copied unchanged into the next generation
    pub elite_count: usize,
    pub crossover_prob: f64,
    /// Base probability that an individual is mutated
    pub mutation_prob: f64,
    /// Probability that each gene of a mutated individual changes
    pub gene_mutation_prob: f64,
    /// Gaussian mutation width as a fraction of each gene's range
    pub mutation_sigma: f64,
    /// Blend crossover extension
    pub blend_alpha: f64,
    /// Stop after this many generations without improvement
    pub plateau_generations: usize,
    /// Fitness change that still counts as "no improvement"
    pub plateau_tolerance: f64,
}

impl Default for GaSettings {
    fn default() -> Self {
        GaSettings {
            population_size: 50,
            tournament_size: 3,
            elite_count: 5,
            crossover_prob: 0.7,
            mutation_prob: 0.3,
            gene_mutation_prob: 0.2,
            mutation_sigma: 0.1,
            blend_alpha: 0.5,
            plateau_generations: 10,
            plateau_tolerance: 0.01,
        }
    }
}

/// Solver-wide policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignSettings {
    /// Stress ratio above which a section is overstressed
    pub stress_limit: f64,
    /// Stress ratio above which a section is flagged as highly stressed
    pub high_stress_threshold: f64,
    /// KL/r limit
    pub max_slenderness: f64,
    /// Minimum embedment depth, inches
    pub min_footing_depth_in: f64,
    /// Depths beyond this require engineering review, feet
    pub max_footing_depth_ft: f64,
    /// Structures taller than this get a warning, feet
    pub max_pole_height_ft: f64,
    pub versions: CalibrationVersions,
    pub cache: CachePolicy,
    /// Installed pole steel, $/lb
    pub pole_cost_per_lb: f64,
    pub baseplate_costs: BaseplateCosts,
    pub ga: GaSettings,
    /// Batch worker pool size
    pub workers: usize,
}

impl Default for DesignSettings {
    fn default() -> Self {
        DesignSettings {
            stress_limit: 1.0,
            high_stress_threshold: 0.9,
            max_slenderness: 200.0,
            min_footing_depth_in: 36.0,
            max_footing_depth_ft: 15.0,
            max_pole_height_ft: 40.0,
            versions: CalibrationVersions::default(),
            cache: CachePolicy::default(),
            pole_cost_per_lb: 3.0,
            baseplate_costs: BaseplateCosts::default(),
            ga: GaSettings::default(),
            workers: 4,
        }
    }
}

impl DesignSettings {
    /// Parse and validate settings from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> CalcResult<Self> {
        let settings: DesignSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no solver can work with.
    pub fn validate(&self) -> CalcResult<()> {
        let positive = [
            ("stress_limit", self.stress_limit),
            ("high_stress_threshold", self.high_stress_threshold),
            ("max_slenderness", self.max_slenderness),
            ("min_footing_depth_in", self.min_footing_depth_in),
            ("max_footing_depth_ft", self.max_footing_depth_ft),
            ("max_pole_height_ft", self.max_pole_height_ft),
            ("pole_cost_per_lb", self.pole_cost_per_lb),
        ];
        for (what, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CalcError::configuration(what, format!("must be positive, got {}", value)));
            }
        }
        if self.high_stress_threshold > self.stress_limit {
            return Err(CalcError::configuration(
                "high_stress_threshold",
                "must not exceed stress_limit",
            ));
        }
        if self.workers == 0 {
            return Err(CalcError::configuration("workers", "at least one worker is required"));
        }
        let ga = &self.ga;
        if ga.population_size < 2 {
            return Err(CalcError::configuration("ga.population_size", "must be at least 2"));
        }
        if ga.tournament_size == 0 || ga.tournament_size > ga.population_size {
            return Err(CalcError::configuration(
                "ga.tournament_size",
                "must be between 1 and the population size",
            ));
        }
        if ga.elite_count >= ga.population_size {
            return Err(CalcError::configuration(
                "ga.elite_count",
                "must be smaller than the population size",
            ));
        }
        for (what, p) in [
            ("ga.crossover_prob", ga.crossover_prob),
            ("ga.mutation_prob", ga.mutation_prob),
            ("ga.gene_mutation_prob", ga.gene_mutation_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(CalcError::configuration(what, "must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

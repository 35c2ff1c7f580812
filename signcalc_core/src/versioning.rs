//! # Solver Versions
//!
//! Explicit name → version table recorded in every [`SolverOutput`]. The
//! registry is built once and passed by reference; nothing mutates it behind
//! the caller's back.
//!
//! [`SolverOutput`]: crate::envelope::SolverOutput

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Solver names as recorded in outputs.
pub mod solvers {
    pub const DERIVE_LOADS: &str = "derive_loads";
    pub const FILTER_SECTIONS: &str = "filter_sections";
    pub const FOOTING_SOLVE: &str = "footing_solve";
    pub const BASEPLATE_CHECKS: &str = "baseplate_checks";
    pub const PARETO_OPTIMIZE: &str = "pareto_optimize";
    pub const BASEPLATE_OPTIMIZE_GA: &str = "baseplate_optimize_ga";
    pub const BASEPLATE_GRID_SOLVE: &str = "baseplate_grid_solve";
    pub const MONTE_CARLO_RELIABILITY: &str = "monte_carlo_reliability";
    pub const SENSITIVITY_ANALYSIS: &str = "sensitivity_analysis";
    pub const UNCERTAINTY_BANDS: &str = "uncertainty_bands";
}

/// Name → version table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolverRegistry {
    versions: BTreeMap<String, String>,
}

impl SolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in solver.
    pub fn with_defaults() -> Self {
        let mut versions = BTreeMap::new();
        for (name, version) in [
            (solvers::DERIVE_LOADS, "1.2.0"),
            (solvers::FILTER_SECTIONS, "1.1.0"),
            (solvers::FOOTING_SOLVE, "1.3.0"),
            (solvers::BASEPLATE_CHECKS, "1.2.0"),
            (solvers::PARETO_OPTIMIZE, "1.0.0"),
            (solvers::BASEPLATE_OPTIMIZE_GA, "1.0.0"),
            (solvers::BASEPLATE_GRID_SOLVE, "1.0.0"),
            (solvers::MONTE_CARLO_RELIABILITY, "1.0.0"),
            (solvers::SENSITIVITY_ANALYSIS, "1.0.0"),
            (solvers::UNCERTAINTY_BANDS, "1.0.0"),
        ] {
            versions.insert(name.to_string(), version.to_string());
        }
        SolverRegistry { versions }
    }

    /// Register a solver. Registering a name twice is a configuration error.
    pub fn register(&mut self, name: impl Into<String>, version: impl Into<String>) -> CalcResult<()> {
        let name = name.into();
        if self.versions.contains_key(&name) {
            return Err(CalcError::configuration(name, "solver already registered"));
        }
        self.versions.insert(name, version.into());
        Ok(())
    }

    /// Version of a registered solver.
    pub fn version(&self, name: &str) -> CalcResult<&str> {
        self.versions
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CalcError::configuration(name, "solver not registered"))
    }

    /// Versions for a subset of solvers, e.g. those called while serving one request.
    /// Unregistered names map to "unknown".
    pub fn versions_for(&self, names: &[&str]) -> BTreeMap<String, String> {
        names
            .iter()
            .map(|n| {
                let v = self.versions.get(*n).cloned().unwrap_or_else(|| "unknown".to_string());
                (n.to_string(), v)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

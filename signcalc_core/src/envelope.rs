//! # Solver Output Envelope
//!
//! Every public solver returns its result wrapped in [`SolverOutput`]: the
//! solver name and version that produced it, the human-readable assumptions
//! made along the way, and a confidence score in `[0, 1]` derived from those
//! assumptions.

use serde::{Deserialize, Serialize};

/// Result of a solver call plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutput<T> {
    pub solver: String,
    pub solver_version: String,
    pub result: T,
    pub assumptions: Vec<String>,
    pub confidence: f64,
}

impl<T> SolverOutput<T> {
    /// Wrap a result, scoring confidence from the assumptions.
    pub fn new(
        solver: impl Into<String>,
        solver_version: impl Into<String>,
        result: T,
        assumptions: Vec<String>,
    ) -> Self {
        let confidence = calc_confidence(&assumptions);
        SolverOutput {
            solver: solver.into(),
            solver_version: solver_version.into(),
            result,
            assumptions,
            confidence,
        }
    }

    /// Transform the payload, keeping provenance.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SolverOutput<U> {
        SolverOutput {
            solver: self.solver,
            solver_version: self.solver_version,
            result: f(self.result),
            assumptions: self.assumptions,
            confidence: self.confidence,
        }
    }
}

/// Confidence from assumption keywords.
///
/// Each assumption takes the first matching penalty:
///
/// | keyword                        | penalty |
/// |--------------------------------|---------|
/// | "abstain", "cannot solve"      | 0.5     |
/// | "no feasible"                  | 0.4     |
/// | "fail"                         | 0.3     |
/// | "request engineering"          | 0.3     |
/// | "warning"                      | 0.1     |
///
/// The score starts at 1.0 and is clamped to `[0, 1]`.
pub fn calc_confidence(assumptions: &[String]) -> f64 {
    let mut confidence = 1.0_f64;
    for assumption in assumptions {
        let a = assumption.to_lowercase();
        if a.contains("abstain") || a.contains("cannot solve") {
            confidence -= 0.5;
        } else if a.contains("no feasible") {
            confidence -= 0.4;
        } else if a.contains("fail") {
            confidence -= 0.3;
        } else if a.contains("request engineering") {
            confidence -= 0.3;
        } else if a.contains("warning") {
            confidence -= 0.1;
        }
    }
    confidence.clamp(0.0, 1.0)
}

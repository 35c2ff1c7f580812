//! # Structural Calculations
//!
//! Deterministic checks for the members and connections of a sign support.
//! Each calculation follows the same pattern:
//!
//! - `*Input` - Input parameters (JSON-serializable) with `validate()`
//! - a result type (JSON-serializable)
//! - a solver function `fn(&SolveContext, &Input) -> CalcResult<SolverOutput<_>>`
//!
//! ## Available Calculations
//!
//! - [`feasibility`] - Pole section flexure and slenderness screening
//! - [`footing`] - Direct-burial footing embedment depth
//! - [`baseplate`] - Baseplate, weld and anchor checks

pub mod baseplate;
pub mod feasibility;
pub mod footing;

pub use baseplate::{
    baseplate_checks, BaseplateDesign, BaseplateInput, CheckResult, ConnectionLoads,
};
pub use feasibility::{
    filter_catalog, filter_sections, FeasibilityInput, FeasibleSection, SectionPrefs, SectionStatus,
    SortKey,
};
pub use footing::{footing_solve, Foundation, FootingConstraints, FootingInput};

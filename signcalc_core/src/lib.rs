//! # signcalc_core - Sign Support Calculation Engine
//!
//! `signcalc_core` sizes the structural parts of a pole-mounted sign: wind
//! loads on the cabinets, the pole section, the direct-burial footing and
//! the baseplate connection. It also runs the probabilistic checks that
//! accompany a design. All inputs and outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: identical inputs (and seeds) give byte-identical output
//! - **Versioned**: every result records the solver and version that produced it
//! - **Injected constants**: code constants come from a versioned [`CalibrationStore`]
//! - **Infeasible is not an error**: failing designs are results with assumptions
//!
//! ## Quick Start
//!
//! ```rust
//! use signcalc_core::engine::SignCalc;
//! use signcalc_core::loads::{Cabinet, Exposure, LoadInput, SiteLoads};
//!
//! let engine = SignCalc::default();
//! let loads = engine
//!     .derive_loads(&LoadInput {
//!         site: SiteLoads { wind_speed_mph: 115.0, exposure: Exposure::C },
//!         cabinets: vec![Cabinet::new(14.0, 8.0)],
//!         height_ft: 25.0,
//!     })
//!     .unwrap();
//! assert!(loads.result.moment_kipft > 0.0);
//! assert_eq!(loads.solver, "derive_loads");
//! ```
//!
//! ## Modules
//!
//! - [`calibration`] - Versioned code constants
//! - [`loads`] - Wind pressure, force and overturning moment
//! - [`sections`] - Pole section records and catalog sources
//! - [`calculations`] - Feasibility screening, footing depth, baseplate checks
//! - [`optimization`] - Pareto ranking and baseplate search
//! - [`analysis`] - Monte Carlo reliability, sensitivity, uncertainty bands
//! - [`batch`] - Parallel solves of many projects
//! - [`engine`] - Cached facade and JSON request dispatch
//! - [`cache`] - Deterministic memoization
//! - [`settings`] - Solver policy and thresholds
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types

pub mod analysis;
pub mod batch;
pub mod cache;
pub mod calculations;
pub mod calibration;
pub mod context;
pub mod engine;
pub mod envelope;
pub mod errors;
pub mod loads;
pub mod optimization;
pub mod sections;
pub mod settings;
pub mod units;
pub mod versioning;

// Re-export commonly used types at crate root for convenience
pub use calibration::{CalibrationConstant, CalibrationStore};
pub use context::SolveContext;
pub use engine::{SignCalc, SolveRequest};
pub use envelope::{calc_confidence, SolverOutput};
pub use errors::{CalcError, CalcResult};
pub use settings::DesignSettings;
pub use versioning::SolverRegistry;

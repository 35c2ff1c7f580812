//! # Design Optimization
//!
//! Searches over checked candidates. Every optimizer is deterministic for a
//! given input and seed.
//!
//! - [`pareto`] - Multi-objective ranking of usable pole sections
//! - [`genetic`] - Genetic search for the cheapest passing baseplate
//! - [`grid`] - Exhaustive baseplate search on the same shop grid
//! - [`space`] - Baseplate design variables, layout and scoring

pub mod genetic;
pub mod grid;
pub mod pareto;
pub mod space;

pub use genetic::{baseplate_optimize_ga, GaInput};
pub use grid::{baseplate_grid_solve, GridInput};
pub use pareto::{pareto_optimize, pareto_optimize_poles, ParetoInput, ParetoSolution};
pub use space::{BaseplateOptimum, PlateConstraints};

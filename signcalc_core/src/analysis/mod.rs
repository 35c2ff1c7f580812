//! # Probabilistic Analysis
//!
//! Seeded Monte Carlo solvers. Every routine takes an explicit seed and
//! draws from its own [`rand::rngs::StdRng`], so repeated calls agree
//! exactly and concurrent calls never share generator state.
//!
//! - [`reliability`] - Failure probability and reliability index
//! - [`sensitivity`] - Variance-share ranking of uncertain inputs
//! - [`uncertainty`] - Normal confidence bands around a nominal value

pub mod reliability;
pub mod sensitivity;
pub(crate) mod stats;
pub mod uncertainty;

pub use reliability::{monte_carlo_reliability, ReliabilityInput, ReliabilityResult};
pub use sensitivity::{
    sensitivity_analysis, sensitivity_of_model, InputDistribution, ResponseModel, SensitivityInput,
    SensitivityResult,
};
pub use uncertainty::{compute_uncertainty_bands, BandsInput, UncertaintyBands};

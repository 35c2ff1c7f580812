//! # Engine
//!
//! [`SignCalc`] owns everything a solver call needs: the calibration store,
//! design settings, solver registry, section catalog and one
//! [`DeterministicCache`] per cached solver. The free solver functions stay
//! the source of truth; the engine only decides which calls are memoized.
//!
//! Cached: `derive_loads`, `filter_sections` and `footing_solve`. The
//! stochastic and search solvers are seeded and cheap to repeat relative to
//! how rarely they are called with identical inputs, so they run uncached.
//!
//! [`SolveRequest`] is the data form of every operation, for callers that
//! speak JSON.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::engine::SignCalc;
//!
//! let engine = SignCalc::default();
//! let response = engine
//!     .dispatch_json(
//!         r#"{
//!             "operation": "derive_loads",
//!             "input": {
//!                 "site": { "wind_speed_mph": 115.0, "exposure": "C" },
//!                 "cabinets": [ { "width_ft": 14.0, "height_ft": 8.0 } ],
//!                 "height_ft": 25.0
//!             }
//!         }"#,
//!     )
//!     .unwrap();
//! assert!(response.contains("moment_kipft"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{
    compute_uncertainty_bands, monte_carlo_reliability, sensitivity_analysis, sensitivity_of_model,
    BandsInput, ReliabilityInput, ReliabilityResult, ResponseModel, SensitivityInput,
    SensitivityResult, UncertaintyBands,
};
use crate::batch::{solve_batch, ProjectConfig, ProjectOutcome};
use crate::cache::{CacheStats, DeterministicCache};
use crate::calculations::baseplate::{baseplate_checks, BaseplateDesign, BaseplateInput, ConnectionLoads};
use crate::calculations::feasibility::{filter_catalog, FeasibilityInput, FeasibleSection};
use crate::calculations::footing::{footing_solve, Foundation, FootingInput};
use crate::calibration::CalibrationStore;
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{CalcError, CalcResult};
use crate::loads::{derive_loads, DerivedLoads, LoadInput};
use crate::optimization::{
    baseplate_grid_solve, baseplate_optimize_ga, pareto_optimize, BaseplateOptimum, GaInput, GridInput,
    ParetoInput, ParetoSolution,
};
use crate::sections::{SectionSource, StaticCatalog};
use crate::settings::DesignSettings;
use crate::versioning::{solvers, SolverRegistry};

/// Catalog handle shared with the batch worker pool.
pub type SharedCatalog = Box<dyn SectionSource + Send + Sync>;

/// Sensitivity inputs plus the closed-form output they feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRequest {
    #[serde(flatten)]
    pub analysis: SensitivityInput,
    pub model: ResponseModel,
}

/// One operation in data form.
///
/// ```json
/// { "operation": "footing_solve",
///   "input": { "diameter_ft": 3.0, "moment_kipft": 60.0, "soil_psf": 3000.0, "poles": 1 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "input", rename_all = "snake_case")]
pub enum SolveRequest {
    DeriveLoads(LoadInput),
    FilterSections(FeasibilityInput),
    FootingSolve(FootingInput),
    ParetoOptimizePoles(ParetoInput),
    BaseplateChecks {
        plate: BaseplateInput,
        loads: ConnectionLoads,
    },
    BaseplateOptimizeGa(GaInput),
    BaseplateGridSolve(GridInput),
    MonteCarloReliability(ReliabilityInput),
    SensitivityAnalysis(SensitivityRequest),
    UncertaintyBands(BandsInput),
    Batch(Vec<ProjectConfig>),
}

impl SolveRequest {
    /// Registered solver name this request runs.
    pub fn solver(&self) -> &'static str {
        match self {
            SolveRequest::DeriveLoads(_) => solvers::DERIVE_LOADS,
            SolveRequest::FilterSections(_) => solvers::FILTER_SECTIONS,
            SolveRequest::FootingSolve(_) => solvers::FOOTING_SOLVE,
            SolveRequest::ParetoOptimizePoles(_) => solvers::PARETO_OPTIMIZE,
            SolveRequest::BaseplateChecks { .. } => solvers::BASEPLATE_CHECKS,
            SolveRequest::BaseplateOptimizeGa(_) => solvers::BASEPLATE_OPTIMIZE_GA,
            SolveRequest::BaseplateGridSolve(_) => solvers::BASEPLATE_GRID_SOLVE,
            SolveRequest::MonteCarloReliability(_) => solvers::MONTE_CARLO_RELIABILITY,
            SolveRequest::SensitivityAnalysis(_) => solvers::SENSITIVITY_ANALYSIS,
            SolveRequest::UncertaintyBands(_) => solvers::UNCERTAINTY_BANDS,
            SolveRequest::Batch(_) => "batch",
        }
    }
}

/// Store, settings, registry, catalog and solver caches.
pub struct SignCalc {
    store: CalibrationStore,
    settings: DesignSettings,
    registry: SolverRegistry,
    catalog: SharedCatalog,
    loads_cache: DeterministicCache<SolverOutput<DerivedLoads>>,
    sections_cache: DeterministicCache<SolverOutput<Vec<FeasibleSection>>>,
    footing_cache: DeterministicCache<SolverOutput<Foundation>>,
}

impl Default for SignCalc {
    /// Default calibration, default settings and the built-in catalog.
    fn default() -> Self {
        Self::assemble(
            CalibrationStore::with_defaults(),
            DesignSettings::default(),
            SolverRegistry::with_defaults(),
            Box::new(StaticCatalog::builtin()),
        )
    }
}

impl SignCalc {
    /// Build an engine after validating `settings`.
    pub fn new(
        store: CalibrationStore,
        settings: DesignSettings,
        registry: SolverRegistry,
        catalog: SharedCatalog,
    ) -> CalcResult<Self> {
        settings.validate()?;
        Ok(Self::assemble(store, settings, registry, catalog))
    }

    fn assemble(
        store: CalibrationStore,
        settings: DesignSettings,
        registry: SolverRegistry,
        catalog: SharedCatalog,
    ) -> Self {
        let policy = settings.cache;
        SignCalc {
            store,
            settings,
            registry,
            catalog,
            loads_cache: DeterministicCache::new(policy),
            sections_cache: DeterministicCache::new(policy),
            footing_cache: DeterministicCache::new(policy),
        }
    }

    pub fn context(&self) -> SolveContext<'_> {
        SolveContext::new(&self.store, &self.settings, &self.registry)
    }

    pub fn settings(&self) -> &DesignSettings {
        &self.settings
    }

    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    pub fn registry(&self) -> &SolverRegistry {
        &self.registry
    }

    // ========================================================================
    // Cached solvers
    // ========================================================================

    pub fn derive_loads(&self, input: &LoadInput) -> CalcResult<SolverOutput<DerivedLoads>> {
        let ctx = self.context();
        self.loads_cache.get_or_compute(input, |n| derive_loads(&ctx, n))
    }

    /// Screen the engine's catalog. The catalog is fixed for the engine's
    /// lifetime, so the input alone keys the cache.
    pub fn filter_sections(&self, input: &FeasibilityInput) -> CalcResult<SolverOutput<Vec<FeasibleSection>>> {
        let ctx = self.context();
        self.sections_cache
            .get_or_compute(input, |n| filter_catalog(&ctx, n, self.catalog.as_ref()))
    }

    pub fn footing_solve(&self, input: &FootingInput) -> CalcResult<SolverOutput<Foundation>> {
        let ctx = self.context();
        self.footing_cache.get_or_compute(input, |n| footing_solve(&ctx, n))
    }

    // ========================================================================
    // Uncached solvers
    // ========================================================================

    /// Screen the catalog (cached) and rank the usable sections.
    pub fn pareto_optimize_poles(&self, input: &ParetoInput) -> CalcResult<SolverOutput<Vec<ParetoSolution>>> {
        input.validate()?;
        let ctx = self.context();
        let screened = self.filter_sections(&FeasibilityInput {
            moment_demand_kipin: input.moment_demand_kipin,
            height_ft: input.height_ft,
            prefs: input.prefs,
        })?;
        let mut ranked = pareto_optimize(&ctx, input, &screened.result)?;

        let mut assumptions = screened.assumptions;
        assumptions.retain(|a| !ranked.assumptions.contains(a));
        assumptions.append(&mut ranked.assumptions);
        Ok(ctx.output(solvers::PARETO_OPTIMIZE, ranked.result, assumptions))
    }

    pub fn baseplate_checks(
        &self,
        plate: &BaseplateInput,
        loads: &ConnectionLoads,
    ) -> CalcResult<SolverOutput<BaseplateDesign>> {
        baseplate_checks(&self.context(), plate, loads)
    }

    pub fn baseplate_optimize_ga(
        &self,
        input: &GaInput,
        progress: Option<&mut dyn FnMut(usize, f64)>,
    ) -> CalcResult<SolverOutput<BaseplateOptimum>> {
        baseplate_optimize_ga(&self.context(), input, progress)
    }

    pub fn baseplate_grid_solve(
        &self,
        input: &GridInput,
        progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> CalcResult<SolverOutput<BaseplateOptimum>> {
        baseplate_grid_solve(&self.context(), input, progress)
    }

    pub fn monte_carlo_reliability(&self, input: &ReliabilityInput) -> CalcResult<SolverOutput<ReliabilityResult>> {
        monte_carlo_reliability(&self.context(), input)
    }

    pub fn sensitivity_analysis<F>(
        &self,
        input: &SensitivityInput,
        output: F,
    ) -> CalcResult<SolverOutput<SensitivityResult>>
    where
        F: Fn(&BTreeMap<String, f64>) -> f64,
    {
        sensitivity_analysis(&self.context(), input, output)
    }

    pub fn uncertainty_bands(&self, input: &BandsInput) -> CalcResult<SolverOutput<UncertaintyBands>> {
        compute_uncertainty_bands(&self.context(), input)
    }

    pub fn solve_batch(
        &self,
        projects: &[ProjectConfig],
        progress: Option<&mut dyn FnMut(usize, usize, usize)>,
    ) -> CalcResult<Vec<ProjectOutcome>> {
        solve_batch(&self.context(), self.catalog.as_ref(), projects, progress)
    }

    // ========================================================================
    // Cache management
    // ========================================================================

    /// Hit/miss counters per cached solver.
    pub fn cache_stats(&self) -> BTreeMap<&'static str, CacheStats> {
        let mut stats = BTreeMap::new();
        stats.insert(solvers::DERIVE_LOADS, self.loads_cache.stats());
        stats.insert(solvers::FILTER_SECTIONS, self.sections_cache.stats());
        stats.insert(solvers::FOOTING_SOLVE, self.footing_cache.stats());
        stats
    }

    pub fn clear_caches(&self) {
        self.loads_cache.clear();
        self.sections_cache.clear();
        self.footing_cache.clear();
    }

    // ========================================================================
    // Data-form requests
    // ========================================================================

    /// Run a request and serialize its output.
    pub fn dispatch(&self, request: &SolveRequest) -> CalcResult<serde_json::Value> {
        debug!(solver = request.solver(), "engine.dispatch");
        let value = match request {
            SolveRequest::DeriveLoads(input) => serde_json::to_value(self.derive_loads(input)?)?,
            SolveRequest::FilterSections(input) => serde_json::to_value(self.filter_sections(input)?)?,
            SolveRequest::FootingSolve(input) => serde_json::to_value(self.footing_solve(input)?)?,
            SolveRequest::ParetoOptimizePoles(input) => {
                serde_json::to_value(self.pareto_optimize_poles(input)?)?
            }
            SolveRequest::BaseplateChecks { plate, loads } => {
                serde_json::to_value(self.baseplate_checks(plate, loads)?)?
            }
            SolveRequest::BaseplateOptimizeGa(input) => {
                serde_json::to_value(self.baseplate_optimize_ga(input, None)?)?
            }
            SolveRequest::BaseplateGridSolve(input) => {
                serde_json::to_value(self.baseplate_grid_solve(input, None)?)?
            }
            SolveRequest::MonteCarloReliability(input) => {
                serde_json::to_value(self.monte_carlo_reliability(input)?)?
            }
            SolveRequest::SensitivityAnalysis(request) => serde_json::to_value(sensitivity_of_model(
                &self.context(),
                &request.analysis,
                &request.model,
            )?)?,
            SolveRequest::UncertaintyBands(input) => serde_json::to_value(self.uncertainty_bands(input)?)?,
            SolveRequest::Batch(projects) => serde_json::to_value(self.solve_batch(projects, None)?)?,
        };
        Ok(value)
    }

    /// Parse a JSON request, run it and return pretty-printed JSON.
    ///
    /// Well-formed JSON that does not fit a request (unknown operation, bad
    /// exposure, wrong field type) is [`CalcError::InvalidInput`]; unparseable
    /// text is [`CalcError::SerializationError`].
    pub fn dispatch_json(&self, request: &str) -> CalcResult<String> {
        let request: SolveRequest = serde_json::from_str(request).map_err(request_error)?;
        let value = self.dispatch(&request)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

fn request_error(e: serde_json::Error) -> CalcError {
    match e.classify() {
        serde_json::error::Category::Data => CalcError::invalid_input(
            "request",
            format!("line {} column {}", e.line(), e.column()),
            e.to_string(),
        ),
        _ => CalcError::from(e),
    }
}

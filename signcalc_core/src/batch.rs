//! # Batch Solving
//!
//! Full solves of many independent sign projects on a fixed-size worker pool.
//! Each project runs derive loads → section screening → Pareto ranking →
//! footing with no shared mutable state, so results are identical whatever
//! the pool size.
//!
//! Projects are processed in chunks; after each chunk the optional progress
//! callback receives `(total, completed, failed)` on the calling thread.
//! A project that fails validation is reported in its outcome and never stops
//! the batch.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculations::feasibility::{filter_sections, FeasibilityInput, SectionPrefs};
use crate::calculations::footing::{footing_solve, Foundation, FootingConstraints, FootingInput};
use crate::calibration::names;
use crate::context::SolveContext;
use crate::envelope::calc_confidence;
use crate::errors::{CalcError, CalcResult};
use crate::loads::{derive_loads, Cabinet, DerivedLoads, LoadInput, SiteLoads};
use crate::optimization::pareto::{pareto_optimize, ParetoInput, ParetoSolution};
use crate::sections::{Section, SectionSource};

/// Smallest chunk between progress reports
const MIN_CHUNK: usize = 10;
/// Target number of progress reports per batch
const REPORTS_PER_BATCH: usize = 10;

fn default_diameter_ft() -> f64 {
    3.0
}

fn default_poles() -> u32 {
    1
}

/// One project in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    pub site: SiteLoads,
    pub cabinets: Vec<Cabinet>,
    pub height_ft: f64,
    /// Allowable soil bearing; `None` uses the presumptive value
    #[serde(default)]
    pub soil_psf: Option<f64>,
    #[serde(default = "default_diameter_ft")]
    pub diameter_ft: f64,
    #[serde(default = "default_poles")]
    pub poles: u32,
    #[serde(default)]
    pub prefs: SectionPrefs,
    #[serde(default)]
    pub footing_constraints: FootingConstraints,
}

impl ProjectConfig {
    pub fn new(id: impl Into<String>, site: SiteLoads, cabinets: Vec<Cabinet>, height_ft: f64) -> Self {
        ProjectConfig {
            id: id.into(),
            site,
            cabinets,
            height_ft,
            soil_psf: None,
            diameter_ft: default_diameter_ft(),
            poles: default_poles(),
            prefs: SectionPrefs::default(),
            footing_constraints: FootingConstraints::default(),
        }
    }
}

/// Loads, ranked poles and footing for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSolution {
    pub loads: DerivedLoads,
    /// Pareto-ranked usable sections; empty when nothing works
    pub poles: Vec<ParetoSolution>,
    pub foundation: Foundation,
    pub assumptions: Vec<String>,
    pub confidence: f64,
}

/// Result slot for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOutcome {
    pub id: String,
    pub result: Option<ProjectSolution>,
    pub error: Option<CalcError>,
}

impl ProjectOutcome {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Full solve of one project against an already-loaded catalog.
pub fn solve_project(
    ctx: &SolveContext,
    sections: &[Section],
    project: &ProjectConfig,
) -> CalcResult<ProjectSolution> {
    let load_input = LoadInput {
        site: project.site,
        cabinets: project.cabinets.clone(),
        height_ft: project.height_ft,
    };
    let loads = derive_loads(ctx, &load_input)?;
    let moment_kipin = loads.result.moment_kipin();

    let screened = filter_sections(
        ctx,
        &FeasibilityInput {
            moment_demand_kipin: moment_kipin,
            height_ft: project.height_ft,
            prefs: project.prefs,
        },
        sections,
    )?;
    let ranked = pareto_optimize(ctx, &ParetoInput::new(moment_kipin, project.height_ft), &screened.result)?;

    let soil_psf = match project.soil_psf {
        Some(soil) => soil,
        None => ctx
            .store
            .value(names::SOIL_BEARING_DEFAULT_PSF, &ctx.settings.versions.site)?,
    };
    let mut footing_input = FootingInput::new(
        project.diameter_ft,
        loads.result.moment_kipft,
        soil_psf,
        project.poles,
    );
    footing_input.constraints = project.footing_constraints;
    let foundation = footing_solve(ctx, &footing_input)?;

    let mut assumptions = Vec::new();
    for list in [
        &loads.assumptions,
        &screened.assumptions,
        &ranked.assumptions,
        &foundation.assumptions,
    ] {
        for a in list {
            if !assumptions.contains(a) {
                assumptions.push(a.clone());
            }
        }
    }
    if project.soil_psf.is_none() {
        assumptions.push(format!("Presumptive soil bearing {:.0} psf", soil_psf));
    }
    let confidence = calc_confidence(&assumptions);

    Ok(ProjectSolution {
        loads: loads.result,
        poles: ranked.result,
        foundation: foundation.result,
        assumptions,
        confidence,
    })
}

fn outcome(ctx: &SolveContext, sections: &[Section], project: &ProjectConfig) -> ProjectOutcome {
    match solve_project(ctx, sections, project) {
        Ok(solution) => ProjectOutcome {
            id: project.id.clone(),
            result: Some(solution),
            error: None,
        },
        Err(e) => {
            warn!(project = %project.id, error = %e, "batch.project_failed");
            ProjectOutcome {
                id: project.id.clone(),
                result: None,
                error: Some(e),
            }
        }
    }
}

/// Solve every project on a pool of `settings.workers` threads.
///
/// Outcomes are returned in input order. The catalog is loaded once; if it is
/// unavailable the whole batch fails.
pub fn solve_batch(
    ctx: &SolveContext,
    catalog: &dyn SectionSource,
    projects: &[ProjectConfig],
    mut progress: Option<&mut dyn FnMut(usize, usize, usize)>,
) -> CalcResult<Vec<ProjectOutcome>> {
    if projects.is_empty() {
        return Ok(Vec::new());
    }
    let sections = catalog.load_sections()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.settings.workers)
        .build()
        .map_err(|e| CalcError::configuration("workers", e.to_string()))?;

    let total = projects.len();
    let chunk_size = MIN_CHUNK.max(total / REPORTS_PER_BATCH);
    let mut outcomes = Vec::with_capacity(total);
    let mut failed = 0usize;

    for chunk in projects.chunks(chunk_size) {
        let done: Vec<ProjectOutcome> =
            pool.install(|| chunk.par_iter().map(|p| outcome(ctx, &sections, p)).collect());
        failed += done.iter().filter(|o| o.is_failed()).count();
        outcomes.extend(done);
        if let Some(cb) = progress.as_deref_mut() {
            cb(total, outcomes.len(), failed);
        }
    }

    debug!(total, failed, workers = ctx.settings.workers, "batch.solve");
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;
    use crate::loads::Exposure;
    use crate::sections::{StaticCatalog, UnavailableCatalog};
    use crate::settings::DesignSettings;
    use crate::versioning::SolverRegistry;

    fn project(id: &str, wind: f64) -> ProjectConfig {
        ProjectConfig::new(
            id,
            SiteLoads {
                wind_speed_mph: wind,
                exposure: Exposure::C,
            },
            vec![Cabinet::new(14.0, 8.0)],
            25.0,
        )
    }

    fn run(settings: &DesignSettings, projects: &[ProjectConfig]) -> Vec<ProjectOutcome> {
        let store = CalibrationStore::with_defaults();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, settings, &registry);
        solve_batch(&ctx, &StaticCatalog::builtin(), projects, None).unwrap()
    }

    #[test]
    fn test_single_project() {
        let out = run(&DesignSettings::default(), &[project("p1", 115.0)]);
        let solution = out[0].result.as_ref().unwrap();
        assert!(solution.loads.moment_kipft > 0.0);
        assert!(!solution.poles.is_empty());
        assert!(solution.foundation.depth_in >= 36.0);
        assert!(solution.assumptions.iter().any(|a| a.contains("Presumptive soil")));
    }

    #[test]
    fn test_order_and_failures_with_progress() {
        let mut projects: Vec<ProjectConfig> =
            (0..25).map(|i| project(&format!("p{:02}", i), 90.0 + i as f64)).collect();
        projects[7].height_ft = -1.0;

        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);

        let mut reports = Vec::new();
        let mut record = |t: usize, c: usize, f: usize| reports.push((t, c, f));
        let callback: &mut dyn FnMut(usize, usize, usize) = &mut record;
        let out = solve_batch(&ctx, &StaticCatalog::builtin(), &projects, Some(callback)).unwrap();

        let ids: Vec<&str> = out.iter().map(|o| o.id.as_str()).collect();
        let expected: Vec<String> = (0..25).map(|i| format!("p{:02}", i)).collect();
        assert_eq!(ids, expected);
        assert!(out[7].is_failed());
        assert_eq!(out[7].error.as_ref().unwrap().error_code(), "INVALID_INPUT");

        // chunks of 10: 10, 20, 25
        assert_eq!(reports, vec![(25, 10, 1), (25, 20, 1), (25, 25, 1)]);
    }

    #[test]
    fn test_worker_count_does_not_change_results() {
        let projects: Vec<ProjectConfig> = (0..12).map(|i| project(&i.to_string(), 100.0 + i as f64)).collect();
        let one = DesignSettings {
            workers: 1,
            ..DesignSettings::default()
        };
        let many = DesignSettings {
            workers: 6,
            ..DesignSettings::default()
        };
        assert_eq!(run(&one, &projects), run(&many, &projects));
    }

    #[test]
    fn test_catalog_unavailable_fails_batch() {
        let store = CalibrationStore::with_defaults();
        let settings = DesignSettings::default();
        let registry = SolverRegistry::with_defaults();
        let ctx = SolveContext::new(&store, &settings, &registry);
        let err = solve_batch(
            &ctx,
            &UnavailableCatalog("vendor feed offline".into()),
            &[project("p", 115.0)],
            None,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CATALOG_UNAVAILABLE");
    }

    #[test]
    fn test_empty_batch() {
        assert!(run(&DesignSettings::default(), &[]).is_empty());
    }
}

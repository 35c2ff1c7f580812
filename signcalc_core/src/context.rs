//! Read-only collaborators shared by every solver call.

use crate::calibration::CalibrationStore;
use crate::envelope::SolverOutput;
use crate::settings::DesignSettings;
use crate::versioning::SolverRegistry;

/// Borrowed store, settings and version registry.
///
/// Cheap to copy; build one per request or hold one for the process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct SolveContext<'a> {
    pub store: &'a CalibrationStore,
    pub settings: &'a DesignSettings,
    pub registry: &'a SolverRegistry,
}

impl<'a> SolveContext<'a> {
    pub fn new(
        store: &'a CalibrationStore,
        settings: &'a DesignSettings,
        registry: &'a SolverRegistry,
    ) -> Self {
        SolveContext {
            store,
            settings,
            registry,
        }
    }

    /// Wrap a solver result with the registered version of `solver`.
    pub fn output<T>(&self, solver: &str, result: T, assumptions: Vec<String>) -> SolverOutput<T> {
        let version = self.registry.version(solver).unwrap_or("unknown");
        SolverOutput::new(solver, version, result, assumptions)
    }
}

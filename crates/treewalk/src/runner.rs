//! One-call audits from a loaded configuration.

use std::path::PathBuf;
use std::sync::Arc;
use treewalk_checks::{apply_preset, standard_registry};
use treewalk_core::{AuditReport, CheckerBuilder, CheckerError, Config, ModuleRegistry};

/// Audits `files` with the built-in modules.
///
/// The configuration's preset, if any, is expanded first. The checker is
/// destroyed before returning.
///
/// # Errors
///
/// Returns a [`CheckerError`] for an invalid configuration or a run that
/// had to stop.
pub fn audit(config: Config, files: &[PathBuf]) -> Result<AuditReport, CheckerError> {
    audit_with(standard_registry(), config, files)
}

/// Like [`audit`], with a registry that may hold additional checks.
///
/// # Errors
///
/// Returns a [`CheckerError`] for an invalid configuration or a run that
/// had to stop.
pub fn audit_with(
    registry: ModuleRegistry,
    mut config: Config,
    files: &[PathBuf],
) -> Result<AuditReport, CheckerError> {
    apply_preset(&mut config)?;
    let mut checker = CheckerBuilder::from_config(&config)?
        .factory(Arc::new(registry))
        .build()?;
    tracing::debug!(files = files.len(), threads = checker.threads(), "running audit");
    let report = checker.process(files);
    checker.destroy();
    report
}
